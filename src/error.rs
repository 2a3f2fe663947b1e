//! Error types for the character controller.

use bevy::prelude::*;
use thiserror::Error;

/// Errors raised while configuring a controller or its camera.
///
/// These are configuration faults, not per-step conditions: a camera mode
/// that cannot be resolved or a rig pointing at nothing leaves the game with
/// no sensible view, so callers treat them as fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested camera mode is not one of the two supported rigs.
    #[error("unsupported camera mode `{0}`, expected `first_person` or `orbit`")]
    UnsupportedCamera(String),

    /// A camera rig targets an entity without a transform.
    #[error("camera rig target {0} has no transform")]
    CameraTargetMissing(Entity),

    /// The configuration document could not be parsed.
    #[error("failed to parse controller config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A parameter is outside the range the controller can work with.
    #[error("invalid controller parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Dotted path of the offending field.
        name: &'static str,
        /// Human readable explanation.
        reason: String,
    },
}

/// The physics engine backing the controller is not available.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhysicsInitError {
    /// The engine plugin was never added to the app.
    #[error("physics backend `{backend}` is not initialised, add `{plugin}` before the character controller plugin")]
    BackendMissing {
        backend: &'static str,
        plugin: &'static str,
    },
}

/// Trigger bookkeeping went out of balance.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SupportError {
    /// An exit arrived for a volume that was never entered.
    #[error("trigger exit for {other} without a matching enter")]
    UnmatchedExit { other: Entity },
}

/// A scene-editing tool call that could not be applied.
///
/// The `Display` text is written for the party that produced the call, so it
/// doubles as the correction message sent back to it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ToolError {
    #[error("No tool calls detected.")]
    NoToolCall,

    #[error("Could not parse tool call: {0}")]
    Malformed(String),

    #[error("No tool name specified.")]
    MissingName,

    #[error("Unknown tool `{name}`. Available tools: {available}.")]
    UnknownTool { name: String, available: String },

    #[error("Missing required parameter `{parameter}` for `{tool}`.")]
    MissingParameter {
        tool: &'static str,
        parameter: &'static str,
    },

    #[error("Parameter `{parameter}` for `{tool}` {reason}.")]
    InvalidParameter {
        tool: &'static str,
        parameter: &'static str,
        reason: String,
    },
}
