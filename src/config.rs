//! Controller configuration components.
//!
//! [`ControllerConfig`] groups the per-concern tuning structs used by the
//! controller. Every numeric default is the tuned value the controller was
//! developed with, but all of them are parameters: the roles (near infinite
//! inertia resists tipping, tiny yaw inertia lets a platform carry the body
//! round) matter more than the exact numbers.

use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::jumping::JumpConfig;
use crate::support::InertiaConfig;
use crate::upright::UprightConfig;
use crate::walking::WalkConfig;

/// Seconds from config as a [`Duration`], rounded to whole microseconds so
/// intervals like `0.05` line up exactly with fixed steps.
pub(crate) fn secs(value: f32) -> Duration {
    Duration::from_micros((f64::from(value.max(0.0)) * 1e6).round() as u64)
}

/// Shape and material of the character body and its attachments.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Radius of the main cylinder.
    pub radius: f32,
    /// Height of the main cylinder.
    pub height: f32,
    pub mass: f32,
    /// Friction of the main cylinder. Zero so walls don't grab the body.
    pub friction: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Radius of the shoes cylinder.
    pub shoe_radius: f32,
    /// How far below the body center the shoes reach.
    pub shoe_depth: f32,
    /// Friction of the shoes, high so the body stands on slopes.
    pub shoe_friction: f32,
    pub sensor_radius: f32,
    pub sensor_height: f32,
    /// Vertical offset of the foot sensor center from the body center.
    pub sensor_offset: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        let diameter = 0.9;
        Self {
            radius: diameter / 2.0,
            height: 1.8,
            mass: 1.0,
            friction: 0.0,
            linear_damping: 0.15,
            angular_damping: 0.5,
            shoe_radius: diameter * 0.4,
            shoe_depth: 1.0,
            shoe_friction: 1.0,
            sensor_radius: diameter * 0.08,
            sensor_height: 1.25,
            sensor_offset: -0.6,
        }
    }
}

impl BodyConfig {
    #[inline]
    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }

    /// Center of the shoes cylinder relative to the body center.
    #[inline]
    pub fn shoe_center(&self) -> f32 {
        -self.shoe_depth / 2.0
    }
}

/// Configuration parameters for the character controller.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct ControllerConfig {
    pub walk: WalkConfig,
    pub jump: JumpConfig,
    pub upright: UprightConfig,
    pub inertia: InertiaConfig,
    pub body: BodyConfig,
}

impl ControllerConfig {
    /// Create a config tuned for a keyboard-driven player.
    pub fn player() -> Self {
        Self::default()
    }

    /// Parse a config from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the controller cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::InvalidParameter {
                    name,
                    reason: format!("must be positive and finite, got {value}"),
                })
            }
        }

        fn fraction(name: &'static str, value: f32) -> Result<(), ConfigError> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidParameter {
                    name,
                    reason: format!("must be within 0..=1, got {value}"),
                })
            }
        }

        positive("walk.max_speed", self.walk.max_speed)?;
        positive("walk.impulse", self.walk.impulse)?;
        positive("walk.governance_interval", self.walk.governance_interval)?;
        positive("jump.cooldown", self.jump.cooldown)?;
        positive("upright.epsilon", self.upright.epsilon)?;
        fraction("upright.damped_fraction", self.upright.damped_fraction)?;
        positive("body.mass", self.body.mass)?;
        positive("body.radius", self.body.radius)?;
        positive("body.height", self.body.height)?;
        positive("inertia.xz_supported", self.inertia.xz_supported)?;
        positive("inertia.xz_airborne", self.inertia.xz_airborne)?;
        positive("inertia.y_static", self.inertia.y_static)?;
        positive("inertia.y_animated", self.inertia.y_animated)?;
        Ok(())
    }

    /// Builder: set walk speed limit.
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.walk.max_speed = max_speed;
        self
    }

    /// Builder: set the velocity change of one walk push.
    pub fn with_walk_impulse(mut self, impulse: f32) -> Self {
        self.walk.impulse = impulse;
        self
    }

    /// Builder: set the step assist bias (0 disables it).
    pub fn with_step_assist(mut self, step_assist: f32) -> Self {
        self.walk.step_assist = step_assist;
        self
    }

    /// Builder: set the interval between locomotion and recovery decisions.
    pub fn with_governance_interval(mut self, seconds: f32) -> Self {
        self.walk.governance_interval = seconds;
        self
    }

    /// Builder: set jump velocity change.
    pub fn with_jump_impulse(mut self, impulse: f32) -> Self {
        self.jump.impulse = impulse;
        self
    }

    /// Builder: set minimum time between jumps.
    pub fn with_jump_cooldown(mut self, seconds: f32) -> Self {
        self.jump.cooldown = seconds;
        self
    }

    pub fn with_inertia(mut self, inertia: InertiaConfig) -> Self {
        self.inertia = inertia;
        self
    }

    pub fn with_upright(mut self, upright: UprightConfig) -> Self {
        self.upright = upright;
        self
    }

    pub fn with_body(mut self, body: BodyConfig) -> Self {
        self.body = body;
        self
    }
}

/// Fixed-step simulation settings.
///
/// Each frame runs as many fixed steps as needed to keep simulated time in
/// lockstep with wall time, but never more than `max_steps_per_frame`; the
/// rest of a long frame is dropped instead of snowballing into the next one.
#[derive(Resource, Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[reflect(Resource)]
#[serde(default)]
pub struct PhysicsStepConfig {
    /// Fixed steps per second.
    pub hz: f64,
    /// Upper bound on fixed steps per rendered frame.
    pub max_steps_per_frame: u32,
}

impl Default for PhysicsStepConfig {
    fn default() -> Self {
        Self {
            hz: 30.0,
            max_steps_per_frame: 8,
        }
    }
}

impl PhysicsStepConfig {
    /// Reject rates that have no finite positive timestep.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hz > 0.0 && self.hz.is_finite() {
            Ok(())
        } else {
            Err(ConfigError::InvalidParameter {
                name: "step.hz",
                reason: format!("must be positive and finite, got {}", self.hz),
            })
        }
    }

    /// Length of one fixed step. Only meaningful once [`Self::validate`] passed.
    pub fn timestep(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.hz)
    }

    /// Largest frame delta the virtual clock will accept.
    pub fn max_frame_delta(&self) -> Duration {
        self.timestep() * self.max_steps_per_frame.max(1)
    }
}
