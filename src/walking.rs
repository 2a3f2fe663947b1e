//! Horizontal locomotion.
//!
//! Walking works in velocity-change units: the planner returns the velocity
//! change to apply and the caller scales it by body mass into an impulse.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for walking.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Horizontal speed the character walks towards (units/second).
    pub max_speed: f32,

    /// Horizontal velocity change per governed step.
    pub impulse: f32,

    /// Upward velocity change added to a walk impulse while standing,
    /// lets the body mount lips and stair edges instead of catching on them.
    pub step_assist: f32,

    /// Seconds between locomotion and recovery decisions.
    pub governance_interval: f32,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_speed: 5.0,
            impulse: 1.0,
            step_assist: 1.2,
            governance_interval: 0.05,
        }
    }
}

/// Rotate a local input direction into world space by `yaw` and normalize.
///
/// Local axes follow Bevy's convention: `-Z` forward, `+X` right.
pub fn world_direction(local: Vec3, yaw: f32) -> Vec3 {
    (Quat::from_rotation_y(yaw) * local).normalize_or_zero()
}

/// Plan one walk velocity change, or `None` when walking should not push.
///
/// A push is allowed while the character is still below max speed, or when
/// pushing brings the horizontal velocity closer to the target. Otherwise
/// the step leaves velocity alone, which stops overshoot from feeding an
/// oscillation around the target.
///
/// The horizontal part never lifts speed past `max(current, max_speed)`;
/// a push that would is bent so the result lands on that limit. `step_assist`
/// adds the configured upward bias to the returned change.
pub fn plan_walk_impulse(
    config: &WalkConfig,
    velocity: Vec3,
    direction: Vec3,
    step_assist: bool,
) -> Option<Vec3> {
    if direction == Vec3::ZERO {
        return None;
    }

    let horizontal = Vec3::new(velocity.x, 0.0, velocity.z);
    let target = direction * config.max_speed;
    let push = direction * config.impulse;
    let speed = horizontal.length();

    let speeds_up_within_limit = speed < config.max_speed;
    let closes_on_target = (horizontal + push - target).length() < (horizontal - target).length();
    if !(speeds_up_within_limit || closes_on_target) {
        return None;
    }

    let limit = speed.max(config.max_speed);
    let mut change = (horizontal + push).clamp_length_max(limit) - horizontal;
    change.y = 0.0;
    if change.length_squared() <= f32::EPSILON {
        return None;
    }

    if step_assist {
        change.y += config.step_assist;
    }
    Some(change)
}
