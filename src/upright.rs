//! Upright recovery ("getting up").
//!
//! A cylinder standing on a tilting or moving platform tends to tip. Instead
//! of relying on friction and shape tuning alone, the controller measures
//! tilt and, while the character is supported, switches the body into
//! teleport-style pre-stepping and re-levels it by hand.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backend::{MotionKind, PrestepMode};

/// Configuration for upright recovery.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UprightConfig {
    /// Tilt (radians) above which recovery starts and at or below which it
    /// counts as resolved.
    pub epsilon: f32,

    /// Tilt (radians) from which only a fraction of it is corrected per step.
    pub damped_threshold: f32,

    /// Fraction of the tilt corrected per step above `damped_threshold`.
    pub damped_fraction: f32,

    /// Horizontal speed under which a resolved recovery may finalize.
    pub settle_speed: f32,
}

impl Default for UprightConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.0001,
            damped_threshold: 0.2,
            damped_fraction: 0.1,
            settle_speed: 0.01,
        }
    }
}

/// How far the body is from vertical, independent of yaw.
///
/// Equals `|acos(cos(pitch) * cos(roll))|` for YXZ euler angles, since that
/// product is the vertical component of the body's up axis. Evaluated with
/// `atan2` so near-upright bodies do not read as tilted through `acos`
/// rounding.
pub fn tilt_of(rotation: Quat) -> f32 {
    let up = rotation * Vec3::Y;
    Vec2::new(up.x, up.z).length().atan2(up.y)
}

/// Rotation nudged toward upright, keeping yaw.
pub fn corrected_rotation(rotation: Quat, tilt: f32, config: &UprightConfig) -> Quat {
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
    let fraction = if tilt >= config.damped_threshold {
        config.damped_fraction
    } else {
        1.0
    };
    let keep = 1.0 - fraction;
    Quat::from_euler(EulerRot::YXZ, yaw, pitch * keep, roll * keep)
}

#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryPhase {
    #[default]
    Stable,
    Recovering,
    Finalizing,
}

/// A phase change produced by [`UprightRecovery::govern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryTransition {
    /// Tilt detected on support, manual correction begins.
    Started,
    /// Tilt resolved at rest, body parked as animated for one interval.
    Finalizing,
    /// Recovery finished, body is dynamic again.
    Completed,
    /// Recovery gave up without finalizing.
    Aborted,
}

impl RecoveryTransition {
    /// Pre-step mode the body switches to, if any.
    pub fn prestep(self) -> Option<PrestepMode> {
        match self {
            RecoveryTransition::Started => Some(PrestepMode::Teleport),
            RecoveryTransition::Finalizing => None,
            RecoveryTransition::Completed | RecoveryTransition::Aborted => {
                Some(PrestepMode::Disabled)
            }
        }
    }

    /// Motion kind the body switches to, if any.
    pub fn motion_kind(self) -> Option<MotionKind> {
        match self {
            RecoveryTransition::Finalizing => Some(MotionKind::Animated),
            RecoveryTransition::Completed => Some(MotionKind::Dynamic),
            RecoveryTransition::Started | RecoveryTransition::Aborted => None,
        }
    }
}

/// Stable → Recovering → Finalizing → Stable.
#[derive(Reflect, Debug, Clone, Default)]
pub struct UprightRecovery {
    phase: RecoveryPhase,
}

impl UprightRecovery {
    pub fn phase(&self) -> RecoveryPhase {
        self.phase
    }

    /// True while rotation is being corrected by hand.
    pub fn is_active(&self) -> bool {
        self.phase != RecoveryPhase::Stable
    }

    /// Advance the machine by one governance interval.
    pub fn govern(
        &mut self,
        supported: bool,
        on_animated: bool,
        tilt: f32,
        horizontal_speed: f32,
        config: &UprightConfig,
    ) -> Option<RecoveryTransition> {
        let tilted = tilt > config.epsilon;
        match self.phase {
            RecoveryPhase::Finalizing => {
                self.phase = RecoveryPhase::Stable;
                Some(RecoveryTransition::Completed)
            }
            RecoveryPhase::Stable if supported && tilted => {
                self.phase = RecoveryPhase::Recovering;
                Some(RecoveryTransition::Started)
            }
            RecoveryPhase::Stable => None,
            RecoveryPhase::Recovering => {
                if !tilted && !on_animated && horizontal_speed < config.settle_speed {
                    self.phase = RecoveryPhase::Finalizing;
                    Some(RecoveryTransition::Finalizing)
                } else if supported && tilted {
                    None
                } else {
                    self.phase = RecoveryPhase::Stable;
                    Some(RecoveryTransition::Aborted)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> UprightConfig {
        UprightConfig::default()
    }

    // ==================== Tilt Tests ====================

    #[test]
    fn upright_has_no_tilt() {
        assert!(tilt_of(Quat::IDENTITY) < 1e-6);
    }

    #[test]
    fn yaw_alone_is_not_tilt() {
        assert!(tilt_of(Quat::from_rotation_y(2.0)) < 1e-5);
    }

    #[test]
    fn pitch_is_tilt() {
        let tilt = tilt_of(Quat::from_rotation_x(0.3));
        assert!((tilt - 0.3).abs() < 1e-4);
    }

    #[test]
    fn combined_pitch_and_roll() {
        let rotation = Quat::from_euler(EulerRot::YXZ, 0.7, 0.2, 0.1);
        let expected = (0.2f32.cos() * 0.1f32.cos()).acos();
        assert!((tilt_of(rotation) - expected).abs() < 1e-4);
    }

    // ==================== Correction Tests ====================

    #[test]
    fn small_tilt_is_fully_corrected_keeping_yaw() {
        let rotation = Quat::from_euler(EulerRot::YXZ, 1.0, 0.1, -0.05);
        let corrected = corrected_rotation(rotation, tilt_of(rotation), &config());
        assert!(tilt_of(corrected) < 1e-5);
        let (yaw, _, _) = corrected.to_euler(EulerRot::YXZ);
        assert!((yaw - 1.0).abs() < 1e-4);
    }

    #[test]
    fn large_tilt_is_corrected_by_a_fraction() {
        let rotation = Quat::from_rotation_x(0.5);
        let corrected = corrected_rotation(rotation, tilt_of(rotation), &config());
        assert!((tilt_of(corrected) - 0.45).abs() < 1e-3);
    }

    // ==================== State Machine Tests ====================

    #[test]
    fn tilt_on_support_starts_recovery() {
        let mut recovery = UprightRecovery::default();
        let t = recovery.govern(true, false, 0.3, 0.0, &config());
        assert_eq!(t, Some(RecoveryTransition::Started));
        assert_eq!(recovery.phase(), RecoveryPhase::Recovering);
    }

    #[test]
    fn tilt_in_the_air_is_ignored() {
        let mut recovery = UprightRecovery::default();
        assert_eq!(recovery.govern(false, false, 0.3, 0.0, &config()), None);
        assert_eq!(recovery.phase(), RecoveryPhase::Stable);
    }

    #[test]
    fn resolved_tilt_finalizes_then_completes() {
        let mut recovery = UprightRecovery::default();
        recovery.govern(true, false, 0.3, 0.0, &config());

        let t = recovery.govern(true, false, 0.0, 0.0, &config());
        assert_eq!(t, Some(RecoveryTransition::Finalizing));
        assert_eq!(recovery.phase(), RecoveryPhase::Finalizing);

        let t = recovery.govern(true, false, 0.0, 0.0, &config());
        assert_eq!(t, Some(RecoveryTransition::Completed));
        assert_eq!(recovery.phase(), RecoveryPhase::Stable);
    }

    #[test]
    fn unresolved_tilt_keeps_recovering() {
        let mut recovery = UprightRecovery::default();
        recovery.govern(true, false, 0.3, 0.0, &config());

        for step in 0..100 {
            let tilt = 0.3 + step as f32 * 0.01;
            assert_eq!(recovery.govern(true, false, tilt, 0.0, &config()), None);
            assert_eq!(recovery.phase(), RecoveryPhase::Recovering);
        }
    }

    #[test]
    fn losing_support_while_tilted_aborts() {
        let mut recovery = UprightRecovery::default();
        recovery.govern(true, false, 0.3, 0.0, &config());

        let t = recovery.govern(false, false, 0.3, 0.0, &config());
        assert_eq!(t, Some(RecoveryTransition::Aborted));
        assert_eq!(recovery.phase(), RecoveryPhase::Stable);
        assert_eq!(t.and_then(RecoveryTransition::motion_kind), None);
        assert_eq!(
            t.and_then(RecoveryTransition::prestep),
            Some(PrestepMode::Disabled)
        );
    }

    #[test]
    fn resolved_on_moving_platform_aborts_instead_of_finalizing() {
        let mut recovery = UprightRecovery::default();
        recovery.govern(true, true, 0.3, 0.0, &config());

        let t = recovery.govern(true, true, 0.0, 0.0, &config());
        assert_eq!(t, Some(RecoveryTransition::Aborted));
    }

    #[test]
    fn resolved_while_moving_aborts() {
        let mut recovery = UprightRecovery::default();
        recovery.govern(true, false, 0.3, 0.0, &config());

        let t = recovery.govern(true, false, 0.0, 1.0, &config());
        assert_eq!(t, Some(RecoveryTransition::Aborted));
    }

    #[test]
    fn transitions_map_to_body_modes() {
        assert_eq!(
            RecoveryTransition::Started.prestep(),
            Some(PrestepMode::Teleport)
        );
        assert_eq!(
            RecoveryTransition::Finalizing.motion_kind(),
            Some(MotionKind::Animated)
        );
        assert_eq!(
            RecoveryTransition::Completed.motion_kind(),
            Some(MotionKind::Dynamic)
        );
        assert_eq!(
            RecoveryTransition::Completed.prestep(),
            Some(PrestepMode::Disabled)
        );
    }
}
