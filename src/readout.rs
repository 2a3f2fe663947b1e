//! Read-only state for on-screen display.
//!
//! Nothing in the controller reads these values back. They exist so a HUD can
//! show what the controller is doing without reaching into its internals.

use bevy::prelude::*;

use crate::camera::CameraPose;
use crate::config::secs;
use crate::controller::{BodySample, CharacterController};
use crate::upright::RecoveryPhase;

/// How far in front of the camera the coordinate probe looks.
pub const PROBE_DISTANCE: f32 = 4.0;

/// Snapshot of one character, refreshed every fixed step.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Default)]
#[reflect(Component)]
pub struct CharacterReadout {
    pub position: Vec3,
    pub velocity: Vec3,
    pub horizontal_speed: f32,
    pub tilt: f32,
    pub support_count: u32,
    pub animated_support_count: u32,
    pub can_jump: bool,
    pub phase: RecoveryPhase,
}

impl CharacterReadout {
    pub fn capture(controller: &CharacterController, body: &BodySample) -> Self {
        Self {
            position: body.position,
            velocity: body.linear_velocity,
            horizontal_speed: body.linear_velocity.xz().length(),
            tilt: controller.tilt,
            support_count: controller.support.support_count(),
            animated_support_count: controller.support.animated_support_count(),
            can_jump: controller.can_jump(),
            phase: controller.recovery_phase(),
        }
    }

    /// Grid cell [`PROBE_DISTANCE`] units along the view from this position.
    pub fn probe(&self, pose: &CameraPose) -> IVec3 {
        coordinate_probe(self.position, pose)
    }
}

/// Integer coordinates of the point `PROBE_DISTANCE` in front of `origin`.
///
/// Used to read off positions for placing scene geometry.
pub fn coordinate_probe(origin: Vec3, pose: &CameraPose) -> IVec3 {
    (origin + pose.forward() * PROBE_DISTANCE).round().as_ivec3()
}

/// Frames per second averaged over a short window.
#[derive(Resource, Debug, Clone)]
pub struct FrameRateReadout {
    fps: f32,
    frames: u32,
    window: Timer,
}

impl Default for FrameRateReadout {
    fn default() -> Self {
        Self {
            fps: 0.0,
            frames: 0,
            window: Timer::new(secs(0.5), TimerMode::Repeating),
        }
    }
}

impl FrameRateReadout {
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Count one rendered frame of length `delta`.
    pub fn record(&mut self, delta: std::time::Duration) {
        self.frames += 1;
        self.window.tick(delta);
        if self.window.just_finished() {
            self.fps = self.frames as f32 / self.window.duration().as_secs_f32();
            self.frames = 0;
        }
    }
}

pub fn update_frame_rate(time: Res<Time<Real>>, mut readout: ResMut<FrameRateReadout>) {
    readout.record(time.delta());
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;
    use std::time::Duration;

    use super::*;

    #[test]
    fn probe_looks_four_units_ahead() {
        let pose = CameraPose::default();
        assert_eq!(coordinate_probe(Vec3::new(0.4, 1.0, 0.0), &pose), IVec3::new(0, 1, -4));

        let pose = CameraPose {
            yaw: FRAC_PI_2,
            pitch: 0.0,
        };
        assert_eq!(coordinate_probe(Vec3::ZERO, &pose), IVec3::new(-4, 0, 0));
    }

    #[test]
    fn capture_reports_controller_state() {
        let mut controller = CharacterController::default();
        controller.support.enter(Entity::from_raw(3), true);
        let body = BodySample {
            position: Vec3::new(1.0, 2.0, 3.0),
            linear_velocity: Vec3::new(3.0, -1.0, 4.0),
            ..default()
        };

        let readout = CharacterReadout::capture(&controller, &body);
        assert_eq!(readout.support_count, 1);
        assert_eq!(readout.animated_support_count, 1);
        assert!((readout.horizontal_speed - 5.0).abs() < 1e-6);
        assert!(!readout.can_jump);
        assert_eq!(readout.phase, RecoveryPhase::Stable);
    }

    #[test]
    fn frame_rate_updates_every_half_second() {
        let mut readout = FrameRateReadout::default();
        for _ in 0..29 {
            readout.record(Duration::from_micros(16_667));
        }
        assert_eq!(readout.fps(), 0.0);

        readout.record(Duration::from_micros(16_667));
        assert!((readout.fps() - 60.0).abs() < 0.5);
    }
}
