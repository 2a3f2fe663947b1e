//! Scripted moving platforms.
//!
//! Platforms are animated bodies moved by the systems here once per fixed
//! step, before the controller runs. Anything a character can ride must be
//! animated so the support classifier counts it as a moving platform.

use bevy::prelude::*;

use crate::backend::CharacterPhysicsBackend;

/// How a lift moves its body.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiftDrive {
    /// Hold a constant velocity and flip it at the bounds.
    Velocity,
    /// Recompute a target transform one step ahead every step.
    #[default]
    TargetTransform,
}

/// A platform moving back and forth along an axis.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct OscillatingLift {
    /// Unit direction of travel.
    pub axis: Vec3,
    /// Lower bound, measured as the body position projected on `axis`.
    pub min: f32,
    /// Upper bound along `axis`.
    pub max: f32,
    /// Travel speed in units per second.
    pub speed: f32,
    pub drive: LiftDrive,
    rising: bool,
}

impl OscillatingLift {
    /// A vertical lift between `min` and `max`, starting upward.
    pub fn vertical(min: f32, max: f32, speed: f32) -> Self {
        Self::new(Vec3::Y, min, max, speed)
    }

    pub fn new(axis: Vec3, min: f32, max: f32, speed: f32) -> Self {
        Self {
            axis: axis.normalize_or(Vec3::Y),
            min,
            max,
            speed,
            drive: LiftDrive::default(),
            rising: true,
        }
    }

    pub fn with_drive(mut self, drive: LiftDrive) -> Self {
        self.drive = drive;
        self
    }

    /// Moving toward `max`.
    pub fn is_rising(&self) -> bool {
        self.rising
    }

    /// Update the direction for a body at `position`.
    ///
    /// Returns `true` when the lift turned around.
    pub fn advance(&mut self, position: Vec3) -> bool {
        let along = position.dot(self.axis);
        let turn = if self.rising {
            along >= self.max
        } else {
            along <= self.min
        };
        if turn {
            self.rising = !self.rising;
        }
        turn
    }

    /// Current velocity of the lift.
    pub fn velocity(&self) -> Vec3 {
        let sign = if self.rising { 1.0 } else { -1.0 };
        self.axis * self.speed * sign
    }

    /// Where the body should be one step of `dt` seconds from `position`.
    pub fn target(&self, position: Vec3, dt: f32) -> Vec3 {
        position + self.velocity() * dt
    }
}

/// A platform spinning about its vertical axis.
///
/// With `oscillating` set the rate ramps by `acceleration` until it exceeds
/// `max_angular_speed`, then ramps back the other way, so a rider sees its
/// angular velocity change continually.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct RotatingPlatform {
    /// Current rate in radians per second, positive counter-clockwise seen
    /// from above.
    pub angular_speed: f32,
    /// Rate change in radians per second squared.
    pub acceleration: f32,
    pub max_angular_speed: f32,
    pub oscillating: bool,
    speeding_up: bool,
}

impl Default for RotatingPlatform {
    fn default() -> Self {
        Self::oscillating()
    }
}

impl RotatingPlatform {
    /// A platform turning at a fixed rate.
    pub fn constant(angular_speed: f32) -> Self {
        Self {
            angular_speed,
            acceleration: 0.0,
            max_angular_speed: angular_speed.abs(),
            oscillating: false,
            speeding_up: true,
        }
    }

    /// A platform whose rate swings between `-3` and `3` rad/s.
    pub fn oscillating() -> Self {
        Self {
            angular_speed: 0.0,
            acceleration: 0.18,
            max_angular_speed: 3.0,
            oscillating: true,
            speeding_up: true,
        }
    }

    /// Advance by `dt` seconds and return the yaw to add this step.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if self.oscillating {
            let sign = if self.speeding_up { 1.0 } else { -1.0 };
            self.angular_speed += sign * self.acceleration * dt;
            if self.angular_speed.abs() > self.max_angular_speed {
                self.speeding_up = !self.speeding_up;
            }
        }
        self.angular_speed * dt
    }
}

/// Move every lift one step.
pub fn drive_lifts<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world).as_secs_f32();

    let lifts: Vec<(Entity, OscillatingLift)> = world
        .query::<(Entity, &OscillatingLift)>()
        .iter(world)
        .map(|(e, l)| (e, *l))
        .collect();

    for (entity, mut lift) in lifts {
        let position = B::get_position(world, entity);
        if lift.advance(position) {
            trace!("lift {entity} turned, rising: {}", lift.is_rising());
        }

        match lift.drive {
            LiftDrive::Velocity => B::set_velocity(world, entity, lift.velocity()),
            LiftDrive::TargetTransform => {
                let rotation = B::get_rotation(world, entity);
                B::set_target_transform(world, entity, lift.target(position, dt), rotation);
            }
        }

        if let Some(mut stored) = world.get_mut::<OscillatingLift>(entity) {
            *stored = lift;
        }
    }
}

/// Turn every rotating platform one step.
pub fn spin_platforms<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world).as_secs_f32();

    let platforms: Vec<(Entity, RotatingPlatform)> = world
        .query::<(Entity, &RotatingPlatform)>()
        .iter(world)
        .map(|(e, p)| (e, *p))
        .collect();

    for (entity, mut platform) in platforms {
        let delta = platform.advance(dt);
        let position = B::get_position(world, entity);
        let rotation = Quat::from_rotation_y(delta) * B::get_rotation(world, entity);
        B::set_target_transform(world, entity, position, rotation);

        if let Some(mut stored) = world.get_mut::<RotatingPlatform>(entity) {
            *stored = platform;
        }
    }
}
