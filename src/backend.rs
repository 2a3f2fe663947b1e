//! Physics backend abstraction.
//!
//! This module defines the capability interface the controller drives a
//! rigid-body engine through. The controller never touches engine types: it
//! reads and writes velocities, applies impulses, edits inertia and switches
//! motion kinds through [`CharacterPhysicsBackend`], and learns about foot
//! contacts from [`TriggerEvent`](crate::collision::TriggerEvent)s the
//! backend emits.

use std::time::Duration;

use bevy::prelude::*;

use crate::config::BodyConfig;
use crate::error::PhysicsInitError;

/// How the engine moves a body.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionKind {
    /// Fully simulated.
    #[default]
    Dynamic,
    /// Moved by script through velocities or target transforms. Platforms a
    /// character can ride must use this kind.
    Animated,
    /// Never moves.
    Static,
}

/// How externally written transforms are treated before a step.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrestepMode {
    /// Transform edits from game code are not pushed into the engine.
    #[default]
    Disabled,
    /// Transform edits teleport the body.
    Teleport,
    /// Transform edits are turned into velocities for the coming step.
    Action,
}

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the character
/// controller. All methods are static and work on the ECS [`World`], so the
/// controller systems stay generic over the engine.
///
/// Two implementations ship with the crate: `Rapier3dBackend` (feature
/// `rapier3d`) and [`HeadlessBackend`](crate::headless::HeadlessBackend), a
/// deterministic test double.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin with the backend's glue systems.
    fn plugin() -> impl Plugin;

    /// Check that the engine itself is present.
    ///
    /// Runs from the controller plugin's `finish`. An error aborts startup so
    /// the game never runs on partial physics.
    fn verify(app: &App) -> Result<(), PhysicsInitError>;

    /// Get the linear velocity of a body.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of a body.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Get the angular velocity of a body.
    fn get_angular_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the angular velocity of a body.
    fn set_angular_velocity(world: &mut World, entity: Entity, angular_velocity: Vec3);

    /// Apply an instantaneous impulse at a world-space point.
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3, point: Vec3);

    /// World-space position of a body.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// World-space rotation of a body.
    fn get_rotation(world: &World, entity: Entity) -> Quat;

    /// Overwrite a body's rotation.
    ///
    /// Only honoured while the body's pre-step mode is
    /// [`PrestepMode::Teleport`] or the body is animated.
    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat);

    /// Drive an animated body so it reaches the target over one fixed step.
    fn set_target_transform(world: &mut World, entity: Entity, translation: Vec3, rotation: Quat);

    /// Motion kind of the body owning `entity` (which may be a child collider).
    fn get_motion_kind(world: &World, entity: Entity) -> MotionKind;

    fn set_motion_kind(world: &mut World, entity: Entity, kind: MotionKind);

    fn set_prestep_mode(world: &mut World, entity: Entity, mode: PrestepMode);

    /// Replace the principal moments of inertia (local x, y, z).
    fn set_principal_inertia(world: &mut World, entity: Entity, inertia: Vec3);

    /// Get the mass of a body.
    ///
    /// Used to turn velocity-change config values into impulses.
    fn get_mass(_world: &World, _entity: Entity) -> f32 {
        1.0
    }

    /// The rigid body a collider belongs to.
    fn body_of(world: &World, collider: Entity) -> Entity;

    /// Length of one fixed simulation step.
    fn get_fixed_timestep(world: &World) -> Duration {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.timestep())
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs_f64(1.0 / 30.0))
    }

    /// Components for the character's main body, starting with the given
    /// principal inertia.
    fn character_body(config: &BodyConfig, inertia: Vec3) -> impl Bundle;

    /// Components for the narrow high-friction "shoes" collider, spawned as
    /// a child below the main body.
    fn character_shoes(config: &BodyConfig) -> impl Bundle;

    /// Components for the foot trigger volume, spawned as a child.
    fn foot_sensor(config: &BodyConfig) -> impl Bundle;

    /// Components for a fixed box with the given half extents.
    fn static_box(half_extents: Vec3) -> impl Bundle;

    /// Components for a scripted box with the given half extents.
    fn animated_box(half_extents: Vec3) -> impl Bundle;
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
