//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.
//!
//! Motion kinds map onto Rapier body types: `Dynamic` is
//! [`RigidBody::Dynamic`], `Animated` is [`RigidBody::KinematicVelocityBased`]
//! and `Static` is [`RigidBody::Fixed`]. Foot sensor contacts arrive as
//! Rapier [`CollisionEvent`]s and are forwarded as [`TriggerEvent`]s.

use std::time::Duration;

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use bevy_rapier3d::rapier::geometry::CollisionEventFlags;

use crate::backend::{CharacterPhysicsBackend, MotionKind, PrestepMode};
use crate::collision::TriggerEvent;
use crate::config::BodyConfig;
use crate::error::PhysicsInitError;

/// Friction of boxes spawned by [`Rapier3dBackend::static_box`].
pub const BOX_FRICTION: f32 = 0.8;

/// Rapier3D physics backend for the character controller.
///
/// Impulses go through [`ExternalImpulse`], velocities through [`Velocity`],
/// and inertia edits replace the main collider's [`ColliderMassProperties`].
pub struct Rapier3dBackend;

/// How transform edits on a Rapier body are treated.
///
/// Rapier always syncs `Transform` changes into the engine, so this only
/// gates [`Rapier3dBackend::set_rotation`].
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[reflect(Component)]
pub struct RapierPrestep(pub PrestepMode);

fn motion_kind_of(body: &RigidBody) -> MotionKind {
    match body {
        RigidBody::Dynamic => MotionKind::Dynamic,
        RigidBody::KinematicVelocityBased | RigidBody::KinematicPositionBased => {
            MotionKind::Animated
        }
        RigidBody::Fixed => MotionKind::Static,
    }
}

fn rigid_body_for(kind: MotionKind) -> RigidBody {
    match kind {
        MotionKind::Dynamic => RigidBody::Dynamic,
        MotionKind::Animated => RigidBody::KinematicVelocityBased,
        MotionKind::Static => RigidBody::Fixed,
    }
}

/// Mass properties of a body whose center of mass sits at its origin.
fn centered_mass(mass: f32, inertia: Vec3) -> MassProperties {
    MassProperties {
        local_center_of_mass: Vec3::ZERO,
        mass,
        principal_inertia_local_frame: Quat::IDENTITY,
        principal_inertia: inertia,
    }
}

impl CharacterPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn verify(app: &App) -> Result<(), PhysicsInitError> {
        if app.is_plugin_added::<RapierPhysicsPlugin<NoUserData>>() {
            Ok(())
        } else {
            Err(PhysicsInitError::BackendMissing {
                backend: "rapier3d",
                plugin: "RapierPhysicsPlugin<NoUserData>",
            })
        }
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn get_angular_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.angvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_angular_velocity(world: &mut World, entity: Entity, angular_velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.angvel = angular_velocity;
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3, point: Vec3) {
        let center = Self::get_position(world, entity)
            + Self::get_rotation(world, entity)
                * world
                    .get::<ReadMassProperties>(entity)
                    .map(|p| p.get().local_center_of_mass)
                    .unwrap_or(Vec3::ZERO);

        if let Some(mut ext_impulse) = world.get_mut::<ExternalImpulse>(entity) {
            ext_impulse.impulse += impulse;
            ext_impulse.torque_impulse += (point - center).cross(impulse);
        } else if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            // Without an ExternalImpulse the body is treated as unit mass.
            vel.linvel += impulse;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .filter(|_| world.get::<ChildOf>(entity).is_none())
            .map(|t| t.translation)
            .or_else(|| world.get::<GlobalTransform>(entity).map(|t| t.translation()))
            .unwrap_or(Vec3::ZERO)
    }

    fn get_rotation(world: &World, entity: Entity) -> Quat {
        world
            .get::<Transform>(entity)
            .filter(|_| world.get::<ChildOf>(entity).is_none())
            .map(|t| t.rotation)
            .or_else(|| {
                world.get::<GlobalTransform>(entity).map(|t| {
                    let (_, rotation, _) = t.to_scale_rotation_translation();
                    rotation
                })
            })
            .unwrap_or(Quat::IDENTITY)
    }

    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat) {
        let teleport = world
            .get::<RapierPrestep>(entity)
            .is_some_and(|p| p.0 == PrestepMode::Teleport);
        let kinematic = Self::get_motion_kind(world, entity) == MotionKind::Animated;
        if !(teleport || kinematic) {
            return;
        }
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.rotation = rotation;
        }
    }

    /// Drives a kinematic body by velocity so it reaches the target after one
    /// fixed step.
    fn set_target_transform(world: &mut World, entity: Entity, translation: Vec3, rotation: Quat) {
        let dt = Self::get_fixed_timestep(world).as_secs_f32();
        if dt <= 0.0 {
            return;
        }
        let Some(transform) = world.get::<Transform>(entity).copied() else {
            return;
        };
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = (translation - transform.translation) / dt;
            vel.angvel = (rotation * transform.rotation.inverse()).to_scaled_axis() / dt;
        }
    }

    fn get_motion_kind(world: &World, entity: Entity) -> MotionKind {
        world
            .get::<RigidBody>(Self::body_of(world, entity))
            .map(motion_kind_of)
            .unwrap_or(MotionKind::Static)
    }

    fn set_motion_kind(world: &mut World, entity: Entity, kind: MotionKind) {
        if let Some(mut body) = world.get_mut::<RigidBody>(entity) {
            let target = rigid_body_for(kind);
            if *body != target {
                *body = target;
            }
        }
    }

    fn set_prestep_mode(world: &mut World, entity: Entity, mode: PrestepMode) {
        if let Ok(mut entity) = world.get_entity_mut(entity) {
            entity.insert(RapierPrestep(mode));
        }
    }

    fn set_principal_inertia(world: &mut World, entity: Entity, inertia: Vec3) {
        let mass = Self::get_mass(world, entity);
        if let Some(mut props) = world.get_mut::<ColliderMassProperties>(entity) {
            *props = ColliderMassProperties::MassProperties(centered_mass(mass, inertia));
        }
    }

    fn get_mass(world: &World, entity: Entity) -> f32 {
        let configured = match world.get::<ColliderMassProperties>(entity) {
            Some(ColliderMassProperties::MassProperties(props)) => Some(props.mass),
            Some(ColliderMassProperties::Mass(mass)) => Some(*mass),
            _ => None,
        };
        configured
            .or_else(|| world.get::<ReadMassProperties>(entity).map(|p| p.get().mass))
            .filter(|m| *m > 0.0 && m.is_finite())
            .unwrap_or(1.0)
    }

    fn body_of(world: &World, collider: Entity) -> Entity {
        if world.get::<RigidBody>(collider).is_some() {
            return collider;
        }
        world
            .get::<ChildOf>(collider)
            .map(|c| c.parent())
            .unwrap_or(collider)
    }

    fn character_body(config: &BodyConfig, inertia: Vec3) -> impl Bundle {
        (
            Rapier3dCharacterBundle::new()
                .with_damping(config.linear_damping, config.angular_damping),
            Collider::cylinder(config.half_height(), config.radius),
            ColliderMassProperties::MassProperties(centered_mass(config.mass, inertia)),
            Friction {
                coefficient: config.friction,
                combine_rule: CoefficientCombineRule::Min,
            },
        )
    }

    fn character_shoes(config: &BodyConfig) -> impl Bundle {
        (
            Collider::cylinder(config.shoe_depth / 2.0, config.shoe_radius),
            ColliderMassProperties::Density(0.0),
            Friction {
                coefficient: config.shoe_friction,
                combine_rule: CoefficientCombineRule::Max,
            },
        )
    }

    fn foot_sensor(config: &BodyConfig) -> impl Bundle {
        (
            Collider::cylinder(config.sensor_height / 2.0, config.sensor_radius),
            ColliderMassProperties::Density(0.0),
            Sensor,
            ActiveEvents::COLLISION_EVENTS,
            ActiveCollisionTypes::all(),
        )
    }

    fn static_box(half_extents: Vec3) -> impl Bundle {
        (
            RigidBody::Fixed,
            Collider::cuboid(half_extents.x, half_extents.y, half_extents.z),
            Friction::coefficient(BOX_FRICTION),
        )
    }

    fn animated_box(half_extents: Vec3) -> impl Bundle {
        (
            RigidBody::KinematicVelocityBased,
            Velocity::default(),
            Collider::cuboid(half_extents.x, half_extents.y, half_extents.z),
            Friction::coefficient(BOX_FRICTION),
        )
    }
}

/// Plugin that sets up Rapier3D-specific systems for the character controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::CharacterControllerSet;

        app.register_type::<RapierPrestep>();
        app.add_systems(Startup, match_fixed_timestep);
        app.add_systems(
            FixedUpdate,
            forward_collision_events.in_set(CharacterControllerSet::Sensors),
        );
    }

    fn finish(&self, app: &mut App) {
        // Rapier starts in variable mode, capped at 1/60 s per step.
        let dt = Rapier3dBackend::get_fixed_timestep(app.world());
        app.insert_resource(fixed_timestep_mode(dt));
    }
}

/// Rapier stepping exactly `dt` per fixed tick.
pub fn fixed_timestep_mode(dt: Duration) -> TimestepMode {
    TimestepMode::Fixed {
        dt: dt.as_secs_f32(),
        substeps: 1,
    }
}

/// Step Rapier by the same fixed timestep the controller runs at, whatever
/// mode it was left in.
fn match_fixed_timestep(mut commands: Commands, time: Res<Time<Fixed>>) {
    commands.insert_resource(fixed_timestep_mode(time.timestep()));
}

/// Forward sensor contacts reported by Rapier as [`TriggerEvent`]s.
///
/// Only events flagged as sensor events are forwarded, in the order Rapier
/// reported them.
pub fn forward_collision_events(
    mut collisions: EventReader<CollisionEvent>,
    mut triggers: EventWriter<TriggerEvent>,
) {
    for collision in collisions.read() {
        let trigger = match collision {
            CollisionEvent::Started(a, b, flags) if flags.contains(CollisionEventFlags::SENSOR) => {
                TriggerEvent::enter(*a, *b)
            }
            CollisionEvent::Stopped(a, b, flags) if flags.contains(CollisionEventFlags::SENSOR) => {
                TriggerEvent::exit(*a, *b)
            }
            _ => continue,
        };
        triggers.write(trigger);
    }
}

/// Bundle for creating a character body with Rapier3D physics.
///
/// This bundle provides the Rapier3D rigid-body components of a character
/// controller entity: the dynamic body, velocity tracking, external impulses
/// for walking and jumping, damping and read-back mass properties. The
/// collider and its mass properties are added separately so the principal
/// inertia can be swapped at runtime.
///
/// Rotation is never locked. The controller keeps the body upright by
/// swapping inertia and, after a fall, by the recovery sequence.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use upright_character_controller::rapier::Rapier3dCharacterBundle;
///
/// fn spawn_crate(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 3.0, 0.0),
///         Rapier3dCharacterBundle::new().with_damping(0.1, 0.5),
///         Collider::cylinder(0.9, 0.45),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `velocity`: Zero velocity
/// - `external_impulse`: Zero impulse
/// - `damping`: Linear 0.15, Angular 0.5
/// - `mass_properties`: Default (computed by Rapier from colliders)
/// - `prestep`: [`PrestepMode::Disabled`]
#[derive(Bundle)]
pub struct Rapier3dCharacterBundle {
    /// The rigid body type. Should be [`RigidBody::Dynamic`] for characters.
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity. Updated by Rapier each physics step.
    pub velocity: Velocity,
    /// Impulses applied this step. Rapier clears it after integrating.
    pub external_impulse: ExternalImpulse,
    /// Damping coefficients for velocity reduction.
    pub damping: Damping,
    /// Computed mass properties. Rapier updates this from the entity's colliders.
    pub mass_properties: ReadMassProperties,
    /// How transform edits are treated.
    pub prestep: RapierPrestep,
}

impl Default for Rapier3dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dCharacterBundle {
    /// Create a new dynamic character body.
    ///
    /// # Defaults
    ///
    /// - Rigid body: [`RigidBody::Dynamic`]
    /// - Linear damping: 0.15
    /// - Angular damping: 0.5
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_impulse: ExternalImpulse::default(),
            damping: Damping {
                linear_damping: 0.15,
                angular_damping: 0.5,
            },
            // Rapier fills this in after the first physics step
            mass_properties: ReadMassProperties::default(),
            prestep: RapierPrestep::default(),
        }
    }

    /// Set the damping coefficients for velocity reduction.
    ///
    /// # Arguments
    ///
    /// * `linear` - Linear damping coefficient (default: 0.15). Walking impulses
    ///   are governed against a speed limit, so damping mostly shapes how fast
    ///   the character coasts to a stop once keys are released.
    /// * `angular` - Angular damping coefficient (default: 0.5). Higher values
    ///   make a tipped body settle sooner.
    ///
    /// # Example
    ///
    /// ```ignore
    /// // Slippery, slow to settle
    /// let bundle = Rapier3dCharacterBundle::new().with_damping(0.02, 0.1);
    /// ```
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }
}
