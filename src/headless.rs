//! Deterministic physics double.
//!
//! [`HeadlessBackend`] implements [`CharacterPhysicsBackend`] on top of a
//! deliberately small simulation: axis-aligned boxes, impulse and gravity
//! integration with damping, animated bodies driven to target transforms,
//! dynamic bodies resting on the top faces of non-dynamic boxes, and sensor
//! overlap diffing that emits [`TriggerEvent`]s. There is no rotation from
//! contacts and no friction, which keeps the controller's own behavior easy
//! to isolate in tests.
//!
//! Add [`HeadlessPhysicsPlugin`] next to the controller plugin:
//!
//! ```rust
//! use bevy::prelude::*;
//! use upright_character_controller::prelude::*;
//!
//! let mut app = App::new();
//! app.add_plugins(MinimalPlugins)
//!     .add_plugins(HeadlessPhysicsPlugin)
//!     .add_plugins(CharacterControllerPlugin::<HeadlessBackend>::default());
//! app.finish();
//! ```

use std::collections::BTreeSet;

use bevy::prelude::*;

use crate::backend::{CharacterPhysicsBackend, MotionKind, NoOpBackendPlugin, PrestepMode};
use crate::collision::TriggerEvent;
use crate::config::BodyConfig;
use crate::error::PhysicsInitError;

/// Rigid body state of the headless simulation.
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component)]
pub struct HeadlessBody {
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub mass: f32,
    pub inertia: Vec3,
    pub motion_kind: MotionKind,
    pub prestep: PrestepMode,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pending_impulse: Vec3,
    #[reflect(ignore)]
    target: Option<(Vec3, Quat)>,
}

impl Default for HeadlessBody {
    fn default() -> Self {
        Self::new(MotionKind::Dynamic)
    }
}

impl HeadlessBody {
    pub fn new(motion_kind: MotionKind) -> Self {
        Self {
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 1.0,
            inertia: Vec3::ONE,
            motion_kind,
            prestep: PrestepMode::Disabled,
            linear_damping: 0.0,
            angular_damping: 0.0,
            pending_impulse: Vec3::ZERO,
            target: None,
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_inertia(mut self, inertia: Vec3) -> Self {
        self.inertia = inertia;
        self
    }

    /// Impulse queued for the next step.
    pub fn pending_impulse(&self) -> Vec3 {
        self.pending_impulse
    }
}

/// Box collider of the headless simulation.
///
/// Colliders sit on a body entity or on a direct child of one. A collider
/// with no body anywhere is treated as static.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct HeadlessCollider {
    pub half_extents: Vec3,
    pub sensor: bool,
}

impl HeadlessCollider {
    pub fn solid(half_extents: Vec3) -> Self {
        Self {
            half_extents,
            sensor: false,
        }
    }

    pub fn sensor(half_extents: Vec3) -> Self {
        Self {
            half_extents,
            sensor: true,
        }
    }
}

/// Gravity of the headless simulation.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct HeadlessGravity(pub Vec3);

impl Default for HeadlessGravity {
    fn default() -> Self {
        Self(Vec3::new(0.0, -9.81, 0.0))
    }
}

/// Sensor overlaps seen on the previous step, as `(sensor, other)` pairs.
#[derive(Resource, Debug, Default)]
pub struct HeadlessContacts {
    overlaps: BTreeSet<(Entity, Entity)>,
}

impl HeadlessContacts {
    pub fn is_overlapping(&self, sensor: Entity, other: Entity) -> bool {
        self.overlaps.contains(&(sensor, other))
    }
}

/// System set of the headless step, in `FixedPostUpdate`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeadlessStepSet;

/// Plugin running the headless simulation after every fixed update.
pub struct HeadlessPhysicsPlugin;

impl Plugin for HeadlessPhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<HeadlessBody>();
        app.register_type::<HeadlessCollider>();
        app.init_resource::<HeadlessGravity>();
        app.init_resource::<HeadlessContacts>();
        app.add_event::<TriggerEvent>();
        app.add_systems(
            FixedPostUpdate,
            (integrate_bodies, resolve_floors, detect_sensor_overlaps)
                .chain()
                .in_set(HeadlessStepSet),
        );
    }
}

/// World-space axis-aligned bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    fn new(center: Vec3, rotation: Quat, half_extents: Vec3) -> Self {
        let m = Mat3::from_quat(rotation);
        let half = m.x_axis.abs() * half_extents.x
            + m.y_axis.abs() * half_extents.y
            + m.z_axis.abs() * half_extents.z;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    fn union(self, other: Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmplt(other.max).all() && other.min.cmplt(self.max).all()
    }

    fn overlaps_xz(&self, other: &Aabb) -> bool {
        self.min.xz().cmplt(other.max.xz()).all() && other.min.xz().cmplt(self.max.xz()).all()
    }
}

/// World transform of a collider, following one level of parenting.
fn collider_world_transform(world: &World, entity: Entity) -> Option<Transform> {
    let local = *world.get::<Transform>(entity)?;
    match world.get::<ChildOf>(entity) {
        Some(child_of) => {
            let parent = world.get::<Transform>(child_of.parent())?;
            Some(parent.mul_transform(local))
        }
        None => Some(local),
    }
}

struct ColliderInfo {
    entity: Entity,
    body: Entity,
    collider: HeadlessCollider,
    bounds: Aabb,
}

fn collect_colliders(world: &mut World) -> Vec<ColliderInfo> {
    let entities: Vec<(Entity, HeadlessCollider)> = world
        .query::<(Entity, &HeadlessCollider)>()
        .iter(world)
        .map(|(e, c)| (e, *c))
        .collect();

    entities
        .into_iter()
        .filter_map(|(entity, collider)| {
            let transform = collider_world_transform(world, entity)?;
            Some(ColliderInfo {
                entity,
                body: HeadlessBackend::body_of(world, entity),
                collider,
                bounds: Aabb::new(transform.translation, transform.rotation, collider.half_extents),
            })
        })
        .collect()
}

fn integrate_rotation(rotation: Quat, angular_velocity: Vec3, dt: f32) -> Quat {
    (Quat::from_scaled_axis(angular_velocity * dt) * rotation).normalize()
}

/// Apply impulses, gravity, damping and target drives, then move bodies.
pub fn integrate_bodies(
    mut bodies: Query<(&mut HeadlessBody, &mut Transform)>,
    gravity: Res<HeadlessGravity>,
    time: Res<Time<Fixed>>,
) {
    let dt = time.timestep().as_secs_f32();
    if dt <= 0.0 {
        return;
    }

    for (mut body, mut transform) in &mut bodies {
        match body.motion_kind {
            MotionKind::Dynamic => {
                let impulse = std::mem::take(&mut body.pending_impulse);
                let mass = body.mass.max(f32::EPSILON);
                let linear_damping = body.linear_damping;
                let angular_damping = body.angular_damping;
                body.velocity += impulse / mass + gravity.0 * dt;
                body.velocity /= 1.0 + dt * linear_damping;
                body.angular_velocity /= 1.0 + dt * angular_damping;
            }
            MotionKind::Animated => {
                body.pending_impulse = Vec3::ZERO;
                if let Some((translation, rotation)) = body.target.take() {
                    body.velocity = (translation - transform.translation) / dt;
                    body.angular_velocity =
                        (rotation * transform.rotation.inverse()).to_scaled_axis() / dt;
                }
            }
            MotionKind::Static => {
                body.pending_impulse = Vec3::ZERO;
                body.target = None;
                continue;
            }
        }

        transform.translation += body.velocity * dt;
        transform.rotation = integrate_rotation(transform.rotation, body.angular_velocity, dt);
    }
}

/// Rest dynamic bodies on the top faces of static and animated boxes.
///
/// A body whose solid colliders dip below a top face while its lowest point
/// is still above the box center is lifted onto the face and inherits the
/// face's vertical velocity if it was moving down relative to it.
pub fn resolve_floors(world: &mut World) {
    let colliders = collect_colliders(world);

    let mut dynamic_bounds: Vec<(Entity, Aabb)> = Vec::new();
    for info in colliders.iter().filter(|c| !c.collider.sensor) {
        if HeadlessBackend::get_motion_kind(world, info.body) != MotionKind::Dynamic {
            continue;
        }
        match dynamic_bounds.iter_mut().find(|(body, _)| *body == info.body) {
            Some((_, bounds)) => *bounds = bounds.union(info.bounds),
            None => dynamic_bounds.push((info.body, info.bounds)),
        }
    }

    for (body, bounds) in dynamic_bounds {
        let mut lift = 0.0f32;
        let mut floor_velocity: Option<f32> = None;

        for solid in colliders.iter().filter(|c| !c.collider.sensor && c.body != body) {
            if HeadlessBackend::get_motion_kind(world, solid.body) == MotionKind::Dynamic {
                continue;
            }
            let top = solid.bounds.max.y;
            let center = (solid.bounds.min.y + top) / 2.0;
            if !bounds.overlaps_xz(&solid.bounds) || bounds.min.y >= top || bounds.min.y < center {
                continue;
            }
            let needed = top - bounds.min.y;
            if needed >= lift {
                lift = needed;
                floor_velocity = Some(HeadlessBackend::get_velocity(world, solid.body).y);
            }
        }

        let Some(floor_vy) = floor_velocity else {
            continue;
        };
        if let Some(mut transform) = world.get_mut::<Transform>(body) {
            transform.translation.y += lift;
        }
        if let Some(mut state) = world.get_mut::<HeadlessBody>(body) {
            if state.velocity.y < floor_vy {
                state.velocity.y = floor_vy;
            }
        }
    }
}

/// Diff sensor overlaps against the previous step and emit trigger events.
pub fn detect_sensor_overlaps(world: &mut World) {
    let colliders = collect_colliders(world);

    let mut current = BTreeSet::new();
    for sensor in colliders.iter().filter(|c| c.collider.sensor) {
        for other in colliders.iter().filter(|c| !c.collider.sensor) {
            if sensor.bounds.overlaps(&other.bounds) {
                current.insert((sensor.entity, other.entity));
            }
        }
    }

    let mut events = Vec::new();
    {
        let mut contacts = world.resource_mut::<HeadlessContacts>();
        for &(sensor, other) in contacts.overlaps.difference(&current) {
            events.push(TriggerEvent::exit(sensor, other));
        }
        for &(sensor, other) in current.difference(&contacts.overlaps) {
            events.push(TriggerEvent::enter(sensor, other));
        }
        contacts.overlaps = current;
    }

    if !events.is_empty() {
        world.send_event_batch(events);
    }
}

/// Headless backend for the character controller.
pub struct HeadlessBackend;

impl CharacterPhysicsBackend for HeadlessBackend {
    fn plugin() -> impl Plugin {
        NoOpBackendPlugin
    }

    fn verify(app: &App) -> Result<(), PhysicsInitError> {
        if app.is_plugin_added::<HeadlessPhysicsPlugin>() {
            Ok(())
        } else {
            Err(PhysicsInitError::BackendMissing {
                backend: "headless",
                plugin: "HeadlessPhysicsPlugin",
            })
        }
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<HeadlessBody>(entity)
            .map(|b| b.velocity)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut body) = world.get_mut::<HeadlessBody>(entity) {
            body.velocity = velocity;
        }
    }

    fn get_angular_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<HeadlessBody>(entity)
            .map(|b| b.angular_velocity)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_angular_velocity(world: &mut World, entity: Entity, angular_velocity: Vec3) {
        if let Some(mut body) = world.get_mut::<HeadlessBody>(entity) {
            body.angular_velocity = angular_velocity;
        }
    }

    /// Impulses act on the center of mass; `point` is ignored.
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3, _point: Vec3) {
        if let Some(mut body) = world.get_mut::<HeadlessBody>(entity) {
            body.pending_impulse += impulse;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        collider_world_transform(world, entity)
            .map(|t| t.translation)
            .unwrap_or(Vec3::ZERO)
    }

    fn get_rotation(world: &World, entity: Entity) -> Quat {
        collider_world_transform(world, entity)
            .map(|t| t.rotation)
            .unwrap_or(Quat::IDENTITY)
    }

    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat) {
        let honoured = world.get::<HeadlessBody>(entity).is_some_and(|b| {
            b.prestep == PrestepMode::Teleport || b.motion_kind == MotionKind::Animated
        });
        if !honoured {
            return;
        }
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.rotation = rotation;
        }
    }

    fn set_target_transform(world: &mut World, entity: Entity, translation: Vec3, rotation: Quat) {
        if let Some(mut body) = world.get_mut::<HeadlessBody>(entity) {
            body.target = Some((translation, rotation));
        }
    }

    fn get_motion_kind(world: &World, entity: Entity) -> MotionKind {
        world
            .get::<HeadlessBody>(Self::body_of(world, entity))
            .map(|b| b.motion_kind)
            .unwrap_or(MotionKind::Static)
    }

    fn set_motion_kind(world: &mut World, entity: Entity, kind: MotionKind) {
        if let Some(mut body) = world.get_mut::<HeadlessBody>(entity) {
            body.motion_kind = kind;
        }
    }

    fn set_prestep_mode(world: &mut World, entity: Entity, mode: PrestepMode) {
        if let Some(mut body) = world.get_mut::<HeadlessBody>(entity) {
            body.prestep = mode;
        }
    }

    fn set_principal_inertia(world: &mut World, entity: Entity, inertia: Vec3) {
        if let Some(mut body) = world.get_mut::<HeadlessBody>(entity) {
            body.inertia = inertia;
        }
    }

    fn get_mass(world: &World, entity: Entity) -> f32 {
        world
            .get::<HeadlessBody>(entity)
            .map(|b| b.mass)
            .unwrap_or(1.0)
    }

    fn body_of(world: &World, collider: Entity) -> Entity {
        if world.get::<HeadlessBody>(collider).is_some() {
            return collider;
        }
        world
            .get::<ChildOf>(collider)
            .map(|c| c.parent())
            .unwrap_or(collider)
    }

    fn character_body(config: &BodyConfig, inertia: Vec3) -> impl Bundle {
        (
            HeadlessBody::new(MotionKind::Dynamic)
                .with_mass(config.mass)
                .with_damping(config.linear_damping, config.angular_damping)
                .with_inertia(inertia),
            HeadlessCollider::solid(Vec3::new(config.radius, config.half_height(), config.radius)),
        )
    }

    fn character_shoes(config: &BodyConfig) -> impl Bundle {
        HeadlessCollider::solid(Vec3::new(
            config.shoe_radius,
            config.shoe_depth / 2.0,
            config.shoe_radius,
        ))
    }

    fn foot_sensor(config: &BodyConfig) -> impl Bundle {
        HeadlessCollider::sensor(Vec3::new(
            config.sensor_radius,
            config.sensor_height / 2.0,
            config.sensor_radius,
        ))
    }

    fn static_box(half_extents: Vec3) -> impl Bundle {
        HeadlessCollider::solid(half_extents)
    }

    fn animated_box(half_extents: Vec3) -> impl Bundle {
        (
            HeadlessBody::new(MotionKind::Animated),
            HeadlessCollider::solid(half_extents),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(HeadlessPhysicsPlugin);
        app.insert_resource(Time::<Fixed>::from_hz(30.0));
        app
    }

    fn step(app: &mut App) {
        app.world_mut().run_schedule(FixedPostUpdate);
    }

    #[test]
    fn impulse_changes_velocity_by_impulse_over_mass() {
        let mut app = create_test_app();
        app.insert_resource(HeadlessGravity(Vec3::ZERO));
        let body = app
            .world_mut()
            .spawn((Transform::default(), HeadlessBody::default().with_mass(2.0)))
            .id();

        HeadlessBackend::apply_impulse(app.world_mut(), body, Vec3::X * 4.0, Vec3::ZERO);
        step(&mut app);

        let velocity = HeadlessBackend::get_velocity(app.world(), body);
        assert!((velocity - Vec3::X * 2.0).length() < 1e-5);
    }

    #[test]
    fn dynamic_body_comes_to_rest_on_a_box() {
        let mut app = create_test_app();
        app.world_mut().spawn((
            Transform::from_xyz(0.0, -0.5, 0.0),
            HeadlessCollider::solid(Vec3::new(10.0, 0.5, 10.0)),
        ));
        let body = app
            .world_mut()
            .spawn((
                Transform::from_xyz(0.0, 2.0, 0.0),
                HeadlessBody::default(),
                HeadlessCollider::solid(Vec3::splat(0.5)),
            ))
            .id();

        for _ in 0..60 {
            step(&mut app);
        }

        let position = HeadlessBackend::get_position(app.world(), body);
        assert!((position.y - 0.5).abs() < 1e-3);
        assert!(HeadlessBackend::get_velocity(app.world(), body).y.abs() < 1e-3);
    }

    #[test]
    fn animated_body_reaches_its_target_in_one_step() {
        let mut app = create_test_app();
        let platform = app
            .world_mut()
            .spawn((Transform::default(), HeadlessBody::new(MotionKind::Animated)))
            .id();

        let rotation = Quat::from_rotation_y(0.1);
        HeadlessBackend::set_target_transform(app.world_mut(), platform, Vec3::Y * 0.1, rotation);
        step(&mut app);

        assert!((HeadlessBackend::get_position(app.world(), platform) - Vec3::Y * 0.1).length() < 1e-5);
        assert!(HeadlessBackend::get_rotation(app.world(), platform).angle_between(rotation) < 1e-4);
        assert!((HeadlessBackend::get_velocity(app.world(), platform).y - 3.0).abs() < 1e-3);
    }

    #[test]
    fn set_rotation_needs_teleport_or_animated() {
        let mut app = create_test_app();
        let body = app
            .world_mut()
            .spawn((Transform::default(), HeadlessBody::default()))
            .id();
        let rotation = Quat::from_rotation_x(0.2);

        HeadlessBackend::set_rotation(app.world_mut(), body, rotation);
        assert_eq!(HeadlessBackend::get_rotation(app.world(), body), Quat::IDENTITY);

        HeadlessBackend::set_prestep_mode(app.world_mut(), body, PrestepMode::Teleport);
        HeadlessBackend::set_rotation(app.world_mut(), body, rotation);
        assert_eq!(HeadlessBackend::get_rotation(app.world(), body), rotation);
    }

    #[test]
    fn sensor_overlaps_produce_enter_then_exit() {
        let mut app = create_test_app();
        let sensor = app
            .world_mut()
            .spawn((Transform::default(), HeadlessCollider::sensor(Vec3::splat(0.5))))
            .id();
        let other = app
            .world_mut()
            .spawn((Transform::from_xyz(0.5, 0.0, 0.0), HeadlessCollider::solid(Vec3::splat(0.5))))
            .id();

        step(&mut app);
        assert!(app.world().resource::<HeadlessContacts>().is_overlapping(sensor, other));

        app.world_mut().get_mut::<Transform>(other).unwrap().translation.x = 3.0;
        step(&mut app);

        let events = app.world().resource::<Events<TriggerEvent>>();
        let sent: Vec<TriggerEvent> = events.iter_current_update_events().copied().collect();
        assert_eq!(
            sent,
            vec![TriggerEvent::enter(sensor, other), TriggerEvent::exit(sensor, other)]
        );
    }

    #[test]
    fn child_collider_resolves_to_parent_body() {
        let mut app = create_test_app();
        let body = app
            .world_mut()
            .spawn((Transform::from_xyz(0.0, 5.0, 0.0), HeadlessBody::new(MotionKind::Animated)))
            .id();
        let child = app
            .world_mut()
            .spawn((
                ChildOf(body),
                Transform::from_xyz(0.0, -1.0, 0.0),
                HeadlessCollider::sensor(Vec3::ONE),
            ))
            .id();

        assert_eq!(HeadlessBackend::body_of(app.world(), child), body);
        assert_eq!(HeadlessBackend::get_motion_kind(app.world(), child), MotionKind::Animated);
        assert_eq!(HeadlessBackend::get_position(app.world(), child), Vec3::new(0.0, 4.0, 0.0));
    }

    #[test]
    fn verify_requires_the_plugin() {
        let app = App::new();
        assert!(HeadlessBackend::verify(&app).is_err());
        assert!(HeadlessBackend::verify(&create_test_app()).is_ok());
    }
}
