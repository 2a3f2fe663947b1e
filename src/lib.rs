//! # `upright_character_controller`
//!
//! A 3D rigid-body character controller that keeps a dynamic capsule upright
//! on static ground and on moving platforms, with physics backend abstraction.
//!
//! This crate provides a character controller that:
//! - Classifies support from foot sensor trigger events, counting static and
//!   moving platforms separately
//! - Walks with governed horizontal impulses that never overshoot the speed limit
//! - Jumps with a cooldown decoupled from touching the ground
//! - Swaps the body's inertia as support changes, so it resists tipping on
//!   the ground yet turns with a rotating platform
//! - Detects tipping and re-levels the body with a small recovery state machine
//! - Abstracts the physics backend (Rapier3D included, plus a headless double)
//!
//! ## Architecture
//!
//! Every fixed step runs, in order:
//! 1. Platform scripts move animated bodies
//! 2. Backend glue turns engine contacts into [`TriggerEvent`](collision::TriggerEvent)s
//! 3. The support classifier updates counters and inertia
//! 4. The controller steps every character and applies impulses
//! 5. State markers are synced
//!
//! The physics engine integrates afterwards. Camera rigs follow in
//! `PostUpdate` and publish the view yaw the controller walks by.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use upright_character_controller::prelude::*;
//!
//! fn setup(mut commands: Commands) {
//!     let character = spawn_character::<HeadlessBackend>(
//!         &mut commands,
//!         Transform::from_xyz(0.0, 3.0, 0.0),
//!         ControllerConfig::player(),
//!     );
//!     commands.spawn((Transform::default(), CameraRig::new(character, CameraMode::orbit(0.0))));
//! }
//!
//! let mut app = App::new();
//! app.add_plugins(MinimalPlugins)
//!     .add_plugins(HeadlessPhysicsPlugin)
//!     .add_plugins(CharacterControllerPlugin::<HeadlessBackend>::default())
//!     .add_systems(Startup, setup);
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod camera;
pub mod collision;
pub mod config;
pub mod controller;
pub mod error;
pub mod headless;
pub mod input;
pub mod intent;
pub mod jumping;
pub mod platforms;
pub mod readout;
pub mod state;
pub mod support;
pub mod systems;
pub mod tool;
pub mod upright;
pub mod walking;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{CharacterPhysicsBackend, MotionKind, PrestepMode};
    pub use crate::camera::{CameraMode, CameraPose, CameraRig};
    pub use crate::collision::{FootSensor, TriggerEvent, TriggerKind};
    pub use crate::config::{BodyConfig, ControllerConfig, PhysicsStepConfig};
    pub use crate::controller::{spawn_character, CharacterController};
    pub use crate::error::{ConfigError, PhysicsInitError, SupportError, ToolError};
    pub use crate::headless::{HeadlessBackend, HeadlessBody, HeadlessCollider, HeadlessPhysicsPlugin};
    pub use crate::input::{DebugOverlay, PlayerInput, PlayerInputPlugin};
    pub use crate::intent::{MovementIntent, WalkKey};
    pub use crate::jumping::JumpConfig;
    pub use crate::platforms::{LiftDrive, OscillatingLift, RotatingPlatform};
    pub use crate::readout::{coordinate_probe, CharacterReadout, FrameRateReadout};
    pub use crate::state::{Airborne, GettingUp, Grounded, OnMovingPlatform};
    pub use crate::support::{InertiaConfig, SupportState};
    pub use crate::tool::{SceneTool, SceneToolPlugin, SpawnBoxRequest, ToolFeedback, ToolOutcome};
    pub use crate::upright::{RecoveryPhase, UprightConfig};
    pub use crate::walking::WalkConfig;
    pub use crate::CharacterControllerPlugin;
    pub use crate::CharacterControllerSet;

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::Rapier3dBackend;
}

/// System sets for the character controller, chained in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterControllerSet {
    /// Platform scripts move animated bodies.
    Platforms,
    /// Backends forward engine contacts as trigger events.
    Sensors,
    /// Trigger events update support state and inertia.
    Support,
    /// The controller step.
    Motion,
    /// Marker components are synced.
    Markers,
}

/// Main plugin for the character controller system.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (impulses, velocities, inertia edits, trigger events).
///
/// The engine itself must be added separately. If it is missing the plugin
/// panics in [`Plugin::finish`], before the app starts running.
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use upright_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
///     .add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct CharacterControllerPlugin<B: backend::CharacterPhysicsBackend> {
    /// Fixed-step rate and the per-frame step cap.
    pub step: config::PhysicsStepConfig,
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for CharacterControllerPlugin<B> {
    fn default() -> Self {
        Self::new(config::PhysicsStepConfig::default())
    }
}

impl<B: backend::CharacterPhysicsBackend> CharacterControllerPlugin<B> {
    pub fn new(step: config::PhysicsStepConfig) -> Self {
        Self {
            step,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for CharacterControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<controller::CharacterController>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<config::PhysicsStepConfig>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<camera::CameraPose>();
        app.register_type::<camera::CameraRig>();
        app.register_type::<collision::FootSensor>();
        app.register_type::<readout::CharacterReadout>();
        app.register_type::<platforms::OscillatingLift>();
        app.register_type::<platforms::RotatingPlatform>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::OnMovingPlatform>();
        app.register_type::<state::GettingUp>();

        if let Err(err) = self.step.validate() {
            panic!("{err}");
        }
        app.insert_resource(self.step);
        app.insert_resource(Time::<Fixed>::from_duration(self.step.timestep()));
        app.init_resource::<readout::FrameRateReadout>();
        app.add_event::<collision::TriggerEvent>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.configure_sets(
            FixedUpdate,
            (
                CharacterControllerSet::Platforms,
                CharacterControllerSet::Sensors,
                CharacterControllerSet::Support,
                CharacterControllerSet::Motion,
                CharacterControllerSet::Markers,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            (
                (platforms::drive_lifts::<B>, platforms::spin_platforms::<B>)
                    .chain()
                    .in_set(CharacterControllerSet::Platforms),
                systems::classify_support::<B>.in_set(CharacterControllerSet::Support),
                systems::drive_characters::<B>.in_set(CharacterControllerSet::Motion),
                systems::sync_state_markers.in_set(CharacterControllerSet::Markers),
            ),
        );

        app.add_systems(
            PostUpdate,
            camera::update_camera_rigs.before(bevy::transform::TransformSystem::TransformPropagate),
        );
        app.add_systems(Update, readout::update_frame_rate);
    }

    fn finish(&self, app: &mut App) {
        if let Err(err) = B::verify(app) {
            panic!("{err}");
        }

        // Cap the virtual clock so a slow frame runs at most
        // `max_steps_per_frame` fixed steps.
        if let Some(mut time) = app.world_mut().get_resource_mut::<Time<Virtual>>() {
            time.set_max_delta(self.step.max_frame_delta());
        }
    }
}
