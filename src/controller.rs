//! The character controller hub and its per-step logic.
//!
//! [`CharacterController`] holds all simulation state of one character.
//! [`CharacterController::step`] is a pure function of that state, the
//! config, a sample of the body and the input: it returns the physics actions
//! to perform as [`StepCommands`] and never touches the engine itself. The
//! backend-generic system in [`crate::systems`] samples the body, calls
//! `step` and applies the commands.

use std::time::Duration;

use bevy::prelude::*;

use crate::backend::{CharacterPhysicsBackend, MotionKind, PrestepMode};
use crate::camera::CameraPose;
use crate::collision::FootSensor;
use crate::config::{secs, ControllerConfig};
use crate::intent::MovementIntent;
use crate::jumping::JumpGovernor;
use crate::readout::CharacterReadout;
use crate::support::SupportState;
use crate::upright::{corrected_rotation, tilt_of, RecoveryPhase, UprightRecovery};
use crate::walking::{plan_walk_impulse, world_direction};

/// Core character controller component.
///
/// This is the **central hub** for all character controller state: support
/// counters, jump eligibility, recovery phase and the governance cadence.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct CharacterController {
    pub support: SupportState,
    pub jump: JumpGovernor,
    pub recovery: UprightRecovery,
    /// Cadence for locomotion and recovery decisions, coarser than the
    /// physics step so pushes don't stack inside one solver window.
    governance: Timer,
    /// Tilt measured on the last step (radians).
    pub tilt: f32,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self::new(&ControllerConfig::default())
    }
}

impl CharacterController {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            support: SupportState::new(),
            jump: JumpGovernor::new(config.jump.cooldown),
            recovery: UprightRecovery::default(),
            governance: Timer::new(secs(config.walk.governance_interval), TimerMode::Repeating),
            tilt: 0.0,
        }
    }

    /// Standing on anything jumpable.
    pub fn on_support(&self) -> bool {
        self.support.on_support()
    }

    pub fn can_jump(&self) -> bool {
        self.jump.can_jump()
    }

    pub fn recovery_phase(&self) -> RecoveryPhase {
        self.recovery.phase()
    }

    /// Run one fixed step of controller logic.
    ///
    /// Order: measure tilt, jump, advance the jump cooldown, then on
    /// governance ticks walk and run the recovery machine, and finally
    /// correct rotation while recovering.
    pub fn step(
        &mut self,
        config: &ControllerConfig,
        body: &BodySample,
        input: &StepInput,
        delta: Duration,
    ) -> StepCommands {
        let mut commands = StepCommands::default();
        let supported = self.support.on_support();

        let tilt = tilt_of(body.rotation);
        self.tilt = tilt;

        if self.jump.try_jump(input.want_jump, tilt, config.jump.max_tilt) {
            commands.jump_impulse = Some(Vec3::Y * config.jump.impulse * body.mass);
        }
        self.jump.tick(delta, supported);

        self.governance.tick(delta);
        if self.governance.just_finished() {
            if !self.recovery.is_active() && input.local_direction != Vec3::ZERO {
                let direction = world_direction(input.local_direction, input.yaw);
                let step_assist = supported && self.jump.can_jump() && !input.want_jump;
                commands.walk_impulse =
                    plan_walk_impulse(&config.walk, body.linear_velocity, direction, step_assist)
                        .map(|change| change * body.mass);
            }

            let horizontal_speed = body.linear_velocity.xz().length();
            if let Some(transition) = self.recovery.govern(
                supported,
                self.support.on_animated(),
                tilt,
                horizontal_speed,
                &config.upright,
            ) {
                debug!("upright recovery: {:?} at tilt {:.4}", transition, tilt);
                commands.prestep = transition.prestep();
                commands.motion_kind = transition.motion_kind();
            }
        }

        if self.recovery.is_active() {
            commands.angular_velocity = Some(Vec3::ZERO);
            commands.rotation = Some(corrected_rotation(body.rotation, tilt, &config.upright));
        }

        commands
    }
}

/// What the controller reads from the body each step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySample {
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub mass: f32,
}

impl Default for BodySample {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            mass: 1.0,
        }
    }
}

impl BodySample {
    /// Sample a body through the backend.
    pub fn read<B: CharacterPhysicsBackend>(world: &World, entity: Entity) -> Self {
        Self {
            position: B::get_position(world, entity),
            rotation: B::get_rotation(world, entity),
            linear_velocity: B::get_velocity(world, entity),
            mass: B::get_mass(world, entity),
        }
    }
}

/// Input consumed by one step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepInput {
    /// Local direction, `-Z` forward and `+X` right, components in {-1, 0, 1}.
    pub local_direction: Vec3,
    pub want_jump: bool,
    /// World-space yaw the local direction is rotated by.
    pub yaw: f32,
}

impl StepInput {
    pub fn from_intent(intent: &MovementIntent, yaw: f32) -> Self {
        Self {
            local_direction: intent.local_direction(),
            want_jump: intent.want_jump(),
            yaw,
        }
    }
}

/// Physics actions produced by one step, applied in field order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepCommands {
    pub jump_impulse: Option<Vec3>,
    /// Walk push including any step-assist bias.
    pub walk_impulse: Option<Vec3>,
    pub prestep: Option<PrestepMode>,
    pub motion_kind: Option<MotionKind>,
    pub angular_velocity: Option<Vec3>,
    pub rotation: Option<Quat>,
}

impl StepCommands {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Perform the commands on `entity` through the backend.
    pub fn apply<B: CharacterPhysicsBackend>(&self, world: &mut World, entity: Entity) {
        let point = B::get_position(world, entity);
        if let Some(impulse) = self.jump_impulse {
            B::apply_impulse(world, entity, impulse, point);
        }
        if let Some(impulse) = self.walk_impulse {
            B::apply_impulse(world, entity, impulse, point);
        }
        if let Some(mode) = self.prestep {
            B::set_prestep_mode(world, entity, mode);
        }
        if let Some(kind) = self.motion_kind {
            B::set_motion_kind(world, entity, kind);
        }
        if let Some(angular_velocity) = self.angular_velocity {
            B::set_angular_velocity(world, entity, angular_velocity);
        }
        if let Some(rotation) = self.rotation {
            B::set_rotation(world, entity, rotation);
        }
    }
}

/// Spawn a character body with its shoes and foot sensor.
///
/// The body carries the controller, its config, a [`MovementIntent`], a
/// [`CameraPose`] to receive yaw from a camera rig and a
/// [`CharacterReadout`] for display.
pub fn spawn_character<B: CharacterPhysicsBackend>(
    commands: &mut Commands,
    transform: Transform,
    config: ControllerConfig,
) -> Entity {
    let body = &config.body;
    let (yaw, _, _) = transform.rotation.to_euler(EulerRot::YXZ);

    let character = commands
        .spawn((
            Name::new("Character"),
            transform,
            CharacterController::new(&config),
            config,
            MovementIntent::default(),
            CameraPose { yaw, pitch: 0.0 },
            CharacterReadout::default(),
            B::character_body(body, config.inertia.initial()),
        ))
        .id();

    commands.spawn((
        Name::new("Character Shoes"),
        ChildOf(character),
        Transform::from_xyz(0.0, body.shoe_center(), 0.0),
        B::character_shoes(body),
    ));

    commands.spawn((
        Name::new("Foot Sensor"),
        ChildOf(character),
        Transform::from_xyz(0.0, body.sensor_offset, 0.0),
        FootSensor { owner: character },
        B::foot_sensor(body),
    ));

    character
}
