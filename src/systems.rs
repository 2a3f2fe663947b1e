//! Core controller systems.
//!
//! These systems connect the pure controller logic to the ECS. They are
//! generic over the physics backend so the same controller runs on Rapier
//! and on the headless test double.

use bevy::ecs::event::EventCursor;
use bevy::prelude::*;

use crate::backend::{CharacterPhysicsBackend, MotionKind};
use crate::camera::CameraPose;
use crate::collision::{FootSensor, TriggerEvent, TriggerKind};
use crate::config::ControllerConfig;
use crate::controller::{BodySample, CharacterController, StepInput};
use crate::intent::MovementIntent;
use crate::readout::CharacterReadout;
use crate::state::{Airborne, GettingUp, Grounded, OnMovingPlatform};
use crate::support::SupportChange;

/// Feed foot sensor trigger events into each character's support state.
///
/// Events not involving a [`FootSensor`] are ignored, as are overlaps
/// between a sensor and the body it belongs to. Whenever the support flags
/// change the character's principal inertia is re-selected; leaving the last
/// support also withdraws jump eligibility.
pub fn classify_support<B: CharacterPhysicsBackend>(
    world: &mut World,
    mut cursor: Local<EventCursor<TriggerEvent>>,
) {
    let Some(events) = world.get_resource::<Events<TriggerEvent>>() else {
        return;
    };
    let events: Vec<TriggerEvent> = cursor.read(events).copied().collect();

    for event in events {
        for (sensor, other) in [(event.a, event.b), (event.b, event.a)] {
            let Some(owner) = world.get::<FootSensor>(sensor).map(|s| s.owner) else {
                continue;
            };
            if world.get::<FootSensor>(other).is_some() || B::body_of(world, other) == owner {
                continue;
            }

            let animated = B::get_motion_kind(world, other) == MotionKind::Animated;
            let config = world
                .get::<ControllerConfig>(owner)
                .copied()
                .unwrap_or_default();

            let Some(mut controller) = world.get_mut::<CharacterController>(owner) else {
                continue;
            };

            let change = match event.kind {
                TriggerKind::Enter => controller.support.enter(other, animated),
                TriggerKind::Exit => match controller.support.exit(other) {
                    Ok(change) => change,
                    Err(err) => {
                        error!("character {owner}: {err}");
                        continue;
                    }
                },
            };

            if change == SupportChange::Left {
                controller.jump.revoke();
            }
            if !change.changes_inertia() {
                continue;
            }

            debug!(
                "character {owner}: {:?} (support {}, animated {})",
                change,
                controller.support.support_count(),
                controller.support.animated_support_count()
            );
            let inertia = config.inertia.select(&controller.support);
            B::set_principal_inertia(world, owner, inertia);
        }
    }
}

/// Run one controller step for every character and apply the result.
///
/// Input is rotated by the yaw published in [`CameraPose`]; characters
/// without one use their own heading.
pub fn drive_characters<B: CharacterPhysicsBackend>(world: &mut World) {
    let delta = B::get_fixed_timestep(world);

    let characters: Vec<(Entity, ControllerConfig, MovementIntent, Option<CameraPose>)> = world
        .query_filtered::<(
            Entity,
            &ControllerConfig,
            Option<&MovementIntent>,
            Option<&CameraPose>,
        ), With<CharacterController>>()
        .iter(world)
        .map(|(e, config, intent, pose)| {
            (e, *config, intent.cloned().unwrap_or_default(), pose.copied())
        })
        .collect();

    for (entity, config, intent, pose) in characters {
        let body = BodySample::read::<B>(world, entity);
        let yaw = match pose {
            Some(pose) => pose.yaw,
            None => body.rotation.to_euler(EulerRot::YXZ).0,
        };
        let input = StepInput::from_intent(&intent, yaw);

        let Some(mut controller) = world.get_mut::<CharacterController>(entity) else {
            continue;
        };
        let commands = controller.step(&config, &body, &input, delta);
        let readout = CharacterReadout::capture(&controller, &body);

        if commands.jump_impulse.is_some() {
            debug!("character {entity} jumped");
        }
        commands.apply::<B>(world, entity);

        if let Some(mut stored) = world.get_mut::<CharacterReadout>(entity) {
            *stored = readout;
        }
    }
}

/// Sync state marker components with the controller state.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(
        Entity,
        &CharacterController,
        Has<Grounded>,
        Has<Airborne>,
        Has<OnMovingPlatform>,
        Has<GettingUp>,
    )>,
) {
    for (entity, controller, has_grounded, has_airborne, has_platform, has_getting_up) in
        &q_controllers
    {
        let grounded = controller.on_support();
        if grounded && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !grounded && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }

        let on_platform = controller.support.on_animated();
        if on_platform && !has_platform {
            commands.entity(entity).insert(OnMovingPlatform);
        } else if !on_platform && has_platform {
            commands.entity(entity).remove::<OnMovingPlatform>();
        }

        let getting_up = controller.recovery.is_active();
        if getting_up && !has_getting_up {
            commands.entity(entity).insert(GettingUp);
        } else if !getting_up && has_getting_up {
            commands.entity(entity).remove::<GettingUp>();
        }
    }
}
