//! Integration tests for the character controller.
//!
//! These tests run the full plugin stack on the headless physics backend and
//! step `FixedMain` by hand, so every run is deterministic. Each test checks
//! observable state: positions, velocities, support counters, inertia and
//! marker components.

use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use bevy::app::FixedMain;
use upright_character_controller::prelude::*;
use upright_character_controller::tool::{SpawnedPrimitive, ToolReply};

/// Create a minimal test app with headless physics and the controller.
fn create_test_app(step: PhysicsStepConfig) -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(HeadlessPhysicsPlugin);
    app.add_plugins(CharacterControllerPlugin::<HeadlessBackend>::new(step));

    app.finish();
    app.cleanup();
    app
}

fn default_app() -> App {
    create_test_app(PhysicsStepConfig::default())
}

/// Spawn a wide static floor whose top face is at y = 0.
fn spawn_ground(app: &mut App) -> Entity {
    app.world_mut()
        .spawn((
            Transform::from_xyz(0.0, -0.5, 0.0),
            HeadlessBackend::static_box(Vec3::new(50.0, 0.5, 50.0)),
        ))
        .id()
}

/// Spawn a character through the public spawn helper.
fn spawn_player(app: &mut App, position: Vec3, config: ControllerConfig) -> Entity {
    let world = app.world_mut();
    let character = spawn_character::<HeadlessBackend>(
        &mut world.commands(),
        Transform::from_translation(position),
        config,
    );
    world.flush();
    character
}

fn foot_sensor_of(app: &mut App, character: Entity) -> Entity {
    app.world_mut()
        .query::<(Entity, &FootSensor)>()
        .iter(app.world())
        .find(|(_, sensor)| sensor.owner == character)
        .map(|(entity, _)| entity)
        .unwrap()
}

/// Run one fixed step: controller systems, then the physics step.
fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedMain);
}

fn run_steps(app: &mut App, steps: usize) {
    for _ in 0..steps {
        tick(app);
    }
}

fn controller(app: &App, entity: Entity) -> &CharacterController {
    app.world().get::<CharacterController>(entity).unwrap()
}

fn body(app: &App, entity: Entity) -> &HeadlessBody {
    app.world().get::<HeadlessBody>(entity).unwrap()
}

fn position(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<Transform>(entity).unwrap().translation
}

fn intent_mut(app: &mut App, entity: Entity) -> Mut<'_, MovementIntent> {
    app.world_mut().get_mut::<MovementIntent>(entity).unwrap()
}

// ==================== Support Tests ====================

mod support {
    use super::*;

    #[test]
    fn character_lands_on_static_ground() {
        let mut app = default_app();
        spawn_ground(&mut app);
        let character = spawn_player(&mut app, Vec3::new(0.0, 1.5, 0.0), ControllerConfig::default());

        run_steps(&mut app, 30);

        let support = &controller(&app, character).support;
        assert_eq!(support.support_count(), 1);
        assert_eq!(support.animated_support_count(), 0);

        // The shoes reach one unit below the body center.
        let y = position(&app, character).y;
        println!("PROOF: landed at y = {y}");
        assert!((y - 1.0).abs() < 0.05);

        assert!(app.world().get::<Grounded>(character).is_some());
        assert!(app.world().get::<Airborne>(character).is_none());

        let inertia = ControllerConfig::default().inertia;
        assert_eq!(
            body(&app, character).inertia,
            Vec3::new(inertia.xz_supported, inertia.y_static, inertia.xz_supported)
        );
    }

    #[test]
    fn airborne_character_has_no_support() {
        let mut app = default_app();
        spawn_ground(&mut app);
        let character = spawn_player(&mut app, Vec3::new(0.0, 20.0, 0.0), ControllerConfig::default());

        run_steps(&mut app, 5);

        assert!(!controller(&app, character).on_support());
        assert!(app.world().get::<Airborne>(character).is_some());
        assert!(body(&app, character).velocity.y < 0.0);
    }

    #[test]
    fn unmatched_exit_is_skipped() {
        let mut app = default_app();
        let ground = spawn_ground(&mut app);
        let character = spawn_player(&mut app, Vec3::new(0.0, 20.0, 0.0), ControllerConfig::default());
        let sensor = foot_sensor_of(&mut app, character);

        app.world_mut().send_event(TriggerEvent::exit(sensor, ground));
        tick(&mut app);

        assert_eq!(controller(&app, character).support.support_count(), 0);
        assert_eq!(controller(&app, character).support.animated_support_count(), 0);
    }

    #[test]
    fn exit_from_another_volume_keeps_platform_support() {
        let mut app = default_app();
        let ground = spawn_ground(&mut app);
        let platform = app
            .world_mut()
            .spawn((
                Transform::from_xyz(40.0, 30.0, 40.0),
                HeadlessBackend::animated_box(Vec3::ONE),
            ))
            .id();
        let character = spawn_player(&mut app, Vec3::new(0.0, 20.0, 0.0), ControllerConfig::default());
        let sensor = foot_sensor_of(&mut app, character);

        app.world_mut().send_event(TriggerEvent::enter(sensor, platform));
        tick(&mut app);
        app.world_mut().send_event(TriggerEvent::exit(sensor, ground));
        tick(&mut app);

        let support = &controller(&app, character).support;
        println!(
            "PROOF: support {} animated {} after a stray exit",
            support.support_count(),
            support.animated_support_count()
        );
        assert_eq!(support.support_count(), 1);
        assert_eq!(support.animated_support_count(), 1);
        assert!(app.world().get::<OnMovingPlatform>(character).is_some());
    }

    #[test]
    fn riding_a_lift_lowers_yaw_inertia() {
        let mut app = default_app();
        let lift = app
            .world_mut()
            .spawn((
                Transform::from_xyz(0.0, -0.5, 0.0),
                HeadlessBackend::animated_box(Vec3::new(3.0, 0.5, 3.0)),
                OscillatingLift::vertical(-0.5, 1.5, 1.0),
            ))
            .id();
        let character = spawn_player(&mut app, Vec3::new(0.0, 1.5, 0.0), ControllerConfig::default());

        run_steps(&mut app, 45);

        let support = &controller(&app, character).support;
        assert_eq!(support.support_count(), 1);
        assert_eq!(support.animated_support_count(), 1);
        assert!(app.world().get::<OnMovingPlatform>(character).is_some());
        assert_eq!(
            body(&app, character).inertia.y,
            ControllerConfig::default().inertia.y_animated
        );

        // Carried up with the lift, feet on its top face.
        let lift_top = position(&app, lift).y + 0.5;
        let feet = position(&app, character).y - 1.0;
        println!("PROOF: lift top {lift_top}, feet {feet}");
        assert!(lift_top > 0.5);
        assert!((feet - lift_top).abs() < 0.1);
    }
}

// ==================== Jump Tests ====================

mod jumping {
    use super::*;

    #[test]
    fn jump_needs_cooldown_and_support() {
        let mut app = default_app();
        spawn_ground(&mut app);
        let character = spawn_player(&mut app, Vec3::new(0.0, 1.0, 0.0), ControllerConfig::default());

        run_steps(&mut app, 3);
        assert!(!controller(&app, character).can_jump());

        run_steps(&mut app, 17);
        assert!(controller(&app, character).can_jump());
        assert!(app.world().get::<CharacterReadout>(character).unwrap().can_jump);
    }

    #[test]
    fn jump_applies_upward_impulse_once() {
        let mut app = default_app();
        spawn_ground(&mut app);
        let character = spawn_player(&mut app, Vec3::new(0.0, 1.5, 0.0), ControllerConfig::default());
        run_steps(&mut app, 30);
        assert!(controller(&app, character).can_jump());

        intent_mut(&mut app, character).set_want_jump(true);
        tick(&mut app);

        let vy = body(&app, character).velocity.y;
        println!("PROOF: vertical velocity after jump = {vy}");
        assert!(vy > 8.0);
        assert!(!controller(&app, character).can_jump());

        // Holding jump does not fire again in the air.
        run_steps(&mut app, 5);
        assert!(body(&app, character).velocity.y < vy);
        assert!(!controller(&app, character).on_support());
    }
}

// ==================== Walking Tests ====================

mod walking {
    use super::*;

    fn walking_app() -> (App, Entity) {
        let mut app = create_test_app(PhysicsStepConfig {
            hz: 20.0,
            ..default()
        });
        spawn_ground(&mut app);
        let config = ControllerConfig::default().with_step_assist(0.0);
        let character = spawn_player(&mut app, Vec3::new(0.0, 1.5, 0.0), config);
        run_steps(&mut app, 40);
        (app, character)
    }

    #[test]
    fn walking_converges_below_max_speed() {
        let (mut app, character) = walking_app();

        intent_mut(&mut app, character).press(WalkKey::Forward);
        run_steps(&mut app, 10);

        let velocity = body(&app, character).velocity;
        let speed = velocity.xz().length();
        println!("PROOF: speed after 500 ms = {speed}");
        assert!(speed <= 5.0 + 1e-3);
        assert!(speed > 4.5);
        assert!(velocity.z < 0.0);
        assert!(velocity.x.abs() < 1e-3);
    }

    #[test]
    fn camera_yaw_steers_walking() {
        let (mut app, character) = walking_app();

        app.world_mut().get_mut::<CameraPose>(character).unwrap().yaw = FRAC_PI_2;
        intent_mut(&mut app, character).press(WalkKey::Forward);
        run_steps(&mut app, 10);

        let velocity = body(&app, character).velocity;
        assert!(velocity.x < -4.5);
        assert!(velocity.z.abs() < 1e-3);
    }

    #[test]
    fn releasing_keys_stops_pushing() {
        let (mut app, character) = walking_app();

        intent_mut(&mut app, character).press(WalkKey::Right);
        run_steps(&mut app, 3);
        intent_mut(&mut app, character).release(WalkKey::Right);
        let before = body(&app, character).velocity.x;
        run_steps(&mut app, 5);

        assert!(before > 0.0);
        assert!(body(&app, character).velocity.x < before);
    }
}

// ==================== Recovery Tests ====================

mod recovery {
    use super::*;

    #[test]
    fn tipped_character_gets_up_and_ends_dynamic() {
        let mut app = default_app();
        spawn_ground(&mut app);
        let character = spawn_player(&mut app, Vec3::new(0.0, 1.5, 0.0), ControllerConfig::default());
        run_steps(&mut app, 30);

        app.world_mut().get_mut::<Transform>(character).unwrap().rotation =
            Quat::from_rotation_x(0.1);

        let mut saw_getting_up = false;
        for _ in 0..15 {
            tick(&mut app);
            saw_getting_up |= app.world().get::<GettingUp>(character).is_some();
        }

        assert!(saw_getting_up);
        let controller = controller(&app, character);
        assert_eq!(controller.recovery_phase(), RecoveryPhase::Stable);
        assert!(controller.tilt <= ControllerConfig::default().upright.epsilon);
        assert_eq!(body(&app, character).motion_kind, MotionKind::Dynamic);
        assert_eq!(body(&app, character).prestep, PrestepMode::Disabled);
        assert!(app.world().get::<GettingUp>(character).is_none());
    }

    #[test]
    fn tilt_in_the_air_is_left_alone() {
        let mut app = default_app();
        let character = spawn_player(&mut app, Vec3::new(0.0, 50.0, 0.0), ControllerConfig::default());
        let rotation = Quat::from_rotation_z(0.3);
        app.world_mut().get_mut::<Transform>(character).unwrap().rotation = rotation;

        run_steps(&mut app, 10);

        assert_eq!(controller(&app, character).recovery_phase(), RecoveryPhase::Stable);
        assert!(app.world().get::<Transform>(character).unwrap().rotation.angle_between(rotation) < 1e-4);
    }
}

// ==================== Plugin Tests ====================

mod plugin {
    use super::*;

    #[test]
    #[should_panic(expected = "HeadlessPhysicsPlugin")]
    fn missing_physics_plugin_is_fatal() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(CharacterControllerPlugin::<HeadlessBackend>::default());
        app.finish();
    }

    #[test]
    fn plugin_sets_fixed_timestep() {
        let app = create_test_app(PhysicsStepConfig {
            hz: 20.0,
            ..default()
        });
        let timestep = app.world().resource::<Time<Fixed>>().timestep();
        assert_eq!(timestep, std::time::Duration::from_millis(50));
    }

    #[test]
    #[should_panic(expected = "step.hz")]
    fn zero_step_rate_is_fatal() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(HeadlessPhysicsPlugin);
        app.add_plugins(CharacterControllerPlugin::<HeadlessBackend>::new(PhysicsStepConfig {
            hz: 0.0,
            ..default()
        }));
    }

    #[test]
    fn tool_reply_spawns_a_static_box() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(HeadlessPhysicsPlugin);
        app.add_plugins(CharacterControllerPlugin::<HeadlessBackend>::default());
        app.add_plugins(SceneToolPlugin::<HeadlessBackend>::default());
        app.finish();
        app.cleanup();

        app.world_mut().send_event(ToolReply(
            r##"<function>{"name": "create_cube", "parameters": {"size": 2, "x": 0, "y": 1, "z": -6, "color": "#ff8800"}}</function>"##
                .to_string(),
        ));
        app.update();

        let boxes: Vec<(Entity, Transform, HeadlessCollider)> = app
            .world_mut()
            .query_filtered::<(Entity, &Transform, &HeadlessCollider), With<SpawnedPrimitive>>()
            .iter(app.world())
            .map(|(e, t, c)| (e, *t, *c))
            .collect();
        assert_eq!(boxes.len(), 1);
        let (entity, transform, collider) = boxes[0];
        assert_eq!(transform.translation, Vec3::new(0.0, 1.0, -6.0));
        assert_eq!(collider.half_extents, Vec3::ONE);
        assert!(!collider.sensor);
        assert_eq!(
            HeadlessBackend::get_motion_kind(app.world(), entity),
            MotionKind::Static
        );
    }
}
