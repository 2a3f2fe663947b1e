//! Platformer Example
//!
//! A playable scene with a character on Rapier3D physics featuring:
//! - A wide floor and a large block
//! - A row of slopes with increasing steepness
//! - A velocity-driven lift and a target-driven lift
//! - A rotating disc that speeds up, slows down and reverses
//!
//! ## Controls
//! - **W/A/S/D**: Walk relative to the camera
//! - **Space** (hold): Jump whenever allowed
//! - **Mouse**: Look (click to capture the cursor, Escape to release)
//! - **C**: Toggle first person / orbit camera
//! - **`**: Toggle the debug overlay
//!
//! Pass `first_person` or `orbit` as the first argument to pick the starting
//! camera. The tool prompt at the bottom accepts tool calls such as
//! `<function>{"name": "create_pole", "parameters": {"height": 4, "x": 2, "z": -3, "color": "#ff8800"}}</function>`.

mod helpers;

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_rapier3d::prelude::*;
use helpers::{DemoUiPlugin, Player};
use upright_character_controller::prelude::*;
use upright_character_controller::tool::SpawnedPrimitive;

// ==================== Constants ====================

const GROUND_HALF_SIZE: f32 = 32.0;
const SPAWN_POSITION: Vec3 = Vec3::new(9.0, 13.0, 5.0);

const LIFT_HALF_EXTENTS: Vec3 = Vec3::new(1.0, 0.25, 1.0);
const LIFT_MIN: f32 = 0.25;
const LIFT_MAX: f32 = 6.75;

const DISC_RADIUS: f32 = 5.0;
const DISC_HALF_HEIGHT: f32 = 0.25;

// ==================== Main ====================

fn main() -> Result<(), ConfigError> {
    let camera_mode = match std::env::args().nth(1) {
        Some(name) => name.parse::<CameraMode>()?,
        None => CameraMode::orbit(0.0),
    };

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Upright Platformer - Character Controller Example".into(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))
        // Physics, stepped together with the controller
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
        // Character controller
        .add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default())
        .add_plugins(PlayerInputPlugin)
        .add_plugins(SceneToolPlugin::<Rapier3dBackend>::default())
        // Egui for the overlay and tool prompt
        .add_plugins(EguiPlugin::default())
        .add_plugins(DemoUiPlugin)
        .insert_resource(StartingCamera(camera_mode))
        .add_systems(Startup, setup)
        .add_systems(Update, dress_spawned_primitives)
        .run();

    Ok(())
}

#[derive(Resource)]
struct StartingCamera(CameraMode);

// ==================== Setup ====================

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    starting_camera: Res<StartingCamera>,
) {
    spawn_environment(&mut commands, &mut meshes, &mut materials);
    spawn_platforms(&mut commands, &mut meshes, &mut materials);
    let player = spawn_player(&mut commands, &mut meshes, &mut materials);

    commands.spawn((
        Name::new("Camera"),
        Camera3d::default(),
        Transform::from_translation(SPAWN_POSITION + Vec3::new(0.0, 5.0, 10.0)),
        CameraRig::new(player, starting_camera.0),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(3.0, 10.0, 0.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.insert_resource(AmbientLight {
        brightness: 300.0,
        ..default()
    });
}

fn spawn_environment(
    commands: &mut Commands,
    meshes: &mut ResMut<Assets<Mesh>>,
    materials: &mut ResMut<Assets<StandardMaterial>>,
) {
    // Floor, top face at y = 0
    spawn_static_box(
        commands,
        meshes,
        materials,
        Transform::from_xyz(0.0, -0.5, 0.0),
        Vec3::new(GROUND_HALF_SIZE, 0.5, GROUND_HALF_SIZE),
        Color::srgb(0.2, 0.45, 0.45),
    );

    // Block
    spawn_static_box(
        commands,
        meshes,
        materials,
        Transform::from_xyz(0.0, 3.5, 5.0),
        Vec3::splat(3.5),
        Color::srgb(0.8, 0.8, 0.3),
    );

    // Slopes, each steeper than the last
    for i in 0..10 {
        let transform = Transform::from_xyz(-28.0, 1.0, -5.0 + 4.0 * i as f32)
            .with_rotation(Quat::from_rotation_z(-0.2 - 0.15 * i as f32));
        spawn_static_box(
            commands,
            meshes,
            materials,
            transform,
            Vec3::new(12.0, 0.25, 1.5),
            Color::srgb(0.9, 0.9, 0.9),
        );
    }
}

fn spawn_static_box(
    commands: &mut Commands,
    meshes: &mut ResMut<Assets<Mesh>>,
    materials: &mut ResMut<Assets<StandardMaterial>>,
    transform: Transform,
    half_extents: Vec3,
    color: Color,
) {
    commands.spawn((
        transform,
        Rapier3dBackend::static_box(half_extents),
        Mesh3d(meshes.add(Cuboid::from_size(half_extents * 2.0))),
        MeshMaterial3d(materials.add(color)),
    ));
}

fn spawn_platforms(
    commands: &mut Commands,
    meshes: &mut ResMut<Assets<Mesh>>,
    materials: &mut ResMut<Assets<StandardMaterial>>,
) {
    let lift_mesh = meshes.add(Cuboid::from_size(LIFT_HALF_EXTENTS * 2.0));

    commands.spawn((
        Name::new("Velocity Lift"),
        Transform::from_xyz(4.5, LIFT_MIN, 4.5),
        Rapier3dBackend::animated_box(LIFT_HALF_EXTENTS),
        OscillatingLift::vertical(LIFT_MIN, LIFT_MAX, 1.0).with_drive(LiftDrive::Velocity),
        Mesh3d(lift_mesh.clone()),
        MeshMaterial3d(materials.add(Color::srgb(0.2, 0.8, 0.2))),
    ));

    commands.spawn((
        Name::new("Target Lift"),
        Transform::from_xyz(8.5, LIFT_MIN, 4.5),
        Rapier3dBackend::animated_box(LIFT_HALF_EXTENTS),
        OscillatingLift::vertical(LIFT_MIN, LIFT_MAX, 1.0),
        Mesh3d(lift_mesh),
        MeshMaterial3d(materials.add(Color::srgb(0.6, 0.2, 0.8))),
    ));

    commands.spawn((
        Name::new("Rotating Disc"),
        Transform::from_xyz(10.0, 2.25, -7.0),
        RigidBody::KinematicVelocityBased,
        Velocity::default(),
        Collider::cylinder(DISC_HALF_HEIGHT, DISC_RADIUS),
        Friction::coefficient(0.9),
        RotatingPlatform::oscillating(),
        Mesh3d(meshes.add(Cylinder::new(DISC_RADIUS, DISC_HALF_HEIGHT * 2.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.85, 0.2, 0.2))),
    ));
}

fn spawn_player(
    commands: &mut Commands,
    meshes: &mut ResMut<Assets<Mesh>>,
    materials: &mut ResMut<Assets<StandardMaterial>>,
) -> Entity {
    let config = ControllerConfig::player();
    let player = spawn_character::<Rapier3dBackend>(
        commands,
        Transform::from_translation(SPAWN_POSITION),
        config,
    );

    commands.entity(player).insert((
        Player,
        PlayerInput,
        Mesh3d(meshes.add(Cylinder::new(config.body.radius, config.body.height))),
        MeshMaterial3d(materials.add(Color::srgb(0.3, 0.5, 0.9))),
    ));

    player
}

/// Give boxes spawned by the tool prompt a visible mesh.
fn dress_spawned_primitives(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    added: Query<(Entity, &SpawnedPrimitive, &Collider), Added<SpawnedPrimitive>>,
) {
    for (entity, primitive, collider) in &added {
        let Some(cuboid) = collider.as_cuboid() else {
            continue;
        };
        commands.entity(entity).insert((
            Mesh3d(meshes.add(Cuboid::from_size(cuboid.half_extents() * 2.0))),
            MeshMaterial3d(materials.add(primitive.color)),
        ));
    }
}
