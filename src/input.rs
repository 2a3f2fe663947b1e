//! Keyboard and pointer input.
//!
//! [`PlayerInputPlugin`] writes key changes into the [`MovementIntent`] of
//! every entity marked [`PlayerInput`] and pointer motion into every
//! [`CameraRig`]. Look input only applies while the cursor is captured; a
//! left click captures it and Escape releases it.

use bevy::input::mouse::AccumulatedMouseMotion;
use bevy::input::InputSystem;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, PrimaryWindow};

use crate::camera::CameraRig;
use crate::intent::{MovementIntent, WalkKey};

/// Marks a character driven by the local keyboard.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct PlayerInput;

/// Key assignments.
#[derive(Resource, Reflect, Debug, Clone)]
#[reflect(Resource)]
pub struct InputBindings {
    pub forward: KeyCode,
    pub back: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub jump: KeyCode,
    pub toggle_camera: KeyCode,
    pub release_cursor: KeyCode,
}

impl Default for InputBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            back: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            jump: KeyCode::Space,
            toggle_camera: KeyCode::KeyC,
            release_cursor: KeyCode::Escape,
        }
    }
}

impl InputBindings {
    fn walk_keys(&self) -> [(KeyCode, WalkKey); 4] {
        [
            (self.forward, WalkKey::Forward),
            (self.back, WalkKey::Back),
            (self.left, WalkKey::Left),
            (self.right, WalkKey::Right),
        ]
    }
}

/// Visibility of the debug inspector, flipped by `toggle_key`.
#[derive(Resource, Reflect, Debug, Clone, Copy)]
#[reflect(Resource)]
pub struct DebugOverlay {
    pub visible: bool,
    pub toggle_key: KeyCode,
}

impl Default for DebugOverlay {
    fn default() -> Self {
        Self {
            visible: false,
            toggle_key: KeyCode::Backquote,
        }
    }
}

/// Plugin reading keyboard and pointer input for player characters.
pub struct PlayerInputPlugin;

impl Plugin for PlayerInputPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<PlayerInput>();
        app.register_type::<InputBindings>();
        app.register_type::<DebugOverlay>();
        app.init_resource::<InputBindings>();
        app.init_resource::<DebugOverlay>();
        app.init_resource::<ButtonInput<KeyCode>>();
        app.init_resource::<ButtonInput<MouseButton>>();
        app.init_resource::<AccumulatedMouseMotion>();

        app.add_systems(
            PreUpdate,
            (
                read_movement_keys,
                capture_cursor,
                look_with_pointer,
                toggle_camera_mode,
                toggle_debug_overlay,
            )
                .after(InputSystem),
        );
    }
}

/// Translate WASD and Space into movement intent.
///
/// Only key edges are forwarded for walking, so intent keeps its
/// last-key-wins bookkeeping. Jump follows the held state.
pub fn read_movement_keys(
    keys: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    mut intents: Query<&mut MovementIntent, With<PlayerInput>>,
) {
    for mut intent in &mut intents {
        for (code, key) in bindings.walk_keys() {
            if keys.just_pressed(code) {
                intent.press(key);
            }
            if keys.just_released(code) {
                intent.release(key);
            }
        }

        let want_jump = keys.pressed(bindings.jump);
        if intent.want_jump() != want_jump {
            intent.set_want_jump(want_jump);
        }
    }
}

/// Left click captures the cursor, the release key frees it.
pub fn capture_cursor(
    mouse: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    let Ok(mut window) = windows.single_mut() else {
        return;
    };

    if keys.just_pressed(bindings.release_cursor) {
        window.cursor_options.grab_mode = CursorGrabMode::None;
        window.cursor_options.visible = true;
    } else if mouse.just_pressed(MouseButton::Left)
        && window.cursor_options.grab_mode == CursorGrabMode::None
    {
        window.cursor_options.grab_mode = CursorGrabMode::Locked;
        window.cursor_options.visible = false;
    }
}

/// Pointer motion turns every camera rig while the cursor is captured.
pub fn look_with_pointer(
    motion: Res<AccumulatedMouseMotion>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut rigs: Query<&mut CameraRig>,
) {
    let captured = windows
        .single()
        .is_ok_and(|w| w.cursor_options.grab_mode != CursorGrabMode::None);
    if !captured || motion.delta == Vec2::ZERO {
        return;
    }
    for mut rig in &mut rigs {
        rig.look(motion.delta);
    }
}

pub fn toggle_camera_mode(
    keys: Res<ButtonInput<KeyCode>>,
    bindings: Res<InputBindings>,
    mut rigs: Query<&mut CameraRig>,
) {
    if keys.just_pressed(bindings.toggle_camera) {
        for mut rig in &mut rigs {
            rig.toggle();
        }
    }
}

pub fn toggle_debug_overlay(keys: Res<ButtonInput<KeyCode>>, mut overlay: ResMut<DebugOverlay>) {
    if keys.just_pressed(overlay.toggle_key) {
        overlay.visible = !overlay.visible;
    }
}
