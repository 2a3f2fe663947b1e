//! Plugin for the demo overlay.
//!
//! Adds an always-on frame rate line, the diagnostics window shown while the
//! debug overlay is visible, and the tool prompt.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use upright_character_controller::prelude::*;
use upright_character_controller::tool::ToolReply;

use super::{camera_ui, motion_ui, submit_reply, support_ui, sync_tool_prompt, tool_prompt_ui, ToolPromptState};

/// Marker for the character shown in the overlay.
#[derive(Component)]
pub struct Player;

/// Frames to wait before drawing, so egui is fully initialized.
#[derive(Resource, Default)]
struct OverlayWarmup(u32);

pub struct DemoUiPlugin;

impl Plugin for DemoUiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ToolPromptState>()
            .init_resource::<OverlayWarmup>()
            .add_systems(Update, sync_tool_prompt)
            .add_systems(
                EguiPrimaryContextPass,
                (overlay_ui_system, tool_prompt_ui_system).chain(),
            );
    }
}

fn overlay_ui_system(
    mut contexts: EguiContexts,
    mut warmup: ResMut<OverlayWarmup>,
    overlay: Res<DebugOverlay>,
    frame_rate: Res<FrameRateReadout>,
    players: Query<&CharacterReadout, With<Player>>,
    rigs: Query<&CameraRig>,
) {
    warmup.0 = warmup.0.saturating_add(1);
    if warmup.0 <= 2 {
        return;
    }

    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    egui::Area::new(egui::Id::new("upright_info_area"))
        .fixed_pos(egui::pos2(10.0, 10.0))
        .show(ctx, |ui| {
            ui.colored_label(
                egui::Color32::from_rgb(200, 200, 200),
                format!(
                    "{:.0} FPS | Press {:?} for diagnostics",
                    frame_rate.fps(),
                    overlay.toggle_key
                ),
            );
        });

    if !overlay.visible {
        return;
    }

    let Ok(readout) = players.single() else {
        return;
    };
    let rig = rigs.iter().find(|rig| players.contains(rig.target));

    egui::Window::new("Character Diagnostics")
        .default_pos([10.0, 40.0])
        .default_width(280.0)
        .collapsible(true)
        .resizable(true)
        .show(ctx, |ui| {
            ui.label(format!("Frame rate: {:.1}", frame_rate.fps()));
            ui.separator();
            motion_ui(ui, readout);
            support_ui(ui, readout);
            if let Some(rig) = rig {
                camera_ui(ui, readout, &rig.mode.pose(), rig.mode.name());
            }
        });
}

fn tool_prompt_ui_system(
    mut contexts: EguiContexts,
    warmup: Res<OverlayWarmup>,
    mut state: ResMut<ToolPromptState>,
    mut replies: EventWriter<ToolReply>,
) {
    if warmup.0 <= 2 {
        return;
    }

    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let mut submitted = None;
    egui::TopBottomPanel::bottom("tool_prompt").show(ctx, |ui| {
        submitted = tool_prompt_ui(ui, &mut state);
    });

    if let Some(text) = submitted {
        submit_reply(&mut replies, &mut state, text);
    }
}
