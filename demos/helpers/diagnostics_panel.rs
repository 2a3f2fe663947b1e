//! Read-only diagnostics for the player character.

use bevy_egui::egui;
use upright_character_controller::prelude::*;

const GOOD: egui::Color32 = egui::Color32::from_rgb(100, 200, 100);
const BAD: egui::Color32 = egui::Color32::from_rgb(200, 100, 100);
const MUTED: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);

fn row(ui: &mut egui::Ui, label: &str, value: String) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.label(value);
    });
}

/// Renders the position and velocity section.
pub fn motion_ui(ui: &mut egui::Ui, readout: &CharacterReadout) {
    ui.collapsing("Position & Velocity", |ui| {
        let p = readout.position;
        let v = readout.velocity;
        row(ui, "Position:", format!("({:.2}, {:.2}, {:.2})", p.x, p.y, p.z));
        row(ui, "Velocity:", format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z));
        row(ui, "Horizontal speed:", format!("{:.2}", readout.horizontal_speed));
        row(ui, "Tilt:", format!("{:.4} rad", readout.tilt));
    });
}

/// Renders the support and jump section.
pub fn support_ui(ui: &mut egui::Ui, readout: &CharacterReadout) {
    ui.collapsing("Support", |ui| {
        let supported = readout.support_count > 0;
        ui.horizontal(|ui| {
            ui.label("State:");
            ui.colored_label(
                if supported { GOOD } else { BAD },
                if supported { "SUPPORTED" } else { "AIRBORNE" },
            );
        });
        row(ui, "Supports:", readout.support_count.to_string());
        row(ui, "Moving supports:", readout.animated_support_count.to_string());
        ui.horizontal(|ui| {
            ui.label("Can jump:");
            ui.colored_label(
                if readout.can_jump { GOOD } else { MUTED },
                if readout.can_jump { "Yes" } else { "No" },
            );
        });
        row(ui, "Recovery:", format!("{:?}", readout.phase));
    });
}

/// Renders the camera section, including the coordinate probe.
pub fn camera_ui(ui: &mut egui::Ui, readout: &CharacterReadout, pose: &CameraPose, mode: &str) {
    ui.collapsing("Camera", |ui| {
        row(ui, "Mode:", mode.to_string());
        row(
            ui,
            "Yaw / pitch:",
            format!("{:.1} / {:.1} deg", pose.yaw.to_degrees(), pose.pitch.to_degrees()),
        );
        let probe = readout.probe(pose);
        row(ui, "Looking at:", format!("({}, {}, {})", probe.x, probe.y, probe.z));
    });
}
