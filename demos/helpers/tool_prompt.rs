//! Text prompt feeding replies to the scene tool.
//!
//! Whatever is typed is handed to the tool as a model reply, so tool calls
//! can be entered directly. Walking input is suspended while the prompt has
//! keyboard focus.

use bevy::prelude::*;
use bevy_egui::egui;
use upright_character_controller::prelude::*;
use upright_character_controller::tool::ToolReply;

/// Prompt contents and the last correction returned by the tool.
#[derive(Resource, Default)]
pub struct ToolPromptState {
    pub input: String,
    pub last_feedback: Option<String>,
    pub focused: bool,
}

/// Renders the prompt and sends a reply on Enter.
///
/// Returns the text to submit, if any.
pub fn tool_prompt_ui(ui: &mut egui::Ui, state: &mut ToolPromptState) -> Option<String> {
    let mut submitted = None;

    ui.horizontal(|ui| {
        ui.label("Tool call:");
        let response = ui.add(
            egui::TextEdit::singleline(&mut state.input)
                .desired_width(f32::INFINITY)
                .hint_text("<function>{\"name\": \"create_cube\", ...}</function>"),
        );
        state.focused = response.has_focus();

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            let text = state.input.trim().to_string();
            if !text.is_empty() {
                submitted = Some(text);
                state.input.clear();
            }
        }
    });

    if let Some(feedback) = &state.last_feedback {
        ui.colored_label(egui::Color32::from_rgb(230, 160, 60), feedback);
    }

    submitted
}

/// Collects tool feedback and keeps player input suspended while typing.
pub fn sync_tool_prompt(
    mut state: ResMut<ToolPromptState>,
    mut feedback: EventReader<ToolFeedback>,
    mut intents: Query<&mut MovementIntent, With<PlayerInput>>,
) {
    if let Some(ToolFeedback(message)) = feedback.read().last() {
        state.last_feedback = Some(message.clone());
    }

    for mut intent in &mut intents {
        if intent.is_enabled() == state.focused {
            intent.set_enabled(!state.focused);
        }
    }
}

pub fn submit_reply(replies: &mut EventWriter<ToolReply>, state: &mut ToolPromptState, text: String) {
    state.last_feedback = None;
    replies.write(ToolReply(text));
}
