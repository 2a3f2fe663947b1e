//! Scene-editing tool calls.
//!
//! A text generator (not part of this crate) is asked to answer with a tool
//! call such as
//!
//! ```text
//! <function>{"name": "create_cube", "parameters": {"size": 2, "x": 0, "y": 1, "z": -6, "color": "#ff8800"}}</function>
//! ```
//!
//! [`SceneTool`] takes that raw reply, validates it and either produces a
//! [`SpawnBoxRequest`] or a correction message to send back to the
//! generator. Spawned boxes are ordinary static bodies; the controller never
//! learns where they came from.

use bevy::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::backend::CharacterPhysicsBackend;
use crate::error::ToolError;

/// Names of the tools [`SceneTool`] understands.
pub const TOOL_NAMES: [&str; 3] = ["create_box", "create_cube", "create_pole"];

const DEFAULT_POLE_THICKNESS: f32 = 0.2;

/// How a generator wraps its tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolCallFormat {
    /// `<function>{...}</function>`, nothing else in the reply.
    #[default]
    FunctionTag,
    /// JSON inside triple backticks, possibly with a language tag.
    Fenced,
    /// The reply is the JSON object itself.
    Bare,
}

/// Pull the JSON payload out of a generator reply.
pub fn extract_tool_call(reply: &str, format: ToolCallFormat) -> Result<String, ToolError> {
    let reply = reply.trim();
    let json = match format {
        ToolCallFormat::FunctionTag => reply
            .strip_prefix("<function>")
            .and_then(|rest| rest.strip_suffix("</function>"))
            .ok_or(ToolError::NoToolCall)?
            .to_string(),
        ToolCallFormat::Fenced => {
            let (_, opened) = reply.split_once("```").ok_or(ToolError::NoToolCall)?;
            // Language tag, if any, runs up to the first non-alphanumeric char.
            let tag_len = opened
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(opened.len());
            let body = &opened[tag_len..];
            body.split_once("```")
                .map_or(body, |(inside, _)| inside)
                .to_string()
        }
        ToolCallFormat::Bare => reply.to_string(),
    };

    let json = json.trim();
    if json.is_empty() {
        return Err(ToolError::NoToolCall);
    }
    Ok(json.to_string())
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parameters: Map<String, Value>,
}

/// Result of applying one reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Applied(SpawnBoxRequest),
    /// Human readable correction for the generator.
    Feedback(String),
}

impl ToolOutcome {
    /// Message to send back to the generator for another attempt, if any.
    pub fn follow_up(&self) -> Option<String> {
        match self {
            ToolOutcome::Applied(_) => None,
            ToolOutcome::Feedback(feedback) => Some(format!(
                "Very good! Can you do this one more fix to it: {feedback}"
            )),
        }
    }
}

/// Request to place a static box in the scene.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct SpawnBoxRequest {
    pub half_extents: Vec3,
    pub position: Vec3,
    pub color: Color,
}

/// A raw generator reply to apply.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ToolReply(pub String);

/// A reply was rejected; the text is the correction message.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ToolFeedback(pub String);

/// Marks a box spawned through a tool call.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct SpawnedPrimitive {
    pub color: Color,
}

/// Validates tool calls and turns them into spawn requests.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SceneTool {
    pub format: ToolCallFormat,
}

impl SceneTool {
    pub fn new(format: ToolCallFormat) -> Self {
        Self { format }
    }

    /// Apply a raw reply. Never fails: problems come back as feedback.
    pub fn apply(&self, reply: &str) -> ToolOutcome {
        match self.try_apply(reply) {
            Ok(request) => ToolOutcome::Applied(request),
            Err(err) => ToolOutcome::Feedback(err.to_string()),
        }
    }

    pub fn try_apply(&self, reply: &str) -> Result<SpawnBoxRequest, ToolError> {
        let json = extract_tool_call(reply, self.format)?;
        let call: ToolCall =
            serde_json::from_str(&json).map_err(|e| ToolError::Malformed(e.to_string()))?;
        let name = call
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(ToolError::MissingName)?;
        let params = Parameters {
            values: &call.parameters,
            tool: "",
        };

        match name.trim() {
            "create_box" => create_box(params.for_tool("create_box")),
            "create_cube" => create_cube(params.for_tool("create_cube")),
            "create_pole" => create_pole(params.for_tool("create_pole")),
            other => Err(ToolError::UnknownTool {
                name: other.to_string(),
                available: TOOL_NAMES.join(", "),
            }),
        }
    }

    /// JSON schemas of the tools, for a generator's system prompt.
    pub fn schemas() -> Value {
        fn number(description: &str) -> Value {
            serde_json::json!({ "type": "number", "description": description })
        }
        let color = serde_json::json!({ "type": "string", "description": "hex color such as #ff8800" });

        serde_json::json!([
            {
                "name": "create_box",
                "description": "Create a static box centered at a position.",
                "parameters": {
                    "width": number("size along x"),
                    "height": number("size along y"),
                    "depth": number("size along z"),
                    "x": number("center x"),
                    "y": number("center y"),
                    "z": number("center z"),
                    "color": color,
                },
                "required": ["width", "height", "depth", "x", "y", "z", "color"],
            },
            {
                "name": "create_cube",
                "description": "Create a static cube centered at a position.",
                "parameters": {
                    "size": number("edge length"),
                    "x": number("center x"),
                    "y": number("center y"),
                    "z": number("center z"),
                    "color": color,
                },
                "required": ["size", "x", "y", "z", "color"],
            },
            {
                "name": "create_pole",
                "description": "Create a vertical pole standing on the ground.",
                "parameters": {
                    "height": number("pole height"),
                    "x": number("x position"),
                    "z": number("z position"),
                    "thickness": number("pole thickness, default 0.2"),
                    "color": color,
                },
                "required": ["height", "x", "z", "color"],
            },
        ])
    }
}

#[derive(Clone, Copy)]
struct Parameters<'a> {
    values: &'a Map<String, Value>,
    tool: &'static str,
}

impl<'a> Parameters<'a> {
    fn for_tool(self, tool: &'static str) -> Self {
        Self { tool, ..self }
    }

    fn invalid(&self, parameter: &'static str, reason: impl Into<String>) -> ToolError {
        ToolError::InvalidParameter {
            tool: self.tool,
            parameter,
            reason: reason.into(),
        }
    }

    fn optional_number(&self, parameter: &'static str) -> Result<Option<f32>, ToolError> {
        let Some(value) = self.values.get(parameter) else {
            return Ok(None);
        };
        // Generators often quote numbers.
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match number {
            Some(n) if n.is_finite() => Ok(Some(n as f32)),
            _ => Err(self.invalid(parameter, "must be a number")),
        }
    }

    fn number(&self, parameter: &'static str) -> Result<f32, ToolError> {
        self.optional_number(parameter)?
            .ok_or(ToolError::MissingParameter {
                tool: self.tool,
                parameter,
            })
    }

    fn size(&self, parameter: &'static str) -> Result<f32, ToolError> {
        let value = self.number(parameter)?;
        if value > 0.0 {
            Ok(value)
        } else {
            Err(self.invalid(parameter, "must be greater than zero"))
        }
    }

    fn color(&self, parameter: &'static str) -> Result<Color, ToolError> {
        let value = self.values.get(parameter).ok_or(ToolError::MissingParameter {
            tool: self.tool,
            parameter,
        })?;
        value
            .as_str()
            .and_then(|s| Srgba::hex(s.trim()).ok())
            .map(Color::from)
            .ok_or_else(|| self.invalid(parameter, "must be a hex color such as #ff8800"))
    }
}

fn create_box(params: Parameters) -> Result<SpawnBoxRequest, ToolError> {
    let size = Vec3::new(
        params.size("width")?,
        params.size("height")?,
        params.size("depth")?,
    );
    Ok(SpawnBoxRequest {
        half_extents: size / 2.0,
        position: Vec3::new(params.number("x")?, params.number("y")?, params.number("z")?),
        color: params.color("color")?,
    })
}

fn create_cube(params: Parameters) -> Result<SpawnBoxRequest, ToolError> {
    let size = params.size("size")?;
    Ok(SpawnBoxRequest {
        half_extents: Vec3::splat(size / 2.0),
        position: Vec3::new(params.number("x")?, params.number("y")?, params.number("z")?),
        color: params.color("color")?,
    })
}

fn create_pole(params: Parameters) -> Result<SpawnBoxRequest, ToolError> {
    let height = params.size("height")?;
    let thickness = match params.optional_number("thickness")? {
        Some(t) if t > 0.0 => t,
        Some(_) => return Err(params.invalid("thickness", "must be greater than zero")),
        None => DEFAULT_POLE_THICKNESS,
    };
    Ok(SpawnBoxRequest {
        half_extents: Vec3::new(thickness, height, thickness) / 2.0,
        position: Vec3::new(params.number("x")?, height / 2.0, params.number("z")?),
        color: params.color("color")?,
    })
}

/// Apply queued replies.
pub fn apply_tool_replies(
    tool: Res<SceneTool>,
    mut replies: EventReader<ToolReply>,
    mut requests: EventWriter<SpawnBoxRequest>,
    mut feedback: EventWriter<ToolFeedback>,
) {
    for ToolReply(reply) in replies.read() {
        match tool.apply(reply) {
            ToolOutcome::Applied(request) => {
                requests.write(request);
            }
            ToolOutcome::Feedback(message) => {
                warn!("tool call rejected: {message}");
                feedback.write(ToolFeedback(message));
            }
        }
    }
}

/// Spawn a static box for every request.
pub fn spawn_requested_boxes<B: CharacterPhysicsBackend>(
    mut commands: Commands,
    mut requests: EventReader<SpawnBoxRequest>,
) {
    for request in requests.read() {
        debug!(
            "spawning tool box at {} with half extents {}",
            request.position, request.half_extents
        );
        commands.spawn((
            Name::new("Tool Box"),
            Transform::from_translation(request.position),
            SpawnedPrimitive {
                color: request.color,
            },
            B::static_box(request.half_extents),
        ));
    }
}

/// Plugin wiring [`ToolReply`] events to spawned boxes.
pub struct SceneToolPlugin<B: CharacterPhysicsBackend> {
    pub format: ToolCallFormat,
    _marker: std::marker::PhantomData<B>,
}

impl<B: CharacterPhysicsBackend> Default for SceneToolPlugin<B> {
    fn default() -> Self {
        Self::new(ToolCallFormat::default())
    }
}

impl<B: CharacterPhysicsBackend> SceneToolPlugin<B> {
    pub fn new(format: ToolCallFormat) -> Self {
        Self {
            format,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: CharacterPhysicsBackend> Plugin for SceneToolPlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<SpawnedPrimitive>();
        app.insert_resource(SceneTool::new(self.format));
        app.add_event::<ToolReply>();
        app.add_event::<ToolFeedback>();
        app.add_event::<SpawnBoxRequest>();
        app.add_systems(
            Update,
            (apply_tool_replies, spawn_requested_boxes::<B>).chain(),
        );
    }
}
