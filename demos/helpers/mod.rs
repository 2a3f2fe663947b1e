//! Helper modules for the demo.
//!
//! This module provides the egui overlay and the tool prompt.

mod diagnostics_panel;
mod plugin;
mod tool_prompt;

pub use diagnostics_panel::*;
pub use plugin::*;
pub use tool_prompt::*;
