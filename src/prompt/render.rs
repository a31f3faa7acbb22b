//! Prompt renderer - named Handlebars templates with no HTML escaping.

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{Result, SimforgeError};
use crate::metadata::ExperimentMetadata;
use crate::prompt::templates;

/// Renders the registered prompt templates.
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl PromptRenderer {
    /// Create a renderer with the default templates registered.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Prompts are plain text; never escape HTML entities
        handlebars.register_escape_fn(handlebars::no_escape);

        let mut renderer = Self { handlebars };
        renderer.register_template("codegen_system", templates::CODEGEN_SYSTEM)?;
        renderer.register_template("codegen_request", templates::CODEGEN_REQUEST)?;
        renderer.register_template("codegen_repair", templates::CODEGEN_REPAIR)?;
        renderer.register_template("agent_system", templates::AGENT_SYSTEM)?;
        Ok(renderer)
    }

    /// Register (or replace) a named template
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| {
                SimforgeError::Template(format!("failed to register template '{}': {}", name, e))
            })
    }

    /// Render a registered template with any serializable context
    pub fn render_named<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        self.handlebars.render(name, context).map_err(|e| {
            SimforgeError::Template(format!("failed to render template '{}': {}", name, e))
        })
    }

    /// Check if a named template is registered
    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.get_template(name).is_some()
    }

    /// System context for candidate generation
    pub fn codegen_system(&self, metadata: &ExperimentMetadata) -> Result<String> {
        self.render_named("codegen_system", metadata)
    }

    /// Initial user turn for candidate generation
    pub fn codegen_request(&self) -> Result<String> {
        self.render_named("codegen_request", &serde_json::json!({}))
    }

    /// Repair-attempt user turn embedding failure feedback
    pub fn codegen_repair(&self, feedback: &str) -> Result<String> {
        self.render_named("codegen_repair", &serde_json::json!({ "feedback": feedback }))
    }

    /// System context for the question-answering agent
    pub fn agent_system(&self, tool_name: &str, columns: &[String]) -> Result<String> {
        self.render_named(
            "agent_system",
            &serde_json::json!({
                "tool_name": tool_name,
                "columns": columns.join(", "),
            }),
        )
    }
}
