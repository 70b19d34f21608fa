//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are loaded from the filesystem (default: `templates/`
//! directory) so operators can tune event flavor without recompiling.
//! Every rendered prompt pairs the shared `situation.j2` system message,
//! which carries the company context, with a task-specific user message.

use std::path::Path;

use boardroom_types::InterventionKind;
use minijinja::Environment;

use crate::error::PipelineError;

/// Template names loaded at startup. `situation` is the system message;
/// the rest are user messages for each generation task.
const TEMPLATE_NAMES: [&str; 7] = [
    "situation",
    "event",
    "rumor",
    "audit",
    "edict",
    "commentary",
    "reaction",
];

/// Manages prompt template loading and rendering.
///
/// Wraps a `minijinja` [`Environment`] with all generation templates
/// pre-loaded. Templates can be edited on disk and will be picked up on
/// the next call to [`PromptEngine::new`].
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the company and the output contract.
    pub system: String,
    /// User message describing the concrete generation task.
    pub user: String,
}

impl PromptEngine {
    /// Create a new prompt engine loading templates from the given directory.
    ///
    /// The directory must contain `situation.j2`, `event.j2`, `rumor.j2`,
    /// `audit.j2`, `edict.j2`, `commentary.j2`, and `reaction.j2`.
    pub fn new(templates_dir: &Path) -> Result<Self, PipelineError> {
        let mut env = Environment::new();

        for name in TEMPLATE_NAMES {
            let source = load_template(templates_dir, name)?;
            env.add_template_owned(name.to_owned(), source).map_err(|e| {
                PipelineError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }

        Ok(Self { env })
    }

    /// Render the prompt for a scheduled cycle event.
    pub fn render_event(
        &self,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, PipelineError> {
        self.render_pair("event", context)
    }

    /// Render the prompt for an intervention of the given kind.
    pub fn render_intervention(
        &self,
        kind: InterventionKind,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, PipelineError> {
        self.render_pair(kind.as_str(), context)
    }

    /// Render the prompt asking executives to comment on an event.
    pub fn render_commentary(
        &self,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, PipelineError> {
        self.render_pair("commentary", context)
    }

    /// Render the prompt asking feed personas to react to an event.
    pub fn render_reaction(
        &self,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, PipelineError> {
        self.render_pair("reaction", context)
    }

    /// Render the shared system message plus the named user template.
    fn render_pair(
        &self,
        name: &str,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, PipelineError> {
        Ok(RenderedPrompt {
            system: self.render_one("situation", context)?,
            user: self.render_one(name, context)?,
        })
    }

    fn render_one(
        &self,
        name: &str,
        context: &serde_json::Value,
    ) -> Result<String, PipelineError> {
        self.env
            .get_template(name)
            .map_err(|e| PipelineError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map_err(|e| PipelineError::Template(format!("{name} render failed: {e}")))
    }
}

/// Read a template file from disk.
fn load_template(dir: &Path, name: &str) -> Result<String, PipelineError> {
    let path = dir.join(format!("{name}.j2"));
    std::fs::read_to_string(&path).map_err(|e| {
        PipelineError::Template(format!("failed to read {}: {e}", path.display()))
    })
}
