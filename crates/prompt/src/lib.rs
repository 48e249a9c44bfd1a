//! Prompt system for the placement assistant.
//!
//! This crate owns every prompt the assistant sends:
//! - The grounded answer prompt with its safety preamble
//! - The query expansion prompt
//! - The resume matching prompts
//!
//! Templates are Handlebars strings. The answer template can be overridden
//! per workspace with a YAML prompt definition.

pub mod builder;
pub mod loader;
pub mod templates;
pub mod types;

// Re-export main types
pub use builder::{
    compose, expansion_prompt, format_context, render_template, resume_correction_prompt,
    resume_prompt,
};
pub use loader::{answer_definition, load_prompt};
pub use templates::{NOT_IN_CONTEXT, REFUSAL_MESSAGE};
pub use types::{ComposedPrompt, ContextPassage, PromptDefinition, ResumePromptKind};
