//! Prompt builder for rendering templates and injecting retrieved context.

use std::collections::HashMap;

use handlebars::Handlebars;
use placement_core::{AppError, AppResult};

use crate::templates::{
    ANSWER_TEMPLATE, EXPANSION_TEMPLATE, GROUNDING_RULE, RESUME_CORRECTION_TEMPLATE,
    RESUME_DETAILED_TEMPLATE, RESUME_QUICK_TEMPLATE, SAFETY_PREAMBLE,
};
use crate::types::{ComposedPrompt, ContextPassage, PromptDefinition, ResumePromptKind};

/// ID of the built-in answer prompt.
pub const BUILTIN_ANSWER_ID: &str = "rag.answer.builtin";

/// Compose the grounded answer prompt.
///
/// The safety preamble and grounding rule are always part of the result.
/// A template that leaves out their slots gets them prepended, so an
/// override can reword the layout but cannot drop either section.
///
/// # Example
/// ```
/// use placement_prompt::{compose, ContextPassage};
///
/// let passages = vec![ContextPassage::new("policy.pdf p.1", "Minimum CGPA is 7.0")];
/// let prompt = compose("What is the CGPA cutoff?", &passages, None).unwrap();
/// assert!(prompt.text().contains("Minimum CGPA is 7.0"));
/// ```
pub fn compose(
    question: &str,
    passages: &[ContextPassage],
    definition: Option<&PromptDefinition>,
) -> AppResult<ComposedPrompt> {
    let (template, source_prompt_id) = match definition {
        Some(def) => (def.template.as_str(), def.id.clone()),
        None => (ANSWER_TEMPLATE, BUILTIN_ANSWER_ID.to_string()),
    };

    let context = format_context(passages);

    let mut variables = HashMap::new();
    variables.insert("safety".to_string(), SAFETY_PREAMBLE.to_string());
    variables.insert("grounding".to_string(), GROUNDING_RULE.to_string());
    variables.insert("context".to_string(), context.clone());
    variables.insert("question".to_string(), question.to_string());

    let mut rendered = String::new();
    if !template.contains("{{safety}}") {
        rendered.push_str(SAFETY_PREAMBLE);
        rendered.push_str("\n\n");
    }
    if !template.contains("{{grounding}}") {
        rendered.push_str(GROUNDING_RULE);
        rendered.push_str("\n\n");
    }
    rendered.push_str(&render_template(template, &variables)?);

    tracing::debug!(
        "Composed prompt '{}' with {} passages ({} chars)",
        source_prompt_id,
        passages.len(),
        rendered.len()
    );

    Ok(ComposedPrompt {
        safety: SAFETY_PREAMBLE.to_string(),
        grounding: GROUNDING_RULE.to_string(),
        context,
        question: question.to_string(),
        source_prompt_id,
        rendered,
    })
}

/// Join passages into the context block, each tagged with its provenance.
pub fn format_context(passages: &[ContextPassage]) -> String {
    passages
        .iter()
        .map(|p| format!("[{}]\n{}", p.label, p.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prompt asking for `count` alternative phrasings of a question.
pub fn expansion_prompt(question: &str, count: usize) -> AppResult<String> {
    let mut variables = HashMap::new();
    variables.insert("count".to_string(), count.to_string());
    variables.insert("question".to_string(), question.to_string());
    render_template(EXPANSION_TEMPLATE, &variables)
}

/// Prompt asking for a resume-to-job-description evaluation as JSON.
pub fn resume_prompt(resume: &str, job: &str, kind: ResumePromptKind) -> AppResult<String> {
    let template = match kind {
        ResumePromptKind::Quick => RESUME_QUICK_TEMPLATE,
        ResumePromptKind::Detailed => RESUME_DETAILED_TEMPLATE,
    };

    let mut variables = HashMap::new();
    variables.insert("resume".to_string(), resume.to_string());
    variables.insert("job".to_string(), job.to_string());
    render_template(template, &variables)
}

/// Re-prompt after a reply failed validation: the original prompt plus a correction note.
pub fn resume_correction_prompt(original: &str, error: &str) -> AppResult<String> {
    let mut variables = HashMap::new();
    variables.insert("error".to_string(), error.to_string());
    let note = render_template(RESUME_CORRECTION_TEMPLATE, &variables)?;
    Ok(format!("{}{}", original, note))
}

/// Render a Handlebars template with variables.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
