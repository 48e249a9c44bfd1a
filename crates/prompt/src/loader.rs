//! Prompt loader for workspace YAML prompt definitions.

use std::path::Path;

use placement_core::{AppError, AppResult};

use crate::types::PromptDefinition;

/// ID of the answer prompt a workspace may override.
pub const ANSWER_PROMPT_ID: &str = "rag.answer";

/// Load a prompt definition by ID from the workspace.
///
/// Searches for `<id>.yml` in the `.placement/prompts/` directory.
///
/// # Example
/// ```no_run
/// use placement_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompt_path(workspace_path, prompt_id);

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// The workspace override for the answer prompt, if one exists.
///
/// Returns `Ok(None)` when no override file is present, so callers fall back
/// to the built-in template. An override must keep the `{{context}}` and
/// `{{question}}` slots.
pub fn answer_definition(workspace_path: &Path) -> AppResult<Option<PromptDefinition>> {
    if !prompt_path(workspace_path, ANSWER_PROMPT_ID).exists() {
        return Ok(None);
    }

    let definition = load_prompt(workspace_path, ANSWER_PROMPT_ID)?;
    for slot in ["{{context}}", "{{question}}"] {
        if !definition.template.contains(slot) {
            return Err(AppError::Prompt(format!(
                "Prompt '{}' must contain the {} slot",
                definition.id, slot
            )));
        }
    }

    Ok(Some(definition))
}

fn prompt_path(workspace_path: &Path, prompt_id: &str) -> std::path::PathBuf {
    workspace_path
        .join(".placement/prompts")
        .join(format!("{}.yml", prompt_id))
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    // Validate API version format (simple check)
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
