//! Prompt types for the placement assistant.

use serde::{Deserialize, Serialize};

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Optional notes for whoever maintains the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// One retrieved passage as it appears in the prompt context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPassage {
    /// Provenance tag, e.g. `quicklinks.pdf p.3 #1`
    pub label: String,

    /// Passage text
    pub text: String,
}

impl ContextPassage {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// A grounded answer prompt whose sections can be inspected separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposedPrompt {
    /// Safety preamble, including the literal refusal message
    pub safety: String,

    /// Grounding rule, including the literal not-in-context phrase
    pub grounding: String,

    /// Retrieved passages tagged with provenance
    pub context: String,

    /// The user's question
    pub question: String,

    /// Source prompt ID (built-in or workspace override)
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    pub(crate) rendered: String,
}

impl ComposedPrompt {
    /// The full prompt text sent to the model.
    pub fn text(&self) -> &str {
        &self.rendered
    }
}

/// Which resume matching prompt to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePromptKind {
    /// Match percentage only
    Quick,
    /// Percentage plus keywords, summary and recommendations
    Detailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: rag.answer
title: Placement answer
apiVersion: "1.0"
template: "{{context}} / {{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "rag.answer");
        assert_eq!(def.api_version, "1.0");
        assert!(def.description.is_none());
    }
}
