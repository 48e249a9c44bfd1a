//! Content safety thresholds sent with generation requests.
//!
//! Names serialize to the wire identifiers used by the Gemini API so the
//! settings can be passed through unchanged.

use serde::{Deserialize, Serialize};

/// Harm category a threshold applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        HarmCategory::Harassment,
        HarmCategory::HateSpeech,
        HarmCategory::SexuallyExplicit,
        HarmCategory::DangerousContent,
    ];
}

/// Probability level at which content gets blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockThreshold {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

/// One category/threshold pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: BlockThreshold,
}

/// The full set of thresholds for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SafetySettings(pub Vec<SafetySetting>);

impl SafetySettings {
    /// Block at low probability and above in every category.
    pub fn strict() -> Self {
        Self::uniform(BlockThreshold::BlockLowAndAbove)
    }

    /// Apply one threshold to every category.
    pub fn uniform(threshold: BlockThreshold) -> Self {
        Self(
            HarmCategory::ALL
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold,
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SafetySetting> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_covers_every_category() {
        let settings = SafetySettings::strict();
        assert_eq!(settings.0.len(), 4);
        assert!(settings
            .iter()
            .all(|s| s.threshold == BlockThreshold::BlockLowAndAbove));
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(SafetySettings::strict()).unwrap();
        assert_eq!(json[0]["category"], "HARM_CATEGORY_HARASSMENT");
        assert_eq!(json[0]["threshold"], "BLOCK_LOW_AND_ABOVE");
        assert_eq!(json[3]["category"], "HARM_CATEGORY_DANGEROUS_CONTENT");
    }
}
