use serde::{Deserialize, Serialize};

/// Input for one design generation. `input_text` carries the card-by-card
/// content; the remaining knobs steer layout and theming.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub input_text: String,
    /// "social" for single-card posts, "presentation" for carousels.
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_cards: Option<u32>,
    /// How the service splits `input_text` into cards, e.g. "inputTextBreaks".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_split: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_instructions: Option<String>,
    /// Export format for the finished document; we always ask for "pdf".
    pub export_as: String,
}

impl GenerationRequest {
    pub fn new(input_text: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            format: format.into(),
            theme_name: None,
            num_cards: None,
            card_split: None,
            additional_instructions: None,
            export_as: "pdf".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationCreated {
    pub generation_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatus {
    pub generation_id: String,
    pub status: GenerationState,
    /// Present once `status` is `completed`.
    pub document_url: Option<String>,
    /// Present once `status` is `failed`.
    pub error_message: Option<String>,
}
