mod client;
pub(crate) mod types;

use crate::error::{AiError, Result};
use crate::schema::StructuredOutput;

use client::ClaudeClient;
use types::*;

/// The tool the model is forced to call in strict-JSON mode. Its input
/// object IS the structured reply.
const STRUCTURED_TOOL: &str = "structured_response";

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            AiError::Config("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> ClaudeClient {
        let client = ClaudeClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    /// Strict-JSON generation constrained to `schema`. The model is forced
    /// through a single tool call whose input object is returned verbatim.
    pub async fn generate_json(
        &self,
        system: &str,
        prompt: &str,
        schema: serde_json::Value,
        max_tokens: u32,
    ) -> Result<serde_json::Value> {
        let request = ChatRequest::new(&self.model)
            .system(system)
            .message(WireMessage::user(prompt))
            .max_tokens(max_tokens)
            .forced_tool(ToolDefinitionWire {
                name: STRUCTURED_TOOL.to_string(),
                description: "Produce the structured response for this request.".to_string(),
                input_schema: schema,
            });

        let response = self.client().chat(&request).await?;

        response
            .tool_input(STRUCTURED_TOOL)
            .cloned()
            .ok_or(AiError::NoStructuredOutput)
    }

    /// Typed convenience over [`generate_json`]: derives the schema from `T`
    /// and deserializes the reply into it.
    pub async fn extract<T: StructuredOutput>(&self, system: &str, prompt: &str) -> Result<T> {
        let raw = self
            .generate_json(system, prompt, T::tool_schema(), 4096)
            .await?;
        serde_json::from_value(raw)
            .map_err(|e| AiError::Parse(format!("{} deserialization failed: {e}", T::type_name())))
    }
}
