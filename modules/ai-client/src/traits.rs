use async_trait::async_trait;
use serde_json::Value;

use crate::claude::Claude;
use crate::error::Result;

/// The text-generation seam the cascade core consumes. Both methods are
/// strict-JSON only: the reply is always a single JSON object, never prose.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a free-shape JSON object. The caller's prompt dictates the
    /// fields; the wire layer only guarantees "one object".
    async fn generate_structured(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<Value>;

    /// Generate a JSON object constrained to the given schema.
    async fn generate_with_schema(
        &self,
        system: &str,
        prompt: &str,
        schema: Value,
        max_tokens: u32,
    ) -> Result<Value>;
}

#[async_trait]
impl TextGenerator for Claude {
    async fn generate_structured(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<Value> {
        // Permissive object schema: any fields, but always an object.
        let schema = serde_json::json!({
            "type": "object",
            "additionalProperties": true,
        });
        self.generate_json(system, prompt, schema, max_tokens).await
    }

    async fn generate_with_schema(
        &self,
        system: &str,
        prompt: &str,
        schema: Value,
        max_tokens: u32,
    ) -> Result<Value> {
        self.generate_json(system, prompt, schema, max_tokens).await
    }
}
