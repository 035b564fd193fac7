pub mod error;
pub mod types;

pub use error::{DesignError, Result};
pub use types::{GenerationCreated, GenerationRequest, GenerationState, GenerationStatus};

use std::time::Duration;

const BASE_URL: &str = "https://public-api.gamma.app/v0.2";

pub struct DesignClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl DesignClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Start a design generation. Returns immediately with an opaque
    /// generation id; the document is produced asynchronously.
    pub async fn submit_generation(&self, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/generations", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let body = resp.text().await.unwrap_or_default();
            return Err(DesignError::RateLimited(body));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DesignError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let created: GenerationCreated = resp.json().await?;
        tracing::debug!(generation_id = %created.generation_id, "Design generation started");
        Ok(created.generation_id)
    }

    /// Poll a generation once. The caller owns the polling cadence.
    pub async fn get_generation(&self, generation_id: &str) -> Result<GenerationStatus> {
        let url = format!("{}/generations/{}", self.base_url, generation_id);
        let resp = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let body = resp.text().await.unwrap_or_default();
            return Err(DesignError::RateLimited(body));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DesignError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Download the exported document from a completed generation.
    pub async fn download_document(&self, document_url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(document_url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DesignError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = resp.bytes().await?;
        tracing::debug!(bytes = bytes.len(), "Downloaded exported document");
        Ok(bytes.to_vec())
    }
}
