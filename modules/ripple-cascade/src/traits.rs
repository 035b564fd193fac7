// Trait abstractions for the cascade's external collaborators.
//
// ContentStore — the persistence boundary for Source, Job, and Derivative
//   records. The cascade is the only writer for a given job's rows.
// VisualRenderer — the asynchronous design-rendering service
//   (submit → poll → download).
// DocumentConverter — turns an exported document into one image per page.
// ObjectStore — durable home for converted images, returns public URLs.
//
// These enable deterministic testing with the doubles in `testing`:
// no network, no external binaries. `cargo test` in seconds.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use design_client::{DesignClient, DesignError, GenerationRequest, GenerationStatus};
use ripple_common::{Derivative, Job, Source};

// ---------------------------------------------------------------------------
// ContentStore — the persistence boundary
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_source(&self, id: Uuid) -> Result<Option<Source>>;

    async fn update_source(&self, source: &Source) -> Result<()>;

    async fn create_job(&self, job: &Job) -> Result<()>;

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>>;

    async fn update_job(&self, job: &Job) -> Result<()>;

    async fn insert_derivative(&self, derivative: &Derivative) -> Result<()>;

    async fn update_derivative(&self, derivative: &Derivative) -> Result<()>;

    async fn get_derivative(&self, id: Uuid) -> Result<Option<Derivative>>;

    /// All derivatives belonging to one job, in insertion order.
    async fn derivatives_for_job(&self, job_id: Uuid) -> Result<Vec<Derivative>>;

    /// Clean-rerun delete: remove a source's derivatives from prior jobs,
    /// keeping rows whose editorial status is approved, scheduled, or
    /// published. Returns the number of rows removed.
    async fn delete_unpublished_derivatives(&self, source_id: Uuid) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// VisualRenderer — the design-rendering service
// ---------------------------------------------------------------------------

#[async_trait]
pub trait VisualRenderer: Send + Sync {
    /// Submit a render request. Returns an opaque generation id.
    /// `DesignError::RateLimited` is retryable; everything else is not.
    async fn submit(&self, request: &GenerationRequest) -> Result<String, DesignError>;

    /// Poll a generation once.
    async fn poll(&self, generation_id: &str) -> Result<GenerationStatus, DesignError>;

    /// Download the exported document of a completed generation.
    async fn download(&self, document_url: &str) -> Result<Vec<u8>, DesignError>;
}

#[async_trait]
impl VisualRenderer for DesignClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<String, DesignError> {
        self.submit_generation(request).await
    }

    async fn poll(&self, generation_id: &str) -> Result<GenerationStatus, DesignError> {
        self.get_generation(generation_id).await
    }

    async fn download(&self, document_url: &str) -> Result<Vec<u8>, DesignError> {
        self.download_document(document_url).await
    }
}

// ---------------------------------------------------------------------------
// DocumentConverter / ObjectStore — image post-processing
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert an exported document into one PNG buffer per page, in page
    /// order.
    async fn convert(&self, document: &[u8]) -> Result<Vec<Vec<u8>>>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return a public URL for it.
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<String>;
}
