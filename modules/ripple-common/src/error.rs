use thiserror::Error;
use uuid::Uuid;

/// Fatal, job-level failures. Per-task failures never surface here — they are
/// absorbed into the owning Derivative's failure markers.
#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("Source not found: {0}")]
    SourceNotFound(Uuid),

    #[error("Source {0} is already processing")]
    AlreadyProcessing(Uuid),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Extraction produced an empty required field: {0}")]
    EmptyRequiredField(&'static str),

    #[error("Source {0} has no extraction result")]
    NoExtraction(Uuid),

    #[error("Template {0} has no visual spec")]
    NoVisualSpec(String),

    #[error("Derivative not found: {0}")]
    DerivativeNotFound(Uuid),

    #[error("Template not found in catalog: {0}")]
    TemplateNotFound(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
