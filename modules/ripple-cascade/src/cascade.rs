//! Top-level cascade orchestration.
//!
//! One forward-only state machine per job:
//! `queued → extracting → generating → imaging → completed`, with `failed`
//! reachable from every non-terminal state. Extraction failures are fatal;
//! the two fan-out stages absorb per-item failures into derivative rows and
//! only surface store failures.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use ai_client::TextGenerator;
use ripple_common::{CascadeError, Catalog, Job, JobStatus, Source, SourceStatus};

use crate::extraction;
use crate::generation::GenerationScheduler;
use crate::planner;
use crate::progress;
use crate::traits::{ContentStore, DocumentConverter, ObjectStore, VisualRenderer};
use crate::visual::VisualScheduler;

pub struct CascadeRunner {
    store: Arc<dyn ContentStore>,
    generator: Arc<dyn TextGenerator>,
    renderer: Arc<dyn VisualRenderer>,
    converter: Arc<dyn DocumentConverter>,
    assets: Arc<dyn ObjectStore>,
    catalog: Catalog,
    brand_voice: Option<String>,
}

impl CascadeRunner {
    pub fn new(
        store: Arc<dyn ContentStore>,
        generator: Arc<dyn TextGenerator>,
        renderer: Arc<dyn VisualRenderer>,
        converter: Arc<dyn DocumentConverter>,
        assets: Arc<dyn ObjectStore>,
        catalog: Catalog,
    ) -> Self {
        Self {
            store,
            generator,
            renderer,
            converter,
            assets,
            catalog,
            brand_voice: None,
        }
    }

    pub fn with_brand_voice(mut self, voice: impl Into<String>) -> Self {
        self.brand_voice = Some(voice.into());
        self
    }

    /// Run one full cascade for a source. Returns the terminal Job record on
    /// success; on failure the Job and Source are left in their terminal
    /// error states and the error propagates to the caller.
    pub async fn run(&self, source_id: Uuid) -> Result<Job, CascadeError> {
        let mut source = self
            .store
            .get_source(source_id)
            .await
            .map_err(|e| CascadeError::Store(e.to_string()))?
            .ok_or(CascadeError::SourceNotFound(source_id))?;

        if source.status == SourceStatus::Processing {
            return Err(CascadeError::AlreadyProcessing(source_id));
        }

        source.status = SourceStatus::Processing;
        source.updated_at = Utc::now();
        self.store
            .update_source(&source)
            .await
            .map_err(|e| CascadeError::Store(e.to_string()))?;

        // Clean rerun: a new cascade owns the source's draft derivatives
        // from any prior job.
        let removed = self
            .store
            .delete_unpublished_derivatives(source.id)
            .await
            .map_err(|e| CascadeError::Store(e.to_string()))?;
        if removed > 0 {
            info!(source_id = %source.id, removed, "Removed derivatives from prior jobs");
        }

        let mut job = Job::new(source.id);
        self.store
            .create_job(&job)
            .await
            .map_err(|e| CascadeError::Store(e.to_string()))?;

        info!(job_id = %job.id, source_id = %source.id, title = %source.title, "Cascade started");

        match self.execute(&mut job, &mut source).await {
            Ok(()) => Ok(job),
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Cascade failed");
                job.status = JobStatus::Failed;
                job.error = Some(e.to_string());
                job.completed_at = Some(Utc::now());
                // Terminal bookkeeping is best-effort: the original error
                // must reach the caller even if the store is down.
                if let Err(store_err) = self.store.update_job(&job).await {
                    error!(job_id = %job.id, error = %store_err, "Failed to record job failure");
                }
                source.status = SourceStatus::Error;
                source.updated_at = Utc::now();
                if let Err(store_err) = self.store.update_source(&source).await {
                    error!(source_id = %source.id, error = %store_err, "Failed to record source error");
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, job: &mut Job, source: &mut Source) -> Result<(), CascadeError> {
        // --- extracting ---
        self.transition(job, JobStatus::Extracting).await?;

        let insights = extraction::extract(self.generator.as_ref(), source).await?;
        source.insights = Some(insights.clone());
        source.updated_at = Utc::now();
        self.store
            .update_source(source)
            .await
            .map_err(|e| CascadeError::Store(e.to_string()))?;

        job.progress = progress::after_extraction();
        self.store
            .update_job(job)
            .await
            .map_err(|e| CascadeError::Store(e.to_string()))?;

        // --- generating ---
        let tasks = planner::plan(&self.catalog, source.variation_count);
        job.total_derivatives = tasks.len() as u32;
        self.transition(job, JobStatus::Generating).await?;
        info!(job_id = %job.id, tasks = tasks.len(), "Planned generation tasks");

        if !tasks.is_empty() {
            GenerationScheduler::new(self.generator.clone(), self.store.clone())
                .run(job, &tasks, &insights, source, self.brand_voice.as_deref())
                .await?;
        }

        // --- imaging ---
        self.transition(job, JobStatus::Imaging).await?;
        let derivatives = self
            .store
            .derivatives_for_job(job.id)
            .await
            .map_err(|e| CascadeError::Store(e.to_string()))?;
        VisualScheduler::new(
            self.renderer.clone(),
            self.converter.clone(),
            self.assets.clone(),
            self.store.clone(),
        )
        .run(job, derivatives, source)
        .await?;

        // --- completed ---
        job.status = JobStatus::Completed;
        job.progress = progress::COMPLETE;
        job.completed_at = Some(Utc::now());
        self.store
            .update_job(job)
            .await
            .map_err(|e| CascadeError::Store(e.to_string()))?;

        source.status = SourceStatus::Completed;
        source.updated_at = Utc::now();
        self.store
            .update_source(source)
            .await
            .map_err(|e| CascadeError::Store(e.to_string()))?;

        info!("{}", JobReadout::from(&*job));
        Ok(())
    }

    async fn transition(&self, job: &mut Job, status: JobStatus) -> Result<(), CascadeError> {
        info!(job_id = %job.id, from = %job.status, to = %status, "Job transition");
        job.status = status;
        self.store
            .update_job(job)
            .await
            .map_err(|e| CascadeError::Store(e.to_string()))
    }
}

/// Human-readable summary of a finished job.
pub struct JobReadout {
    pub status: JobStatus,
    pub progress: u8,
    pub total_derivatives: u32,
    pub completed_derivatives: u32,
    pub total_images: u32,
    pub completed_images: u32,
    pub error: Option<String>,
}

impl From<&Job> for JobReadout {
    fn from(job: &Job) -> Self {
        Self {
            status: job.status,
            progress: job.progress,
            total_derivatives: job.total_derivatives,
            completed_derivatives: job.completed_derivatives,
            total_images: job.total_images,
            completed_images: job.completed_images,
            error: job.error.clone(),
        }
    }
}

impl std::fmt::Display for JobReadout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Cascade Complete ===")?;
        writeln!(f, "Status:      {}", self.status)?;
        writeln!(f, "Progress:    {}%", self.progress)?;
        writeln!(
            f,
            "Derivatives: {}/{}",
            self.completed_derivatives, self.total_derivatives
        )?;
        writeln!(f, "Images:      {}/{}", self.completed_images, self.total_images)?;
        if let Some(error) = &self.error {
            writeln!(f, "Error:       {error}")?;
        }
        Ok(())
    }
}
