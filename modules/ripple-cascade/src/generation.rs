//! Batched text-generation stage.
//!
//! Tasks run in consecutive fixed-size batches: every call in a batch is
//! issued concurrently, and the scheduler waits for the whole batch to
//! settle before starting the next one. In-flight external calls are
//! therefore bounded by `GENERATION_CONCURRENCY` at all times, and each
//! batch boundary is a natural progress checkpoint.

use std::sync::Arc;

use chrono::Utc;
use futures::future;
use tracing::{info, warn};
use uuid::Uuid;

use ai_client::TextGenerator;
use ripple_common::{
    ArticleInsights, CascadeError, Derivative, DerivativeContent, DerivativeStatus, Job, Source,
};

use crate::planner::GenerationTask;
use crate::progress;
use crate::prompts::{build_generation_prompt, GENERATION_SYSTEM_PROMPT};
use crate::traits::ContentStore;

/// Max concurrent text-generation calls.
pub const GENERATION_CONCURRENCY: usize = 5;
pub const GENERATION_MAX_TOKENS: u32 = 2048;

/// Failure-marker content for a task whose generation call failed. The error
/// lands in the primary text so it stays visible without log access.
pub fn failure_content(error: &str) -> DerivativeContent {
    DerivativeContent {
        primary_text: format!("⚠️ Generation failed: {error}"),
        generation_error: Some(error.to_string()),
        ..Default::default()
    }
}

pub struct GenerationScheduler {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn ContentStore>,
}

impl GenerationScheduler {
    pub fn new(generator: Arc<dyn TextGenerator>, store: Arc<dyn ContentStore>) -> Self {
        Self { generator, store }
    }

    /// Run every planned task to exactly one persisted Derivative.
    ///
    /// A failed call never cancels its batch siblings and never fails the
    /// job: the task still yields a row carrying the failure marker. Only a
    /// store write failure is fatal here.
    pub async fn run(
        &self,
        job: &mut Job,
        tasks: &[GenerationTask],
        insights: &ArticleInsights,
        source: &Source,
        brand_voice: Option<&str>,
    ) -> Result<(), CascadeError> {
        for batch in tasks.chunks(GENERATION_CONCURRENCY) {
            let calls = batch.iter().map(|task| {
                let prompt =
                    build_generation_prompt(task, insights, source, brand_voice, source.variation_count);
                async move {
                    self.generator
                        .generate_structured(GENERATION_SYSTEM_PROMPT, &prompt, GENERATION_MAX_TOKENS)
                        .await
                }
            });

            // Settle the whole batch; outcomes come back in task order.
            let outcomes = future::join_all(calls).await;

            for (task, outcome) in batch.iter().zip(outcomes) {
                let content = match outcome {
                    Ok(raw) => crate::normalize::normalize(raw, &task.template_slug),
                    Err(e) => {
                        warn!(
                            template = %task.template_slug,
                            platform = %task.platform_id,
                            variation = task.variation_index,
                            error = %e,
                            "Generation task failed, persisting failure marker"
                        );
                        failure_content(&e.to_string())
                    }
                };

                let now = Utc::now();
                let derivative = Derivative {
                    id: Uuid::new_v4(),
                    source_id: source.id,
                    job_id: job.id,
                    platform_id: task.platform_id.clone(),
                    template_id: task.template_id.clone(),
                    template_slug: task.template_slug.clone(),
                    variation_index: task.variation_index,
                    content,
                    status: DerivativeStatus::Draft,
                    created_at: now,
                    updated_at: now,
                };
                self.store
                    .insert_derivative(&derivative)
                    .await
                    .map_err(|e| CascadeError::Store(e.to_string()))?;

                job.completed_derivatives += 1;
            }

            job.progress =
                progress::during_generation(job.completed_derivatives, job.total_derivatives);
            self.store
                .update_job(job)
                .await
                .map_err(|e| CascadeError::Store(e.to_string()))?;

            info!(
                job_id = %job.id,
                completed = job.completed_derivatives,
                total = job.total_derivatives,
                progress = job.progress,
                "Generation batch settled"
            );
        }

        Ok(())
    }
}
