//! Batched image-rendering stage.
//!
//! A smaller world than text generation: fewer concurrent requests (the
//! renderer is costlier and rate-limited), and each request is a little
//! lifecycle of its own — submit, poll until the document exists, download
//! it, convert to one image per page, upload each image. Every step can fail
//! per-item without touching siblings or the job.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future;
use tracing::{debug, info, warn};
use uuid::Uuid;

use design_client::{DesignError, GenerationRequest, GenerationState};
use ripple_common::{CascadeError, Derivative, DerivativeContent, ImageStatus, Job, Source};

use crate::progress;
use crate::traits::{ContentStore, DocumentConverter, ObjectStore, VisualRenderer};

/// Max concurrent render lifecycles.
pub const IMAGE_CONCURRENCY: usize = 2;
/// Delay between status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Poll ceiling; with the interval this bounds a render to five minutes.
pub const POLL_MAX_ATTEMPTS: u32 = 60;
/// Rate-limit retries beyond the initial submission attempt.
pub const SUBMIT_MAX_RETRIES: u32 = 2;
/// Base backoff for rate-limited submissions. Actual delay is base * 2^attempt.
const SUBMIT_RETRY_BASE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Visual specs — template kind → render request strategy
// ---------------------------------------------------------------------------

/// Source context a render request can draw on beyond the derivative's own
/// content.
pub struct RenderContext<'a> {
    pub source_title: &'a str,
    pub pillar: &'a str,
    pub variation_index: u32,
}

/// One template kind's recipe for turning generated text into a render
/// request. Returns `None` to decline when required content is missing.
pub trait VisualSpec: Send + Sync {
    fn build_request(
        &self,
        content: &DerivativeContent,
        ctx: &RenderContext,
    ) -> Option<GenerationRequest>;
}

struct CarouselSpec;

impl VisualSpec for CarouselSpec {
    fn build_request(
        &self,
        content: &DerivativeContent,
        ctx: &RenderContext,
    ) -> Option<GenerationRequest> {
        let slides = content.slides.as_ref().filter(|s| !s.is_empty())?;
        let input_text = slides
            .iter()
            .map(|s| format!("# {}\n{}", s.title, s.body))
            .collect::<Vec<_>>()
            .join("\n---\n");

        let mut request = GenerationRequest::new(input_text, "presentation");
        request.num_cards = Some(slides.len() as u32);
        request.card_split = Some("inputTextBreaks".to_string());
        request.additional_instructions = Some(instructions(content, ctx));
        Some(request)
    }
}

struct QuoteCardSpec;

impl VisualSpec for QuoteCardSpec {
    fn build_request(
        &self,
        content: &DerivativeContent,
        ctx: &RenderContext,
    ) -> Option<GenerationRequest> {
        if content.primary_text.trim().is_empty() {
            return None;
        }
        let mut request = GenerationRequest::new(content.primary_text.clone(), "social");
        request.num_cards = Some(1);
        request.additional_instructions = Some(format!(
            "Single typographic quote card. {}",
            instructions(content, ctx)
        ));
        Some(request)
    }
}

struct InfographicSpec;

impl VisualSpec for InfographicSpec {
    fn build_request(
        &self,
        content: &DerivativeContent,
        ctx: &RenderContext,
    ) -> Option<GenerationRequest> {
        if content.primary_text.trim().is_empty() {
            return None;
        }
        let mut request = GenerationRequest::new(content.primary_text.clone(), "social");
        request.num_cards = Some(1);
        request.additional_instructions = Some(format!(
            "Dense single-card infographic layout. {}",
            instructions(content, ctx)
        ));
        Some(request)
    }
}

struct MemeCardSpec;

impl VisualSpec for MemeCardSpec {
    fn build_request(
        &self,
        content: &DerivativeContent,
        ctx: &RenderContext,
    ) -> Option<GenerationRequest> {
        let meme = content.meme.as_ref()?;
        let mut request = GenerationRequest::new(
            format!("TOP: {}\nBOTTOM: {}", meme.top, meme.bottom),
            "social",
        );
        request.num_cards = Some(1);
        request.additional_instructions = Some(format!(
            "Two-line meme card, bold condensed type. {}",
            instructions(content, ctx)
        ));
        Some(request)
    }
}

fn instructions(content: &DerivativeContent, ctx: &RenderContext) -> String {
    let mut parts = vec![format!("Content pillar: {}.", ctx.pillar)];
    if let Some(direction) = &content.visual_direction {
        parts.push(direction.clone());
    }
    parts.join(" ")
}

static CAROUSEL: CarouselSpec = CarouselSpec;
static QUOTE_CARD: QuoteCardSpec = QuoteCardSpec;
static INFOGRAPHIC: InfographicSpec = InfographicSpec;
static MEME_CARD: MemeCardSpec = MemeCardSpec;

/// Registry mapping template slugs to render strategies. Templates without
/// an entry never enter the imaging phase.
pub fn visual_spec_for(template_slug: &str) -> Option<&'static dyn VisualSpec> {
    match template_slug {
        s if s.contains("carousel") => Some(&CAROUSEL),
        "quote-card" | "quote-graphic" => Some(&QUOTE_CARD),
        "infographic" | "stat-card" => Some(&INFOGRAPHIC),
        s if s.contains("meme") => Some(&MEME_CARD),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Render lifecycle — submit, poll, download, convert, upload
// ---------------------------------------------------------------------------

/// Terminal poll states. Timeout is deliberately distinct from a
/// renderer-reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { document_url: String },
    Failed(String),
    TimedOut,
}

/// Submit a render request, transparently retrying rate limits with capped
/// exponential backoff. Any other error fails immediately.
pub async fn submit_with_retry(
    renderer: &dyn VisualRenderer,
    request: &GenerationRequest,
) -> Result<String, String> {
    let mut attempt = 0u32;
    loop {
        match renderer.submit(request).await {
            Ok(generation_id) => return Ok(generation_id),
            Err(DesignError::RateLimited(msg)) if attempt < SUBMIT_MAX_RETRIES => {
                let backoff = SUBMIT_RETRY_BASE * 2u32.pow(attempt);
                warn!(
                    attempt = attempt + 1,
                    backoff_secs = backoff.as_secs(),
                    "Render submission rate limited, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(format!("Submission failed: {e}")),
        }
    }
}

/// Poll a generation until it terminates or the attempt ceiling is hit.
pub async fn poll_until_done(renderer: &dyn VisualRenderer, generation_id: &str) -> PollOutcome {
    for attempt in 1..=POLL_MAX_ATTEMPTS {
        tokio::time::sleep(POLL_INTERVAL).await;
        match renderer.poll(generation_id).await {
            Ok(status) => match status.status {
                GenerationState::Completed => match status.document_url {
                    Some(document_url) => return PollOutcome::Completed { document_url },
                    None => {
                        return PollOutcome::Failed(
                            "Renderer reported completed with no document URL".to_string(),
                        )
                    }
                },
                GenerationState::Failed => {
                    return PollOutcome::Failed(
                        status
                            .error_message
                            .unwrap_or_else(|| "Renderer reported failure".to_string()),
                    )
                }
                GenerationState::Pending => {
                    debug!(generation_id, attempt, "Render still pending");
                }
            },
            Err(e) => return PollOutcome::Failed(format!("Status poll failed: {e}")),
        }
    }
    PollOutcome::TimedOut
}

/// Run one full render lifecycle for one derivative. Returns the uploaded
/// image URLs, or a human-readable reason on any per-item failure.
async fn render_one(
    renderer: &dyn VisualRenderer,
    converter: &dyn DocumentConverter,
    assets: &dyn ObjectStore,
    request: &GenerationRequest,
    derivative_id: Uuid,
) -> Result<Vec<String>, String> {
    let generation_id = submit_with_retry(renderer, request).await?;

    let document_url = match poll_until_done(renderer, &generation_id).await {
        PollOutcome::Completed { document_url } => document_url,
        PollOutcome::Failed(reason) => return Err(format!("Render failed: {reason}")),
        PollOutcome::TimedOut => {
            return Err(format!(
                "Render timed out after {} polls",
                POLL_MAX_ATTEMPTS
            ))
        }
    };

    let document = renderer
        .download(&document_url)
        .await
        .map_err(|e| format!("Download failed: {e}"))?;

    let pages = converter
        .convert(&document)
        .await
        .map_err(|e| format!("Conversion failed: {e}"))?;
    if pages.is_empty() {
        return Err("Conversion produced no pages".to_string());
    }

    let mut image_urls = Vec::with_capacity(pages.len());
    for (index, page) in pages.into_iter().enumerate() {
        let key = format!("{derivative_id}/{}.png", index + 1);
        let url = assets
            .upload(&key, page)
            .await
            .map_err(|e| format!("Upload failed: {e}"))?;
        image_urls.push(url);
    }

    Ok(image_urls)
}

// ---------------------------------------------------------------------------
// VisualScheduler
// ---------------------------------------------------------------------------

pub struct VisualScheduler {
    renderer: Arc<dyn VisualRenderer>,
    converter: Arc<dyn DocumentConverter>,
    assets: Arc<dyn ObjectStore>,
    store: Arc<dyn ContentStore>,
}

impl VisualScheduler {
    pub fn new(
        renderer: Arc<dyn VisualRenderer>,
        converter: Arc<dyn DocumentConverter>,
        assets: Arc<dyn ObjectStore>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            renderer,
            converter,
            assets,
            store,
        }
    }

    /// Render every eligible derivative of one job, in fixed-size batches.
    ///
    /// Eligibility is template-driven: only slugs with a registered visual
    /// spec enter the phase. Everything that goes wrong for one item lands
    /// on that item's `image_status`/`image_error`; only store failures are
    /// fatal.
    pub async fn run(
        &self,
        job: &mut Job,
        derivatives: Vec<Derivative>,
        source: &Source,
    ) -> Result<(), CascadeError> {
        let mut eligible: Vec<Derivative> = derivatives
            .into_iter()
            .filter(|d| visual_spec_for(&d.template_slug).is_some())
            .collect();

        job.total_images = eligible.len() as u32;
        self.store
            .update_job(job)
            .await
            .map_err(|e| CascadeError::Store(e.to_string()))?;

        if eligible.is_empty() {
            return Ok(());
        }

        info!(
            job_id = %job.id,
            eligible = eligible.len(),
            "Starting image rendering"
        );

        for derivative in eligible.iter_mut() {
            derivative.content.image_status = ImageStatus::Pending;
            derivative.updated_at = Utc::now();
            self.store
                .update_derivative(derivative)
                .await
                .map_err(|e| CascadeError::Store(e.to_string()))?;
        }

        let total = eligible.len();
        for batch_start in (0..total).step_by(IMAGE_CONCURRENCY) {
            let batch_end = (batch_start + IMAGE_CONCURRENCY).min(total);
            let batch = &mut eligible[batch_start..batch_end];

            for derivative in batch.iter_mut() {
                derivative.content.image_status = ImageStatus::Generating;
                derivative.updated_at = Utc::now();
                self.store
                    .update_derivative(derivative)
                    .await
                    .map_err(|e| CascadeError::Store(e.to_string()))?;
            }

            let outcomes =
                future::join_all(batch.iter().map(|d| self.render_derivative(d, source))).await;

            for (derivative, outcome) in batch.iter_mut().zip(outcomes) {
                match outcome {
                    Ok(image_urls) => {
                        derivative.content.image_urls = image_urls;
                        derivative.content.image_status = ImageStatus::Completed;
                        derivative.content.image_error = None;
                    }
                    Err(reason) => {
                        warn!(
                            derivative_id = %derivative.id,
                            template = %derivative.template_slug,
                            reason = %reason,
                            "Image rendering failed for derivative"
                        );
                        derivative.content.image_status = ImageStatus::Failed;
                        derivative.content.image_error = Some(reason);
                    }
                }
                derivative.updated_at = Utc::now();
                self.store
                    .update_derivative(derivative)
                    .await
                    .map_err(|e| CascadeError::Store(e.to_string()))?;

                job.completed_images += 1;
            }

            job.progress = progress::during_imaging(job.completed_images, job.total_images);
            self.store
                .update_job(job)
                .await
                .map_err(|e| CascadeError::Store(e.to_string()))?;

            info!(
                job_id = %job.id,
                completed = job.completed_images,
                total = job.total_images,
                progress = job.progress,
                "Imaging batch settled"
            );
        }

        Ok(())
    }

    async fn render_derivative(
        &self,
        derivative: &Derivative,
        source: &Source,
    ) -> Result<Vec<String>, String> {
        if derivative.content.generation_error.is_some() {
            return Err("No text content to render (generation failed)".to_string());
        }

        let Some(spec) = visual_spec_for(&derivative.template_slug) else {
            return Err(format!(
                "No visual spec registered for template {}",
                derivative.template_slug
            ));
        };

        let ctx = RenderContext {
            source_title: &source.title,
            pillar: &source.pillar,
            variation_index: derivative.variation_index,
        };
        let Some(request) = spec.build_request(&derivative.content, &ctx) else {
            return Err("Required content fields missing for render request".to_string());
        };

        render_one(
            self.renderer.as_ref(),
            self.converter.as_ref(),
            self.assets.as_ref(),
            &request,
            derivative.id,
        )
        .await
    }
}

/// Job-less single-item render used by the external retry operation. Same
/// lifecycle as the scheduler path.
pub async fn render_single(
    renderer: &dyn VisualRenderer,
    converter: &dyn DocumentConverter,
    assets: &dyn ObjectStore,
    derivative: &Derivative,
    source: &Source,
) -> Result<Vec<String>, String> {
    let Some(spec) = visual_spec_for(&derivative.template_slug) else {
        return Err(format!(
            "No visual spec registered for template {}",
            derivative.template_slug
        ));
    };
    let ctx = RenderContext {
        source_title: &source.title,
        pillar: &source.pillar,
        variation_index: derivative.variation_index,
    };
    let Some(request) = spec.build_request(&derivative.content, &ctx) else {
        return Err("Required content fields missing for render request".to_string());
    };
    render_one(renderer, converter, assets, &request, derivative.id).await
}
