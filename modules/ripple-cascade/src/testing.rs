// Test doubles for the cascade pipeline.
//
// One double per trait boundary:
// - MockGenerator (TextGenerator) — scripted extraction + per-task outcomes
// - MockRenderer (VisualRenderer) — scripted submit/poll/download steps
// - MockConverter (DocumentConverter) — fixed page count or failure
// - MockAssetStore (ObjectStore) — records uploads, fabricates URLs
// - RecordingStore (ContentStore) — delegates to MemoryStore, logs every
//   job update so tests can assert on the progress sequence
//
// Plus fixture helpers for sources, catalogs, insights, and derivatives.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use ai_client::{AiError, TextGenerator};
use design_client::{DesignError, GenerationRequest, GenerationState, GenerationStatus};
use ripple_common::{
    ArticleInsights, Catalog, Derivative, DerivativeContent, DerivativeStatus, Job, JobStatus,
    Platform, Source, Template,
};

use crate::store::MemoryStore;
use crate::traits::{ContentStore, DocumentConverter, ObjectStore, VisualRenderer};

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

enum ExtractionScript {
    Respond(Value),
    Fail(String),
}

/// Scripted text generator. Task calls are counted in issue order, so
/// `fail_task(2)` fails exactly the third planned task.
pub struct MockGenerator {
    extraction: Mutex<ExtractionScript>,
    default_task_response: Mutex<Value>,
    /// (prompt substring, response) matchers, checked in insertion order.
    matchers: Mutex<Vec<(String, Value)>>,
    fail_indices: Mutex<HashSet<usize>>,
    task_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            extraction: Mutex::new(ExtractionScript::Respond(insights_json())),
            default_task_response: Mutex::new(json!({"content": "generated post"})),
            matchers: Mutex::new(Vec::new()),
            fail_indices: Mutex::new(HashSet::new()),
            task_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn on_extraction(self, response: Value) -> Self {
        *self.extraction.lock().unwrap() = ExtractionScript::Respond(response);
        self
    }

    pub fn extraction_fails(self, message: &str) -> Self {
        *self.extraction.lock().unwrap() = ExtractionScript::Fail(message.to_string());
        self
    }

    pub fn on_tasks(self, response: Value) -> Self {
        *self.default_task_response.lock().unwrap() = response;
        self
    }

    /// Respond with `response` for any task whose prompt contains `needle`.
    pub fn respond_when(self, needle: &str, response: Value) -> Self {
        self.matchers
            .lock()
            .unwrap()
            .push((needle.to_string(), response));
        self
    }

    /// Fail the task with the given zero-based issue index.
    pub fn fail_task(self, index: usize) -> Self {
        self.fail_indices.lock().unwrap().insert(index);
        self
    }

    pub fn task_call_count(&self) -> usize {
        self.task_calls.load(Ordering::SeqCst)
    }

    pub fn task_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate_structured(
        &self,
        _system: &str,
        prompt: &str,
        _max_tokens: u32,
    ) -> ai_client::Result<Value> {
        let index = self.task_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if self.fail_indices.lock().unwrap().contains(&index) {
            return Err(AiError::Api {
                status: 500,
                message: format!("scripted failure for task {index}"),
            });
        }

        let matchers = self.matchers.lock().unwrap();
        for (needle, response) in matchers.iter() {
            if prompt.contains(needle.as_str()) {
                return Ok(response.clone());
            }
        }
        Ok(self.default_task_response.lock().unwrap().clone())
    }

    async fn generate_with_schema(
        &self,
        _system: &str,
        _prompt: &str,
        _schema: Value,
        _max_tokens: u32,
    ) -> ai_client::Result<Value> {
        match &*self.extraction.lock().unwrap() {
            ExtractionScript::Respond(value) => Ok(value.clone()),
            ExtractionScript::Fail(message) => Err(AiError::Api {
                status: 500,
                message: message.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

enum SubmitStep {
    Ok,
    RateLimited,
    Fail(String),
}

#[derive(Clone, Copy)]
enum PollStep {
    Pending,
    Completed,
    Failed,
}

/// Scripted renderer. Submit and poll steps are consumed from queues; once a
/// queue is empty the default step applies (submit Ok, poll Completed).
pub struct MockRenderer {
    submit_steps: Mutex<VecDeque<SubmitStep>>,
    poll_steps: Mutex<VecDeque<PollStep>>,
    default_poll: Mutex<PollStep>,
    poll_failure_message: Mutex<String>,
    download_fails: Mutex<bool>,
    submit_calls: AtomicUsize,
    poll_calls: AtomicUsize,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            submit_steps: Mutex::new(VecDeque::new()),
            poll_steps: Mutex::new(VecDeque::new()),
            default_poll: Mutex::new(PollStep::Completed),
            poll_failure_message: Mutex::new("renderer exploded".to_string()),
            download_fails: Mutex::new(false),
            submit_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
        }
    }

    /// Queue `count` rate-limited submissions before the default Ok.
    pub fn submit_rate_limited(self, count: usize) -> Self {
        let mut steps = self.submit_steps.lock().unwrap();
        for _ in 0..count {
            steps.push_back(SubmitStep::RateLimited);
        }
        drop(steps);
        self
    }

    pub fn submit_fails(self, message: &str) -> Self {
        self.submit_steps
            .lock()
            .unwrap()
            .push_back(SubmitStep::Fail(message.to_string()));
        self
    }

    /// Queue `count` pending polls before the default Completed.
    pub fn poll_pending(self, count: usize) -> Self {
        let mut steps = self.poll_steps.lock().unwrap();
        for _ in 0..count {
            steps.push_back(PollStep::Pending);
        }
        drop(steps);
        self
    }

    /// Every poll reports pending, forever. For timeout tests.
    pub fn always_pending(self) -> Self {
        *self.default_poll.lock().unwrap() = PollStep::Pending;
        self
    }

    pub fn poll_fails(self, message: &str) -> Self {
        self.poll_steps.lock().unwrap().push_back(PollStep::Failed);
        *self.poll_failure_message.lock().unwrap() = message.to_string();
        self
    }

    pub fn download_fails(self) -> Self {
        *self.download_fails.lock().unwrap() = true;
        self
    }

    pub fn submit_call_count(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_call_count(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisualRenderer for MockRenderer {
    async fn submit(&self, _request: &GenerationRequest) -> Result<String, DesignError> {
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .submit_steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SubmitStep::Ok);
        match step {
            SubmitStep::Ok => Ok(format!("gen-{call}")),
            SubmitStep::RateLimited => {
                Err(DesignError::RateLimited("too many requests".to_string()))
            }
            SubmitStep::Fail(message) => Err(DesignError::Api {
                status: 500,
                message,
            }),
        }
    }

    async fn poll(&self, generation_id: &str) -> Result<GenerationStatus, DesignError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .poll_steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(*self.default_poll.lock().unwrap());
        let status = match step {
            PollStep::Pending => GenerationStatus {
                generation_id: generation_id.to_string(),
                status: GenerationState::Pending,
                document_url: None,
                error_message: None,
            },
            PollStep::Completed => GenerationStatus {
                generation_id: generation_id.to_string(),
                status: GenerationState::Completed,
                document_url: Some(format!("https://design.test/{generation_id}.pdf")),
                error_message: None,
            },
            PollStep::Failed => GenerationStatus {
                generation_id: generation_id.to_string(),
                status: GenerationState::Failed,
                document_url: None,
                error_message: Some(self.poll_failure_message.lock().unwrap().clone()),
            },
        };
        Ok(status)
    }

    async fn download(&self, document_url: &str) -> Result<Vec<u8>, DesignError> {
        if *self.download_fails.lock().unwrap() {
            return Err(DesignError::Api {
                status: 404,
                message: format!("no such document: {document_url}"),
            });
        }
        Ok(b"%PDF-1.4 test document".to_vec())
    }
}

// ---------------------------------------------------------------------------
// MockConverter / MockAssetStore
// ---------------------------------------------------------------------------

pub struct MockConverter {
    pages: usize,
    fails: bool,
}

impl MockConverter {
    pub fn pages(pages: usize) -> Self {
        Self {
            pages,
            fails: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            pages: 0,
            fails: true,
        }
    }
}

#[async_trait]
impl DocumentConverter for MockConverter {
    async fn convert(&self, _document: &[u8]) -> Result<Vec<Vec<u8>>> {
        if self.fails {
            anyhow::bail!("conversion tool crashed");
        }
        Ok(vec![vec![0u8; 16]; self.pages])
    }
}

#[derive(Default)]
pub struct MockAssetStore {
    uploads: Mutex<Vec<String>>,
}

impl MockAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploaded_keys(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MockAssetStore {
    async fn upload(&self, key: &str, _bytes: Vec<u8>) -> Result<String> {
        self.uploads.lock().unwrap().push(key.to_string());
        Ok(format!("https://assets.test/{key}"))
    }
}

// ---------------------------------------------------------------------------
// RecordingStore
// ---------------------------------------------------------------------------

/// Delegates to a [`MemoryStore`] and logs every job update, so tests can
/// assert on the exact sequence of reported statuses and progress values.
pub struct RecordingStore {
    pub inner: MemoryStore,
    job_updates: Mutex<Vec<(JobStatus, u8)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            job_updates: Mutex::new(Vec::new()),
        }
    }

    pub fn job_updates(&self) -> Vec<(JobStatus, u8)> {
        self.job_updates.lock().unwrap().clone()
    }

    pub fn progress_values(&self) -> Vec<u8> {
        self.job_updates
            .lock()
            .unwrap()
            .iter()
            .map(|(_, progress)| *progress)
            .collect()
    }
}

impl Default for RecordingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for RecordingStore {
    async fn get_source(&self, id: Uuid) -> Result<Option<Source>> {
        self.inner.get_source(id).await
    }

    async fn update_source(&self, source: &Source) -> Result<()> {
        self.inner.update_source(source).await
    }

    async fn create_job(&self, job: &Job) -> Result<()> {
        self.job_updates
            .lock()
            .unwrap()
            .push((job.status, job.progress));
        self.inner.create_job(job).await
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>> {
        self.inner.get_job(id).await
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        self.job_updates
            .lock()
            .unwrap()
            .push((job.status, job.progress));
        self.inner.update_job(job).await
    }

    async fn insert_derivative(&self, derivative: &Derivative) -> Result<()> {
        self.inner.insert_derivative(derivative).await
    }

    async fn update_derivative(&self, derivative: &Derivative) -> Result<()> {
        self.inner.update_derivative(derivative).await
    }

    async fn get_derivative(&self, id: Uuid) -> Result<Option<Derivative>> {
        self.inner.get_derivative(id).await
    }

    async fn derivatives_for_job(&self, job_id: Uuid) -> Result<Vec<Derivative>> {
        self.inner.derivatives_for_job(job_id).await
    }

    async fn delete_unpublished_derivatives(&self, source_id: Uuid) -> Result<u64> {
        self.inner.delete_unpublished_derivatives(source_id).await
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn insights_json() -> Value {
    json!({
        "themes": ["shipping speed", "small batches"],
        "takeaways": ["ship daily", "cut scope not quality"],
        "quotes": ["Speed is a habit."],
        "stats": ["Teams shipping daily report 3x fewer rollbacks"],
        "hooks": ["Your team is not slow. Your batches are too big."],
        "target_audience": "engineering leads at growth-stage startups",
        "emotional_angles": ["frustration", "ambition"]
    })
}

pub fn sample_insights() -> ArticleInsights {
    serde_json::from_value(insights_json()).expect("fixture insights parse")
}

pub fn sample_source(variation_count: u32) -> Source {
    Source::new(
        "How fast teams actually ship",
        "Long-form article body about shipping speed and batch size.",
        "engineering",
    )
    .with_variations(variation_count)
}

pub fn template(id: &str, slug: &str, name: &str) -> Template {
    Template {
        id: id.to_string(),
        slug: slug.to_string(),
        name: name.to_string(),
        prompt: format!("Create a {name} from the article insights."),
        enabled: true,
    }
}

/// One platform, two templates: a plain text post (no visual spec) and a
/// carousel (has a visual spec).
pub fn sample_catalog() -> Catalog {
    Catalog {
        platforms: vec![Platform {
            id: "linkedin".to_string(),
            name: "LinkedIn".to_string(),
            templates: vec![
                template("t-text-post", "text-post", "Text post"),
                template("t-linkedin-carousel", "linkedin-carousel", "Carousel"),
            ],
        }],
    }
}

/// Generator response shaped like carousel output, so carousel derivatives
/// get slides for the visual stage.
pub fn carousel_response() -> Value {
    json!({
        "slides": [
            {"title": "Ship daily", "body": "Small batches beat big releases."},
            {"title": "Cut scope", "body": "Never cut quality."}
        ],
        "hashtags": ["#shipping", "#engineering"]
    })
}

pub fn sample_derivative(source_id: Uuid, job_id: Uuid, slug: &str) -> Derivative {
    let now = Utc::now();
    Derivative {
        id: Uuid::new_v4(),
        source_id,
        job_id,
        platform_id: "linkedin".to_string(),
        template_id: format!("t-{slug}"),
        template_slug: slug.to_string(),
        variation_index: 0,
        content: DerivativeContent {
            primary_text: "existing text".to_string(),
            ..Default::default()
        },
        status: DerivativeStatus::Draft,
        created_at: now,
        updated_at: now,
    }
}
