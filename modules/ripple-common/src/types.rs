use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// --- Source ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Draft,
    Pending,
    Processing,
    Completed,
    Error,
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceStatus::Draft => write!(f, "draft"),
            SourceStatus::Pending => write!(f, "pending"),
            SourceStatus::Processing => write!(f, "processing"),
            SourceStatus::Completed => write!(f, "completed"),
            SourceStatus::Error => write!(f, "error"),
        }
    }
}

/// One long-form article plus its lifecycle state. The immutable inputs are
/// `title`, `body`, and `pillar`; everything else is mutated by cascade runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    /// Content pillar / category tag, e.g. "founder-stories".
    pub pillar: String,
    /// How many stylistic variations to generate per (platform, template) pair.
    pub variation_count: u32,
    pub status: SourceStatus,
    /// Set once per successful extraction run.
    pub insights: Option<ArticleInsights>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    pub fn new(title: impl Into<String>, body: impl Into<String>, pillar: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            body: body.into(),
            pillar: pillar.into(),
            variation_count: 1,
            status: SourceStatus::Draft,
            insights: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_variations(mut self, count: u32) -> Self {
        self.variation_count = count;
        self
    }
}

/// What the LLM returns for one article: the structured insight data every
/// downstream generation task draws from.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ArticleInsights {
    /// Core themes the article covers, most important first.
    #[serde(default)]
    pub themes: Vec<String>,
    /// Actionable takeaways a reader should walk away with.
    #[serde(default)]
    pub takeaways: Vec<String>,
    /// Verbatim quotable lines from the article.
    #[serde(default)]
    pub quotes: Vec<String>,
    /// Statistics and concrete numbers mentioned in the article.
    #[serde(default)]
    pub stats: Vec<String>,
    /// Scroll-stopping hooks usable as post openers.
    #[serde(default)]
    pub hooks: Vec<String>,
    /// Who this article is for.
    #[serde(default)]
    pub target_audience: String,
    /// Emotional angles the content can lean into.
    #[serde(default)]
    pub emotional_angles: Vec<String>,
}

// --- Job ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Extracting,
    Generating,
    Imaging,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Extracting => write!(f, "extracting"),
            JobStatus::Generating => write!(f, "generating"),
            JobStatus::Imaging => write!(f, "imaging"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One cascade execution attempt for a Source. Progress is derived from the
/// counters; status only ever moves forward, with `completed`/`failed`
/// terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub source_id: Uuid,
    pub status: JobStatus,
    /// 0–100, recomputable from the counters at every checkpoint.
    pub progress: u8,
    pub total_derivatives: u32,
    pub completed_derivatives: u32,
    pub total_images: u32,
    pub completed_images: u32,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(source_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            status: JobStatus::Queued,
            progress: 0,
            total_derivatives: 0,
            completed_derivatives: 0,
            total_images: 0,
            completed_images: 0,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

// --- Derivative ---

/// Editorial lifecycle of a generated piece, independent of whether its
/// generation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeStatus {
    Draft,
    Approved,
    Scheduled,
    Published,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Pending,
    Generating,
    Completed,
    Failed,
    Skipped,
}

/// One slide of a carousel-shaped output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    pub body: String,
}

/// Top/bottom text pair for a two-line meme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemeText {
    pub top: String,
    pub bottom: String,
}

/// The content bag of one Derivative: a closed core of known fields plus an
/// explicit side-map for whatever else a template author's prompt made the
/// generator emit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DerivativeContent {
    /// Flattened, ready-to-post text. Always present, even on generation
    /// failure (then it carries the failure marker).
    pub primary_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headlines: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashtags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_to_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slides: Option<Vec<Slide>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meme: Option<MemeText>,
    /// Raw error text when the generation call for this piece failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub image_status: ImageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_error: Option<String>,
    /// Unrecognized top-level keys from the generator, passed through
    /// unchanged so template authors can add output fields freely.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ImageStatus {
    fn default() -> Self {
        ImageStatus::Skipped
    }
}

/// One generated content piece for one (platform, template, variation)
/// combination. Created exactly once per planned task per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Derivative {
    pub id: Uuid,
    pub source_id: Uuid,
    pub job_id: Uuid,
    pub platform_id: String,
    pub template_id: String,
    /// Denormalized from the catalog: keys the visual-spec registry without
    /// a template lookup.
    pub template_slug: String,
    pub variation_index: u32,
    pub content: DerivativeContent,
    pub status: DerivativeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Catalog ---

/// One prompt template for one platform. `slug` keys the visual-spec
/// registry; `prompt` is the template body fed to the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub prompt: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub templates: Vec<Template>,
}

/// The enabled (platform, template) pairs a cascade fans out over. Iteration
/// order is declaration order, so plans are reproducible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

impl Catalog {
    /// Count of enabled templates across all platforms.
    pub fn enabled_template_count(&self) -> usize {
        self.platforms
            .iter()
            .map(|p| p.templates.iter().filter(|t| t.enabled).count())
            .sum()
    }
}
