//! One-time structured-insight pass over a source article.

use ai_client::{StructuredOutput, TextGenerator};
use ripple_common::{ArticleInsights, CascadeError, Source};
use tracing::info;

const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a content strategist extracting reusable insight data from a long-form article.

Extract:
- themes: the core themes the article covers, most important first
- takeaways: actionable takeaways a reader should walk away with
- quotes: verbatim quotable lines, copied exactly from the article text
- stats: statistics and concrete numbers the article mentions, with enough context to stand alone
- hooks: scroll-stopping one-liners usable to open a social post about this article
- target_audience: one sentence describing who this article is for
- emotional_angles: emotions the content can credibly lean into (e.g. frustration, ambition, relief)

Rules:
- Only use what is actually in the article. Never invent quotes or numbers.
- themes and takeaways must not be empty for any real article.
- Keep each list entry short enough to drop into a post as-is."#;

const EXTRACTION_MAX_TOKENS: u32 = 4096;

fn build_extraction_prompt(source: &Source) -> String {
    format!(
        "Title: {title}\nContent pillar: {pillar}\n\nArticle:\n{body}",
        title = source.title,
        pillar = source.pillar,
        body = source.body,
    )
}

/// Run the extraction stage for one source.
///
/// Any failure here is fatal for the whole job: a transport or parse error,
/// and equally a "successful" call that comes back with empty `themes` or
/// `takeaways` — there is no fallback content to generate from.
pub async fn extract(
    generator: &dyn TextGenerator,
    source: &Source,
) -> Result<ArticleInsights, CascadeError> {
    let prompt = build_extraction_prompt(source);
    let raw = generator
        .generate_with_schema(
            EXTRACTION_SYSTEM_PROMPT,
            &prompt,
            ArticleInsights::tool_schema(),
            EXTRACTION_MAX_TOKENS,
        )
        .await
        .map_err(|e| CascadeError::Extraction(e.to_string()))?;

    let insights: ArticleInsights = serde_json::from_value(raw)
        .map_err(|e| CascadeError::Extraction(format!("insights deserialization failed: {e}")))?;

    if insights.themes.is_empty() {
        return Err(CascadeError::EmptyRequiredField("themes"));
    }
    if insights.takeaways.is_empty() {
        return Err(CascadeError::EmptyRequiredField("takeaways"));
    }

    info!(
        source_id = %source.id,
        themes = insights.themes.len(),
        takeaways = insights.takeaways.len(),
        hooks = insights.hooks.len(),
        "Extraction complete"
    );

    Ok(insights)
}
