//! Narrow, externally triggered single-derivative retries.
//!
//! Both operations are job-less and keyed strictly by derivative id: they
//! never touch Job state or sibling derivatives, so they are safe to run
//! beside an in-flight cascade on a different source.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use ai_client::TextGenerator;
use ripple_common::{CascadeError, Catalog, Derivative, DerivativeStatus, ImageStatus};

use crate::generation::GENERATION_MAX_TOKENS;
use crate::normalize::normalize;
use crate::planner::GenerationTask;
use crate::prompts::{build_generation_prompt, GENERATION_SYSTEM_PROMPT};
use crate::traits::{ContentStore, DocumentConverter, ObjectStore, VisualRenderer};
use crate::visual::{render_single, visual_spec_for};

/// Regenerate one derivative's text content from the parent source's stored
/// extraction result.
///
/// Requires that extraction has already run for the source. On generation
/// failure the existing content is left untouched and the error surfaces to
/// the caller.
pub async fn retry_content(
    store: &dyn ContentStore,
    generator: &dyn TextGenerator,
    catalog: &Catalog,
    brand_voice: Option<&str>,
    derivative_id: Uuid,
) -> Result<Derivative, CascadeError> {
    let mut derivative = store
        .get_derivative(derivative_id)
        .await
        .map_err(|e| CascadeError::Store(e.to_string()))?
        .ok_or(CascadeError::DerivativeNotFound(derivative_id))?;

    let source = store
        .get_source(derivative.source_id)
        .await
        .map_err(|e| CascadeError::Store(e.to_string()))?
        .ok_or(CascadeError::SourceNotFound(derivative.source_id))?;

    let insights = source
        .insights
        .clone()
        .ok_or(CascadeError::NoExtraction(source.id))?;

    let (platform, template) = catalog
        .platforms
        .iter()
        .find(|p| p.id == derivative.platform_id)
        .and_then(|p| {
            p.templates
                .iter()
                .find(|t| t.id == derivative.template_id)
                .map(|t| (p, t))
        })
        .ok_or_else(|| CascadeError::TemplateNotFound(derivative.template_id.clone()))?;

    let task = GenerationTask {
        platform_id: platform.id.clone(),
        platform_name: platform.name.clone(),
        template_id: template.id.clone(),
        template_slug: template.slug.clone(),
        template_name: template.name.clone(),
        template_prompt: template.prompt.clone(),
        variation_index: derivative.variation_index,
    };
    let prompt =
        build_generation_prompt(&task, &insights, &source, brand_voice, source.variation_count);

    let raw = generator
        .generate_structured(GENERATION_SYSTEM_PROMPT, &prompt, GENERATION_MAX_TOKENS)
        .await
        .map_err(|e| CascadeError::Generation(e.to_string()))?;

    derivative.content = normalize(raw, &derivative.template_slug);
    derivative.status = DerivativeStatus::Draft;
    derivative.updated_at = Utc::now();
    store
        .update_derivative(&derivative)
        .await
        .map_err(|e| CascadeError::Store(e.to_string()))?;

    info!(derivative_id = %derivative.id, "Derivative content regenerated");
    Ok(derivative)
}

/// Re-render one derivative's images through the full render lifecycle.
///
/// Requires the derivative's template to carry a visual spec. Render-side
/// failures land on the derivative's own image fields, exactly like the
/// batch path.
pub async fn retry_images(
    store: &dyn ContentStore,
    renderer: &dyn VisualRenderer,
    converter: &dyn DocumentConverter,
    assets: &dyn ObjectStore,
    derivative_id: Uuid,
) -> Result<Derivative, CascadeError> {
    let mut derivative = store
        .get_derivative(derivative_id)
        .await
        .map_err(|e| CascadeError::Store(e.to_string()))?
        .ok_or(CascadeError::DerivativeNotFound(derivative_id))?;

    if visual_spec_for(&derivative.template_slug).is_none() {
        return Err(CascadeError::NoVisualSpec(derivative.template_slug.clone()));
    }

    let source = store
        .get_source(derivative.source_id)
        .await
        .map_err(|e| CascadeError::Store(e.to_string()))?
        .ok_or(CascadeError::SourceNotFound(derivative.source_id))?;

    derivative.content.image_status = ImageStatus::Generating;
    derivative.content.image_error = None;
    derivative.updated_at = Utc::now();
    store
        .update_derivative(&derivative)
        .await
        .map_err(|e| CascadeError::Store(e.to_string()))?;

    match render_single(renderer, converter, assets, &derivative, &source).await {
        Ok(image_urls) => {
            derivative.content.image_urls = image_urls;
            derivative.content.image_status = ImageStatus::Completed;
        }
        Err(reason) => {
            derivative.content.image_status = ImageStatus::Failed;
            derivative.content.image_error = Some(reason);
        }
    }
    derivative.updated_at = Utc::now();
    store
        .update_derivative(&derivative)
        .await
        .map_err(|e| CascadeError::Store(e.to_string()))?;

    info!(
        derivative_id = %derivative.id,
        image_status = ?derivative.content.image_status,
        "Derivative image retry finished"
    );
    Ok(derivative)
}
