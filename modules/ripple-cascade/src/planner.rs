use ripple_common::Catalog;

/// One unit of planned generation work. Ephemeral: a task exists only to
/// drive exactly one Derivative write and is never persisted itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTask {
    pub platform_id: String,
    pub platform_name: String,
    pub template_id: String,
    pub template_slug: String,
    pub template_name: String,
    pub template_prompt: String,
    pub variation_index: u32,
}

/// Expand the enabled catalog into the ordered task list for one cascade.
///
/// Deterministic nested expansion: platforms in catalog order × enabled
/// templates in declaration order × variation index `0..variation_count`.
/// No clock, no randomness — the same inputs always produce the same list,
/// so `total_derivatives` is reproducible.
pub fn plan(catalog: &Catalog, variation_count: u32) -> Vec<GenerationTask> {
    let mut tasks = Vec::new();
    for platform in &catalog.platforms {
        for template in platform.templates.iter().filter(|t| t.enabled) {
            for variation_index in 0..variation_count {
                tasks.push(GenerationTask {
                    platform_id: platform.id.clone(),
                    platform_name: platform.name.clone(),
                    template_id: template.id.clone(),
                    template_slug: template.slug.clone(),
                    template_name: template.name.clone(),
                    template_prompt: template.prompt.clone(),
                    variation_index,
                });
            }
        }
    }
    tasks
}
