//! Prompt assembly for generation tasks.

use ripple_common::{ArticleInsights, Source};

use crate::planner::GenerationTask;

pub const GENERATION_SYSTEM_PROMPT: &str = r#"You are a social media content strategist turning long-form articles into platform-native posts.

Rules:
- Write for the named platform and follow the template instructions exactly.
- Draw only on the provided article insights. Never invent statistics or quotes.
- Match the brand voice when one is given.
- Respond with a single JSON object. Use the field names the template asks for; when the template names none, put the post text under "content".
- No markdown fences, no commentary outside the JSON object."#;

/// Fixed rotation of style-angle directives used to keep variations of the
/// same template from being near-duplicates. Selected by
/// `variation_index % STYLE_ANGLES.len()`.
pub const STYLE_ANGLES: [(&str, &str); 10] = [
    (
        "contrarian",
        "Take a contrarian stance: lead by challenging the common assumption the article pushes against.",
    ),
    (
        "narrative",
        "Tell it as a story: open in the middle of a concrete moment and let the insight land at the end.",
    ),
    (
        "data-first",
        "Lead with the strongest number: open on a statistic and build the post around it.",
    ),
    (
        "emotional",
        "Lead with feeling: name the frustration or hope the reader has before offering the insight.",
    ),
    (
        "tactical",
        "Be ruthlessly practical: concrete steps, no throat-clearing, every line actionable.",
    ),
    (
        "humorous",
        "Keep it light: a wry, self-aware tone, one good joke maximum, insight still intact.",
    ),
    (
        "minimalist",
        "Strip it down: the fewest words that still carry the core takeaway. White space is fine.",
    ),
    (
        "conversational",
        "Write like a message to a smart friend: plain words, direct address, no corporate tone.",
    ),
    (
        "visionary",
        "Zoom out: connect the takeaway to where the field is heading in the next few years.",
    ),
    (
        "urgency",
        "Make it timely: why acting on this today beats acting on it next quarter.",
    ),
];

/// The angle directive for a given variation index.
pub fn style_angle(variation_index: u32) -> (&'static str, &'static str) {
    STYLE_ANGLES[variation_index as usize % STYLE_ANGLES.len()]
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the user prompt for one generation task.
pub fn build_generation_prompt(
    task: &GenerationTask,
    insights: &ArticleInsights,
    source: &Source,
    brand_voice: Option<&str>,
    variation_count: u32,
) -> String {
    let mut prompt = format!(
        "Platform: {platform}\nTemplate: {template}\n\nTemplate instructions:\n{instructions}\n\n\
         Article: \"{title}\" (pillar: {pillar})\nTarget audience: {audience}\n\n\
         Themes:\n{themes}\n\nKey takeaways:\n{takeaways}\n",
        platform = task.platform_name,
        template = task.template_name,
        instructions = task.template_prompt,
        title = source.title,
        pillar = source.pillar,
        audience = insights.target_audience,
        themes = bullet_list(&insights.themes),
        takeaways = bullet_list(&insights.takeaways),
    );

    if !insights.hooks.is_empty() {
        prompt.push_str(&format!("\nHooks:\n{}\n", bullet_list(&insights.hooks)));
    }
    if !insights.quotes.is_empty() {
        prompt.push_str(&format!("\nQuotes:\n{}\n", bullet_list(&insights.quotes)));
    }
    if !insights.stats.is_empty() {
        prompt.push_str(&format!("\nStats:\n{}\n", bullet_list(&insights.stats)));
    }
    if !insights.emotional_angles.is_empty() {
        prompt.push_str(&format!(
            "\nEmotional angles:\n{}\n",
            bullet_list(&insights.emotional_angles)
        ));
    }

    if let Some(voice) = brand_voice {
        prompt.push_str(&format!("\nBrand voice: {voice}\n"));
    }

    // Only diversify when the plan actually asks for multiple variations.
    if variation_count > 1 {
        let (name, directive) = style_angle(task.variation_index);
        prompt.push_str(&format!(
            "\nThis is variation {n} of {total}. Style angle ({name}): {directive}\n",
            n = task.variation_index + 1,
            total = variation_count,
        ));
    }

    prompt
}
