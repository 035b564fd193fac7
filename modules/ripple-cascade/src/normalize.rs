//! Normalization of raw generator output into the Derivative content shape.
//!
//! The external generator is only guaranteed to return "one JSON object";
//! template prompts steer field names but nothing enforces them. This layer
//! is therefore total: it produces a valid `DerivativeContent` from any JSON
//! value, recognizing a handful of structured shapes and passing every
//! unknown top-level key through unchanged.

use serde_json::{Map, Value};

use ripple_common::{DerivativeContent, MemeText, Slide};

/// Field names the generator may use for the main post text, in lookup
/// order.
const PRIMARY_KEYS: [&str; 6] = ["content", "text", "script", "post", "caption", "copy"];

/// Remove the first of `keys` whose value is a string, returning it.
/// Non-string values under these keys are left in place for pass-through.
fn take_string(obj: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if matches!(obj.get(*key), Some(Value::String(_))) {
            if let Some(Value::String(s)) = obj.remove(*key) {
                return Some(s);
            }
        }
    }
    None
}

/// Remove the first of `keys` whose value is an array of strings.
fn take_string_list(obj: &mut Map<String, Value>, keys: &[&str]) -> Option<Vec<String>> {
    for key in keys {
        let is_string_list = obj
            .get(*key)
            .and_then(Value::as_array)
            .is_some_and(|arr| !arr.is_empty() && arr.iter().all(Value::is_string));
        if is_string_list {
            if let Some(Value::Array(arr)) = obj.remove(*key) {
                return Some(
                    arr.into_iter()
                        .filter_map(|v| match v {
                            Value::String(s) => Some(s),
                            _ => None,
                        })
                        .collect(),
                );
            }
        }
    }
    None
}

fn parse_slide(value: &Value) -> Option<Slide> {
    let obj = value.as_object()?;
    let title = obj
        .get("title")
        .or_else(|| obj.get("heading"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let body = obj
        .get("body")
        .or_else(|| obj.get("content"))
        .or_else(|| obj.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if title.is_empty() && body.is_empty() {
        return None;
    }
    Some(Slide { title, body })
}

/// Remove the first of `keys` whose value parses as a slide list.
fn take_slides(obj: &mut Map<String, Value>, keys: &[&str]) -> Option<Vec<Slide>> {
    for key in keys {
        let parsed: Option<Vec<Slide>> = obj.get(*key).and_then(Value::as_array).and_then(|arr| {
            if arr.is_empty() {
                return None;
            }
            arr.iter().map(parse_slide).collect()
        });
        if let Some(slides) = parsed {
            obj.remove(*key);
            return Some(slides);
        }
    }
    None
}

fn flatten_slides(slides: &[Slide]) -> String {
    slides
        .iter()
        .map(|s| {
            if s.title.is_empty() {
                s.body.clone()
            } else if s.body.is_empty() {
                s.title.clone()
            } else {
                format!("{}\n{}", s.title, s.body)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn flatten_panels(panels: &[String]) -> String {
    panels
        .iter()
        .enumerate()
        .map(|(i, p)| format!("Panel {}: {p}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalize one raw generator reply for the given template.
///
/// `template_slug` only disambiguates generic container keys (an `items`
/// array is a slide list for a carousel template but a message list for a
/// thread template); all other recognition is content-driven.
pub fn normalize(raw: Value, template_slug: &str) -> DerivativeContent {
    let mut obj = match raw {
        Value::Object(map) => map,
        Value::String(s) => {
            return DerivativeContent {
                primary_text: s,
                ..Default::default()
            }
        }
        other => {
            return DerivativeContent {
                primary_text: other.to_string(),
                ..Default::default()
            }
        }
    };

    let mut content = DerivativeContent::default();

    // Hook + script pairs flatten into one hook-then-script text.
    let hook = take_string(&mut obj, &["hook"]);
    let script = take_string(&mut obj, &["script"]);
    match (hook, script) {
        (Some(hook), Some(script)) => {
            content.primary_text = format!("{hook}\n\n{script}");
        }
        (Some(hook), None) => content.primary_text = hook,
        (None, Some(script)) => content.primary_text = script,
        (None, None) => {}
    }

    // Structured shapes.
    content.slides = take_slides(&mut obj, &["slides", "cards"]);
    content.thread = take_string_list(&mut obj, &["thread", "tweets", "messages"]);
    content.panels = take_string_list(&mut obj, &["panels"]);

    let top = take_string(&mut obj, &["top_text", "top"]);
    let bottom = take_string(&mut obj, &["bottom_text", "bottom"]);
    if let (Some(top), Some(bottom)) = (top, bottom) {
        content.meme = Some(MemeText { top, bottom });
    }

    // Generic containers, disambiguated by template kind.
    if content.slides.is_none() && template_slug.contains("carousel") {
        content.slides = take_slides(&mut obj, &["items"]);
    }
    if content.thread.is_none() && template_slug.contains("thread") {
        content.thread = take_string_list(&mut obj, &["items", "posts"]);
    }

    // Primary text: explicit field first, then a structured-shape flattening.
    if content.primary_text.is_empty() {
        if let Some(text) = take_string(&mut obj, &PRIMARY_KEYS) {
            content.primary_text = text;
        }
    }
    if content.primary_text.is_empty() {
        if let Some(slides) = &content.slides {
            content.primary_text = flatten_slides(slides);
        } else if let Some(thread) = &content.thread {
            content.primary_text = thread.join("\n\n");
        } else if let Some(panels) = &content.panels {
            content.primary_text = flatten_panels(panels);
        } else if let Some(meme) = &content.meme {
            content.primary_text = format!("{}\n{}", meme.top, meme.bottom);
        }
    }

    // Auxiliary fields, tolerating one alias per concept.
    content.headlines = take_string_list(&mut obj, &["headlines", "headline_options"])
        .or_else(|| take_string(&mut obj, &["headline"]).map(|h| vec![h]))
        .unwrap_or_default();
    content.hashtags = take_string_list(&mut obj, &["hashtags", "tags"]).unwrap_or_default();
    content.call_to_action = take_string(&mut obj, &["call_to_action", "cta"]);
    content.notes = take_string(&mut obj, &["notes"]);
    content.visual_direction = take_string(&mut obj, &["visual_direction", "visual_notes"]);
    content.sound_suggestion = take_string(&mut obj, &["sound_suggestion", "audio_suggestion"]);

    // Everything left over is a template author's custom field.
    content.extra = obj;

    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_common::ImageStatus;
    use serde_json::json;

    #[test]
    fn plain_content_string() {
        let content = normalize(json!({"content": "hello world"}), "text-post");
        assert_eq!(content.primary_text, "hello world");
        assert!(content.extra.is_empty());
    }

    #[test]
    fn alternate_primary_keys_are_recognized() {
        for key in ["text", "post", "caption", "copy"] {
            let content = normalize(json!({ key: "body" }), "text-post");
            assert_eq!(content.primary_text, "body", "key {key}");
        }
    }

    #[test]
    fn slide_list_becomes_carousel() {
        let content = normalize(
            json!({"slides": [
                {"title": "One", "body": "first"},
                {"title": "Two", "content": "second"}
            ]}),
            "carousel",
        );
        let slides = content.slides.unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[1].body, "second");
        assert_eq!(content.primary_text, "One\nfirst\n\nTwo\nsecond");
    }

    #[test]
    fn generic_items_read_by_template_kind() {
        let as_carousel = normalize(
            json!({"items": [{"title": "A", "body": "a"}]}),
            "linkedin-carousel",
        );
        assert!(as_carousel.slides.is_some());

        let as_thread = normalize(json!({"items": ["one", "two"]}), "x-thread");
        assert_eq!(as_thread.thread.unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn thread_flattens_to_joined_text() {
        let content = normalize(json!({"tweets": ["first", "second"]}), "thread");
        assert_eq!(content.thread.as_deref().unwrap(), ["first", "second"]);
        assert_eq!(content.primary_text, "first\n\nsecond");
    }

    #[test]
    fn panels_flatten_numbered() {
        let content = normalize(json!({"panels": ["setup", "punchline"]}), "multi-panel-meme");
        assert_eq!(content.primary_text, "Panel 1: setup\nPanel 2: punchline");
    }

    #[test]
    fn meme_pair_flattens_two_lines() {
        let content = normalize(
            json!({"top_text": "ME:", "bottom_text": "ALSO ME:"}),
            "meme",
        );
        assert_eq!(content.meme.as_ref().unwrap().top, "ME:");
        assert_eq!(content.primary_text, "ME:\nALSO ME:");
    }

    #[test]
    fn hook_and_script_concatenate() {
        let content = normalize(
            json!({"hook": "Stop doing this.", "script": "Here is the fix."}),
            "reel-script",
        );
        assert_eq!(content.primary_text, "Stop doing this.\n\nHere is the fix.");
    }

    #[test]
    fn auxiliary_key_aliases_are_tolerated() {
        let content = normalize(
            json!({
                "content": "post",
                "tags": ["#a", "#b"],
                "cta": "Subscribe",
                "visual_notes": "dark background",
                "audio_suggestion": "lofi"
            }),
            "text-post",
        );
        assert_eq!(content.hashtags, vec!["#a", "#b"]);
        assert_eq!(content.call_to_action.as_deref(), Some("Subscribe"));
        assert_eq!(content.visual_direction.as_deref(), Some("dark background"));
        assert_eq!(content.sound_suggestion.as_deref(), Some("lofi"));
    }

    #[test]
    fn single_headline_string_becomes_list() {
        let content = normalize(json!({"content": "x", "headline": "Big news"}), "text-post");
        assert_eq!(content.headlines, vec!["Big news"]);
    }

    #[test]
    fn unknown_keys_pass_through() {
        let content = normalize(
            json!({"content": "x", "alt_text": "chart", "poll_options": ["yes", "no"]}),
            "text-post",
        );
        assert_eq!(content.extra.get("alt_text").unwrap(), "chart");
        assert!(content.extra.get("poll_options").unwrap().is_array());
    }

    #[test]
    fn wrong_typed_known_key_is_passed_through_not_dropped() {
        // "content" holding an object is not the primary text.
        let content = normalize(json!({"content": {"weird": true}}), "text-post");
        assert_eq!(content.primary_text, "");
        assert!(content.extra.contains_key("content"));
    }

    #[test]
    fn never_fails_on_degenerate_input() {
        assert_eq!(normalize(json!({}), "text-post").primary_text, "");
        assert_eq!(normalize(json!("just a string"), "x").primary_text, "just a string");
        assert_eq!(normalize(json!(42), "x").primary_text, "42");
        assert_eq!(normalize(json!(null), "x").primary_text, "null");
    }

    #[test]
    fn image_fields_start_skipped() {
        let content = normalize(json!({"content": "x"}), "text-post");
        assert_eq!(content.image_status, ImageStatus::Skipped);
        assert!(content.image_urls.is_empty());
    }
}
