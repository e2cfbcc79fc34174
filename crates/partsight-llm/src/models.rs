//! Model selection from what a server has installed

use tracing::debug;

/// Vision models in preference order (best label OCR first)
pub const VISION_MODELS: &[&str] = &["qwen2.5vl:7b", "minicpm-v:8b", "llava:13b", "llava:7b"];

/// Text models in preference order
pub const TEXT_MODELS: &[&str] = &[
    "qwen2.5:14b",
    "mistral-nemo:12b",
    "qwen2.5:7b-instruct-q4_1",
    "llama3.1:8b",
];

/// Substrings that mark a model as vision-capable
const VISION_MARKERS: &[&str] = &["vl:", "llava", "minicpm-v"];

fn family(name: &str) -> &str {
    name.split(':').next().unwrap_or(name)
}

fn is_vision(name: &str) -> bool {
    VISION_MARKERS.iter().any(|m| name.contains(m))
}

/// Installed model matching `wanted` exactly, or sharing its family
/// (`llava` matches `llava:13b`)
fn find<'a>(available: &'a [String], wanted: &str) -> Option<&'a String> {
    available.iter().find(|name| *name == wanted).or_else(|| {
        let base = family(wanted);
        available.iter().find(|name| family(name) == base)
    })
}

/// Pick a model from `available`
///
/// The configured model wins when it (or its family) is installed. Otherwise
/// the first installed entry of `preferences` is used. With `text_only`,
/// vision models are never chosen.
pub fn resolve_model(
    available: &[String],
    configured: Option<&str>,
    preferences: &[&str],
    text_only: bool,
) -> Option<String> {
    let candidates: Vec<String> = available
        .iter()
        .filter(|name| !text_only || !is_vision(name))
        .cloned()
        .collect();

    if let Some(configured) = configured.filter(|c| !c.trim().is_empty()) {
        if let Some(name) = find(&candidates, configured.trim()) {
            debug!(model = %name, "Using configured model");
            return Some(name.clone());
        }
    }

    let picked = preferences
        .iter()
        .find_map(|preferred| find(&candidates, preferred))
        .cloned();
    if let Some(name) = &picked {
        debug!(model = %name, "Auto-selected model");
    }
    picked
}
