//! Parse model output into drafts and enrichment replies

use crate::error::PipelineError;
use partsight_domain::{DraftSpec, SpecSheet};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Top-level keys of the structuring schema that are not spec fields
const IDENTITY_KEYS: &[&str] = &[
    "manufacturer",
    "model",
    "category",
    "visual_count",
    "quantity",
    "count",
    "notes",
    "suggested_title",
    "title",
    "specs",
    "description",
];

/// Keys the structuring reply must carry (null is allowed)
const REQUIRED_KEYS: &[&str] = &["manufacturer", "model"];

/// What the enrichment stage proposed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReply {
    /// Proposed spec fields, before protection is applied
    pub fields: SpecSheet,

    /// Human-readable description
    pub description: Option<String>,

    /// Suggested title
    pub title: Option<String>,
}

/// True when the model declined to enrich (reply starts with `UNKNOWN`)
pub fn is_unknown_reply(response: &str) -> bool {
    response
        .trim_start()
        .trim_start_matches(['`', '"', '*'])
        .to_ascii_uppercase()
        .starts_with("UNKNOWN")
}

/// Parse a structuring (or fallback) reply into a draft
pub fn parse_draft(response: &str) -> Result<DraftSpec, PipelineError> {
    let obj = parse_object(response)?;

    for key in REQUIRED_KEYS {
        if !obj.contains_key(*key) {
            return Err(PipelineError::StructuringParseFailure(format!(
                "missing required key '{}'",
                key
            )));
        }
    }

    let mut draft = DraftSpec {
        manufacturer: string_field(&obj, "manufacturer"),
        model: string_field(&obj, "model"),
        category: string_field(&obj, "category"),
        visual_count: ["visual_count", "quantity", "count"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(as_count)),
        notes: string_field(&obj, "notes"),
        suggested_title: string_field(&obj, "suggested_title")
            .or_else(|| string_field(&obj, "title")),
        fields: SpecSheet::new(),
    };

    if let Some(specs) = obj.get("specs").and_then(Value::as_object) {
        collect_scalars(specs, &mut draft.fields);
    }
    // Stray top-level fields (`mpn`, `capacity`, ...) are kept too
    for (key, value) in obj.iter().filter(|(k, _)| !IDENTITY_KEYS.contains(&k.as_str())) {
        if let Some(text) = scalar_text(value) {
            draft.fields.insert(key, text);
        }
    }

    debug!(
        manufacturer = ?draft.manufacturer,
        model = ?draft.model,
        fields = draft.fields.len(),
        "Parsed draft spec"
    );
    Ok(draft)
}

/// Parse an enrichment reply
pub fn parse_enrichment(response: &str) -> Result<EnrichmentReply, PipelineError> {
    let obj = parse_object(response)
        .map_err(|e| PipelineError::EnrichmentFailure(e.to_string()))?;

    let mut reply = EnrichmentReply {
        description: string_field(&obj, "description"),
        title: string_field(&obj, "title").or_else(|| string_field(&obj, "suggested_title")),
        ..Default::default()
    };
    if let Some(specs) = obj.get("specs").and_then(Value::as_object) {
        collect_scalars(specs, &mut reply.fields);
    }
    for (key, value) in obj.iter().filter(|(k, _)| !IDENTITY_KEYS.contains(&k.as_str())) {
        if let Some(text) = scalar_text(value) {
            reply.fields.insert(key, text);
        }
    }
    Ok(reply)
}

/// Extract, repair if needed, and parse a single JSON object
pub fn parse_object(response: &str) -> Result<Map<String, Value>, PipelineError> {
    let json_str = extract_json(response)?;

    let value: Value = match serde_json::from_str(&json_str) {
        Ok(value) => value,
        Err(first) => {
            let repaired = repair_json(&json_str);
            match serde_json::from_str(&repaired) {
                Ok(value) => {
                    debug!("Parsed model output after JSON repair");
                    value
                }
                Err(_) => {
                    warn!(error = %first, "Model output is not valid JSON");
                    return Err(first.into());
                }
            }
        }
    };

    match value {
        Value::Object(obj) => Ok(obj),
        _ => Err(PipelineError::StructuringParseFailure(
            "Expected JSON object".to_string(),
        )),
    }
}

/// Extract the JSON object from a reply, tolerating prose and code fences
fn extract_json(response: &str) -> Result<String, PipelineError> {
    let mut text = response.trim();

    // Drop a leading ```json / ``` line and a trailing fence
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        text = text.trim_end().strip_suffix("```").unwrap_or(text);
    }

    let start = text.find('{');
    let end = text.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(text[start..=end].to_string()),
        _ => Err(PipelineError::StructuringParseFailure(
            "No JSON object in model output".to_string(),
        )),
    }
}

/// Fix the mistakes small models make most often: raw control characters
/// inside strings and trailing commas
fn repair_json(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    let mut in_string = false;
    let mut backslash = false;
    for c in json.chars() {
        if in_string {
            match c {
                _ if backslash => {
                    backslash = false;
                    escaped.push(c);
                }
                '\\' => {
                    backslash = true;
                    escaped.push(c);
                }
                '"' => {
                    in_string = false;
                    escaped.push(c);
                }
                '\n' => escaped.push_str("\\n"),
                '\t' => escaped.push_str("\\t"),
                '\r' => {}
                _ => escaped.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            escaped.push(c);
        }
    }

    // Remove commas directly followed (modulo whitespace) by } or ]
    let chars: Vec<char> = escaped.chars().collect();
    let mut out = String::with_capacity(escaped.len());
    let mut in_string = false;
    let mut backslash = false;
    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if backslash {
                backslash = false;
            } else if c == '\\' {
                backslash = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(scalar_text)
        .filter(|s| !is_placeholder(s))
}

/// Text form of a scalar value; null, objects and empty strings yield None
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Models echo "null" or "unknown" as strings instead of omitting a value
fn is_placeholder(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "null" | "none" | "unknown" | "n/a" | "-"
    )
}

fn collect_scalars(obj: &Map<String, Value>, sheet: &mut SpecSheet) {
    for (key, value) in obj {
        if let Some(text) = scalar_text(value).filter(|s| !is_placeholder(s)) {
            sheet.insert(key, text);
        }
    }
}

/// A non-negative count from a number or numeric string
fn as_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRAFT: &str = r#"{
        "manufacturer": "SK hynix",
        "model": "HMT451U6AFR8A-PB",
        "category": "RAM",
        "visual_count": 2,
        "notes": null,
        "specs": {"capacity": "4GB", "speed": "PC3-12800", "voltage": null}
    }"#;

    #[test]
    fn test_parse_valid_draft() {
        let draft = parse_draft(DRAFT).unwrap();
        assert_eq!(draft.manufacturer.as_deref(), Some("SK hynix"));
        assert_eq!(draft.part_number_candidate(), Some("HMT451U6AFR8A-PB"));
        assert_eq!(draft.visual_count, Some(2));
        assert_eq!(draft.notes, None);
        assert_eq!(draft.fields.get("capacity"), Some("4GB"));
        assert!(!draft.fields.contains_key("voltage"));
    }

    #[test]
    fn test_parse_draft_with_markdown_wrapper_and_prose() {
        let response = format!("Here is the JSON you asked for:\n```json\n{}\n```\nHope this helps!", DRAFT);
        let draft = parse_draft(&response).unwrap();
        assert_eq!(draft.model.as_deref(), Some("HMT451U6AFR8A-PB"));
    }

    #[test]
    fn test_parse_truncated_json_fails() {
        let response = r#"{"manufacturer": "Kingston", "model": "KVR16S11/4", "specs": {"capacity": "4GB""#;
        assert!(matches!(
            parse_draft(response),
            Err(PipelineError::StructuringParseFailure(_))
        ));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_draft("This is not JSON").is_err());
        assert!(parse_draft("").is_err());
    }

    #[test]
    fn test_parse_missing_required_key() {
        let err = parse_draft(r#"{"manufacturer": "Samsung"}"#).unwrap_err();
        assert!(err.to_string().contains("'model'"));
    }

    #[test]
    fn test_parse_json_not_object() {
        assert!(parse_object("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_repair_raw_newline_and_trailing_comma() {
        let response = "{\"manufacturer\": \"Crucial\", \"model\": \"CT8G4SFS832A\",\n \"notes\": \"two\nlines\",\n}";
        let draft = parse_draft(response).unwrap();
        assert_eq!(draft.notes.as_deref(), Some("two\nlines"));
        assert_eq!(draft.model.as_deref(), Some("CT8G4SFS832A"));
    }

    #[test]
    fn test_repair_keeps_commas_inside_strings() {
        let repaired = repair_json(r#"{"notes": "a,}", "list": [1, 2,],}"#);
        assert_eq!(repaired, r#"{"notes": "a,}", "list": [1, 2]}"#);
    }

    #[test]
    fn test_placeholders_become_absent() {
        let draft = parse_draft(r#"{"manufacturer": "unknown", "model": "null", "category": "RAM"}"#).unwrap();
        assert_eq!(draft.manufacturer, None);
        assert_eq!(draft.part_number_candidate(), None);
        assert_eq!(draft.category.as_deref(), Some("RAM"));
    }

    #[test]
    fn test_top_level_extras_and_count_aliases() {
        let draft = parse_draft(
            r#"{"manufacturer": "Crucial", "model": null, "mpn": "CT8G4SFS832A", "quantity": "3"}"#,
        )
        .unwrap();
        assert_eq!(draft.part_number_candidate(), Some("CT8G4SFS832A"));
        assert_eq!(draft.visual_count, Some(3));
    }

    #[test]
    fn test_parse_enrichment() {
        let reply = parse_enrichment(
            r#"{"specs": {"cas_latency": "CL11", "capacity": "8GB"}, "description": "Laptop RAM.", "title": "SK hynix 4GB"}"#,
        )
        .unwrap();
        assert_eq!(reply.fields.get("cas_latency"), Some("CL11"));
        assert_eq!(reply.fields.get("capacity"), Some("8GB"));
        assert_eq!(reply.description.as_deref(), Some("Laptop RAM."));
        assert_eq!(reply.title.as_deref(), Some("SK hynix 4GB"));
    }

    #[test]
    fn test_parse_enrichment_failure_kind() {
        assert!(matches!(
            parse_enrichment("I cannot help with that"),
            Err(PipelineError::EnrichmentFailure(_))
        ));
    }

    #[test]
    fn test_unknown_reply() {
        assert!(is_unknown_reply("UNKNOWN"));
        assert!(is_unknown_reply("  unknown part, sorry"));
        assert!(is_unknown_reply("**UNKNOWN**"));
        assert!(!is_unknown_reply(r#"{"description": "UNKNOWN"}"#));
    }
}
