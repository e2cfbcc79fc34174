//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::{Color, Colorize};
use partsight_domain::{DecodeOutcome, DecodedSpec, IdentificationResult, PipelineTrace, StageOutcome};
use serde_json::{json, Value};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format an identification result.
    pub fn format_result(&self, result: &IdentificationResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&result_json(result))?),
            OutputFormat::Table => Ok(self.result_table(result)),
            OutputFormat::Quiet => Ok(result.title.clone()),
        }
    }

    fn result_table(&self, result: &IdentificationResult) -> String {
        let mut summary = Builder::default();
        summary.push_record(["Title", self.paint(&result.title, Color::Green).as_str()]);
        for (label, value) in [
            ("Manufacturer", &result.manufacturer),
            ("Model", &result.model),
            ("Part number", &result.part_number),
            ("Category", &result.category),
        ] {
            summary.push_record([label, value.as_deref().unwrap_or("-")]);
        }
        summary.push_record([
            "Quantity".to_string(),
            format!("{} ({})", result.quantity.value(), result.quantity.source().as_str()),
        ]);
        summary.push_record(["Path", result.path.as_str()]);
        summary.push_record(["Decoded", yes_no(result.decoded)]);
        summary.push_record(["Enriched", yes_no(!result.enrichment_skipped)]);

        let mut summary = summary.build();
        summary.with(Style::rounded());

        let mut spec = Builder::default();
        spec.push_record(["Field", "Value", "Source"]);
        for (key, value) in result.spec.fields().iter() {
            let source = if result.spec.is_protected(key) {
                self.paint("decoded", Color::Cyan)
            } else {
                "model".to_string()
            };
            spec.push_record([key.to_string(), value.to_string(), source]);
        }

        let mut out = summary.to_string();
        if !result.spec.fields().is_empty() {
            let mut spec = spec.build();
            spec.with(Style::rounded())
                .with(Modify::new(Rows::first()).with(Alignment::center()));
            out.push('\n');
            out.push_str(&spec.to_string());
        }
        if let Some(description) = &result.description {
            out.push_str("\n\n");
            out.push_str(description);
        }
        for note in &result.trace.notes {
            out.push('\n');
            out.push_str(&self.info(note));
        }
        out
    }

    /// Format the per-stage trace of a run.
    pub fn format_trace(&self, trace: &PipelineTrace) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(&trace_json(trace)).unwrap_or_default();
        }

        let path: Vec<&str> = trace.path().iter().map(|s| s.as_str()).collect();
        let mut builder = Builder::default();
        builder.push_record(["Stage", "Outcome", "Attempts", "Time (ms)"]);
        for record in &trace.stages {
            let outcome = match &record.outcome {
                StageOutcome::Succeeded => self.paint("ok", Color::Green),
                StageOutcome::Failed(_) => self.paint(&record.outcome.to_string(), Color::Red),
                StageOutcome::Skipped(_) => self.paint(&record.outcome.to_string(), Color::Yellow),
            };
            builder.push_record([
                record.stage.as_str().to_string(),
                outcome,
                record.attempts.to_string(),
                record.elapsed_ms.to_string(),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let mut out = format!("Path: {}\n{}", path.join(" → "), table);
        for note in &trace.notes {
            out.push('\n');
            out.push_str(&self.info(note));
        }
        out
    }

    /// Format decode outcomes, one per requested part number.
    pub fn format_decoded(&self, outcomes: &[(String, DecodeOutcome)]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = outcomes
                    .iter()
                    .map(|(part, outcome)| match outcome.as_decoded() {
                        Some(decoded) => decoded_json(decoded),
                        None => json!({ "input": part, "match": false }),
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(outcomes
                .iter()
                .map(|(part, outcome)| match outcome.as_decoded() {
                    Some(decoded) => decoded.part_number.clone(),
                    None => format!("{}\tno match", part),
                })
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let sections: Vec<String> = outcomes
                    .iter()
                    .map(|(part, outcome)| match outcome.as_decoded() {
                        Some(decoded) => self.decoded_table(decoded),
                        None => self.warning(&format!("{}: no match", part)),
                    })
                    .collect();
                Ok(sections.join("\n"))
            }
        }
    }

    /// Format part numbers found by scanning text.
    pub fn format_scan(&self, found: &[DecodedSpec]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = found.iter().map(decoded_json).collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(found
                .iter()
                .map(|d| d.part_number.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if found.is_empty() {
                    return Ok(self.warning("No decodable part numbers found."));
                }
                let mut builder = Builder::default();
                builder.push_record(["Part number", "Family", "Summary"]);
                for decoded in found {
                    let summary: Vec<&str> = decoded
                        .fields
                        .iter()
                        .filter(|(key, _)| *key != "manufacturer")
                        .map(|(_, value)| value)
                        .collect();
                    builder.push_record([
                        decoded.part_number.as_str(),
                        decoded.family.as_str(),
                        summary.join(", ").as_str(),
                    ]);
                }
                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format installed models, marking the ones that would be picked.
    pub fn format_models(
        &self,
        models: &[String],
        vision: Option<&str>,
        text: Option<&str>,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "installed": models,
                "vision": vision,
                "text": text,
            }))?),
            OutputFormat::Quiet => Ok(models.join("\n")),
            OutputFormat::Table => {
                if models.is_empty() {
                    return Ok(self.warning("No models installed."));
                }
                let mut builder = Builder::default();
                builder.push_record(["Model", "Selected for"]);
                for name in models {
                    let role = match (Some(name.as_str()) == vision, Some(name.as_str()) == text) {
                        (true, true) => "vision, text",
                        (true, false) => "vision",
                        (false, true) => "text",
                        (false, false) => "",
                    };
                    builder.push_record([name.as_str(), role]);
                }
                let mut table = builder.build();
                table.with(Style::rounded());
                Ok(table.to_string())
            }
        }
    }

    fn decoded_table(&self, decoded: &DecodedSpec) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, value) in decoded.fields.iter() {
            builder.push_record([key, value]);
        }
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        format!(
            "{} ({})\n{}",
            self.paint(&decoded.part_number, Color::Green),
            decoded.family,
            table
        )
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.paint(&format!("✓ {}", message), Color::Green)
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.paint(&format!("✗ {}", message), Color::Red)
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.paint(&format!("ℹ {}", message), Color::Blue)
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.paint(&format!("⚠ {}", message), Color::Yellow)
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color_enabled {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn decoded_json(decoded: &DecodedSpec) -> Value {
    json!({
        "input": decoded.part_number,
        "match": true,
        "family": decoded.family,
        "fields": decoded.fields.as_map(),
    })
}

fn trace_json(trace: &PipelineTrace) -> Value {
    let path: Vec<&str> = trace.path().iter().map(|s| s.as_str()).collect();
    let stages: Vec<Value> = trace
        .stages
        .iter()
        .map(|r| {
            json!({
                "stage": r.stage.as_str(),
                "outcome": r.outcome.to_string(),
                "attempts": r.attempts,
                "elapsed_ms": r.elapsed_ms,
            })
        })
        .collect();
    json!({ "path": path, "stages": stages, "notes": trace.notes })
}

fn result_json(result: &IdentificationResult) -> Value {
    json!({
        "request_id": result.request_id.to_string(),
        "title": result.title,
        "manufacturer": result.manufacturer,
        "model": result.model,
        "part_number": result.part_number,
        "category": result.category,
        "quantity": {
            "count": result.quantity.value(),
            "source": result.quantity.source().as_str(),
        },
        "spec": result.spec.fields().as_map(),
        "protected_fields": result.spec.protected_keys(),
        "description": result.description,
        "path": result.path.as_str(),
        "decoded": result.decoded,
        "enrichment_skipped": result.enrichment_skipped,
        "raw_text": result.raw_text,
        "trace": trace_json(&result.trace),
    })
}
