//! Result module - what one identification run produces

use crate::quantity::QuantityEstimate;
use crate::request::RequestId;
use crate::spec::{SpecField, SpecSheet};
use std::collections::BTreeSet;
use std::fmt;

/// Which route through the pipeline produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelinePath {
    /// OCR, then text-only structuring
    Normal,
    /// Single direct vision-to-JSON call
    Fallback,
}

impl PipelinePath {
    /// Get the path name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePath::Normal => "normal",
            PipelinePath::Fallback => "fallback",
        }
    }
}

impl fmt::Display for PipelinePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// States of the identification state machine
///
/// ```text
/// START → OCR → STRUCTURE → DECODE → ENRICH → DONE
/// START → FALLBACK_VISION → DECODE → ENRICH → DONE
/// OCR / STRUCTURE ──failure──▶ FALLBACK_VISION
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Nothing has run yet
    Start,
    /// Transcribing the label with the vision model
    Ocr,
    /// Structuring transcribed text with the text model
    Structure,
    /// Direct vision-to-JSON identification
    FallbackVision,
    /// Deterministic part-number decoding
    Decode,
    /// Gap filling with the text model
    Enrich,
    /// Terminal state
    Done,
}

impl PipelineState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Start => "START",
            PipelineState::Ocr => "OCR",
            PipelineState::Structure => "STRUCTURE",
            PipelineState::FallbackVision => "FALLBACK_VISION",
            PipelineState::Decode => "DECODE",
            PipelineState::Enrich => "ENRICH",
            PipelineState::Done => "DONE",
        }
    }

    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Start, Ocr)
                | (Start, FallbackVision)
                | (Ocr, Structure)
                | (Ocr, FallbackVision)
                | (Structure, Decode)
                | (Structure, FallbackVision)
                | (FallbackVision, Decode)
                | (Decode, Enrich)
                | (Enrich, Done)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single stage ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage produced usable output
    Succeeded,
    /// The stage failed; the reason is kept for diagnostics
    Failed(String),
    /// The stage was bypassed or degraded
    Skipped(String),
}

impl StageOutcome {
    /// True for `Succeeded`
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Succeeded)
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Succeeded => f.write_str("ok"),
            StageOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            StageOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

/// Timing and outcome of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    /// Which stage ran
    pub stage: PipelineState,

    /// How it ended
    pub outcome: StageOutcome,

    /// Number of model calls made (1, or 2 after a retry)
    pub attempts: u32,

    /// Wall-clock time spent in the stage
    pub elapsed_ms: u64,
}

/// Path taken through the state machine, with per-stage records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineTrace {
    /// Every transition, in order
    pub transitions: Vec<(PipelineState, PipelineState)>,

    /// One record per executed stage
    pub stages: Vec<StageRecord>,

    /// Free-form observations (quantity discrepancies, substitutions, ...)
    pub notes: Vec<String>,
}

impl PipelineTrace {
    /// Create an empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition
    pub fn transition(&mut self, from: PipelineState, to: PipelineState) {
        self.transitions.push((from, to));
    }

    /// Record a finished stage
    pub fn record(&mut self, record: StageRecord) {
        self.stages.push(record);
    }

    /// Add an observation
    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// True when the trace passed through `state`
    pub fn visited(&self, state: PipelineState) -> bool {
        self.transitions.iter().any(|(_, to)| *to == state)
    }

    /// The record for a stage, if it ran (last one wins)
    pub fn stage(&self, state: PipelineState) -> Option<&StageRecord> {
        self.stages.iter().rev().find(|r| r.stage == state)
    }

    /// States visited in order, starting with the first source state
    pub fn path(&self) -> Vec<PipelineState> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some((from, _)) = self.transitions.first() {
            path.push(*from);
        }
        path.extend(self.transitions.iter().map(|(_, to)| *to));
        path
    }
}

/// Final spec: decoded fields (protected) plus model-provided fields
///
/// Immutable once the enrichment stage has returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichedSpec {
    fields: SpecSheet,
    protected: BTreeSet<String>,
}

impl EnrichedSpec {
    /// Assemble a spec from merged fields and the set of protected keys
    pub fn new(fields: SpecSheet, protected: BTreeSet<String>) -> Self {
        Self { fields, protected }
    }

    /// All fields
    pub fn fields(&self) -> &SpecSheet {
        &self.fields
    }

    /// Keys whose values came from deterministic decoding
    pub fn protected_keys(&self) -> &BTreeSet<String> {
        &self.protected
    }

    /// True when `key` came from deterministic decoding
    pub fn is_protected(&self, key: &str) -> bool {
        self.protected.contains(&crate::spec::normalize_key(key))
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }

    /// Look up a canonical field
    pub fn field(&self, field: SpecField) -> Option<&str> {
        self.fields.field(field)
    }
}

/// Everything an identification run hands to its caller
#[derive(Debug, Clone)]
pub struct IdentificationResult {
    /// Identifier of this run
    pub request_id: RequestId,

    /// Manufacturer (decoded when available)
    pub manufacturer: Option<String>,

    /// Model name as printed or proposed
    pub model: Option<String>,

    /// Part number that was decoded, or the best candidate when nothing decoded
    pub part_number: Option<String>,

    /// Product category
    pub category: Option<String>,

    /// Final spec
    pub spec: EnrichedSpec,

    /// Number of identical units
    pub quantity: QuantityEstimate,

    /// Marketplace-neutral title
    pub title: String,

    /// Human-readable description, when one could be produced
    pub description: Option<String>,

    /// Route taken through the pipeline
    pub path: PipelinePath,

    /// Whether a decoding rule matched
    pub decoded: bool,

    /// Whether enrichment was skipped and the pre-enrichment spec returned
    pub enrichment_skipped: bool,

    /// Transcribed label text, when OCR produced any
    pub raw_text: Option<String>,

    /// Per-stage timing and failure trace
    pub trace: PipelineTrace,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use PipelineState::*;
        assert!(Start.can_transition_to(Ocr));
        assert!(Ocr.can_transition_to(FallbackVision));
        assert!(Structure.can_transition_to(FallbackVision));
        assert!(FallbackVision.can_transition_to(Decode));
        assert!(Decode.can_transition_to(Enrich));
        assert!(Enrich.can_transition_to(Done));
    }

    #[test]
    fn test_forbidden_transitions() {
        use PipelineState::*;
        assert!(!Decode.can_transition_to(FallbackVision));
        assert!(!Enrich.can_transition_to(FallbackVision));
        assert!(!Ocr.can_transition_to(Decode));
        assert!(!Done.can_transition_to(Start));
    }

    #[test]
    fn test_trace_path() {
        use PipelineState::*;
        let mut trace = PipelineTrace::new();
        trace.transition(Start, Ocr);
        trace.transition(Ocr, FallbackVision);
        trace.transition(FallbackVision, Decode);
        assert_eq!(trace.path(), vec![Start, Ocr, FallbackVision, Decode]);
        assert!(trace.visited(FallbackVision));
        assert!(!trace.visited(Structure));
    }

    #[test]
    fn test_trace_stage_lookup_returns_latest() {
        let mut trace = PipelineTrace::new();
        trace.record(StageRecord {
            stage: PipelineState::Ocr,
            outcome: StageOutcome::Failed("timeout".to_string()),
            attempts: 2,
            elapsed_ms: 10,
        });
        let record = trace.stage(PipelineState::Ocr).unwrap();
        assert_eq!(record.attempts, 2);
        assert!(!record.outcome.is_success());
        assert!(trace.stage(PipelineState::Enrich).is_none());
    }

    #[test]
    fn test_enriched_spec_protection_lookup() {
        let fields: SpecSheet = [("capacity", "4GB"), ("cas_latency", "CL11")]
            .into_iter()
            .collect();
        let protected: BTreeSet<String> = ["capacity".to_string()].into_iter().collect();
        let spec = EnrichedSpec::new(fields, protected);
        assert!(spec.is_protected("Capacity"));
        assert!(!spec.is_protected("cas_latency"));
        assert_eq!(spec.field(SpecField::CasLatency), Some("CL11"));
    }
}
