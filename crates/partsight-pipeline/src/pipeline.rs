//! The identification state machine
//!
//! ```text
//! START → OCR → STRUCTURE → DECODE → ENRICH → DONE
//!   │      │        │          ↑
//!   └──────┴────────┴→ FALLBACK_VISION
//! ```
//!
//! Every model call runs under its stage's time budget and is retried at
//! most once, and only for transient failures. OCR and
//! structuring failures route to the fallback; enrichment failures degrade to
//! the merged spec. Only a failed fallback ends the run without a result.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::merge::MergedSpec;
use crate::parser::{is_unknown_reply, parse_draft, parse_enrichment, EnrichmentReply};
use crate::prompt::{fallback_prompt, structure_prompt, EnrichmentPrompt, OCR_PROMPT};
use crate::quantity::QuantityDetector;
use crate::title::compose_title;
use partsight_decoder::{candidate_tokens, normalize, Decoder};
use partsight_domain::traits::{PartDecoder, TextModel, VisionModel};
use partsight_domain::{
    DecodedSpec, DraftSpec, EnrichedSpec, IdentificationResult, LabelImage, PipelinePath,
    PipelineState, PipelineTrace, QuantityEstimate, RawLabelText, RequestId, SpecField,
    StageOutcome, StageRecord,
};
use partsight_llm::LlmError;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Result of one stage's model call, retries included
struct StageCall {
    result: Result<String, LlmError>,
    attempts: u32,
    elapsed_ms: u64,
}

/// Per-request state carried between stages
struct Run {
    request_id: RequestId,
    state: PipelineState,
    path: PipelinePath,
    trace: PipelineTrace,
    raw_text: Option<RawLabelText>,
    draft: DraftSpec,
    decoded: Option<DecodedSpec>,
    merged: MergedSpec,
    quantity: QuantityEstimate,
    enriched: Option<EnrichedSpec>,
    reply: Option<EnrichmentReply>,
}

impl Run {
    fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            state: PipelineState::Start,
            path: PipelinePath::Normal,
            trace: PipelineTrace::new(),
            raw_text: None,
            draft: DraftSpec::default(),
            decoded: None,
            merged: MergedSpec::default(),
            quantity: QuantityEstimate::single(),
            enriched: None,
            reply: None,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(request_id = %self.request_id, from = %self.state, to = %next, "Pipeline transition");
        if next == PipelineState::FallbackVision {
            self.path = PipelinePath::Fallback;
        }
        self.trace.transition(self.state, next);
        self.state = next;
    }

    fn record(&mut self, stage: PipelineState, outcome: StageOutcome, attempts: u32, elapsed_ms: u64) {
        self.trace.record(StageRecord {
            stage,
            outcome,
            attempts,
            elapsed_ms,
        });
    }

    fn record_call(&mut self, stage: PipelineState, call: &StageCall, outcome: StageOutcome) {
        self.record(stage, outcome, call.attempts, call.elapsed_ms);
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Identification pipeline over a vision model, a text model and a decoder
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct Pipeline<V, T, D = Decoder> {
    vision: V,
    text: T,
    decoder: D,
    quantity: QuantityDetector,
    config: PipelineConfig,
}

impl<V, T> Pipeline<V, T, Decoder>
where
    V: VisionModel<Error = LlmError>,
    T: TextModel<Error = LlmError>,
{
    /// Create a pipeline with the standard rule table
    pub fn standard(vision: V, text: T, config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::new(vision, text, Decoder::standard(), config)
    }
}

impl<V, T, D> Pipeline<V, T, D>
where
    V: VisionModel<Error = LlmError>,
    T: TextModel<Error = LlmError>,
    D: PartDecoder,
{
    /// Create a new pipeline
    pub fn new(vision: V, text: T, decoder: D, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            vision,
            text,
            decoder,
            quantity: QuantityDetector::new(config.quantity_discrepancy_factor),
            config,
        })
    }

    /// The configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Identify the item shown in `images`
    ///
    /// All images show the same item; they are sent together in every
    /// vision call.
    pub async fn identify(
        &self,
        images: Vec<LabelImage>,
    ) -> Result<IdentificationResult, PipelineError> {
        if images.is_empty() {
            return Err(PipelineError::InvalidInput(
                "at least one image is required".to_string(),
            ));
        }
        if let Some(pos) = images.iter().position(LabelImage::is_empty) {
            return Err(PipelineError::InvalidInput(format!("image {} is empty", pos + 1)));
        }

        let mut run = Run::new(RequestId::new());
        let started = Instant::now();

        info!(
            request_id = %run.request_id,
            images = images.len(),
            vision_model = VisionModel::model_name(&self.vision),
            text_model = TextModel::model_name(&self.text),
            "Starting identification"
        );

        loop {
            let next = match run.state {
                PipelineState::Start => PipelineState::Ocr,
                PipelineState::Ocr => match self.transcribe(&images, &mut run).await {
                    Ok(text) => {
                        run.raw_text = Some(text);
                        PipelineState::Structure
                    }
                    Err(e) => {
                        warn!(request_id = %run.request_id, error = %e, "OCR unusable, falling back to direct vision");
                        PipelineState::FallbackVision
                    }
                },
                PipelineState::Structure => match self.structure(&mut run).await {
                    Ok(draft) => {
                        run.draft = draft;
                        PipelineState::Decode
                    }
                    Err(e) => {
                        warn!(request_id = %run.request_id, error = %e, "Structuring unusable, falling back to direct vision");
                        PipelineState::FallbackVision
                    }
                },
                PipelineState::FallbackVision => {
                    run.draft = self.fallback(&images, &mut run).await?;
                    PipelineState::Decode
                }
                PipelineState::Decode => {
                    self.decode(&mut run);
                    PipelineState::Enrich
                }
                PipelineState::Enrich => {
                    self.enrich(&mut run).await;
                    PipelineState::Done
                }
                PipelineState::Done => break,
            };
            run.advance(next);
        }

        let result = self.finish(run);
        info!(
            request_id = %result.request_id,
            path = %result.path,
            decoded = result.decoded,
            quantity = result.quantity.value(),
            enrichment_skipped = result.enrichment_skipped,
            elapsed_ms = elapsed_ms(started),
            "Identification complete"
        );
        Ok(result)
    }

    /// Run a model call under `limit`, retrying once on a transient failure
    /// when configured to
    ///
    /// A call that overruns is dropped, which aborts its request; nothing
    /// from a timed-out attempt outlives the stage.
    async fn call_model<F, Fut>(&self, stage: PipelineState, limit: Duration, call: F) -> StageCall
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<String, LlmError>>,
    {
        let started = Instant::now();
        let mut attempts = 0;
        loop {
            attempts += 1;
            debug!(stage = %stage, attempt = attempts, "Calling model");

            let result = match timeout(limit, call()).await {
                Err(_) => Err(LlmError::Timeout(limit.as_secs())),
                Ok(result) => result,
            };

            match result {
                Err(e) if e.is_transient() && attempts <= self.config.stage_retries => {
                    warn!(stage = %stage, error = %e, "Transient model failure, retrying once");
                }
                result => {
                    return StageCall {
                        result,
                        attempts,
                        elapsed_ms: elapsed_ms(started),
                    }
                }
            }
        }
    }

    async fn call_vision(&self, stage: PipelineState, images: &[LabelImage], prompt: String) -> StageCall {
        self.call_model(stage, self.config.timeout_for(stage), || {
            self.vision.describe_images(images, &prompt)
        })
        .await
    }

    async fn call_text(&self, stage: PipelineState, prompt: String) -> StageCall {
        self.call_model(stage, self.config.timeout_for(stage), || self.text.generate(&prompt))
            .await
    }

    /// OCR stage: images in, raw label text out
    async fn transcribe(
        &self,
        images: &[LabelImage],
        run: &mut Run,
    ) -> Result<RawLabelText, PipelineError> {
        let stage = PipelineState::Ocr;
        let call = self.call_vision(stage, images, OCR_PROMPT.to_string()).await;

        let text = match &call.result {
            Ok(text) => RawLabelText::new(text.trim()),
            Err(e) => {
                run.record_call(stage, &call, StageOutcome::Failed(e.to_string()));
                return Err(PipelineError::from_model(stage, e.clone()));
            }
        };

        if !text.is_usable(self.config.min_transcription_chars) {
            let reason = format!(
                "transcription too short ({} chars)",
                text.as_str().chars().count()
            );
            run.record_call(stage, &call, StageOutcome::Failed(reason.clone()));
            if !text.as_str().is_empty() {
                run.raw_text = Some(text);
            }
            return Err(PipelineError::TranscriptionFailure(reason));
        }

        debug!(request_id = %run.request_id, chars = text.as_str().len(), "Transcribed label text");
        run.record_call(stage, &call, StageOutcome::Succeeded);
        Ok(text)
    }

    /// Structuring stage: label text in, draft out (text model, no image)
    async fn structure(&self, run: &mut Run) -> Result<DraftSpec, PipelineError> {
        let stage = PipelineState::Structure;
        let text = run.raw_text.clone().unwrap_or_default();
        let call = self.call_text(stage, structure_prompt(&text)).await;

        let parsed = match &call.result {
            Ok(reply) => parse_draft(reply),
            Err(e) => Err(PipelineError::from_model(stage, e.clone())),
        };
        let parsed = parsed.and_then(|draft| match draft.part_number_candidate() {
            Some(_) => Ok(draft),
            None => Err(PipelineError::StructuringParseFailure(
                "no part number in structured output".to_string(),
            )),
        });

        match &parsed {
            Ok(_) => run.record_call(stage, &call, StageOutcome::Succeeded),
            Err(e) => run.record_call(stage, &call, StageOutcome::Failed(e.to_string())),
        }
        parsed
    }

    /// Fallback: images straight to a draft in one vision call
    async fn fallback(
        &self,
        images: &[LabelImage],
        run: &mut Run,
    ) -> Result<DraftSpec, PipelineError> {
        let stage = PipelineState::FallbackVision;
        let prompt = fallback_prompt(run.raw_text.as_ref());
        let call = self.call_vision(stage, images, prompt).await;

        let parsed = match &call.result {
            Ok(reply) => parse_draft(reply),
            Err(e) => Err(PipelineError::from_model(stage, e.clone())),
        };

        match parsed {
            Ok(draft) => {
                run.record_call(stage, &call, StageOutcome::Succeeded);
                Ok(draft)
            }
            Err(e) => {
                let reason = e.to_string();
                run.record_call(stage, &call, StageOutcome::Failed(reason.clone()));
                error!(request_id = %run.request_id, error = %reason, "Fallback identification failed");
                Err(PipelineError::IdentificationFailed {
                    reason,
                    trace: run.trace.clone(),
                })
            }
        }
    }

    /// Decode stage: never a branch point, NoMatch only leaves nothing
    /// protected
    fn decode(&self, run: &mut Run) {
        let stage = PipelineState::Decode;
        let started = Instant::now();
        let candidate = run.draft.part_number_candidate().map(str::to_string);

        let mut decoded = candidate
            .as_deref()
            .and_then(|pn| self.decoder.decode(pn).into_decoded());

        if decoded.is_none() {
            if let Some(found) = run.raw_text.as_ref().and_then(|t| self.scan(t.as_str())) {
                let note = format!(
                    "part number {} taken from label text ({} did not decode)",
                    found.part_number,
                    candidate.as_deref().unwrap_or("no candidate")
                );
                info!(request_id = %run.request_id, part_number = %found.part_number, "Decoded part number found in label text");
                run.trace.note(note);
                decoded = Some(found);
            }
        }

        let outcome = match &decoded {
            Some(d) => {
                debug!(request_id = %run.request_id, family = %d.family, fields = d.fields.len(), "Part number decoded");
                StageOutcome::Succeeded
            }
            None => StageOutcome::Skipped("no decoding rule matched".to_string()),
        };
        run.record(stage, outcome, 0, elapsed_ms(started));

        run.merged = MergedSpec::new(&run.draft.to_sheet(), decoded.as_ref());

        let part_number = decoded
            .as_ref()
            .map(|d| d.part_number.clone())
            .or(candidate);
        let reconciliation = self.quantity.estimate(
            run.draft.visual_count,
            run.raw_text.as_ref().map(RawLabelText::as_str),
            part_number.as_deref(),
        );
        if let Some(note) = reconciliation.discrepancy {
            run.trace.note(note);
        }
        run.quantity = reconciliation.estimate;
        run.decoded = decoded;
    }

    /// First token of `text` the decoder accepts
    fn scan(&self, text: &str) -> Option<DecodedSpec> {
        candidate_tokens(text).find_map(|token| self.decoder.decode(token).into_decoded())
    }

    /// Enrichment stage: may add fields, may never change protected ones
    async fn enrich(&self, run: &mut Run) {
        let stage = PipelineState::Enrich;
        let prompt = EnrichmentPrompt::new(run.merged.fields())
            .with_protected(run.merged.protected_keys())
            .with_quantity(run.quantity)
            .build();
        let call = self.call_text(stage, prompt).await;

        let reply = match &call.result {
            Ok(reply) if is_unknown_reply(reply) => {
                info!(request_id = %run.request_id, "Model has nothing to add, enrichment skipped");
                run.record_call(stage, &call, StageOutcome::Skipped("model replied UNKNOWN".to_string()));
                return;
            }
            Ok(reply) => parse_enrichment(reply),
            Err(e) => Err(PipelineError::EnrichmentFailure(e.to_string())),
        };

        match reply {
            Ok(reply) => {
                let (spec, rejected) = run.merged.enrich(&reply.fields);
                if !rejected.is_empty() {
                    run.trace.note(format!(
                        "enrichment tried to change protected fields: {}",
                        rejected.join(", ")
                    ));
                }
                run.record_call(stage, &call, StageOutcome::Succeeded);
                run.enriched = Some(spec);
                run.reply = Some(reply);
            }
            Err(e) => {
                warn!(request_id = %run.request_id, error = %e, "Returning merged spec without enrichment");
                run.record_call(stage, &call, StageOutcome::Failed(e.to_string()));
            }
        }
    }

    fn finish(&self, run: Run) -> IdentificationResult {
        let Run {
            request_id,
            path,
            trace,
            raw_text,
            draft,
            decoded,
            merged,
            quantity,
            enriched,
            reply,
            ..
        } = run;

        let enrichment_skipped = enriched.is_none();
        let spec = enriched.unwrap_or_else(|| merged.into_enriched());
        let (description, suggested_title) = match reply {
            Some(reply) => (reply.description, reply.title.or(draft.suggested_title.clone())),
            None => (None, draft.suggested_title.clone()),
        };

        let title = compose_title(
            decoded.as_ref(),
            spec.fields(),
            suggested_title.as_deref(),
            quantity,
            self.config.max_title_chars,
        );

        let part_number = decoded
            .as_ref()
            .map(|d| d.part_number.clone())
            .or_else(|| draft.part_number_candidate().map(normalize));
        let model = draft.model.clone().or_else(|| part_number.clone());
        let category = spec
            .field(SpecField::Category)
            .map(str::to_string)
            .or_else(|| decoded.as_ref().map(|_| "RAM".to_string()));

        IdentificationResult {
            request_id,
            manufacturer: spec.field(SpecField::Manufacturer).map(str::to_string),
            model,
            part_number,
            category,
            spec,
            quantity,
            title,
            description,
            path,
            decoded: decoded.is_some(),
            enrichment_skipped,
            raw_text: raw_text.map(RawLabelText::into_inner),
            trace,
        }
    }
}
