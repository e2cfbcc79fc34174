//! End-to-end tests for the identification pipeline

#[cfg(test)]
mod tests {
    use crate::{Pipeline, PipelineConfig, PipelineError};
    use partsight_domain::{
        LabelImage, PipelinePath, PipelineState, QuantitySource, SpecField, StageOutcome,
    };
    use partsight_llm::{LlmError, MockProvider};
    use std::time::Duration;

    const OCR: &str = "Transcribe every piece of text";
    const FALLBACK: &str = "Identify the component";
    const STRUCTURE: &str = "Organize the label text";
    const ENRICH: &str = "Complete the specification";

    const HYNIX_OCR: &str = "HMT451U6AFR8A-PB 4GB PC3-12800";
    const HYNIX_DRAFT: &str = r#"{
        "manufacturer": "SK hynix",
        "model": "HMT451U6AFR8A-PB",
        "category": "RAM",
        "visual_count": 1,
        "notes": null,
        "specs": {"capacity": "4GB", "speed": "PC3-12800"}
    }"#;
    const HYNIX_ENRICHMENT: &str = r#"{
        "specs": {"cas_latency": "CL11", "ranks": "1Rx8"},
        "description": "4GB DDR3-1600 SODIMM laptop memory module from SK hynix.",
        "title": "SK hynix 4GB laptop RAM"
    }"#;

    fn image() -> LabelImage {
        LabelImage::new(vec![0xFF, 0xD8, 0xFF, 0xE0]).with_name("label.jpg")
    }

    fn vision(ocr: &str, fallback: &str) -> MockProvider {
        let mut provider = MockProvider::default().with_model_name("vision-mock");
        provider.add_response(OCR, ocr);
        provider.add_response(FALLBACK, fallback);
        provider
    }

    fn text(structure: &str, enrich: &str) -> MockProvider {
        let mut provider = MockProvider::default().with_model_name("text-mock");
        provider.add_response(STRUCTURE, structure);
        provider.add_response(ENRICH, enrich);
        provider
    }

    fn pipeline(vision: MockProvider, text: MockProvider) -> Pipeline<MockProvider, MockProvider> {
        Pipeline::standard(vision, text, PipelineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_full_identification_flow() {
        let vision = vision(HYNIX_OCR, "{}");
        let text = text(HYNIX_DRAFT, HYNIX_ENRICHMENT);
        let result = pipeline(vision.clone(), text.clone())
            .identify(vec![image()])
            .await
            .unwrap();

        assert_eq!(result.path, PipelinePath::Normal);
        assert!(result.decoded);
        assert!(!result.enrichment_skipped);
        assert_eq!(result.part_number.as_deref(), Some("HMT451U6AFR8A-PB"));
        assert_eq!(result.manufacturer.as_deref(), Some("SK hynix"));

        let spec = &result.spec;
        assert_eq!(spec.field(SpecField::Manufacturer), Some("SK hynix"));
        assert_eq!(spec.field(SpecField::Capacity), Some("4GB"));
        assert_eq!(spec.field(SpecField::Generation), Some("DDR3"));
        assert_eq!(spec.field(SpecField::Speed), Some("PC3-12800"));
        assert_eq!(spec.field(SpecField::FormFactor), Some("SODIMM"));
        assert_eq!(spec.field(SpecField::CasLatency), Some("CL11"));
        assert!(spec.is_protected("form_factor"));
        assert!(!spec.is_protected("cas_latency"));

        assert!(result.description.unwrap().contains("laptop memory"));
        assert_eq!(result.quantity.value(), 1);
        assert_eq!(
            result.title,
            "SK hynix HMT451U6AFR8A-PB DDR3 4GB 1600MHz SODIMM PC3-12800"
        );
        assert_eq!(result.raw_text.as_deref(), Some(HYNIX_OCR));

        use PipelineState::*;
        assert_eq!(
            result.trace.path(),
            vec![Start, Ocr, Structure, Decode, Enrich, Done]
        );
        assert!(result.trace.stages.iter().all(|s| s.outcome.is_success()));

        // One OCR call with the image; structuring and enrichment are text only
        assert_eq!(vision.call_count(), 1);
        assert_eq!(text.call_count(), 2);
        assert!(text.prompts()[0].contains(HYNIX_OCR));
    }

    #[tokio::test]
    async fn test_empty_ocr_triggers_fallback() {
        let vision = vision(
            "",
            r#"{"manufacturer": "Kingston", "model": "KVR16S11/4", "visual_count": 1}"#,
        );
        let text = text(HYNIX_DRAFT, "UNKNOWN");
        let result = pipeline(vision.clone(), text.clone())
            .identify(vec![image()])
            .await
            .unwrap();

        assert_eq!(result.path, PipelinePath::Fallback);
        assert!(result.trace.visited(PipelineState::FallbackVision));
        assert!(!result.trace.visited(PipelineState::Structure));
        assert!(result
            .trace
            .transitions
            .contains(&(PipelineState::Ocr, PipelineState::FallbackVision)));
        assert!(matches!(
            result.trace.stage(PipelineState::Ocr).unwrap().outcome,
            StageOutcome::Failed(_)
        ));
        assert_eq!(result.raw_text, None);

        // The fallback prompt asks for transcription first when OCR read nothing
        assert!(vision.prompts()[1].contains("First read every line"));
        // Only enrichment used the text model
        assert_eq!(text.call_count(), 1);
    }

    #[tokio::test]
    async fn test_decoding_runs_on_fallback_output() {
        let vision = vision(
            "  ",
            r#"{"manufacturer": "Kingston", "model": "KVR16S11/4", "specs": {"capacity": "8GB"}}"#,
        );
        let text = text(HYNIX_DRAFT, r#"{"specs": {"capacity": "16GB"}}"#);
        let result = pipeline(vision, text).identify(vec![image()]).await.unwrap();

        assert_eq!(result.path, PipelinePath::Fallback);
        assert!(result.decoded);
        assert_eq!(result.spec.field(SpecField::Capacity), Some("4GB"));
        assert!(result.spec.is_protected("capacity"));
        assert_eq!(result.spec.field(SpecField::CasLatency), Some("CL11"));
    }

    #[tokio::test]
    async fn test_malformed_json_triggers_fallback() {
        let vision = vision(
            HYNIX_OCR,
            r#"{"manufacturer": "SK hynix", "model": "HMT451U6AFR8A-PB"}"#,
        );
        let text = text(
            r#"{"manufacturer": "SK hynix", "model": "HMT451U6AFR8A-PB", "specs": {"capacity": "4GB""#,
            HYNIX_ENRICHMENT,
        );
        let result = pipeline(vision.clone(), text).identify(vec![image()]).await.unwrap();

        assert_eq!(result.path, PipelinePath::Fallback);
        assert!(result
            .trace
            .transitions
            .contains(&(PipelineState::Structure, PipelineState::FallbackVision)));
        match &result.trace.stage(PipelineState::Structure).unwrap().outcome {
            StageOutcome::Failed(reason) => assert!(reason.contains("JSON")),
            other => panic!("unexpected structure outcome: {:?}", other),
        }

        // The fallback sees what OCR read
        let prompts = vision.prompts();
        assert!(prompts[1].contains("An earlier pass read this"));
        assert!(prompts[1].contains(HYNIX_OCR));
        assert!(result.decoded);
    }

    #[tokio::test]
    async fn test_missing_part_number_triggers_fallback() {
        let vision = vision(HYNIX_OCR, HYNIX_DRAFT);
        let text = text(
            r#"{"manufacturer": "SK hynix", "model": null, "category": "RAM"}"#,
            "UNKNOWN",
        );
        let result = pipeline(vision, text).identify(vec![image()]).await.unwrap();
        assert_eq!(result.path, PipelinePath::Fallback);
        assert!(result.decoded);
    }

    #[tokio::test]
    async fn test_enrichment_cannot_override_protected_fields() {
        let vision = vision(HYNIX_OCR, "{}");
        let text = text(
            HYNIX_DRAFT,
            r#"{"specs": {"capacity": "16GB", "form_factor": "DIMM", "generation": "DDR4",
                "speed": "PC4-25600", "manufacturer": "Samsung", "cas_latency": "CL11"},
                "description": "A module."}"#,
        );
        let result = pipeline(vision, text).identify(vec![image()]).await.unwrap();

        let spec = &result.spec;
        assert_eq!(spec.field(SpecField::Manufacturer), Some("SK hynix"));
        assert_eq!(spec.field(SpecField::Capacity), Some("4GB"));
        assert_eq!(spec.field(SpecField::Generation), Some("DDR3"));
        assert_eq!(spec.field(SpecField::Speed), Some("PC3-12800"));
        assert_eq!(spec.field(SpecField::FormFactor), Some("SODIMM"));
        assert_eq!(spec.field(SpecField::CasLatency), Some("CL11"));
        assert!(result
            .trace
            .notes
            .iter()
            .any(|n| n.contains("protected fields") && n.contains("capacity")));
    }

    #[tokio::test]
    async fn test_quantity_from_repeated_part_numbers() {
        let ocr = "HMT451U6AFR8A-PB 4GB\nHMT451U6AFR8A-PB 4GB\nHMT451U6AFR8A-PB 4GB";
        let vision = vision(ocr, "{}");
        let text = text(HYNIX_DRAFT, HYNIX_ENRICHMENT);
        let result = pipeline(vision, text.clone()).identify(vec![image()]).await.unwrap();

        assert_eq!(result.quantity.value(), 3);
        assert_eq!(result.quantity.source(), QuantitySource::PartNumberRepetition);
        assert!(result.trace.notes.iter().any(|n| n.contains("quantity signals disagree")));
        assert!(result.title.starts_with("3x "));
        assert!(result.title.ends_with("(12GB total)"));
        assert!(text.prompts()[1].contains("3 identical units"));
    }

    #[tokio::test]
    async fn test_quantity_from_visual_count() {
        let vision = vision(HYNIX_OCR, "{}");
        let text = text(
            r#"{"manufacturer": "SK hynix", "model": "HMT451U6AFR8A-PB", "visual_count": 4}"#,
            HYNIX_ENRICHMENT,
        );
        let result = pipeline(vision, text).identify(vec![image()]).await.unwrap();

        assert_eq!(result.quantity.value(), 4);
        assert_eq!(result.quantity.source(), QuantitySource::VisualCount);
        assert!(result.trace.notes.is_empty());
    }

    #[tokio::test]
    async fn test_enrichment_failure_degrades() {
        let vision = vision(HYNIX_OCR, "{}");
        let text = text(HYNIX_DRAFT, HYNIX_ENRICHMENT);
        text.push_response(HYNIX_DRAFT);
        text.push_error(LlmError::InvalidResponse("garbage".to_string()));
        let result = pipeline(vision, text).identify(vec![image()]).await.unwrap();

        assert!(result.enrichment_skipped);
        assert_eq!(result.path, PipelinePath::Normal);
        assert_eq!(result.description, None);
        assert_eq!(result.spec.field(SpecField::Capacity), Some("4GB"));
        assert_eq!(result.spec.field(SpecField::CasLatency), None);
        assert!(matches!(
            result.trace.stage(PipelineState::Enrich).unwrap().outcome,
            StageOutcome::Failed(_)
        ));
        assert_eq!(result.trace.path().last(), Some(&PipelineState::Done));
    }

    #[tokio::test]
    async fn test_unparseable_enrichment_degrades() {
        let vision = vision(HYNIX_OCR, "{}");
        let text = text(HYNIX_DRAFT, "Sure! This is a great memory module.");
        let result = pipeline(vision, text).identify(vec![image()]).await.unwrap();
        assert!(result.enrichment_skipped);
        assert!(result.decoded);
    }

    #[tokio::test]
    async fn test_unknown_enrichment_reply_is_skipped() {
        let vision = vision(HYNIX_OCR, "{}");
        let text = text(HYNIX_DRAFT, "UNKNOWN");
        let result = pipeline(vision, text).identify(vec![image()]).await.unwrap();

        assert!(result.enrichment_skipped);
        assert!(matches!(
            result.trace.stage(PipelineState::Enrich).unwrap().outcome,
            StageOutcome::Skipped(_)
        ));
    }

    #[tokio::test]
    async fn test_fallback_failure_is_fatal_with_trace() {
        let mut vision = MockProvider::default();
        vision.add_response(OCR, "");
        vision.add_error(FALLBACK, LlmError::ModelNotAvailable("llava:13b".to_string()));
        let text = text(HYNIX_DRAFT, HYNIX_ENRICHMENT);

        let err = pipeline(vision, text.clone())
            .identify(vec![image()])
            .await
            .unwrap_err();

        match err {
            PipelineError::IdentificationFailed { reason, trace } => {
                assert!(reason.contains("llava:13b"));
                assert_eq!(
                    trace.path(),
                    vec![PipelineState::Start, PipelineState::Ocr, PipelineState::FallbackVision]
                );
                assert!(matches!(
                    trace.stage(PipelineState::FallbackVision).unwrap().outcome,
                    StageOutcome::Failed(_)
                ));
            }
            other => panic!("expected identification failure, got {:?}", other),
        }
        assert_eq!(text.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_fallback_is_fatal() {
        let vision = vision("", "I see a green circuit board.");
        let text = text(HYNIX_DRAFT, HYNIX_ENRICHMENT);
        let err = pipeline(vision, text).identify(vec![image()]).await.unwrap_err();
        assert!(err.trace().is_some());
    }

    #[tokio::test]
    async fn test_transient_ocr_error_retried_once() {
        let vision = vision(HYNIX_OCR, "{}");
        vision.push_error(LlmError::Communication("connection reset".to_string()));
        let text = text(HYNIX_DRAFT, HYNIX_ENRICHMENT);
        let result = pipeline(vision.clone(), text).identify(vec![image()]).await.unwrap();

        assert_eq!(result.path, PipelinePath::Normal);
        assert_eq!(result.trace.stage(PipelineState::Ocr).unwrap().attempts, 2);
        assert_eq!(vision.call_count(), 2);
    }

    #[tokio::test]
    async fn test_second_transient_failure_falls_back() {
        let vision = vision(
            HYNIX_OCR,
            r#"{"manufacturer": "SK hynix", "model": "HMT451U6AFR8A-PB"}"#,
        );
        vision.push_error(LlmError::Timeout(600));
        vision.push_error(LlmError::Timeout(600));
        let text = text(HYNIX_DRAFT, HYNIX_ENRICHMENT);
        let result = pipeline(vision.clone(), text).identify(vec![image()]).await.unwrap();

        assert_eq!(result.path, PipelinePath::Fallback);
        assert_eq!(result.trace.stage(PipelineState::Ocr).unwrap().attempts, 2);
        // Two OCR attempts, then the fallback
        assert_eq!(vision.call_count(), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let vision = vision(
            HYNIX_OCR,
            r#"{"manufacturer": "SK hynix", "model": "HMT451U6AFR8A-PB"}"#,
        );
        vision.push_error(LlmError::ModelNotAvailable("qwen2.5vl:7b".to_string()));
        let text = text(HYNIX_DRAFT, HYNIX_ENRICHMENT);
        let result = pipeline(vision.clone(), text).identify(vec![image()]).await.unwrap();

        assert_eq!(result.path, PipelinePath::Fallback);
        assert_eq!(result.trace.stage(PipelineState::Ocr).unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_disabled() {
        let vision = vision(
            HYNIX_OCR,
            r#"{"manufacturer": "SK hynix", "model": "HMT451U6AFR8A-PB"}"#,
        );
        vision.push_error(LlmError::RateLimitExceeded);
        let text = text(HYNIX_DRAFT, HYNIX_ENRICHMENT);
        let result = Pipeline::standard(vision, text, PipelineConfig::fast())
            .unwrap()
            .identify(vec![image()])
            .await
            .unwrap();
        assert_eq!(result.path, PipelinePath::Fallback);
        assert_eq!(result.trace.stage(PipelineState::Ocr).unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn test_slow_models_time_out() {
        let vision = MockProvider::new("too late").with_delay(Duration::from_millis(1500));
        let text = text(HYNIX_DRAFT, HYNIX_ENRICHMENT);
        let config = PipelineConfig {
            ocr_timeout_secs: 1,
            fallback_timeout_secs: 1,
            stage_retries: 0,
            ..PipelineConfig::default()
        };
        let err = Pipeline::standard(vision, text, config)
            .unwrap()
            .identify(vec![image()])
            .await
            .unwrap_err();

        let trace = err.trace().unwrap();
        match &trace.stage(PipelineState::Ocr).unwrap().outcome {
            StageOutcome::Failed(reason) => assert!(reason.contains("timed out")),
            other => panic!("unexpected OCR outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timed_out_calls_do_not_outlive_identify() {
        let vision = MockProvider::new("too late").with_delay(Duration::from_millis(1800));
        let observer = vision.clone();
        let text = text(HYNIX_DRAFT, HYNIX_ENRICHMENT);
        let config = PipelineConfig {
            ocr_timeout_secs: 1,
            fallback_timeout_secs: 1,
            ..PipelineConfig::default()
        };
        let err = Pipeline::standard(vision, text, config)
            .unwrap()
            .identify(vec![image()])
            .await
            .unwrap_err();

        let trace = err.trace().unwrap();
        assert_eq!(trace.stage(PipelineState::Ocr).unwrap().attempts, 2);
        assert_eq!(trace.stage(PipelineState::FallbackVision).unwrap().attempts, 2);

        let after_identify = observer.call_count();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(observer.call_count(), after_identify);
        assert_eq!(after_identify, 0);
    }

    #[tokio::test]
    async fn test_part_number_recovered_from_label_text() {
        let ocr = "SK hynix 4GB 1Rx8 PC3-12800S-11-11-B2\nHMT451U6AFR8A-PB N0 AA";
        let vision = vision(ocr, "{}");
        let text = text(
            r#"{"manufacturer": "SK hynix", "model": "HNT451U6AFR8A-PB"}"#,
            HYNIX_ENRICHMENT,
        );
        let result = pipeline(vision, text).identify(vec![image()]).await.unwrap();

        assert!(result.decoded);
        assert_eq!(result.part_number.as_deref(), Some("HMT451U6AFR8A-PB"));
        assert_eq!(result.model.as_deref(), Some("HNT451U6AFR8A-PB"));
        assert!(result
            .trace
            .notes
            .iter()
            .any(|n| n.contains("taken from label text") && n.contains("HNT451U6AFR8A-PB")));
    }

    #[tokio::test]
    async fn test_undecodable_part_uses_model_values() {
        let vision = vision("WD10EZEX-00BN5A0 1TB SATA 7200RPM", "{}");
        let text = text(
            r#"{"manufacturer": "Western Digital", "model": "WD10EZEX-00BN5A0", "category": "HDD",
                "suggested_title": "Title: WD Blue 1TB 3.5\" HDD", "specs": {"capacity": "1TB"}}"#,
            "UNKNOWN",
        );
        let result = pipeline(vision, text).identify(vec![image()]).await.unwrap();

        assert!(!result.decoded);
        assert!(result.spec.protected_keys().is_empty());
        assert_eq!(result.category.as_deref(), Some("HDD"));
        assert_eq!(result.title, "WD Blue 1TB 3.5\" HDD");
        assert_eq!(
            result.trace.stage(PipelineState::Decode).unwrap().outcome,
            StageOutcome::Skipped("no decoding rule matched".to_string())
        );
    }

    #[tokio::test]
    async fn test_all_images_sent_together() {
        let vision = vision(HYNIX_OCR, "{}");
        let text = text(HYNIX_DRAFT, "UNKNOWN");
        pipeline(vision.clone(), text)
            .identify(vec![image(), image().with_name("back.jpg")])
            .await
            .unwrap();
        assert_eq!(vision.image_counts(), vec![2]);
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let p = pipeline(vision(HYNIX_OCR, "{}"), text(HYNIX_DRAFT, "UNKNOWN"));
        assert!(matches!(
            p.identify(vec![]).await,
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            p.identify(vec![image(), LabelImage::new(Vec::new())]).await,
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig {
            stage_retries: 2,
            ..PipelineConfig::default()
        };
        let result = Pipeline::standard(MockProvider::default(), MockProvider::default(), config);
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_requests_are_independent() {
        let p = pipeline(vision(HYNIX_OCR, "{}"), text(HYNIX_DRAFT, HYNIX_ENRICHMENT));
        let (a, b) = tokio::join!(p.identify(vec![image()]), p.identify(vec![image()]));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.spec, b.spec);
        assert_eq!(a.title, b.title);
    }
}
