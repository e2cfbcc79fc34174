//! Configuration for the identification pipeline

use crate::error::PipelineError;
use partsight_domain::PipelineState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the identification pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Time budget for the OCR call (seconds); vision models on small
    /// hardware are slow
    pub ocr_timeout_secs: u64,

    /// Time budget for the structuring call (seconds)
    pub structure_timeout_secs: u64,

    /// Time budget for the enrichment call (seconds)
    pub enrich_timeout_secs: u64,

    /// Time budget for the direct vision fallback (seconds)
    pub fallback_timeout_secs: u64,

    /// Extra attempts after a transient model failure (0 or 1)
    pub stage_retries: u32,

    /// Transcriptions with this many characters or fewer count as empty
    pub min_transcription_chars: usize,

    /// Visual and textual quantity signals further apart than this factor
    /// are treated as disagreeing
    pub quantity_discrepancy_factor: u32,

    /// Maximum title length (characters)
    pub max_title_chars: usize,

    /// Vision model override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_model: Option<String>,

    /// Text model override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_model: Option<String>,
}

impl PipelineConfig {
    /// Get the OCR timeout as a Duration
    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    /// Get the structuring timeout as a Duration
    pub fn structure_timeout(&self) -> Duration {
        Duration::from_secs(self.structure_timeout_secs)
    }

    /// Get the enrichment timeout as a Duration
    pub fn enrich_timeout(&self) -> Duration {
        Duration::from_secs(self.enrich_timeout_secs)
    }

    /// Get the fallback timeout as a Duration
    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_secs(self.fallback_timeout_secs)
    }

    /// Time budget for the model call made in `stage`
    pub fn timeout_for(&self, stage: PipelineState) -> Duration {
        match stage {
            PipelineState::Ocr => self.ocr_timeout(),
            PipelineState::Structure => self.structure_timeout(),
            PipelineState::FallbackVision => self.fallback_timeout(),
            PipelineState::Enrich => self.enrich_timeout(),
            _ => Duration::ZERO,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), PipelineError> {
        let timeouts = [
            ("ocr_timeout_secs", self.ocr_timeout_secs),
            ("structure_timeout_secs", self.structure_timeout_secs),
            ("enrich_timeout_secs", self.enrich_timeout_secs),
            ("fallback_timeout_secs", self.fallback_timeout_secs),
        ];
        for (name, secs) in timeouts {
            if secs == 0 {
                return Err(PipelineError::Config(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }
        if self.stage_retries > 1 {
            return Err(PipelineError::Config(
                "stage_retries cannot exceed 1".to_string(),
            ));
        }
        if self.quantity_discrepancy_factor == 0 {
            return Err(PipelineError::Config(
                "quantity_discrepancy_factor must be at least 1".to_string(),
            ));
        }
        if self.max_title_chars == 0 {
            return Err(PipelineError::Config(
                "max_title_chars must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    /// Default configuration sized for a local vision model on modest hardware
    fn default() -> Self {
        Self {
            ocr_timeout_secs: 600,
            structure_timeout_secs: 120,
            enrich_timeout_secs: 120,
            fallback_timeout_secs: 300,
            stage_retries: 1,
            min_transcription_chars: 10,
            quantity_discrepancy_factor: 2,
            max_title_chars: 80,
            vision_model: None,
            text_model: None,
        }
    }
}

impl PipelineConfig {
    /// Fast preset: short timeouts and no retries, for GPU-backed servers
    pub fn fast() -> Self {
        Self {
            ocr_timeout_secs: 120,
            structure_timeout_secs: 60,
            enrich_timeout_secs: 60,
            fallback_timeout_secs: 120,
            stage_retries: 0,
            ..Self::default()
        }
    }

    /// Patient preset: long timeouts, for CPU-only inference
    pub fn patient() -> Self {
        Self {
            ocr_timeout_secs: 1_200,
            structure_timeout_secs: 300,
            enrich_timeout_secs: 300,
            fallback_timeout_secs: 900,
            stage_retries: 1,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, PipelineError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, PipelineError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ocr_timeout(), Duration::from_secs(600));
        assert_eq!(config.stage_retries, 1);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(PipelineConfig::fast().validate().is_ok());
        assert!(PipelineConfig::patient().validate().is_ok());
        assert!(PipelineConfig::fast().ocr_timeout_secs < PipelineConfig::patient().ocr_timeout_secs);
    }

    #[test]
    fn test_ocr_budget_is_longest_text_stage() {
        let config = PipelineConfig::default();
        assert!(config.timeout_for(PipelineState::Ocr) > config.timeout_for(PipelineState::Structure));
        assert!(config.timeout_for(PipelineState::Ocr) > config.timeout_for(PipelineState::Enrich));
        assert_eq!(config.timeout_for(PipelineState::Decode), Duration::ZERO);
    }

    #[test]
    fn test_invalid_zero_timeout() {
        let mut config = PipelineConfig::default();
        config.structure_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("structure_timeout_secs"));
    }

    #[test]
    fn test_more_than_one_retry_rejected() {
        let mut config = PipelineConfig::default();
        config.stage_retries = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = PipelineConfig::patient();
        config.vision_model = Some("llava:13b".to_string());
        let toml_str = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = PipelineConfig::from_toml("ocr_timeout_secs = 900\n").unwrap();
        assert_eq!(config.ocr_timeout_secs, 900);
        assert_eq!(config.structure_timeout_secs, 120);
        assert_eq!(config.vision_model, None);
    }

    #[test]
    fn test_invalid_toml_values_rejected() {
        assert!(PipelineConfig::from_toml("stage_retries = 3\n").is_err());
        assert!(PipelineConfig::from_toml("ocr_timeout_secs = \"soon\"\n").is_err());
    }
}
