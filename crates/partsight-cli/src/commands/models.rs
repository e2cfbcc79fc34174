//! Models command implementation and model selection.

use crate::config::{Config, Profile};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use partsight_llm::{resolve_model, OllamaProvider, TEXT_MODELS, VISION_MODELS};
use tracing::info;

/// Vision and text model chosen for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    /// Model used for OCR and the fallback
    pub vision: String,
    /// Model used for structuring and enrichment
    pub text: String,
}

/// Execute the models command.
pub async fn execute_models(config: &Config, formatter: &Formatter) -> Result<()> {
    let profile = config.get_active_profile()?;
    let installed = installed_models(&profile.endpoint).await?;

    let vision = resolve_model(&installed, preferred_vision(None, profile, config), VISION_MODELS, false);
    let text = resolve_model(&installed, preferred_text(None, profile, config), TEXT_MODELS, true);

    println!(
        "{}",
        formatter.format_models(&installed, vision.as_deref(), text.as_deref())?
    );
    Ok(())
}

/// Pick the models for an identification run
///
/// A command-line choice beats the profile, which beats the `[pipeline]`
/// table; with none of them installed the preference lists decide.
pub async fn select_models(
    config: &Config,
    vision_override: Option<&str>,
    text_override: Option<&str>,
) -> Result<ModelSelection> {
    let profile = config.get_active_profile()?;
    let installed = installed_models(&profile.endpoint).await?;

    let vision = resolve_model(
        &installed,
        preferred_vision(vision_override, profile, config),
        VISION_MODELS,
        false,
    )
    .ok_or_else(|| CliError::NoModel {
        kind: "vision",
        endpoint: profile.endpoint.clone(),
    })?;
    let text = resolve_model(
        &installed,
        preferred_text(text_override, profile, config),
        TEXT_MODELS,
        true,
    )
    .ok_or_else(|| CliError::NoModel {
        kind: "text",
        endpoint: profile.endpoint.clone(),
    })?;

    info!(vision = %vision, text = %text, "Selected models");
    Ok(ModelSelection { vision, text })
}

async fn installed_models(endpoint: &str) -> Result<Vec<String>> {
    let probe = OllamaProvider::new(endpoint, "")?;
    probe
        .list_models()
        .await
        .map_err(|e| CliError::Connection(format!("{} ({})", endpoint, e)))
}

fn preferred_vision<'a>(cli: Option<&'a str>, profile: &'a Profile, config: &'a Config) -> Option<&'a str> {
    cli.or(profile.vision_model.as_deref())
        .or(config.pipeline.vision_model.as_deref())
}

fn preferred_text<'a>(cli: Option<&'a str>, profile: &'a Profile, config: &'a Config) -> Option<&'a str> {
    cli.or(profile.text_model.as_deref())
        .or(config.pipeline.text_model.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_precedence() {
        let mut config = Config::default();
        config.pipeline.vision_model = Some("llava".to_string());
        config.pipeline.text_model = Some("llama3.1".to_string());
        let profile = Profile {
            vision_model: Some("minicpm-v".to_string()),
            ..Profile::default()
        };

        assert_eq!(preferred_vision(Some("qwen2.5vl"), &profile, &config), Some("qwen2.5vl"));
        assert_eq!(preferred_vision(None, &profile, &config), Some("minicpm-v"));
        assert_eq!(preferred_text(None, &profile, &config), Some("llama3.1"));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let mut config = Config::default();
        config.set_profile(
            "default".to_string(),
            Profile {
                endpoint: "http://127.0.0.1:9".to_string(),
                ..Profile::default()
            },
        );
        let result = select_models(&config, None, None).await;
        assert!(matches!(result, Err(CliError::Connection(_))));
    }
}
