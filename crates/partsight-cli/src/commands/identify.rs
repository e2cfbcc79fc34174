//! Identify command implementation.

use crate::cli::IdentifyArgs;
use crate::commands::models::select_models;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use partsight_domain::LabelImage;
use partsight_llm::OllamaProvider;
use partsight_pipeline::Pipeline;

/// Execute the identify command on already-loaded images.
///
/// When identification fails, the per-stage trace is printed to stderr
/// before the error is returned.
pub async fn execute_identify(
    args: IdentifyArgs,
    images: Vec<LabelImage>,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let profile = config.get_active_profile()?;
    let models = select_models(config, args.vision_model.as_deref(), args.text_model.as_deref()).await?;

    let pipeline_config = &config.pipeline;
    let vision = OllamaProvider::new(&profile.endpoint, models.vision)?
        .with_timeout(pipeline_config.ocr_timeout().max(pipeline_config.fallback_timeout()));
    let text = OllamaProvider::new(&profile.endpoint, models.text)?
        .with_timeout(pipeline_config.structure_timeout().max(pipeline_config.enrich_timeout()));

    let pipeline = Pipeline::standard(vision, text, pipeline_config.clone())?;
    match pipeline.identify(images).await {
        Ok(result) => {
            println!("{}", formatter.format_result(&result)?);
            Ok(())
        }
        Err(e) => {
            if let Some(trace) = e.trace() {
                eprintln!("{}", formatter.format_trace(trace));
            }
            Err(e.into())
        }
    }
}
