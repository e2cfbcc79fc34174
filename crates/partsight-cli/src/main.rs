//! Partsight CLI - identify hardware components from label photos.

use anyhow::Context;
use clap::Parser;
use partsight_cli::cli::ScanArgs;
use partsight_cli::commands;
use partsight_cli::{Cli, Command, Config, Formatter};
use partsight_decoder::Decoder;
use partsight_domain::LabelImage;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default configuration");
            Config::default()
        }),
    };

    if let Some(profile_name) = cli.profile {
        config.switch_profile(profile_name)?;
    }

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Identify(args) => {
            let images = load_images(&args.images)?;
            commands::execute_identify(args, images, &config, &formatter).await?;
        }
        Command::Decode(args) => {
            commands::execute_decode(args, &Decoder::standard(), &formatter)?;
        }
        Command::Scan(args) => {
            let text = read_scan_input(&args)?;
            commands::execute_scan(&text, &Decoder::standard(), &formatter)?;
        }
        Command::Models => {
            commands::execute_models(&config, &formatter).await?;
        }
        Command::Profile(args) => {
            commands::execute_profile(args, &mut config, &formatter)?;
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_images(paths: &[PathBuf]) -> anyhow::Result<Vec<LabelImage>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(LabelImage::new(bytes).with_name(name))
        })
        .collect()
}

fn read_scan_input(args: &ScanArgs) -> anyhow::Result<String> {
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if !args.stdin {
        anyhow::bail!("Nothing to scan: pass text, --file or --stdin");
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read standard input")?;
    Ok(text)
}
