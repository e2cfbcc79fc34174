//! CLI command definitions and argument parsing.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Partsight CLI - Identify hardware components from label photos.
#[derive(Debug, Parser)]
#[command(name = "partsight")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PARTSIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Profile to use
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (title only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Identify a component from one or more label photos
    Identify(IdentifyArgs),

    /// Decode part numbers without calling a model
    Decode(DecodeArgs),

    /// Find decodable part numbers in free text
    Scan(ScanArgs),

    /// List models installed on the active profile's server
    Models,

    /// Manage server profiles
    Profile(ProfileArgs),
}

/// Arguments for the identify command.
#[derive(Debug, Args)]
pub struct IdentifyArgs {
    /// Photos of the same item (all are sent together)
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Vision model (overrides profile and config)
    #[arg(long)]
    pub vision_model: Option<String>,

    /// Text model (overrides profile and config)
    #[arg(long)]
    pub text_model: Option<String>,
}

/// Arguments for the decode command.
#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Part numbers to decode
    #[arg(required = true)]
    pub parts: Vec<String>,
}

/// Arguments for the scan command.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Text file to scan
    #[arg(long, conflicts_with = "stdin")]
    pub file: Option<PathBuf>,

    /// Read text from standard input
    #[arg(long)]
    pub stdin: bool,

    /// Text to scan
    pub text: Option<String>,
}

/// Arguments for the profile command.
#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub action: ProfileAction,
}

/// Profile management actions.
#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// List all profiles
    List,

    /// Show the active profile
    Show,

    /// Switch to a different profile
    Switch {
        /// Profile name
        name: String,
    },

    /// Create or update a profile
    Set {
        /// Profile name
        name: String,

        /// Ollama endpoint
        #[arg(long, default_value = partsight_llm::ollama::DEFAULT_ENDPOINT)]
        endpoint: String,

        /// Preferred vision model
        #[arg(long)]
        vision_model: Option<String>,

        /// Preferred text model
        #[arg(long)]
        text_model: Option<String>,
    },

    /// Delete a profile
    Delete {
        /// Profile name
        name: String,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
