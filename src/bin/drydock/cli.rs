//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Drydock - a feature-probing build configurator for C projects
#[derive(Debug, Parser)]
#[command(name = "drydock", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Probe the platform and generate the build plan and capability header
    Configure(ConfigureArgs),

    /// Check that the toolchain and environment are usable
    Doctor(DoctorArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ConfigureArgs {
    /// Modules to enable (beyond optional default-on modules)
    pub modules: Vec<String>,

    /// Force a feature on, regardless of its probe outcome
    #[arg(long = "enable", value_name = "FEATURE")]
    pub enable_features: Vec<String>,

    /// Force a feature off, regardless of its probe outcome
    #[arg(long = "disable", value_name = "FEATURE")]
    pub disable_features: Vec<String>,

    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub source_root: Option<PathBuf>,

    /// Build directory (defaults to <source-root>/build)
    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// Name of the linked executable
    #[arg(long, default_value = "app")]
    pub output_name: String,

    /// Project catalog file (defaults to drydock.toml when present)
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DoctorArgs {}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
