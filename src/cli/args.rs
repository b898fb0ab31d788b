//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pullcache - Inspect and maintain a node's ensured image pull cache.
#[derive(Debug, Parser)]
#[command(name = "pullcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Node agent root directory (overrides root_dir from the config)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List every record on disk
    List(ListArgs),

    /// Show the credential entries of one image
    Show(ShowArgs),

    /// Forget an image (memory and disk)
    Forget(ForgetArgs),

    /// Expire stale credential entries once
    Sweep(SweepArgs),

    /// Print the JSON Schema of the config file
    Schema,
}

/// Arguments for `list`.
#[derive(Debug, Clone, clap::Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `show`.
#[derive(Debug, Clone, clap::Args)]
pub struct ShowArgs {
    /// Image reference, e.g. docker.io/library/nginx:1.25
    pub image: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `forget`.
#[derive(Debug, Clone, clap::Args)]
pub struct ForgetArgs {
    /// Image reference to forget
    pub image: String,
}

/// Arguments for `sweep`.
#[derive(Debug, Clone, clap::Args)]
pub struct SweepArgs {
    /// Recheck period to apply instead of the configured one (enables recheck)
    #[arg(long)]
    pub period: Option<String>,
}
