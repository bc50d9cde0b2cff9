//! Crier CLI library — exposed for integration tests

pub mod commands;
pub mod conduit;
#[allow(dead_code)]
pub mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crier")]
#[command(about = "Publishes static-analysis findings to your code review", long_about = None)]
#[command(version = crier_core::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize .crier.toml configuration
    Init {
        /// Path to initialize (default: current directory)
        path: Option<PathBuf>,
    },

    /// Publish one analysis run's findings to the review system
    Publish {
        /// Findings JSON produced by the analyzer tasks
        #[arg(long)]
        findings: PathBuf,

        /// Failed-task JSON list
        #[arg(long)]
        failures: Option<PathBuf>,

        /// Repository queried for diff membership (default: current directory)
        #[arg(long)]
        repo: Option<PathBuf>,

        /// Base ref the reviewed diff is against
        #[arg(long, default_value = "main")]
        base: String,

        /// Review revision id
        #[arg(long)]
        revision: u64,

        /// Diff id under review
        #[arg(long)]
        diff: u64,

        /// Build target receiving lint/unit batches
        #[arg(long)]
        build_target: String,

        /// Mercurial revision used in CI job links
        #[arg(long)]
        head_rev: Option<String>,

        /// Directory where improvement patches are persisted
        #[arg(long)]
        patch_dir: Option<PathBuf>,

        /// Render everything but print wire calls instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path } => commands::init::run(path.as_deref()),
        Commands::Publish {
            findings,
            failures,
            repo,
            base,
            revision,
            diff,
            build_target,
            head_rev,
            patch_dir,
            dry_run,
        } => commands::publish::run(commands::publish::PublishArgs {
            findings,
            failures,
            repo,
            base,
            revision,
            diff,
            build_target,
            head_rev,
            patch_dir,
            dry_run,
        }),
    }
}
