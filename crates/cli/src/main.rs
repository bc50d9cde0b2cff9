//! Crier CLI - findings publication for code review

use anyhow::Result;
use clap::Parser;
use crier_cli::Cli;

fn main() -> Result<()> {
    crier_cli::run(Cli::parse())
}
