//! Initialize .crier.toml configuration

use anyhow::Result;
use crier_core::CrierConfig;
use std::path::Path;

pub fn run(path: Option<&Path>) -> Result<()> {
    let target_path = path.unwrap_or_else(|| Path::new("."));
    let config_path = target_path.join(".crier.toml");

    if config_path.exists() {
        println!("⚠️  .crier.toml already exists at {:?}", config_path);
        return Ok(());
    }

    let config = CrierConfig::default();
    config.save(&config_path)?;

    println!("✅ Created .crier.toml at {:?}", config_path);
    println!("\nSet the review API endpoint and token, then publish a run:");
    println!("  crier publish --findings findings.json --revision <id> --diff <id> --build-target <id>");

    Ok(())
}
