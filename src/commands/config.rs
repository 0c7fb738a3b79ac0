use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::ConfigCommands;
use crate::config::Repo2CwlConfig;
use crate::config_discovery::load_config_with_discovery;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Validate { path } => validate(&path),
        ConfigCommands::Generate => generate(),
        ConfigCommands::Show { config } => show(config),
    }
}

fn validate(path: &Path) -> Result<()> {
    info!("Validating config file: {}", path.display());

    let config = Repo2CwlConfig::from_file(path)?;
    config.validate()?;

    println!("✓ Configuration file is valid: {}", path.display());
    println!("\nSummary:");
    println!("  - Script directory: {}", config.output.bin_dir);
    println!("  - Image workdir: {}", config.output.image_workdir);
    println!("  - CWL version: {}", config.output.cwl_version);
    println!("  - Image builder: {}", config.image.builder);
    if let Some(ref name) = config.image.name {
        println!("  - Image name: {}", name);
    }
    println!("  - Excluded patterns: {}", config.notebooks.exclude.len());

    for (i, pattern) in config.notebooks.exclude.iter().enumerate() {
        println!("    {}. {}", i + 1, pattern);
    }

    Ok(())
}

fn generate() -> Result<()> {
    info!("Generating example config");

    println!("{}", Repo2CwlConfig::example()?);

    Ok(())
}

fn show(config_path: Option<PathBuf>) -> Result<()> {
    info!("Showing effective configuration");

    let loaded = load_config_with_discovery(config_path.as_deref())?;

    match &loaded.path {
        Some(path) => println!("Effective Configuration ({}):\n", path.display()),
        None => println!("Effective Configuration (defaults):\n"),
    }
    println!("{}", toml::to_string_pretty(&loaded.config)?);

    Ok(())
}
