use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Repo2CwlConfig;

/// Project-level config file name
pub const CONFIG_FILE_NAME: &str = "repo2cwl.toml";

/// Discovers repo2cwl configuration by traversing up the directory tree
pub fn discover_config(start_dir: &Path) -> Result<Option<PathBuf>> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Ok(Some(config_path));
        }

        // Try to go up one level
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    // Fallback to global config
    Ok(global_config_path().filter(|path| path.exists()))
}

/// `~/.config/repo2cwl/config.toml`
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/repo2cwl/config.toml"))
}

/// Configuration in effect and the file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Repo2CwlConfig,
    pub path: Option<PathBuf>,
}

/// Loads configuration with auto-discovery support
///
/// If `explicit_path` is provided, loads config from that path.
/// Otherwise, auto-discovers config by traversing up directory tree from cwd.
///
/// Falls back to the built-in defaults when no file is found. The result is
/// always validated.
pub fn load_config_with_discovery(explicit_path: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit_path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let current_dir = std::env::current_dir()
                .context("Failed to get current directory for config discovery")?;
            discover_config(&current_dir)?
        }
    };

    let config = match &path {
        Some(path) => {
            tracing::debug!("Using config file {}", path.display());
            Repo2CwlConfig::from_file(path)?
        }
        None => Repo2CwlConfig::default(),
    };

    config
        .validate()
        .with_context(|| match &path {
            Some(path) => format!("Invalid configuration in {}", path.display()),
            None => "Invalid default configuration".to_string(),
        })?;

    Ok(LoadedConfig { config, path })
}
