use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::engine::descriptor::DEFAULT_CWL_VERSION;
use crate::engine::rewrite::DEFAULT_ANNOTATION_MODULES;
use crate::image::BuilderKind;

/// CWL versions the descriptor writer can target
pub const SUPPORTED_CWL_VERSIONS: &[&str] = &["v1.0", "v1.1", "v1.2"];

/// Complete repo2cwl configuration (loaded from TOML file)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Repo2CwlConfig {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub notebooks: NotebooksConfig,

    #[serde(default)]
    pub annotations: AnnotationsConfig,
}

/// Where generated artifacts go
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Directory for generated scripts, relative to the repository root
    #[serde(default = "default_bin_dir")]
    pub bin_dir: String,

    /// Absolute path the repository has inside the image
    #[serde(default = "default_image_workdir")]
    pub image_workdir: String,

    /// `cwlVersion` written to descriptors
    #[serde(default = "default_cwl_version")]
    pub cwl_version: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bin_dir: default_bin_dir(),
            image_workdir: default_image_workdir(),
            cwl_version: default_cwl_version(),
        }
    }
}

/// Container image settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageConfig {
    /// repo2docker, docker or prebuilt
    #[serde(default = "default_builder")]
    pub builder: String,

    /// Image name; derived from the generated scripts when unset
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            builder: default_builder(),
            name: None,
        }
    }
}

/// Which notebooks are converted
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NotebooksConfig {
    /// Glob patterns, relative to the repository root, of notebooks to skip
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Modules providing the annotation types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotationsConfig {
    /// Imports of these modules are removed from generated programs
    #[serde(default = "default_annotation_modules")]
    pub modules: Vec<String>,
}

impl Default for AnnotationsConfig {
    fn default() -> Self {
        Self {
            modules: default_annotation_modules(),
        }
    }
}

// Default value functions
fn default_bin_dir() -> String {
    "cwl/bin".to_string()
}

fn default_image_workdir() -> String {
    "/app".to_string()
}

fn default_cwl_version() -> String {
    DEFAULT_CWL_VERSION.to_string()
}

fn default_builder() -> String {
    "repo2docker".to_string()
}

fn default_annotation_modules() -> Vec<String> {
    DEFAULT_ANNOTATION_MODULES
        .iter()
        .map(|m| m.to_string())
        .collect()
}

impl Repo2CwlConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Repo2CwlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Generate example configuration as TOML string
    pub fn example() -> Result<String> {
        let config = Repo2CwlConfig {
            notebooks: NotebooksConfig {
                exclude: vec!["scratch/**".to_string(), "**/*-draft.ipynb".to_string()],
            },
            ..Default::default()
        };

        toml::to_string_pretty(&config).context("Failed to serialize example config")
    }

    /// Builder selected in the config
    pub fn builder_kind(&self) -> Result<BuilderKind> {
        self.image.builder.parse()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.output.bin_dir.trim().is_empty() {
            anyhow::bail!("output.bin_dir must be set");
        }

        // Scripts are written inside the working tree
        let bin_dir = Path::new(&self.output.bin_dir);
        if bin_dir.is_absolute() {
            anyhow::bail!("output.bin_dir must be relative to the repository root");
        }
        if bin_dir
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            anyhow::bail!("output.bin_dir must not contain '..'");
        }

        if !self.output.image_workdir.starts_with('/') {
            anyhow::bail!("output.image_workdir must be an absolute path");
        }

        if !SUPPORTED_CWL_VERSIONS.contains(&self.output.cwl_version.as_str()) {
            anyhow::bail!(
                "output.cwl_version must be one of: {}",
                SUPPORTED_CWL_VERSIONS.join(", ")
            );
        }

        self.builder_kind().context("Invalid image.builder")?;

        if let Some(ref name) = self.image.name {
            if name.trim().is_empty() {
                anyhow::bail!("image.name must not be empty when set");
            }
        }

        for pattern in &self.notebooks.exclude {
            glob::Pattern::new(pattern)
                .with_context(|| format!("Invalid notebooks.exclude pattern: {}", pattern))?;
        }

        if self.annotations.modules.iter().any(|m| m.trim().is_empty()) {
            anyhow::bail!("annotations.modules must not contain empty names");
        }

        Ok(())
    }
}
