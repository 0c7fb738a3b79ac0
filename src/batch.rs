//! Batch conversion of a repository
//!
//! Converts every discovered notebook in parallel, checks that no two tools
//! land on the same destination, writes the generated programs into the
//! working tree, builds the image once and finally writes one descriptor per
//! tool stamped with that image.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::Repo2CwlConfig;
use crate::engine::{
    self, Conversion, ConvertError, ConvertedNotebook, DescriptorBatch, EngineOptions, SkipReason,
};
use crate::image::{self, ImageBuilder};
use crate::notebook;
use crate::repo;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error(
        "notebooks {} and {} both map to '{tool}'",
        .first.display(),
        .second.display()
    )]
    OutputPathCollision {
        tool: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("image build with {builder} failed")]
    ImageBuild {
        builder: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Settings for one batch, resolved from config and command line
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub bin_dir: String,
    pub image_workdir: String,
    pub cwl_version: String,
    pub exclude: Vec<String>,
    pub image_name: Option<String>,
    pub engine: EngineOptions,
}

impl BatchOptions {
    pub fn from_config(config: &Repo2CwlConfig) -> Self {
        Self {
            bin_dir: config.output.bin_dir.clone(),
            image_workdir: config.output.image_workdir.clone(),
            cwl_version: config.output.cwl_version.clone(),
            exclude: config.notebooks.exclude.clone(),
            image_name: config.image.name.clone(),
            engine: EngineOptions {
                annotation_modules: config.annotations.modules.clone(),
            },
        }
    }

    /// Script location relative to the working tree
    pub fn script_path(&self, notebook: &Path) -> PathBuf {
        Path::new(&self.bin_dir).join(notebook.with_extension(""))
    }

    /// Absolute path of the script inside the image
    pub fn entry_command(&self, notebook: &Path) -> String {
        format!(
            "{}/{}",
            self.image_workdir.trim_end_matches('/'),
            slash_path(&self.script_path(notebook))
        )
    }
}

/// Tool name of a notebook: its relative path without extension, `/` → `_`
pub fn tool_name(notebook: &Path) -> String {
    slash_path(&notebook.with_extension("")).replace('/', "_")
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// A converted notebook with its destinations
#[derive(Debug, Clone)]
pub struct PlannedTool {
    pub notebook: PathBuf,
    pub tool_name: String,
    pub script_path: PathBuf,
    pub converted: ConvertedNotebook,
}

/// One tool written by the batch
#[derive(Debug, Clone)]
pub struct ToolRecord {
    pub notebook: PathBuf,
    pub tool_name: String,
    pub script_path: PathBuf,
    pub descriptor_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub converted: Vec<ToolRecord>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub image: Option<String>,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} notebooks converted, {} skipped",
            self.converted.len(),
            self.skipped.len()
        )?;
        for (notebook, reason) in &self.skipped {
            write!(f, "\n  skipped {}: {}", notebook.display(), reason)?;
        }
        Ok(())
    }
}

/// Convert notebooks concurrently. Results come back sorted by notebook path.
pub async fn convert_notebooks(
    tree: &Path,
    notebooks: &[PathBuf],
    options: &BatchOptions,
) -> Result<Vec<(PathBuf, Result<Conversion, ConvertError>)>> {
    let mut tasks = JoinSet::new();

    for relative in notebooks {
        let relative = relative.clone();
        let absolute = tree.join(&relative);
        let entry_command = options.entry_command(&relative);
        let engine_options = options.engine.clone();

        tasks.spawn_blocking(move || {
            let result = notebook::read_notebook(&absolute).and_then(|nb| {
                engine::convert_cells(nb.code_cells.as_slice(), &entry_command, &engine_options)
            });
            (relative, result)
        });
    }

    let mut results = Vec::with_capacity(notebooks.len());
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.context("Notebook conversion task panicked")?);
    }
    results.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(results)
}

/// Split conversions into tools and skips, rejecting colliding destinations.
pub fn plan(
    results: Vec<(PathBuf, Result<Conversion, ConvertError>)>,
    options: &BatchOptions,
) -> Result<(Vec<PlannedTool>, Vec<(PathBuf, SkipReason)>), BatchError> {
    let mut tools = Vec::new();
    let mut skipped = Vec::new();

    for (notebook, result) in results {
        match result {
            Ok(Conversion::Converted(converted)) => {
                tools.push(PlannedTool {
                    tool_name: tool_name(&notebook),
                    script_path: options.script_path(&notebook),
                    notebook,
                    converted: *converted,
                });
            }
            Ok(Conversion::Skipped(reason)) => {
                info!(notebook = %notebook.display(), "Skipping notebook: {}", reason);
                skipped.push((notebook, reason));
            }
            Err(err) => {
                warn!(
                    notebook = %notebook.display(),
                    status = "error",
                    "Failed to convert notebook: {}",
                    err
                );
                skipped.push((notebook, SkipReason::Failed(err)));
            }
        }
    }

    check_collisions(&tools)?;
    Ok((tools, skipped))
}

fn check_collisions(tools: &[PlannedTool]) -> Result<(), BatchError> {
    let mut by_name: HashMap<&str, &PlannedTool> = HashMap::new();
    for tool in tools {
        if let Some(first) = by_name.insert(&tool.tool_name, tool) {
            return Err(BatchError::OutputPathCollision {
                tool: tool.tool_name.clone(),
                first: first.notebook.clone(),
                second: tool.notebook.clone(),
            });
        }
    }

    // A script cannot also be the directory of another script
    for tool in tools {
        for other in tools {
            if other.script_path != tool.script_path
                && other.script_path.starts_with(&tool.script_path)
            {
                return Err(BatchError::OutputPathCollision {
                    tool: slash_path(&tool.script_path),
                    first: tool.notebook.clone(),
                    second: other.notebook.clone(),
                });
            }
        }
    }
    Ok(())
}

fn write_script(tree: &Path, tool: &PlannedTool) -> Result<(), BatchError> {
    let path = tree.join(&tool.script_path);
    let io_error = |source| BatchError::Io {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(&path, tool.converted.script.source()).map_err(io_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).map_err(io_error)?;
    }
    Ok(())
}

/// Run a whole batch over a prepared working tree
pub async fn run_batch(
    tree: &Path,
    output_dir: &Path,
    builder: Arc<dyn ImageBuilder>,
    options: &BatchOptions,
) -> Result<BatchSummary> {
    let notebooks = repo::discover_notebooks(tree, &options.exclude)?;
    info!("Found {} notebooks in {}", notebooks.len(), tree.display());

    let results = convert_notebooks(tree, &notebooks, options).await?;
    let (tools, skipped) = plan(results, options)?;

    if tools.is_empty() {
        info!("No notebook produced a tool; skipping image build");
        return Ok(BatchSummary {
            converted: Vec::new(),
            skipped,
            image: None,
        });
    }

    for tool in &tools {
        write_script(tree, tool)?;
    }

    let image_name = match &options.image_name {
        Some(name) => name.clone(),
        None => {
            let scripts: Vec<(String, &str)> = tools
                .iter()
                .map(|t| (slash_path(&t.script_path), t.converted.script.source()))
                .collect();
            image::default_image_name(scripts.iter().map(|(p, s)| (p.as_str(), *s)))
        }
    };

    info!(
        operation = "image.build",
        builder = builder.name(),
        "Building image {}",
        image_name
    );
    let build_tree = tree.to_path_buf();
    let build_builder = Arc::clone(&builder);
    let image_id = tokio::task::spawn_blocking(move || {
        build_builder.build(&build_tree, &image_name)
    })
    .await
    .context("Image build task panicked")?
    .map_err(|source| BatchError::ImageBuild {
        builder: builder.name().to_string(),
        source,
    })?;

    let mut batch = DescriptorBatch::new();
    for tool in &tools {
        batch.push(tool.converted.descriptor.clone());
    }
    let descriptors = batch.finalize(&image_id)?;

    fs::create_dir_all(output_dir).map_err(|source| BatchError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut converted = Vec::with_capacity(tools.len());
    for (tool, descriptor) in tools.into_iter().zip(descriptors) {
        let descriptor_path = output_dir.join(format!("{}.cwl", tool.tool_name));
        let yaml = descriptor.to_yaml(&options.cwl_version)?;
        fs::write(&descriptor_path, yaml).map_err(|source| BatchError::Io {
            path: descriptor_path.clone(),
            source,
        })?;

        info!(
            tool = %tool.tool_name,
            inputs = descriptor.inputs().len(),
            outputs = descriptor.outputs().len(),
            status = "success",
            "Wrote {}",
            descriptor_path.display()
        );

        converted.push(ToolRecord {
            notebook: tool.notebook,
            tool_name: tool.tool_name,
            script_path: tool.script_path,
            descriptor_path,
        });
    }

    Ok(BatchSummary {
        converted,
        skipped,
        image: Some(image_id),
    })
}
