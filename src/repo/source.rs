/// Repository acquisition
///
/// Local directories (plain paths or `file://` URIs) are copied, remote
/// repositories are cloned shallowly. Either way the result is a private
/// working tree the batch is free to write generated scripts into.

use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Where the repository comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSource {
    Local(PathBuf),
    Git(String),
}

impl RepoSource {
    /// Parse a repository argument
    ///
    /// Examples:
    /// - `./analysis` or `/srv/repo` → local copy
    /// - `file:///srv/repo` → local copy
    /// - `https://github.com/org/repo.git`, `ssh://host/repo`, `git@host:org/repo.git` → clone
    pub fn parse(input: &str) -> Result<Self> {
        if let Some(path) = input.strip_prefix("file://") {
            if path.is_empty() {
                bail!("file:// URI has no path");
            }
            return Ok(RepoSource::Local(PathBuf::from(path)));
        }

        if input.starts_with("http://")
            || input.starts_with("https://")
            || input.starts_with("ssh://")
            || is_scp_like(input)
        {
            return Ok(RepoSource::Git(input.to_string()));
        }

        if let Some((scheme, _)) = input.split_once("://") {
            bail!("Unsupported repository scheme: {}://", scheme);
        }

        Ok(RepoSource::Local(PathBuf::from(input)))
    }

    pub fn describe(&self) -> String {
        match self {
            RepoSource::Local(path) => path.display().to_string(),
            RepoSource::Git(url) => url.clone(),
        }
    }
}

/// `git@github.com:org/repo.git`
fn is_scp_like(input: &str) -> bool {
    match input.split_once(':') {
        Some((user_host, path)) => {
            user_host.contains('@') && !user_host.contains('/') && path.ends_with(".git")
        }
        None => false,
    }
}

/// Temporary copy of the repository
#[derive(Debug)]
pub struct WorkTree {
    dir: TempDir,
    root: PathBuf,
}

impl WorkTree {
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Keep the working tree on disk after the batch and return its path
    pub fn keep(self) -> PathBuf {
        let root = self.root;
        let _ = self.dir.keep();
        root
    }
}

/// Copy or clone the repository into a fresh working tree
pub async fn acquire(source: &RepoSource) -> Result<WorkTree> {
    let dir = tempfile::Builder::new()
        .prefix("repo2cwl-")
        .tempdir()
        .context("Failed to create working directory")?;
    let root = dir.path().join("repo");

    match source {
        RepoSource::Local(path) => {
            let path = path
                .canonicalize()
                .with_context(|| format!("Repository not found: {}", path.display()))?;
            if !path.is_dir() {
                bail!("Repository is not a directory: {}", path.display());
            }

            tracing::info!("Copying repository {}", path.display());
            let target = root.clone();
            tokio::task::spawn_blocking(move || copy_tree(&path, &target))
                .await
                .context("Copy task panicked")??;
        }
        RepoSource::Git(url) => {
            tracing::info!("Cloning repository {}", url);
            let output = tokio::process::Command::new("git")
                .args(["clone", "--depth", "1", url.as_str()])
                .arg(&root)
                .output()
                .await
                .context("Failed to run git, is it installed?")?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(anyhow!("Failed to clone repository {}: {}", url, stderr));
            }
        }
    }

    Ok(WorkTree { dir, root })
}

fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", source.display()))?;
        let relative = entry.path().strip_prefix(source)?;
        let destination = target.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&destination)
                .with_context(|| format!("Failed to create {}", destination.display()))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &destination)?;
        } else {
            fs::copy(entry.path(), &destination).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    destination.display()
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, destination: &Path) -> Result<()> {
    let target = fs::read_link(link)?;
    std::os::unix::fs::symlink(&target, destination)
        .with_context(|| format!("Failed to link {}", destination.display()))
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, _destination: &Path) -> Result<()> {
    tracing::warn!("Skipping symlink {}", link.display());
    Ok(())
}
