/// Container image builders
///
/// The batch hands the finished working tree to an [`ImageBuilder`] and gets
/// back the identifier stamped on every descriptor. Builders shell out to
/// external tools; nothing here talks to a container daemon directly.
use anyhow::{anyhow, bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::process::Command;
use std::str::FromStr;

/// Produces the image that runs the generated tools
pub trait ImageBuilder: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Build an image from `tree` and return its identifier
    fn build(&self, tree: &Path, image_name: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderKind {
    Repo2Docker,
    Docker,
    Prebuilt,
}

impl FromStr for BuilderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "repo2docker" => Ok(BuilderKind::Repo2Docker),
            "docker" => Ok(BuilderKind::Docker),
            "prebuilt" => Ok(BuilderKind::Prebuilt),
            other => bail!(
                "Unknown image builder '{}' (expected repo2docker, docker or prebuilt)",
                other
            ),
        }
    }
}

impl fmt::Display for BuilderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuilderKind::Repo2Docker => "repo2docker",
            BuilderKind::Docker => "docker",
            BuilderKind::Prebuilt => "prebuilt",
        })
    }
}

/// `jupyter-repo2docker`, which installs the repository's declared environment
#[derive(Debug, Clone)]
pub struct Repo2DockerBuilder {
    /// Directory the repository is copied to inside the image
    pub target_dir: String,
}

impl Repo2DockerBuilder {
    pub const BINARY: &'static str = "jupyter-repo2docker";

    fn args(&self, tree: &Path, image_name: &str) -> Vec<String> {
        vec![
            "--no-run".to_string(),
            "--image-name".to_string(),
            image_name.to_string(),
            "--target-repo-dir".to_string(),
            self.target_dir.clone(),
            tree.display().to_string(),
        ]
    }
}

impl ImageBuilder for Repo2DockerBuilder {
    fn name(&self) -> &'static str {
        "repo2docker"
    }

    fn build(&self, tree: &Path, image_name: &str) -> Result<String> {
        run_tool(Self::BINARY, &self.args(tree, image_name))?;
        Ok(image_name.to_string())
    }
}

/// Plain `docker build` for repositories that ship a Dockerfile
#[derive(Debug, Clone, Default)]
pub struct DockerBuilder;

impl DockerBuilder {
    pub const BINARY: &'static str = "docker";
}

impl ImageBuilder for DockerBuilder {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn build(&self, tree: &Path, image_name: &str) -> Result<String> {
        if !tree.join("Dockerfile").is_file() {
            bail!("No Dockerfile in {}", tree.display());
        }
        let args = vec![
            "build".to_string(),
            "-t".to_string(),
            image_name.to_string(),
            tree.display().to_string(),
        ];
        run_tool(Self::BINARY, &args)?;
        Ok(image_name.to_string())
    }
}

/// An image that already exists; nothing is built
#[derive(Debug, Clone)]
pub struct PrebuiltImage {
    pub image: String,
}

impl ImageBuilder for PrebuiltImage {
    fn name(&self) -> &'static str {
        "prebuilt"
    }

    fn build(&self, _tree: &Path, _image_name: &str) -> Result<String> {
        Ok(self.image.clone())
    }
}

/// Pick a builder. `prebuilt` needs the image identifier.
pub fn builder_for(
    kind: BuilderKind,
    target_dir: &str,
    prebuilt: Option<String>,
) -> Result<Box<dyn ImageBuilder>> {
    match kind {
        BuilderKind::Repo2Docker => Ok(Box::new(Repo2DockerBuilder {
            target_dir: target_dir.to_string(),
        })),
        BuilderKind::Docker => Ok(Box::new(DockerBuilder)),
        BuilderKind::Prebuilt => {
            let image = prebuilt.ok_or_else(|| anyhow!("The prebuilt builder needs --image"))?;
            Ok(Box::new(PrebuiltImage { image }))
        }
    }
}

/// `repo2cwl-<12 hex chars>` over the generated scripts, in the order given
pub fn default_image_name<'a, I>(scripts: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut hasher = Sha256::new();
    for (path, source) in scripts {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(source.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hex::encode(hasher.finalize());
    format!("repo2cwl-{}", &digest[..12])
}

fn run_tool(binary: &str, args: &[String]) -> Result<()> {
    let path = which::which(binary).with_context(|| format!("{} not found in PATH", binary))?;

    tracing::info!("Running {} {}", binary, args.join(" "));
    let output = Command::new(&path)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {}", path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{} exited with {}: {}", binary, output.status, stderr.trim());
    }
    Ok(())
}
