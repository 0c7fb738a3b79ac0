use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::batch::{self, BatchOptions};
use crate::cli::ConvertArgs;
use crate::cli_utils::notice;
use crate::config_discovery::load_config_with_discovery;
use crate::image::{self, BuilderKind};
use crate::repo::{self, RepoSource};

pub async fn run(args: ConvertArgs) -> Result<()> {
    let loaded = load_config_with_discovery(args.config.as_deref())?;
    let config = loaded.config;

    let mut options = BatchOptions::from_config(&config);
    if let Some(name) = args.image_name {
        options.image_name = Some(name);
    }

    let kind = match (&args.image, &args.builder) {
        (Some(_), _) => BuilderKind::Prebuilt,
        (None, Some(builder)) => builder.parse().context("Invalid --builder")?,
        (None, None) => config.builder_kind()?,
    };
    let builder = image::builder_for(kind, &options.image_workdir, args.image)?;

    let source = RepoSource::parse(&args.repo)?;
    info!("Converting {} with the {} builder", source.describe(), kind);
    let tree = repo::acquire(&source).await?;

    let result = batch::run_batch(tree.path(), &args.output, Arc::from(builder), &options).await;

    if args.keep_workdir {
        let kept = tree.keep();
        notice(format!("Working tree kept at {}", kept.display()));
    }

    let summary = result?;
    println!("{}", summary);
    if let Some(image) = &summary.image {
        for tool in &summary.converted {
            println!("  {} -> {}", tool.notebook.display(), tool.descriptor_path.display());
        }
        println!("  image: {}", image);
    }

    Ok(())
}
