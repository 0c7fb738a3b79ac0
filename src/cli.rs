use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// repo2cwl - Turn annotated Jupyter notebooks into CWL command line tools
///
/// Every notebook whose top-level variables carry type annotations becomes a
/// standalone program plus a CWL CommandLineTool descriptor that runs it
/// inside a container image built from the repository.
#[derive(Parser, Debug)]
#[command(name = "repo2cwl")]
#[command(author = "repo2cwl contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn annotated Jupyter notebooks into CWL command line tools", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert every annotated notebook of a repository
    Convert(ConvertArgs),

    /// Show what a single notebook converts to, without building anything
    Inspect(InspectArgs),

    /// Configuration management utilities
    Config(ConfigArgs),

    /// Check that the external tools repo2cwl relies on are available
    Doctor(DoctorArgs),
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Repository to convert: a local path, file:// URI or git URL
    pub repo: String,

    /// Directory the CWL descriptors are written to
    #[arg(short, long)]
    pub output: PathBuf,

    /// Use an existing image instead of building one
    #[arg(long, conflicts_with = "builder")]
    pub image: Option<String>,

    /// Image builder (repo2docker|docker|prebuilt)
    #[arg(long)]
    pub builder: Option<String>,

    /// Name of the image to build
    #[arg(long)]
    pub image_name: Option<String>,

    /// Keep the working tree (with the generated scripts) after the run
    #[arg(long)]
    pub keep_workdir: bool,

    /// Config file path
    #[arg(short = 'c', long, env = "REPO2CWL_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Notebook file
    pub notebook: PathBuf,

    /// Print the generated program
    #[arg(long)]
    pub script: bool,

    /// Print the CWL descriptor (with a placeholder image)
    #[arg(long)]
    pub descriptor: bool,

    /// Config file path
    #[arg(short = 'c', long, env = "REPO2CWL_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Validate {
        /// Path to config file
        path: PathBuf,
    },
    /// Generate example config file
    Generate,
    /// Show effective configuration (discovered file or defaults)
    Show {
        /// Config file path
        #[arg(short = 'c', long, env = "REPO2CWL_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
pub struct DoctorArgs {
    /// Config file path
    #[arg(short = 'c', long, env = "REPO2CWL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, env = "REPO2CWL_VERBOSE")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert() {
        let cli = Cli::parse_from([
            "repo2cwl",
            "convert",
            "./repo",
            "-o",
            "out",
            "--image",
            "img:1",
            "--keep-workdir",
        ]);
        match cli.command {
            Commands::Convert(args) => {
                assert_eq!(args.repo, "./repo");
                assert_eq!(args.output, PathBuf::from("out"));
                assert_eq!(args.image.as_deref(), Some("img:1"));
                assert!(args.keep_workdir);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_image_conflicts_with_builder() {
        let result = Cli::try_parse_from([
            "repo2cwl",
            "convert",
            "./repo",
            "-o",
            "out",
            "--image",
            "img:1",
            "--builder",
            "docker",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_inspect() {
        let cli = Cli::parse_from(["repo2cwl", "inspect", "nb.ipynb", "--script"]);
        match cli.command {
            Commands::Inspect(args) => {
                assert!(args.script);
                assert!(!args.descriptor);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
