use anyhow::Result;
use std::env;

use crate::cli::DoctorArgs;
use crate::config_discovery::{global_config_path, load_config_with_discovery};
use crate::image::{BuilderKind, DockerBuilder, Repo2DockerBuilder};

pub fn run(args: DoctorArgs) -> Result<()> {
    println!("🔍 repo2cwl Doctor - System Configuration Check\n");

    let mut all_ok = true;

    // Check 1: repo2cwl binary
    if let Ok(exe_path) = env::current_exe() {
        println!("✅ repo2cwl binary found: {}", exe_path.display());
        if args.verbose {
            println!("   Version: {}", env!("CARGO_PKG_VERSION"));
        }
    } else {
        println!("❌ Could not determine repo2cwl binary path");
        all_ok = false;
    }

    // Check 2: configuration
    let builder = match load_config_with_discovery(args.config.as_deref()) {
        Ok(loaded) => {
            match &loaded.path {
                Some(path) => println!("✅ Configuration found: {}", path.display()),
                None => {
                    println!("ℹ️  No repo2cwl.toml found, using defaults");
                    if args.verbose {
                        if let Some(global) = global_config_path() {
                            println!("   Global config location: {}", global.display());
                        }
                        println!("   Run 'repo2cwl config generate > repo2cwl.toml' to create one");
                    }
                }
            }
            loaded.config.builder_kind().ok()
        }
        Err(e) => {
            println!("❌ Configuration is invalid: {:#}", e);
            all_ok = false;
            None
        }
    };

    // Check 3: git, needed for remote repositories
    all_ok &= check_binary("git", "cloning remote repositories", false, args.verbose);

    // Check 4: image builders; the configured one is required
    all_ok &= check_binary(
        Repo2DockerBuilder::BINARY,
        "building images with repo2docker",
        builder == Some(BuilderKind::Repo2Docker),
        args.verbose,
    );
    all_ok &= check_binary(
        DockerBuilder::BINARY,
        "building images with docker",
        builder == Some(BuilderKind::Docker),
        args.verbose,
    );

    // Check 5: Environment variables
    if args.verbose {
        println!("\n📋 Environment Variables:");
        let env_vars = ["REPO2CWL_CONFIG", "REPO2CWL_LOG_FORMAT", "RUST_LOG"];

        let mut any_set = false;
        for var in &env_vars {
            if let Ok(value) = env::var(var) {
                println!("   {} = {}", var, value);
                any_set = true;
            }
        }

        if !any_set {
            println!("   (None set)");
        }
    }

    // Summary
    println!();
    if all_ok {
        println!("✅ All checks passed! repo2cwl is ready to convert repositories.");
    } else {
        println!("⚠️  Some issues detected. Please fix the items marked with ❌ above.");
        std::process::exit(1);
    }

    Ok(())
}

/// Returns false only when a required binary is missing
fn check_binary(binary: &str, purpose: &str, required: bool, verbose: bool) -> bool {
    match which::which(binary) {
        Ok(path) => {
            println!("✅ {} found: {}", binary, path.display());
            true
        }
        Err(_) if required => {
            println!("❌ {} not found in PATH (needed for {})", binary, purpose);
            false
        }
        Err(_) => {
            println!("ℹ️  {} not found in PATH", binary);
            if verbose {
                println!("   Only needed for {}", purpose);
            }
            true
        }
    }
}
