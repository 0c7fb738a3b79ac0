use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::batch::BatchOptions;
use crate::cli::InspectArgs;
use crate::config_discovery::load_config_with_discovery;
use crate::engine::descriptor::OutputBinding;
use crate::engine::{self, Conversion, ConvertedNotebook, DescriptorBatch};
use crate::notebook;

/// Image placeholder for descriptors printed without a build
const PLACEHOLDER_IMAGE: &str = "repo2cwl-inspect";

pub fn run(args: InspectArgs) -> Result<()> {
    let loaded = load_config_with_discovery(args.config.as_deref())?;
    let options = BatchOptions::from_config(&loaded.config);

    let nb = notebook::read_notebook(&args.notebook)
        .with_context(|| format!("Failed to read notebook: {}", args.notebook.display()))?;

    let relative = args
        .notebook
        .file_name()
        .map(PathBuf::from)
        .context("Notebook path has no file name")?;
    let entry_command = options.entry_command(&relative);

    let conversion = engine::convert_cells(nb.code_cells.as_slice(), &entry_command, &options.engine)
        .with_context(|| format!("Failed to convert {}", args.notebook.display()))?;

    let converted = match conversion {
        Conversion::Converted(converted) => *converted,
        Conversion::Skipped(reason) => {
            println!("{}: skipped ({})", args.notebook.display(), reason);
            return Ok(());
        }
    };

    if !args.script && !args.descriptor {
        print_variables(&converted);
    }

    if args.script {
        print!("{}", converted.script.source());
    }

    if args.descriptor {
        let mut batch = DescriptorBatch::new();
        batch.push(converted.descriptor);
        for descriptor in batch.finalize(PLACEHOLDER_IMAGE)? {
            print!("{}", descriptor.to_yaml(&options.cwl_version)?);
        }
    }

    Ok(())
}

fn print_variables(converted: &ConvertedNotebook) {
    let descriptor = &converted.descriptor;
    println!("Entry command: {}", descriptor.entry_command());

    println!("\nInputs:");
    if descriptor.inputs().is_empty() {
        println!("  (none)");
    }
    for input in descriptor.inputs() {
        println!(
            "  {:<24} {:<14} {}",
            input.name, input.token, input.binding.prefix
        );
    }

    println!("\nOutputs:");
    if descriptor.outputs().is_empty() {
        println!("  (none)");
    }
    for output in descriptor.outputs() {
        let binding = match &output.binding {
            OutputBinding::Glob(paths) => format!("glob {}", paths.join(", ")),
            OutputBinding::Manifest => "cwl.output.json".to_string(),
            OutputBinding::Stdout(file) => format!("stdout > {}", file),
        };
        println!("  {:<24} {:<14} {}", output.name, output.token, binding);
    }

    if !converted.diagnostics.is_empty() {
        println!("\nWarnings:");
        for diagnostic in &converted.diagnostics {
            println!("  {}", diagnostic);
        }
    }
}
