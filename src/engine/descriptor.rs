//! Tool descriptor synthesis
//!
//! Builds the CWL `CommandLineTool` description of a converted notebook from
//! the same classified variables the rewriter consumed. Descriptors are
//! created with a pending container reference; a [`DescriptorBatch`] stamps
//! the image identifier on all of them once the image exists.

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use super::scan::AnnotatedVariable;
use super::types::{flag_for, TypeToken};

pub const DEFAULT_CWL_VERSION: &str = "v1.1";

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("descriptor for '{0}' has no container image yet")]
    PendingContainer(String),

    #[error("descriptor for '{0}' already has a container image")]
    AlreadyFinalized(String),

    #[error("failed to serialize descriptor: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Container the tool runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerRef {
    Pending,
    Image(String),
}

/// `--flag` and argument position of an input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBinding {
    pub prefix: String,
    pub position: usize,
}

/// How the runner collects an output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputBinding {
    /// Paths known from string literals in the notebook
    Glob(Vec<String>),
    /// Reported by the program in `cwl.output.json`
    Manifest,
    /// Standard output captured into the named file
    Stdout(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInput {
    pub name: String,
    pub token: TypeToken,
    pub binding: CommandBinding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub name: String,
    pub token: TypeToken,
    pub binding: OutputBinding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    inputs: Vec<ToolInput>,
    outputs: Vec<ToolOutput>,
    entry_command: String,
    container: ContainerRef,
    stdout: Option<String>,
}

/// Build a descriptor with a pending container reference.
///
/// Unclassified variables are left out; the pipeline classifies every
/// variable before synthesis.
pub fn synthesize(variables: &[AnnotatedVariable], entry_command: &str) -> ToolDescriptor {
    let mut ordered: Vec<&AnnotatedVariable> = variables.iter().collect();
    ordered.sort_by_key(|variable| variable.order);

    let inputs: Vec<ToolInput> = ordered
        .iter()
        .filter(|v| v.is_input())
        .enumerate()
        .map(|(position, v)| ToolInput {
            name: v.name.clone(),
            token: v.declared_type,
            binding: CommandBinding {
                prefix: flag_for(&v.name),
                position,
            },
        })
        .collect();

    let mut stdout = None;
    let outputs: Vec<ToolOutput> = ordered
        .iter()
        .filter(|v| v.is_output())
        .map(|v| {
            let binding = if v.declared_type == TypeToken::Stdout {
                let file = v.capture_file();
                stdout = Some(file.clone());
                OutputBinding::Stdout(file)
            } else {
                match v.literal_paths() {
                    Some(paths) => OutputBinding::Glob(paths.to_vec()),
                    None => OutputBinding::Manifest,
                }
            };
            ToolOutput {
                name: v.name.clone(),
                token: v.declared_type,
                binding,
            }
        })
        .collect();

    ToolDescriptor {
        inputs,
        outputs,
        entry_command: entry_command.to_string(),
        container: ContainerRef::Pending,
        stdout,
    }
}

impl ToolDescriptor {
    pub fn inputs(&self) -> &[ToolInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ToolOutput] {
        &self.outputs
    }

    pub fn entry_command(&self) -> &str {
        &self.entry_command
    }

    pub fn container(&self) -> &ContainerRef {
        &self.container
    }

    pub fn stdout(&self) -> Option<&str> {
        self.stdout.as_deref()
    }

    /// CWL document for this tool. Fails while the container is pending.
    pub fn to_cwl(&self, cwl_version: &str) -> Result<CwlDocument, DescriptorError> {
        let ContainerRef::Image(image) = &self.container else {
            return Err(DescriptorError::PendingContainer(self.entry_command.clone()));
        };

        let inputs = self
            .inputs
            .iter()
            .map(|input| {
                (
                    input.name.clone(),
                    CwlInput {
                        kind: input.token.cwl_type().to_string(),
                        input_binding: CwlInputBinding {
                            prefix: input.binding.prefix.clone(),
                            position: input.binding.position,
                        },
                    },
                )
            })
            .collect();

        let outputs = self
            .outputs
            .iter()
            .map(|output| {
                let output_binding = match &output.binding {
                    OutputBinding::Glob(paths) => Some(CwlOutputBinding {
                        glob: match paths.as_slice() {
                            [single] => Glob::One(single.clone()),
                            _ => Glob::Many(paths.clone()),
                        },
                    }),
                    OutputBinding::Manifest | OutputBinding::Stdout(_) => None,
                };
                (
                    output.name.clone(),
                    CwlOutput {
                        kind: output.token.cwl_type().to_string(),
                        output_binding,
                    },
                )
            })
            .collect();

        Ok(CwlDocument {
            cwl_version: cwl_version.to_string(),
            class: "CommandLineTool".to_string(),
            base_command: self.entry_command.clone(),
            hints: CwlHints {
                docker_requirement: DockerRequirement {
                    docker_image_id: image.clone(),
                },
            },
            inputs,
            outputs,
            stdout: self.stdout.clone(),
        })
    }

    pub fn to_yaml(&self, cwl_version: &str) -> Result<String, DescriptorError> {
        let document = self.to_cwl(cwl_version)?;
        Ok(serde_yaml::to_string(&document)?)
    }
}

/// Descriptors of one batch, waiting for their image
#[derive(Debug, Default)]
pub struct DescriptorBatch {
    descriptors: Vec<ToolDescriptor>,
}

impl DescriptorBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: ToolDescriptor) {
        self.descriptors.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Stamp the image on every descriptor. Consumes the batch, so this
    /// happens at most once per batch.
    pub fn finalize(self, image_id: &str) -> Result<Vec<ToolDescriptor>, DescriptorError> {
        self.descriptors
            .into_iter()
            .map(|mut descriptor| match descriptor.container {
                ContainerRef::Pending => {
                    descriptor.container = ContainerRef::Image(image_id.to_string());
                    Ok(descriptor)
                }
                ContainerRef::Image(_) => Err(DescriptorError::AlreadyFinalized(
                    descriptor.entry_command.clone(),
                )),
            })
            .collect()
    }
}

/// Serialized form of a CWL `CommandLineTool`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CwlDocument {
    pub cwl_version: String,
    pub class: String,
    pub base_command: String,
    pub hints: CwlHints,
    pub inputs: IndexMap<String, CwlInput>,
    pub outputs: IndexMap<String, CwlOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CwlHints {
    #[serde(rename = "DockerRequirement")]
    pub docker_requirement: DockerRequirement,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerRequirement {
    pub docker_image_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CwlInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub input_binding: CwlInputBinding,
}

#[derive(Debug, Clone, Serialize)]
pub struct CwlInputBinding {
    pub prefix: String,
    pub position: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CwlOutput {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_binding: Option<CwlOutputBinding>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CwlOutputBinding {
    pub glob: Glob,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Glob {
    One(String),
    Many(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::classify::classify;
    use crate::engine::parse::parse_module;
    use crate::engine::scan::scan;

    fn descriptor(source: &str) -> ToolDescriptor {
        let module = parse_module(source).unwrap();
        let mut vars = scan(&module).unwrap();
        classify(&module, &mut vars).unwrap();
        synthesize(&vars, "/app/cwl/bin/analysis")
    }

    fn finalized(source: &str) -> ToolDescriptor {
        let mut batch = DescriptorBatch::new();
        batch.push(descriptor(source));
        batch.finalize("repo2cwl-test").unwrap().remove(0)
    }

    #[test]
    fn test_inputs_and_glob_output() {
        let tool = descriptor("x: int = 5\nout_file: CWLFilePath = \"result.txt\"\n");
        assert_eq!(tool.inputs().len(), 1);
        assert_eq!(tool.inputs()[0].name, "x");
        assert_eq!(tool.inputs()[0].token, TypeToken::Int);
        assert_eq!(
            tool.inputs()[0].binding,
            CommandBinding {
                prefix: "--x".to_string(),
                position: 0
            }
        );
        assert_eq!(tool.outputs().len(), 1);
        assert_eq!(
            tool.outputs()[0].binding,
            OutputBinding::Glob(vec!["result.txt".to_string()])
        );
        assert_eq!(tool.container(), &ContainerRef::Pending);
    }

    #[test]
    fn test_positions_follow_order() {
        let tool = descriptor("a: CWLFilePath\nout: CWLFilePath = 'o'\nb: float = 1.0\nc: bool = True\n");
        let positions: Vec<_> = tool
            .inputs()
            .iter()
            .map(|i| (i.name.as_str(), i.binding.position))
            .collect();
        assert_eq!(positions, vec![("a", 0), ("b", 1), ("c", 2)]);
    }

    #[test]
    fn test_computed_output_uses_manifest() {
        let tool = descriptor("import os\nout: CWLFilePath = os.path.join('a', 'b')\n");
        assert_eq!(tool.outputs()[0].binding, OutputBinding::Manifest);
    }

    #[test]
    fn test_stdout_capture() {
        let tool = descriptor("log: CWLStdout\n");
        assert_eq!(
            tool.outputs()[0].binding,
            OutputBinding::Stdout("log.stdout".to_string())
        );
        assert_eq!(tool.stdout(), Some("log.stdout"));
    }

    #[test]
    fn test_pending_descriptor_cannot_serialize() {
        let tool = descriptor("x: int = 5\n");
        assert!(matches!(
            tool.to_yaml(DEFAULT_CWL_VERSION),
            Err(DescriptorError::PendingContainer(_))
        ));
    }

    #[test]
    fn test_finalize_stamps_every_descriptor() {
        let mut batch = DescriptorBatch::new();
        batch.push(descriptor("x: int = 5\n"));
        batch.push(descriptor("y: str = 'a'\n"));
        assert_eq!(batch.len(), 2);
        let tools = batch.finalize("img:1").unwrap();
        assert!(tools
            .iter()
            .all(|t| t.container() == &ContainerRef::Image("img:1".to_string())));
    }

    #[test]
    fn test_finalize_twice_is_rejected() {
        let mut batch = DescriptorBatch::new();
        batch.push(finalized("x: int = 5\n"));
        assert!(matches!(
            batch.finalize("other"),
            Err(DescriptorError::AlreadyFinalized(_))
        ));
    }

    #[test]
    fn test_cwl_document() {
        let tool = finalized(
            "x: int = 5\nfiles: List[CWLFilePath]\nout_file: CWLFilePath = \"result.txt\"\nlog: CWLStdout = 'run.log'\n",
        );
        let yaml = tool.to_yaml("v1.1").unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(doc["cwlVersion"], "v1.1");
        assert_eq!(doc["class"], "CommandLineTool");
        assert_eq!(doc["baseCommand"], "/app/cwl/bin/analysis");
        assert_eq!(doc["hints"]["DockerRequirement"]["dockerImageId"], "repo2cwl-test");
        assert_eq!(doc["inputs"]["x"]["type"], "int");
        assert_eq!(doc["inputs"]["x"]["inputBinding"]["prefix"], "--x");
        assert_eq!(doc["inputs"]["files"]["type"], "File[]");
        assert_eq!(doc["inputs"]["files"]["inputBinding"]["position"], 1);
        assert_eq!(doc["outputs"]["out_file"]["type"], "File");
        assert_eq!(doc["outputs"]["out_file"]["outputBinding"]["glob"], "result.txt");
        assert_eq!(doc["outputs"]["log"]["type"], "stdout");
        assert_eq!(doc["stdout"], "run.log");

        let input_names: Vec<_> = doc["inputs"]
            .as_mapping()
            .unwrap()
            .keys()
            .map(|k| k.as_str().unwrap().to_string())
            .collect();
        assert_eq!(input_names, vec!["x", "files"]);
    }

    #[test]
    fn test_descriptor_covers_every_variable() {
        let source = "a: int = 1\nb: CWLFilePath\nc: CWLFilePath = 'c.txt'\nd: CWLStdout\n";
        let module = parse_module(source).unwrap();
        let mut vars = scan(&module).unwrap();
        classify(&module, &mut vars).unwrap();
        let tool = synthesize(&vars, "cmd");
        assert_eq!(tool.inputs().len() + tool.outputs().len(), vars.len());
    }
}
