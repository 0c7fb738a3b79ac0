// Common test utilities shared across acceptance tests
//
// Every test gets its own temp directory holding a repository to convert and
// an output directory. Commands run with that directory as cwd so config
// discovery only sees files the test wrote.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestWorkspace {
    temp_dir: TempDir,
    fixtures_dir: PathBuf,
}

#[allow(dead_code)]
impl TestWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("repo")).unwrap();
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/notebooks");

        Self {
            temp_dir,
            fixtures_dir,
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Repository root that `convert` is pointed at
    pub fn repo(&self) -> PathBuf {
        self.path().join("repo")
    }

    /// Output directory for descriptors
    pub fn output(&self) -> PathBuf {
        self.path().join("out")
    }

    /// Copy a fixture notebook into the repository under `dest`
    pub fn add_notebook(&self, fixture: &str, dest: &str) -> PathBuf {
        let target = self.repo().join(dest);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::copy(self.fixtures_dir.join(fixture), &target).unwrap();
        target
    }

    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn read_file(&self, path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    /// `repo2cwl` with a clean environment, run from the workspace
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_repo2cwl"));
        cmd.current_dir(self.path())
            .env_remove("REPO2CWL_CONFIG")
            .env_remove("REPO2CWL_VERBOSE")
            .env("REPO2CWL_LOG_FORMAT", "compact")
            .env("HOME", self.path());
        cmd
    }

    /// `repo2cwl convert <repo> -o <out> --image <image>`
    pub fn convert(&self, image: &str) -> Command {
        let mut cmd = self.cmd();
        cmd.arg("convert")
            .arg(self.repo())
            .arg("-o")
            .arg(self.output())
            .arg("--image")
            .arg(image);
        cmd
    }
}
