//! On-disk module fixtures.

use std::fs;
use std::path::PathBuf;

use gunkls::Loader;
use gunkls::project::normalize;
use tempfile::TempDir;

pub const MODULE: &str = "example.com/m";

/// A temporary module rooted at a `go.mod` declaring [`MODULE`]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("go.mod"), format!("module {MODULE}\n")).unwrap();
        let ws = Self { dir };
        for (rel, text) in files {
            ws.write(rel, text);
        }
        ws
    }

    pub fn root(&self) -> PathBuf {
        normalize(self.dir.path())
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        normalize(&self.dir.path().join(rel))
    }

    pub fn mkdir(&self, rel: &str) {
        fs::create_dir_all(self.dir.path().join(rel)).unwrap();
    }

    pub fn write(&self, rel: &str, text: &str) {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap()
    }

    pub fn loader(&self) -> Loader {
        Loader::discover(self.dir.path()).unwrap()
    }

    /// Import path of the package in directory `rel`
    pub fn import_path(rel: &str) -> String {
        format!("{MODULE}/{rel}")
    }
}
