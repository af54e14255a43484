//! In-memory placeholder host files.
//!
//! A directory holding only `.gunk` sources is invisible to the host
//! toolchain. The overlay adds a one-line `gunkpkg.go` to such directories
//! so they list as packages. Nothing here is ever written to disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use walkdir::WalkDir;

use super::error::HostError;
use super::host::{Host, files_with_extension, package_clause_name};
use crate::base::{HOST_EXTENSION, IDL_EXTENSION, PLACEHOLDER_FILE};

#[derive(Debug, Default)]
pub struct Overlay {
    files: BTreeMap<PathBuf, String>,
    /// Module roots already walked
    scanned: FxHashSet<PathBuf>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk every module root not yet scanned and add placeholders to its
    /// IDL-only directories.
    pub fn ensure_scanned(&mut self, host: &Host) -> Result<(), HostError> {
        for module in host.modules() {
            if !self.scanned.insert(module.dir.clone()) {
                continue;
            }
            let added = self.scan_root(&module.dir)?;
            tracing::debug!(root = %module.dir.display(), added, "scanned module for IDL-only packages");
        }
        Ok(())
    }

    fn scan_root(&mut self, root: &Path) -> Result<usize, HostError> {
        if !root.is_dir() {
            return Ok(0);
        }
        let mut added = 0;
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| HostError::Walk {
                root: root.to_path_buf(),
                message: e.to_string(),
            })?;
            if entry.file_type().is_dir() && self.add_for_dir(entry.path())? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Add a placeholder to `dir` when it holds IDL files and no host files.
    /// The package name comes from the first IDL file that parses, falling
    /// back to the directory name.
    pub fn add_for_dir(&mut self, dir: &Path) -> Result<bool, HostError> {
        if !files_with_extension(dir, HOST_EXTENSION)?.is_empty() {
            return Ok(false);
        }
        let idl = files_with_extension(dir, IDL_EXTENSION)?;
        let Some(first) = idl.first() else {
            return Ok(false);
        };
        let name = fs::read_to_string(first)
            .ok()
            .and_then(|text| package_clause_name(&text))
            .map(|name| name.to_string())
            .unwrap_or_else(|| dir_name(dir));
        self.insert_placeholder(dir, &name);
        Ok(true)
    }

    /// Add a placeholder for a package that so far only exists in memory,
    /// unless the directory already has host files on disk.
    pub fn add_for_new_package(&mut self, dir: &Path, name: &str) -> Result<bool, HostError> {
        if !files_with_extension(dir, HOST_EXTENSION)?.is_empty() {
            return Ok(false);
        }
        self.insert_placeholder(dir, name);
        Ok(true)
    }

    fn insert_placeholder(&mut self, dir: &Path, name: &str) {
        let path = dir.join(PLACEHOLDER_FILE);
        tracing::trace!(path = %path.display(), name, "overlay placeholder");
        self.files.insert(path, format!("package {name}"));
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn has_files_in(&self, dir: &Path) -> bool {
        self.files_in(dir).next().is_some()
    }

    /// Overlay files directly inside `dir`
    pub fn files_in<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = (&'a Path, &'a str)> + 'a {
        self.files
            .iter()
            .filter(move |(path, _)| path.parent() == Some(dir))
            .map(|(path, text)| (path.as_path(), text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub(crate) fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, text: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_scan_adds_placeholders_to_idl_only_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "go.mod", "module example.com/m\n");
        write(root, "api/a.gunk", "package api\n");
        write(root, "mixed/b.gunk", "package mixed\n");
        write(root, "mixed/b.go", "package mixed\n");
        write(root, "broken/c.gunk", "this is not gunk");

        let host = Host::discover(root).unwrap();
        let mut overlay = Overlay::new();
        overlay.ensure_scanned(&host).unwrap();

        assert_eq!(overlay.get(&root.join("api").join(PLACEHOLDER_FILE)), Some("package api"));
        assert_eq!(overlay.get(&root.join("mixed").join(PLACEHOLDER_FILE)), None);
        assert_eq!(
            overlay.get(&root.join("broken").join(PLACEHOLDER_FILE)),
            Some("package broken")
        );
        assert_eq!(overlay.len(), 2);
    }

    #[test]
    fn test_scan_runs_once_per_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "go.mod", "module example.com/m\n");
        let host = Host::discover(root).unwrap();
        let mut overlay = Overlay::new();
        overlay.ensure_scanned(&host).unwrap();

        write(root, "late/a.gunk", "package late\n");
        overlay.ensure_scanned(&host).unwrap();
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_new_package_in_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("not").join("yet");
        let mut overlay = Overlay::new();
        assert!(overlay.add_for_new_package(&dir, "yet").unwrap());
        assert!(overlay.has_files_in(&dir));
    }
}
