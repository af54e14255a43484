//! Host toolchain model: Go modules, import paths and package listing.
//!
//! Only the parts of the Go toolchain that decide *which directories are
//! packages* are modeled here. A module root comes from a `go.mod`
//! manifest, local `replace` directives add further roots, and an import
//! path maps to a directory through the longest matching module path.

use std::fs;
use std::path::{Component, Path, PathBuf};

use smol_str::SmolStr;
use walkdir::{DirEntry, WalkDir};

use super::error::HostError;
use super::overlay::Overlay;
use crate::base::{HOST_EXTENSION, MANIFEST_FILE};
use crate::parser::{SyntaxKind, tokenize};

/// A module path and the directory holding its sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRoot {
    pub path: String,
    pub dir: PathBuf,
}

/// A directory the host toolchain recognises as a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPackage {
    /// Canonical import path
    pub path: SmolStr,
    pub dir: PathBuf,
    /// Name from the host files' package clauses
    pub name: Option<SmolStr>,
    pub errors: Vec<ListError>,
}

/// A problem found while listing a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListError {
    pub file: PathBuf,
    pub message: String,
}

/// Module layout of a workspace
#[derive(Debug, Clone, Default)]
pub struct Host {
    modules: Vec<ModuleRoot>,
}

impl Host {
    /// Find the module enclosing `dir` by walking up to the nearest
    /// manifest. A workspace outside any module gets an empty layout.
    pub fn discover(dir: &Path) -> Result<Self, HostError> {
        let Some(root) = dir.ancestors().find(|d| d.join(MANIFEST_FILE).is_file()) else {
            tracing::warn!(dir = %dir.display(), "no module manifest found");
            return Ok(Self::default());
        };
        let manifest = root.join(MANIFEST_FILE);
        let text = fs::read_to_string(&manifest).map_err(|e| HostError::io(&manifest, e))?;
        let host = Self::from_manifest(root, &text);
        tracing::debug!(modules = ?host.modules, "discovered module layout");
        Ok(host)
    }

    /// Build the layout from the text of a manifest located in `root`
    pub fn from_manifest(root: &Path, text: &str) -> Self {
        let mut main = None;
        let mut replaced = Vec::new();
        let mut in_replace_block = false;

        for line in text.lines() {
            let line = line.split("//").next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            if in_replace_block {
                if line == ")" {
                    in_replace_block = false;
                } else {
                    replaced.extend(parse_replace(root, line));
                }
                continue;
            }
            let mut words = line.split_whitespace();
            match words.next() {
                Some("module") => {
                    main = words.next().map(|p| p.trim_matches('"').to_string());
                }
                Some("replace") => {
                    let rest = line["replace".len()..].trim();
                    if rest == "(" {
                        in_replace_block = true;
                    } else {
                        replaced.extend(parse_replace(root, rest));
                    }
                }
                _ => {}
            }
        }

        let mut modules = Vec::new();
        if let Some(path) = main {
            modules.push(ModuleRoot {
                path,
                dir: root.to_path_buf(),
            });
        }
        modules.extend(replaced);
        Self { modules }
    }

    pub fn modules(&self) -> &[ModuleRoot] {
        &self.modules
    }

    /// Whether an import path names a standard-library package
    pub fn is_std(&self, import_path: &str) -> bool {
        let first = import_path.split('/').next().unwrap_or_default();
        !first.contains('.') && self.module_for(import_path).is_none()
    }

    /// Directory an import path lives in
    pub fn resolve(&self, import_path: &str) -> Option<PathBuf> {
        let module = self.module_for(import_path)?;
        let rest = &import_path[module.path.len()..];
        Some(
            rest.split('/')
                .filter(|part| !part.is_empty())
                .fold(module.dir.clone(), |dir, part| dir.join(part)),
        )
    }

    /// Import path of a directory, from the innermost module containing it
    pub fn import_path_of(&self, dir: &Path) -> Option<String> {
        let module = self
            .modules
            .iter()
            .filter(|m| dir.starts_with(&m.dir))
            .max_by_key(|m| m.dir.components().count())?;
        let rel = dir.strip_prefix(&module.dir).ok()?;
        let mut path = module.path.clone();
        for component in rel.components() {
            if let Component::Normal(part) = component {
                path.push('/');
                path.push_str(&part.to_string_lossy());
            }
        }
        Some(path)
    }

    fn module_for(&self, import_path: &str) -> Option<&ModuleRoot> {
        self.modules
            .iter()
            .filter(|m| {
                import_path
                    .strip_prefix(m.path.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .max_by_key(|m| m.path.len())
    }

    /// List the packages matching a pattern: an import path, an absolute
    /// directory, or either of those followed by `/...`.
    pub fn list(&self, pattern: &str, overlay: &Overlay) -> Result<Vec<HostPackage>, HostError> {
        if let Some(base) = pattern.strip_suffix("/...") {
            let Some(root) = self.pattern_dir(base)? else {
                return Ok(Vec::new());
            };
            return self.list_tree(&root, overlay);
        }
        let Some(dir) = self.pattern_dir(pattern)? else {
            return Ok(Vec::new());
        };
        if !has_host_files(&dir, overlay)? {
            return Ok(Vec::new());
        }
        Ok(vec![self.package(&dir, overlay)?])
    }

    fn pattern_dir(&self, pattern: &str) -> Result<Option<PathBuf>, HostError> {
        let path = Path::new(pattern);
        if path.is_absolute() {
            return Ok(Some(normalize(path)));
        }
        if self.is_std(pattern) {
            return Ok(None);
        }
        self.resolve(pattern)
            .map(Some)
            .ok_or_else(|| HostError::UnknownModule(pattern.to_string()))
    }

    fn list_tree(&self, root: &Path, overlay: &Overlay) -> Result<Vec<HostPackage>, HostError> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let mut packages = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e));
        for entry in walker {
            let entry = entry.map_err(|e| HostError::Walk {
                root: root.to_path_buf(),
                message: e.to_string(),
            })?;
            if entry.file_type().is_dir() && has_host_files(entry.path(), overlay)? {
                packages.push(self.package(entry.path(), overlay)?);
            }
        }
        Ok(packages)
    }

    fn package(&self, dir: &Path, overlay: &Overlay) -> Result<HostPackage, HostError> {
        let path = self
            .import_path_of(dir)
            .ok_or_else(|| HostError::OutsideModule(dir.to_path_buf()))?;

        let mut clauses: Vec<(SmolStr, PathBuf)> = Vec::new();
        for file in files_with_extension(dir, HOST_EXTENSION)? {
            if overlay.get(&file).is_some() {
                continue;
            }
            let text = fs::read_to_string(&file).map_err(|e| HostError::io(&file, e))?;
            if let Some(name) = package_clause_name(&text) {
                clauses.push((name, file));
            }
        }
        for (file, text) in overlay.files_in(dir) {
            if let Some(name) = package_clause_name(text) {
                clauses.push((name, file.to_path_buf()));
            }
        }

        let mut errors = Vec::new();
        let name = clauses.first().map(|(name, _)| name.clone());
        if let Some((first, first_file)) = clauses.first() {
            if let Some((other, other_file)) = clauses.iter().find(|(n, _)| n != first) {
                errors.push(ListError {
                    file: other_file.clone(),
                    message: format!(
                        "found packages {first} ({}) and {other} ({}) in {}",
                        file_name(first_file),
                        file_name(other_file),
                        dir.display()
                    ),
                });
            }
        }

        Ok(HostPackage {
            path: SmolStr::new(path),
            dir: dir.to_path_buf(),
            name,
            errors,
        })
    }
}

/// `replace old [version] => ./local [version]`; only local targets are
/// module roots.
fn parse_replace(root: &Path, spec: &str) -> Option<ModuleRoot> {
    let (old, new) = spec.split_once("=>")?;
    let path = old.split_whitespace().next()?.trim_matches('"');
    let target = new.split_whitespace().next()?.trim_matches('"');
    let is_local = target.starts_with("./") || target.starts_with("../") || Path::new(target).is_absolute();
    if !is_local {
        return None;
    }
    Some(ModuleRoot {
        path: path.to_string(),
        dir: normalize(&root.join(target)),
    })
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.')
        || name.starts_with('_')
        || name == "testdata"
        || name == "vendor"
        || entry.path().join(MANIFEST_FILE).is_file()
}

/// Whether a directory holds host sources, on disk or in the overlay
pub fn has_host_files(dir: &Path, overlay: &Overlay) -> Result<bool, HostError> {
    if overlay.has_files_in(dir) {
        return Ok(true);
    }
    Ok(!files_with_extension(dir, HOST_EXTENSION)?.is_empty())
}

/// Files in `dir` with the given extension, sorted. A missing directory
/// has no files.
pub fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, HostError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(HostError::io(dir, e)),
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HostError::io(dir, e))?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == extension) && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The name in a source file's `package` clause, if it has one
pub fn package_clause_name(text: &str) -> Option<SmolStr> {
    let mut tokens = tokenize(text).into_iter().filter(|t| !t.kind.is_trivia());
    let keyword = tokens.next()?;
    let name = tokens.next()?;
    (keyword.kind == SyntaxKind::PACKAGE_KW && name.kind == SyntaxKind::IDENT)
        .then(|| SmolStr::new(name.text))
}

/// Resolve `.` and `..` components without touching the file system
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn host() -> Host {
        Host::from_manifest(
            Path::new("/work/app"),
            "module example.com/app // main\n\ngo 1.21\n\nreplace (\n\texample.com/lib => ../lib\n\texample.com/remote => example.org/fork v1.0.0\n)\nreplace example.com/app/vendored v1.2.0 => ./third_party/vendored\n",
        )
    }

    #[test]
    fn test_manifest_modules_and_local_replacements() {
        let modules = host().modules;
        assert_eq!(modules.len(), 3);
        assert_eq!(modules[0].path, "example.com/app");
        assert_eq!(modules[1].dir, PathBuf::from("/work/lib"));
        assert_eq!(modules[2].dir, PathBuf::from("/work/app/third_party/vendored"));
    }

    #[rstest]
    #[case("example.com/app", Some("/work/app"))]
    #[case("example.com/app/api/v1", Some("/work/app/api/v1"))]
    #[case("example.com/lib/util", Some("/work/lib/util"))]
    #[case("example.com/app/vendored/x", Some("/work/app/third_party/vendored/x"))]
    #[case("example.com/application", None)]
    #[case("example.com/remote/x", None)]
    fn test_resolve_uses_longest_module_path(#[case] path: &str, #[case] dir: Option<&str>) {
        assert_eq!(host().resolve(path), dir.map(PathBuf::from));
    }

    #[test]
    fn test_import_path_of_dir() {
        let host = host();
        assert_eq!(
            host.import_path_of(Path::new("/work/app/api/v1")).as_deref(),
            Some("example.com/app/api/v1")
        );
        assert_eq!(
            host.import_path_of(Path::new("/work/app/third_party/vendored")).as_deref(),
            Some("example.com/app/vendored")
        );
        assert_eq!(host.import_path_of(Path::new("/elsewhere")), None);
    }

    #[rstest]
    #[case("time", true)]
    #[case("encoding/json", true)]
    #[case("example.com/app/x", false)]
    fn test_std_paths(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(host().is_std(path), expected);
    }

    #[rstest]
    #[case("package foo\n", Some("foo"))]
    #[case("// Package foo does things.\npackage foo // trailing\n", Some("foo"))]
    #[case("/* header */ package bar", Some("bar"))]
    #[case("type T int\n", None)]
    #[case("", None)]
    fn test_package_clause_name(#[case] text: &str, #[case] expected: Option<&str>) {
        assert_eq!(package_clause_name(text).as_deref(), expected);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
    }
}
