//! The package graph: loading, tracking and checking IDL packages.
//!
//! The [`Loader`] owns every package node it has produced, keyed by import
//! path, together with the editor's in-memory file contents and the
//! placeholder overlay. Edits mark packages [`PackageState::Dirty`] and
//! invalidate their direct importers; [`Loader::errors`] recomputes a dirty
//! package and invalidates its importers again when its type surface
//! changed, so invalidation spreads one hop per recomputation.
//!
//! ```text
//! add/update/close ─► Dirty ─► errors() ─► Building ─► Open
//!                                  │
//!                                  └─► Importer ─► load + check deps
//! ```

mod error;
mod package;

pub use error::{AddFileError, CloseFileError, ImportError, LoadError};
pub use package::{Checked, PackageNode, PackageState, ParsedFile};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::{IDL_EXTENSION, LineIndex, Span};
use crate::hir::{self, Diagnostic, Error, ErrorKind, Importer, PackageSurface};
use crate::parser;
use crate::parser::ast::AstNode;
use crate::project::{
    Host, HostError, Overlay, dir_name, files_with_extension, normalize, package_clause_name,
};
use crate::syntax::collect_tags;

/// Diagnostics of a package, with an entry for every one of its files
pub type FileDiagnostics = IndexMap<PathBuf, Vec<Diagnostic>>;

/// What closing a file did to its package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closed {
    /// The package still has files and needs new diagnostics
    Dirty(SmolStr),
    /// The last file was closed and the package was dropped
    Evicted(SmolStr),
}

#[derive(Debug)]
pub struct Loader {
    host: Host,
    overlay: Overlay,
    /// Editor-held file contents
    overrides: FxHashMap<PathBuf, String>,
    packages: IndexMap<SmolStr, PackageNode>,
    /// Packages each loaded pattern resolved to
    memo: FxHashMap<String, Vec<SmolStr>>,
    tracked: IndexSet<SmolStr>,
    /// Surface of each package at its last `errors` call
    published: FxHashMap<SmolStr, Option<Arc<PackageSurface>>>,
    /// Packages being checked, innermost last
    building: Vec<SmolStr>,
}

impl Loader {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            overlay: Overlay::new(),
            overrides: FxHashMap::default(),
            packages: IndexMap::new(),
            memo: FxHashMap::default(),
            tracked: IndexSet::new(),
            published: FxHashMap::default(),
            building: Vec::new(),
        }
    }

    /// A loader for the module enclosing `dir`
    pub fn discover(dir: &Path) -> Result<Self, HostError> {
        Ok(Self::new(Host::discover(dir)?))
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn package(&self, path: &str) -> Option<&PackageNode> {
        self.packages.get(path)
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageNode> {
        self.packages.values()
    }

    pub fn is_tracked(&self, path: &str) -> bool {
        self.tracked.contains(path)
    }

    pub fn tracked(&self) -> impl Iterator<Item = &SmolStr> {
        self.tracked.iter()
    }

    /// Tracked packages whose diagnostics are out of date
    pub fn dirty(&self) -> Vec<SmolStr> {
        self.tracked
            .iter()
            .filter(|p| {
                self.packages
                    .get(*p)
                    .is_some_and(|n| n.state == PackageState::Dirty)
            })
            .cloned()
            .collect()
    }

    /// The package whose directory holds `file`
    pub fn package_for_file(&self, file: &Path) -> Option<&PackageNode> {
        let dir = normalize(file.parent()?);
        self.packages.values().find(|n| n.dir == dir)
    }

    fn covering(&self, dir: &Path) -> Option<SmolStr> {
        self.packages
            .values()
            .find(|n| n.dir == dir)
            .map(|n| n.path.clone())
    }

    /// Contents of a file, preferring what the editor holds
    pub fn read(&self, path: &Path) -> std::io::Result<String> {
        match self.overrides.get(path) {
            Some(text) => Ok(text.clone()),
            None => fs::read_to_string(path),
        }
    }

    /// IDL files of a directory: on disk plus the editor-held ones
    fn idl_files(&self, dir: &Path) -> Result<Vec<PathBuf>, HostError> {
        let mut files = files_with_extension(dir, IDL_EXTENSION)?;
        files.extend(
            self.overrides
                .keys()
                .filter(|p| p.parent() == Some(dir))
                .filter(|p| p.extension().is_some_and(|e| e == IDL_EXTENSION))
                .cloned(),
        );
        files.sort();
        files.dedup();
        Ok(files)
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    /// Resolve a pattern to packages. Results are memoized per pattern
    /// until an edit evicts them; patterns whose packages had host errors
    /// are resolved again.
    pub fn load(&mut self, pattern: &str) -> Result<Vec<SmolStr>, LoadError> {
        if let Some(paths) = self.memo.get(pattern) {
            let in_error = paths
                .iter()
                .filter_map(|p| self.packages.get(p))
                .any(|n| !n.list_errors.is_empty());
            if !in_error {
                return Ok(paths.clone());
            }
            tracing::debug!(pattern, "reloading packages with host errors");
        }

        self.overlay.ensure_scanned(&self.host)?;
        let dir = Path::new(pattern);
        if dir.is_absolute() && !pattern.ends_with("/...") {
            self.overlay.add_for_dir(dir)?;
        }

        let mut paths = Vec::new();
        for listed in self.host.list(pattern, &self.overlay)? {
            let files = self.idl_files(&listed.dir)?;
            if files.is_empty() && listed.errors.is_empty() {
                continue;
            }
            let name = listed
                .name
                .clone()
                .unwrap_or_else(|| SmolStr::new(dir_name(&listed.dir)));
            match self.packages.get_mut(&listed.path) {
                Some(node) => {
                    if node.files != files && node.state != PackageState::Building {
                        node.reset();
                        if node.state == PackageState::Open {
                            node.state = PackageState::Dirty;
                        }
                    }
                    node.files = files;
                    node.name = name;
                    node.dir = listed.dir;
                    node.list_errors = listed.errors;
                }
                None => {
                    let mut node = PackageNode::new(listed.path.clone(), listed.dir, name, files);
                    node.list_errors = listed.errors;
                    self.packages.insert(listed.path.clone(), node);
                }
            }
            paths.push(listed.path);
        }
        tracing::trace!(pattern, packages = paths.len(), "loaded pattern");
        self.memo.insert(pattern.to_string(), paths.clone());
        Ok(paths)
    }

    /// Load a pattern that must name exactly one package
    pub fn load_one(&mut self, pattern: &str) -> Result<SmolStr, LoadError> {
        let mut paths = self.load(pattern)?;
        if paths.len() != 1 {
            return Err(LoadError::PackageCount {
                pattern: pattern.to_string(),
                count: paths.len(),
            });
        }
        Ok(paths.remove(0))
    }

    /// Load a pattern and track every package it yields
    pub fn track(&mut self, pattern: &str) -> Result<Vec<SmolStr>, LoadError> {
        let paths = self.load(pattern)?;
        self.tracked.extend(paths.iter().cloned());
        tracing::debug!(pattern, packages = paths.len(), "tracking packages");
        Ok(paths)
    }

    /// Load and check a package unless its current contents were already
    /// checked. The package state is left as it was.
    pub fn ensure_checked(&mut self, path: &str) -> Option<&PackageNode> {
        let node = self.packages.get(path)?;
        if !node.analyzed {
            let path = node.path.clone();
            self.check_package(&path);
        }
        self.packages.get(path)
    }

    // ========================================================================
    // FILE LIFECYCLE
    // ========================================================================

    /// Start holding `content` for `path`, creating its package if no
    /// loaded package covers the directory.
    pub fn add_file(&mut self, path: &Path, content: String) -> Result<SmolStr, AddFileError> {
        let path = normalize(path);
        let dir = parent_dir(&path).ok_or_else(|| AddFileError::NoParent(path.clone()))?;
        let name_hint = package_clause_name(&content);
        self.overrides.insert(path.clone(), content);

        let pkg = match self.covering(&dir) {
            Some(pkg) => {
                if let Some(node) = self.packages.get_mut(&pkg) {
                    if !node.has_file(&path) {
                        node.files.push(path.clone());
                        node.files.sort();
                    }
                    mark_dirty(node);
                }
                pkg
            }
            None => {
                let name = name_hint
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| dir_name(&dir));
                self.overlay.add_for_new_package(&dir, &name)?;
                let pattern = dir.to_string_lossy().into_owned();
                self.memo.remove(&pattern);
                let pkg = self.load_one(&pattern)?;
                if let Some(node) = self.packages.get_mut(&pkg) {
                    mark_dirty(node);
                }
                pkg
            }
        };
        tracing::debug!(file = %path.display(), package = %pkg, "added file");
        self.tracked.insert(pkg.clone());
        self.evict_memo(&pkg);
        self.invalidate(&pkg);
        Ok(pkg)
    }

    /// Replace the held contents of `path`
    pub fn update_file(&mut self, path: &Path, content: String) -> Result<SmolStr, AddFileError> {
        let path = normalize(path);
        let dir = parent_dir(&path).ok_or_else(|| AddFileError::NoParent(path.clone()))?;
        let Some(pkg) = self.covering(&dir) else {
            return self.add_file(&path, content);
        };
        self.overrides.insert(path.clone(), content);
        let files = self.idl_files(&dir)?;
        if let Some(node) = self.packages.get_mut(&pkg) {
            node.files = files;
            mark_dirty(node);
        }
        tracing::debug!(file = %path.display(), package = %pkg, "updated file");
        self.tracked.insert(pkg.clone());
        self.evict_memo(&pkg);
        self.invalidate(&pkg);
        Ok(pkg)
    }

    /// Stop holding `path`. The package falls back to what is on disk and
    /// is dropped when no IDL file remains.
    pub fn close_file(&mut self, path: &Path) -> Result<Closed, CloseFileError> {
        let path = normalize(path);
        let pkg = parent_dir(&path)
            .and_then(|dir| self.covering(&dir))
            .ok_or_else(|| CloseFileError::NotLoaded(path.clone()))?;
        self.overrides.remove(&path);

        let dir = self
            .packages
            .get(&pkg)
            .map(|n| n.dir.clone())
            .ok_or_else(|| CloseFileError::NotLoaded(path.clone()))?;
        let files = self.idl_files(&dir)?;
        self.evict_memo(&pkg);
        self.invalidate(&pkg);

        if files.is_empty() {
            self.tracked.shift_remove(&pkg);
            self.packages.shift_remove(&pkg);
            self.published.remove(&pkg);
            for paths in self.memo.values_mut() {
                paths.retain(|p| p != &pkg);
            }
            tracing::debug!(file = %path.display(), package = %pkg, "closed last file, evicted package");
            return Ok(Closed::Evicted(pkg));
        }
        if let Some(node) = self.packages.get_mut(&pkg) {
            node.files = files;
            mark_dirty(node);
        }
        tracing::debug!(file = %path.display(), package = %pkg, "closed file");
        Ok(Closed::Dirty(pkg))
    }

    fn evict_memo(&mut self, pkg: &SmolStr) {
        self.memo.remove(pkg.as_str());
        if let Some(node) = self.packages.get(pkg) {
            self.memo.remove(node.dir.to_string_lossy().as_ref());
        }
    }

    /// Make the direct importers of `pkg` check again
    fn invalidate(&mut self, pkg: &SmolStr) {
        for node in self.packages.values_mut() {
            if &node.path == pkg || !node.imports.contains(pkg) {
                continue;
            }
            match node.state {
                PackageState::Building => continue,
                PackageState::Open => node.state = PackageState::Dirty,
                PackageState::Untracked | PackageState::Dirty => {}
            }
            node.reset();
            tracing::trace!(importer = %node.path, dependency = %pkg, "invalidated importer");
        }
    }

    // ========================================================================
    // DIAGNOSTICS
    // ========================================================================

    /// Recompute the diagnostics of a dirty package. Packages that are not
    /// dirty yield nothing: their last diagnostics still hold.
    pub fn errors(&mut self, path: &str) -> FileDiagnostics {
        let mut diagnostics = FileDiagnostics::new();
        let Some(node) = self.packages.get(path) else {
            return diagnostics;
        };
        if node.state != PackageState::Dirty {
            return diagnostics;
        }
        let pkg = node.path.clone();
        self.check_package(&pkg);

        let Some(node) = self.packages.get_mut(&pkg) else {
            return diagnostics;
        };
        node.state = PackageState::Open;
        for file in &node.files {
            diagnostics.entry(file.clone()).or_default();
        }
        for error in &node.errors {
            diagnostics
                .entry(error.file.clone())
                .or_default()
                .push(Diagnostic::from(error));
        }

        let surface = node.surface().cloned();
        let changed = self.published.get(&pkg) != Some(&surface);
        self.published.insert(pkg.clone(), surface);
        if changed {
            self.invalidate(&pkg);
        }
        diagnostics
    }

    /// Parse, check and validate a package from scratch
    fn check_package(&mut self, pkg: &SmolStr) {
        let Some(node) = self.packages.get_mut(pkg) else {
            return;
        };
        let prior = node.state;
        node.reset();
        node.state = PackageState::Building;
        let files = node.files.clone();
        let (path, name) = (node.path.clone(), node.name.clone());
        let first_file = files.first().cloned().unwrap_or_else(|| node.dir.clone());
        let mut errors: Vec<Error> = node
            .list_errors
            .iter()
            .map(|e| {
                let file = if files.contains(&e.file) { e.file.clone() } else { first_file.clone() };
                Error::new(ErrorKind::List, file, Span::default(), e.message.clone())
            })
            .collect();

        let overrides = &self.overrides;
        let (parsed, parse_errors): (Vec<ParsedFile>, Vec<Vec<Error>>) = files
            .par_iter()
            .map(|file| parse_file(file, overrides.get(file)))
            .unzip();
        let parsed_ok = parse_errors.iter().all(Vec::is_empty);
        errors.extend(parse_errors.into_iter().flatten());

        let sources: Vec<_> = parsed.iter().filter_map(ParsedFile::source).collect();
        for violation in hir::check_package_names(&sources) {
            errors.push(violation_error(&parsed[violation.file], violation));
        }

        let mut checked = None;
        let mut imports = Vec::new();
        if errors.is_empty() {
            self.building.push(pkg.clone());
            let result = hir::check(&path, &name, &sources, self);
            self.building.pop();
            for raw in &result.errors {
                let file = &parsed[raw.file];
                let span = hir::locate(raw, sources[raw.file].syntax(), &file.index);
                errors.push(Error::new(ErrorKind::Type, &file.path, span, raw.message.clone()));
            }
            imports = result
                .imports
                .into_iter()
                .filter(|p| self.packages.contains_key(p))
                .collect();
            checked = Some(Checked {
                surface: Arc::new(result.surface),
                types: result.types,
                tags: result.tags,
            });
        }
        if parsed_ok {
            for violation in hir::validate(&sources) {
                errors.push(violation_error(&parsed[violation.file], violation));
            }
        }

        tracing::debug!(package = %pkg, files = parsed.len(), errors = errors.len(), "checked package");
        let Some(node) = self.packages.get_mut(pkg) else {
            return;
        };
        node.parsed = parsed;
        node.checked = checked;
        node.errors = errors;
        node.imports = imports;
        node.analyzed = true;
        node.state = prior;
    }
}

impl Importer for Loader {
    type Error = ImportError;

    fn import(&mut self, path: &str) -> Result<Arc<PackageSurface>, ImportError> {
        if self.host.is_std(path) {
            return hir::std_package(path)
                .map(Arc::new)
                .ok_or_else(|| ImportError::NotInStd(path.to_string()));
        }
        let pkg = self.load_one(path)?;
        let node = self.packages.get(&pkg).ok_or_else(|| LoadError::PackageCount {
            pattern: path.to_string(),
            count: 0,
        })?;
        if let Some(first) = node.list_errors.first() {
            return Err(ImportError::Package(first.message.clone()));
        }
        match node.state {
            PackageState::Building => {
                self.mark_cycle(&pkg);
                return Err(ImportError::Cycle);
            }
            _ if !node.analyzed => {
                tracing::trace!(package = %pkg, "checking imported package");
                self.check_package(&pkg);
            }
            _ => {}
        }
        let node = self.packages.get(&pkg).ok_or(ImportError::Cycle)?;
        if node.in_cycle {
            return Err(ImportError::Cycle);
        }
        match node.surface() {
            Some(surface) => Ok(surface.clone()),
            None => Err(ImportError::Package(
                node.errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| format!("package {pkg} has errors")),
            )),
        }
    }
}

impl Loader {
    /// Flag every package on the check stack from `pkg` inwards
    fn mark_cycle(&mut self, pkg: &SmolStr) {
        let Some(start) = self.building.iter().position(|p| p == pkg) else {
            return;
        };
        for path in &self.building[start..] {
            if let Some(node) = self.packages.get_mut(path) {
                node.in_cycle = true;
            }
        }
        tracing::debug!(package = %pkg, "import cycle");
    }
}

fn mark_dirty(node: &mut PackageNode) {
    node.reset();
    node.state = PackageState::Dirty;
}

fn parent_dir(path: &Path) -> Option<PathBuf> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn violation_error(file: &ParsedFile, violation: hir::Violation) -> Error {
    Error::new(
        ErrorKind::Validate,
        &file.path,
        file.index.span(violation.range),
        violation.message,
    )
}

/// Read and parse one file, collecting syntax errors of the file and of
/// the tags in its doc comments
fn parse_file(path: &Path, held: Option<&String>) -> (ParsedFile, Vec<Error>) {
    let mut errors = Vec::new();
    let text = match held {
        Some(text) => text.clone(),
        None => fs::read_to_string(path).unwrap_or_else(|e| {
            errors.push(Error::new(ErrorKind::Unknown, path, Span::default(), e.to_string()));
            String::new()
        }),
    };
    let parse = parser::parse(&text);
    let index = LineIndex::new(text);
    for e in &parse.errors {
        errors.push(Error::new(ErrorKind::Parse, path, index.span(e.range), e.message.clone()));
    }
    for (_, tags) in collect_tags(&parse.syntax()) {
        for e in tags.iter().flat_map(|tag| tag.errors()) {
            errors.push(Error::new(ErrorKind::Parse, path, index.span(e.range), e.message));
        }
    }
    let parsed = ParsedFile {
        path: path.to_path_buf(),
        green: parse.green,
        index,
    };
    (parsed, errors)
}
