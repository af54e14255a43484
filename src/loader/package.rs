//! Package nodes of the package graph.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use smol_str::SmolStr;

use crate::base::LineIndex;
use crate::hir::{Error, PackageSurface, TagTable, TypeTable};
use crate::parser::{AstNode, GreenNode, SourceFile, SyntaxNode};
use crate::project::ListError;

/// Lifecycle of a package node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageState {
    /// Known to the loader, diagnostics never requested
    Untracked,
    /// Needs its diagnostics recomputed
    Dirty,
    /// Being checked; importing it again means an import cycle
    Building,
    /// Diagnostics are current
    Open,
}

/// One parsed file of a package
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub green: GreenNode,
    pub index: LineIndex,
}

impl ParsedFile {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn source(&self) -> Option<SourceFile> {
        SourceFile::cast(self.syntax())
    }

    pub fn text(&self) -> &str {
        self.index.text()
    }
}

/// What a successful type check leaves behind
#[derive(Debug, Clone)]
pub struct Checked {
    pub surface: Arc<PackageSurface>,
    /// Index-aligned with the package files
    pub types: Vec<TypeTable>,
    pub tags: TagTable,
}

#[derive(Debug, Clone)]
pub struct PackageNode {
    pub path: SmolStr,
    pub dir: PathBuf,
    pub name: SmolStr,
    /// IDL files, sorted
    pub files: Vec<PathBuf>,
    pub state: PackageState,
    pub(crate) list_errors: Vec<ListError>,
    pub(crate) parsed: Vec<ParsedFile>,
    pub(crate) checked: Option<Checked>,
    pub(crate) errors: Vec<Error>,
    /// IDL packages this one imported on its last check
    pub(crate) imports: Vec<SmolStr>,
    pub(crate) analyzed: bool,
    /// Part of an import cycle found during its last check
    pub(crate) in_cycle: bool,
}

impl PackageNode {
    pub(crate) fn new(path: SmolStr, dir: PathBuf, name: SmolStr, files: Vec<PathBuf>) -> Self {
        Self {
            path,
            dir,
            name,
            files,
            state: PackageState::Untracked,
            list_errors: Vec::new(),
            parsed: Vec::new(),
            checked: None,
            errors: Vec::new(),
            imports: Vec::new(),
            analyzed: false,
            in_cycle: false,
        }
    }

    /// Drop everything derived from the files. Trees, types and errors are
    /// only ever replaced together.
    pub(crate) fn reset(&mut self) {
        self.parsed.clear();
        self.checked = None;
        self.errors.clear();
        self.imports.clear();
        self.analyzed = false;
        self.in_cycle = false;
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn parsed(&self) -> &[ParsedFile] {
        &self.parsed
    }

    pub fn imports(&self) -> &[SmolStr] {
        &self.imports
    }

    pub fn file_index(&self, path: &Path) -> Option<usize> {
        self.parsed.iter().position(|f| f.path == path)
    }

    pub fn parsed_file(&self, path: &Path) -> Option<&ParsedFile> {
        self.parsed.iter().find(|f| f.path == path)
    }

    pub fn surface(&self) -> Option<&Arc<PackageSurface>> {
        self.checked.as_ref().map(|c| &c.surface)
    }

    pub fn types(&self, file: usize) -> Option<&TypeTable> {
        self.checked.as_ref()?.types.get(file)
    }

    pub fn tags(&self) -> Option<&TagTable> {
        self.checked.as_ref().map(|c| &c.tags)
    }

    pub fn has_file(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f == path)
    }
}
