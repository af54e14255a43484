//! Type checker for one package.
//!
//! Checking runs in phases over all files of the package:
//!
//! ```text
//! imports      ← each import path goes through the Importer
//!     │
//!     ▼
//! declarations ← package-block names of types and constants
//!     │
//!     ▼
//! resolution   ← types and constants, lazily and in dependency order
//!     │
//!     ▼
//! cycles/keys  ← recursive struct values, map key comparability
//!     │
//!     ▼
//! tags         ← `+gunk` expressions, only when nothing failed so far
//! ```
//!
//! The checker never fails: problems are returned as [`RawError`]s.

mod exprs;
mod types;

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::diagnostics::{CoordSpace, RawError};
use super::importer::Importer;
use super::types::{ConstDef, PackageSurface, Ty, TypeAndValue, is_exported};
use super::universe::{self, Predeclared};
use crate::base::{TextRange, TextSize};
use crate::parser::{AstNode, ConstSpec, Expr, SourceFile, Type, TypeSpec};
use crate::syntax::{Tag, TagSource, collect_tags};

/// Types of the type and expression nodes of one tree, keyed by node range
pub type TypeTable = FxHashMap<TextRange, TypeAndValue>;

/// A tag expression after checking
#[derive(Debug, Clone)]
pub struct CheckedTag {
    pub source: TagSource,
    /// Type and value of the whole expression; `None` if it did not check
    pub tv: Option<TypeAndValue>,
    /// Types of the nodes inside the tag's own tree
    pub types: TypeTable,
}

/// Checked tags, keyed by file index and the range of the node owning the
/// doc comment
pub type TagTable = FxHashMap<(usize, TextRange), Vec<CheckedTag>>;

#[derive(Debug, Default)]
pub struct CheckResult {
    pub surface: PackageSurface,
    /// One table per file, index-aligned with the checked files
    pub types: Vec<TypeTable>,
    pub tags: TagTable,
    pub errors: Vec<RawError>,
    /// Every path passed to the importer, in import order, whether or not
    /// the import succeeded
    pub imports: Vec<SmolStr>,
}

/// Type-check the files of package `path`.
pub fn check<I: Importer>(
    path: &str,
    name: &str,
    files: &[SourceFile],
    importer: &mut I,
) -> CheckResult {
    let mut checker = Checker::new(path, name, files, importer);
    checker.collect_imports();
    checker.collect_decls();

    let names: Vec<(SmolStr, bool)> = checker
        .decls
        .iter()
        .map(|(name, decl)| (name.clone(), matches!(decl, Decl::Type { .. })))
        .collect();
    for (name, is_type) in names {
        if is_type {
            checker.resolve_named(&name);
        } else {
            checker.resolve_const(&name);
        }
    }
    checker.check_cycles();
    checker.check_map_keys();

    let tags = if checker.errors.is_empty() {
        checker.check_tags()
    } else {
        TagTable::default()
    };
    tracing::trace!(
        package = path,
        errors = checker.errors.len(),
        tags = tags.len(),
        "checked package"
    );
    checker.finish(tags)
}

// ============================================================================
// CHECKER STATE
// ============================================================================

#[derive(Debug, Clone)]
enum Decl {
    Type {
        file: usize,
        spec: TypeSpec,
    },
    Const {
        file: usize,
        spec: ConstSpec,
        ty: Option<Type>,
        value: Option<Expr>,
        iota: i128,
    },
}

impl Decl {
    fn file(&self) -> usize {
        match self {
            Decl::Type { file, .. } | Decl::Const { file, .. } => *file,
        }
    }

    fn name_at(&self) -> TextSize {
        let name = match self {
            Decl::Type { spec, .. } => spec.name(),
            Decl::Const { spec, .. } => spec.name(),
        };
        name.map(|n| n.range().start()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclState {
    InProgress,
    Done,
}

/// What a name denotes in a file's scope
#[derive(Debug, Clone)]
enum Binding {
    Type(Ty),
    LocalType(SmolStr),
    LocalConst(SmolStr),
    Const(ConstDef),
    Iota,
    /// An imported package; `None` when the import failed
    Package(Option<Arc<PackageSurface>>),
}

/// Where the checker currently is
struct Ctx {
    file: usize,
    space: CoordSpace,
    iota: Option<i128>,
    table: TypeTable,
}

impl Ctx {
    fn source(file: usize) -> Self {
        Self {
            file,
            space: CoordSpace::Source,
            iota: None,
            table: TypeTable::default(),
        }
    }

    fn tag(file: usize, tag: &Tag) -> Self {
        Self {
            file,
            space: CoordSpace::Tag(Box::new(tag.clone())),
            iota: None,
            table: TypeTable::default(),
        }
    }
}

/// A map key type whose comparability is checked once all types resolved
struct PendingKey {
    file: usize,
    space: CoordSpace,
    at: TextSize,
    ty: Ty,
}

struct Checker<'a, I: Importer> {
    path: SmolStr,
    files: &'a [SourceFile],
    importer: &'a mut I,
    surface: PackageSurface,
    decls: IndexMap<SmolStr, Decl>,
    states: FxHashMap<SmolStr, DeclState>,
    /// Named imports of each file
    scopes: Vec<FxHashMap<SmolStr, Option<Arc<PackageSurface>>>>,
    dot_imports: Vec<Vec<Arc<PackageSurface>>>,
    import_cache: FxHashMap<String, Result<Arc<PackageSurface>, String>>,
    imports: Vec<SmolStr>,
    tables: Vec<TypeTable>,
    pending_keys: Vec<PendingKey>,
    reported_cycles: FxHashSet<SmolStr>,
    errors: Vec<RawError>,
}

impl<'a, I: Importer> Checker<'a, I> {
    fn new(path: &str, name: &str, files: &'a [SourceFile], importer: &'a mut I) -> Self {
        Self {
            path: SmolStr::new(path),
            files,
            importer,
            surface: PackageSurface::new(path, name),
            decls: IndexMap::new(),
            states: FxHashMap::default(),
            scopes: vec![FxHashMap::default(); files.len()],
            dot_imports: vec![Vec::new(); files.len()],
            import_cache: FxHashMap::default(),
            imports: Vec::new(),
            tables: vec![TypeTable::default(); files.len()],
            pending_keys: Vec::new(),
            reported_cycles: FxHashSet::default(),
            errors: Vec::new(),
        }
    }

    fn finish(self, tags: TagTable) -> CheckResult {
        CheckResult {
            surface: self.surface,
            types: self.tables,
            tags,
            errors: self.errors,
            imports: self.imports,
        }
    }

    fn error(&mut self, ctx: &Ctx, at: TextSize, message: impl Into<String>) {
        self.error_in(ctx.file, ctx.space.clone(), at, message);
    }

    fn error_in(&mut self, file: usize, space: CoordSpace, at: TextSize, message: impl Into<String>) {
        self.errors.push(RawError {
            file,
            space,
            at,
            message: message.into(),
        });
    }

    /// Keep the node types recorded in a source context
    fn flush(&mut self, ctx: Ctx) {
        if let CoordSpace::Source = ctx.space {
            if let Some(table) = self.tables.get_mut(ctx.file) {
                table.extend(ctx.table);
            }
        }
    }

    // ========================================================================
    // IMPORTS
    // ========================================================================

    fn collect_imports(&mut self) {
        let files = self.files;
        for (file, source) in files.iter().enumerate() {
            for spec in source.imports() {
                let (Some(literal), Some(path)) = (spec.path_literal(), spec.path()) else {
                    continue;
                };
                let imported = match self.import(&path) {
                    Ok(surface) => Some(surface),
                    Err(reason) => {
                        self.error_in(
                            file,
                            CoordSpace::Source,
                            literal.range().start(),
                            format!("could not import {path} ({reason})"),
                        );
                        None
                    }
                };
                let alias = spec.name().map(|n| n.text());
                match alias.as_deref() {
                    Some("_") => {}
                    Some(".") => self.dot_imports[file].extend(imported),
                    Some(alias) => {
                        self.scopes[file].insert(SmolStr::new(alias), imported);
                    }
                    None => {
                        let local = match &imported {
                            Some(surface) => surface.name.clone(),
                            None => SmolStr::new(path.rsplit('/').next().unwrap_or(&path)),
                        };
                        self.scopes[file].insert(local, imported);
                    }
                }
            }
        }
    }

    fn import(&mut self, path: &str) -> Result<Arc<PackageSurface>, String> {
        if let Some(cached) = self.import_cache.get(path) {
            return cached.clone();
        }
        // recorded even when the import fails
        if !self.imports.iter().any(|p| p == path) {
            self.imports.push(SmolStr::new(path));
        }
        let result = self.importer.import(path).map_err(|e| e.to_string());
        if let Ok(surface) = &result {
            self.surface
                .imports
                .insert(surface.path.clone(), surface.clone());
        }
        self.import_cache.insert(path.to_string(), result.clone());
        result
    }

    // ========================================================================
    // DECLARATIONS
    // ========================================================================

    fn collect_decls(&mut self) {
        let files = self.files;
        for (file, source) in files.iter().enumerate() {
            for spec in source.type_specs() {
                let Some(name) = spec.name() else { continue };
                let at = name.range().start();
                self.declare(file, name.text(), at, Decl::Type { file, spec });
            }
            for decl in source.const_decls() {
                let mut previous: Option<(Option<Type>, Expr)> = None;
                for (iota, spec) in decl.specs().enumerate() {
                    let (ty, value) = match spec.value() {
                        Some(value) => {
                            previous = Some((spec.ty(), value.clone()));
                            (spec.ty(), Some(value))
                        }
                        None if spec.ty().is_some() => (spec.ty(), None),
                        None => match &previous {
                            Some((ty, value)) => (ty.clone(), Some(value.clone())),
                            None => (None, None),
                        },
                    };
                    let Some(name) = spec.name() else { continue };
                    let at = name.range().start();
                    let decl = Decl::Const {
                        file,
                        spec,
                        ty,
                        value,
                        iota: iota as i128,
                    };
                    self.declare(file, name.text(), at, decl);
                }
            }
        }
    }

    fn declare(&mut self, file: usize, name: String, at: TextSize, decl: Decl) {
        if name.is_empty() || name == "_" {
            return;
        }
        let name = SmolStr::new(name);
        if self.decls.contains_key(&name) {
            self.error_in(file, CoordSpace::Source, at, format!("{name} redeclared in this block"));
            return;
        }
        self.decls.insert(name, decl);
    }

    fn lookup(&self, file: usize, name: &str) -> Option<Binding> {
        if let Some(decl) = self.decls.get(name) {
            return Some(match decl {
                Decl::Type { .. } => Binding::LocalType(SmolStr::new(name)),
                Decl::Const { .. } => Binding::LocalConst(SmolStr::new(name)),
            });
        }
        if let Some(imported) = self.scopes.get(file).and_then(|scope| scope.get(name)) {
            return Some(Binding::Package(imported.clone()));
        }
        if is_exported(name) {
            for surface in self.dot_imports.get(file).into_iter().flatten() {
                if surface.types.contains_key(name) {
                    return Some(Binding::Type(Ty::Named(surface.named(name))));
                }
                if let Some(def) = surface.consts.get(name) {
                    return Some(Binding::Const(def.clone()));
                }
            }
        }
        universe::lookup(name).map(|predeclared| match predeclared {
            Predeclared::Type(ty) => Binding::Type(ty),
            Predeclared::Const(ty, value) => Binding::Const(ConstDef { ty, value }),
            Predeclared::Iota => Binding::Iota,
        })
    }

    // ========================================================================
    // TAGS
    // ========================================================================

    fn check_tags(&mut self) -> TagTable {
        let mut table = TagTable::default();
        let files = self.files;
        for (file, source) in files.iter().enumerate() {
            for (owner, tags) in collect_tags(source.syntax()) {
                let mut checked = Vec::with_capacity(tags.len());
                for tag in &tags {
                    let Some(expr) = tag.root().and_then(|root| root.expr()) else {
                        continue;
                    };
                    if !tag.parse.ok() {
                        continue;
                    }
                    let mut ctx = Ctx::tag(file, tag);
                    let tv = self.expr(&mut ctx, &expr);
                    checked.push(CheckedTag {
                        source: tag.source.clone(),
                        tv,
                        types: ctx.table,
                    });
                }
                if !checked.is_empty() {
                    table.insert((file, owner), checked);
                }
            }
        }
        self.check_map_keys();
        table
    }
}

#[cfg(test)]
mod tests;
