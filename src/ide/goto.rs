//! Go-to-definition.
//!
//! The cursor is located by a containment search from the file root that
//! only descends into nodes able to hold a reference. Import paths jump to
//! every file of the imported package; type references jump to the name of
//! the declaring type spec.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::Location;
use crate::base::{Position, Span, TextSize};
use crate::hir::{ErrorKind, NamedRef, Ty};
use crate::loader::{LoadError, Loader, PackageNode};
use crate::parser::{AstNode, ImportSpec, SyntaxKind, SyntaxNode, TypeSpec};

#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The cursor is on something navigable only in principle, such as a
    /// basic type or the syntax wrapping an element type
    #[error("can only go to definition on struct or enum types")]
    InvalidTarget,

    #[error("could not find package for {}", .0.display())]
    NoPackage(PathBuf),

    #[error("file {} has errors", .0.display())]
    FileHasErrors(PathBuf),

    #[error("could not find file {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("unexpected error loading {path:?}: {source}")]
    Load {
        path: String,
        #[source]
        source: LoadError,
    },

    #[error("no gunk files in package {0:?}")]
    EmptyPackage(String),
}

/// What the cursor landed on
enum Target {
    Import(ImportSpec),
    Reference(SyntaxNode),
    /// Inside an element-type wrapper but not on a reference
    Wrapper,
    Nothing,
}

/// Find the definition of whatever is under `position` in `file`.
///
/// An empty result means the cursor is not on anything navigable.
pub fn goto_definition(
    loader: &mut Loader,
    file: &Path,
    position: Position,
) -> Result<Vec<Location>, DefinitionError> {
    let pkg = loader
        .package_for_file(file)
        .map(|n| n.path.clone())
        .ok_or_else(|| DefinitionError::NoPackage(file.to_path_buf()))?;
    let node = loader
        .ensure_checked(&pkg)
        .ok_or_else(|| DefinitionError::NoPackage(file.to_path_buf()))?;

    let has_errors = node
        .errors()
        .iter()
        .any(|e| e.file == file && e.kind != ErrorKind::Validate);
    if has_errors {
        return Err(DefinitionError::FileHasErrors(file.to_path_buf()));
    }
    let index = node
        .file_index(file)
        .ok_or_else(|| DefinitionError::FileNotFound(file.to_path_buf()))?;
    let parsed = &node.parsed()[index];
    let Some(offset) = parsed.index.offset_at(position) else {
        return Ok(Vec::new());
    };

    match find_target(&parsed.syntax(), offset) {
        Target::Import(spec) => goto_import(loader, &spec),
        Target::Reference(reference) => {
            let Some(tv) = node.types(index).and_then(|t| t.get(&reference.text_range())) else {
                return Ok(Vec::new());
            };
            if !tv.is_type() {
                return Ok(Vec::new());
            }
            match tv.ty.clone() {
                Ty::Named(named) => goto_type(loader, &pkg, &named),
                _ => Err(DefinitionError::InvalidTarget),
            }
        }
        Target::Wrapper => Err(DefinitionError::InvalidTarget),
        Target::Nothing => Ok(Vec::new()),
    }
}

fn contains(node: &SyntaxNode, offset: TextSize) -> bool {
    let range = node.text_range();
    range.start() <= offset && offset <= range.end()
}

fn find_target(root: &SyntaxNode, offset: TextSize) -> Target {
    let mut in_wrapper = false;
    let mut current = root.clone();
    'descend: loop {
        for child in current.children() {
            if !contains(&child, offset) {
                continue;
            }
            match child.kind() {
                SyntaxKind::IMPORT_SPEC => {
                    return ImportSpec::cast(child).map_or(Target::Nothing, Target::Import);
                }
                SyntaxKind::NAME | SyntaxKind::NAME_REF | SyntaxKind::SELECTOR => {
                    return Target::Reference(child);
                }
                SyntaxKind::SLICE_TYPE
                | SyntaxKind::MAP_TYPE
                | SyntaxKind::CHAN_TYPE
                | SyntaxKind::FUNC_TYPE
                | SyntaxKind::METHOD => {
                    in_wrapper = true;
                    current = child;
                    continue 'descend;
                }
                SyntaxKind::IMPORT_DECL
                | SyntaxKind::TYPE_DECL
                | SyntaxKind::TYPE_SPEC
                | SyntaxKind::CONST_DECL
                | SyntaxKind::STRUCT_TYPE
                | SyntaxKind::INTERFACE_TYPE
                | SyntaxKind::FIELD_LIST
                | SyntaxKind::FIELD
                | SyntaxKind::PARAM_LIST
                | SyntaxKind::RESULT_LIST
                | SyntaxKind::POINTER_TYPE => {
                    current = child;
                    continue 'descend;
                }
                // opaque
                _ => {}
            }
        }
        break;
    }
    if in_wrapper { Target::Wrapper } else { Target::Nothing }
}

fn goto_import(loader: &mut Loader, spec: &ImportSpec) -> Result<Vec<Location>, DefinitionError> {
    let Some(path) = spec.path() else {
        return Ok(Vec::new());
    };
    let packages = loader.load(&path).map_err(|source| DefinitionError::Load {
        path: path.clone(),
        source,
    })?;
    match packages.as_slice() {
        [] => Err(DefinitionError::EmptyPackage(path)),
        [pkg] => Ok(loader
            .package(pkg)
            .map(|node| {
                node.files
                    .iter()
                    .map(|file| Location::new(file.clone(), Span::default()))
                    .collect()
            })
            .unwrap_or_default()),
        many => Err(DefinitionError::Load {
            path: path.clone(),
            source: LoadError::PackageCount {
                pattern: path,
                count: many.len(),
            },
        }),
    }
}

fn goto_type(
    loader: &mut Loader,
    current: &str,
    named: &NamedRef,
) -> Result<Vec<Location>, DefinitionError> {
    let pkg = if named.package == current {
        named.package.clone()
    } else {
        if loader.host().is_std(&named.package) {
            return Err(DefinitionError::InvalidTarget);
        }
        loader
            .load_one(&named.package)
            .map_err(|source| DefinitionError::Load {
                path: named.package.to_string(),
                source,
            })?
    };
    let node = loader
        .ensure_checked(&pkg)
        .ok_or(DefinitionError::InvalidTarget)?;
    declaration(node, &named.name)
        .map(|location| vec![location])
        .ok_or(DefinitionError::InvalidTarget)
}

/// Zero-width location at the name of the type spec declaring `name`
fn declaration(node: &PackageNode, name: &str) -> Option<Location> {
    node.parsed().iter().find_map(|file| {
        let spec_name = file
            .syntax()
            .descendants()
            .filter_map(TypeSpec::cast)
            .filter_map(|spec| spec.name())
            .find(|n| n.text() == name)?;
        let start = file.index.position(spec_name.range().start());
        Some(Location::new(file.path.clone(), Span::point(start)))
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::project::normalize;

    const API: &str = "package api\n\nimport \"example.com/m/common\"\n\n// Thing is a thing.\ntype Thing struct {\n\tID     common.ID `pb:\"1\"`\n\tName   string    `pb:\"2\"`\n\tTags   []Tag     `pb:\"3\"`\n\tParent *Thing    `pb:\"4\"`\n}\n\ntype Tag string\n";
    const COMMON: &str = "package common\n\ntype ID string\n";

    fn setup() -> (TempDir, Loader, PathBuf) {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("go.mod"), "module example.com/m\n").unwrap();
        for (rel, text) in [("api/api.gunk", API), ("common/common.gunk", COMMON), ("common/more.gunk", "package common\n")] {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        let mut loader = Loader::discover(tmp.path()).unwrap();
        let file = normalize(&tmp.path().join("api/api.gunk"));
        loader.add_file(&file, API.to_string()).unwrap();
        (tmp, loader, file)
    }

    fn goto(loader: &mut Loader, file: &Path, line: u32, character: u32) -> Result<Vec<Location>, DefinitionError> {
        goto_definition(loader, file, Position::new(line, character))
    }

    #[test]
    fn test_import_path_lists_every_file() {
        let (tmp, mut loader, file) = setup();
        let locations = goto(&mut loader, &file, 2, 12).unwrap();
        let files: Vec<_> = locations.iter().map(|l| l.file.clone()).collect();
        assert_eq!(
            files,
            vec![
                normalize(&tmp.path().join("common/common.gunk")),
                normalize(&tmp.path().join("common/more.gunk")),
            ]
        );
    }

    #[test]
    fn test_named_type_in_other_package() {
        let (tmp, mut loader, file) = setup();
        let locations = goto(&mut loader, &file, 6, 16).unwrap();
        assert_eq!(
            locations,
            vec![Location::new(
                normalize(&tmp.path().join("common/common.gunk")),
                Span::from_coords(2, 5, 2, 5),
            )]
        );
    }

    #[test]
    fn test_named_type_in_same_package() {
        let (_tmp, mut loader, file) = setup();
        let locations = goto(&mut loader, &file, 8, 11).unwrap();
        assert_eq!(locations, vec![Location::new(file.clone(), Span::from_coords(12, 5, 12, 5))]);
    }

    #[test]
    fn test_pointer_element_is_navigable() {
        let (_tmp, mut loader, file) = setup();
        let locations = goto(&mut loader, &file, 9, 10).unwrap();
        assert_eq!(locations, vec![Location::new(file.clone(), Span::from_coords(5, 5, 5, 5))]);
    }

    #[test]
    fn test_basic_type_is_invalid_target() {
        let (_tmp, mut loader, file) = setup();
        let err = goto(&mut loader, &file, 7, 9).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidTarget));
        assert_eq!(err.to_string(), "can only go to definition on struct or enum types");
    }

    #[test]
    fn test_wrapper_syntax_is_invalid_target() {
        let (_tmp, mut loader, file) = setup();
        let err = goto(&mut loader, &file, 8, 8).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidTarget));
    }

    #[test]
    fn test_no_target() {
        let (_tmp, mut loader, file) = setup();
        assert!(goto(&mut loader, &file, 4, 5).unwrap().is_empty());
        assert!(goto(&mut loader, &file, 0, 3).unwrap().is_empty());
        // the declared name itself
        assert!(goto(&mut loader, &file, 5, 6).unwrap().is_empty());
    }

    #[test]
    fn test_file_with_errors_is_refused() {
        let (_tmp, mut loader, file) = setup();
        loader
            .update_file(&file, "package api\n\ntype T Missing\n".to_string())
            .unwrap();
        loader.errors("example.com/m/api");
        let err = goto(&mut loader, &file, 2, 8).unwrap_err();
        assert!(matches!(err, DefinitionError::FileHasErrors(_)));
    }
}
