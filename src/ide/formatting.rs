//! Whole-document formatting.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::TextEdit;
use crate::base::{Position, Span};
use crate::hir::ErrorKind;
use crate::loader::{LoadError, Loader};
use crate::syntax::{FormatConfig, RewriteError, format_file};

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("could not load package: {0}")]
    Load(#[from] LoadError),

    #[error("{} is not inside a directory", .0.display())]
    NoParent(PathBuf),

    #[error("file {} has errors", .0.display())]
    FileHasErrors(PathBuf),

    #[error("could not find file {}", .0.display())]
    FileNotFound(PathBuf),

    /// The formatter refused the file; `at` is one-based
    #[error("could not format file: {}:{}:{}: {source}", .file.display(), .at.0, .at.1)]
    Rewrite {
        file: PathBuf,
        at: (u32, u32),
        #[source]
        source: RewriteError,
    },
}

/// Format `file` as held by the loader. No edits are returned when the
/// file is already canonical.
pub fn format_document(
    loader: &mut Loader,
    file: &Path,
    config: &FormatConfig,
) -> Result<Vec<TextEdit>, FormatError> {
    let dir = file
        .parent()
        .ok_or_else(|| FormatError::NoParent(file.to_path_buf()))?;
    let pkg = loader.load_one(&dir.to_string_lossy())?;
    let node = loader
        .ensure_checked(&pkg)
        .ok_or_else(|| FormatError::FileNotFound(file.to_path_buf()))?;

    let has_errors = node
        .errors()
        .iter()
        .any(|e| e.file == file && e.kind != ErrorKind::Validate);
    if has_errors {
        return Err(FormatError::FileHasErrors(file.to_path_buf()));
    }
    let parsed = node
        .parsed_file(file)
        .ok_or_else(|| FormatError::FileNotFound(file.to_path_buf()))?;
    let syntax = parsed
        .source()
        .ok_or_else(|| FormatError::FileNotFound(file.to_path_buf()))?;

    let formatted = format_file(&syntax, config).map_err(|source| FormatError::Rewrite {
        file: file.to_path_buf(),
        at: parsed.index.line_col(source.range().start()).one_based(),
        source,
    })?;
    let text = parsed.text();
    if formatted == text {
        return Ok(Vec::new());
    }
    tracing::debug!(file = %file.display(), "formatted");
    let lines = text.split('\n').count() as u32;
    Ok(vec![TextEdit {
        range: Span::new(Position::new(0, 0), Position::new(lines + 1, 0)),
        new_text: formatted,
    }])
}
