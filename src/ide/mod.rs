//! IDE features: editor requests answered from the package graph.
//!
//! Each function corresponds to one editor request and works on a
//! [`Loader`](crate::loader::Loader). Results use our own types; the
//! server converts them at the protocol boundary.

mod formatting;
mod goto;
mod lint;

use std::path::PathBuf;

use serde::Serialize;

use crate::base::Span;

pub use crate::loader::FileDiagnostics;
pub use formatting::{FormatError, format_document};
pub use goto::{DefinitionError, goto_definition};
pub use lint::{COMMENT_START, lint_package};

/// A place in a file
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: PathBuf,
    pub range: Span,
}

impl Location {
    pub fn new(file: PathBuf, range: Span) -> Self {
        Self { file, range }
    }
}

/// A replacement of the text in `range`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Span,
    pub new_text: String,
}
