//! Diagnostics: package analysis errors and their editor-facing form.
//!
//! Analysis errors are plain data recorded on a package. The checker
//! reports positions as raw offsets tagged with the coordinate space they
//! belong to; [`locate`] re-homes them onto the smallest syntax element
//! starting there and maps the result into file coordinates.

use std::path::PathBuf;

use rowan::NodeOrToken;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::base::{LineIndex, Span, TextRange, TextSize};
use crate::parser::SyntaxNode;
use crate::syntax::Tag;

/// Value of the `source` field of every published diagnostic
pub const SOURCE: &str = "gunkls";

// ============================================================================
// ANALYSIS ERRORS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unknown,
    /// Host package listing failed for the package
    List,
    Parse,
    Type,
    Validate,
}

impl ErrorKind {
    /// The diagnostic code for errors of this kind
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Unknown | ErrorKind::List => "error",
            ErrorKind::Parse => "parse error",
            ErrorKind::Type => "type error",
            ErrorKind::Validate => "validate error",
        }
    }
}

/// An error recorded on a package during parsing, checking or validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub file: PathBuf,
    pub span: Span,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, file: impl Into<PathBuf>, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            file: file.into(),
            span,
            message: message.into(),
        }
    }
}

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }

    pub fn from_lsp(value: u32) -> Option<Self> {
        match value {
            1 => Some(Severity::Error),
            2 => Some(Severity::Warning),
            3 => Some(Severity::Info),
            4 => Some(Severity::Hint),
            _ => None,
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.to_lsp())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u32::deserialize(deserializer)?;
        Severity::from_lsp(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid severity {value}")))
    }
}

/// A diagnostic in the shape the editor protocol expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Span,
    pub severity: Severity,
    pub code: String,
    pub source: String,
    pub message: String,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(range: Span, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            code: ErrorKind::Unknown.code().to_string(),
            source: SOURCE.to_string(),
            message: message.into(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(range: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(range, message)
        }
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }
}

impl From<&Error> for Diagnostic {
    fn from(error: &Error) -> Self {
        Diagnostic::error(error.span, error.message.clone()).with_code(error.kind.code())
    }
}

// ============================================================================
// CHECKER POSITIONS
// ============================================================================

/// The text a raw checker offset is relative to
#[derive(Clone, Debug)]
pub enum CoordSpace {
    /// The package file itself
    Source,
    /// The text of a tag extracted from a doc comment in the file
    Tag(Box<Tag>),
}

/// An error reported by the type checker, before positioning.
#[derive(Clone, Debug)]
pub struct RawError {
    /// Index of the file in the checked package
    pub file: usize,
    pub space: CoordSpace,
    pub at: TextSize,
    pub message: String,
}

/// Position a raw checker error in the file.
///
/// The range is that of the smallest syntax element starting at the
/// reported offset, in the tree of the error's coordinate space. When no
/// element starts there the raw offset is used as an empty range.
pub fn locate(error: &RawError, file_root: &SyntaxNode, index: &LineIndex) -> Span {
    let range = match &error.space {
        CoordSpace::Source => {
            element_at(file_root, error.at).unwrap_or_else(|| TextRange::empty(error.at))
        }
        CoordSpace::Tag(tag) => match element_at(&tag.parse.syntax(), error.at) {
            Some(range) => tag.source.range_to_file(range),
            None => TextRange::empty(tag.source.to_file(error.at)),
        },
    };
    index.span(range)
}

/// Range of the smallest non-trivia element that starts at `at`
pub fn element_at(root: &SyntaxNode, at: TextSize) -> Option<TextRange> {
    root.descendants_with_tokens()
        .filter(|element| match element {
            NodeOrToken::Node(_) => true,
            NodeOrToken::Token(token) => !token.kind().is_trivia(),
        })
        .map(|element| element.text_range())
        .filter(|range| range.start() == at && !range.is_empty())
        .min_by_key(|range| range.len())
}
