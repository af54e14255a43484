//! Canonical formatter for Gunk
//!
//! Rewrites one parsed file: `+gunk` tags in doc comments are normalized,
//! struct fields without a `pb` sequence number get one, and the whole file
//! is re-printed in canonical layout. Comments are preserved; a file whose
//! comments cannot all be carried over is rejected rather than rewritten.

mod options;
mod printer;
mod sequence;

use rowan::NodeOrToken;
use text_size::TextRange;
use thiserror::Error;

use crate::parser::{AstNode, SourceFile, StructType, SyntaxKind};

pub use options::{DEFAULT_INITIALISMS, FormatConfig};
pub use printer::print_expr;
pub use sequence::{Assignments, assign as assign_sequences};

/// Reasons a file cannot be rewritten
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("struct field tag for pb was empty, please remove or add sequence number")]
    EmptySequence { at: TextRange },

    #[error("struct field tag for pb contains a non-number {value:?}")]
    InvalidSequence { at: TextRange, value: String },

    #[error("invalid gunk tag: {message}")]
    MalformedTag { at: TextRange, message: String },

    #[error("file has syntax errors")]
    Syntax { at: TextRange },

    #[error("comment cannot be kept in place")]
    DroppedComment { at: TextRange },
}

impl RewriteError {
    /// Where in the file the problem is
    pub fn range(&self) -> TextRange {
        match self {
            Self::EmptySequence { at }
            | Self::InvalidSequence { at, .. }
            | Self::MalformedTag { at, .. }
            | Self::Syntax { at }
            | Self::DroppedComment { at } => *at,
        }
    }
}

/// Format a parsed file into canonical text
pub fn format_file(file: &SourceFile, config: &FormatConfig) -> Result<String, RewriteError> {
    let root = file.syntax();
    if let Some(error) = root.descendants().find(|n| n.kind() == SyntaxKind::ERROR) {
        return Err(RewriteError::Syntax {
            at: error.text_range(),
        });
    }

    let mut sequences = Assignments::default();
    for st in root.descendants().filter_map(StructType::cast) {
        sequence::assign(&st, &mut sequences)?;
    }

    let mut printer = printer::Printer::new(config, &sequences);
    let text = printer.print_file(file)?;

    let comments: Vec<_> = root
        .descendants_with_tokens()
        .filter_map(NodeOrToken::into_token)
        .filter(|t| t.kind().is_comment())
        .collect();
    if printer.comments_printed() != comments.len() {
        let at = comments
            .first()
            .map(|t| t.text_range())
            .unwrap_or_else(|| root.text_range());
        tracing::debug!(
            expected = comments.len(),
            printed = printer.comments_printed(),
            "formatter would drop comments"
        );
        return Err(RewriteError::DroppedComment { at });
    }
    Ok(text)
}
