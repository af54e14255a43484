//! Style lints over a checked package.
//!
//! Only `commentstart` exists: declared types, single-name struct fields
//! and interface methods should carry a doc comment that starts with their
//! name.

use rowan::NodeOrToken;

use super::FileDiagnostics;
use crate::base::{LineIndex, TextRange, TextSize};
use crate::hir::Diagnostic;
use crate::loader::PackageNode;
use crate::parser::{AstNode, Doc, Field, Method, Name, SyntaxNode, TypeSpec};
use crate::syntax::doc_text;

pub const COMMENT_START: &str = "commentstart";

/// Lint warnings of every parsed file of a package. Files without
/// warnings have no entry.
pub fn lint_package(node: &PackageNode) -> FileDiagnostics {
    let mut diagnostics = FileDiagnostics::new();
    for file in node.parsed() {
        let warnings = comment_start(&file.syntax(), &file.index);
        if !warnings.is_empty() {
            diagnostics.insert(file.path.clone(), warnings);
        }
    }
    diagnostics
}

fn comment_start(root: &SyntaxNode, index: &LineIndex) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for node in root.descendants() {
        let documented = if let Some(spec) = TypeSpec::cast(node.clone()) {
            spec.name().map(|name| (name, spec.doc()))
        } else if let Some(field) = Field::cast(node.clone()) {
            let mut names = field.names();
            match (names.next(), names.next()) {
                (Some(name), None) => Some((name, field.doc())),
                _ => None,
            }
        } else if let Some(method) = Method::cast(node) {
            method.name().map(|name| (name, method.doc()))
        } else {
            None
        };
        if let Some((name, doc)) = documented {
            out.extend(check(&name, doc.as_ref(), index));
        }
    }
    out
}

fn check(name: &Name, doc: Option<&Doc>, index: &LineIndex) -> Option<Diagnostic> {
    let prefix = format!("{} ", name.text());
    let text = doc.map(doc_text).unwrap_or_default();
    if text.starts_with(&prefix) {
        return None;
    }
    let (range, message) = match doc.and_then(first_word) {
        Some(range) if !text.is_empty() => (range, format!("comment should start with '{prefix}'")),
        _ => (name.range(), "missing comment".to_string()),
    };
    Some(Diagnostic::warning(index.span(range), message).with_code(COMMENT_START))
}

/// From the start of the first comment to the end of its first word
fn first_word(doc: &Doc) -> Option<TextRange> {
    let token = doc
        .syntax()
        .children_with_tokens()
        .filter_map(NodeOrToken::into_token)
        .find(|t| t.kind().is_comment())?;
    let range = token.text_range();
    let text = token.text();
    let body = text.get(2..)?;
    let word_start = body.len() - body.trim_start().len();
    let end = match body[word_start..].find(char::is_whitespace) {
        Some(len) => range.start() + TextSize::new((2 + word_start + len) as u32),
        None => range.end(),
    };
    Some(TextRange::new(range.start(), end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Span;
    use crate::hir::Severity;
    use crate::parser::parse;

    fn lint(text: &str) -> Vec<Diagnostic> {
        comment_start(&parse(text).syntax(), &LineIndex::new(text))
    }

    #[test]
    fn test_documented_items_pass() {
        let text = "package a\n\n// T is a thing.\ntype T struct {\n\t// A is a field.\n\tA int\n}\n\n// S serves.\ntype S interface {\n\t// Get gets.\n\tGet()\n}\n";
        assert!(lint(text).is_empty());
    }

    #[test]
    fn test_missing_comment_marks_the_name() {
        let diagnostics = lint("package a\n\ntype Thing int\n");
        assert_eq!(diagnostics.len(), 1);
        let d = &diagnostics[0];
        assert_eq!(d.message, "missing comment");
        assert_eq!(d.code, "commentstart");
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.range, Span::from_coords(2, 5, 2, 10));
    }

    #[test]
    fn test_wrong_start_marks_the_first_word() {
        let diagnostics = lint("package a\n\n// A thing.\ntype Thing int\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "comment should start with 'Thing '");
        assert_eq!(diagnostics[0].range, Span::from_coords(2, 0, 2, 4));
    }

    #[test]
    fn test_multi_name_fields_are_skipped() {
        let text = "package a\n\n// T is a thing.\ntype T struct {\n\tA, B int\n\tC int\n}\n";
        let messages: Vec<_> = lint(text).into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["missing comment".to_string()]);
    }

    #[test]
    fn test_methods_are_linted() {
        let text = "package a\n\n// S serves.\ntype S interface {\n\t// Fetch gets.\n\tGet()\n}\n";
        let diagnostics = lint(text);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "comment should start with 'Get '");
    }
}
