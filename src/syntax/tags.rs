//! `+gunk` tag extraction from documentation comments.
//!
//! A doc comment is split into prose and tags. Each tag is an expression
//! written after a `+gunk ` marker; continuation lines belong to the tag
//! above them. The marker is blanked with spaces rather than removed so
//! columns inside the tag text line up with the file.

use rowan::NodeOrToken;
use text_size::{TextRange, TextSize};

use crate::base::TAG_MARKER;
use crate::parser::{AstNode, Doc, ExprRoot, Parse, SyntaxError, SyntaxKind, SyntaxNode, parse_expr};

/// One line of documentation with the comment markers stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocLine {
    pub text: String,
    /// Offset in the file where `text` begins
    pub origin: TextSize,
}

/// Lines of a doc comment with markers removed along with the first space
/// of each line comment.
pub fn doc_lines(doc: &Doc) -> Vec<DocLine> {
    let mut lines = Vec::new();
    for token in doc
        .syntax()
        .children_with_tokens()
        .filter_map(NodeOrToken::into_token)
    {
        let start = token.text_range().start();
        let text = token.text();
        match token.kind() {
            SyntaxKind::LINE_COMMENT => {
                let body = &text[2..];
                let (body, skip) = match body.strip_prefix(' ') {
                    Some(rest) => (rest, 3),
                    None => (body, 2),
                };
                lines.push(DocLine {
                    text: body.trim_end_matches('\r').to_string(),
                    origin: start + TextSize::new(skip),
                });
            }
            SyntaxKind::BLOCK_COMMENT => {
                let inner = text
                    .strip_prefix("/*")
                    .and_then(|t| t.strip_suffix("*/"))
                    .unwrap_or_default();
                let mut offset = start + TextSize::new(2);
                for line in inner.split('\n') {
                    lines.push(DocLine {
                        text: line.trim_end_matches('\r').to_string(),
                        origin: offset,
                    });
                    offset += TextSize::of(line) + TextSize::new(1);
                }
            }
            _ => {}
        }
    }
    lines
}

/// The plain text of a doc comment, with leading and trailing blank lines
/// dropped.
pub fn doc_text(doc: &Doc) -> String {
    let lines: Vec<String> = doc_lines(doc)
        .into_iter()
        .map(|l| l.text.trim_end().to_string())
        .collect();
    let first = lines.iter().position(|l| !l.is_empty());
    let last = lines.iter().rposition(|l| !l.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last].join("\n"),
        _ => String::new(),
    }
}

/// Source text of one tag and how to map it back into the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSource {
    /// Tag text, marker blanked, continuation lines joined with `\n`
    pub text: String,
    /// Index of the doc line holding the marker
    pub doc_line: usize,
    origins: Vec<TextSize>,
}

impl TagSource {
    /// Map an offset in the tag text to an offset in the file
    pub fn to_file(&self, offset: TextSize) -> TextSize {
        let offset = offset.min(TextSize::of(self.text.as_str()));
        let before = &self.text[..usize::from(offset)];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let col = TextSize::new((before.len() - line_start) as u32);
        self.origins
            .get(line)
            .or(self.origins.last())
            .map(|origin| *origin + col)
            .unwrap_or(col)
    }

    pub fn range_to_file(&self, range: TextRange) -> TextRange {
        TextRange::new(self.to_file(range.start()), self.to_file(range.end()))
    }
}

/// A doc comment split into prose and tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocSplit {
    /// Non-empty prose lines before the first tag, trimmed
    pub prose: Vec<String>,
    pub tags: Vec<TagSource>,
}

impl DocSplit {
    pub fn prose_text(&self) -> String {
        self.prose.join("\n")
    }
}

pub fn split_doc(doc: &Doc) -> DocSplit {
    split_lines(&doc_lines(doc))
}

fn split_lines(lines: &[DocLine]) -> DocSplit {
    let mut split = DocSplit::default();
    let marker = format!("{TAG_MARKER} ");
    for (i, line) in lines.iter().enumerate() {
        if line.text.starts_with(&marker) {
            let text = line
                .text
                .replacen(TAG_MARKER, &" ".repeat(TAG_MARKER.len()), 1);
            split.tags.push(TagSource {
                text,
                doc_line: i,
                origins: vec![line.origin],
            });
        } else if let Some(tag) = split.tags.last_mut() {
            tag.text.push('\n');
            tag.text.push_str(&line.text);
            tag.origins.push(line.origin);
        } else {
            let trimmed = line.text.trim();
            if !trimmed.is_empty() {
                split.prose.push(trimmed.to_string());
            }
        }
    }
    split
}

/// A tag parsed as an expression
#[derive(Debug, Clone)]
pub struct Tag {
    pub source: TagSource,
    pub parse: Parse,
}

impl Tag {
    pub fn root(&self) -> Option<ExprRoot> {
        ExprRoot::cast(self.parse.syntax())
    }

    /// Parse errors, positioned in the file
    pub fn errors(&self) -> Vec<SyntaxError> {
        self.parse
            .errors
            .iter()
            .map(|e| SyntaxError::new(e.message.clone(), self.source.range_to_file(e.range)))
            .collect()
    }
}

pub fn parse_tags(split: &DocSplit) -> Vec<Tag> {
    split
        .tags
        .iter()
        .map(|source| Tag {
            parse: parse_expr(&source.text),
            source: source.clone(),
        })
        .collect()
}

/// Tags of every doc comment under `root`, keyed by the range of the node
/// that owns the comment. Comments without tags are skipped.
pub fn collect_tags(root: &SyntaxNode) -> Vec<(TextRange, Vec<Tag>)> {
    root.descendants()
        .filter_map(Doc::cast)
        .filter_map(|doc| {
            let owner = doc.syntax().parent()?.text_range();
            let tags = parse_tags(&split_doc(&doc));
            (!tags.is_empty()).then_some((owner, tags))
        })
        .collect()
}
