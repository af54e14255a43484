//! Canonical printer for Gunk source files.
//!
//! Items are printed one per line with tab indentation. Runs of rows are
//! aligned in columns (names, types, tags, trailing comments) until a blank
//! line, a comment, a doc comment or a multi-line row ends the run. At most
//! one blank line is kept between items.

use rowan::NodeOrToken;

use super::options::FormatConfig;
use super::sequence::{Assignments, numbered_tag};
use super::RewriteError;
use crate::base::TAG_MARKER;
use crate::parser::{
    AstNode, ConstDecl, ConstSpec, Doc, Element, ElementValue, Expr, Field, FieldTag, ImportDecl,
    ImportSpec, InterfaceType, LitBody, Method, PackageClause, ParamList, ResultList, SourceFile,
    StructType, SyntaxKind, SyntaxNode, SyntaxToken, Trailing, Type, TypeDecl, TypeSpec,
};
use crate::syntax::tags::{parse_tags, split_doc};

const FILE_INDENT: &str = "\t";
/// Tags live inside `//` comments, so they are indented with spaces
const TAG_INDENT: &str = "        ";

/// One line-level entry inside a block
enum Entry {
    Comment {
        blank_before: bool,
        text: String,
    },
    Row {
        blank_before: bool,
        doc: Vec<String>,
        cells: Vec<String>,
    },
}

pub(super) struct Printer<'a> {
    config: &'a FormatConfig,
    sequences: &'a Assignments,
    /// Source comments carried into the output so far
    comments: usize,
}

impl<'a> Printer<'a> {
    pub(super) fn new(config: &'a FormatConfig, sequences: &'a Assignments) -> Self {
        Self {
            config,
            sequences,
            comments: 0,
        }
    }

    pub(super) fn comments_printed(&self) -> usize {
        self.comments
    }

    // =========================================================================
    // File level
    // =========================================================================

    pub(super) fn print_file(&mut self, file: &SourceFile) -> Result<String, RewriteError> {
        let mut out = String::new();
        let mut newlines = 0usize;
        let mut first = true;

        for element in file.syntax().children_with_tokens() {
            let block = match element {
                NodeOrToken::Token(token) => {
                    match token.kind() {
                        SyntaxKind::WHITESPACE => newlines += count_newlines(token.text()),
                        kind if kind.is_comment() => {
                            self.comments += 1;
                            push_block(&mut out, first, newlines, comment_text(token.text()));
                            first = false;
                            newlines = 0;
                        }
                        _ => {}
                    }
                    continue;
                }
                NodeOrToken::Node(node) => match node.kind() {
                    SyntaxKind::PACKAGE_CLAUSE => PackageClause::cast(node)
                        .map(|it| self.package_clause(&it))
                        .transpose()?,
                    SyntaxKind::IMPORT_DECL => ImportDecl::cast(node)
                        .map(|it| self.import_decl(&it))
                        .transpose()?,
                    SyntaxKind::TYPE_DECL => TypeDecl::cast(node)
                        .map(|it| self.type_decl(&it))
                        .transpose()?,
                    SyntaxKind::CONST_DECL => ConstDecl::cast(node)
                        .map(|it| self.const_decl(&it))
                        .transpose()?,
                    _ => None,
                },
            };
            if let Some(block) = block {
                push_block(&mut out, first, newlines, block);
                first = false;
                newlines = 0;
            }
        }
        out.push('\n');
        Ok(out)
    }

    fn package_clause(&mut self, clause: &PackageClause) -> Result<String, RewriteError> {
        let mut lines = self.doc(clause.doc())?;
        let name = clause.name().map(|n| n.text()).unwrap_or_default();
        lines.push(self.with_trailing(format!("package {name}"), trailing_of(clause.syntax())));
        Ok(lines.join("\n"))
    }

    fn import_decl(&mut self, decl: &ImportDecl) -> Result<String, RewriteError> {
        let mut lines = self.doc(decl.doc())?;
        if decl.is_grouped() {
            let entries = self.entries(decl.syntax(), |p, node| {
                let spec = ImportSpec::cast(node.clone())?;
                Some(p.import_row(&spec))
            })?;
            lines.push(self.group("import", entries, trailing_of(decl.syntax())));
        } else if let Some(spec) = decl.specs().next() {
            let text = format!("import {}", import_text(&spec));
            let trailing = trailing_of(spec.syntax()).or_else(|| trailing_of(decl.syntax()));
            lines.push(self.with_trailing(text, trailing));
        }
        Ok(lines.join("\n"))
    }

    fn import_row(&mut self, spec: &ImportSpec) -> Result<Entry, RewriteError> {
        let doc = self.doc(spec.doc())?;
        let mut cells = vec![import_text(spec)];
        cells.extend(self.trailing(spec.trailing()));
        Ok(Entry::Row {
            blank_before: false,
            doc,
            cells,
        })
    }

    fn type_decl(&mut self, decl: &TypeDecl) -> Result<String, RewriteError> {
        let mut lines = self.doc(decl.doc())?;
        if decl.is_grouped() {
            let entries = self.entries(decl.syntax(), |p, node| {
                let spec = TypeSpec::cast(node.clone())?;
                Some(p.type_row(&spec, 1))
            })?;
            lines.push(self.group("type", entries, decl.trailing()));
        } else if let Some(spec) = decl.specs().next() {
            let name = spec.name().map(|n| n.text()).unwrap_or_default();
            let ty = self.ty(spec.ty(), 0)?;
            let trailing = spec.trailing().or_else(|| decl.trailing());
            lines.push(self.with_trailing(format!("type {name} {ty}"), trailing));
        }
        Ok(lines.join("\n"))
    }

    fn type_row(&mut self, spec: &TypeSpec, indent: usize) -> Result<Entry, RewriteError> {
        let doc = self.doc(spec.syntax().children().find_map(Doc::cast))?;
        let mut cells = vec![
            spec.name().map(|n| n.text()).unwrap_or_default(),
            self.ty(spec.ty(), indent)?,
        ];
        cells.extend(self.trailing(spec.trailing()));
        Ok(Entry::Row {
            blank_before: false,
            doc,
            cells,
        })
    }

    fn const_decl(&mut self, decl: &ConstDecl) -> Result<String, RewriteError> {
        let mut lines = self.doc(decl.doc())?;
        if decl.is_grouped() {
            let entries = self.entries(decl.syntax(), |p, node| {
                let spec = ConstSpec::cast(node.clone())?;
                Some(p.const_row(&spec, 1))
            })?;
            lines.push(self.group("const", entries, decl.trailing()));
        } else if let Some(spec) = decl.specs().next() {
            let Entry::Row { cells, .. } = self.const_row(&spec, 0)? else {
                return Ok(lines.join("\n"));
            };
            let trailing = decl.trailing().map(|t| self.trailing_text(&t));
            let mut text = format!("const {}", cells.join(" "));
            if let Some(trailing) = trailing {
                text.push(' ');
                text.push_str(&trailing);
            }
            lines.push(text);
        }
        Ok(lines.join("\n"))
    }

    fn const_row(&mut self, spec: &ConstSpec, indent: usize) -> Result<Entry, RewriteError> {
        let doc = self.doc(spec.syntax().children().find_map(Doc::cast))?;
        let mut cells = vec![spec.name().map(|n| n.text()).unwrap_or_default()];
        if let Some(ty) = spec.ty() {
            cells.push(self.ty(Some(ty), indent)?);
        }
        if let Some(value) = spec.value() {
            cells.push(format!("= {}", print_expr(&value, indent, FILE_INDENT)));
        }
        cells.extend(self.trailing(spec.trailing()));
        Ok(Entry::Row {
            blank_before: false,
            doc,
            cells,
        })
    }

    /// `kw (` entries `)`
    fn group(&mut self, keyword: &str, entries: Vec<Entry>, trailing: Option<Trailing>) -> String {
        let closing = self.with_trailing(")".to_string(), trailing);
        if entries.is_empty() {
            return format!("{keyword} (\n{closing}");
        }
        format!("{keyword} (\n{}\n{closing}", render_entries(entries, 1))
    }

    // =========================================================================
    // Blocks of entries
    // =========================================================================

    /// Collect the entries of a braced or parenthesised list, keeping
    /// floating comments and blank lines between items.
    fn entries(
        &mut self,
        container: &SyntaxNode,
        mut row: impl FnMut(&mut Self, &SyntaxNode) -> Option<Result<Entry, RewriteError>>,
    ) -> Result<Vec<Entry>, RewriteError> {
        let mut entries = Vec::new();
        let mut newlines = 0usize;
        let mut inside = false;
        for element in container.children_with_tokens() {
            match element {
                NodeOrToken::Token(token) => match token.kind() {
                    SyntaxKind::L_BRACE | SyntaxKind::L_PAREN => {
                        inside = true;
                        newlines = 0;
                    }
                    SyntaxKind::WHITESPACE => newlines += count_newlines(token.text()),
                    kind if kind.is_comment() && inside => {
                        self.comments += 1;
                        entries.push(Entry::Comment {
                            blank_before: !entries.is_empty() && newlines >= 2,
                            text: comment_text(token.text()),
                        });
                        newlines = 0;
                    }
                    _ => {}
                },
                NodeOrToken::Node(node) => {
                    if let Some(entry) = row(self, &node) {
                        let mut entry = entry?;
                        if let Entry::Row { blank_before, .. } = &mut entry {
                            *blank_before = !entries.is_empty() && newlines >= 2;
                        }
                        entries.push(entry);
                        newlines = 0;
                    }
                }
            }
        }
        Ok(entries)
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn ty(&mut self, ty: Option<Type>, indent: usize) -> Result<String, RewriteError> {
        let Some(ty) = ty else {
            return Ok(String::new());
        };
        Ok(match ty {
            Type::Name(name) => name.text(),
            Type::Selector(sel) => selector_text(sel.qualifier(), sel.name()),
            Type::Slice(slice) => format!("[]{}", self.ty(slice.elem(), indent)?),
            Type::Map(map) => {
                let key = self.ty(map.key(), indent)?;
                let value = self.ty(map.value(), indent)?;
                format!("map[{key}]{value}")
            }
            Type::Pointer(ptr) => format!("*{}", self.ty(ptr.elem(), indent)?),
            Type::Chan(chan) => format!("chan {}", self.ty(chan.elem(), indent)?),
            Type::Func(func) => {
                format!("func{}", self.signature(func.params(), func.results(), indent)?)
            }
            Type::Struct(st) => self.struct_type(&st, indent)?,
            Type::Interface(it) => self.interface_type(&it, indent)?,
        })
    }

    fn struct_type(&mut self, st: &StructType, indent: usize) -> Result<String, RewriteError> {
        let Some(list) = st.field_list() else {
            return Ok("struct{}".to_string());
        };
        let entries = self.entries(list.syntax(), |p, node| {
            let field = Field::cast(node.clone())?;
            Some(p.field_row(&field, indent + 1))
        })?;
        Ok(braced("struct", entries, indent))
    }

    fn field_row(&mut self, field: &Field, indent: usize) -> Result<Entry, RewriteError> {
        let doc = self.doc(field.doc())?;
        let mut cells = Vec::new();
        if !field.is_embedded() {
            let names: Vec<String> = field
                .names()
                .map(|n| self.config.fix_name(&n.text()))
                .collect();
            cells.push(names.join(", "));
        }
        cells.push(self.ty(field.ty(), indent)?);
        if let Some(tag) = self.field_tag(field) {
            cells.push(tag);
        }
        cells.extend(self.trailing(field.trailing()));
        Ok(Entry::Row {
            blank_before: false,
            doc,
            cells,
        })
    }

    fn field_tag(&self, field: &Field) -> Option<String> {
        let tag = field.tag();
        match self.sequences.get(&field.range()) {
            Some(&n) => Some(numbered_tag(n, tag.and_then(|t| t.value()).as_deref())),
            None => tag.as_ref().and_then(FieldTag::literal).map(|t| t.text().to_string()),
        }
    }

    fn interface_type(&mut self, it: &InterfaceType, indent: usize) -> Result<String, RewriteError> {
        let Some(list) = it.field_list() else {
            return Ok("interface{}".to_string());
        };
        let entries = self.entries(list.syntax(), |p, node| {
            let method = Method::cast(node.clone())?;
            Some(p.method_row(&method, indent + 1))
        })?;
        Ok(braced("interface", entries, indent))
    }

    fn method_row(&mut self, method: &Method, indent: usize) -> Result<Entry, RewriteError> {
        let doc = self.doc(method.doc())?;
        let name = method.name().map(|n| n.text()).unwrap_or_default();
        let signature = self.signature(method.params(), method.results(), indent)?;
        let mut cells = vec![format!("{name}{signature}")];
        cells.extend(self.trailing(method.trailing()));
        Ok(Entry::Row {
            blank_before: false,
            doc,
            cells,
        })
    }

    fn signature(
        &mut self,
        params: Option<ParamList>,
        results: Option<ResultList>,
        indent: usize,
    ) -> Result<String, RewriteError> {
        let params = match params {
            Some(params) => self.param_items(params.syntax(), indent)?,
            None => Vec::new(),
        };
        let mut out = format!("({})", params.join(", "));
        if let Some(results) = results {
            let items = self.param_items(results.syntax(), indent)?;
            if results.is_parenthesized() {
                out.push_str(&format!(" ({})", items.join(", ")));
            } else if let Some(item) = items.first() {
                out.push(' ');
                out.push_str(item);
            }
        }
        Ok(out)
    }

    /// Parameter entries, each an optional name followed by a type
    fn param_items(&mut self, list: &SyntaxNode, indent: usize) -> Result<Vec<String>, RewriteError> {
        let mut items = Vec::new();
        let mut name = None;
        for node in list.children() {
            if node.kind() == SyntaxKind::NAME {
                name = Some(node.text().to_string());
            } else if let Some(ty) = Type::cast(node) {
                let ty = self.ty(Some(ty), indent)?;
                items.push(match name.take() {
                    Some(name) => format!("{name} {ty}"),
                    None => ty,
                });
            }
        }
        Ok(items)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Doc comment lines. Docs carrying tags are rebuilt: prose first, a
    /// blank comment line, then each tag in canonical form.
    fn doc(&mut self, doc: Option<Doc>) -> Result<Vec<String>, RewriteError> {
        let Some(doc) = doc else {
            return Ok(Vec::new());
        };
        let tokens: Vec<_> = doc
            .syntax()
            .children_with_tokens()
            .filter_map(NodeOrToken::into_token)
            .filter(|t| t.kind().is_comment())
            .collect();
        self.comments += tokens.len();

        let split = split_doc(&doc);
        if split.tags.is_empty() {
            return Ok(tokens.iter().map(|t| comment_text(t.text())).collect());
        }

        let mut text: Vec<String> = split.prose.clone();
        if !text.is_empty() {
            text.push(String::new());
        }
        for tag in parse_tags(&split) {
            if let Some(error) = tag.errors().into_iter().next() {
                return Err(RewriteError::MalformedTag {
                    at: error.range,
                    message: error.message,
                });
            }
            let expr = tag.root().and_then(|root| root.expr());
            let printed = expr
                .map(|e| print_expr(&e, 0, TAG_INDENT))
                .unwrap_or_default();
            let mut lines = printed.split('\n');
            let first = lines.next().unwrap_or_default();
            text.push(format!("{TAG_MARKER} {first}"));
            text.extend(lines.map(str::to_string));
        }
        Ok(text
            .into_iter()
            .map(|line| {
                let line = line.trim_end();
                if line.is_empty() {
                    "//".to_string()
                } else {
                    format!("// {line}")
                }
            })
            .collect())
    }

    fn trailing(&mut self, trailing: Option<Trailing>) -> Option<String> {
        trailing.map(|t| self.trailing_text(&t))
    }

    fn trailing_text(&mut self, trailing: &Trailing) -> String {
        self.comments += 1;
        comment_text(&trailing.text())
    }

    fn with_trailing(&mut self, text: String, trailing: Option<Trailing>) -> String {
        match self.trailing(trailing) {
            Some(comment) => format!("{text} {comment}"),
            None => text,
        }
    }
}

fn trailing_of(node: &SyntaxNode) -> Option<Trailing> {
    node.children().find_map(Trailing::cast)
}

fn import_text(spec: &ImportSpec) -> String {
    let path = spec
        .path_literal()
        .and_then(|lit| lit.token())
        .map(|t| t.text().to_string())
        .unwrap_or_default();
    match spec.name() {
        Some(name) => format!("{} {path}", name.syntax().text()),
        None => path,
    }
}

fn selector_text(qualifier: Option<SyntaxToken>, name: Option<SyntaxToken>) -> String {
    let qualifier = qualifier.map(|t| t.text().to_string()).unwrap_or_default();
    let name = name.map(|t| t.text().to_string()).unwrap_or_default();
    format!("{qualifier}.{name}")
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

fn comment_text(text: &str) -> String {
    if text.starts_with("//") {
        text.trim_end().to_string()
    } else {
        text.to_string()
    }
}

fn push_block(out: &mut String, first: bool, newlines: usize, block: String) {
    if !first {
        out.push('\n');
        if newlines >= 2 {
            out.push('\n');
        }
    }
    out.push_str(&block);
}

fn braced(keyword: &str, entries: Vec<Entry>, indent: usize) -> String {
    if entries.is_empty() {
        return format!("{keyword}{{}}");
    }
    format!(
        "{keyword} {{\n{}\n{}}}",
        render_entries(entries, indent + 1),
        FILE_INDENT.repeat(indent)
    )
}

// =============================================================================
// Alignment
// =============================================================================

fn render_entries(entries: Vec<Entry>, indent: usize) -> String {
    let prefix = FILE_INDENT.repeat(indent);
    let mut lines: Vec<String> = Vec::new();
    let mut section: Vec<Vec<String>> = Vec::new();

    for entry in entries {
        match entry {
            Entry::Comment { blank_before, text } => {
                flush_section(&mut section, &prefix, &mut lines);
                if blank_before {
                    lines.push(String::new());
                }
                lines.push(format!("{prefix}{text}"));
            }
            Entry::Row {
                blank_before,
                doc,
                cells,
            } => {
                let multiline = cells.iter().any(|c| c.contains('\n'));
                if blank_before || !doc.is_empty() || multiline {
                    flush_section(&mut section, &prefix, &mut lines);
                }
                if blank_before {
                    lines.push(String::new());
                }
                lines.extend(doc.into_iter().map(|d| format!("{prefix}{d}")));
                if multiline {
                    lines.push(format!("{prefix}{}", cells.join(" ")));
                } else {
                    section.push(cells);
                }
            }
        }
    }
    flush_section(&mut section, &prefix, &mut lines);
    lines.join("\n")
}

/// Pad every cell that has another cell after it to the widest such cell
/// in its column.
fn flush_section(section: &mut Vec<Vec<String>>, prefix: &str, lines: &mut Vec<String>) {
    let columns = section.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            section
                .iter()
                .filter(|row| row.len() > col + 1)
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();
    for row in section.drain(..) {
        let mut line = prefix.to_string();
        for (col, cell) in row.iter().enumerate() {
            line.push_str(cell);
            if col + 1 < row.len() {
                let pad = widths[col] - cell.chars().count() + 1;
                line.push_str(&" ".repeat(pad));
            }
        }
        lines.push(line);
    }
}

// =============================================================================
// Expressions
// =============================================================================

/// Print an expression at the given depth, using `unit` per indent level
pub fn print_expr(expr: &Expr, indent: usize, unit: &str) -> String {
    match expr {
        Expr::Literal(lit) => lit.token().map(|t| t.text().to_string()).unwrap_or_default(),
        Expr::Name(name) => name.text(),
        Expr::Selector(sel) => selector_text(sel.qualifier(), sel.name()),
        Expr::Paren(paren) => {
            let inner = paren
                .expr()
                .map(|e| print_expr(&e, indent, unit))
                .unwrap_or_default();
            format!("({inner})")
        }
        Expr::Unary(unary) => {
            let op = unary.op().map(|t| t.text().to_string()).unwrap_or_default();
            let inner = unary
                .expr()
                .map(|e| print_expr(&e, indent, unit))
                .unwrap_or_default();
            format!("{op}{inner}")
        }
        Expr::Composite(lit) => {
            let ty = lit
                .ty()
                .map(|t| print_type_expr(t.syntax()))
                .unwrap_or_default();
            let body = lit
                .body()
                .map(|b| print_body(&b, indent, unit))
                .unwrap_or_else(|| "{}".to_string());
            format!("{ty}{body}")
        }
        Expr::Slice(slice) => print_type_expr(slice.syntax()),
        Expr::Map(map) => print_type_expr(map.syntax()),
    }
}

/// Types inside expressions are printed from their tokens
fn print_type_expr(node: &SyntaxNode) -> String {
    let mut out = String::new();
    for token in node
        .descendants_with_tokens()
        .filter_map(NodeOrToken::into_token)
        .filter(|t| !t.kind().is_trivia())
    {
        out.push_str(token.text());
        if token.kind() == SyntaxKind::CHAN_KW {
            out.push(' ');
        }
    }
    out
}

fn print_value(value: &ElementValue, indent: usize, unit: &str) -> String {
    match value {
        ElementValue::Body(body) => print_body(body, indent, unit),
        other => other
            .expr()
            .map(|e| print_expr(&e, indent, unit))
            .unwrap_or_default(),
    }
}

fn print_body(body: &LitBody, indent: usize, unit: &str) -> String {
    let elements: Vec<Element> = body.elements().collect();
    if elements.is_empty() {
        return "{}".to_string();
    }
    let multiline = body.syntax().text().contains_char('\n');
    if !multiline {
        let parts: Vec<String> = elements
            .iter()
            .map(|e| print_element(e, indent, unit).join(" "))
            .collect();
        return format!("{{{}}}", parts.join(", "));
    }

    // One element per line; keys of consecutive single-line keyed elements
    // are aligned.
    let inner = unit.repeat(indent + 1);
    let mut lines = Vec::new();
    let mut run: Vec<Vec<String>> = Vec::new();
    for element in &elements {
        let parts = print_element(element, indent + 1, unit);
        if parts.len() == 2 && !parts[1].contains('\n') {
            run.push(parts);
            continue;
        }
        flush_keyed(&mut run, &inner, &mut lines);
        lines.push(format!("{inner}{},", parts.join(" ")));
    }
    flush_keyed(&mut run, &inner, &mut lines);
    format!("{{\n{}\n{}}}", lines.join("\n"), unit.repeat(indent))
}

fn flush_keyed(run: &mut Vec<Vec<String>>, inner: &str, lines: &mut Vec<String>) {
    let width = run.iter().map(|p| p[0].chars().count()).max().unwrap_or(0);
    for parts in run.drain(..) {
        let pad = width - parts[0].chars().count() + 1;
        lines.push(format!("{inner}{}{}{},", parts[0], " ".repeat(pad), parts[1]));
    }
}

/// `["key:", "value"]` for keyed elements, `["value"]` otherwise
fn print_element(element: &Element, indent: usize, unit: &str) -> Vec<String> {
    match element {
        Element::Keyed(keyed) => {
            let key = keyed
                .key()
                .map(|k| print_value(&k, indent, unit))
                .unwrap_or_default();
            let value = keyed
                .value()
                .map(|v| print_value(&v, indent, unit))
                .unwrap_or_default();
            vec![format!("{key}:"), value]
        }
        Element::Positional(positional) => vec![positional
            .value()
            .map(|v| print_value(&v, indent, unit))
            .unwrap_or_default()],
    }
}
