//! Recursive descent parser for Gunk
//!
//! Builds a rowan GreenNode tree from tokens.
//! Supports error recovery and produces a lossless CST. Newlines terminate
//! declarations, specs and fields the way Go's automatic semicolons do.

use super::lexer::{Lexer, Token};
use super::syntax_kind::SyntaxKind;
use rowan::{Checkpoint, GreenNode, GreenNodeBuilder, TextRange, TextSize};

/// Parse result containing the green tree and any errors
#[derive(Debug, Clone)]
pub struct Parse {
    pub green: GreenNode,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    /// Get the root syntax node
    pub fn syntax(&self) -> super::SyntaxNode {
        super::SyntaxNode::new_root(self.green.clone())
    }

    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Parse a Gunk source file into a CST
pub fn parse(input: &str) -> Parse {
    let tokens: Vec<_> = Lexer::new(input).collect();
    let mut parser = Parser::new(&tokens, input);
    parser.parse_source_file();
    parser.finish()
}

/// Parse a standalone expression, as found in a `+gunk` tag
pub fn parse_expr(input: &str) -> Parse {
    let tokens: Vec<_> = Lexer::new(input).collect();
    let mut parser = Parser::new(&tokens, input);
    parser.parse_expr_root();
    parser.finish()
}

/// The parser state
struct Parser<'a> {
    tokens: &'a [Token<'a>],
    input_len: TextSize,
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>], input: &str) -> Self {
        Self {
            tokens,
            input_len: TextSize::of(input),
            pos: 0,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
        }
    }

    fn finish(self) -> Parse {
        Parse {
            green: self.builder.finish(),
            errors: self.errors,
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    /// Index of the n-th significant (non-trivia) token from the cursor
    fn nth_index(&self, n: usize) -> usize {
        let mut idx = self.pos;
        let mut count = 0;
        while idx < self.tokens.len() {
            if !self.tokens[idx].kind.is_trivia() {
                if count == n {
                    return idx;
                }
                count += 1;
            }
            idx += 1;
        }
        self.tokens.len()
    }

    fn nth(&self, n: usize) -> SyntaxKind {
        self.tokens
            .get(self.nth_index(n))
            .map(|t| t.kind)
            .unwrap_or(SyntaxKind::ERROR)
    }

    fn peek(&self) -> SyntaxKind {
        self.nth(0)
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        !self.at_end() && self.peek() == kind
    }

    fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        !self.at_end() && kinds.contains(&self.peek())
    }

    fn at_end(&self) -> bool {
        self.nth_index(0) >= self.tokens.len()
    }

    /// Whether a line break separates the n-th significant token from the
    /// one before it. The end of input counts as a line break.
    fn newline_before_nth(&self, n: usize) -> bool {
        let target = self.nth_index(n);
        if target >= self.tokens.len() {
            return true;
        }
        let from = if n == 0 { self.pos } else { self.nth_index(n - 1) + 1 };
        self.tokens[from..target]
            .iter()
            .any(|t| t.kind == SyntaxKind::LINE_COMMENT || t.has_newline())
    }

    fn newline_before(&self) -> bool {
        self.newline_before_nth(0)
    }

    fn describe_current(&self) -> String {
        match self.tokens.get(self.nth_index(0)) {
            None => "EOF".to_string(),
            Some(t) if t.kind == SyntaxKind::IDENT || t.kind.is_literal() => {
                format!("{} {}", t.kind.describe(), t.text)
            }
            Some(t) if t.kind == SyntaxKind::ERROR => format!("'{}'", t.text),
            Some(t) => t.kind.describe().to_string(),
        }
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    fn bump_raw(&mut self) {
        if let Some(token) = self.tokens.get(self.pos) {
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    /// Consume leading trivia, then the next significant token
    fn bump(&mut self) {
        self.skip_trivia();
        self.bump_raw();
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error(format!("expected {}, found {}", kind.describe(), self.describe_current()));
            false
        }
    }

    fn skip_trivia(&mut self) {
        while self
            .tokens
            .get(self.pos)
            .map(|t| t.kind.is_trivia())
            .unwrap_or(false)
        {
            self.bump_raw();
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error(&mut self, message: impl Into<String>) {
        let range = self
            .tokens
            .get(self.nth_index(0))
            .map(|t| TextRange::at(t.offset, TextSize::of(t.text)))
            .unwrap_or_else(|| TextRange::empty(self.input_len));
        self.errors.push(SyntaxError::new(message, range));
    }

    fn error_recover(&mut self, message: impl Into<String>, recovery: &[SyntaxKind]) {
        self.error(message);
        self.skip_trivia();
        self.builder.start_node(SyntaxKind::ERROR.into());
        let mut consumed = false;
        while !self.at_end() && !self.at_any(recovery) {
            self.bump();
            consumed = true;
        }
        // Always make progress
        if !consumed && !self.at_end() {
            self.bump();
        }
        self.builder.finish_node();
    }

    /// Report an error and skip the rest of the current line
    fn recover_line(&mut self, message: impl Into<String>, closer: SyntaxKind) {
        self.error(message);
        self.skip_trivia();
        self.builder.start_node(SyntaxKind::ERROR.into());
        let mut consumed = false;
        while !self.at_end() && !(consumed && self.newline_before()) && !self.at(closer) {
            self.bump();
            consumed = true;
        }
        if !consumed && !self.at_end() {
            self.bump();
        }
        self.builder.finish_node();
    }

    // =========================================================================
    // Node building helpers
    // =========================================================================

    fn start_node(&mut self, kind: SyntaxKind) {
        self.builder.start_node(kind.into());
    }

    /// Start a node at the next significant token
    fn start(&mut self, kind: SyntaxKind) {
        self.skip_trivia();
        self.start_node(kind);
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.skip_trivia();
        self.builder.checkpoint()
    }

    /// Start an item that may carry a doc comment. The comment group that
    /// directly precedes the next token, with no blank line in between and
    /// beginning its own line, is wrapped in a DOC node inside the item.
    fn start_item(&mut self, kind: SyntaxKind) {
        let next = self.nth_index(0);
        let doc = self.doc_start(next);
        while self.pos < doc.unwrap_or(next) {
            self.bump_raw();
        }
        self.start_node(kind);
        if doc.is_some() {
            self.start_node(SyntaxKind::DOC);
            while self.pos + 1 < next {
                self.bump_raw();
            }
            self.finish_node();
        }
    }

    fn doc_start(&self, next: usize) -> Option<usize> {
        if next >= self.tokens.len() {
            return None;
        }
        let mut i = next;
        let mut start = None;
        while i >= self.pos + 2 {
            let ws = &self.tokens[i - 1];
            let comment = &self.tokens[i - 2];
            if ws.kind != SyntaxKind::WHITESPACE || ws.newlines() != 1 || !comment.kind.is_comment() {
                break;
            }
            i -= 2;
            start = Some(i);
        }
        // The first comment of the group must begin its own line
        while let Some(s) = start {
            if s == 0 || self.tokens[s - 1].has_newline() {
                break;
            }
            start = (s + 2 < next).then_some(s + 2);
        }
        start
    }

    /// A comment on the same line as the end of an item
    fn trailing_comment(&mut self) {
        let mut idx = self.pos;
        if let Some(t) = self.tokens.get(idx) {
            if t.kind == SyntaxKind::WHITESPACE && !t.has_newline() {
                idx += 1;
            }
        }
        let is_comment = self
            .tokens
            .get(idx)
            .map(|t| t.kind.is_comment() && !t.has_newline())
            .unwrap_or(false);
        if is_comment {
            while self.pos < idx {
                self.bump_raw();
            }
            self.start_node(SyntaxKind::TRAILING);
            self.bump_raw();
            self.finish_node();
        }
    }

    /// Finish the line of an item: optional `;`, trailing comment, then
    /// either a line break or the closing token of the enclosing list.
    fn end_line(&mut self, closer: SyntaxKind) {
        if !self.newline_before() && self.at(SyntaxKind::SEMICOLON) {
            self.bump();
        }
        self.trailing_comment();
        if !self.newline_before() && !self.at(closer) {
            let message = format!("expected ';', found {}", self.describe_current());
            self.recover_line(message, closer);
            self.trailing_comment();
        }
    }

    // =========================================================================
    // Source file
    // =========================================================================

    fn parse_source_file(&mut self) {
        self.start_node(SyntaxKind::SOURCE_FILE);

        if self.at(SyntaxKind::PACKAGE_KW) {
            self.parse_package_clause();
        } else {
            self.error(format!("expected 'package', found {}", self.describe_current()));
        }

        while self.at(SyntaxKind::IMPORT_KW) {
            self.parse_import_decl();
        }

        while !self.at_end() {
            match self.peek() {
                SyntaxKind::TYPE_KW => self.parse_type_decl(),
                SyntaxKind::CONST_KW => self.parse_const_decl(),
                SyntaxKind::IMPORT_KW => {
                    self.error("imports must appear before other declarations");
                    self.parse_import_decl();
                }
                _ => {
                    let message = format!("expected declaration, found {}", self.describe_current());
                    self.error_recover(
                        message,
                        &[SyntaxKind::TYPE_KW, SyntaxKind::CONST_KW, SyntaxKind::IMPORT_KW],
                    );
                }
            }
        }

        self.skip_trivia();
        self.finish_node();
    }

    fn parse_package_clause(&mut self) {
        self.start_item(SyntaxKind::PACKAGE_CLAUSE);
        self.bump();
        self.parse_name();
        self.end_line(SyntaxKind::ERROR);
        self.finish_node();
    }

    /// A group `( ... )` of specs or a single spec
    fn parse_grouped(&mut self, spec: fn(&mut Self, bool)) {
        if self.at(SyntaxKind::L_PAREN) {
            self.bump();
            while !self.at_end() && !self.at(SyntaxKind::R_PAREN) {
                spec(self, true);
            }
            self.expect(SyntaxKind::R_PAREN);
        } else {
            spec(self, false);
        }
        self.end_line(SyntaxKind::ERROR);
    }

    fn parse_import_decl(&mut self) {
        self.start_item(SyntaxKind::IMPORT_DECL);
        self.bump();
        self.parse_grouped(Self::parse_import_spec);
        self.finish_node();
    }

    fn parse_import_spec(&mut self, grouped: bool) {
        if !self.at_any(&[SyntaxKind::IDENT, SyntaxKind::DOT, SyntaxKind::STRING, SyntaxKind::RAW_STRING]) {
            let message = format!("expected import path, found {}", self.describe_current());
            self.recover_line(message, SyntaxKind::R_PAREN);
            return;
        }
        if grouped {
            self.start_item(SyntaxKind::IMPORT_SPEC);
        } else {
            self.start(SyntaxKind::IMPORT_SPEC);
        }
        if self.at_any(&[SyntaxKind::IDENT, SyntaxKind::DOT]) {
            self.start(SyntaxKind::NAME);
            self.bump();
            self.finish_node();
        }
        if self.at_any(&[SyntaxKind::STRING, SyntaxKind::RAW_STRING]) {
            self.start(SyntaxKind::LITERAL);
            self.bump();
            self.finish_node();
        } else {
            self.error(format!("expected import path, found {}", self.describe_current()));
        }
        if grouped {
            self.end_line(SyntaxKind::R_PAREN);
        }
        self.finish_node();
    }

    fn parse_type_decl(&mut self) {
        self.start_item(SyntaxKind::TYPE_DECL);
        self.bump();
        self.parse_grouped(Self::parse_type_spec);
        self.finish_node();
    }

    fn parse_type_spec(&mut self, grouped: bool) {
        if !self.at(SyntaxKind::IDENT) {
            let message = format!("expected type name, found {}", self.describe_current());
            self.recover_line(message, SyntaxKind::R_PAREN);
            return;
        }
        if grouped {
            self.start_item(SyntaxKind::TYPE_SPEC);
        } else {
            self.start(SyntaxKind::TYPE_SPEC);
        }
        self.parse_name();
        self.parse_type();
        if grouped {
            self.end_line(SyntaxKind::R_PAREN);
        }
        self.finish_node();
    }

    fn parse_const_decl(&mut self) {
        self.start_item(SyntaxKind::CONST_DECL);
        self.bump();
        self.parse_grouped(Self::parse_const_spec);
        self.finish_node();
    }

    fn parse_const_spec(&mut self, grouped: bool) {
        if !self.at(SyntaxKind::IDENT) {
            let message = format!("expected constant name, found {}", self.describe_current());
            self.recover_line(message, SyntaxKind::R_PAREN);
            return;
        }
        if grouped {
            self.start_item(SyntaxKind::CONST_SPEC);
        } else {
            self.start(SyntaxKind::CONST_SPEC);
        }
        self.parse_name();
        if !self.newline_before()
            && !self.at_any(&[SyntaxKind::EQ, SyntaxKind::SEMICOLON, SyntaxKind::R_PAREN])
        {
            self.parse_type();
        }
        if self.eat(SyntaxKind::EQ) {
            self.parse_expr();
        }
        if grouped {
            self.end_line(SyntaxKind::R_PAREN);
        }
        self.finish_node();
    }

    fn parse_name(&mut self) {
        if self.at(SyntaxKind::IDENT) {
            self.start(SyntaxKind::NAME);
            self.bump();
            self.finish_node();
        } else {
            self.error(format!("expected identifier, found {}", self.describe_current()));
        }
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn at_type_start(&self) -> bool {
        self.at_any(&[
            SyntaxKind::IDENT,
            SyntaxKind::L_BRACKET,
            SyntaxKind::MAP_KW,
            SyntaxKind::STAR,
            SyntaxKind::CHAN_KW,
            SyntaxKind::FUNC_KW,
            SyntaxKind::STRUCT_KW,
            SyntaxKind::INTERFACE_KW,
        ])
    }

    fn parse_type(&mut self) {
        match self.peek() {
            SyntaxKind::IDENT => self.parse_type_name(),
            SyntaxKind::L_BRACKET => {
                self.start(SyntaxKind::SLICE_TYPE);
                self.bump();
                self.expect(SyntaxKind::R_BRACKET);
                self.parse_type();
                self.finish_node();
            }
            SyntaxKind::MAP_KW => {
                self.start(SyntaxKind::MAP_TYPE);
                self.bump();
                self.expect(SyntaxKind::L_BRACKET);
                self.parse_type();
                self.expect(SyntaxKind::R_BRACKET);
                self.parse_type();
                self.finish_node();
            }
            SyntaxKind::STAR => {
                self.start(SyntaxKind::POINTER_TYPE);
                self.bump();
                self.parse_type();
                self.finish_node();
            }
            SyntaxKind::CHAN_KW => {
                self.start(SyntaxKind::CHAN_TYPE);
                self.bump();
                self.parse_type();
                self.finish_node();
            }
            SyntaxKind::FUNC_KW => {
                self.start(SyntaxKind::FUNC_TYPE);
                self.bump();
                self.parse_signature();
                self.finish_node();
            }
            SyntaxKind::STRUCT_KW => self.parse_struct_type(),
            SyntaxKind::INTERFACE_KW => self.parse_interface_type(),
            _ => self.error(format!("expected type, found {}", self.describe_current())),
        }
    }

    /// `Name` or `pkg.Name`
    fn parse_type_name(&mut self) {
        if self.nth(1) == SyntaxKind::DOT {
            self.start(SyntaxKind::SELECTOR);
            self.bump();
            self.bump();
            self.expect(SyntaxKind::IDENT);
        } else {
            self.start(SyntaxKind::NAME_REF);
            self.bump();
        }
        self.finish_node();
    }

    fn parse_struct_type(&mut self) {
        self.start(SyntaxKind::STRUCT_TYPE);
        self.bump();
        if self.at(SyntaxKind::L_BRACE) {
            self.start(SyntaxKind::FIELD_LIST);
            self.bump();
            while !self.at_end() && !self.at(SyntaxKind::R_BRACE) {
                self.parse_field();
            }
            self.expect(SyntaxKind::R_BRACE);
            self.finish_node();
        } else {
            self.error(format!("expected '{{', found {}", self.describe_current()));
        }
        self.finish_node();
    }

    fn parse_field(&mut self) {
        if !self.at_any(&[SyntaxKind::IDENT, SyntaxKind::STAR]) {
            let message = format!("expected field name or embedded type, found {}", self.describe_current());
            self.recover_line(message, SyntaxKind::R_BRACE);
            return;
        }
        self.start_item(SyntaxKind::FIELD);
        let embedded = self.at(SyntaxKind::STAR)
            || self.nth(1) == SyntaxKind::DOT
            || self.newline_before_nth(1)
            || matches!(
                self.nth(1),
                SyntaxKind::STRING | SyntaxKind::RAW_STRING | SyntaxKind::SEMICOLON | SyntaxKind::R_BRACE
            );
        if embedded {
            self.parse_type();
        } else {
            self.parse_name();
            while self.eat(SyntaxKind::COMMA) {
                self.parse_name();
            }
            self.parse_type();
        }
        if !self.newline_before() && self.at_any(&[SyntaxKind::STRING, SyntaxKind::RAW_STRING]) {
            self.start(SyntaxKind::FIELD_TAG);
            self.bump();
            self.finish_node();
        }
        self.end_line(SyntaxKind::R_BRACE);
        self.finish_node();
    }

    fn parse_interface_type(&mut self) {
        self.start(SyntaxKind::INTERFACE_TYPE);
        self.bump();
        if self.at(SyntaxKind::L_BRACE) {
            self.start(SyntaxKind::FIELD_LIST);
            self.bump();
            while !self.at_end() && !self.at(SyntaxKind::R_BRACE) {
                self.parse_method();
            }
            self.expect(SyntaxKind::R_BRACE);
            self.finish_node();
        } else {
            self.error(format!("expected '{{', found {}", self.describe_current()));
        }
        self.finish_node();
    }

    fn parse_method(&mut self) {
        if !self.at(SyntaxKind::IDENT) {
            let message = format!("expected method name, found {}", self.describe_current());
            self.recover_line(message, SyntaxKind::R_BRACE);
            return;
        }
        self.start_item(SyntaxKind::METHOD);
        self.parse_name();
        self.parse_signature();
        self.end_line(SyntaxKind::R_BRACE);
        self.finish_node();
    }

    /// `(params) [result | (results)]`
    fn parse_signature(&mut self) {
        self.start(SyntaxKind::PARAM_LIST);
        if self.expect(SyntaxKind::L_PAREN) {
            self.parse_type_list();
            self.expect(SyntaxKind::R_PAREN);
        }
        self.finish_node();

        if self.newline_before() || !self.at_any(&[SyntaxKind::L_PAREN]) && !self.at_type_start() {
            return;
        }
        self.start(SyntaxKind::RESULT_LIST);
        if self.eat(SyntaxKind::L_PAREN) {
            self.parse_type_list();
            self.expect(SyntaxKind::R_PAREN);
        } else {
            self.parse_type();
        }
        self.finish_node();
    }

    /// Comma separated types, each optionally preceded by a parameter name
    fn parse_type_list(&mut self) {
        while self.at_type_start() {
            let named = self.at(SyntaxKind::IDENT)
                && !matches!(
                    self.nth(1),
                    SyntaxKind::DOT | SyntaxKind::COMMA | SyntaxKind::R_PAREN
                );
            if named {
                self.parse_name();
            }
            self.parse_type();
            if !self.eat(SyntaxKind::COMMA) {
                break;
            }
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expr_root(&mut self) {
        self.start_node(SyntaxKind::EXPR_ROOT);
        self.parse_expr();
        if !self.at_end() {
            let message = format!("unexpected {} after expression", self.describe_current());
            self.error_recover(message, &[]);
            while !self.at_end() {
                self.bump();
            }
        }
        self.skip_trivia();
        self.finish_node();
    }

    fn parse_expr(&mut self) {
        if self.at_end() {
            self.error("expected expression, found EOF");
            return;
        }
        match self.peek() {
            SyntaxKind::MINUS | SyntaxKind::PLUS => {
                self.start(SyntaxKind::UNARY_EXPR);
                self.bump();
                self.parse_expr();
                self.finish_node();
            }
            kind if kind.is_literal() => {
                self.start(SyntaxKind::LITERAL);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::L_PAREN => {
                self.start(SyntaxKind::PAREN_EXPR);
                self.bump();
                self.parse_expr();
                self.expect(SyntaxKind::R_PAREN);
                self.finish_node();
            }
            SyntaxKind::IDENT | SyntaxKind::L_BRACKET | SyntaxKind::MAP_KW => {
                let checkpoint = self.checkpoint();
                self.parse_type();
                if self.at(SyntaxKind::L_BRACE) {
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::COMPOSITE_LIT.into());
                    self.parse_lit_body();
                    self.finish_node();
                }
            }
            _ => {
                self.error(format!("expected expression, found {}", self.describe_current()));
                if !self.at_any(&[
                    SyntaxKind::R_BRACE,
                    SyntaxKind::R_PAREN,
                    SyntaxKind::R_BRACKET,
                    SyntaxKind::COMMA,
                ]) {
                    self.start(SyntaxKind::ERROR);
                    self.bump();
                    self.finish_node();
                }
            }
        }
    }

    fn parse_lit_body(&mut self) {
        self.start(SyntaxKind::LIT_BODY);
        self.bump();
        while !self.at_end() && !self.at(SyntaxKind::R_BRACE) {
            self.parse_element();
            if !self.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        self.expect(SyntaxKind::R_BRACE);
        self.finish_node();
    }

    fn parse_element_value(&mut self) {
        if self.at(SyntaxKind::L_BRACE) {
            self.parse_lit_body();
        } else {
            self.parse_expr();
        }
    }

    fn parse_element(&mut self) {
        let checkpoint = self.checkpoint();
        self.parse_element_value();
        if self.at(SyntaxKind::COLON) {
            self.builder
                .start_node_at(checkpoint, SyntaxKind::KEYED_ELEMENT.into());
            self.bump();
            self.parse_element_value();
        } else {
            self.builder.start_node_at(checkpoint, SyntaxKind::ELEMENT.into());
        }
        self.finish_node();
    }
}
