//! Logos-based lexer for Gunk
//!
//! Produces every token, trivia included, so the tree stays lossless.

use super::syntax_kind::SyntaxKind;
use logos::Logos;
use rowan::TextSize;

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: TextSize,
}

impl Token<'_> {
    /// Whether this token is whitespace spanning at least one line break
    pub fn has_newline(&self) -> bool {
        self.kind != SyntaxKind::LINE_COMMENT && self.text.contains('\n')
    }

    pub fn newlines(&self) -> usize {
        self.text.bytes().filter(|&b| b == b'\n').count()
    }
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        let kind = match logos_token {
            Ok(t) => t.into(),
            Err(()) => SyntaxKind::ERROR,
        };

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Consume a block comment through its closing `*/`. An unterminated
/// comment swallows the rest of the input as an error.
fn block_comment(lex: &mut logos::Lexer<LogosToken>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => {
            lex.bump(lex.remainder().len());
            false
        }
    }
}

/// Logos token enum - maps to SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+")]
    #[regex(r"0[xX][0-9a-fA-F]+")]
    Int,

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    Float,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    #[regex(r"`[^`]*`")]
    RawString,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("=")]
    Eq,
    #[token("*")]
    Star,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    #[token("package")]
    PackageKw,
    #[token("import")]
    ImportKw,
    #[token("type")]
    TypeKw,
    #[token("const")]
    ConstKw,
    #[token("struct")]
    StructKw,
    #[token("interface")]
    InterfaceKw,
    #[token("map")]
    MapKw,
    #[token("chan")]
    ChanKw,
    #[token("func")]
    FuncKw,
}

impl From<LogosToken> for SyntaxKind {
    fn from(token: LogosToken) -> Self {
        match token {
            LogosToken::Whitespace => SyntaxKind::WHITESPACE,
            LogosToken::LineComment => SyntaxKind::LINE_COMMENT,
            LogosToken::BlockComment => SyntaxKind::BLOCK_COMMENT,
            LogosToken::Ident => SyntaxKind::IDENT,
            LogosToken::Int => SyntaxKind::INT,
            LogosToken::Float => SyntaxKind::FLOAT,
            LogosToken::String => SyntaxKind::STRING,
            LogosToken::RawString => SyntaxKind::RAW_STRING,
            LogosToken::LBrace => SyntaxKind::L_BRACE,
            LogosToken::RBrace => SyntaxKind::R_BRACE,
            LogosToken::LBracket => SyntaxKind::L_BRACKET,
            LogosToken::RBracket => SyntaxKind::R_BRACKET,
            LogosToken::LParen => SyntaxKind::L_PAREN,
            LogosToken::RParen => SyntaxKind::R_PAREN,
            LogosToken::Semicolon => SyntaxKind::SEMICOLON,
            LogosToken::Colon => SyntaxKind::COLON,
            LogosToken::Dot => SyntaxKind::DOT,
            LogosToken::Comma => SyntaxKind::COMMA,
            LogosToken::Eq => SyntaxKind::EQ,
            LogosToken::Star => SyntaxKind::STAR,
            LogosToken::Minus => SyntaxKind::MINUS,
            LogosToken::Plus => SyntaxKind::PLUS,
            LogosToken::PackageKw => SyntaxKind::PACKAGE_KW,
            LogosToken::ImportKw => SyntaxKind::IMPORT_KW,
            LogosToken::TypeKw => SyntaxKind::TYPE_KW,
            LogosToken::ConstKw => SyntaxKind::CONST_KW,
            LogosToken::StructKw => SyntaxKind::STRUCT_KW,
            LogosToken::InterfaceKw => SyntaxKind::INTERFACE_KW,
            LogosToken::MapKw => SyntaxKind::MAP_KW,
            LogosToken::ChanKw => SyntaxKind::CHAN_KW,
            LogosToken::FuncKw => SyntaxKind::FUNC_KW,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn kinds(input: &str) -> Vec<SyntaxKind> {
        tokenize(input)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_win_over_identifiers() {
        assert_eq!(
            kinds("package pkg\ntype T struct"),
            vec![
                SyntaxKind::PACKAGE_KW,
                SyntaxKind::IDENT,
                SyntaxKind::TYPE_KW,
                SyntaxKind::IDENT,
                SyntaxKind::STRUCT_KW,
            ]
        );
    }

    #[test]
    fn test_struct_tag_and_comments() {
        let tokens = tokenize("Name string `pb:\"1\"` // trailing\n/* block */");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::IDENT,
                SyntaxKind::WHITESPACE,
                SyntaxKind::IDENT,
                SyntaxKind::WHITESPACE,
                SyntaxKind::RAW_STRING,
                SyntaxKind::WHITESPACE,
                SyntaxKind::LINE_COMMENT,
                SyntaxKind::WHITESPACE,
                SyntaxKind::BLOCK_COMMENT,
            ]
        );
        assert_eq!(tokens[4].offset, TextSize::new(12));
    }

    #[rstest]
    #[case::plain("/* note */")]
    #[case::stars("/** note **/")]
    #[case::multiline("/*\n * a\n * b\n */")]
    #[case::slashes("/* a/b // c */")]
    fn test_block_comment_is_one_token(#[case] input: &str) {
        let tokens = tokenize(input);
        assert_eq!(tokens.len(), 1, "{tokens:?}");
        assert_eq!(tokens[0].kind, SyntaxKind::BLOCK_COMMENT);
        assert_eq!(tokens[0].text, input);
    }

    #[test]
    fn test_block_comment_ends_at_first_close() {
        let tokens = tokenize("/* a */ x /* b */");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::BLOCK_COMMENT,
                SyntaxKind::WHITESPACE,
                SyntaxKind::IDENT,
                SyntaxKind::WHITESPACE,
                SyntaxKind::BLOCK_COMMENT,
            ]
        );
    }

    #[test]
    fn test_unterminated_block_comment_is_an_error() {
        let tokens = tokenize("x /* open");
        let last = tokens.last().unwrap();
        assert_eq!(last.kind, SyntaxKind::ERROR);
        assert_eq!(last.text, "/* open");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 0x1F 2.5 1e3"),
            vec![SyntaxKind::INT, SyntaxKind::INT, SyntaxKind::FLOAT, SyntaxKind::FLOAT]
        );
    }
}
