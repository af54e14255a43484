//! Syntax kinds for the Rowan-based CST
//!
//! This enum defines all possible node and token kinds in the syntax tree
//! of a Gunk source file (and of tag expressions parsed out of comments).

/// All syntax kinds (tokens and nodes) in Gunk
///
/// Tokens are leaf nodes (identifiers, keywords, punctuation).
/// Nodes are composite (declarations, types, expressions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA (whitespace and comments - preserved but not semantically meaningful)
    // =========================================================================
    WHITESPACE = 0,
    LINE_COMMENT,
    BLOCK_COMMENT,

    // =========================================================================
    // LITERALS
    // =========================================================================
    IDENT,       // identifier
    INT,         // 42
    FLOAT,       // 3.14
    STRING,      // "hello"
    RAW_STRING,  // `hello`

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    L_BRACE,   // {
    R_BRACE,   // }
    L_BRACKET, // [
    R_BRACKET, // ]
    L_PAREN,   // (
    R_PAREN,   // )
    SEMICOLON, // ;
    COLON,     // :
    DOT,       // .
    COMMA,     // ,
    EQ,        // =
    STAR,      // *
    MINUS,     // -
    PLUS,      // +

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    PACKAGE_KW,
    IMPORT_KW,
    TYPE_KW,
    CONST_KW,
    STRUCT_KW,
    INTERFACE_KW,
    MAP_KW,
    CHAN_KW,
    FUNC_KW,

    // =========================================================================
    // NODES
    // =========================================================================
    SOURCE_FILE,
    DOC,            // documentation comment group attached to the next item
    TRAILING,       // comment on the same line after an item
    PACKAGE_CLAUSE,
    IMPORT_DECL,
    IMPORT_SPEC,
    TYPE_DECL,
    TYPE_SPEC,
    CONST_DECL,
    CONST_SPEC,
    NAME,           // defining identifier

    // Types
    NAME_REF,       // identifier used as a type or value
    SELECTOR,       // pkg.Name
    SLICE_TYPE,
    MAP_TYPE,
    POINTER_TYPE,
    CHAN_TYPE,
    FUNC_TYPE,
    PARAM_LIST,
    RESULT_LIST,
    STRUCT_TYPE,
    INTERFACE_TYPE,
    FIELD_LIST,
    FIELD,
    FIELD_TAG,
    METHOD,

    // Expressions
    EXPR_ROOT,      // root of an expression parsed on its own (tags)
    LITERAL,
    PAREN_EXPR,
    UNARY_EXPR,
    COMPOSITE_LIT,
    LIT_BODY,
    KEYED_ELEMENT,
    ELEMENT,

    // Special
    ERROR,

    #[doc(hidden)]
    __LAST,
}

impl SyntaxKind {
    /// Check if this is a trivia token (whitespace or comment)
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::WHITESPACE | Self::LINE_COMMENT | Self::BLOCK_COMMENT)
    }

    pub fn is_comment(self) -> bool {
        matches!(self, Self::LINE_COMMENT | Self::BLOCK_COMMENT)
    }

    /// Check if this is a keyword
    pub fn is_keyword(self) -> bool {
        (self as u16) >= (Self::PACKAGE_KW as u16) && (self as u16) <= (Self::FUNC_KW as u16)
    }

    /// Check if this is a literal
    pub fn is_literal(self) -> bool {
        matches!(self, Self::INT | Self::FLOAT | Self::STRING | Self::RAW_STRING)
    }

    /// Check if this is a string literal of either flavour
    pub fn is_string(self) -> bool {
        matches!(self, Self::STRING | Self::RAW_STRING)
    }

    /// Kinds that denote a type expression
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Self::NAME_REF
                | Self::SELECTOR
                | Self::SLICE_TYPE
                | Self::MAP_TYPE
                | Self::POINTER_TYPE
                | Self::CHAN_TYPE
                | Self::FUNC_TYPE
                | Self::STRUCT_TYPE
                | Self::INTERFACE_TYPE
        )
    }

    /// Human readable description used in parse error messages
    pub fn describe(self) -> &'static str {
        match self {
            Self::IDENT => "identifier",
            Self::INT | Self::FLOAT => "number",
            Self::STRING | Self::RAW_STRING => "string literal",
            Self::L_BRACE => "'{'",
            Self::R_BRACE => "'}'",
            Self::L_BRACKET => "'['",
            Self::R_BRACKET => "']'",
            Self::L_PAREN => "'('",
            Self::R_PAREN => "')'",
            Self::SEMICOLON => "';'",
            Self::COLON => "':'",
            Self::DOT => "'.'",
            Self::COMMA => "','",
            Self::EQ => "'='",
            Self::STAR => "'*'",
            Self::MINUS => "'-'",
            Self::PLUS => "'+'",
            Self::PACKAGE_KW => "'package'",
            Self::IMPORT_KW => "'import'",
            Self::TYPE_KW => "'type'",
            Self::CONST_KW => "'const'",
            Self::STRUCT_KW => "'struct'",
            Self::INTERFACE_KW => "'interface'",
            Self::MAP_KW => "'map'",
            Self::CHAN_KW => "'chan'",
            Self::FUNC_KW => "'func'",
            _ => "token",
        }
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: we control all syntax kinds and check bounds above
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GunkLanguage {}

impl rowan::Language for GunkLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for convenience
pub type SyntaxNode = rowan::SyntaxNode<GunkLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<GunkLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<GunkLanguage>;
