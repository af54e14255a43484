//! Typed AST wrappers over the untyped rowan CST.
//!
//! Each struct wraps a SyntaxNode and provides methods to access children.

use rowan::{NodeOrToken, TextRange};

use super::syntax_kind::SyntaxKind;
use super::{SyntaxNode, SyntaxToken};

/// Trait for AST nodes that wrap a SyntaxNode
pub trait AstNode: Sized {
    fn can_cast(kind: SyntaxKind) -> bool;
    fn cast(node: SyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &SyntaxNode;

    fn range(&self) -> TextRange {
        self.syntax().text_range()
    }
}

// ============================================================================
// Helper macros
// ============================================================================

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                kind == SyntaxKind::$kind
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                if Self::can_cast(node.kind()) {
                    Some(Self(node))
                } else {
                    None
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

macro_rules! ast_enum {
    ($name:ident { $($variant:ident($ty:ident) = $kind:ident),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant($ty)),+
        }

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                matches!(kind, $(SyntaxKind::$kind)|+)
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                match node.kind() {
                    $(SyntaxKind::$kind => Some(Self::$variant($ty(node))),)+
                    _ => None,
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                match self {
                    $(Self::$variant(it) => &it.0,)+
                }
            }
        }
    };
}

fn child<N: AstNode>(node: &SyntaxNode) -> Option<N> {
    node.children().find_map(N::cast)
}

fn children<'a, N: AstNode + 'a>(node: &'a SyntaxNode) -> impl Iterator<Item = N> + 'a {
    node.children().filter_map(N::cast)
}

fn token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(NodeOrToken::into_token)
        .find(|t| t.kind() == kind)
}

fn first_significant_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(NodeOrToken::into_token)
        .find(|t| !t.kind().is_trivia())
}

// ============================================================================
// Root
// ============================================================================

ast_node!(SourceFile, SOURCE_FILE);

impl SourceFile {
    pub fn package_clause(&self) -> Option<PackageClause> {
        child(&self.0)
    }

    pub fn package_name(&self) -> Option<Name> {
        self.package_clause()?.name()
    }

    pub fn import_decls(&self) -> impl Iterator<Item = ImportDecl> + '_ {
        children(&self.0)
    }

    /// Every import spec, across grouped and single declarations
    pub fn imports(&self) -> impl Iterator<Item = ImportSpec> + '_ {
        self.import_decls().flat_map(|decl| decl.specs().collect::<Vec<_>>())
    }

    pub fn type_decls(&self) -> impl Iterator<Item = TypeDecl> + '_ {
        children(&self.0)
    }

    pub fn type_specs(&self) -> impl Iterator<Item = TypeSpec> + '_ {
        self.type_decls().flat_map(|decl| decl.specs().collect::<Vec<_>>())
    }

    pub fn const_decls(&self) -> impl Iterator<Item = ConstDecl> + '_ {
        children(&self.0)
    }

    pub fn const_specs(&self) -> impl Iterator<Item = ConstSpec> + '_ {
        self.const_decls().flat_map(|decl| decl.specs().collect::<Vec<_>>())
    }
}

// ============================================================================
// Comments
// ============================================================================

ast_node!(Doc, DOC);

impl Doc {
    /// Comment text with the comment markers removed, one entry per line
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for token in self.0.children_with_tokens().filter_map(NodeOrToken::into_token) {
            push_comment_lines(&mut lines, &token);
        }
        lines
    }
}

ast_node!(Trailing, TRAILING);

impl Trailing {
    pub fn text(&self) -> String {
        self.0.text().to_string()
    }
}

fn push_comment_lines(lines: &mut Vec<String>, token: &SyntaxToken) {
    let text = token.text();
    match token.kind() {
        SyntaxKind::LINE_COMMENT => {
            lines.push(text.trim_start_matches("//").to_string());
        }
        SyntaxKind::BLOCK_COMMENT => {
            let inner = text
                .strip_prefix("/*")
                .and_then(|t| t.strip_suffix("*/"))
                .unwrap_or(text);
            lines.extend(inner.lines().map(str::to_string));
        }
        _ => {}
    }
}

fn own_doc(node: &SyntaxNode) -> Option<Doc> {
    child(node)
}

fn own_trailing(node: &SyntaxNode) -> Option<Trailing> {
    child(node)
}

// ============================================================================
// Declarations
// ============================================================================

ast_node!(PackageClause, PACKAGE_CLAUSE);

impl PackageClause {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn doc(&self) -> Option<Doc> {
        own_doc(&self.0)
    }
}

ast_node!(Name, NAME);

impl Name {
    pub fn ident(&self) -> Option<SyntaxToken> {
        first_significant_token(&self.0)
    }

    pub fn text(&self) -> String {
        self.ident().map(|t| t.text().to_string()).unwrap_or_default()
    }
}

ast_node!(ImportDecl, IMPORT_DECL);

impl ImportDecl {
    pub fn specs(&self) -> impl Iterator<Item = ImportSpec> + '_ {
        children(&self.0)
    }

    pub fn is_grouped(&self) -> bool {
        token(&self.0, SyntaxKind::L_PAREN).is_some()
    }

    pub fn doc(&self) -> Option<Doc> {
        own_doc(&self.0)
    }
}

ast_node!(ImportSpec, IMPORT_SPEC);

impl ImportSpec {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn path_literal(&self) -> Option<Literal> {
        child(&self.0)
    }

    /// The unquoted import path
    pub fn path(&self) -> Option<String> {
        self.path_literal()?.string_value()
    }

    pub fn doc(&self) -> Option<Doc> {
        own_doc(&self.0)
    }

    pub fn trailing(&self) -> Option<Trailing> {
        own_trailing(&self.0)
    }
}

ast_node!(TypeDecl, TYPE_DECL);

impl TypeDecl {
    pub fn specs(&self) -> impl Iterator<Item = TypeSpec> + '_ {
        children(&self.0)
    }

    pub fn is_grouped(&self) -> bool {
        token(&self.0, SyntaxKind::L_PAREN).is_some()
    }

    pub fn doc(&self) -> Option<Doc> {
        own_doc(&self.0)
    }

    pub fn trailing(&self) -> Option<Trailing> {
        own_trailing(&self.0)
    }
}

ast_node!(TypeSpec, TYPE_SPEC);

impl TypeSpec {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }

    pub fn decl(&self) -> Option<TypeDecl> {
        self.0.parent().and_then(TypeDecl::cast)
    }

    /// The spec's own doc comment, or the declaration's for `type T ...`
    pub fn doc(&self) -> Option<Doc> {
        own_doc(&self.0).or_else(|| {
            let decl = self.decl()?;
            if decl.is_grouped() { None } else { decl.doc() }
        })
    }

    pub fn trailing(&self) -> Option<Trailing> {
        own_trailing(&self.0)
    }
}

ast_node!(ConstDecl, CONST_DECL);

impl ConstDecl {
    pub fn specs(&self) -> impl Iterator<Item = ConstSpec> + '_ {
        children(&self.0)
    }

    pub fn is_grouped(&self) -> bool {
        token(&self.0, SyntaxKind::L_PAREN).is_some()
    }

    pub fn doc(&self) -> Option<Doc> {
        own_doc(&self.0)
    }

    pub fn trailing(&self) -> Option<Trailing> {
        own_trailing(&self.0)
    }
}

ast_node!(ConstSpec, CONST_SPEC);

impl ConstSpec {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn ty(&self) -> Option<Type> {
        let eq = token(&self.0, SyntaxKind::EQ).map(|t| t.text_range().start());
        children::<Type>(&self.0).find(|ty| eq.is_none_or(|eq| ty.range().start() < eq))
    }

    pub fn value(&self) -> Option<Expr> {
        let eq = token(&self.0, SyntaxKind::EQ)?.text_range().start();
        children::<Expr>(&self.0).find(|e| e.range().start() > eq)
    }

    pub fn doc(&self) -> Option<Doc> {
        own_doc(&self.0).or_else(|| {
            let decl = self.0.parent().and_then(ConstDecl::cast)?;
            if decl.is_grouped() { None } else { decl.doc() }
        })
    }

    pub fn trailing(&self) -> Option<Trailing> {
        own_trailing(&self.0)
    }
}

// ============================================================================
// Types
// ============================================================================

ast_enum!(Type {
    Name(NameRef) = NAME_REF,
    Selector(Selector) = SELECTOR,
    Slice(SliceType) = SLICE_TYPE,
    Map(MapType) = MAP_TYPE,
    Pointer(PointerType) = POINTER_TYPE,
    Chan(ChanType) = CHAN_TYPE,
    Func(FuncType) = FUNC_TYPE,
    Struct(StructType) = STRUCT_TYPE,
    Interface(InterfaceType) = INTERFACE_TYPE,
});

ast_node!(NameRef, NAME_REF);

impl NameRef {
    pub fn ident(&self) -> Option<SyntaxToken> {
        first_significant_token(&self.0)
    }

    pub fn text(&self) -> String {
        self.ident().map(|t| t.text().to_string()).unwrap_or_default()
    }
}

ast_node!(Selector, SELECTOR);

impl Selector {
    fn idents(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        self.0
            .children_with_tokens()
            .filter_map(NodeOrToken::into_token)
            .filter(|t| t.kind() == SyntaxKind::IDENT)
    }

    /// The package qualifier (`pkg` in `pkg.Name`)
    pub fn qualifier(&self) -> Option<SyntaxToken> {
        self.idents().next()
    }

    pub fn name(&self) -> Option<SyntaxToken> {
        self.idents().nth(1)
    }
}

ast_node!(SliceType, SLICE_TYPE);

impl SliceType {
    pub fn elem(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(MapType, MAP_TYPE);

impl MapType {
    pub fn key(&self) -> Option<Type> {
        children(&self.0).next()
    }

    pub fn value(&self) -> Option<Type> {
        children(&self.0).nth(1)
    }
}

ast_node!(PointerType, POINTER_TYPE);

impl PointerType {
    pub fn elem(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(ChanType, CHAN_TYPE);

impl ChanType {
    pub fn elem(&self) -> Option<Type> {
        child(&self.0)
    }
}

ast_node!(FuncType, FUNC_TYPE);

impl FuncType {
    pub fn params(&self) -> Option<ParamList> {
        child(&self.0)
    }

    pub fn results(&self) -> Option<ResultList> {
        child(&self.0)
    }
}

ast_node!(ParamList, PARAM_LIST);

impl ParamList {
    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        children(&self.0)
    }
}

ast_node!(ResultList, RESULT_LIST);

impl ResultList {
    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        children(&self.0)
    }

    pub fn is_parenthesized(&self) -> bool {
        token(&self.0, SyntaxKind::L_PAREN).is_some()
    }
}

ast_node!(StructType, STRUCT_TYPE);

impl StructType {
    pub fn field_list(&self) -> Option<FieldList> {
        child(&self.0)
    }

    pub fn fields(&self) -> Vec<Field> {
        self.field_list()
            .map(|list| children(&list.0).collect())
            .unwrap_or_default()
    }
}

ast_node!(FieldList, FIELD_LIST);

impl FieldList {
    pub fn l_brace(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::L_BRACE)
    }

    pub fn r_brace(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::R_BRACE)
    }
}

ast_node!(Field, FIELD);

impl Field {
    pub fn names(&self) -> impl Iterator<Item = Name> + '_ {
        children(&self.0)
    }

    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }

    /// Fields without names embed their type
    pub fn is_embedded(&self) -> bool {
        self.names().next().is_none()
    }

    pub fn tag(&self) -> Option<FieldTag> {
        child(&self.0)
    }

    pub fn doc(&self) -> Option<Doc> {
        own_doc(&self.0)
    }

    pub fn trailing(&self) -> Option<Trailing> {
        own_trailing(&self.0)
    }
}

ast_node!(FieldTag, FIELD_TAG);

impl FieldTag {
    pub fn literal(&self) -> Option<SyntaxToken> {
        first_significant_token(&self.0)
    }

    /// The tag string with its quotes removed
    pub fn value(&self) -> Option<String> {
        unquote(self.literal()?.text())
    }
}

ast_node!(InterfaceType, INTERFACE_TYPE);

impl InterfaceType {
    pub fn field_list(&self) -> Option<FieldList> {
        child(&self.0)
    }

    pub fn methods(&self) -> Vec<Method> {
        self.field_list()
            .map(|list| children(&list.0).collect())
            .unwrap_or_default()
    }
}

ast_node!(Method, METHOD);

impl Method {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn params(&self) -> Option<ParamList> {
        child(&self.0)
    }

    pub fn results(&self) -> Option<ResultList> {
        child(&self.0)
    }

    pub fn doc(&self) -> Option<Doc> {
        own_doc(&self.0)
    }

    pub fn trailing(&self) -> Option<Trailing> {
        own_trailing(&self.0)
    }
}

// ============================================================================
// Expressions
// ============================================================================

ast_enum!(Expr {
    Literal(Literal) = LITERAL,
    Name(NameRef) = NAME_REF,
    Selector(Selector) = SELECTOR,
    Paren(ParenExpr) = PAREN_EXPR,
    Unary(UnaryExpr) = UNARY_EXPR,
    Composite(CompositeLit) = COMPOSITE_LIT,
    Slice(SliceType) = SLICE_TYPE,
    Map(MapType) = MAP_TYPE,
});

ast_node!(ExprRoot, EXPR_ROOT);

impl ExprRoot {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(Literal, LITERAL);

impl Literal {
    pub fn token(&self) -> Option<SyntaxToken> {
        first_significant_token(&self.0)
    }

    pub fn kind(&self) -> SyntaxKind {
        self.token().map(|t| t.kind()).unwrap_or(SyntaxKind::ERROR)
    }

    pub fn string_value(&self) -> Option<String> {
        let token = self.token()?;
        if token.kind().is_string() {
            unquote(token.text())
        } else {
            None
        }
    }
}

ast_node!(ParenExpr, PAREN_EXPR);

impl ParenExpr {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(UnaryExpr, UNARY_EXPR);

impl UnaryExpr {
    pub fn op(&self) -> Option<SyntaxToken> {
        first_significant_token(&self.0)
    }

    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(CompositeLit, COMPOSITE_LIT);

impl CompositeLit {
    pub fn ty(&self) -> Option<Type> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<LitBody> {
        child(&self.0)
    }
}

ast_node!(LitBody, LIT_BODY);

impl LitBody {
    pub fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        children(&self.0)
    }
}

ast_enum!(Element {
    Keyed(KeyedElement) = KEYED_ELEMENT,
    Positional(PositionalElement) = ELEMENT,
});

ast_enum!(ElementValue {
    Literal(Literal) = LITERAL,
    Name(NameRef) = NAME_REF,
    Selector(Selector) = SELECTOR,
    Paren(ParenExpr) = PAREN_EXPR,
    Unary(UnaryExpr) = UNARY_EXPR,
    Composite(CompositeLit) = COMPOSITE_LIT,
    Slice(SliceType) = SLICE_TYPE,
    Map(MapType) = MAP_TYPE,
    Body(LitBody) = LIT_BODY,
});

impl ElementValue {
    /// The value as an expression, unless it is an elided `{...}` literal
    pub fn expr(&self) -> Option<Expr> {
        Expr::cast(self.syntax().clone())
    }
}

ast_node!(KeyedElement, KEYED_ELEMENT);

impl KeyedElement {
    pub fn key(&self) -> Option<ElementValue> {
        children(&self.0).next()
    }

    pub fn value(&self) -> Option<ElementValue> {
        children(&self.0).nth(1)
    }
}

ast_node!(PositionalElement, ELEMENT);

impl PositionalElement {
    pub fn value(&self) -> Option<ElementValue> {
        child(&self.0)
    }
}

// ============================================================================
// Literals
// ============================================================================

/// Remove the quotes of a string literal, resolving escapes
pub fn unquote(text: &str) -> Option<String> {
    if let Some(raw) = text.strip_prefix('`').and_then(|t| t.strip_suffix('`')) {
        return Some(raw.replace('\r', ""));
    }
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn source(text: &str) -> SourceFile {
        SourceFile::cast(parse(text).syntax()).unwrap()
    }

    #[test]
    fn test_ast_package_and_imports() {
        let file = source("package util\n\nimport (\n\t\"time\"\n\tfoo \"example.com/foo\"\n)\n");
        assert_eq!(file.package_name().unwrap().text(), "util");
        let imports: Vec<_> = file.imports().collect();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].path().as_deref(), Some("time"));
        assert_eq!(imports[1].name().unwrap().text(), "foo");
        assert_eq!(imports[1].path().as_deref(), Some("example.com/foo"));
    }

    #[test]
    fn test_ast_struct_fields() {
        let file = source("package a\n\n// T doc.\ntype T struct {\n\t// A doc.\n\tA int `pb:\"1\"`\n\tB, C string\n}\n");
        let spec = file.type_specs().next().unwrap();
        assert_eq!(spec.name().unwrap().text(), "T");
        assert_eq!(spec.doc().unwrap().lines(), vec![" T doc.".to_string()]);
        let Some(Type::Struct(st)) = spec.ty() else {
            panic!("expected struct type");
        };
        let fields = st.fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].tag().unwrap().value().as_deref(), Some("pb:\"1\""));
        assert!(fields[0].doc().is_some());
        let names: Vec<_> = fields[1].names().map(|n| n.text()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_ast_const_spec_type_and_value() {
        let file = source("package a\n\nconst (\n\tA Status = 1\n\tB\n)\n");
        let specs: Vec<_> = file.const_specs().collect();
        assert_eq!(specs.len(), 2);
        assert!(matches!(specs[0].ty(), Some(Type::Name(_))));
        assert!(matches!(specs[0].value(), Some(Expr::Literal(_))));
        assert!(specs[1].ty().is_none());
        assert!(specs[1].value().is_none());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""a\"b\n""#).as_deref(), Some("a\"b\n"));
        assert_eq!(unquote("`raw\\n`").as_deref(), Some("raw\\n"));
        assert_eq!(unquote("noquotes"), None);
    }
}
