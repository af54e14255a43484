//! Constant declarations and expressions, including the composite literals
//! written in tags.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::{Binding, Checker, Ctx, Decl, DeclState};
use crate::base::TextSize;
use crate::hir::diagnostics::CoordSpace;
use crate::hir::importer::Importer;
use crate::hir::types::{BasicKind, ConstDef, ConstValue, FieldTy, Ty, TypeAndValue, is_exported};
use crate::parser::{
    AstNode, CompositeLit, ConstSpec, Element, ElementValue, Expr, LitBody, Literal, NameRef,
    Selector, SyntaxKind, SyntaxNode, Type, UnaryExpr, unquote,
};

impl<I: Importer> Checker<'_, I> {
    // ========================================================================
    // CONSTANTS
    // ========================================================================

    pub(super) fn resolve_const(&mut self, name: &SmolStr) -> Option<ConstDef> {
        match self.states.get(name) {
            Some(DeclState::Done) => return self.surface.consts.get(name).cloned(),
            Some(DeclState::InProgress) => {
                if let Some(decl) = self.decls.get(name) {
                    let (file, at) = (decl.file(), decl.name_at());
                    self.error_in(
                        file,
                        CoordSpace::Source,
                        at,
                        format!("initialization cycle: {name} refers to itself"),
                    );
                }
                return None;
            }
            None => {}
        }
        let Some(Decl::Const {
            file,
            spec,
            ty,
            value,
            iota,
        }) = self.decls.get(name).cloned()
        else {
            return None;
        };
        self.states.insert(name.clone(), DeclState::InProgress);
        let mut ctx = Ctx::source(file);
        ctx.iota = Some(iota);
        let def = self.const_decl(&mut ctx, &spec, ty, value);
        self.flush(ctx);
        self.states.insert(name.clone(), DeclState::Done);
        if let Some(def) = &def {
            self.surface.consts.insert(name.clone(), def.clone());
        }
        def
    }

    fn const_decl(
        &mut self,
        ctx: &mut Ctx,
        spec: &ConstSpec,
        ty: Option<Type>,
        value: Option<Expr>,
    ) -> Option<ConstDef> {
        let declared = ty.as_ref().map(|t| (t.range().start(), self.resolve_type(ctx, t)));
        let Some(value) = value else {
            let at = spec.name().map(|n| n.range().start()).unwrap_or_default();
            self.error(ctx, at, "missing init expr for const declaration");
            return None;
        };
        let tv = self.expr(ctx, &value)?;
        let Some(constant) = tv.const_value().cloned() else {
            let message = format!(
                "{} ({}) is not constant",
                text_of(value.syntax()),
                self.describe(&tv, value.syntax())
            );
            self.error(ctx, value.range().start(), message);
            return None;
        };
        let Some((type_at, declared)) = declared else {
            return Some(ConstDef {
                ty: tv.ty,
                value: constant,
            });
        };
        if declared.is_invalid() {
            return None;
        }
        let Some(kind) = self.underlying(&declared).as_basic() else {
            let message = format!("invalid constant type {}", declared.display(&self.path));
            self.error(ctx, type_at, message);
            return None;
        };
        if !self.assign(ctx, &tv, &declared, value.syntax(), "constant declaration") {
            return None;
        }
        Some(ConstDef {
            ty: declared,
            value: convert(constant, kind),
        })
    }

    // ========================================================================
    // EXPRESSIONS
    // ========================================================================

    pub(super) fn expr(&mut self, ctx: &mut Ctx, expr: &Expr) -> Option<TypeAndValue> {
        let tv = match expr {
            Expr::Literal(literal) => self.literal(ctx, literal),
            Expr::Name(name) => self.name_expr(ctx, name),
            Expr::Selector(selector) => self.selector_expr(ctx, selector),
            Expr::Paren(paren) => self.expr(ctx, &paren.expr()?),
            Expr::Unary(unary) => self.unary(ctx, unary),
            Expr::Composite(lit) => self.composite(ctx, lit),
            Expr::Slice(_) | Expr::Map(_) => {
                if let Some(ty) = Type::cast(expr.syntax().clone()) {
                    self.resolve_type(ctx, &ty);
                }
                let message = format!("{} (type) is not an expression", text_of(expr.syntax()));
                self.error(ctx, expr.range().start(), message);
                None
            }
        }?;
        ctx.table.insert(expr.range(), tv.clone());
        Some(tv)
    }

    fn literal(&mut self, ctx: &Ctx, literal: &Literal) -> Option<TypeAndValue> {
        let token = literal.token()?;
        let text = token.text();
        let value = match token.kind() {
            SyntaxKind::INT => parse_int(text).map(ConstValue::Int),
            SyntaxKind::FLOAT => text.replace('_', "").parse().ok().map(ConstValue::Float),
            SyntaxKind::STRING | SyntaxKind::RAW_STRING => unquote(text).map(ConstValue::String),
            _ => None,
        };
        let Some(value) = value else {
            self.error(ctx, literal.range().start(), format!("invalid literal {text}"));
            return None;
        };
        let ty = Ty::Basic(value.untyped_kind());
        Some(TypeAndValue::constant(ty, value))
    }

    fn name_expr(&mut self, ctx: &Ctx, name: &NameRef) -> Option<TypeAndValue> {
        let text = name.text();
        let at = name.range().start();
        match self.lookup(ctx.file, &text) {
            Some(Binding::LocalConst(local)) => {
                let def = self.resolve_const(&local)?;
                Some(TypeAndValue::constant(def.ty, def.value))
            }
            Some(Binding::Const(def)) => Some(TypeAndValue::constant(def.ty, def.value)),
            Some(Binding::Iota) => match ctx.iota {
                Some(iota) => Some(TypeAndValue::constant(
                    Ty::Basic(BasicKind::UntypedInt),
                    ConstValue::Int(iota),
                )),
                None => {
                    self.error(ctx, at, "cannot use iota outside constant declaration");
                    None
                }
            },
            Some(Binding::Type(_) | Binding::LocalType(_)) => {
                self.error(ctx, at, format!("{text} (type) is not an expression"));
                None
            }
            Some(Binding::Package(_)) => {
                self.error(ctx, at, format!("use of package {text} without selector"));
                None
            }
            None => {
                self.error(ctx, at, format!("undefined: {text}"));
                None
            }
        }
    }

    fn selector_expr(&mut self, ctx: &Ctx, selector: &Selector) -> Option<TypeAndValue> {
        let (qualifier, name) = (selector.qualifier()?, selector.name()?);
        let (q, n) = (qualifier.text(), name.text());
        match self.lookup(ctx.file, q) {
            Some(Binding::Package(None)) => None,
            Some(Binding::Package(Some(surface))) => {
                if !is_exported(n) {
                    let message = format!("name {n} not exported by package {}", surface.name);
                    self.error(ctx, name.text_range().start(), message);
                } else if let Some(def) = surface.consts.get(n) {
                    return Some(TypeAndValue::constant(def.ty.clone(), def.value.clone()));
                } else if surface.types.contains_key(n) {
                    let message = format!("{q}.{n} (type) is not an expression");
                    self.error(ctx, selector.range().start(), message);
                } else {
                    self.error(ctx, name.text_range().start(), format!("undefined: {q}.{n}"));
                }
                None
            }
            Some(_) => {
                self.error(ctx, selector.range().start(), format!("{q}.{n} undefined"));
                None
            }
            None => {
                self.error(ctx, qualifier.text_range().start(), format!("undefined: {q}"));
                None
            }
        }
    }

    fn unary(&mut self, ctx: &mut Ctx, unary: &UnaryExpr) -> Option<TypeAndValue> {
        let op = unary.op()?;
        let operand = unary.expr()?;
        let tv = self.expr(ctx, &operand)?;
        let negated = match (op.kind(), tv.const_value()) {
            (SyntaxKind::PLUS, Some(ConstValue::Int(_) | ConstValue::Float(_))) => {
                return Some(tv);
            }
            (SyntaxKind::MINUS, Some(ConstValue::Int(i))) => Some(ConstValue::Int(-i)),
            (SyntaxKind::MINUS, Some(ConstValue::Float(x))) => Some(ConstValue::Float(-x)),
            _ => None,
        };
        match negated {
            Some(value) => Some(TypeAndValue::constant(tv.ty, value)),
            None => {
                let message = format!(
                    "invalid operation: operator {} not defined on {} ({})",
                    op.text(),
                    text_of(operand.syntax()),
                    self.describe(&tv, operand.syntax())
                );
                self.error(ctx, unary.range().start(), message);
                None
            }
        }
    }

    // ========================================================================
    // COMPOSITE LITERALS
    // ========================================================================

    fn composite(&mut self, ctx: &mut Ctx, lit: &CompositeLit) -> Option<TypeAndValue> {
        let ty = self.opt_type(ctx, lit.ty());
        self.literal_body(ctx, ty, lit.body(), lit.syntax(), false)
    }

    /// Check the elements of a literal of type `ty`. Elided literals inside
    /// another literal may also stand for `&T{...}` when `ty` is `*T`.
    fn literal_body(
        &mut self,
        ctx: &mut Ctx,
        ty: Ty,
        body: Option<LitBody>,
        node: &SyntaxNode,
        elided: bool,
    ) -> Option<TypeAndValue> {
        if ty.is_invalid() {
            return None;
        }
        let mut base_ty = ty.clone();
        let mut base = self.underlying(&ty);
        if elided {
            if let Ty::Pointer(elem) = &base {
                base_ty = (**elem).clone();
                base = self.underlying(elem);
            }
        }
        let body = body?;
        match base {
            Ty::Struct(st) => self.struct_lit(ctx, &base_ty, &st.fields, &body),
            Ty::Slice(elem) => self.slice_lit(ctx, &elem, &body),
            Ty::Map(key, value) => self.map_lit(ctx, &key, &value, &body),
            Ty::Invalid => return None,
            _ => {
                let message = format!("invalid composite literal type {}", ty.display(&self.path));
                self.error(ctx, node.text_range().start(), message);
                return None;
            }
        }
        Some(TypeAndValue::value(ty))
    }

    fn struct_lit(
        &mut self,
        ctx: &mut Ctx,
        ty: &Ty,
        fields: &[FieldTy],
        body: &LitBody,
    ) {
        let elements: Vec<Element> = body.elements().collect();
        if elements.is_empty() {
            return;
        }
        let keyed_count = elements
            .iter()
            .filter(|e| matches!(e, Element::Keyed(_)))
            .count();
        if keyed_count > 0 && keyed_count < elements.len() {
            self.error(
                ctx,
                body.range().start(),
                "mixture of field:value and value elements in struct literal",
            );
            return;
        }
        let type_name = ty.display(&self.path).to_string();
        if keyed_count > 0 {
            let mut seen = FxHashSet::default();
            for element in &elements {
                let Element::Keyed(keyed) = element else {
                    continue;
                };
                let Some(key) = keyed.key() else { continue };
                let ElementValue::Name(field_name) = &key else {
                    let message = format!("invalid field name {} in struct literal", text_of(key.syntax()));
                    self.error(ctx, key.range().start(), message);
                    continue;
                };
                let name = field_name.text();
                let at = field_name.range().start();
                let Some(field) = fields.iter().find(|f| f.name == name) else {
                    let message = format!("unknown field {name} in struct literal of type {type_name}");
                    self.error(ctx, at, message);
                    continue;
                };
                if !seen.insert(name.clone()) {
                    self.error(ctx, at, format!("duplicate field name {name} in struct literal"));
                    continue;
                }
                self.element_value(ctx, keyed.value(), &field.ty, "struct literal");
            }
            return;
        }
        for (i, element) in elements.iter().enumerate() {
            let Element::Positional(positional) = element else {
                continue;
            };
            let Some(field) = fields.get(i) else {
                let message = format!("too many values in struct literal of type {type_name}");
                self.error(ctx, positional.range().start(), message);
                break;
            };
            self.element_value(ctx, positional.value(), &field.ty, "struct literal");
        }
        if elements.len() < fields.len() {
            let at = body.range().end() - TextSize::new(1);
            let message = format!("too few values in struct literal of type {type_name}");
            self.error(ctx, at, message);
        }
    }

    fn slice_lit(&mut self, ctx: &mut Ctx, elem: &Ty, body: &LitBody) {
        for element in body.elements() {
            match element {
                Element::Keyed(keyed) => {
                    if let Some(index) = keyed.key().and_then(|k| k.expr()) {
                        let is_int = self
                            .expr(ctx, &index)
                            .and_then(|tv| tv.const_value().cloned())
                            .is_some_and(|v| matches!(v, ConstValue::Int(i) if i >= 0));
                        if !is_int {
                            let message = format!(
                                "index {} must be non-negative integer constant",
                                text_of(index.syntax())
                            );
                            self.error(ctx, index.range().start(), message);
                        }
                    }
                    self.element_value(ctx, keyed.value(), elem, "slice literal");
                }
                Element::Positional(positional) => {
                    self.element_value(ctx, positional.value(), elem, "slice literal");
                }
            }
        }
    }

    fn map_lit(&mut self, ctx: &mut Ctx, key_ty: &Ty, value_ty: &Ty, body: &LitBody) {
        let mut seen = FxHashSet::default();
        for element in body.elements() {
            match element {
                Element::Positional(positional) => {
                    self.error(ctx, positional.range().start(), "missing key in map literal");
                }
                Element::Keyed(keyed) => {
                    if let Some(key) = keyed.key() {
                        let tv = self.element_value(ctx, Some(key.clone()), key_ty, "map literal");
                        if let Some(value) = tv.as_ref().and_then(TypeAndValue::const_value) {
                            if !seen.insert(value.to_string()) {
                                let message = format!(
                                    "duplicate key {} in map literal",
                                    text_of(key.syntax())
                                );
                                self.error(ctx, key.range().start(), message);
                            }
                        }
                    }
                    self.element_value(ctx, keyed.value(), value_ty, "map literal");
                }
            }
        }
    }

    /// Check one element against the type it must be assignable to
    fn element_value(
        &mut self,
        ctx: &mut Ctx,
        value: Option<ElementValue>,
        target: &Ty,
        context: &str,
    ) -> Option<TypeAndValue> {
        let value = value?;
        if let ElementValue::Body(body) = &value {
            let tv = self.literal_body(ctx, target.clone(), Some(body.clone()), body.syntax(), true)?;
            ctx.table.insert(body.range(), tv.clone());
            return Some(tv);
        }
        let expr = value.expr()?;
        let tv = self.expr(ctx, &expr)?;
        self.assign(ctx, &tv, target, expr.syntax(), context)
            .then_some(tv)
    }

    // ========================================================================
    // ASSIGNABILITY
    // ========================================================================

    /// Report a value that cannot be used as `target`
    fn assign(
        &mut self,
        ctx: &Ctx,
        tv: &TypeAndValue,
        target: &Ty,
        node: &SyntaxNode,
        context: &str,
    ) -> bool {
        if tv.ty.is_invalid() || target.is_invalid() {
            return true;
        }
        match self.assignable(tv, target) {
            Ok(()) => true,
            Err(reason) => {
                let message = format!(
                    "cannot use {} ({}) as {} value in {context}{reason}",
                    text_of(node),
                    self.describe(tv, node),
                    target.display(&self.path)
                );
                self.error(ctx, node.text_range().start(), message);
                false
            }
        }
    }

    fn assignable(&mut self, tv: &TypeAndValue, target: &Ty) -> Result<(), &'static str> {
        let target_under = self.underlying(target);
        if let (Some(value), Some(kind)) = (tv.const_value(), tv.ty.as_basic()) {
            if kind.is_untyped() {
                return match &target_under {
                    Ty::Basic(target_kind) => representable(value, *target_kind),
                    Ty::Interface(it) if it.methods.is_empty() => Ok(()),
                    _ => Err(""),
                };
            }
        }
        if &tv.ty == target {
            return Ok(());
        }
        let both_named = matches!(tv.ty, Ty::Named(_)) && matches!(target, Ty::Named(_));
        if !both_named && self.underlying(&tv.ty) == target_under {
            return Ok(());
        }
        match target_under {
            Ty::Interface(it) if it.methods.is_empty() => Ok(()),
            _ => Err(""),
        }
    }

    /// How an operand reads in messages: `untyped int constant`,
    /// `constant 3 of type Status` or `value of type T`
    fn describe(&self, tv: &TypeAndValue, node: &SyntaxNode) -> String {
        let text = text_of(node);
        match tv.const_value() {
            Some(value) => {
                let shown = if value.to_string() == text {
                    String::new()
                } else {
                    format!(" {value}")
                };
                match tv.ty.as_basic() {
                    Some(kind) if kind.is_untyped() => format!("{} constant{shown}", kind.name()),
                    _ => format!("constant{shown} of type {}", tv.ty.display(&self.path)),
                }
            }
            None => format!("value of type {}", tv.ty.display(&self.path)),
        }
    }
}

/// Whether an untyped constant fits a basic type; the error carries the
/// message suffix
fn representable(value: &ConstValue, kind: BasicKind) -> Result<(), &'static str> {
    let fits = |i: i128| match kind.int_range() {
        Some((min, max)) if i < min || i > max => Err(" (overflows)"),
        _ => Ok(()),
    };
    match value {
        ConstValue::Bool(_) if kind.is_bool() => Ok(()),
        ConstValue::String(_) if kind.is_string() => Ok(()),
        ConstValue::Int(i) if kind.is_integer() => fits(*i),
        ConstValue::Int(_) if kind.is_float() => Ok(()),
        ConstValue::Float(_) if kind.is_float() => Ok(()),
        ConstValue::Float(x) if kind.is_integer() => {
            if x.fract() != 0.0 {
                Err(" (truncated)")
            } else if x.abs() > 1e38 {
                Err(" (overflows)")
            } else {
                fits(*x as i128)
            }
        }
        _ => Err(""),
    }
}

/// The value a constant takes once given a basic type
fn convert(value: ConstValue, kind: BasicKind) -> ConstValue {
    match value {
        ConstValue::Float(x) if kind.is_integer() => ConstValue::Int(x as i128),
        ConstValue::Int(i) if kind.is_float() => ConstValue::Float(i as f64),
        other => other,
    }
}

fn parse_int(text: &str) -> Option<i128> {
    let text = text.replace('_', "");
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i128::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        return i128::from_str_radix(bin, 2).ok();
    }
    if let Some(oct) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        return i128::from_str_radix(oct, 8).ok();
    }
    if text.len() > 1 && text.starts_with('0') {
        return i128::from_str_radix(&text[1..], 8).ok();
    }
    text.parse().ok()
}

fn text_of(node: &SyntaxNode) -> String {
    node.text().to_string().trim().to_string()
}
