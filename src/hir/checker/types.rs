//! Type expressions, named type resolution and the checks that need every
//! type resolved.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::{Binding, Checker, Ctx, Decl, DeclState, PendingKey};
use crate::hir::diagnostics::CoordSpace;
use crate::hir::importer::Importer;
use crate::hir::types::{
    FieldTy, InterfaceTy, MethodTy, NamedRef, Signature, StructTy, Ty, TypeAndValue, is_exported,
};
use crate::parser::{
    AstNode, InterfaceType, NameRef, ParamList, ResultList, Selector, StructType, Type,
};

impl<I: Importer> Checker<'_, I> {
    pub(super) fn resolve_type(&mut self, ctx: &mut Ctx, ty: &Type) -> Ty {
        let resolved = match ty {
            Type::Name(name) => self.type_name(ctx, name),
            Type::Selector(selector) => self.qualified_type(ctx, selector),
            Type::Slice(slice) => Ty::Slice(Box::new(self.opt_type(ctx, slice.elem()))),
            Type::Map(map) => {
                let key = self.opt_type(ctx, map.key());
                let value = self.opt_type(ctx, map.value());
                if let Some(key_node) = map.key() {
                    self.pending_keys.push(PendingKey {
                        file: ctx.file,
                        space: ctx.space.clone(),
                        at: key_node.range().start(),
                        ty: key.clone(),
                    });
                }
                Ty::Map(Box::new(key), Box::new(value))
            }
            Type::Pointer(pointer) => Ty::Pointer(Box::new(self.opt_type(ctx, pointer.elem()))),
            Type::Chan(chan) => Ty::Chan(Box::new(self.opt_type(ctx, chan.elem()))),
            Type::Func(func) => Ty::Func(self.signature(ctx, func.params(), func.results())),
            Type::Struct(st) => Ty::Struct(self.struct_type(ctx, st)),
            Type::Interface(it) => Ty::Interface(self.interface_type(ctx, it)),
        };
        ctx.table
            .insert(ty.range(), TypeAndValue::type_of(resolved.clone()));
        resolved
    }

    pub(super) fn opt_type(&mut self, ctx: &mut Ctx, ty: Option<Type>) -> Ty {
        match ty {
            Some(ty) => self.resolve_type(ctx, &ty),
            None => Ty::Invalid,
        }
    }

    fn type_name(&mut self, ctx: &Ctx, name: &NameRef) -> Ty {
        let text = name.text();
        let at = name.range().start();
        match self.lookup(ctx.file, &text) {
            Some(Binding::Type(ty)) => ty,
            Some(Binding::LocalType(local)) => Ty::Named(self.surface.named(&local)),
            Some(Binding::LocalConst(_) | Binding::Const(_) | Binding::Iota) => {
                self.error(ctx, at, format!("{text} is not a type"));
                Ty::Invalid
            }
            Some(Binding::Package(_)) => {
                self.error(ctx, at, format!("use of package {text} without selector"));
                Ty::Invalid
            }
            None => {
                self.error(ctx, at, format!("undefined: {text}"));
                Ty::Invalid
            }
        }
    }

    fn qualified_type(&mut self, ctx: &Ctx, selector: &Selector) -> Ty {
        let (Some(qualifier), Some(name)) = (selector.qualifier(), selector.name()) else {
            return Ty::Invalid;
        };
        let (q, n) = (qualifier.text(), name.text());
        match self.lookup(ctx.file, q) {
            Some(Binding::Package(None)) => Ty::Invalid,
            Some(Binding::Package(Some(surface))) => {
                if !is_exported(n) {
                    self.error(
                        ctx,
                        name.text_range().start(),
                        format!("name {n} not exported by package {}", surface.name),
                    );
                    Ty::Invalid
                } else if surface.types.contains_key(n) {
                    Ty::Named(surface.named(n))
                } else if surface.consts.contains_key(n) {
                    self.error(ctx, selector.range().start(), format!("{q}.{n} is not a type"));
                    Ty::Invalid
                } else {
                    self.error(ctx, name.text_range().start(), format!("undefined: {q}.{n}"));
                    Ty::Invalid
                }
            }
            Some(_) => {
                self.error(ctx, qualifier.text_range().start(), format!("{q} is not a package"));
                Ty::Invalid
            }
            None => {
                self.error(ctx, qualifier.text_range().start(), format!("undefined: {q}"));
                Ty::Invalid
            }
        }
    }

    fn struct_type(&mut self, ctx: &mut Ctx, st: &StructType) -> StructTy {
        let mut fields = Vec::new();
        let mut seen = FxHashSet::default();
        for field in st.fields() {
            let ty = self.opt_type(ctx, field.ty());
            let tag = field.tag().and_then(|t| t.value());
            if field.is_embedded() {
                let Some(name) = field.ty().and_then(|t| embedded_name(&t)) else {
                    continue;
                };
                let at = field.range().start();
                if !seen.insert(name.clone()) {
                    self.error(ctx, at, format!("{name} redeclared"));
                }
                fields.push(FieldTy {
                    name,
                    ty,
                    embedded: true,
                    tag,
                });
                continue;
            }
            for name in field.names() {
                let text = SmolStr::new(name.text());
                if !seen.insert(text.clone()) {
                    self.error(ctx, name.range().start(), format!("{text} redeclared"));
                }
                fields.push(FieldTy {
                    name: text,
                    ty: ty.clone(),
                    embedded: false,
                    tag: tag.clone(),
                });
            }
        }
        StructTy { fields }
    }

    fn interface_type(&mut self, ctx: &mut Ctx, it: &InterfaceType) -> InterfaceTy {
        let mut methods = Vec::new();
        let mut seen = FxHashSet::default();
        for method in it.methods() {
            let Some(name) = method.name() else { continue };
            let text = SmolStr::new(name.text());
            let signature = self.signature(ctx, method.params(), method.results());
            if !seen.insert(text.clone()) {
                self.error(ctx, name.range().start(), format!("duplicate method {text}"));
                continue;
            }
            methods.push(MethodTy {
                name: text,
                signature,
            });
        }
        InterfaceTy { methods }
    }

    fn signature(
        &mut self,
        ctx: &mut Ctx,
        params: Option<ParamList>,
        results: Option<ResultList>,
    ) -> Signature {
        let params = params
            .map(|list| list.types().collect::<Vec<_>>())
            .unwrap_or_default()
            .iter()
            .map(|ty| self.resolve_type(ctx, ty))
            .collect();
        let results = results
            .map(|list| list.types().collect::<Vec<_>>())
            .unwrap_or_default()
            .iter()
            .map(|ty| self.resolve_type(ctx, ty))
            .collect();
        Signature { params, results }
    }

    // ========================================================================
    // NAMED TYPES
    // ========================================================================

    /// Resolve a declared type of this package, returning its underlying type
    pub(super) fn resolve_named(&mut self, name: &SmolStr) -> Ty {
        match self.states.get(name) {
            Some(DeclState::Done) => {
                return self.surface.types.get(name).cloned().unwrap_or(Ty::Invalid);
            }
            Some(DeclState::InProgress) => {
                self.report_cycle(name);
                return Ty::Invalid;
            }
            None => {}
        }
        let Some(Decl::Type { file, spec }) = self.decls.get(name).cloned() else {
            return Ty::Invalid;
        };
        self.states.insert(name.clone(), DeclState::InProgress);
        let mut ctx = Ctx::source(file);
        let rhs = self.opt_type(&mut ctx, spec.ty());
        let underlying = self.underlying(&rhs);
        self.flush(ctx);
        self.states.insert(name.clone(), DeclState::Done);
        self.surface.types.insert(name.clone(), underlying.clone());
        underlying
    }

    pub(super) fn underlying(&mut self, ty: &Ty) -> Ty {
        match ty {
            Ty::Named(named) if named.package == self.path => self.resolve_named(&named.name),
            Ty::Named(named) => self
                .surface
                .underlying(named)
                .cloned()
                .unwrap_or(Ty::Invalid),
            other => other.clone(),
        }
    }

    fn report_cycle(&mut self, name: &SmolStr) {
        if !self.reported_cycles.insert(name.clone()) {
            return;
        }
        let Some(decl) = self.decls.get(name) else {
            return;
        };
        let (file, at) = (decl.file(), decl.name_at());
        self.error_in(file, CoordSpace::Source, at, format!("invalid recursive type {name}"));
    }

    /// Report struct types that contain themselves by value
    pub(super) fn check_cycles(&mut self) {
        let names: Vec<SmolStr> = self
            .decls
            .iter()
            .filter(|(_, decl)| matches!(decl, Decl::Type { .. }))
            .map(|(name, _)| name.clone())
            .collect();
        for name in names {
            if self.reported_cycles.contains(&name) {
                continue;
            }
            let mut path = Vec::new();
            let mut visited = FxHashSet::default();
            if self.contains_by_value(&name, &name, &mut path, &mut visited) {
                self.report_cycle(&name);
                self.reported_cycles.extend(path);
            }
        }
    }

    fn contains_by_value(
        &self,
        current: &SmolStr,
        target: &SmolStr,
        path: &mut Vec<SmolStr>,
        visited: &mut FxHashSet<SmolStr>,
    ) -> bool {
        let Some(underlying) = self.surface.types.get(current) else {
            return false;
        };
        let mut refs = Vec::new();
        self.value_refs(underlying, &mut refs);
        for next in refs {
            if &next == target {
                return true;
            }
            if visited.insert(next.clone()) {
                path.push(next.clone());
                if self.contains_by_value(&next, target, path, visited) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }

    /// Local named types stored inline in a value of `ty`
    fn value_refs(&self, ty: &Ty, out: &mut Vec<SmolStr>) {
        match ty {
            Ty::Named(named) if named.package == self.path => out.push(named.name.clone()),
            Ty::Struct(st) => {
                for field in &st.fields {
                    self.value_refs(&field.ty, out);
                }
            }
            _ => {}
        }
    }

    // ========================================================================
    // MAP KEYS
    // ========================================================================

    pub(super) fn check_map_keys(&mut self) {
        for key in std::mem::take(&mut self.pending_keys) {
            if !self.comparable(&key.ty, &mut FxHashSet::default()) {
                let message = format!("invalid map key type {}", key.ty.display(&self.path));
                self.error_in(key.file, key.space, key.at, message);
            }
        }
    }

    fn comparable(&mut self, ty: &Ty, seen: &mut FxHashSet<NamedRef>) -> bool {
        match ty {
            Ty::Invalid | Ty::Basic(_) | Ty::Pointer(_) | Ty::Chan(_) | Ty::Interface(_) => true,
            Ty::Slice(_) | Ty::Map(..) | Ty::Func(_) => false,
            Ty::Struct(st) => st.fields.iter().all(|f| self.comparable(&f.ty, seen)),
            Ty::Named(named) => {
                if !seen.insert(named.clone()) {
                    return true;
                }
                let underlying = self.underlying(ty);
                self.comparable(&underlying, seen)
            }
        }
    }
}

/// Field name of an embedded type: `T`, `pkg.T` and `*T` all embed as `T`
fn embedded_name(ty: &Type) -> Option<SmolStr> {
    match ty {
        Type::Name(name) => Some(SmolStr::new(name.text())),
        Type::Selector(selector) => selector.name().map(|n| SmolStr::new(n.text())),
        Type::Pointer(pointer) => embedded_name(&pointer.elem()?),
        _ => None,
    }
}
