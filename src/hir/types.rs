//! The type model: types, constant values and package surfaces.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

/// Predeclared basic types, including the untyped constant kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Bool,
    String,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    UntypedBool,
    UntypedInt,
    UntypedFloat,
    UntypedString,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint => "uint",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::UntypedBool => "untyped bool",
            Self::UntypedInt => "untyped int",
            Self::UntypedFloat => "untyped float",
            Self::UntypedString => "untyped string",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            Self::UntypedBool | Self::UntypedInt | Self::UntypedFloat | Self::UntypedString
        )
    }

    pub fn is_bool(self) -> bool {
        matches!(self, Self::Bool | Self::UntypedBool)
    }

    pub fn is_string(self) -> bool {
        matches!(self, Self::String | Self::UntypedString)
    }

    pub fn is_integer(self) -> bool {
        self.int_range().is_some() || self == Self::UntypedInt
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64 | Self::UntypedFloat)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Inclusive value range of a typed integer kind
    pub fn int_range(self) -> Option<(i128, i128)> {
        Some(match self {
            Self::Int8 => (i8::MIN.into(), i8::MAX.into()),
            Self::Int16 => (i16::MIN.into(), i16::MAX.into()),
            Self::Int32 => (i32::MIN.into(), i32::MAX.into()),
            Self::Int | Self::Int64 => (i64::MIN.into(), i64::MAX.into()),
            Self::Uint8 => (0, u8::MAX.into()),
            Self::Uint16 => (0, u16::MAX.into()),
            Self::Uint32 => (0, u32::MAX.into()),
            Self::Uint | Self::Uint64 => (0, u64::MAX.into()),
            _ => return None,
        })
    }
}

/// A reference to a declared type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedRef {
    /// Import path of the declaring package
    pub package: SmolStr,
    /// Name of the declaring package, used to qualify the type in messages
    pub package_name: SmolStr,
    pub name: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    Invalid,
    Basic(BasicKind),
    Named(NamedRef),
    Slice(Box<Ty>),
    Map(Box<Ty>, Box<Ty>),
    Pointer(Box<Ty>),
    Chan(Box<Ty>),
    Func(Signature),
    Struct(StructTy),
    Interface(InterfaceTy),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<Ty>,
    pub results: Vec<Ty>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StructTy {
    pub fields: Vec<FieldTy>,
}

impl StructTy {
    pub fn field(&self, name: &str) -> Option<&FieldTy> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldTy {
    pub name: SmolStr,
    pub ty: Ty,
    pub embedded: bool,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InterfaceTy {
    pub methods: Vec<MethodTy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodTy {
    pub name: SmolStr,
    pub signature: Signature,
}

impl Ty {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Ty::Invalid)
    }

    pub fn as_basic(&self) -> Option<BasicKind> {
        match self {
            Ty::Basic(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Render the type as seen from inside package `current`
    pub fn display<'a>(&'a self, current: &'a str) -> TyDisplay<'a> {
        TyDisplay { ty: self, current }
    }
}

pub struct TyDisplay<'a> {
    ty: &'a Ty,
    current: &'a str,
}

impl fmt::Display for TyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current;
        match self.ty {
            Ty::Invalid => f.write_str("invalid type"),
            Ty::Basic(kind) => f.write_str(kind.name()),
            Ty::Named(named) if named.package == current => f.write_str(&named.name),
            Ty::Named(named) => write!(f, "{}.{}", named.package_name, named.name),
            Ty::Slice(elem) => write!(f, "[]{}", elem.display(current)),
            Ty::Map(key, value) => {
                write!(f, "map[{}]{}", key.display(current), value.display(current))
            }
            Ty::Pointer(elem) => write!(f, "*{}", elem.display(current)),
            Ty::Chan(elem) => write!(f, "chan {}", elem.display(current)),
            Ty::Func(sig) => {
                f.write_str("func")?;
                write_signature(f, sig, current)
            }
            Ty::Struct(st) => {
                f.write_str("struct{")?;
                for (i, field) in st.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    if field.embedded {
                        write!(f, "{}", field.ty.display(current))?;
                    } else {
                        write!(f, "{} {}", field.name, field.ty.display(current))?;
                    }
                }
                f.write_str("}")
            }
            Ty::Interface(it) => {
                f.write_str("interface{")?;
                for (i, method) in it.methods.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    f.write_str(&method.name)?;
                    write_signature(f, &method.signature, current)?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_signature(f: &mut fmt::Formatter<'_>, sig: &Signature, current: &str) -> fmt::Result {
    let list = |tys: &[Ty]| {
        tys.iter()
            .map(|t| t.display(current).to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    write!(f, "({})", list(&sig.params))?;
    match sig.results.as_slice() {
        [] => Ok(()),
        [single] => write!(f, " {}", single.display(current)),
        many => write!(f, " ({})", list(many)),
    }
}

/// Value of a constant expression
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i128),
    Float(f64),
    String(String),
}

impl ConstValue {
    /// The untyped kind a literal of this value has
    pub fn untyped_kind(&self) -> BasicKind {
        match self {
            Self::Bool(_) => BasicKind::UntypedBool,
            Self::Int(_) => BasicKind::UntypedInt,
            Self::Float(_) => BasicKind::UntypedFloat,
            Self::String(_) => BasicKind::UntypedString,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// What an expression denotes
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Type,
    Constant(ConstValue),
    Value,
}

/// The type of an expression and, for constants, its value
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAndValue {
    pub mode: Mode,
    pub ty: Ty,
}

impl TypeAndValue {
    pub fn type_of(ty: Ty) -> Self {
        Self {
            mode: Mode::Type,
            ty,
        }
    }

    pub fn constant(ty: Ty, value: ConstValue) -> Self {
        Self {
            mode: Mode::Constant(value),
            ty,
        }
    }

    pub fn value(ty: Ty) -> Self {
        Self {
            mode: Mode::Value,
            ty,
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self.mode, Mode::Type)
    }

    pub fn const_value(&self) -> Option<&ConstValue> {
        match &self.mode {
            Mode::Constant(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDef {
    pub ty: Ty,
    pub value: ConstValue,
}

/// Everything another package can see of a checked package
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageSurface {
    pub path: SmolStr,
    pub name: SmolStr,
    /// Declared types and their underlying types
    pub types: IndexMap<SmolStr, Ty>,
    pub consts: IndexMap<SmolStr, ConstDef>,
    /// Surfaces of the packages this one imports, so foreign named types
    /// reachable through this package can be expanded
    pub imports: IndexMap<SmolStr, Arc<PackageSurface>>,
}

impl PackageSurface {
    pub fn new(path: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Find the surface of `path` among this package and its dependencies
    pub fn find(&self, path: &str) -> Option<&PackageSurface> {
        self.find_within(path, 0)
    }

    fn find_within(&self, path: &str, depth: usize) -> Option<&PackageSurface> {
        if self.path == path {
            return Some(self);
        }
        if depth > 64 {
            return None;
        }
        if let Some(direct) = self.imports.get(path) {
            return Some(direct);
        }
        self.imports
            .values()
            .find_map(|dep| dep.find_within(path, depth + 1))
    }

    /// Underlying type of a named type reachable from this package
    pub fn underlying(&self, named: &NamedRef) -> Option<&Ty> {
        self.find(&named.package)?.types.get(&named.name)
    }

    pub fn named(&self, name: &str) -> NamedRef {
        NamedRef {
            package: self.path.clone(),
            package_name: self.name.clone(),
            name: SmolStr::new(name),
        }
    }
}

/// Whether a name is visible outside its package
pub fn is_exported(name: &str) -> bool {
    name.starts_with(|c: char| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_qualifies_foreign_types() {
        let named = Ty::Named(NamedRef {
            package: "example.com/a".into(),
            package_name: "a".into(),
            name: "T".into(),
        });
        let map = Ty::Map(Box::new(Ty::Basic(BasicKind::String)), Box::new(named.clone()));
        assert_eq!(map.display("example.com/b").to_string(), "map[string]a.T");
        assert_eq!(named.display("example.com/a").to_string(), "T");
    }

    #[test]
    fn test_find_reaches_transitive_dependencies() {
        let mut c = PackageSurface::new("example.com/c", "c");
        c.types.insert("U".into(), Ty::Basic(BasicKind::Int));
        let mut b = PackageSurface::new("example.com/b", "b");
        b.imports.insert(c.path.clone(), Arc::new(c.clone()));
        let mut a = PackageSurface::new("example.com/a", "a");
        a.imports.insert(b.path.clone(), Arc::new(b));
        assert_eq!(
            a.underlying(&c.named("U")),
            Some(&Ty::Basic(BasicKind::Int))
        );
    }

    #[test]
    fn test_basic_kind_ranges() {
        assert_eq!(BasicKind::Uint8.int_range(), Some((0, 255)));
        assert!(BasicKind::UntypedInt.is_integer());
        assert!(!BasicKind::Float64.is_integer());
    }
}
