//! Predeclared names and the built-in standard-library surfaces.

use smol_str::SmolStr;

use super::types::{BasicKind, ConstDef, ConstValue, InterfaceTy, PackageSurface, StructTy, Ty};

/// A name predeclared in every package
#[derive(Debug, Clone, PartialEq)]
pub enum Predeclared {
    Type(Ty),
    Const(Ty, ConstValue),
    Iota,
}

pub fn lookup(name: &str) -> Option<Predeclared> {
    let basic = |kind| Some(Predeclared::Type(Ty::Basic(kind)));
    match name {
        "bool" => basic(BasicKind::Bool),
        "string" => basic(BasicKind::String),
        "int" => basic(BasicKind::Int),
        "int8" => basic(BasicKind::Int8),
        "int16" => basic(BasicKind::Int16),
        "int32" | "rune" => basic(BasicKind::Int32),
        "int64" => basic(BasicKind::Int64),
        "uint" => basic(BasicKind::Uint),
        "uint8" | "byte" => basic(BasicKind::Uint8),
        "uint16" => basic(BasicKind::Uint16),
        "uint32" => basic(BasicKind::Uint32),
        "uint64" => basic(BasicKind::Uint64),
        "float32" => basic(BasicKind::Float32),
        "float64" => basic(BasicKind::Float64),
        "any" => Some(Predeclared::Type(Ty::Interface(InterfaceTy::default()))),
        "true" => Some(Predeclared::Const(
            Ty::Basic(BasicKind::UntypedBool),
            ConstValue::Bool(true),
        )),
        "false" => Some(Predeclared::Const(
            Ty::Basic(BasicKind::UntypedBool),
            ConstValue::Bool(false),
        )),
        "iota" => Some(Predeclared::Iota),
        _ => None,
    }
}

/// Type-only surface of a standard-library package, for the packages
/// IDL sources are allowed to import.
pub fn std_package(path: &str) -> Option<PackageSurface> {
    match path {
        "time" => Some(time_package()),
        _ => None,
    }
}

fn time_package() -> PackageSurface {
    let mut pkg = PackageSurface::new("time", "time");
    pkg.types.insert("Time".into(), Ty::Struct(StructTy::default()));
    pkg.types.insert("Duration".into(), Ty::Basic(BasicKind::Int64));
    pkg.types.insert("Month".into(), Ty::Basic(BasicKind::Int));
    pkg.types.insert("Weekday".into(), Ty::Basic(BasicKind::Int));

    let duration = Ty::Named(pkg.named("Duration"));
    let units = [
        ("Nanosecond", 1i128),
        ("Microsecond", 1_000),
        ("Millisecond", 1_000_000),
        ("Second", 1_000_000_000),
        ("Minute", 60_000_000_000),
        ("Hour", 3_600_000_000_000),
    ];
    for (name, value) in units {
        pkg.consts.insert(
            SmolStr::new(name),
            ConstDef {
                ty: duration.clone(),
                value: ConstValue::Int(value),
            },
        );
    }

    let month = Ty::Named(pkg.named("Month"));
    let months = [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ];
    for (i, name) in months.into_iter().enumerate() {
        pkg.consts.insert(
            SmolStr::new(name),
            ConstDef {
                ty: month.clone(),
                value: ConstValue::Int(i as i128 + 1),
            },
        );
    }

    let weekday = Ty::Named(pkg.named("Weekday"));
    let days = [
        "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
    ];
    for (i, name) in days.into_iter().enumerate() {
        pkg.consts.insert(
            SmolStr::new(name),
            ConstDef {
                ty: weekday.clone(),
                value: ConstValue::Int(i as i128),
            },
        );
    }
    pkg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_share_basic_types() {
        assert_eq!(lookup("byte"), lookup("uint8"));
        assert_eq!(lookup("rune"), lookup("int32"));
        assert_eq!(lookup("Foo"), None);
    }

    #[test]
    fn test_time_surface() {
        let time = std_package("time").unwrap();
        assert!(time.types.contains_key("Duration"));
        assert_eq!(time.consts["March"].value, ConstValue::Int(3));
        assert!(std_package("net/http").is_none());
    }
}
