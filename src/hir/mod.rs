//! High-level IR (HIR): the semantic model of a package.
//!
//! Everything here works on parsed files and knows nothing about disks or
//! editors. Dependencies are reached through the [`Importer`] capability,
//! so checking one package can load and check another on demand.
//!
//! ## Key Types
//!
//! - [`Ty`], [`PackageSurface`]: types and what a package exports
//! - [`check`]: the type checker, producing a [`CheckResult`]
//! - [`validate`]: Gunk rules on struct fields and package names
//! - [`Error`], [`Diagnostic`]: analysis errors and their wire shape
//!
//! ## Flow
//!
//! ```text
//! files ──► check_package_names / validate ──► Violation
//!   │
//!   ▼
//! check(importer) ──► RawError (Source | Tag coordinates)
//!                        │
//!                        ▼
//!                     locate ──► Error ──► Diagnostic
//! ```

mod checker;
mod diagnostics;
mod importer;
mod types;
mod universe;
mod validate;

pub use checker::{CheckResult, CheckedTag, TagTable, TypeTable, check};
pub use diagnostics::{
    CoordSpace, Diagnostic, Error, ErrorKind, RawError, SOURCE, Severity, element_at, locate,
};
pub use importer::{Importer, MapImporter};
pub use types::{
    BasicKind, ConstDef, ConstValue, FieldTy, InterfaceTy, MethodTy, Mode, NamedRef,
    PackageSurface, Signature, StructTy, Ty, TyDisplay, TypeAndValue, is_exported,
};
pub use universe::std_package;
pub use validate::{Violation, check_package_names, validate};
