//! Project layout: how directories become packages.
//!
//! [`Host`] models the host toolchain's package resolution over a module
//! tree, and [`Overlay`] supplies the placeholder host files that make
//! IDL-only directories resolvable.

mod error;
mod host;
mod overlay;

pub use error::HostError;
pub use host::{
    Host, HostPackage, ListError, ModuleRoot, files_with_extension, has_host_files, normalize,
    package_clause_name,
};
pub use overlay::Overlay;
pub(crate) use overlay::dir_name;
