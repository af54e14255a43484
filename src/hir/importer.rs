//! The import capability the type checker depends on.

use std::fmt;
use std::sync::Arc;

use super::types::PackageSurface;

/// Supplies the type surface of an imported package.
///
/// The checker never resolves imports itself: whoever drives it decides
/// how an import path becomes a checked package, including loading and
/// checking it on demand.
pub trait Importer {
    type Error: fmt::Display;

    fn import(&mut self, path: &str) -> Result<Arc<PackageSurface>, Self::Error>;
}

/// Imports from a fixed set of surfaces
#[derive(Debug, Default)]
pub struct MapImporter {
    packages: rustc_hash::FxHashMap<String, Arc<PackageSurface>>,
}

impl MapImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, surface: PackageSurface) {
        self.packages
            .insert(surface.path.to_string(), Arc::new(surface));
    }
}

impl Importer for MapImporter {
    type Error = String;

    fn import(&mut self, path: &str) -> Result<Arc<PackageSurface>, String> {
        if let Some(surface) = self.packages.get(path) {
            return Ok(surface.clone());
        }
        super::universe::std_package(path)
            .map(Arc::new)
            .ok_or_else(|| format!("package {path} is not in std"))
    }
}
