//! Error types for package graph operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::project::HostError;

/// Failures resolving a pattern to packages
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error("expected 1 package for {pattern}, got {count}")]
    PackageCount { pattern: String, count: usize },
}

#[derive(Debug, Error)]
pub enum AddFileError {
    #[error("{} is not inside a directory", .0.display())]
    NoParent(PathBuf),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Debug, Error)]
pub enum CloseFileError {
    #[error("could not find loaded package to close {}", .0.display())]
    NotLoaded(PathBuf),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Why an import did not yield a package surface
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("package {0} is not in std")]
    NotInStd(String),

    #[error("import cycle not allowed")]
    Cycle,

    /// The package exists but carries errors; holds the first message
    #[error("{0}")]
    Package(String),
}
