//! Error types for host package resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the host toolchain model
#[derive(Debug, Error)]
pub enum HostError {
    #[error("cannot find module providing package {0}")]
    UnknownModule(String),

    #[error("directory {} outside main module or its selected dependencies", .0.display())]
    OutsideModule(PathBuf),

    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walking {}: {message}", root.display())]
    Walk { root: PathBuf, message: String },
}

impl HostError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
