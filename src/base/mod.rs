//! Foundation types for the Gunk toolchain.
//!
//! This module provides the coordinate models used throughout the crate:
//! - [`TextRange`], [`TextSize`] - byte offsets into a source text
//! - [`LineCol`], [`LineIndex`] - byte-based line/column conversion
//! - [`Position`], [`Span`] - editor coordinates (0-indexed, UTF-16 columns)
//!
//! This module has NO dependencies on other gunkls modules.

mod line_index;
mod position;

pub use line_index::{LineCol, LineIndex};
pub use position::{Position, Span};

pub use text_size::{TextRange, TextSize};

/// File extension of IDL sources.
pub const IDL_EXTENSION: &str = "gunk";

/// File extension of host-language sources.
pub const HOST_EXTENSION: &str = "go";

/// Name of the module manifest that roots a host module.
pub const MANIFEST_FILE: &str = "go.mod";

/// Name of the synthetic host file added to IDL-only directories.
pub const PLACEHOLDER_FILE: &str = "gunkpkg.go";

/// Marker that starts a tag line inside a documentation comment.
pub const TAG_MARKER: &str = "+gunk";
