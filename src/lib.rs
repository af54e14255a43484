//! # gunkls-base
//!
//! Editor backend for the Gunk IDL: an incremental package loader, a type
//! checker, validation, a canonical formatter and go-to-definition.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! server    → Request-level lock, diagnostics publishing
//!   ↓
//! ide       → Formatting, go-to-definition, lints
//!   ↓
//! loader    → Package graph: states, overrides, invalidation
//!   ↓
//! hir       → Type checker, validation, diagnostics
//!   ↓
//! project   → Host module layout, overlay placeholders
//!   ↓
//! syntax    → Tags, struct tags, formatter
//!   ↓
//! parser    → Logos lexer, rowan CST, typed AST
//!   ↓
//! base      → Positions, line index, constants
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → syntax → project → hir → loader → ide → server)
// ============================================================================

/// Foundation types: positions, line index, TextRange
pub mod base;

/// Parser: Logos lexer, rowan CST, typed AST wrappers
pub mod parser;

/// Syntax layers: `+gunk` tags, struct tags, formatter
pub mod syntax;

/// Project layout: module roots, package listing, overlay
pub mod project;

/// High-level IR: type checking and validation
pub mod hir;

/// Package graph
pub mod loader;

/// IDE features: formatting, go-to-definition, lints
pub mod ide;

/// Server configuration
pub mod config;

/// Transport-free editor protocol surface
pub mod server;

// Re-export foundation types
pub use base::{LineCol, LineIndex, Position, Span, TextRange, TextSize};

pub use config::Config;
pub use hir::{Diagnostic, Severity};
pub use ide::{Location, TextEdit};
pub use loader::{Loader, PackageState};
pub use server::Server;
