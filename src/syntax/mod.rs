//! Gunk-specific syntax layers on top of the CST: `+gunk` tags in doc
//! comments, Go struct tags and the canonical formatter.

pub mod formatter;
pub mod struct_tag;
pub mod tags;

pub use formatter::{FormatConfig, RewriteError, format_file};
pub use struct_tag::{StructTag, StructTagError};
pub use tags::{DocSplit, Tag, TagSource, collect_tags, doc_text, parse_tags, split_doc};
