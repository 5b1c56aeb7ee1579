//! Fortran source ingestion for language servers.
//!
//! This crate turns raw Fortran source text, free-form or fixed-form and
//! optionally interleaved with C-preprocessor directives, into a navigable
//! tree of declarations plus diagnostics. The pipeline:
//!
//! ```text
//! bytes -> physical lines -> preprocessed lines -> logical lines
//!       -> recognized statements -> scope tree + diagnostics
//! ```
//!
//! [`SourceFile`] owns the physical lines, applies LSP-style incremental
//! edits, and splices continuation lines; [`parser::process_file`] drives
//! the statement recognizers over the (optionally preprocessed) lines and
//! builds the [`Ast`]. Hover, completion, and navigation layers consume
//! the tree; they are not part of this crate.

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod parser;
pub mod patterns;
pub mod preproc;
pub mod scan;
pub mod source;

pub use ast::{Ast, Scope, ScopeKind, SelectKind, Variable};
pub use config::ParseConfig;
pub use parser::{get_line_context, process_file, LineContext};
pub use source::SourceFile;
