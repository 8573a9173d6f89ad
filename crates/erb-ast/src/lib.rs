//! AST definitions for the HTML+ERB parser
//!
//! Provides the document tree produced by the parser and rewritten by the
//! analysis passes:
//!
//! - `ast`: the node variants and their payload structs
//! - `analyzed`: the per-fragment embedded-code analysis record

pub mod analyzed;
pub mod ast;
mod printer;

pub use analyzed::AnalyzedRuby;
pub use ast::*;
pub use erb_position_tracking::{Location, Position, Span};
