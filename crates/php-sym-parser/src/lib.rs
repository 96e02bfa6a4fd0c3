//! PHP symbol extraction for php-sym.
//!
//! Wraps tree-sitter-php for incremental parsing and turns each parsed
//! document into a symbol tree plus a flat reference list through one
//! ordered walk over the CST.

pub mod collection;
pub mod document;
pub mod pass;
pub mod phpdoc;
pub mod resolver;
pub mod typestr;

mod transform;

pub use document::Document;
pub use pass::{extract_document_symbols, DocumentSymbols};
