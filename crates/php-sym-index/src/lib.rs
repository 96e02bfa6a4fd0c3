//! Symbol index for php-sym.
//!
//! Provides the global workspace symbol index and the on-disk cache for
//! extracted symbol trees.

pub mod cache;
pub mod workspace;

pub use cache::{CacheError, SymbolCache};
pub use workspace::WorkspaceIndex;
