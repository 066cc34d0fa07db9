//! Node position recovery
//!
//! Recovers the exact source span of any node in an already-parsed
//! tree, from nothing but the original source text and the tree's
//! structure. Offsets are computed lazily and memoized per document
//! in an external side table.

pub mod cache;
pub mod scanner;

pub use cache::{OffsetCache, OffsetField};
pub use scanner::PositionScanner;
