//! Source text model
//!
//! - TextIndex: line-start offset table, offset <-> (line, column) conversion
//! - Position: resolved source location with an undefined sentinel

pub mod index;
pub mod position;

pub use index::TextIndex;
pub use position::Position;
