//! DOM module - arena-based XML document
//!
//! Implements a position-friendly DOM representation using:
//! - Arena allocation for nodes, NodeId (u32) indices for traversal
//! - String interning for names and values
//! - An owned copy of the source text, kept for position recovery
//!
//! The builder keeps every construct the position scanner relocates:
//! comments, CDATA, processing instructions, the doctype,
//! whitespace-only text, and unexpandable entity references.

pub mod builder;
pub mod document;
pub mod entities;
pub mod node;
pub mod strings;

pub use builder::{ParseError, ParseOptions};
pub use document::{Children, XmlDocument};
pub use node::{NodeId, NodeKind, XmlNode};
pub use strings::StringPool;
