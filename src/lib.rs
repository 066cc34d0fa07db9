//! xmloc - source positions and path queries for parsed XML
//!
//! Two things a generic XML parser does not give you:
//!
//! - **Position recovery**: the exact line/column span of any node of
//!   an already-parsed tree, recomputed from the original source text
//!   and the tree's structure alone - including the entity and CDATA
//!   edge cases the parser decoded away ([`PositionScanner`]).
//! - **Path queries**: a compact, embeddable path language for
//!   selecting nodes out of a tree - child/attribute/self axes with
//!   positional and attribute-equality predicates ([`PathQuery`]).
//!
//! ```
//! use xmloc::{PathQuery, PositionScanner, XmlDocument};
//!
//! let source = "<pets>\n  <cat name=\"momo\"/>\n</pets>";
//! let doc = XmlDocument::parse(source).unwrap();
//!
//! let cat = PathQuery::parse("pets/cat").unwrap()
//!     .first(&doc, XmlDocument::DOCUMENT)
//!     .unwrap();
//!
//! let mut scanner = PositionScanner::with_system_id(&doc, "pets.xml");
//! let pos = scanner.position_of(cat);
//! assert_eq!((pos.line(), pos.column()), (2, 3));
//! ```
//!
//! The query engine runs over anything implementing [`Nav`]; the
//! bundled arena DOM is just the default instantiation. The scanner
//! never fails: a node it cannot locate gets an
//! [undefined](text::Position::is_undefined) position, and
//! diagnostics degrade to a header-only message.

pub mod dom;
pub mod locate;
pub mod nav;
pub mod path;
pub mod report;
pub mod text;

pub use dom::{NodeId, NodeKind, ParseError, ParseOptions, XmlDocument};
pub use locate::PositionScanner;
pub use nav::Nav;
pub use path::{PathQuery, PathSyntaxError};
pub use report::{ContextLines, Diagnostic, MessageKind, Severity};
pub use text::{Position, TextIndex};

#[cfg(test)]
mod tests {
    use super::*;

    /// End to end: select a node, recover its position, render a
    /// source-annotated diagnostic.
    #[test]
    fn test_locate_and_report() {
        let source = "<config>\n  <server port=\"eighty\"/>\n</config>";
        let doc = XmlDocument::parse(source).unwrap();

        let port = doc.select("config/server/@port").unwrap()[0];
        assert_eq!(doc.value(port), Some("eighty"));

        let mut scanner = PositionScanner::with_system_id(&doc, "config.xml");
        let pos = scanner.position_of(port);
        let context = scanner.context_lines(&pos, 2);
        let diagnostic = Diagnostic::new(
            Severity::Error,
            MessageKind::Validation,
            pos,
            "expected an integer",
        );
        let rendered = diagnostic.render(context.as_ref());

        let expected = "\
Error (XML validation) in config.xml
 1| <config>
 2|   <server port=\"eighty\"/>
              ^^^^ expected an integer

 3| </config>";
        assert_eq!(rendered, expected);
    }

    /// An unlocatable node degrades to a header-only diagnostic.
    #[test]
    fn test_degraded_diagnostic() {
        let doc = XmlDocument::parse("<!DOCTYPE r>\n<r/>").unwrap();
        let r = doc.root_element().unwrap();
        let mut scanner = PositionScanner::with_system_id(&doc, "d.xml");
        let pos = scanner.position_of(r);
        assert!(pos.is_undefined());

        let context = scanner.context_lines(&pos, 2);
        let diagnostic =
            Diagnostic::new(Severity::Warning, MessageKind::Processing, pos, "hm");
        assert_eq!(
            diagnostic.render(context.as_ref()),
            "Warning (XML processing) in d.xml\nhm"
        );
    }
}
