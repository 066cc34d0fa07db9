//! Generic tree navigation
//!
//! The query engine is written against this trait rather than a
//! concrete tree, so a path expression can run over any tree shape
//! that can answer these questions - the arena DOM is just the
//! default instantiation.

use crate::dom::{NodeId, NodeKind, XmlDocument};

/// Capability interface over a tree of XML-like nodes.
///
/// `Node` is a cheap handle (an arena index, a reference, ...); all
/// navigation goes through the implementor, which typically holds the
/// actual tree storage.
pub trait Nav {
    /// Node handle type.
    type Node: Copy;

    /// Kind of a node.
    fn kind(&self, node: Self::Node) -> NodeKind;

    /// Name of a node (tag name, attribute name, PI target, ...).
    fn name(&self, node: Self::Node) -> Option<&str>;

    /// Parent node. `None` for the document root and for attributes.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Previous sibling.
    fn prev_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    /// Next sibling.
    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    /// Attribute node of an element, by name.
    fn attribute(&self, node: Self::Node, name: &str) -> Option<Self::Node>;

    /// Attribute value of an element, by name.
    fn attr_value(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// All attribute nodes of an element, in source order.
    fn attributes(&self, node: Self::Node) -> Vec<Self::Node>;

    /// All children, in document order (attributes excluded).
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;
}

impl Nav for XmlDocument {
    type Node = NodeId;

    fn kind(&self, node: NodeId) -> NodeKind {
        XmlDocument::kind(self, node)
    }

    fn name(&self, node: NodeId) -> Option<&str> {
        XmlDocument::name(self, node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent_of(node)
    }

    fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        XmlDocument::prev_sibling(self, node)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        XmlDocument::next_sibling(self, node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<NodeId> {
        XmlDocument::attribute(self, node, name)
    }

    fn attr_value(&self, node: NodeId, name: &str) -> Option<&str> {
        XmlDocument::attr_value(self, node, name)
    }

    fn attributes(&self, node: NodeId) -> Vec<NodeId> {
        XmlDocument::attributes(self, node).collect()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        XmlDocument::children(self, node).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dom_nav() {
        let doc = XmlDocument::parse(r#"<a one="1"><b/><b/></a>"#).unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(Nav::kind(&doc, a), NodeKind::Element);
        assert_eq!(Nav::name(&doc, a), Some("a"));
        assert_eq!(Nav::children(&doc, a).len(), 2);
        assert_eq!(Nav::attributes(&doc, a).len(), 1);
        assert_eq!(Nav::attr_value(&doc, a, "one"), Some("1"));
        let b = Nav::children(&doc, a)[0];
        assert_eq!(Nav::parent(&doc, b), Some(a));
        assert_eq!(Nav::next_sibling(&doc, b), Nav::children(&doc, a).get(1).copied());
    }
}
