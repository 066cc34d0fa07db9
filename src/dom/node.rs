//! XML node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into the document arena)
pub type NodeId = u32;

/// Kind of an XML node.
///
/// This is a closed set; every offset rule of the position scanner and
/// every node test of the query engine dispatches exhaustively on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Attribute of an element
    Attribute,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
    /// Document type declaration
    DocumentType,
    /// Reference to an entity the parser could not expand
    EntityReference,
}

/// An XML node in the arena.
///
/// Attribute nodes are stored in the same arena as every other node,
/// directly after their owner element; they are reachable through the
/// `attr_start`/`attr_count` range of the element, never through the
/// child/sibling links. For an attribute, `parent` holds the owner
/// element; the public `parent_of` accessor hides it, matching DOM
/// semantics (see [`crate::dom::XmlDocument::owner_element`]).
#[derive(Debug, Clone)]
pub struct XmlNode {
    /// Kind of this node
    pub kind: NodeKind,
    /// Parent node (None for the document root); owner for attributes
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// String pool index of the name: element tag name, attribute
    /// name, PI target, doctype name, or entity name. 0 if none.
    pub name_id: u32,
    /// String pool index of the value: text/CDATA/comment content,
    /// attribute value, or PI data. 0 if none.
    pub value_id: u32,
    /// First attribute of an element (arena index)
    pub attr_start: u32,
    /// Number of attributes
    pub attr_count: u16,
}

impl XmlNode {
    fn blank(kind: NodeKind, parent: Option<NodeId>) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            value_id: 0,
            attr_start: 0,
            attr_count: 0,
        }
    }

    /// Create a new document root node
    pub fn document() -> Self {
        XmlNode::blank(NodeKind::Document, None)
    }

    /// Create a new element node
    pub fn element(name_id: u32, parent: Option<NodeId>) -> Self {
        XmlNode {
            name_id,
            ..XmlNode::blank(NodeKind::Element, parent)
        }
    }

    /// Create a new attribute node owned by `owner`
    pub fn attribute(name_id: u32, value_id: u32, owner: NodeId) -> Self {
        XmlNode {
            name_id,
            value_id,
            ..XmlNode::blank(NodeKind::Attribute, Some(owner))
        }
    }

    /// Create a new text node
    pub fn text(value_id: u32, parent: Option<NodeId>) -> Self {
        XmlNode {
            value_id,
            ..XmlNode::blank(NodeKind::Text, parent)
        }
    }

    /// Create a new CDATA node
    pub fn cdata(value_id: u32, parent: Option<NodeId>) -> Self {
        XmlNode {
            value_id,
            ..XmlNode::blank(NodeKind::CData, parent)
        }
    }

    /// Create a new comment node
    pub fn comment(value_id: u32, parent: Option<NodeId>) -> Self {
        XmlNode {
            value_id,
            ..XmlNode::blank(NodeKind::Comment, parent)
        }
    }

    /// Create a processing instruction node
    pub fn processing_instruction(name_id: u32, value_id: u32, parent: Option<NodeId>) -> Self {
        XmlNode {
            name_id,
            value_id,
            ..XmlNode::blank(NodeKind::ProcessingInstruction, parent)
        }
    }

    /// Create a document type node
    pub fn document_type(name_id: u32, parent: Option<NodeId>) -> Self {
        XmlNode {
            name_id,
            ..XmlNode::blank(NodeKind::DocumentType, parent)
        }
    }

    /// Create an entity reference node
    pub fn entity_reference(name_id: u32, parent: Option<NodeId>) -> Self {
        XmlNode {
            name_id,
            ..XmlNode::blank(NodeKind::EntityReference, parent)
        }
    }

    /// Check if this is an element node
    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    /// Check if this node has attributes
    #[inline]
    pub fn has_attributes(&self) -> bool {
        self.attr_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let doc = XmlNode::document();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.parent.is_none());
        assert!(!doc.has_children());
    }

    #[test]
    fn test_element_node() {
        let elem = XmlNode::element(1, Some(0));
        assert_eq!(elem.kind, NodeKind::Element);
        assert_eq!(elem.parent, Some(0));
        assert_eq!(elem.name_id, 1);
        assert!(elem.is_element());
    }

    #[test]
    fn test_attribute_node() {
        let attr = XmlNode::attribute(2, 3, 1);
        assert_eq!(attr.kind, NodeKind::Attribute);
        assert_eq!(attr.parent, Some(1));
        assert_eq!(attr.value_id, 3);
    }
}
