//! XML document - arena-based DOM representation
//!
//! Owns the original source text alongside the node arena, so that
//! positions can be recovered later: the text the scanner sees is
//! character-for-character the text the builder parsed.

use super::builder::{self, ParseError, ParseOptions};
use super::node::{NodeId, NodeKind, XmlNode};
use super::strings::StringPool;
use crate::path::{PathQuery, PathSyntaxError};

/// An XML document stored in arena format.
///
/// Nodes are addressed by [`NodeId`]; id [`XmlDocument::DOCUMENT`] is
/// always the document root.
pub struct XmlDocument {
    /// Original source text, exactly as parsed
    source: String,
    /// Arena of nodes (attributes included)
    nodes: Vec<XmlNode>,
    /// Interned names and values
    strings: StringPool,
}

impl XmlDocument {
    /// Id of the document root node.
    pub const DOCUMENT: NodeId = 0;

    /// Parse an XML document with default options.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Self::parse_with_options(text, ParseOptions::default())
    }

    /// Parse an XML document.
    pub fn parse_with_options(text: &str, options: ParseOptions) -> Result<Self, ParseError> {
        let built = builder::build(text, options)?;
        Ok(XmlDocument {
            source: text.to_string(),
            nodes: built.nodes,
            strings: built.strings,
        })
    }

    /// The source text this document was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id as usize]
    }

    /// Kind of a node.
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id as usize].kind
    }

    /// Name of a node: element tag name, attribute name, PI target,
    /// doctype name, or entity reference name.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        let node = &self.nodes[id as usize];
        match node.kind {
            NodeKind::Element
            | NodeKind::Attribute
            | NodeKind::ProcessingInstruction
            | NodeKind::DocumentType
            | NodeKind::EntityReference => Some(self.strings.get(node.name_id)),
            _ => None,
        }
    }

    /// Value of a node: decoded text/CDATA content, comment content,
    /// attribute value, or PI data.
    pub fn value(&self, id: NodeId) -> Option<&str> {
        let node = &self.nodes[id as usize];
        match node.kind {
            NodeKind::Text
            | NodeKind::CData
            | NodeKind::Comment
            | NodeKind::Attribute
            | NodeKind::ProcessingInstruction => Some(self.strings.get(node.value_id)),
            _ => None,
        }
    }

    /// Parent of a node. Attributes have no parent (DOM semantics);
    /// use [`owner_element`](Self::owner_element) for them.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        let node = &self.nodes[id as usize];
        if node.kind == NodeKind::Attribute {
            None
        } else {
            node.parent
        }
    }

    /// Owner element of an attribute node.
    pub fn owner_element(&self, id: NodeId) -> Option<NodeId> {
        let node = &self.nodes[id as usize];
        if node.kind == NodeKind::Attribute {
            node.parent
        } else {
            None
        }
    }

    /// Previous sibling of a node.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id as usize].prev_sibling
    }

    /// Next sibling of a node.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id as usize].next_sibling
    }

    /// Last child of a node.
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id as usize].last_child
    }

    /// Children of a node, in document order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.nodes[id as usize].first_child,
        }
    }

    /// Attribute nodes of an element, in source order.
    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let node = &self.nodes[id as usize];
        node.attr_start..node.attr_start + node.attr_count as u32
    }

    /// Attribute node of an element, by name.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.attributes(id)
            .find(|&a| self.strings.get(self.nodes[a as usize].name_id) == name)
    }

    /// Attribute value of an element, by name.
    pub fn attr_value(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attribute(id, name)
            .map(|a| self.strings.get(self.nodes[a as usize].value_id))
    }

    /// The root element.
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(Self::DOCUMENT)
            .find(|&c| self.nodes[c as usize].is_element())
    }

    /// Run a path query against this document, starting at the
    /// document node, and collect the matches in document order.
    ///
    /// Convenience for tests and one-shot lookups; parse the query
    /// once with [`PathQuery::parse`] when evaluating it repeatedly.
    pub fn select(&self, expression: &str) -> Result<Vec<NodeId>, PathSyntaxError> {
        let query = PathQuery::cached(expression)?;
        Ok(query.evaluate(self, Self::DOCUMENT).collect())
    }
}

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a XmlDocument,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.doc.nodes[id as usize].next_sibling;
        Some(id)
    }
}
