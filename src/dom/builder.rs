//! Document builder
//!
//! Single-pass scanner that turns source text into the arena DOM.
//! It preserves everything the position scanner needs to re-locate
//! nodes later: comments, CDATA sections, processing instructions,
//! the doctype, whitespace-only text, and entity reference nodes for
//! entities it cannot expand. It is not a conforming XML processor:
//! no DTD processing, no namespace handling.

use memchr::{memchr, memchr2, memmem};
use thiserror::Error;

use super::entities::{decode_entity, decode_text, is_name_char, is_name_start};
use super::node::{NodeId, XmlNode};
use super::strings::StringPool;

/// Options controlling how a document is built.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Merge CDATA sections into adjacent text nodes instead of
    /// keeping them as distinct nodes.
    pub coalescing: bool,
}

/// Error raised while building a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input ended in the middle of a construct.
    #[error("unexpected end of input while looking for {expected} (at byte {offset})")]
    UnexpectedEof {
        expected: &'static str,
        offset: usize,
    },

    /// An end tag did not match the open element.
    #[error("expected </{expected}>, found </{found}> (at byte {offset})")]
    MismatchedEndTag {
        expected: String,
        found: String,
        offset: usize,
    },

    /// Any other malformed markup.
    #[error("{message} (at byte {offset})")]
    Malformed {
        message: &'static str,
        offset: usize,
    },

    /// The document contains no root element.
    #[error("document has no root element")]
    NoRootElement,

    /// More than one element at document level.
    #[error("multiple root elements (at byte {offset})")]
    MultipleRoots { offset: usize },
}

/// Arena + string pool produced by a successful build.
#[derive(Debug)]
pub(crate) struct BuiltDocument {
    pub nodes: Vec<XmlNode>,
    pub strings: StringPool,
}

/// Build the node arena for `text`.
pub(crate) fn build(text: &str, options: ParseOptions) -> Result<BuiltDocument, ParseError> {
    let mut b = DocBuilder {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        coalescing: options.coalescing,
        nodes: vec![XmlNode::document()],
        strings: StringPool::new(),
    };
    b.document()?;
    Ok(BuiltDocument {
        nodes: b.nodes,
        strings: b.strings,
    })
}

const DOCUMENT: NodeId = 0;

struct DocBuilder<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    coalescing: bool,
    nodes: Vec<XmlNode>,
    strings: StringPool,
}

impl<'a> DocBuilder<'a> {
    // ------------------------------------------------------------------
    // low-level cursor
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with(&self, marker: &str) -> bool {
        self.bytes[self.pos..].starts_with(marker.as_bytes())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn eof(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedEof {
            expected,
            offset: self.pos,
        }
    }

    fn malformed(&self, message: &'static str) -> ParseError {
        ParseError::Malformed {
            message,
            offset: self.pos,
        }
    }

    /// Advance past `marker`, which must be next in the input.
    fn expect(&mut self, marker: &'static str) -> Result<(), ParseError> {
        if self.starts_with(marker) {
            self.pos += marker.len();
            Ok(())
        } else if self.pos >= self.bytes.len() {
            Err(self.eof(marker))
        } else {
            Err(ParseError::Malformed {
                message: "unexpected character",
                offset: self.pos,
            })
        }
    }

    /// Find `marker` at or after the cursor, returning its start.
    fn find(&self, marker: &str) -> Option<usize> {
        memmem::find(&self.bytes[self.pos..], marker.as_bytes()).map(|i| self.pos + i)
    }

    /// Read an XML name at the cursor.
    fn read_name(&mut self, what: &'static str) -> Result<&'a str, ParseError> {
        let text: &'a str = self.text;
        let rest = &text[self.pos..];
        let mut len = 0;
        for (i, c) in rest.char_indices() {
            let ok = if i == 0 {
                is_name_start(c)
            } else {
                is_name_char(c)
            };
            if !ok {
                break;
            }
            len = i + c.len_utf8();
        }
        if len == 0 {
            return Err(ParseError::Malformed {
                message: what,
                offset: self.pos,
            });
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    // ------------------------------------------------------------------
    // arena helpers
    // ------------------------------------------------------------------

    fn push_node(&mut self, node: XmlNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child as usize].parent = Some(parent);
        if let Some(last) = self.nodes[parent as usize].last_child {
            self.nodes[last as usize].next_sibling = Some(child);
            self.nodes[child as usize].prev_sibling = Some(last);
        } else {
            self.nodes[parent as usize].first_child = Some(child);
        }
        self.nodes[parent as usize].last_child = Some(child);
    }

    // ------------------------------------------------------------------
    // grammar
    // ------------------------------------------------------------------

    fn document(&mut self) -> Result<(), ParseError> {
        if self.starts_with("\u{FEFF}") {
            self.pos += '\u{FEFF}'.len_utf8();
        }
        if self.starts_with("<?xml")
            && matches!(self.bytes.get(self.pos + 5), Some(b' ' | b'\t' | b'\r' | b'\n' | b'?'))
        {
            let end = self.find("?>").ok_or_else(|| self.eof("`?>`"))?;
            self.pos = end + 2;
        }

        let mut root = None;
        loop {
            self.skip_whitespace();
            if self.pos >= self.bytes.len() {
                break;
            }
            if self.starts_with("<!--") {
                self.comment(DOCUMENT)?;
            } else if self.starts_with("<!DOCTYPE") {
                self.doctype()?;
            } else if self.starts_with("</") || self.starts_with("<!") {
                return Err(self.malformed("unexpected markup at document level"));
            } else if self.starts_with("<?") {
                self.processing_instruction(DOCUMENT)?;
            } else if self.peek() == Some(b'<') {
                if root.is_some() {
                    return Err(ParseError::MultipleRoots { offset: self.pos });
                }
                root = Some(self.element(DOCUMENT)?);
            } else {
                return Err(self.malformed("text outside the root element"));
            }
        }

        if root.is_none() {
            return Err(ParseError::NoRootElement);
        }
        Ok(())
    }

    fn comment(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.pos += "<!--".len();
        let end = self.find("-->").ok_or_else(|| self.eof("`-->`"))?;
        let value_id = self.strings.intern(&self.text[self.pos..end]);
        let node = self.push_node(XmlNode::comment(value_id, None));
        self.append_child(parent, node);
        self.pos = end + 3;
        Ok(())
    }

    fn processing_instruction(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.pos += "<?".len();
        let target = self.read_name("expected a processing instruction target")?;
        let name_id = self.strings.intern(target);
        let end = self.find("?>").ok_or_else(|| self.eof("`?>`"))?;
        let data = self.text[self.pos..end].trim_start();
        let value_id = self.strings.intern(data);
        let node = self.push_node(XmlNode::processing_instruction(name_id, value_id, None));
        self.append_child(parent, node);
        self.pos = end + 2;
        Ok(())
    }

    fn doctype(&mut self) -> Result<(), ParseError> {
        self.pos += "<!DOCTYPE".len();
        self.skip_whitespace();
        let name = self.read_name("expected a doctype name")?;
        let name_id = self.strings.intern(name);

        // scan to the closing '>', stepping over quoted external ids
        // and the bracketed internal subset
        loop {
            match self.peek() {
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'[') => {
                    let close =
                        memchr(b']', &self.bytes[self.pos..]).ok_or_else(|| self.eof("`]`"))?;
                    self.pos += close + 1;
                }
                Some(q @ (b'"' | b'\'')) => {
                    let close = memchr(q, &self.bytes[self.pos + 1..])
                        .ok_or_else(|| self.eof("closing quote"))?;
                    self.pos += close + 2;
                }
                Some(_) => self.pos += 1,
                None => return Err(self.eof("`>`")),
            }
        }

        let node = self.push_node(XmlNode::document_type(name_id, None));
        self.append_child(DOCUMENT, node);
        Ok(())
    }

    fn element(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        self.pos += 1; // '<'
        let name = self.read_name("expected an element name")?;
        let name_id = self.strings.intern(name);
        let elem = self.push_node(XmlNode::element(name_id, None));
        self.append_child(parent, elem);

        // attributes are allocated contiguously after the element
        let self_closing = self.attributes(elem)?;
        if self_closing {
            return Ok(elem);
        }

        self.content(elem, name)?;
        Ok(elem)
    }

    /// Parse the attribute list and the end of the start tag. Returns
    /// true for the self-closing form.
    fn attributes(&mut self, elem: NodeId) -> Result<bool, ParseError> {
        let attr_start = self.nodes.len() as u32;
        let self_closing = loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'>') => {
                    self.pos += 1;
                    break false;
                }
                Some(b'/') => {
                    self.expect("/>")?;
                    break true;
                }
                Some(_) => {
                    let name = self.read_name("expected an attribute name")?;
                    let name_id = self.strings.intern(name);
                    self.skip_whitespace();
                    self.expect("=")?;
                    self.skip_whitespace();
                    let quote = match self.peek() {
                        Some(q @ (b'"' | b'\'')) => q,
                        Some(_) => return Err(self.malformed("expected a quoted value")),
                        None => return Err(self.eof("attribute value")),
                    };
                    self.pos += 1;
                    let close = memchr(quote, &self.bytes[self.pos..])
                        .map(|i| self.pos + i)
                        .ok_or_else(|| self.eof("closing quote"))?;
                    let value = decode_text(&self.text[self.pos..close]);
                    let value_id = self.strings.intern(&value);
                    self.push_node(XmlNode::attribute(name_id, value_id, elem));
                    self.pos = close + 1;
                }
                None => return Err(self.eof("`>`")),
            }
        };

        let count = self.nodes.len() as u32 - attr_start;
        if count > 0 {
            self.nodes[elem as usize].attr_start = attr_start;
            self.nodes[elem as usize].attr_count = count.min(u16::MAX as u32) as u16;
        }
        Ok(self_closing)
    }

    /// Parse element content up to and including the matching end tag.
    fn content(&mut self, elem: NodeId, name: &str) -> Result<(), ParseError> {
        let mut buf = String::new();
        loop {
            match self.peek() {
                None => return Err(self.eof("closing tag")),
                Some(b'<') => {
                    if self.starts_with("</") {
                        self.flush_text(elem, &mut buf);
                        self.pos += 2;
                        let end_offset = self.pos;
                        let end_name = self.read_name("expected an element name")?;
                        self.skip_whitespace();
                        self.expect(">")?;
                        if end_name != name {
                            return Err(ParseError::MismatchedEndTag {
                                expected: name.to_string(),
                                found: end_name.to_string(),
                                offset: end_offset,
                            });
                        }
                        return Ok(());
                    } else if self.starts_with("<!--") {
                        self.flush_text(elem, &mut buf);
                        self.comment(elem)?;
                    } else if self.starts_with("<![CDATA[") {
                        self.cdata(elem, &mut buf)?;
                    } else if self.starts_with("<?") {
                        self.flush_text(elem, &mut buf);
                        self.processing_instruction(elem)?;
                    } else if self.starts_with("<!") {
                        return Err(self.malformed("unexpected markup"));
                    } else {
                        self.flush_text(elem, &mut buf);
                        self.element(elem)?;
                    }
                }
                Some(b'&') => self.reference(elem, &mut buf)?,
                Some(_) => {
                    // plain character data up to the next marker
                    let stop = memchr2(b'<', b'&', &self.bytes[self.pos..])
                        .map(|i| self.pos + i)
                        .unwrap_or(self.bytes.len());
                    buf.push_str(&self.text[self.pos..stop]);
                    self.pos = stop;
                }
            }
        }
    }

    fn cdata(&mut self, elem: NodeId, buf: &mut String) -> Result<(), ParseError> {
        self.pos += "<![CDATA[".len();
        let end = self.find("]]>").ok_or_else(|| self.eof("`]]>`"))?;
        let raw = &self.text[self.pos..end];
        if self.coalescing {
            buf.push_str(raw);
        } else {
            self.flush_text(elem, buf);
            let value_id = self.strings.intern(raw);
            let node = self.push_node(XmlNode::cdata(value_id, None));
            self.append_child(elem, node);
        }
        self.pos = end + 3;
        Ok(())
    }

    /// Parse an entity or character reference in content. Known
    /// references decode into the text buffer; an unknown named entity
    /// becomes an entity reference node splitting the text.
    fn reference(&mut self, elem: NodeId, buf: &mut String) -> Result<(), ParseError> {
        let ref_start = self.pos;
        self.pos += 1; // '&'
        let semi = match memchr(b';', &self.bytes[self.pos..]) {
            Some(i) => self.pos + i,
            None => {
                self.pos = ref_start;
                return Err(self.malformed("unterminated entity reference"));
            }
        };
        let body = &self.text[self.pos..semi];
        let valid_name = {
            let mut chars = body.chars();
            chars.next().map(is_name_start).unwrap_or(false) && chars.all(is_name_char)
        };
        if let Some(c) = decode_entity(body) {
            buf.push(c);
        } else if body.starts_with('#') || !valid_name {
            self.pos = ref_start;
            return Err(self.malformed("invalid entity reference"));
        } else {
            self.flush_text(elem, buf);
            let name_id = self.strings.intern(body);
            let node = self.push_node(XmlNode::entity_reference(name_id, None));
            self.append_child(elem, node);
        }
        self.pos = semi + 1;
        Ok(())
    }

    fn flush_text(&mut self, elem: NodeId, buf: &mut String) {
        if buf.is_empty() {
            return;
        }
        let value_id = self.strings.intern(buf);
        let node = self.push_node(XmlNode::text(value_id, None));
        self.append_child(elem, node);
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeKind;

    fn kinds_of_children(doc: &BuiltDocument, id: NodeId) -> Vec<NodeKind> {
        let mut out = Vec::new();
        let mut cur = doc.nodes[id as usize].first_child;
        while let Some(c) = cur {
            out.push(doc.nodes[c as usize].kind);
            cur = doc.nodes[c as usize].next_sibling;
        }
        out
    }

    #[test]
    fn test_simple_document() {
        let doc = build("<root><child>hi</child></root>", ParseOptions::default()).unwrap();
        assert_eq!(doc.nodes[0].kind, NodeKind::Document);
        let root = doc.nodes[0].first_child.unwrap();
        assert_eq!(doc.nodes[root as usize].kind, NodeKind::Element);
        assert_eq!(
            kinds_of_children(&doc, root),
            vec![NodeKind::Element]
        );
    }

    #[test]
    fn test_attributes_decoded() {
        let doc = build(r#"<a x="1 &amp; 2" y='z'/>"#, ParseOptions::default()).unwrap();
        let a = doc.nodes[0].first_child.unwrap() as usize;
        assert_eq!(doc.nodes[a].attr_count, 2);
        let x = &doc.nodes[doc.nodes[a].attr_start as usize];
        assert_eq!(doc.strings.get(x.name_id), "x");
        assert_eq!(doc.strings.get(x.value_id), "1 & 2");
    }

    #[test]
    fn test_mismatched_end_tag() {
        let err = build("<a><b></a></b>", ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::MismatchedEndTag { .. }));
    }

    #[test]
    fn test_unknown_entity_becomes_node() {
        let doc = build("<a>x &foo; y</a>", ParseOptions::default()).unwrap();
        let a = doc.nodes[0].first_child.unwrap();
        assert_eq!(
            kinds_of_children(&doc, a),
            vec![NodeKind::Text, NodeKind::EntityReference, NodeKind::Text]
        );
    }

    #[test]
    fn test_cdata_node_and_coalescing() {
        let text = "<a>x<![CDATA[ & ]]>y</a>";
        let doc = build(text, ParseOptions::default()).unwrap();
        let a = doc.nodes[0].first_child.unwrap();
        assert_eq!(
            kinds_of_children(&doc, a),
            vec![NodeKind::Text, NodeKind::CData, NodeKind::Text]
        );

        let doc = build(text, ParseOptions { coalescing: true }).unwrap();
        let a = doc.nodes[0].first_child.unwrap();
        assert_eq!(kinds_of_children(&doc, a), vec![NodeKind::Text]);
        let t = doc.nodes[a as usize].first_child.unwrap() as usize;
        assert_eq!(doc.strings.get(doc.nodes[t].value_id), "x & y");
    }

    #[test]
    fn test_prolog_doctype_and_misc() {
        let text = "<?xml version=\"1.0\"?>\n<!-- hello -->\n<!DOCTYPE r [ <!ENTITY e \"v\"> ]>\n<r/>";
        let doc = build(text, ParseOptions::default()).unwrap();
        assert_eq!(
            kinds_of_children(&doc, 0),
            vec![NodeKind::Comment, NodeKind::DocumentType, NodeKind::Element]
        );
    }

    #[test]
    fn test_document_level_errors() {
        assert!(matches!(
            build("", ParseOptions::default()),
            Err(ParseError::NoRootElement)
        ));
        assert!(matches!(
            build("<a/><b/>", ParseOptions::default()),
            Err(ParseError::MultipleRoots { .. })
        ));
        assert!(matches!(
            build("stray", ParseOptions::default()),
            Err(ParseError::Malformed { .. })
        ));
    }

    #[test]
    fn test_whitespace_text_preserved() {
        let doc = build("<a>\n  <b/>\n</a>", ParseOptions::default()).unwrap();
        let a = doc.nodes[0].first_child.unwrap();
        assert_eq!(
            kinds_of_children(&doc, a),
            vec![NodeKind::Text, NodeKind::Element, NodeKind::Text]
        );
    }

    #[test]
    fn test_unterminated_constructs() {
        assert!(matches!(
            build("<a>text", ParseOptions::default()),
            Err(ParseError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            build("<a b=\"1/>", ParseOptions::default()),
            Err(ParseError::UnexpectedEof { .. })
        ));
    }
}
