//! Position recovery scanner
//!
//! Recomputes, from the original source text and the parsed tree
//! alone, the byte span every node occupies - including the
//! escaping/CDATA/entity edge cases the parser resolved away. Offsets
//! are derived lazily, one node pulling in its neighbours (previous
//! sibling end, parent content start), and memoized per document.
//!
//! Any marker that cannot be found in source yields an unknown
//! offset, never a failure; callers degrade to a header-only
//! diagnostic.

use memchr::{memchr, memchr2, memmem};

use super::cache::{OffsetCache, OffsetField};
use crate::dom::{NodeId, NodeKind, XmlDocument};
use crate::report::ContextLines;
use crate::text::{Position, TextIndex};

/// Recovers node positions for one parsed document.
///
/// The scanner assumes the document's source text and tree agree
/// character for character (which [`XmlDocument::parse`] guarantees:
/// the document keeps the exact text it was parsed from).
///
/// Offset queries fill the memoization cache in place, so the scanner
/// takes `&mut self`; positioning nodes of one document from multiple
/// threads needs external synchronization around the whole scanner.
pub struct PositionScanner<'a> {
    doc: &'a XmlDocument,
    text: &'a str,
    index: TextIndex<'a>,
    system_id: Option<String>,
    cache: OffsetCache,
}

impl<'a> PositionScanner<'a> {
    /// Create a scanner for a document with no system id.
    pub fn new(doc: &'a XmlDocument) -> Self {
        PositionScanner {
            doc,
            text: doc.source(),
            index: TextIndex::new(doc.source()),
            system_id: None,
            cache: OffsetCache::new(),
        }
    }

    /// Create a scanner that stamps positions with a system id
    /// (typically the file name the document came from).
    pub fn with_system_id(doc: &'a XmlDocument, system_id: impl Into<String>) -> Self {
        PositionScanner {
            system_id: Some(system_id.into()),
            ..PositionScanner::new(doc)
        }
    }

    /// The line index over the document's source text.
    pub fn text_index(&self) -> &TextIndex<'a> {
        &self.index
    }

    /// Resolved position of a node, or an undefined position when the
    /// node cannot be located.
    ///
    /// The position's length depends on the node kind: tag name plus
    /// the `<` for an element, the name for an attribute, zero
    /// otherwise.
    pub fn position_of(&mut self, node: NodeId) -> Position {
        let offset = match self.start_offset(node) {
            Some(offset) => offset,
            None => return Position::undefined_in(self.system_id.clone()),
        };
        let line = self.index.line_number_from_offset(offset);
        let column = self.index.column_from_offset(line, offset);
        Position::with_length(self.system_id.clone(), line, column, self.node_length(node))
    }

    /// Source lines around a position, for rendering a diagnostic.
    /// `num_lines_around` of 1 shows just the error line; it is
    /// treated as at least 1.
    pub fn context_lines(
        &self,
        position: &Position,
        num_lines_around: usize,
    ) -> Option<ContextLines> {
        if position.is_undefined() {
            return None;
        }
        let line = position.line() as usize;
        if line == 0 || line > self.index.line_count() {
            return None;
        }
        let num = num_lines_around.max(1);
        let zero = line - 1;
        let first = zero.saturating_sub(num - 1);
        let last = (zero + num).min(self.index.line_count());
        let lines = (first..last)
            .map(|i| {
                self.index
                    .line_text((i + 1) as u32)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();
        Some(ContextLines::new(lines, first, zero - first))
    }

    // ------------------------------------------------------------------
    // memoized offset functions
    // ------------------------------------------------------------------

    /// Byte offset of the first character of `node` in source, if it
    /// can be determined.
    pub fn start_offset(&mut self, node: NodeId) -> Option<usize> {
        if let Some(memoized) = self.cache.lookup(node, OffsetField::Start) {
            return memoized;
        }
        let computed = self.start_offset_impl(node);
        self.cache.store(node, OffsetField::Start, computed);
        computed
    }

    /// Byte offset one past the last character of `node` in source.
    pub fn end_offset(&mut self, node: NodeId) -> Option<usize> {
        if let Some(memoized) = self.cache.lookup(node, OffsetField::End) {
            return memoized;
        }
        let computed = self.end_offset_impl(node);
        self.cache.store(node, OffsetField::End, computed);
        computed
    }

    /// Byte offset of the first character of the content region of
    /// `node`: past the `>` of a start tag, past `<!--`, past the
    /// opening quote of an attribute, and so on. Leaf kinds (text,
    /// CDATA, entity references) have no content region.
    pub fn content_start_offset(&mut self, node: NodeId) -> Option<usize> {
        if let Some(memoized) = self.cache.lookup(node, OffsetField::ContentStart) {
            return memoized;
        }
        let computed = self.content_start_offset_impl(node);
        self.cache.store(node, OffsetField::ContentStart, computed);
        computed
    }

    // ------------------------------------------------------------------
    // search helpers
    // ------------------------------------------------------------------

    fn find_byte(&self, byte: u8, from: usize) -> Option<usize> {
        if from >= self.text.len() {
            return None;
        }
        memchr(byte, &self.text.as_bytes()[from..]).map(|i| from + i)
    }

    /// Offset just past the next occurrence of `marker`.
    fn end_of(&self, marker: &str, from: usize) -> Option<usize> {
        if from >= self.text.len() {
            return None;
        }
        memmem::find(&self.text.as_bytes()[from..], marker.as_bytes())
            .map(|i| from + i + marker.len())
    }

    // ------------------------------------------------------------------
    // the offset rules
    // ------------------------------------------------------------------

    fn start_offset_impl(&mut self, node: NodeId) -> Option<usize> {
        let kind = self.doc.kind(node);
        if kind == NodeKind::Document {
            return (!self.text.is_empty()).then_some(0);
        }

        // where to start searching: after the previous sibling, else
        // at the parent's content, else at the owner element
        let base = if let Some(prev) = self.doc.prev_sibling(node) {
            self.end_offset(prev)
        } else if let Some(parent) = self.doc.parent_of(node) {
            self.content_start_offset(parent)
        } else if kind == NodeKind::Attribute {
            let owner = self.doc.owner_element(node)?;
            self.start_offset(owner)
        } else {
            None
        };
        let base = base?;

        match kind {
            NodeKind::CData
            | NodeKind::Comment
            | NodeKind::DocumentType
            | NodeKind::Element
            | NodeKind::ProcessingInstruction => self.find_byte(b'<', base),
            NodeKind::EntityReference => self.find_byte(b'&', base),
            NodeKind::Attribute => self.attribute_offset(node, base),
            NodeKind::Text => Some(base),
            NodeKind::Document => None, // handled above
        }
    }

    /// Locate an attribute inside its element's start tag: the name
    /// followed by optional whitespace and `=`, searched up to the
    /// tag's closing `>`. Falls back to the tag start when the name
    /// cannot be matched.
    fn attribute_offset(&self, attr: NodeId, start: usize) -> Option<usize> {
        let name = self.doc.name(attr)?;
        let search_end = self.find_byte(b'>', start).unwrap_or(self.text.len());
        let bytes = self.text.as_bytes();
        let region = &bytes[start..search_end];

        for hit in memmem::find_iter(region, name.as_bytes()) {
            let abs = start + hit;
            // reject matches that are a suffix of a longer name
            if abs > start && is_name_byte(bytes[abs - 1]) {
                continue;
            }
            let mut after = abs + name.len();
            while after < search_end && bytes[after].is_ascii_whitespace() {
                after += 1;
            }
            if after < search_end && bytes[after] == b'=' {
                return Some(abs);
            }
        }
        Some(start)
    }

    fn content_start_offset_impl(&mut self, node: NodeId) -> Option<usize> {
        match self.doc.kind(node) {
            NodeKind::Document => {
                let first_lt = self.find_byte(b'<', 0)?;
                if self.text[first_lt..].starts_with("<?xml") {
                    // past the closing `>` of the XML declaration
                    self.end_of(">", first_lt)
                } else {
                    Some(0)
                }
            }

            NodeKind::Element => {
                // the `>` closing the start tag, plus one
                let start = self.start_offset(node)?;
                self.end_of(">", start)
            }

            NodeKind::DocumentType => self.start_offset(node).map(|s| s + "<!DOCTYPE".len()),

            NodeKind::Comment => self.start_offset(node).map(|s| s + "<!--".len()),

            NodeKind::ProcessingInstruction => {
                let start = self.start_offset(node)?;
                let target = self.doc.name(node)?;
                Some(start + "<?".len() + target.len() + 1)
            }

            NodeKind::Attribute => {
                let start = self.start_offset(node)?;
                if start >= self.text.len() {
                    return None;
                }
                let quote = memchr2(b'"', b'\'', &self.text.as_bytes()[start..])?;
                Some(start + quote + 1)
            }

            // leaves have no content region
            NodeKind::Text | NodeKind::CData | NodeKind::EntityReference => None,
        }
    }

    fn end_offset_impl(&mut self, node: NodeId) -> Option<usize> {
        match self.doc.kind(node) {
            NodeKind::Comment => {
                let start = self.start_offset(node)?;
                self.end_of("-->", start)
            }

            NodeKind::CData => {
                let start = self.start_offset(node)?;
                self.end_of("]]>", start)
            }

            NodeKind::Text => self.text_end(node),

            NodeKind::Document => Some(self.text.len()),

            NodeKind::EntityReference => {
                let start = self.start_offset(node)?;
                self.end_of(";", start)
            }

            NodeKind::DocumentType => {
                // only a doctype with an internal subset ends in `]>`;
                // without one the end is reported unknown
                let start = self.start_offset(node)?;
                self.end_of("]>", start)
            }

            NodeKind::Element => {
                if let Some(last) = self.doc.last_child(node) {
                    let last_end = self.end_offset(last)?;
                    self.end_of(">", last_end)
                } else {
                    let content = self.content_start_offset(node)?;
                    if content >= 2 && self.text.as_bytes()[content - 2] == b'/' {
                        // `.../>`: the end coincides with the content start
                        Some(content)
                    } else {
                        // `<x></x>`: the `>` of the end tag
                        self.end_of(">", content)
                    }
                }
            }

            NodeKind::ProcessingInstruction => {
                let start = self.start_offset(node)?;
                self.end_of("?>", start)
            }

            // nothing ever needs the end of an attribute: attributes
            // have no siblings to anchor
            NodeKind::Attribute => None,
        }
    }

    /// Reconcile a text node's decoded value with its encoded source
    /// span. The decoded value is generally shorter: a character
    /// reference spans several source bytes but decodes to one
    /// character, and CDATA delimiters occupy source bytes that are
    /// invisible in the decoded value. Walk the source, consuming one
    /// decoded character at a time, and return where the walk ends.
    fn text_end(&mut self, node: NodeId) -> Option<usize> {
        let start = self.start_offset(node)?;
        let doc = self.doc;
        let decoded = doc.value(node)?;
        let mut remaining = decoded.chars().count();

        let bytes = self.text.as_bytes();
        let mut i = start;
        let mut in_cdata = false;
        while i < self.text.len() && remaining > 0 {
            if !in_cdata && bytes[i] == b'&' {
                // the whole reference decodes to one character
                let semi = self.find_byte(b';', i)?;
                i = semi + 1;
                remaining -= 1;
            } else if !in_cdata && self.text[i..].starts_with("<![CDATA[") {
                in_cdata = true;
                i += "<![CDATA[".len();
            } else if in_cdata && self.text[i..].starts_with("]]>") {
                in_cdata = false;
                i += "]]>".len();
            } else {
                let width = self.text[i..]
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(1);
                i += width;
                remaining -= 1;
            }
        }
        Some(i)
    }

    fn node_length(&self, node: NodeId) -> usize {
        match self.doc.kind(node) {
            // the tag name plus the `<`
            NodeKind::Element => self.doc.name(node).map(|n| n.len() + 1).unwrap_or(0),
            NodeKind::Attribute => self.doc.name(node).map(str::len).unwrap_or(0),
            _ => 0,
        }
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ParseOptions, XmlDocument};

    fn first_text(doc: &XmlDocument, elem: NodeId) -> NodeId {
        doc.children(elem)
            .find(|&c| doc.kind(c) == NodeKind::Text)
            .expect("no text child")
    }

    #[test]
    fn test_entity_reconciliation() {
        // decoded "text & more" is 11 chars; the source span is 15:
        // `&amp;` spends 5 source characters on 1 decoded character
        let doc = XmlDocument::parse("<root><child>text &amp; more</child></root>").unwrap();
        let child = doc.select("root/child").unwrap()[0];
        let text = first_text(&doc, child);
        assert_eq!(doc.value(text).unwrap().len(), 11);

        let mut scanner = PositionScanner::new(&doc);
        let start = scanner.start_offset(text).unwrap();
        let end = scanner.end_offset(text).unwrap();
        assert_eq!(start, 13);
        assert_eq!(end - start, 15);
    }

    #[test]
    fn test_cdata_reconciliation_under_coalescing() {
        let source = "<a>x<![CDATA[ & ]]>y</a>";
        let doc = XmlDocument::parse_with_options(source, ParseOptions { coalescing: true })
            .unwrap();
        let a = doc.root_element().unwrap();
        let text = first_text(&doc, a);
        assert_eq!(doc.value(text), Some("x & y"));

        let mut scanner = PositionScanner::new(&doc);
        assert_eq!(scanner.start_offset(text), Some(3));
        // the span covers both CDATA delimiters
        assert_eq!(scanner.end_offset(text), Some(20));
        // and the element still closes where the source says
        assert_eq!(scanner.end_offset(a), Some(source.len()));
    }

    #[test]
    fn test_self_closing_element() {
        let doc = XmlDocument::parse("<x/>").unwrap();
        let x = doc.root_element().unwrap();
        let mut scanner = PositionScanner::new(&doc);
        assert_eq!(scanner.start_offset(x), Some(0));
        // zero-length content region
        assert_eq!(scanner.end_offset(x), scanner.content_start_offset(x));
        assert_eq!(scanner.end_offset(x), Some(4));
    }

    #[test]
    fn test_empty_element_with_end_tag() {
        let doc = XmlDocument::parse("<x></x>").unwrap();
        let x = doc.root_element().unwrap();
        let mut scanner = PositionScanner::new(&doc);
        assert_eq!(scanner.content_start_offset(x), Some(3));
        assert_eq!(scanner.end_offset(x), Some(7));
    }

    #[test]
    fn test_nested_elements_and_document() {
        let source = "<a><b>hi</b><c/></a>";
        let doc = XmlDocument::parse(source).unwrap();
        let mut scanner = PositionScanner::new(&doc);

        assert_eq!(scanner.start_offset(XmlDocument::DOCUMENT), Some(0));
        assert_eq!(scanner.end_offset(XmlDocument::DOCUMENT), Some(source.len()));
        assert_eq!(scanner.content_start_offset(XmlDocument::DOCUMENT), Some(0));

        let b = doc.select("a/b").unwrap()[0];
        let c = doc.select("a/c").unwrap()[0];
        assert_eq!(scanner.start_offset(b), Some(3));
        assert_eq!(scanner.end_offset(b), Some(12));
        assert_eq!(scanner.start_offset(c), Some(12));
        assert_eq!(scanner.end_offset(c), Some(16));
    }

    #[test]
    fn test_xml_declaration_is_skipped() {
        let source = "<?xml version=\"1.0\"?><r/>";
        let doc = XmlDocument::parse(source).unwrap();
        let mut scanner = PositionScanner::new(&doc);
        assert_eq!(scanner.content_start_offset(XmlDocument::DOCUMENT), Some(21));
        let r = doc.root_element().unwrap();
        assert_eq!(scanner.start_offset(r), Some(21));
    }

    #[test]
    fn test_attribute_offsets() {
        let source = r#"<e foo="1" bar = '2'/>"#;
        let doc = XmlDocument::parse(source).unwrap();
        let e = doc.root_element().unwrap();
        let mut scanner = PositionScanner::new(&doc);

        let foo = doc.attribute(e, "foo").unwrap();
        let bar = doc.attribute(e, "bar").unwrap();
        assert_eq!(scanner.start_offset(foo), Some(3));
        // content starts after the opening quote
        assert_eq!(scanner.content_start_offset(foo), Some(8));
        assert_eq!(scanner.start_offset(bar), Some(11));
        assert_eq!(scanner.content_start_offset(bar), Some(18));
    }

    #[test]
    fn test_attribute_name_is_not_matched_inside_another() {
        // `b` must not match the tail of `ab`
        let source = r#"<e ab="1" b="2"/>"#;
        let doc = XmlDocument::parse(source).unwrap();
        let e = doc.root_element().unwrap();
        let b = doc.attribute(e, "b").unwrap();
        let mut scanner = PositionScanner::new(&doc);
        assert_eq!(scanner.start_offset(b), Some(10));
    }

    #[test]
    fn test_comment_pi_doctype_offsets() {
        let source = "<!-- hi -->\n<?pi data?>\n<!DOCTYPE r [<!ENTITY x 'y'>]>\n<r/>";
        let doc = XmlDocument::parse(source).unwrap();
        let kids: Vec<_> = doc.children(XmlDocument::DOCUMENT).collect();
        let mut scanner = PositionScanner::new(&doc);

        let comment = kids[0];
        assert_eq!(scanner.start_offset(comment), Some(0));
        assert_eq!(scanner.content_start_offset(comment), Some(4));
        assert_eq!(scanner.end_offset(comment), Some(11));

        let pi = kids[1];
        assert_eq!(scanner.start_offset(pi), Some(12));
        assert_eq!(scanner.content_start_offset(pi), Some(17));
        assert_eq!(scanner.end_offset(pi), Some(23));

        let doctype = kids[2];
        assert_eq!(scanner.start_offset(doctype), Some(24));
        assert_eq!(
            scanner.content_start_offset(doctype),
            Some(24 + "<!DOCTYPE".len())
        );
        assert_eq!(scanner.end_offset(doctype), Some(54));
    }

    #[test]
    fn test_doctype_without_subset_has_unknown_end() {
        let doc = XmlDocument::parse("<!DOCTYPE r>\n<r/>").unwrap();
        let doctype = doc.children(XmlDocument::DOCUMENT).next().unwrap();
        let mut scanner = PositionScanner::new(&doc);
        assert_eq!(scanner.start_offset(doctype), Some(0));
        assert_eq!(scanner.end_offset(doctype), None);
        // the root element is still located through the parent's
        // content start, not through the broken sibling
        let r = doc.root_element().unwrap();
        assert_eq!(scanner.start_offset(r), None); // prev sibling end unknown
    }

    #[test]
    fn test_entity_reference_node_offsets() {
        let source = "<a>x &foo; y</a>";
        let doc = XmlDocument::parse(source).unwrap();
        let a = doc.root_element().unwrap();
        let kids: Vec<_> = doc.children(a).collect();
        let mut scanner = PositionScanner::new(&doc);

        assert_eq!(scanner.end_offset(kids[0]), Some(5));
        assert_eq!(scanner.start_offset(kids[1]), Some(5));
        assert_eq!(scanner.end_offset(kids[1]), Some(10));
        assert_eq!(scanner.start_offset(kids[2]), Some(10));
        assert_eq!(scanner.end_offset(kids[2]), Some(12));
        assert_eq!(scanner.end_offset(a), Some(source.len()));
    }

    #[test]
    fn test_offsets_are_ordered_for_every_node() {
        let source = "<?xml version=\"1.0\"?>\n<a one=\"1\">\n  <b>x &lt; y</b>\n  <!-- note -->\n  <c/>\n</a>\n";
        let doc = XmlDocument::parse(source).unwrap();
        let mut scanner = PositionScanner::new(&doc);
        for id in 0..doc.node_count() as NodeId {
            let (start, end) = (scanner.start_offset(id), scanner.end_offset(id));
            if let (Some(start), Some(end)) = (start, end) {
                assert!(start <= end, "node {id}: {start} > {end}");
                assert!(end <= source.len(), "node {id} past the end");
            }
        }
    }

    #[test]
    fn test_position_of() {
        let source = "<root>\n  <child san=\"deer\"/>\n</root>";
        let doc = XmlDocument::parse(source).unwrap();
        let mut scanner = PositionScanner::with_system_id(&doc, "pet.xml");

        let child = doc.select("root/child").unwrap()[0];
        let pos = scanner.position_of(child);
        assert_eq!(pos.line(), 2);
        assert_eq!(pos.column(), 3);
        assert_eq!(pos.length(), "child".len() + 1);
        assert_eq!(pos.system_id(), Some("pet.xml"));

        let attr = doc.attribute(child, "san").unwrap();
        let pos = scanner.position_of(attr);
        assert_eq!(pos.line(), 2);
        assert_eq!(pos.column(), 10);
        assert_eq!(pos.length(), "san".len());
    }

    #[test]
    fn test_position_memoization() {
        let doc = XmlDocument::parse("<a><b/><c/></a>").unwrap();
        let mut scanner = PositionScanner::new(&doc);
        let c = doc.select("a/c").unwrap()[0];
        let first = scanner.start_offset(c);
        let cached_entries = scanner.cache.len();
        // a repeated query hits the memo table, adding nothing
        assert_eq!(scanner.start_offset(c), first);
        assert_eq!(scanner.cache.len(), cached_entries);
    }

    #[test]
    fn test_context_lines() {
        let source = "<root>\n  <child bad=\"1\"/>\n</root>";
        let doc = XmlDocument::parse(source).unwrap();
        let mut scanner = PositionScanner::new(&doc);
        let child = doc.select("root/child").unwrap()[0];
        let pos = scanner.position_of(child);

        let ctx = scanner.context_lines(&pos, 2).unwrap();
        let rendered = ctx.render("not allowed", pos.column() as u32, pos.length());
        let expected = "\
 1| <root>
 2|   <child bad=\"1\"/>
      ^^^^^^ not allowed

 3| </root>";
        assert_eq!(rendered, expected);

        assert!(scanner.context_lines(&Position::UNDEFINED, 2).is_none());
    }
}
