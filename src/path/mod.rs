//! Minimal path query engine
//!
//! A restricted, embeddable subset of XPath: relative paths over the
//! child, attribute and self axes, with positional and
//! attribute-equality predicates. Convenient for retrieving nodes in
//! application code and test assertions:
//!
//! ```
//! use xmloc::{PathQuery, XmlDocument};
//!
//! let doc = XmlDocument::parse(r#"<a><b id="1"/><b id="2"/></a>"#).unwrap();
//! let query = PathQuery::parse("a/b[2]/@id").unwrap();
//! let hits: Vec<_> = query.evaluate(&doc, XmlDocument::DOCUMENT).collect();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(doc.value(hits[0]), Some("2"));
//! ```
//!
//! What is supported:
//!
//! ```text
//! a/b/c
//! a/b[1]/c             select a child with a (1-based) index
//! a/@attr              a path can contain an attribute (should really only end with it)
//! a/*[@size = 1]       wildcard name test, number literals for attribute tests
//! a/.[@size = 1]       . is shorthand for the self axis
//! e/*[@a = 1][@b = 2]  multiple predicates mimic AND boolean expressions
//! ```
//!
//! Limitations:
//!
//! - Path expressions must be relative: they cannot start with `/` or
//!   `//`, and descendant steps (`//`) are unsupported.
//! - Only the child, attribute and self axes, in shorthand form.
//! - No arithmetic or boolean expressions, no functions, no comments.
//! - No namespaced names; everything is treated as a local name.
//! - Strings must be single quoted, without escapes.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, OnceLock};

use lru::LruCache;

use crate::nav::Nav;
use crate::report::caret_line;
use ast::PathElement;

/// A path expression, parsed into a runnable form.
///
/// A parsed query is an immutable value: it is not tied to any
/// document and can be evaluated any number of times, against
/// independent trees or repeatedly against the same tree.
#[derive(Debug, Clone)]
pub struct PathQuery {
    path: Arc<PathElement>,
}

impl PathQuery {
    /// Parse an expression into a runnable form.
    pub fn parse(expression: &str) -> Result<PathQuery, PathSyntaxError> {
        let path = parser::parse(expression)?;
        Ok(PathQuery {
            path: Arc::new(path),
        })
    }

    /// Like [`parse`](Self::parse), backed by a process-wide LRU cache
    /// keyed by the expression text. Parse failures are not cached.
    pub fn cached(expression: &str) -> Result<PathQuery, PathSyntaxError> {
        static CACHE: OnceLock<Mutex<LruCache<String, Arc<PathElement>>>> = OnceLock::new();
        const CAPACITY: usize = 64;

        let cache = CACHE.get_or_init(|| {
            Mutex::new(LruCache::new(
                NonZeroUsize::new(CAPACITY).unwrap_or(NonZeroUsize::MIN),
            ))
        });

        if let Ok(mut cache) = cache.lock() {
            if let Some(path) = cache.get(expression) {
                return Ok(PathQuery { path: path.clone() });
            }
            let query = PathQuery::parse(expression)?;
            cache.put(expression.to_string(), query.path.clone());
            Ok(query)
        } else {
            // poisoned cache: fall back to a fresh parse
            PathQuery::parse(expression)
        }
    }

    /// Evaluate this query with `start` as the context node.
    ///
    /// Returns a lazy, single-pass sequence of the matching nodes, in
    /// document order, bounded by the tree size. Re-invoke to restart.
    pub fn evaluate<'a, V: Nav>(
        &'a self,
        nav: &'a V,
        start: V::Node,
    ) -> impl Iterator<Item = V::Node> + 'a
    where
        V::Node: 'a,
    {
        eval::evaluate(&self.path, nav, start)
    }

    /// First match of this query, if any.
    pub fn first<V: Nav>(&self, nav: &V, start: V::Node) -> Option<V::Node> {
        self.evaluate(nav, start).next()
    }
}

impl fmt::Display for PathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Error raised when a path expression does not parse.
///
/// Always fatal to the parse: no partial or recovered query is
/// produced. Rendered as the expression with a caret pointing at the
/// offending offset.
#[derive(Debug, Clone)]
pub struct PathSyntaxError {
    expression: String,
    offset: usize,
    message: String,
}

impl PathSyntaxError {
    pub(crate) fn new(expression: &str, offset: usize, message: impl Into<String>) -> Self {
        PathSyntaxError {
            expression: expression.to_string(),
            offset,
            message: message.into(),
        }
    }

    /// The expression that failed to parse.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Byte offset of the failure within the expression.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// What the parser expected or found.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PathSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = "parse error in:  ";
        write!(
            f,
            "{}{}\n{}",
            prefix,
            self.expression,
            caret_line(&self.message, prefix.len() + self.offset, 1)
        )
    }
}

impl std::error::Error for PathSyntaxError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    #[test]
    fn test_query_is_reusable() {
        let query = PathQuery::parse("a/b").unwrap();
        let one = XmlDocument::parse("<a><b/></a>").unwrap();
        let two = XmlDocument::parse("<a><b/><b/></a>").unwrap();
        assert_eq!(query.evaluate(&one, XmlDocument::DOCUMENT).count(), 1);
        assert_eq!(query.evaluate(&two, XmlDocument::DOCUMENT).count(), 2);
        // same tree again: evaluation is restartable by re-invoking
        assert_eq!(query.evaluate(&two, XmlDocument::DOCUMENT).count(), 2);
    }

    #[test]
    fn test_cached_returns_equivalent_query() {
        let a = PathQuery::cached("x/y[1]").unwrap();
        let b = PathQuery::cached("x/y[1]").unwrap();
        assert_eq!(a.to_string(), b.to_string());
        assert!(PathQuery::cached("x//y").is_err());
    }

    #[test]
    fn test_error_rendering() {
        let err = PathQuery::parse("a/b[").unwrap_err();
        let rendered = err.to_string();
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("parse error in:  a/b["));
        let caret = lines.next().unwrap();
        assert_eq!(caret.find('^'), Some("parse error in:  ".len() + err.offset()));
    }
}
