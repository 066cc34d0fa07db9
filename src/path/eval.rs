//! Path evaluation engine
//!
//! Streaming evaluation of a parsed pipeline against any tree
//! implementing [`Nav`]. Each element transforms its upstream
//! sequence lazily; the produced sequence is finite (bounded by the
//! tree size) and single-pass.

use std::iter;

use super::ast::{Axis, AxisStep, Filter, PathElement};
use crate::nav::Nav;

/// Evaluate `path` with `start` as the context node.
pub fn evaluate<'a, V: Nav>(
    path: &'a PathElement,
    nav: &'a V,
    start: V::Node,
) -> impl Iterator<Item = V::Node> + 'a
where
    V::Node: 'a,
{
    path.pipe(nav, Box::new(iter::once(start)))
}

type NodeIter<'a, N> = Box<dyn Iterator<Item = N> + 'a>;

impl PathElement {
    /// Thread the upstream sequence through this element.
    fn pipe<'a, V: Nav>(&'a self, nav: &'a V, upstream: NodeIter<'a, V::Node>) -> NodeIter<'a, V::Node>
    where
        V::Node: 'a,
    {
        match self {
            PathElement::Root => upstream,
            PathElement::Sink => Box::new(iter::empty()),
            PathElement::Piped(up, down) => down.pipe(nav, up.pipe(nav, upstream)),
            PathElement::Step(step) => {
                Box::new(upstream.flat_map(move |node| step.apply(nav, node)))
            }
        }
    }
}

impl AxisStep {
    /// Candidates this step produces for one context node: the axis
    /// nodes, narrowed by the kind test, the name test, and every
    /// filter in attachment order.
    fn apply<'a, V: Nav>(&'a self, nav: &'a V, node: V::Node) -> NodeIter<'a, V::Node>
    where
        V::Node: 'a,
    {
        let axis: NodeIter<'a, V::Node> = match self.axis {
            Axis::Child => Box::new(nav.children(node).into_iter()),
            Axis::SelfAxis => Box::new(iter::once(node)),
            Axis::Attribute => match &self.name_test {
                // named lookup: at most one attribute
                Some(name) => Box::new(nav.attribute(node, name).into_iter()),
                None => Box::new(nav.attributes(node).into_iter()),
            },
        };

        let mut result = axis;
        if let Some(kind) = self.kind_test {
            result = Box::new(result.filter(move |&n| nav.kind(n) == kind));
        }
        if let Some(name) = self.name_test.as_deref() {
            result = Box::new(result.filter(move |&n| nav.name(n) == Some(name)));
        }
        for filter in &self.filters {
            result = filter.apply(nav, result);
        }
        result
    }
}

impl Filter {
    fn apply<'a, V: Nav>(&'a self, nav: &'a V, upstream: NodeIter<'a, V::Node>) -> NodeIter<'a, V::Node>
    where
        V::Node: 'a,
    {
        match self {
            Filter::AttrEquals { name, value } => Box::new(
                upstream.filter(move |&n| nav.attr_value(n, name) == Some(value.as_str())),
            ),
            // positional selection over the already-filtered stream
            Filter::Position(k) => Box::new(upstream.skip(k.saturating_sub(1)).take(1)),
        }
    }
}
