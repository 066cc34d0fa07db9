//! Evaluation pipeline for parsed path expressions
//!
//! A parsed expression is a tree of [`PathElement`]s composed with
//! [`and_then`](PathElement::and_then), which applies two algebraic
//! simplifications: a bare self step is an identity and disappears,
//! and `Sink` absorbs everything after it. Filters attach to the
//! owning axis step, never to a following one.

use std::fmt;

use crate::dom::NodeKind;

/// The axes a step can navigate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Attribute,
    SelfAxis,
}

/// A predicate attached to an axis step.
///
/// Filters are evaluated left-to-right, conjunctively: a candidate
/// must pass every filter of its step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `[@name = value]`: the candidate has the attribute with
    /// exactly this (string) value.
    AttrEquals { name: String, value: String },
    /// `[k]`: keeps the k-th (1-based) candidate of the stream that
    /// already passed the step's kind test, name test and earlier
    /// filters - not of the raw child list.
    Position(usize),
}

/// One step of the pipeline: an axis plus optional kind/name tests
/// (absent test = wildcard) and the attached filters.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisStep {
    pub axis: Axis,
    pub kind_test: Option<NodeKind>,
    pub name_test: Option<String>,
    pub filters: Vec<Filter>,
}

impl AxisStep {
    /// A child step: `name`, `*`.
    pub fn child(kind_test: Option<NodeKind>, name_test: Option<String>) -> Self {
        AxisStep {
            axis: Axis::Child,
            kind_test,
            name_test,
            filters: Vec::new(),
        }
    }

    /// An attribute step: `@name`.
    pub fn attribute(name_test: Option<String>) -> Self {
        AxisStep {
            axis: Axis::Attribute,
            kind_test: Some(NodeKind::Attribute),
            name_test,
            filters: Vec::new(),
        }
    }

    /// A bare self step: `.`.
    pub fn self_step() -> Self {
        AxisStep {
            axis: Axis::SelfAxis,
            kind_test: None,
            name_test: None,
            filters: Vec::new(),
        }
    }

    /// True for a bare `.` step: no tests, no filters. Composing with
    /// it is an identity.
    pub fn is_identity(&self) -> bool {
        self.axis == Axis::SelfAxis
            && self.kind_test.is_none()
            && self.name_test.is_none()
            && self.filters.is_empty()
    }

    fn axis_name(&self) -> &'static str {
        match self.axis {
            Axis::Child => "child",
            Axis::Attribute => "attribute",
            Axis::SelfAxis => "self",
        }
    }
}

/// A node of the evaluation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PathElement {
    /// Start of every pipeline: yields exactly the start node.
    Root,
    /// An axis step with its tests and filters.
    Step(AxisStep),
    /// One step's output threaded into the next step's input.
    Piped(Box<PathElement>, Box<PathElement>),
    /// The empty pipeline: yields nothing, absorbs everything.
    Sink,
}

impl PathElement {
    /// Compose `downstream` after this element, simplifying where the
    /// algebra allows it.
    ///
    /// `Root` is a left identity and `Sink` absorbs both ways; a bare
    /// self step on the right disappears. The Root rule comes first:
    /// a leading `.` must survive as a step so that its predicates
    /// have something to attach to.
    pub fn and_then(self, downstream: PathElement) -> PathElement {
        match self {
            PathElement::Root => downstream,
            PathElement::Sink => PathElement::Sink,
            up => match downstream {
                PathElement::Step(ref step) if step.is_identity() => up,
                PathElement::Sink => PathElement::Sink,
                down => PathElement::Piped(Box::new(up), Box::new(down)),
            },
        }
    }

    /// Attach a filter to the owning axis step (the downstream end of
    /// a pipe). A second position filter on one step either collapses
    /// the step to `Sink` (a different index: statically
    /// unsatisfiable, one step matches one ordinal) or is dropped
    /// (the same index: redundant).
    ///
    /// The parser only attaches filters after composing a step, so
    /// `Root` can never receive one.
    pub fn accept_filter(&mut self, filter: Filter) {
        match self {
            PathElement::Piped(_, down) => down.accept_filter(filter),
            PathElement::Sink => {}
            PathElement::Root => {
                debug_assert!(false, "no filter can be attached before the first step");
            }
            PathElement::Step(step) => {
                if let Filter::Position(k) = filter {
                    let existing = step.filters.iter().find_map(|f| match f {
                        Filter::Position(e) => Some(*e),
                        _ => None,
                    });
                    if let Some(existing) = existing {
                        if existing != k {
                            *self = PathElement::Sink;
                        }
                        return;
                    }
                }
                step.filters.push(filter);
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::AttrEquals { name, value } => write!(f, "[@{name} = '{value}']"),
            Filter::Position(k) => write!(f, "[{k}]"),
        }
    }
}

impl fmt::Display for AxisStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name_test.as_deref().unwrap_or("");
        match self.kind_test {
            None => write!(f, "{}::node({})", self.axis_name(), name)?,
            Some(NodeKind::Element) => write!(f, "{}::element({})", self.axis_name(), name)?,
            Some(NodeKind::Attribute) => write!(f, "{}::attribute({})", self.axis_name(), name)?,
            Some(kind) => write!(f, "{}::{kind:?}({})", self.axis_name(), name)?,
        }
        for filter in &self.filters {
            write!(f, "{filter}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Root => write!(f, "[ true() ]"),
            PathElement::Sink => write!(f, "[ false() ]"),
            PathElement::Step(step) => write!(f, "{step}"),
            PathElement::Piped(up, down) => write!(f, "{up}/{down}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> PathElement {
        PathElement::Step(AxisStep::child(
            Some(NodeKind::Element),
            Some(name.to_string()),
        ))
    }

    #[test]
    fn test_self_step_is_identity() {
        let a = child("a");
        let composed = a.clone().and_then(PathElement::Step(AxisStep::self_step()));
        assert_eq!(composed, a);
    }

    #[test]
    fn test_sink_absorbs() {
        let composed = child("a").and_then(PathElement::Sink).and_then(child("b"));
        assert_eq!(composed, PathElement::Sink);
    }

    #[test]
    fn test_root_is_left_identity() {
        let composed = PathElement::Root.and_then(child("a"));
        assert_eq!(composed, child("a"));
        // a leading bare self step survives as a step, so its
        // predicates have an owner
        let composed = PathElement::Root.and_then(PathElement::Step(AxisStep::self_step()));
        assert_eq!(composed, PathElement::Step(AxisStep::self_step()));
    }

    #[test]
    fn test_filters_reach_the_owning_step() {
        let mut piped = child("a").and_then(child("b"));
        piped.accept_filter(Filter::Position(2));
        match &piped {
            PathElement::Piped(_, down) => match down.as_ref() {
                PathElement::Step(step) => assert_eq!(step.filters, vec![Filter::Position(2)]),
                other => panic!("unexpected downstream {other:?}"),
            },
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_conflicting_positions_collapse_to_sink() {
        let mut step = child("a");
        step.accept_filter(Filter::Position(2));
        step.accept_filter(Filter::Position(3));
        assert_eq!(step, PathElement::Sink);

        let mut step = child("a");
        step.accept_filter(Filter::Position(2));
        step.accept_filter(Filter::Position(2));
        match &step {
            PathElement::Step(s) => assert_eq!(s.filters.len(), 1),
            other => panic!("unexpected shape {other:?}"),
        }
    }
}
