//! The tagged value union stored in tracked nodes.

use crate::observe::Observed;
use crate::time_box::TimeBox;
use serde_json::Value;

/// One value slot in a tracked node: a plain JSON value, a nested
/// tracked node, or an observable time value.
///
/// The tag replaces any structural "is this already tracked" probing —
/// a slot either is a node or it is not.
#[derive(Clone, Debug)]
pub enum TrackedValue {
    Plain(Value),
    Node(Observed),
    Time(TimeBox),
}

impl TrackedValue {
    /// Materialize the slot as plain JSON. Nested nodes render their
    /// current state, time values render as RFC 3339 strings.
    pub fn render(&self) -> Value {
        match self {
            TrackedValue::Plain(value) => value.clone(),
            TrackedValue::Node(node) => node.snapshot(false),
            TrackedValue::Time(boxed) => boxed.to_value(),
        }
    }

    pub fn as_plain(&self) -> Option<&Value> {
        match self {
            TrackedValue::Plain(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Observed> {
        match self {
            TrackedValue::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&TimeBox> {
        match self {
            TrackedValue::Time(boxed) => Some(boxed),
            _ => None,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, TrackedValue::Node(_))
    }

    /// Identity comparison used by the sequence adapter to skip
    /// re-assignments that would not move anything: handles compare by
    /// cell, plain values structurally.
    pub(crate) fn same(&self, other: &TrackedValue) -> bool {
        match (self, other) {
            (TrackedValue::Plain(a), TrackedValue::Plain(b)) => a == b,
            (TrackedValue::Node(a), TrackedValue::Node(b)) => Observed::ptr_eq(a, b),
            (TrackedValue::Time(a), TrackedValue::Time(b)) => TimeBox::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for TrackedValue {
    fn eq(&self, other: &TrackedValue) -> bool {
        self.same(other)
    }
}

impl From<Value> for TrackedValue {
    fn from(value: Value) -> TrackedValue {
        TrackedValue::Plain(value)
    }
}
