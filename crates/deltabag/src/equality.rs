//! Pluggable deep-equality strategy.
//!
//! Every tracked node compares incoming values against its current and
//! baseline state through this strategy, so applications with scalar
//! types that structural equality treats too strictly (or too loosely —
//! e.g. decimals encoded as strings) can substitute their own.

use serde_json::Value;
use std::rc::Rc;

/// Deep value equality as seen by tracked nodes.
pub trait Equality {
    fn eq_values(&self, a: &Value, b: &Value) -> bool;
}

/// The default strategy: structural deep equality.
#[derive(Clone, Copy, Debug, Default)]
pub struct Structural;

impl Equality for Structural {
    fn eq_values(&self, a: &Value, b: &Value) -> bool {
        a == b
    }
}

/// Shared handle to the equality strategy of one tracked graph.
pub type EqualityRef = Rc<dyn Equality>;

pub(crate) fn default_equality() -> EqualityRef {
    Rc::new(Structural)
}

// ── Tests ─────────────────────────────────────────────────────────────────
