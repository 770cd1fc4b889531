//! Observation entry point and the trap surface.
//!
//! `observe` wraps a plain value for change tracking and returns an
//! [`Observed`] handle. The handle's accessor methods are the six-trap
//! contract (descriptor/has/get/set/remove/keys); each one consults the
//! interception policy, so reads and writes either route to the
//! tracking node or pass through to the raw underlying value.

use crate::equality::{default_equality, EqualityRef};
use crate::key::Key;
use crate::policy::{self, Descriptor, EnumerationStrategy, ObserveOptions};
use crate::property_bag::{ChangeFormat, PropertyBag};
use crate::time_box::TimeBox;
use crate::tracked::TrackedValue;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct Observable {
    /// Pass-through storage for keys the policy leaves untracked.
    raw: Map<String, Value>,
    bag: PropertyBag,
    options: ObserveOptions,
    equality: EqualityRef,
}

/// Handle to one observed value. Cloning clones the handle; all clones
/// address the same tracking node.
///
/// The tracked graph is single-threaded by design: handles are not
/// `Send`, and a node must not be reachable from itself (cycles are
/// outside the ownership model).
#[derive(Clone)]
pub struct Observed {
    inner: Rc<RefCell<Observable>>,
}

/// Wrap `target` for change tracking with default options.
///
/// Objects become plain tracked nodes, arrays become sequence nodes
/// with a tracked `length`, scalars produce an empty node. With
/// `seed_existing`, the target's properties migrate into the node —
/// every seeded key starts out pending-added, exactly as if it had been
/// assigned through the tracking layer.
pub fn observe(target: Value) -> Observed {
    observe_with(target, ObserveOptions::default())
}

/// Wrap `target` with explicit options.
pub fn observe_with(target: Value, options: ObserveOptions) -> Observed {
    observe_with_equality(target, options, default_equality())
}

/// Wrap `target` with explicit options and a custom equality strategy.
/// The strategy is inherited by every nested node of the graph.
pub fn observe_with_equality(
    target: Value,
    options: ObserveOptions,
    equality: EqualityRef,
) -> Observed {
    match target {
        Value::Array(items) => {
            let node = Observed::empty(true, options, equality);
            let length = items.len();
            let seed = node.inner.borrow().options.seed_existing;
            if seed {
                for (index, item) in items.into_iter().enumerate() {
                    node.set(&index.to_string(), item);
                }
            } else {
                let mut inner = node.inner.borrow_mut();
                for (index, item) in items.into_iter().enumerate() {
                    inner.raw.insert(index.to_string(), item);
                }
            }
            node.with_bag_mut(|bag| {
                bag.set(Key::length(), TrackedValue::Plain(Value::from(length as u64)))
            });
            node
        }
        Value::Object(map) => {
            let node = Observed::empty(false, options, equality);
            let mut seeded = Vec::new();
            {
                let mut inner = node.inner.borrow_mut();
                let seed = inner.options.seed_existing;
                for (key, value) in map {
                    if seed && policy::seeds(&key, &inner.options) {
                        seeded.push((key, value));
                    } else {
                        inner.raw.insert(key, value);
                    }
                }
            }
            for (key, value) in seeded {
                node.set(&key, value);
            }
            node
        }
        _ => Observed::empty(false, options, equality),
    }
}

/// Re-wrap a slot value: already-tracked slots (nodes, boxes) pass
/// through unchanged, plain composites are wrapped, plain scalars fall
/// through untouched.
pub fn observe_value(
    value: TrackedValue,
    options: &ObserveOptions,
    equality: &EqualityRef,
) -> TrackedValue {
    match value {
        TrackedValue::Plain(plain @ (Value::Object(_) | Value::Array(_))) => TrackedValue::Node(
            observe_with_equality(plain, options.clone(), equality.clone()),
        ),
        other => other,
    }
}

impl Observed {
    fn empty(is_sequence: bool, options: ObserveOptions, equality: EqualityRef) -> Observed {
        Observed {
            inner: Rc::new(RefCell::new(Observable {
                raw: Map::new(),
                bag: PropertyBag::new(is_sequence, equality.clone()),
                options,
                equality,
            })),
        }
    }

    /// Same underlying node.
    pub fn ptr_eq(a: &Observed, b: &Observed) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    pub fn options(&self) -> ObserveOptions {
        self.inner.borrow().options.clone()
    }

    pub(crate) fn equality(&self) -> EqualityRef {
        self.inner.borrow().equality.clone()
    }

    pub fn is_sequence(&self) -> bool {
        self.inner.borrow().bag.is_sequence()
    }

    /// Tracked length for sequences; number of tracked keys otherwise.
    pub fn len(&self) -> usize {
        let inner = self.inner.borrow();
        if inner.bag.is_sequence() {
            inner.bag.length()
        } else {
            inner.bag.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn with_bag<R>(&self, f: impl FnOnce(&PropertyBag) -> R) -> R {
        f(&self.inner.borrow().bag)
    }

    pub(crate) fn with_bag_mut<R>(&self, f: impl FnOnce(&mut PropertyBag) -> R) -> R {
        f(&mut self.inner.borrow_mut().bag)
    }

    /// Convert a string key for node access: numeric keys address
    /// positions in sequence nodes.
    fn node_key(bag: &PropertyBag, key: &str) -> Key {
        if bag.is_sequence() {
            Key::for_sequence(key)
        } else {
            Key::Str(key.to_string())
        }
    }

    fn tracked(inner: &Observable, key: &str) -> bool {
        let node_key = Observed::node_key(&inner.bag, key);
        policy::is_tracked(key, &inner.raw, inner.bag.has(&node_key), &inner.options)
    }

    /// Assign a slot, extending a sequence's tracked length when the key
    /// addresses a position past the end.
    fn assign(inner: &mut Observable, node_key: Key, slot: TrackedValue) {
        if let Key::Index(index) = node_key {
            let length = inner.bag.length();
            inner.bag.set(Key::Index(index), slot);
            if index >= length {
                inner.bag.set(
                    Key::length(),
                    TrackedValue::Plain(Value::from(index as u64 + 1)),
                );
            }
            return;
        }
        inner.bag.set(node_key, slot);
    }

    // ── Trap surface ──────────────────────────────────────────────────────

    /// Get-own-property-descriptor trap.
    pub fn descriptor(&self, key: &str) -> Option<Descriptor> {
        let inner = self.inner.borrow();
        if !Observed::tracked(&inner, key) {
            return inner.raw.get(key).map(|value| Descriptor::data(value.clone()));
        }
        inner
            .bag
            .get(&Observed::node_key(&inner.bag, key))
            .map(|slot| Descriptor::data(slot.render()))
    }

    /// Has trap.
    pub fn has(&self, key: &str) -> bool {
        let inner = self.inner.borrow();
        if !Observed::tracked(&inner, key) {
            return inner.raw.contains_key(key);
        }
        inner.bag.has(&Observed::node_key(&inner.bag, key))
    }

    /// Get trap. Untracked keys read from the raw value.
    pub fn get(&self, key: &str) -> Option<TrackedValue> {
        let inner = self.inner.borrow();
        if !Observed::tracked(&inner, key) {
            return inner.raw.get(key).cloned().map(TrackedValue::Plain);
        }
        inner.bag.get(&Observed::node_key(&inner.bag, key)).cloned()
    }

    /// Materialized plain view of [`Observed::get`].
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.get(key).map(|slot| slot.render())
    }

    /// Set trap. Untracked keys write to the raw value; tracked
    /// composite values deep-wrap first (when enabled), and numeric keys
    /// on sequences extend the tracked length past the end.
    pub fn set(&self, key: &str, value: Value) {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        if !Observed::tracked(inner, key) {
            inner.raw.insert(key.to_string(), value);
            return;
        }
        let wrapped = if inner.options.deep_wrap {
            observe_value(TrackedValue::Plain(value), &inner.options, &inner.equality)
        } else {
            TrackedValue::Plain(value)
        };
        let node_key = Observed::node_key(&inner.bag, key);
        Observed::assign(inner, node_key, wrapped);
    }

    /// Assign an already-tracked node at `key`. On an untracked key the
    /// node's rendered snapshot lands on the raw value instead.
    pub fn set_node(&self, key: &str, node: Observed) {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        if !Observed::tracked(inner, key) {
            inner.raw.insert(key.to_string(), node.snapshot(false));
            return;
        }
        let node_key = Observed::node_key(&inner.bag, key);
        Observed::assign(inner, node_key, TrackedValue::Node(node));
    }

    /// Assign an observable time value at `key`, returning the live box.
    /// The box is registered to this node and key: every in-place
    /// mutation reports back as a reassignment. On an untracked key the
    /// serialized instant lands on the raw value and the returned box is
    /// unregistered.
    pub fn set_time(&self, key: &str, value: DateTime<Utc>) -> TimeBox {
        let boxed = TimeBox::new(value);
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        if !Observed::tracked(inner, key) {
            inner.raw.insert(key.to_string(), boxed.to_value());
            return boxed;
        }
        let node_key = Observed::node_key(&inner.bag, key);
        self.register_box(&boxed, node_key.clone());
        Observed::assign(inner, node_key, TrackedValue::Time(boxed.clone()));
        boxed
    }

    fn register_box(&self, boxed: &TimeBox, key: Key) {
        let weak = Rc::downgrade(&self.inner);
        boxed.register(Rc::new(move |reporting: &TimeBox| {
            if let Some(owner) = weak.upgrade() {
                owner
                    .borrow_mut()
                    .bag
                    .set(key.clone(), TrackedValue::Time(reporting.clone()));
            }
        }));
    }

    /// Delete-property trap.
    pub fn remove(&self, key: &str) {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        if !Observed::tracked(inner, key) {
            inner.raw.remove(key);
            return;
        }
        let node_key = Observed::node_key(&inner.bag, key);
        inner.bag.remove(&node_key);
    }

    /// Enumerate-own-keys trap.
    pub fn keys(&self) -> Vec<String> {
        let inner = self.inner.borrow();
        match inner.options.enumeration_strategy {
            EnumerationStrategy::TrackedOnly => {
                inner.bag.keys().iter().map(|key| key.to_string()).collect()
            }
            EnumerationStrategy::Union => {
                let mut keys: IndexSet<String> = inner
                    .raw
                    .keys()
                    .filter(|key| key.as_str() != policy::BAG_KEY)
                    .cloned()
                    .collect();
                for key in inner.bag.keys() {
                    keys.insert(key.to_string());
                }
                keys.into_iter().collect()
            }
        }
    }

    // ── Diff query surface ────────────────────────────────────────────────

    /// Recursively materialize the accumulated diff (or discard it) and
    /// reset every descendant node's baseline to its current state.
    pub fn sync(&self, discard: bool) {
        self.inner.borrow_mut().bag.sync(discard);
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().bag.is_dirty()
    }

    pub fn changed(&self, format: ChangeFormat) -> Option<Value> {
        self.inner.borrow().bag.changed(format)
    }

    pub fn added(&self, format: ChangeFormat) -> Option<Value> {
        self.inner.borrow().bag.added(format)
    }

    pub fn deleted(&self, format: ChangeFormat) -> Option<Value> {
        self.inner.borrow().bag.deleted(format)
    }

    pub fn pending_changed(&self, format: ChangeFormat) -> Option<Value> {
        self.inner.borrow().bag.pending_changed(format)
    }

    pub fn pending_added(&self, format: ChangeFormat) -> Option<Value> {
        self.inner.borrow().bag.pending_added(format)
    }

    pub fn pending_deleted(&self, format: ChangeFormat) -> Option<Value> {
        self.inner.borrow().bag.pending_deleted(format)
    }

    /// Current state, nested or flattened to dot paths.
    pub fn snapshot(&self, flat: bool) -> Value {
        self.inner.borrow().bag.snapshot(flat)
    }

    /// Last-synced state, nested or flattened to dot paths.
    pub fn baseline(&self, flat: bool) -> Value {
        self.inner.borrow().bag.baseline(flat)
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Observed({:p})", Rc::as_ptr(&self.inner))
    }
}
