//! The per-level change-tracking node.
//!
//! A `PropertyBag` holds one level of a tracked data graph: the live
//! key/value state, the baseline snapshot taken at the last sync, the
//! pending key sets mutated since, and the diffs materialized by the
//! most recent sync. Nested nodes are reached through the `children`
//! key set so recursion never scans unrelated values.

use crate::equality::EqualityRef;
use crate::key::{Key, LENGTH_KEY};
use crate::observe::Observed;
use crate::time_box::TimeBox;
use crate::tracked::TrackedValue;
use deltabag_dot_path::{expand, flatten};
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use std::fmt;

/// Output shape of a diff or state query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChangeFormat {
    /// The diff's native shape: entries of children that existed at the
    /// last sync merge in under `child.sub` dot paths, children attached
    /// since then nest whole. Sequence nodes render as arrays sized by
    /// their tracked length, untouched positions padded with `null`.
    #[default]
    Nested,
    /// Every entry flattened to a dot path; sequence nodes keep explicit
    /// index entries and their `length` entry.
    Flat,
    /// Dot paths re-nested into one fully nested value.
    Expanded,
}

/// Which pending channel a query reads.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Channel {
    Changing,
    Adding,
    Deleting,
}

pub struct PropertyBag {
    /// Live state.
    properties: IndexMap<Key, TrackedValue>,
    /// State as of the last sync.
    original: IndexMap<Key, TrackedValue>,
    changing: IndexSet<Key>,
    adding: IndexSet<Key>,
    deleting: IndexSet<Key>,
    /// Diff entries materialized by the most recent sync.
    changed: Option<IndexMap<String, Value>>,
    added: Option<IndexMap<String, Value>>,
    deleted: Option<IndexMap<String, Value>>,
    /// Keys whose current value is itself a tracked node.
    children: IndexSet<Key>,
    is_sequence: bool,
    equality: EqualityRef,
}

impl PropertyBag {
    pub fn new(is_sequence: bool, equality: EqualityRef) -> PropertyBag {
        PropertyBag {
            properties: IndexMap::new(),
            original: IndexMap::new(),
            changing: IndexSet::new(),
            adding: IndexSet::new(),
            deleting: IndexSet::new(),
            changed: None,
            added: None,
            deleted: None,
            children: IndexSet::new(),
            is_sequence,
            equality,
        }
    }

    pub fn is_sequence(&self) -> bool {
        self.is_sequence
    }

    pub(crate) fn set_sequence(&mut self, is_sequence: bool) {
        self.is_sequence = is_sequence;
    }

    pub fn keys(&self) -> Vec<Key> {
        self.properties.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<TrackedValue> {
        self.properties.values().cloned().collect()
    }

    pub fn has(&self, key: &Key) -> bool {
        self.properties.contains_key(key)
    }

    pub fn get(&self, key: &Key) -> Option<&TrackedValue> {
        self.properties.get(key)
    }

    /// Number of tracked keys (including a sequence's `length` key).
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// The tracked length of a sequence node, 0 when unset.
    pub fn length(&self) -> usize {
        match self.properties.get(&Key::length()) {
            Some(TrackedValue::Plain(Value::Number(n))) => n.as_u64().unwrap_or(0) as usize,
            _ => 0,
        }
    }

    /// Index-keyed entries of a sequence node, in position order.
    pub(crate) fn index_entries(&self) -> Vec<(usize, TrackedValue)> {
        let mut entries: Vec<(usize, TrackedValue)> = self
            .properties
            .iter()
            .filter_map(|(key, slot)| key.index().map(|index| (index, slot.clone())))
            .collect();
        entries.sort_by_key(|(index, _)| *index);
        entries
    }

    /// Current entries rendered to plain values, for node-merge
    /// reconciliation.
    pub(crate) fn entries_rendered(&self) -> Vec<(Key, TrackedValue)> {
        self.properties
            .iter()
            .map(|(key, slot)| (key.clone(), TrackedValue::Plain(slot.render())))
            .collect()
    }

    fn equals(&self, a: &TrackedValue, b: &TrackedValue) -> bool {
        match (a, b) {
            (TrackedValue::Plain(x), TrackedValue::Plain(y)) => self.equality.eq_values(x, y),
            (TrackedValue::Time(x), TrackedValue::Time(y)) => x.value() == y.value(),
            (TrackedValue::Time(x), TrackedValue::Plain(y))
            | (TrackedValue::Plain(y), TrackedValue::Time(x)) => {
                self.equality.eq_values(&x.to_value(), y)
            }
            (TrackedValue::Node(x), TrackedValue::Node(y)) => Observed::ptr_eq(x, y),
            _ => false,
        }
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Assign `value` at `key`.
    ///
    /// Nested nodes merge into an existing node at the key (the child
    /// keeps its identity and diff history); scalar assignments no-op
    /// when deep-equal to the current value, un-dirty the key when equal
    /// to its baseline, and otherwise mark it pending-changed (and
    /// pending-added when the baseline has no such key). A box reporting
    /// its own in-place mutation skips the current-value shortcut so the
    /// baseline comparison alone decides.
    pub fn set(&mut self, key: Key, value: TrackedValue) {
        if let TrackedValue::Node(node) = value {
            self.set_node(key, node);
            return;
        }

        let previous = self.properties.get(&key).cloned();
        let self_notify = matches!(
            (&value, &previous),
            (TrackedValue::Time(a), Some(TrackedValue::Time(b))) if TimeBox::ptr_eq(a, b)
        );
        if !self_notify {
            if let Some(previous) = &previous {
                if self.equals(&value, previous) {
                    return;
                }
            }
        }

        match &previous {
            // demote: the key no longer holds a node
            Some(TrackedValue::Node(node)) => {
                node.with_bag_mut(|bag| bag.replace(Vec::new()));
            }
            Some(TrackedValue::Time(boxed)) if !self_notify => boxed.unregister(),
            _ => {}
        }

        let baseline = self.original.get(&key).cloned();
        let matches_baseline = baseline
            .as_ref()
            .map(|b| self.equals(&value, b))
            .unwrap_or(false);
        if matches_baseline {
            self.changing.shift_remove(&key);
            self.adding.shift_remove(&key);
            self.deleting.shift_remove(&key);
        } else {
            if baseline.is_none() {
                self.adding.insert(key.clone());
            }
            self.changing.insert(key.clone());
            self.deleting.shift_remove(&key);
        }
        self.children.shift_remove(&key);
        self.properties.insert(key, value);
    }

    fn set_node(&mut self, key: Key, node: Observed) {
        match self.properties.get(&key).cloned() {
            Some(TrackedValue::Node(existing)) => {
                if !Observed::ptr_eq(&existing, &node) {
                    let incoming_sequence = node.is_sequence();
                    let entries = node.with_bag(|bag| bag.entries_rendered());
                    existing.with_bag_mut(|bag| {
                        bag.set_sequence(incoming_sequence);
                        bag.replace(entries);
                    });
                }
                self.children.insert(key);
            }
            previous => {
                if let Some(TrackedValue::Time(boxed)) = &previous {
                    boxed.unregister();
                }
                self.children.insert(key.clone());
                self.properties.insert(key, TrackedValue::Node(node));
            }
        }
    }

    /// Delete `key`. Deleting a key absent from the baseline cancels its
    /// pending add outright — the net effect since the last sync is
    /// nothing. Otherwise the key joins the deleted set; its pre-delete
    /// value stays reachable through the baseline for diff purposes.
    pub fn remove(&mut self, key: &Key) {
        let previous = match self.properties.get(key) {
            Some(slot) => slot.clone(),
            None => return,
        };
        if let TrackedValue::Time(boxed) = &previous {
            boxed.unregister();
        }
        self.children.shift_remove(key);
        self.adding.shift_remove(key);
        if !self.original.contains_key(key) {
            self.changing.shift_remove(key);
            self.properties.shift_remove(key);
            return;
        }
        self.changing.insert(key.clone());
        self.deleting.insert(key.clone());
        self.properties.shift_remove(key);
    }

    /// Reconcile the full key set against `entries`: delete every
    /// current key absent from them, then `set` each entry in turn.
    pub fn replace(&mut self, entries: Vec<(Key, TrackedValue)>) {
        let incoming: IndexSet<Key> = entries.iter().map(|(key, _)| key.clone()).collect();
        let stale: Vec<Key> = self
            .properties
            .keys()
            .filter(|key| !incoming.contains(*key))
            .cloned()
            .collect();
        for key in &stale {
            self.remove(key);
        }
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    // ── Dirtiness and sync ────────────────────────────────────────────────

    /// Whether anything changed since the last sync, here or in any
    /// descendant node.
    pub fn is_dirty(&self) -> bool {
        if !self.changing.is_empty() {
            return true;
        }
        self.children.iter().any(|key| {
            self.properties
                .get(key)
                .and_then(|slot| slot.as_node())
                .map(|node| node.is_dirty())
                .unwrap_or(false)
        })
    }

    /// Materialize the accumulated diff (unless `discard`), clear the
    /// pending sets, snapshot the baseline, and recurse into children.
    ///
    /// The baseline snapshots plain values by copy, child nodes by
    /// handle, and boxes by detached value copy — an in-place mutation
    /// after the sync compares against the value the box held here.
    pub fn sync(&mut self, discard: bool) {
        if discard {
            self.changed = None;
            self.added = None;
            self.deleted = None;
        } else {
            self.changed = non_empty(self.extract(Channel::Changing));
            self.added = non_empty(self.extract(Channel::Adding));
            self.deleted = non_empty(self.extract(Channel::Deleting));
        }

        self.changing.clear();
        self.adding.clear();
        self.deleting.clear();

        self.original = self
            .properties
            .iter()
            .map(|(key, slot)| (key.clone(), snapshot_slot(slot)))
            .collect();

        let children: Vec<Observed> = self
            .children
            .iter()
            .filter_map(|key| self.properties.get(key)?.as_node().cloned())
            .collect();
        for child in children {
            child.sync(discard);
        }
    }

    // ── Diff queries ──────────────────────────────────────────────────────

    /// Keys changed since the last sync, shaped per `format`; `None`
    /// when nothing changed.
    pub fn pending_changed(&self, format: ChangeFormat) -> Option<Value> {
        self.pending(Channel::Changing, format)
    }

    /// Keys added since the last sync.
    pub fn pending_added(&self, format: ChangeFormat) -> Option<Value> {
        self.pending(Channel::Adding, format)
    }

    /// Keys deleted since the last sync, with their pre-delete values.
    pub fn pending_deleted(&self, format: ChangeFormat) -> Option<Value> {
        self.pending(Channel::Deleting, format)
    }

    /// The changed diff captured by the most recent sync.
    pub fn changed(&self, format: ChangeFormat) -> Option<Value> {
        self.changed
            .as_ref()
            .map(|entries| self.shape(entries.clone(), format))
    }

    /// The added diff captured by the most recent sync.
    pub fn added(&self, format: ChangeFormat) -> Option<Value> {
        self.added
            .as_ref()
            .map(|entries| self.shape(entries.clone(), format))
    }

    /// The deleted diff captured by the most recent sync.
    pub fn deleted(&self, format: ChangeFormat) -> Option<Value> {
        self.deleted
            .as_ref()
            .map(|entries| self.shape(entries.clone(), format))
    }

    fn pending(&self, channel: Channel, format: ChangeFormat) -> Option<Value> {
        let entries = self.extract(channel);
        if entries.is_empty() {
            return None;
        }
        Some(self.shape(entries, format))
    }

    /// Current state, fully nested or flattened to dot paths.
    pub fn snapshot(&self, flat: bool) -> Value {
        self.state(false, flat)
    }

    /// Last-synced state, fully nested or flattened to dot paths.
    pub fn baseline(&self, flat: bool) -> Value {
        self.state(true, flat)
    }

    // ── Extraction ────────────────────────────────────────────────────────

    /// Gather one channel's entries: pending keys render from the
    /// channel's source map (deletes read the baseline), then every
    /// child contributes its own recursive extraction — merged in under
    /// `child.sub` dot paths when the child key was present at the last
    /// sync, nested whole otherwise.
    fn extract(&self, channel: Channel) -> IndexMap<String, Value> {
        let (source, keys) = match channel {
            Channel::Changing => (&self.properties, &self.changing),
            Channel::Adding => (&self.properties, &self.adding),
            Channel::Deleting => (&self.original, &self.deleting),
        };

        let mut entries = IndexMap::new();
        for key in keys {
            let rendered = source
                .get(key)
                .map(|slot| slot.render())
                .unwrap_or(Value::Null);
            entries.insert(key.to_string(), rendered);
        }

        for child in &self.children {
            let node = match source.get(child).and_then(|slot| slot.as_node()) {
                Some(node) => node.clone(),
                None => continue,
            };
            let (sub, child_sequence) =
                node.with_bag(|bag| (bag.extract(channel), bag.is_sequence()));
            if self.original.contains_key(child) {
                for (sub_key, sub_value) in sub {
                    entries.insert(format!("{child}.{sub_key}"), sub_value);
                }
            } else {
                entries.insert(child.to_string(), container(sub, child_sequence));
            }
        }

        entries
    }

    fn shape(&self, entries: IndexMap<String, Value>, format: ChangeFormat) -> Value {
        match format {
            ChangeFormat::Nested => container(entries, self.is_sequence),
            ChangeFormat::Flat => flatten(&Value::Object(into_map(entries))),
            ChangeFormat::Expanded => {
                if self.is_sequence {
                    container(entries, true)
                } else {
                    expand(&Value::Object(into_map(entries)))
                }
            }
        }
    }

    fn state(&self, baseline: bool, flat: bool) -> Value {
        let source = if baseline {
            &self.original
        } else {
            &self.properties
        };
        let mut entries = IndexMap::new();
        for (key, slot) in source {
            let rendered = match slot {
                TrackedValue::Node(node) => {
                    if baseline {
                        node.baseline(false)
                    } else {
                        node.snapshot(false)
                    }
                }
                other => other.render(),
            };
            entries.insert(key.to_string(), rendered);
        }
        let format = if flat {
            ChangeFormat::Flat
        } else {
            ChangeFormat::Expanded
        };
        self.shape(entries, format)
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBag")
            .field("keys", &self.properties.keys().collect::<Vec<_>>())
            .field("changing", &self.changing)
            .field("adding", &self.adding)
            .field("deleting", &self.deleting)
            .field("children", &self.children)
            .field("is_sequence", &self.is_sequence)
            .finish()
    }
}

fn non_empty(entries: IndexMap<String, Value>) -> Option<IndexMap<String, Value>> {
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

fn snapshot_slot(slot: &TrackedValue) -> TrackedValue {
    match slot {
        TrackedValue::Plain(value) => TrackedValue::Plain(value.clone()),
        TrackedValue::Node(node) => TrackedValue::Node(node.clone()),
        TrackedValue::Time(boxed) => TrackedValue::Time(boxed.detached()),
    }
}

fn into_map(entries: IndexMap<String, Value>) -> Map<String, Value> {
    entries.into_iter().collect()
}

/// Build a channel's native container: a literal object, or for
/// sequences an array re-nested from index entries and sized by the
/// `length` entry when one participated.
fn container(entries: IndexMap<String, Value>, is_sequence: bool) -> Value {
    if !is_sequence {
        return Value::Object(into_map(entries));
    }
    let mut length = None;
    let mut rest = Map::new();
    for (key, value) in entries {
        if key == LENGTH_KEY {
            length = value.as_u64().map(|n| n as usize);
            continue;
        }
        rest.insert(key, value);
    }
    let mut items = match expand(&Value::Object(rest)) {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    if let Some(length) = length {
        items.resize(length, Value::Null);
    }
    Value::Array(items)
}

// ── Tests ─────────────────────────────────────────────────────────────────
