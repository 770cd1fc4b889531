//! Sequence mutation primitives over a tracked node.
//!
//! Each primitive is expressed through [`Observed::splice`], which
//! re-maps element identity across index shifts as plain node
//! `set`/`delete` operations: a position whose value does not change
//! across the shift is never marked dirty, while a position whose value
//! does change is marked at its new index. The sequence's `length` is a
//! tracked mutation in its own right.

use crate::key::Key;
use crate::observe::{observe_value, Observed};
use crate::tracked::TrackedValue;
use serde_json::Value;
use std::collections::BTreeMap;

impl Observed {
    /// Append an element; returns the new length. No-op on
    /// non-sequence nodes.
    pub fn push(&self, item: Value) -> usize {
        let length = self.len();
        self.splice(length, Some(0), vec![item]);
        self.len()
    }

    /// Remove and return the last element; `None` when empty.
    pub fn pop(&self) -> Option<TrackedValue> {
        let length = self.len();
        if !self.is_sequence() || length == 0 {
            return None;
        }
        self.splice(length - 1, Some(1), Vec::new()).into_iter().next()
    }

    /// Remove and return the first element; `None` when empty.
    pub fn shift(&self) -> Option<TrackedValue> {
        if !self.is_sequence() || self.len() == 0 {
            return None;
        }
        self.splice(0, Some(1), Vec::new()).into_iter().next()
    }

    /// Insert an element at the front; returns the new length.
    pub fn unshift(&self, item: Value) -> usize {
        self.splice(0, Some(0), vec![item]);
        self.len()
    }

    /// Remove `delete_count` elements at `start` — both clamped to the
    /// populated range, `None` deletes through the end — insert `items`
    /// in their place, and return the removed elements (removed
    /// unpopulated positions surface as `null`).
    ///
    /// Elements after the removed range shift to their new positions;
    /// an element whose destination already holds an equal value leaves
    /// no mark. Inserted items pass through the same deep-wrap path as
    /// policy writes. No-op on non-sequence nodes.
    pub fn splice(
        &self,
        start: usize,
        delete_count: Option<usize>,
        items: Vec<Value>,
    ) -> Vec<TrackedValue> {
        if !self.is_sequence() {
            return Vec::new();
        }
        let options = self.options();
        let equality = self.equality();
        let inserted: Vec<TrackedValue> = items
            .into_iter()
            .map(|item| {
                if options.deep_wrap {
                    observe_value(TrackedValue::Plain(item), &options, &equality)
                } else {
                    TrackedValue::Plain(item)
                }
            })
            .collect();
        let inserted_count = inserted.len();

        self.with_bag_mut(|bag| {
            let length = bag.length();
            let start = start.min(length);
            let delete_count = delete_count
                .unwrap_or(length - start)
                .min(length - start);

            let current: BTreeMap<usize, TrackedValue> =
                bag.index_entries().into_iter().collect();

            // lay out the target state: untouched head, inserted items,
            // shifted tail
            let mut target: BTreeMap<usize, TrackedValue> = BTreeMap::new();
            for (&index, slot) in current.range(..start) {
                target.insert(index, slot.clone());
            }
            for (offset, item) in inserted.into_iter().enumerate() {
                target.insert(start + offset, item);
            }
            let shift = delete_count as isize - inserted_count as isize;
            for (&index, slot) in current.range(start + delete_count..) {
                target.insert((index as isize - shift) as usize, slot.clone());
            }

            let removed: Vec<TrackedValue> = (start..start + delete_count)
                .map(|index| {
                    current
                        .get(&index)
                        .cloned()
                        .unwrap_or(TrackedValue::Plain(Value::Null))
                })
                .collect();

            // apply as minimal set/delete against the node
            for (&index, slot) in &target {
                let unchanged = bag
                    .get(&Key::Index(index))
                    .map(|existing| existing.same(slot))
                    .unwrap_or(false);
                if !unchanged {
                    bag.set(Key::Index(index), slot.clone());
                }
            }
            for &index in current.keys() {
                if !target.contains_key(&index) {
                    bag.remove(&Key::Index(index));
                }
            }

            let new_length = length + inserted_count - delete_count;
            bag.set(
                Key::length(),
                TrackedValue::Plain(Value::from(new_length as u64)),
            );

            removed
        })
    }
}
