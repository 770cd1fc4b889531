use deltabag::{observe, ChangeFormat, TrackedValue};
use proptest::prelude::*;
use serde_json::{json, Value};

const NESTED: ChangeFormat = ChangeFormat::Nested;
const FLAT: ChangeFormat = ChangeFormat::Flat;

// ── Length ────────────────────────────────────────────────────────────────

#[test]
fn observed_sequences_track_their_length() {
    assert_eq!(observe(json!([])).len(), 0);
    assert_eq!(observe(json!([null, null, "y", null, null])).len(), 5);
    assert_eq!(observe(json!([0, 1, 2, 3, 4, 5, 6, 7, 8, 9])).len(), 10);
}

#[test]
fn writing_past_the_end_extends_the_length() {
    let sequence = observe(json!(["a"]));
    sequence.sync(false);
    sequence.set("4", json!("e"));
    assert_eq!(sequence.len(), 5);
    assert_eq!(
        sequence.pending_changed(FLAT),
        Some(json!({"4": "e", "length": 5}))
    );
}

#[test]
fn numeric_keys_address_positions() {
    let sequence = observe(json!(["a", "b"]));
    sequence.sync(false);
    sequence.set("1", json!("B"));
    assert_eq!(sequence.get_value("1"), Some(json!("B")));
    assert_eq!(sequence.pending_changed(NESTED), Some(json!([null, "B"])));
}

// ── Splice ────────────────────────────────────────────────────────────────

#[test]
fn splice_keeps_unmoved_positions_clean() {
    let sequence = observe(json!(["a0", "a1", "a2", "a3", "a4"]));
    sequence.sync(false);

    let removed = sequence.splice(1, Some(2), vec![json!("b")]);
    assert_eq!(
        removed
            .iter()
            .map(TrackedValue::render)
            .collect::<Vec<_>>(),
        vec![json!("a1"), json!("a2")]
    );

    assert_eq!(sequence.snapshot(false), json!(["a0", "b", "a3", "a4"]));
    // only positions whose value actually changed are dirty; "a0" never
    // appears in any diff
    assert_eq!(
        sequence.pending_changed(FLAT),
        Some(json!({"1": "b", "2": "a3", "3": "a4", "4": null, "length": 4}))
    );
    assert_eq!(
        sequence.pending_deleted(FLAT),
        Some(json!({"4": "a4"}))
    );
    assert_eq!(sequence.pending_added(FLAT), None);
}

#[test]
fn splice_clamps_start_and_delete_count() {
    let sequence = observe(json!(["a", "b"]));
    sequence.sync(false);

    // start beyond the end appends
    sequence.splice(10, Some(5), vec![json!("c")]);
    assert_eq!(sequence.snapshot(false), json!(["a", "b", "c"]));

    // delete_count beyond the remainder is truncated
    let removed = sequence.splice(1, Some(100), Vec::new());
    assert_eq!(removed.len(), 2);
    assert_eq!(sequence.snapshot(false), json!(["a"]));
}

#[test]
fn splice_without_delete_count_removes_through_the_end() {
    let sequence = observe(json!(["a", "b", "c"]));
    sequence.sync(false);
    let removed = sequence.splice(1, None, Vec::new());
    assert_eq!(removed.len(), 2);
    assert_eq!(sequence.snapshot(false), json!(["a"]));
    assert_eq!(sequence.len(), 1);
}

#[test]
fn identity_splice_pends_nothing_but_length_stays() {
    let sequence = observe(json!(["a", "b"]));
    sequence.sync(false);
    sequence.splice(1, Some(1), vec![json!("b")]);
    assert_eq!(sequence.pending_changed(NESTED), None);
    assert!(!sequence.is_dirty());
}

#[test]
fn splice_is_a_no_op_on_plain_objects() {
    let observable = observe(json!({"a": 1}));
    assert!(observable.splice(0, None, vec![json!(1)]).is_empty());
    assert_eq!(observable.pop(), None);
}

// ── Wrappers ──────────────────────────────────────────────────────────────

#[test]
fn push_appends_and_returns_the_new_length() {
    let sequence = observe(json!([]));
    assert_eq!(sequence.push(json!("x")), 1);
    assert_eq!(sequence.push(json!("y")), 2);
    assert_eq!(sequence.snapshot(false), json!(["x", "y"]));
}

#[test]
fn pop_removes_from_the_end() {
    let sequence = observe(json!(["x", "y"]));
    sequence.sync(false);
    let popped = sequence.pop().unwrap();
    assert_eq!(popped.render(), json!("y"));
    assert_eq!(sequence.snapshot(false), json!(["x"]));
    assert_eq!(sequence.pop().unwrap().render(), json!("x"));
    assert!(sequence.pop().is_none());
}

#[test]
fn shift_and_unshift_work_on_the_front() {
    let sequence = observe(json!(["b", "c"]));
    sequence.sync(false);
    assert_eq!(sequence.unshift(json!("a")), 3);
    assert_eq!(sequence.snapshot(false), json!(["a", "b", "c"]));
    let first = sequence.shift().unwrap();
    assert_eq!(first.render(), json!("a"));
    assert_eq!(sequence.snapshot(false), json!(["b", "c"]));
}

#[test]
fn shifted_elements_keep_their_tracked_nodes() {
    let sequence = observe(json!([{"id": 1}, {"id": 2}]));
    sequence.sync(false);
    sequence.shift();
    // position 0 now holds the values of the old position 1, reconciled
    // into the node that was already tracked there
    assert_eq!(sequence.snapshot(false), json!([{"id": 2}]));
    assert_eq!(
        sequence.pending_changed(FLAT),
        Some(json!({"0.id": 2, "1": null, "length": 1}))
    );
}

// ── Model property ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum SequenceOp {
    Push(i64),
    Pop,
    Shift,
    Unshift(i64),
    Splice(usize, usize, Vec<i64>),
}

fn sequence_op() -> impl Strategy<Value = SequenceOp> {
    prop_oneof![
        any::<i64>().prop_map(SequenceOp::Push),
        Just(SequenceOp::Pop),
        Just(SequenceOp::Shift),
        any::<i64>().prop_map(SequenceOp::Unshift),
        (0usize..8, 0usize..4, prop::collection::vec(any::<i64>(), 0..4))
            .prop_map(|(start, count, items)| SequenceOp::Splice(start, count, items)),
    ]
}

proptest! {
    /// Applying any splice program leaves the tracked state equal to a
    /// plain vector model, and a final sync leaves the node clean.
    #[test]
    fn splice_programs_match_a_vec_model(
        seed in prop::collection::vec(any::<i64>(), 0..6),
        ops in prop::collection::vec(sequence_op(), 0..12),
    ) {
        let mut model: Vec<i64> = seed.clone();
        let sequence = observe(Value::from(seed));
        sequence.sync(false);

        for op in ops {
            match op {
                SequenceOp::Push(item) => {
                    model.push(item);
                    sequence.push(json!(item));
                }
                SequenceOp::Pop => {
                    let expected = model.pop();
                    let actual = sequence.pop().map(|slot| slot.render());
                    prop_assert_eq!(actual, expected.map(|v| json!(v)));
                }
                SequenceOp::Shift => {
                    let expected = if model.is_empty() {
                        None
                    } else {
                        Some(model.remove(0))
                    };
                    let actual = sequence.shift().map(|slot| slot.render());
                    prop_assert_eq!(actual, expected.map(|v| json!(v)));
                }
                SequenceOp::Unshift(item) => {
                    model.insert(0, item);
                    sequence.unshift(json!(item));
                }
                SequenceOp::Splice(start, count, items) => {
                    let start = start.min(model.len());
                    let count = count.min(model.len() - start);
                    let removed: Vec<i64> =
                        model.splice(start..start + count, items.clone()).collect();
                    let tracked_removed: Vec<Value> = sequence
                        .splice(start, Some(count), items.iter().map(|v| json!(v)).collect())
                        .iter()
                        .map(TrackedValue::render)
                        .collect();
                    prop_assert_eq!(
                        tracked_removed,
                        removed.into_iter().map(|v| json!(v)).collect::<Vec<_>>()
                    );
                }
            }
            prop_assert_eq!(sequence.snapshot(false), json!(model.clone()));
            prop_assert_eq!(sequence.len(), model.len());
        }

        sequence.sync(false);
        prop_assert!(!sequence.is_dirty());
        prop_assert_eq!(sequence.baseline(false), json!(model));
    }
}
