mod common;

use common::employee;
use deltabag::{observe, observe_with_equality, ChangeFormat, Equality, ObserveOptions};
use deltabag_dot_path::{expand, flatten};
use serde_json::{json, Value};
use std::rc::Rc;

#[test]
fn a_fresh_child_nests_whole_in_every_shape() {
    let observable = observe(json!({}));
    observable.set("x", json!({"y": 1}));
    assert_eq!(
        observable.pending_changed(ChangeFormat::Nested),
        Some(json!({"x": {"y": 1}}))
    );
    assert_eq!(
        observable.pending_changed(ChangeFormat::Flat),
        Some(json!({"x.y": 1}))
    );
    assert_eq!(
        observable.pending_changed(ChangeFormat::Expanded),
        Some(json!({"x": {"y": 1}}))
    );
}

#[test]
fn a_synced_child_merges_under_dot_paths_in_the_nested_shape() {
    let observable = observe(json!({"x": {"y": 1, "z": 2}}));
    observable.sync(false);
    let x = observable.get("x").unwrap().as_node().unwrap().clone();
    x.set("y", json!(9));

    assert_eq!(
        observable.pending_changed(ChangeFormat::Nested),
        Some(json!({"x.y": 9}))
    );
    assert_eq!(
        observable.pending_changed(ChangeFormat::Flat),
        Some(json!({"x.y": 9}))
    );
    assert_eq!(
        observable.pending_changed(ChangeFormat::Expanded),
        Some(json!({"x": {"y": 9}}))
    );
}

#[test]
fn shapes_agree_through_the_dot_path_utility() {
    let observable = observe(employee());
    observable.sync(false);
    observable.set("title", json!("Staff Engineer"));
    observable.set("address", json!({"city": "Oslo", "geo": {"lat": 59.9}}));

    let flat = observable.pending_changed(ChangeFormat::Flat).unwrap();
    let expanded = observable.pending_changed(ChangeFormat::Expanded).unwrap();
    assert_eq!(expand(&flat), expanded);
    assert_eq!(flatten(&expanded), flat);
}

#[test]
fn snapshots_flatten_on_request() {
    let observable = observe(json!({"user": {"name": "Ada", "langs": ["en", "fr"]}}));
    assert_eq!(
        observable.snapshot(false),
        json!({"user": {"name": "Ada", "langs": ["en", "fr"]}})
    );
    assert_eq!(
        observable.snapshot(true),
        json!({"user.name": "Ada", "user.langs.0": "en", "user.langs.1": "fr"})
    );
}

#[test]
fn baselines_render_the_last_synced_state() {
    let observable = observe(json!({"user": {"name": "Ada"}}));
    observable.sync(false);
    let user = observable.get("user").unwrap().as_node().unwrap().clone();
    user.set("name", json!("Grace"));

    assert_eq!(
        observable.baseline(false),
        json!({"user": {"name": "Ada"}})
    );
    assert_eq!(
        observable.snapshot(false),
        json!({"user": {"name": "Grace"}})
    );
    assert_eq!(observable.baseline(true), json!({"user.name": "Ada"}));
}

// ── Custom equality ───────────────────────────────────────────────────────

struct CaseInsensitive;

impl Equality for CaseInsensitive {
    fn eq_values(&self, a: &Value, b: &Value) -> bool {
        match (a.as_str(), b.as_str()) {
            (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
            _ => a == b,
        }
    }
}

#[test]
fn a_custom_equality_strategy_decides_dirtiness() {
    let observable = observe_with_equality(
        json!({"name": "Ada"}),
        ObserveOptions::default(),
        Rc::new(CaseInsensitive),
    );
    observable.sync(false);

    observable.set("name", json!("ADA"));
    assert!(!observable.is_dirty());

    observable.set("name", json!("Grace"));
    assert!(observable.is_dirty());
}

#[test]
fn nested_nodes_inherit_the_equality_strategy() {
    let observable = observe_with_equality(
        json!({}),
        ObserveOptions::default(),
        Rc::new(CaseInsensitive),
    );
    observable.set("user", json!({"name": "Ada"}));
    observable.sync(false);

    let user = observable.get("user").unwrap().as_node().unwrap().clone();
    user.set("name", json!("ada"));
    assert!(!observable.is_dirty());
}
