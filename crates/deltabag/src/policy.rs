//! Observation options and the per-key interception policy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Reserved name of the internal tracking state. Never tracked, and
/// filtered out of union enumeration.
pub const BAG_KEY: &str = "property_bag";

/// Which string keys are tracking candidates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStrategy {
    /// Keys that do not start with `_` and are not blacklisted.
    #[default]
    Public,
    /// Every key.
    All,
}

/// What the enumerate-own-keys trap reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumerationStrategy {
    /// The node's key set alone.
    #[default]
    TrackedOnly,
    /// The raw value's own keys (minus the internal state key) unioned
    /// with the node's key set.
    Union,
}

/// Options consumed by the observation entry point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserveOptions {
    /// Migrate a target's existing properties into the node at
    /// construction, so later writes route through the policy.
    pub seed_existing: bool,
    pub tracking_strategy: TrackingStrategy,
    /// Keys never tracked (ignored for keys already tracked).
    pub blacklist: BTreeSet<String>,
    /// Auto-wrap nested composite values assigned into a tracked key.
    pub deep_wrap: bool,
    pub enumeration_strategy: EnumerationStrategy,
}

impl Default for ObserveOptions {
    fn default() -> ObserveOptions {
        ObserveOptions {
            seed_existing: true,
            tracking_strategy: TrackingStrategy::default(),
            blacklist: BTreeSet::new(),
            deep_wrap: true,
            enumeration_strategy: EnumerationStrategy::default(),
        }
    }
}

/// Property descriptor returned by the descriptor trap.
#[derive(Clone, Debug, PartialEq)]
pub struct Descriptor {
    pub configurable: bool,
    pub enumerable: bool,
    pub writable: bool,
    pub value: Value,
}

impl Descriptor {
    pub(crate) fn data(value: Value) -> Descriptor {
        Descriptor {
            configurable: true,
            enumerable: true,
            writable: true,
            value,
        }
    }
}

/// Decide whether an access to `key` routes to the tracking node.
///
/// Pass-through wins for the reserved internal key and for keys present
/// on the raw underlying value — a host value's own fields are never
/// shadowed by the tracking layer. Keys already present in the node stay
/// tracked even when the configured strategy would now exclude them.
pub fn is_tracked(
    key: &str,
    raw: &Map<String, Value>,
    tracked_has: bool,
    options: &ObserveOptions,
) -> bool {
    if key == BAG_KEY || raw.contains_key(key) {
        return false;
    }
    if tracked_has {
        return true;
    }
    match options.tracking_strategy {
        TrackingStrategy::All => true,
        TrackingStrategy::Public => !key.starts_with('_') && !options.blacklist.contains(key),
    }
}

/// Seeding filter used by the entry point: which existing keys migrate
/// into the node. The rest stay on the raw value and bypass tracking
/// from then on.
pub(crate) fn seeds(key: &str, options: &ObserveOptions) -> bool {
    if options.blacklist.contains(key) {
        return false;
    }
    match options.tracking_strategy {
        TrackingStrategy::All => true,
        TrackingStrategy::Public => !key.starts_with('_'),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with(key: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(key.to_string(), Value::Null);
        map
    }

    #[test]
    fn default_options() {
        let options = ObserveOptions::default();
        assert!(options.seed_existing);
        assert!(options.deep_wrap);
        assert_eq!(options.tracking_strategy, TrackingStrategy::Public);
        assert_eq!(options.enumeration_strategy, EnumerationStrategy::TrackedOnly);
        assert!(options.blacklist.is_empty());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ObserveOptions =
            serde_json::from_str(r#"{"tracking_strategy": "all", "deep_wrap": false}"#).unwrap();
        assert_eq!(options.tracking_strategy, TrackingStrategy::All);
        assert!(!options.deep_wrap);
        assert!(options.seed_existing);
    }

    #[test]
    fn reserved_key_bypasses() {
        let options = ObserveOptions::default();
        assert!(!is_tracked(BAG_KEY, &Map::new(), false, &options));
    }

    #[test]
    fn raw_keys_bypass() {
        let options = ObserveOptions::default();
        assert!(!is_tracked("name", &raw_with("name"), false, &options));
        assert!(is_tracked("name", &Map::new(), false, &options));
    }

    #[test]
    fn public_strategy_excludes_underscore_and_blacklist() {
        let mut options = ObserveOptions::default();
        options.blacklist.insert("secret".to_string());
        assert!(!is_tracked("_private", &Map::new(), false, &options));
        assert!(!is_tracked("secret", &Map::new(), false, &options));
        assert!(is_tracked("public", &Map::new(), false, &options));
    }

    #[test]
    fn all_strategy_tracks_everything() {
        let options = ObserveOptions {
            tracking_strategy: TrackingStrategy::All,
            ..ObserveOptions::default()
        };
        assert!(is_tracked("_private", &Map::new(), false, &options));
    }

    #[test]
    fn tracked_keys_are_grandfathered() {
        let mut options = ObserveOptions::default();
        options.blacklist.insert("grand".to_string());
        assert!(is_tracked("grand", &Map::new(), true, &options));
        assert!(!is_tracked("grand", &Map::new(), false, &options));
    }
}
