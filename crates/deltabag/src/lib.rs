//! deltabag — transparent change tracking for nested JSON-like values.
//!
//! Wraps a `serde_json::Value` in a tracking layer that records every
//! mutation relative to a baseline snapshot and exposes the accumulated
//! delta — changed, added, and deleted keys — in nested, flattened
//! dot-path, or re-nested shapes, ready for a downstream sync step that
//! persists only the delta.
//!
//! # Example
//!
//! ```
//! use deltabag::{observe, ChangeFormat};
//! use serde_json::json;
//!
//! let user = observe(json!({"name": "Ada", "age": 36}));
//! user.sync(false);
//! assert!(!user.is_dirty());
//!
//! user.set("age", json!(37));
//! user.set("team", json!({"id": 9}));
//! user.sync(false);
//!
//! assert_eq!(
//!     user.changed(ChangeFormat::Nested),
//!     Some(json!({"age": 37, "team": {"id": 9}}))
//! );
//! assert_eq!(
//!     user.changed(ChangeFormat::Flat),
//!     Some(json!({"age": 37, "team.id": 9}))
//! );
//! ```

pub mod equality;
pub mod key;
pub mod observe;
pub mod policy;
pub mod property_bag;
pub mod sequence;
pub mod time_box;
pub mod tracked;

pub use equality::{Equality, EqualityRef, Structural};
pub use key::Key;
pub use observe::{observe, observe_value, observe_with, observe_with_equality, Observed};
pub use policy::{Descriptor, EnumerationStrategy, ObserveOptions, TrackingStrategy};
pub use property_bag::{ChangeFormat, PropertyBag};
pub use time_box::TimeBox;
pub use tracked::TrackedValue;
