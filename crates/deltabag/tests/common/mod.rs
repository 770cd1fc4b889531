//! Shared fixtures for the integration suite.

use serde_json::{json, Value};

/// A freshly-hired employee, as a constructor would build it: scalar
/// fields plus an empty sequence.
pub fn employee() -> Value {
    json!({
        "first_name": "John",
        "last_name": "Doe",
        "title": "Software Engineer",
        "departments": [],
    })
}
