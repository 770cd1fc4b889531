//! The tracked key domain.

use std::fmt;

/// Name of the tracked length key carried by sequence nodes.
pub const LENGTH_KEY: &str = "length";

/// A key into a tracked node: an object property name or a sequence
/// position.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Str(String),
    Index(usize),
}

impl Key {
    /// Interpret a string key in sequence context: keys that parse as an
    /// unsigned integer address positions, everything else (including
    /// non-integer numeric-looking keys like `1.5`) falls through to
    /// plain key handling.
    pub fn for_sequence(key: &str) -> Key {
        match key.parse::<usize>() {
            Ok(index) => Key::Index(index),
            Err(_) => Key::Str(key.to_string()),
        }
    }

    /// The sequence position this key addresses, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            Key::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Str(name) => Some(name),
            Key::Index(_) => None,
        }
    }

    /// The tracked length key of a sequence node.
    pub fn length() -> Key {
        Key::Str(LENGTH_KEY.to_string())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Key {
        Key::Str(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Key {
        Key::Str(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Key {
        Key::Index(index)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_keys_parse_integers() {
        assert_eq!(Key::for_sequence("0"), Key::Index(0));
        assert_eq!(Key::for_sequence("42"), Key::Index(42));
    }

    #[test]
    fn non_integer_keys_fall_through() {
        assert_eq!(Key::for_sequence("1.5"), Key::Str("1.5".to_string()));
        assert_eq!(Key::for_sequence("-1"), Key::Str("-1".to_string()));
        assert_eq!(Key::for_sequence("length"), Key::Str("length".to_string()));
    }

    #[test]
    fn display_matches_dot_path_steps() {
        assert_eq!(Key::Index(3).to_string(), "3");
        assert_eq!(Key::from("name").to_string(), "name");
    }
}
