//! Name placement rules shared by drivers and callers.

use std::fmt;
use std::sync::Arc;

use crate::naming::posix_join;

/// Function form of a [`Location`].
pub type NameTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Where a name is placed: under a literal prefix or wherever a
/// transform puts it.
///
/// Used both for a driver's configured `location` and for the
/// destination a caller passes to `save`.
#[derive(Clone)]
pub enum Location {
    /// POSIX-joined in front of the name; empty means unchanged.
    Prefix(String),
    /// Arbitrary rewrite of the name.
    Transform(NameTransform),
}

impl Location {
    /// Leave names unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self::Prefix(String::new())
    }

    /// Build a transform location.
    #[must_use]
    pub fn transform(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::Transform(Arc::new(f))
    }

    /// Apply the rule to `name`.
    #[must_use]
    pub fn apply(&self, name: &str) -> String {
        match self {
            Self::Prefix(prefix) if prefix.is_empty() => name.to_string(),
            Self::Prefix(prefix) => posix_join(prefix, name),
            Self::Transform(f) => f(name),
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefix(prefix) => f.debug_tuple("Prefix").field(prefix).finish(),
            Self::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

impl From<&str> for Location {
    fn from(prefix: &str) -> Self {
        Self::Prefix(prefix.to_string())
    }
}

impl From<String> for Location {
    fn from(prefix: String) -> Self {
        Self::Prefix(prefix)
    }
}

impl From<Option<String>> for Location {
    fn from(prefix: Option<String>) -> Self {
        prefix.map_or_else(Self::identity, Self::Prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_location() {
        assert_eq!(Location::identity().apply("a/b.txt"), "a/b.txt");
        assert_eq!(Location::from(None).apply("b.txt"), "b.txt");
    }

    #[test]
    fn test_prefix_location() {
        let location = Location::from("avatars");
        assert_eq!(location.apply("me.png"), "avatars/me.png");
        assert_eq!(location.apply("/abs/me.png"), "/abs/me.png");
    }

    #[test]
    fn test_transform_location() {
        let location = Location::transform(|name| format!("2026/10/{name}"));
        assert_eq!(location.apply("me.png"), "2026/10/me.png");
        assert_eq!(format!("{location:?}"), "Transform(..)");
    }
}
