//! Composite identity tuples.
//!
//! Every device object is addressed by an ordered tuple of fields (e.g.
//! asn + vrf + neighbor + afi + safi for a BGP neighbor address-family).
//! Components are normalized on construction so that `7` and `"7"`, or
//! `Ethernet1/1` and `ethernet1/1`, compare equal without ad hoc string
//! concatenation at the call sites.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::PropertyValue;

/// Ordered, normalized identity tuple with structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity(Vec<String>);

impl Identity {
    /// Builds an identity from string-like components.
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Identity(
            parts
                .into_iter()
                .map(|p| normalize_component(p.as_ref()))
                .collect(),
        )
    }

    /// Builds an identity from property values, using their canonical
    /// scalar text (so integer and string renderings collapse).
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a PropertyValue>,
    {
        Identity(
            values
                .into_iter()
                .map(|v| normalize_component(&v.scalar_text().unwrap_or_default()))
                .collect(),
        )
    }

    /// The normalized components, in declaration order.
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the tuple has no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Trims and case-folds one identity component.
fn normalize_component(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalized_equality() {
        let a = Identity::new(["65001", "default", "10.1.1.1"]);
        let b = Identity::new([" 65001 ", "DEFAULT", "10.1.1.1"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_type_insensitive_from_values() {
        let a = Identity::from_values(&[PropertyValue::Int(7), PropertyValue::str("red")]);
        let b = Identity::new(["7", "Red"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_identities() {
        let a = Identity::new(["65001", "default", "10.1.1.1"]);
        let b = Identity::new(["65001", "blue", "10.1.1.1"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let id = Identity::new(["65001", "default", "10.1.1.1"]);
        assert_eq!(id.to_string(), "65001/default/10.1.1.1");
        assert_eq!(id.len(), 3);
        assert!(!id.is_empty());
    }
}
