//! Property value model.
//!
//! Device properties are scalars (strings or integers), booleans, or lists.
//! An unconfigured boolean is represented by the *absence* of the map entry,
//! never by a third state inside the boolean itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Map from property name to its value, as read from or sent to a device.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A single property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean property (e.g. `shutdown`, `suppress_arp`).
    Bool(bool),
    /// Integer property (e.g. a timer, a prefix limit).
    Int(i64),
    /// String property (e.g. a route-map name, a VLAN range).
    Str(String),
    /// List-valued property (e.g. a peer list).
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Creates a string value.
    pub fn str(s: impl Into<String>) -> Self {
        PropertyValue::Str(s.into())
    }

    /// Creates a list of string values.
    pub fn str_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropertyValue::List(items.into_iter().map(PropertyValue::str).collect())
    }

    /// Returns the boolean payload, accepting common textual renderings.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            PropertyValue::Int(0) => Some(false),
            PropertyValue::Int(1) => Some(true),
            PropertyValue::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Renders a scalar payload as its canonical text form.
    ///
    /// Lists have no scalar text; they return `None`.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            PropertyValue::Bool(b) => Some(b.to_string()),
            PropertyValue::Int(i) => Some(i.to_string()),
            PropertyValue::Str(s) => Some(s.trim().to_string()),
            PropertyValue::List(_) => None,
        }
    }

    /// Returns true for the empty-string / empty-list "nothing" values.
    pub fn is_empty_value(&self) -> bool {
        match self {
            PropertyValue::Str(s) => s.trim().is_empty(),
            PropertyValue::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Str(s) => write!(f, "{}", s),
            PropertyValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(","))
            }
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Str(s)
    }
}

/// A caller-supplied desired value for one property.
///
/// Absence of the map entry altogether means "unmanaged": the reconciler
/// leaves whatever the device currently has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DesiredValue {
    /// A literal target value.
    Value(PropertyValue),
    /// Resolve to the schema default for this property.
    Default,
    /// Resolve to the schema's "unset" representation for this property.
    Unset,
}

impl DesiredValue {
    /// Creates a literal desired value from anything convertible.
    pub fn value(v: impl Into<PropertyValue>) -> Self {
        DesiredValue::Value(v.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_as_bool() {
        assert_eq!(PropertyValue::Bool(true).as_bool(), Some(true));
        assert_eq!(PropertyValue::str("True").as_bool(), Some(true));
        assert_eq!(PropertyValue::str("false").as_bool(), Some(false));
        assert_eq!(PropertyValue::Int(1).as_bool(), Some(true));
        assert_eq!(PropertyValue::Int(0).as_bool(), Some(false));
        assert_eq!(PropertyValue::str("maybe").as_bool(), None);
        assert_eq!(PropertyValue::str_list(["a"]).as_bool(), None);
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(PropertyValue::Int(7).scalar_text(), Some("7".to_string()));
        assert_eq!(
            PropertyValue::str(" 7 ").scalar_text(),
            Some("7".to_string())
        );
        assert_eq!(
            PropertyValue::Bool(true).scalar_text(),
            Some("true".to_string())
        );
        assert_eq!(PropertyValue::str_list(["a"]).scalar_text(), None);
    }

    #[test]
    fn test_is_empty_value() {
        assert!(PropertyValue::str("").is_empty_value());
        assert!(PropertyValue::str("  ").is_empty_value());
        assert!(PropertyValue::List(vec![]).is_empty_value());
        assert!(!PropertyValue::Int(0).is_empty_value());
        assert!(!PropertyValue::str("x").is_empty_value());
    }

    #[test]
    fn test_serde_untagged() {
        let v: PropertyValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, PropertyValue::Int(42));

        let v: PropertyValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, PropertyValue::Bool(true));

        let v: PropertyValue = serde_json::from_str("\"up\"").unwrap();
        assert_eq!(v, PropertyValue::str("up"));

        let v: PropertyValue = serde_json::from_str("[\"a\",\"b\"]").unwrap();
        assert_eq!(v, PropertyValue::str_list(["a", "b"]));
    }

    #[test]
    fn test_display() {
        assert_eq!(PropertyValue::str_list(["a", "b"]).to_string(), "[a,b]");
        assert_eq!(PropertyValue::Int(10).to_string(), "10");
    }
}
