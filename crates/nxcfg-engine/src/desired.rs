//! Caller-supplied desired state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use nxcfg_types::{DesiredValue, Identity, PropertyValue};

/// Whether the object should exist at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// Object should exist with the managed properties converged.
    Present,
    /// Object should not exist.
    Absent,
}

impl Default for Ensure {
    fn default() -> Self {
        Ensure::Present
    }
}

/// Target state for one resource, supplied per reconciliation call.
///
/// Properties absent from the map are unmanaged: whatever the device has
/// stays untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredResource {
    /// The object's identity tuple.
    pub identity: Identity,
    /// Existence target.
    #[serde(default)]
    pub ensure: Ensure,
    /// Managed properties and their targets.
    #[serde(default)]
    pub properties: BTreeMap<String, DesiredValue>,
}

impl DesiredResource {
    /// Starts a present resource.
    pub fn present(identity: Identity) -> Self {
        Self {
            identity,
            ensure: Ensure::Present,
            properties: BTreeMap::new(),
        }
    }

    /// Starts an absent resource (delete request).
    pub fn absent(identity: Identity) -> Self {
        Self {
            identity,
            ensure: Ensure::Absent,
            properties: BTreeMap::new(),
        }
    }

    /// Manages a property to a literal value.
    pub fn with(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties
            .insert(name.to_string(), DesiredValue::Value(value.into()));
        self
    }

    /// Manages a property to the schema default.
    pub fn with_default(mut self, name: &str) -> Self {
        self.properties
            .insert(name.to_string(), DesiredValue::Default);
        self
    }

    /// Manages a property to its unset representation.
    pub fn with_unset(mut self, name: &str) -> Self {
        self.properties.insert(name.to_string(), DesiredValue::Unset);
        self
    }

    /// The desired value for a property, if managed.
    pub fn property(&self, name: &str) -> Option<&DesiredValue> {
        self.properties.get(name)
    }
}
