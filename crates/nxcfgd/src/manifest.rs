//! Manifest and device-state file formats.
//!
//! Plain JSON, owned entirely by this binary. Property values map onto the
//! engine's value model directly; the strings `"$default"` and `"$unset"`
//! are reserved as desired-value sentinels.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

use nxcfg_engine::{DesiredResource, Ensure};
use nxcfg_types::{DesiredValue, Identity, PropertyMap, PropertyValue};

/// Reserved manifest string resolving to the schema default.
pub const DEFAULT_SENTINEL: &str = "$default";

/// Reserved manifest string resolving to the unset representation.
pub const UNSET_SENTINEL: &str = "$unset";

/// Desired-state manifest.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    /// Desired resources, any mix of kinds.
    pub resources: Vec<ManifestResource>,
}

/// One desired resource as written in a manifest.
#[derive(Debug, Deserialize)]
pub struct ManifestResource {
    /// Resource kind name.
    pub kind: String,
    /// Identity components, in schema order.
    pub identity: Vec<String>,
    /// Existence target; defaults to present.
    #[serde(default)]
    pub ensure: Ensure,
    /// Managed properties.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Seeded device state for simulation runs.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceState {
    /// Pre-existing objects on the simulated device.
    #[serde(default)]
    pub objects: Vec<StateObject>,
}

/// One pre-existing object.
#[derive(Debug, Deserialize)]
pub struct StateObject {
    /// Resource kind name.
    pub kind: String,
    /// Identity components.
    pub identity: Vec<String>,
    /// Current property values.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Manifest {
    /// Groups the manifest's resources by kind, preserving manifest order
    /// within each kind and the order of first appearance across kinds.
    pub fn desired_by_kind(&self) -> Result<Vec<(String, Vec<DesiredResource>)>> {
        let mut order: Vec<String> = Vec::new();
        let mut grouped: BTreeMap<String, Vec<DesiredResource>> = BTreeMap::new();
        for resource in &self.resources {
            if !grouped.contains_key(&resource.kind) {
                order.push(resource.kind.clone());
            }
            grouped
                .entry(resource.kind.clone())
                .or_default()
                .push(resource.to_desired()?);
        }
        Ok(order
            .into_iter()
            .map(|kind| {
                let batch = grouped.remove(&kind).unwrap_or_default();
                (kind, batch)
            })
            .collect())
    }
}

impl ManifestResource {
    fn to_desired(&self) -> Result<DesiredResource> {
        let mut desired = DesiredResource {
            identity: Identity::new(&self.identity),
            ensure: self.ensure,
            properties: BTreeMap::new(),
        };
        for (name, raw) in &self.properties {
            desired
                .properties
                .insert(name.clone(), desired_value(name, raw)?);
        }
        Ok(desired)
    }
}

impl StateObject {
    /// Converts into the engine's identity and property map.
    pub fn to_parts(&self) -> Result<(Identity, PropertyMap)> {
        let mut properties = PropertyMap::new();
        for (name, raw) in &self.properties {
            properties.insert(name.clone(), property_value(name, raw)?);
        }
        Ok((Identity::new(&self.identity), properties))
    }
}

fn desired_value(name: &str, raw: &serde_json::Value) -> Result<DesiredValue> {
    if let serde_json::Value::String(s) = raw {
        if s == DEFAULT_SENTINEL {
            return Ok(DesiredValue::Default);
        }
        if s == UNSET_SENTINEL {
            return Ok(DesiredValue::Unset);
        }
    }
    Ok(DesiredValue::Value(property_value(name, raw)?))
}

fn property_value(name: &str, raw: &serde_json::Value) -> Result<PropertyValue> {
    serde_json::from_value(raw.clone())
        .map_err(|e| anyhow!("property '{}' has unsupported value {}: {}", name, raw, e))
}
