//! Instance index.
//!
//! Builds an in-memory map of live instances of one resource kind, keyed by
//! identity. Enumeration is best-effort: a malformed or partially-readable
//! record is skipped with a warning rather than aborting the whole scan.
//! A duplicate identity, however, is an integrity violation and fails the
//! scan — matching would be ambiguous from then on.

use std::collections::HashMap;
use tracing::{debug, instrument, warn};

use nxcfg_types::{Identity, PropertyMap, PropertyValue};

use crate::desired::DesiredResource;
use crate::driver::{DeviceDriver, DeviceHandle, DriverError, InstanceRecord};
use crate::error::{ReconcileError, ReconcileResult};
use crate::schema::ResourceKind;

/// The live device-side representation of one object.
#[derive(Debug, Clone)]
pub struct Instance {
    /// Handle for mutations against this object.
    pub handle: DeviceHandle,
    /// The object's identity tuple.
    pub identity: Identity,
    /// Current values for schema-known properties. Properties the device
    /// reported as not applicable are absent, not defaulted.
    pub properties: PropertyMap,
}

impl Instance {
    /// The current value of a property, if the device has it set.
    pub fn current(&self, property: &str) -> Option<&PropertyValue> {
        self.properties.get(property)
    }
}

/// Scan strategy knobs.
///
/// Bulk enumeration of a populous kind is expensive on real devices. When
/// the desired batch is small, fetching each instance by identity is
/// cheaper. This is purely a performance policy; both paths produce
/// identical instances.
#[derive(Debug, Clone, Copy)]
pub struct ScanPolicy {
    /// Batches of at most this many resources use targeted per-identity
    /// fetches instead of a bulk scan.
    pub targeted_fetch_threshold: usize,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            targeted_fetch_threshold: 8,
        }
    }
}

/// Identity-keyed map of live instances of one kind.
#[derive(Debug, Default)]
pub struct InstanceIndex {
    by_identity: HashMap<Identity, Instance>,
}

impl InstanceIndex {
    /// Bulk-scans every live instance of `kind`.
    #[instrument(skip(kind, driver), fields(kind = kind.name()))]
    pub async fn scan(kind: &ResourceKind, driver: &dyn DeviceDriver) -> ReconcileResult<Self> {
        let records = driver.enumerate(kind.name()).await?;
        let mut index = InstanceIndex::default();
        for record in records {
            if let Some(instance) = admit(kind, record) {
                index.insert(instance)?;
            }
        }
        debug!(instances = index.len(), "bulk scan complete");
        Ok(index)
    }

    /// Scans only what a desired batch needs, switching between targeted
    /// per-identity fetches and a bulk scan per `policy`.
    #[instrument(skip_all, fields(kind = kind.name(), batch = desired.len()))]
    pub async fn scan_for(
        kind: &ResourceKind,
        driver: &dyn DeviceDriver,
        desired: &[DesiredResource],
        policy: ScanPolicy,
    ) -> ReconcileResult<Self> {
        if desired.len() > policy.targeted_fetch_threshold {
            return Self::scan(kind, driver).await;
        }

        let mut index = InstanceIndex::default();
        for resource in desired {
            if index.get(&resource.identity).is_some() {
                continue;
            }
            match driver.read(kind.name(), &resource.identity).await {
                Ok(Some(record)) => {
                    if let Some(instance) = admit(kind, record) {
                        index.insert(instance)?;
                    }
                }
                Ok(None) => {}
                // Session-level failures abort; per-record trouble is
                // best-effort like the bulk path.
                Err(err @ DriverError::Connection { .. }) => return Err(err.into()),
                Err(err) => {
                    warn!(identity = %resource.identity, error = %err, "skipping unreadable record");
                }
            }
        }
        debug!(instances = index.len(), "targeted scan complete");
        Ok(index)
    }

    /// Looks up an instance by identity.
    pub fn get(&self, identity: &Identity) -> Option<&Instance> {
        self.by_identity.get(identity)
    }

    /// Number of indexed instances.
    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    /// True if nothing was indexed.
    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    fn insert(&mut self, instance: Instance) -> ReconcileResult<()> {
        let identity = instance.identity.clone();
        if self.by_identity.insert(identity.clone(), instance).is_some() {
            return Err(ReconcileError::MatchAmbiguity { identity });
        }
        Ok(())
    }
}

/// Shapes a raw driver record into an instance, or rejects it.
///
/// Rejection reasons: identity arity differs from the schema. Unknown
/// properties are dropped silently; the schema is the contract.
fn admit(kind: &ResourceKind, record: InstanceRecord) -> Option<Instance> {
    if record.identity.len() != kind.identity_fields().len() {
        warn!(
            kind = kind.name(),
            identity = %record.identity,
            expected = kind.identity_fields().len(),
            "skipping record with malformed identity"
        );
        return None;
    }

    let properties = record
        .properties
        .into_iter()
        .filter(|(name, _)| kind.property(name).is_some())
        .collect();

    Some(Instance {
        handle: record.handle,
        identity: record.identity,
        properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDriver;
    use nxcfg_types::value::PropertyValue as V;

    fn kind() -> ResourceKind {
        ResourceKind::builder("trunk_port")
            .identity(["interface"])
            .scalar("mode", "access")
            .scalar("untagged_vlan", "1")
            .vlan_range("tagged_vlans", "1-4094")
            .build()
            .unwrap()
    }

    fn props(entries: &[(&str, V)]) -> PropertyMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_bulk_scan() {
        let driver = MemoryDriver::new();
        driver
            .seed(
                "trunk_port",
                Identity::new(["Ethernet1/1"]),
                props(&[("mode", V::str("trunk")), ("speed", V::str("100000"))]),
            )
            .await;
        driver
            .seed("trunk_port", Identity::new(["Ethernet1/2"]), PropertyMap::new())
            .await;

        let kind = kind();
        let index = InstanceIndex::scan(&kind, &driver).await.unwrap();
        assert_eq!(index.len(), 2);

        let instance = index.get(&Identity::new(["Ethernet1/1"])).unwrap();
        assert_eq!(instance.current("mode"), Some(&V::str("trunk")));
        // Unknown device fields are dropped
        assert_eq!(instance.current("speed"), None);
        // Unreported properties stay unset, not defaulted
        assert_eq!(instance.current("untagged_vlan"), None);
    }

    #[tokio::test]
    async fn test_scan_skips_malformed_identity() {
        let driver = MemoryDriver::new();
        driver
            .seed("trunk_port", Identity::new(["Ethernet1/1"]), PropertyMap::new())
            .await;
        // Wrong arity for this kind
        driver
            .seed("trunk_port", Identity::new(["Ethernet1/2", "extra"]), PropertyMap::new())
            .await;

        let index = InstanceIndex::scan(&kind(), &driver).await.unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.get(&Identity::new(["Ethernet1/1"])).is_some());
    }

    #[tokio::test]
    async fn test_targeted_scan_below_threshold() {
        let driver = MemoryDriver::new();
        for i in 1..=20 {
            driver
                .seed(
                    "trunk_port",
                    Identity::new([format!("Ethernet1/{}", i)]),
                    props(&[("mode", V::str("access"))]),
                )
                .await;
        }

        let kind = kind();
        let desired = vec![
            DesiredResource::present(Identity::new(["Ethernet1/3"])),
            DesiredResource::present(Identity::new(["Ethernet1/7"])),
            DesiredResource::present(Identity::new(["Ethernet1/99"])),
        ];
        let index = InstanceIndex::scan_for(&kind, &driver, &desired, ScanPolicy::default())
            .await
            .unwrap();

        // Only the two live targets were fetched, not the population of 20
        assert_eq!(index.len(), 2);
        assert!(index.get(&Identity::new(["Ethernet1/3"])).is_some());
        assert!(index.get(&Identity::new(["Ethernet1/99"])).is_none());
    }

    #[tokio::test]
    async fn test_scan_for_falls_back_to_bulk() {
        let driver = MemoryDriver::new();
        for i in 1..=4 {
            driver
                .seed(
                    "trunk_port",
                    Identity::new([format!("Ethernet1/{}", i)]),
                    PropertyMap::new(),
                )
                .await;
        }

        let kind = kind();
        let desired: Vec<DesiredResource> = (1..=4)
            .map(|i| DesiredResource::present(Identity::new([format!("Ethernet1/{}", i)])))
            .collect();
        let policy = ScanPolicy {
            targeted_fetch_threshold: 2,
        };
        let index = InstanceIndex::scan_for(&kind, &driver, &desired, policy)
            .await
            .unwrap();
        assert_eq!(index.len(), 4);
    }
}
