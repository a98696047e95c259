//! In-memory reference driver.
//!
//! [`MemoryDriver`] implements [`DeviceDriver`] against a plain map of
//! objects. It backs the simulation mode of the `nxcfgd` binary and the test
//! suites: state can be seeded, every mutation is recorded in order, and
//! individual property or group writes can be made to fail on demand.

use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;

use nxcfg_types::{Identity, PropertyMap, PropertyValue};

use crate::driver::{
    DeviceDriver, DeviceHandle, DriverError, DriverResult, InstanceRecord, JointArgs,
};

/// One recorded mutation, in application order.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Object created.
    Create {
        /// Resource kind.
        kind: String,
        /// Object identity.
        identity: Identity,
    },
    /// Object destroyed.
    Destroy {
        /// Resource kind.
        kind: String,
        /// Object identity.
        identity: Identity,
    },
    /// Single-property write.
    Write {
        /// Resource kind.
        kind: String,
        /// Object identity.
        identity: Identity,
        /// Property name.
        property: String,
        /// Written value.
        value: PropertyValue,
    },
    /// Joint-group write.
    WriteJoint {
        /// Resource kind.
        kind: String,
        /// Object identity.
        identity: Identity,
        /// Group id.
        group: String,
        /// Full argument map.
        args: JointArgs,
    },
}

impl Mutation {
    /// The property or group name this mutation targets, if any.
    pub fn target_name(&self) -> Option<&str> {
        match self {
            Mutation::Write { property, .. } => Some(property),
            Mutation::WriteJoint { group, .. } => Some(group),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    next_handle: u64,
    objects: BTreeMap<(String, Identity), StoredObject>,
    handles: HashMap<u64, (String, Identity)>,
    log: Vec<Mutation>,
    fail_on: HashSet<(String, String)>,
}

#[derive(Debug)]
struct StoredObject {
    handle: u64,
    properties: PropertyMap,
}

/// Seedable in-memory device.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    state: Mutex<MemoryState>,
}

impl MemoryDriver {
    /// Creates an empty device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one object with the given properties, returning its handle.
    pub async fn seed(
        &self,
        kind: impl Into<String>,
        identity: Identity,
        properties: PropertyMap,
    ) -> DeviceHandle {
        let kind = kind.into();
        let mut state = self.state.lock().await;
        state.next_handle += 1;
        let handle = state.next_handle;
        state
            .handles
            .insert(handle, (kind.clone(), identity.clone()));
        state.objects.insert(
            (kind, identity),
            StoredObject {
                handle,
                properties,
            },
        );
        DeviceHandle(handle)
    }

    /// Makes every subsequent write to `property_or_group` on `kind` fail
    /// with a command error.
    pub async fn fail_writes(&self, kind: impl Into<String>, property_or_group: impl Into<String>) {
        let mut state = self.state.lock().await;
        state
            .fail_on
            .insert((kind.into(), property_or_group.into()));
    }

    /// The ordered mutation log.
    pub async fn mutation_log(&self) -> Vec<Mutation> {
        self.state.lock().await.log.clone()
    }

    /// Current properties of one object, if it exists.
    pub async fn properties(&self, kind: &str, identity: &Identity) -> Option<PropertyMap> {
        let state = self.state.lock().await;
        state
            .objects
            .get(&(kind.to_string(), identity.clone()))
            .map(|obj| obj.properties.clone())
    }

    /// Number of live objects of one kind.
    pub async fn population(&self, kind: &str) -> usize {
        let state = self.state.lock().await;
        state.objects.keys().filter(|(k, _)| k == kind).count()
    }
}

#[async_trait::async_trait]
impl DeviceDriver for MemoryDriver {
    async fn enumerate(&self, kind: &str) -> DriverResult<Vec<InstanceRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .objects
            .iter()
            .filter(|((k, _), _)| k == kind)
            .map(|((_, identity), obj)| InstanceRecord {
                handle: DeviceHandle(obj.handle),
                identity: identity.clone(),
                properties: obj.properties.clone(),
            })
            .collect())
    }

    async fn read(&self, kind: &str, identity: &Identity) -> DriverResult<Option<InstanceRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .objects
            .get(&(kind.to_string(), identity.clone()))
            .map(|obj| InstanceRecord {
                handle: DeviceHandle(obj.handle),
                identity: identity.clone(),
                properties: obj.properties.clone(),
            }))
    }

    async fn write(
        &self,
        kind: &str,
        identity: &Identity,
        property: &str,
        value: &PropertyValue,
    ) -> DriverResult<()> {
        let mut state = self.state.lock().await;
        if state
            .fail_on
            .contains(&(kind.to_string(), property.to_string()))
        {
            return Err(DriverError::command_failed(format!(
                "injected failure writing '{}'",
                property
            )));
        }
        let obj = state
            .objects
            .get_mut(&(kind.to_string(), identity.clone()))
            .ok_or_else(|| DriverError::not_found(identity.clone()))?;
        obj.properties
            .insert(property.to_string(), value.clone());
        state.log.push(Mutation::Write {
            kind: kind.to_string(),
            identity: identity.clone(),
            property: property.to_string(),
            value: value.clone(),
        });
        debug!(kind, %identity, property, "memory write");
        Ok(())
    }

    async fn write_joint(
        &self,
        kind: &str,
        identity: &Identity,
        group: &str,
        args: &JointArgs,
    ) -> DriverResult<()> {
        let mut state = self.state.lock().await;
        if state
            .fail_on
            .contains(&(kind.to_string(), group.to_string()))
        {
            return Err(DriverError::command_failed(format!(
                "injected failure writing group '{}'",
                group
            )));
        }
        let obj = state
            .objects
            .get_mut(&(kind.to_string(), identity.clone()))
            .ok_or_else(|| DriverError::not_found(identity.clone()))?;
        for (name, value) in args {
            obj.properties.insert(name.clone(), value.clone());
        }
        state.log.push(Mutation::WriteJoint {
            kind: kind.to_string(),
            identity: identity.clone(),
            group: group.to_string(),
            args: args.clone(),
        });
        debug!(kind, %identity, group, "memory joint write");
        Ok(())
    }

    async fn create(&self, kind: &str, identity: &Identity) -> DriverResult<DeviceHandle> {
        let mut state = self.state.lock().await;
        let key = (kind.to_string(), identity.clone());
        if state.objects.contains_key(&key) {
            return Err(DriverError::command_failed(format!(
                "object '{}' already exists",
                identity
            )));
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.handles.insert(handle, key.clone());
        state.objects.insert(
            key,
            StoredObject {
                handle,
                properties: PropertyMap::new(),
            },
        );
        state.log.push(Mutation::Create {
            kind: kind.to_string(),
            identity: identity.clone(),
        });
        debug!(kind, %identity, "memory create");
        Ok(DeviceHandle(handle))
    }

    async fn destroy(&self, handle: &DeviceHandle) -> DriverResult<()> {
        let mut state = self.state.lock().await;
        let key = state
            .handles
            .remove(&handle.0)
            .ok_or_else(|| DriverError::command_failed("stale device handle"))?;
        state.objects.remove(&key);
        let (kind, identity) = key;
        state.log.push(Mutation::Destroy { kind, identity });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxcfg_types::value::PropertyValue as V;

    fn props(entries: &[(&str, PropertyValue)]) -> PropertyMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_seed_and_read() {
        let driver = MemoryDriver::new();
        let id = Identity::new(["Ethernet1/1"]);
        driver
            .seed("trunk_port", id.clone(), props(&[("mode", V::str("trunk"))]))
            .await;

        let record = driver.read("trunk_port", &id).await.unwrap().unwrap();
        assert_eq!(record.identity, id);
        assert_eq!(record.properties.get("mode"), Some(&V::str("trunk")));

        assert!(driver
            .read("trunk_port", &Identity::new(["Ethernet1/2"]))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_write_and_log() {
        let driver = MemoryDriver::new();
        let id = Identity::new(["Ethernet1/1"]);
        driver.seed("trunk_port", id.clone(), PropertyMap::new()).await;

        driver
            .write("trunk_port", &id, "mode", &V::str("trunk"))
            .await
            .unwrap();

        let log = driver.mutation_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].target_name(), Some("mode"));

        let current = driver.properties("trunk_port", &id).await.unwrap();
        assert_eq!(current.get("mode"), Some(&V::str("trunk")));
    }

    #[tokio::test]
    async fn test_write_missing_object() {
        let driver = MemoryDriver::new();
        let id = Identity::new(["Ethernet1/1"]);
        let err = driver
            .write("trunk_port", &id, "mode", &V::str("trunk"))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let driver = MemoryDriver::new();
        let id = Identity::new(["Ethernet1/1"]);
        driver.seed("trunk_port", id.clone(), PropertyMap::new()).await;
        driver.fail_writes("trunk_port", "mode").await;

        let err = driver
            .write("trunk_port", &id, "mode", &V::str("trunk"))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::CommandFailed { .. }));

        // Other properties still work
        driver
            .write("trunk_port", &id, "untagged_vlan", &V::Int(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_destroy() {
        let driver = MemoryDriver::new();
        let id = Identity::new(["Ethernet1/1"]);

        let handle = driver.create("trunk_port", &id).await.unwrap();
        assert!(driver.create("trunk_port", &id).await.is_err());
        assert_eq!(driver.population("trunk_port").await, 1);

        driver.destroy(&handle).await.unwrap();
        assert_eq!(driver.population("trunk_port").await, 0);

        // Handle is invalidated
        assert!(driver.destroy(&handle).await.is_err());
    }

    #[tokio::test]
    async fn test_enumerate_filters_by_kind() {
        let driver = MemoryDriver::new();
        driver
            .seed("trunk_port", Identity::new(["Ethernet1/1"]), PropertyMap::new())
            .await;
        driver
            .seed("hsrp_group", Identity::new(["Vlan10", "1", "ipv4"]), PropertyMap::new())
            .await;

        let trunks = driver.enumerate("trunk_port").await.unwrap();
        assert_eq!(trunks.len(), 1);
        assert_eq!(trunks[0].identity, Identity::new(["Ethernet1/1"]));
    }
}
