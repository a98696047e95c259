//! Trunk port.
//!
//! Addressed by interface name. The allowed-VLAN list is range-typed: the
//! device renders it as `"2-4,6-8"`, so desired lists and device strings
//! canonicalize to the same encoding before comparison. An empty desired
//! set means "no restriction", which the schema default renders as the full
//! device range.

use nxcfg_engine::{ReconcileResult, ResourceKind};
use nxcfg_types::Identity;

/// Builds the `trunk_port` schema.
pub fn schema() -> ReconcileResult<ResourceKind> {
    ResourceKind::builder("trunk_port")
        .identity(["interface"])
        .scalar("mode", "access")
        .scalar("untagged_vlan", "1")
        .vlan_range("tagged_vlans", "1-4094")
        .boolean("shutdown", false)
        .gate("shutdown", false)
        .requires("tagged_vlans", "mode")
        .build()
}

/// Builds a trunk identity.
pub fn identity(interface: &str) -> Identity {
    Identity::new([interface])
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxcfg_engine::{diff, DesiredResource, EnsureAction, MemoryDriver, Reconciler,
        SchemaRegistry,
    };
    use nxcfg_types::{PropertyValue as V, PropertyMap};

    #[test]
    fn test_schema_shape() {
        let kind = schema().unwrap();
        assert_eq!(kind.identity_fields(), ["interface"]);
        assert!(kind.gate().is_some());
        assert!(kind.joint_groups().is_empty());
    }

    #[test]
    fn test_tagged_vlans_requires_mode() {
        let kind = schema().unwrap();
        let desired = DesiredResource::present(identity("Ethernet1/1"))
            .with("tagged_vlans", "10-20");
        let err = diff(&kind, &desired, None).unwrap_err();
        assert!(err.to_string().contains("requires 'mode'"));
    }

    #[tokio::test]
    async fn test_range_formats_converge() {
        let driver = MemoryDriver::new();
        let mut seeded = PropertyMap::new();
        seeded.insert("mode".to_string(), V::str("trunk"));
        seeded.insert("tagged_vlans".to_string(), V::str("2-4,6-8"));
        driver.seed("trunk_port", identity("Ethernet1/1"), seeded).await;

        let mut registry = SchemaRegistry::new();
        registry.register(schema().unwrap()).unwrap();
        let reconciler = Reconciler::new(&driver, &registry);

        // Same membership spelled as a list: nothing to do
        let desired = vec![DesiredResource::present(identity("Ethernet1/1"))
            .with("mode", "trunk")
            .with("tagged_vlans", V::str_list(["6-8", "2", "3", "4"]))];
        let results = reconciler.reconcile("trunk_port", &desired).await.unwrap();
        assert_eq!(results[0].action, EnsureAction::NoOp);
    }
}
