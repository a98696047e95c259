//! Device fixtures for common reconciliation scenarios.

use nxcfg_engine::MemoryDriver;
use nxcfg_types::{Identity, PropertyMap, PropertyValue};

/// Builds a property map from name/value pairs.
pub fn property_map<I, K>(entries: I) -> PropertyMap
where
    I: IntoIterator<Item = (K, PropertyValue)>,
    K: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Common BGP fixtures.
pub mod bgp_fixtures {
    use super::*;

    /// A device with one established neighbor in the default VRF.
    pub async fn single_neighbor(driver: &MemoryDriver) -> Identity {
        let identity = Identity::new(["65001", "default", "10.1.1.1"]);
        driver
            .seed(
                "bgp_neighbor",
                identity.clone(),
                property_map([
                    ("remote_as", PropertyValue::str("65002")),
                    ("description", PropertyValue::str("edge peer")),
                    ("timers_keepalive", PropertyValue::Int(60)),
                    ("timers_holdtime", PropertyValue::Int(180)),
                    ("shutdown", PropertyValue::Bool(false)),
                ]),
            )
            .await;
        identity
    }

    /// An address-family with an active max-prefix bundle.
    pub async fn neighbor_af_with_max_prefix(driver: &MemoryDriver) -> Identity {
        let identity = Identity::new(["65001", "default", "10.1.1.1", "ipv4", "unicast"]);
        driver
            .seed(
                "bgp_neighbor_af",
                identity.clone(),
                property_map([
                    ("max_prefix_limit", PropertyValue::Int(1000)),
                    ("max_prefix_threshold", PropertyValue::Int(75)),
                    ("route_reflector_client", PropertyValue::Bool(false)),
                ]),
            )
            .await;
        identity
    }
}

/// Common HSRP fixtures.
pub mod hsrp_fixtures {
    use super::*;

    /// A group with authentication configured, for backfill scenarios.
    pub async fn authenticated_group(driver: &MemoryDriver) -> Identity {
        let identity = Identity::new(["Vlan10", "5", "ipv4"]);
        driver
            .seed(
                "hsrp_group",
                identity.clone(),
                property_map([
                    ("authentication_auth_type", PropertyValue::str("md5")),
                    ("authentication_enc_type", PropertyValue::str("7")),
                    ("authentication_key_type", PropertyValue::str("key-string")),
                    ("authentication_string", PropertyValue::str("s3cret")),
                    ("authentication_timeout", PropertyValue::Int(30)),
                    ("priority", PropertyValue::Int(110)),
                ]),
            )
            .await;
        identity
    }
}

/// Common trunk fixtures.
pub mod trunk_fixtures {
    use super::*;

    /// A trunk carrying two VLAN spans.
    pub async fn trunk_with_vlans(driver: &MemoryDriver, interface: &str) -> Identity {
        let identity = Identity::new([interface]);
        driver
            .seed(
                "trunk_port",
                identity.clone(),
                property_map([
                    ("mode", PropertyValue::str("trunk")),
                    ("untagged_vlan", PropertyValue::Int(1)),
                    ("tagged_vlans", PropertyValue::str("2-4,6-8")),
                    ("shutdown", PropertyValue::Bool(false)),
                ]),
            )
            .await;
        identity
    }
}
