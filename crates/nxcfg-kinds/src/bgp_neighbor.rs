//! BGP neighbor.
//!
//! Addressed by (asn, vrf, neighbor). The password and keepalive/holdtime
//! timers are joint setters: the device only takes them as one command, so
//! changing either timer re-sends both. `shutdown` gates everything else —
//! a neighbor being brought up must be fully configured before it is
//! unshut.

use nxcfg_engine::{ReconcileResult, ResourceKind};
use nxcfg_types::{asn, AsnError, Identity};

/// Builds the `bgp_neighbor` schema.
pub fn schema() -> ReconcileResult<ResourceKind> {
    ResourceKind::builder("bgp_neighbor")
        .identity(["asn", "vrf", "neighbor"])
        .scalar("description", "")
        .scalar("remote_as", "")
        .scalar("local_as", "")
        .scalar("update_source", "")
        .scalar("ebgp_multihop", "")
        .scalar("maximum_peers", "")
        .boolean("connected_check", false)
        .boolean("capability_negotiation", false)
        .boolean("dynamic_capability", false)
        .boolean("log_neighbor_changes", false)
        .boolean("low_memory_exempt", false)
        .boolean("remove_private_as", false)
        .boolean("suppress_4_byte_as", false)
        .boolean("transport_passive_only", false)
        .scalar("password", "")
        .scalar("password_type", "cleartext")
        .joint_group("password", ["password", "password_type"])
        .scalar("timers_keepalive", "60")
        .scalar("timers_holdtime", "180")
        .joint_group("timers", ["timers_keepalive", "timers_holdtime"])
        .boolean("shutdown", false)
        .gate("shutdown", false)
        .build()
}

/// Builds a neighbor identity, normalizing ASDOT notation to ASPLAIN so
/// `1.5` and `65541` address the same neighbor.
pub fn identity(asn: &str, vrf: &str, neighbor: &str) -> Result<Identity, AsnError> {
    let plain = asn::normalize(asn)?;
    Ok(Identity::new([
        plain.to_string(),
        vrf.to_string(),
        neighbor.to_string(),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_shape() {
        let kind = schema().unwrap();
        assert_eq!(kind.identity_fields(), ["asn", "vrf", "neighbor"]);
        assert_eq!(kind.group_of("timers_keepalive"), Some("timers"));
        assert_eq!(kind.group_of("password_type"), Some("password"));
        assert_eq!(kind.group_of("description"), None);
        assert_eq!(kind.gate().map(|g| g.name.as_str()), Some("shutdown"));
        assert!(!kind.gate().unwrap().enabled_when);
    }

    #[test]
    fn test_identity_normalizes_asdot() {
        let dot = identity("1.5", "default", "10.1.1.1").unwrap();
        let plain = identity("65541", "default", "10.1.1.1").unwrap();
        assert_eq!(dot, plain);

        assert!(identity("not-an-asn", "default", "10.1.1.1").is_err());
    }
}
