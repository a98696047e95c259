//! BGP neighbor address-family.
//!
//! Addressed by (asn, vrf, neighbor, afi, safi). This is the densest kind
//! in the tree for joint setters: allowas-in, default-originate,
//! soft-reconfiguration and the max-prefix bundle are all one-shot
//! commands on the device, and max-prefix carries its own cross-property
//! preconditions.

use nxcfg_engine::{ReconcileResult, ResourceKind};
use nxcfg_types::{asn, AsnError, Identity};

/// Builds the `bgp_neighbor_af` schema.
pub fn schema() -> ReconcileResult<ResourceKind> {
    ResourceKind::builder("bgp_neighbor_af")
        .identity(["asn", "vrf", "neighbor", "afi", "safi"])
        .scalar("advertise_map_exist", "")
        .scalar("advertise_map_non_exist", "")
        .scalar("filter_list_in", "")
        .scalar("filter_list_out", "")
        .scalar("send_community", "none")
        .scalar("soo", "")
        .scalar("unsuppress_map", "")
        .scalar("weight", "")
        .boolean("as_override", false)
        .boolean("disable_peer_as_check", false)
        .boolean("next_hop_self", false)
        .boolean("next_hop_third_party", true)
        .boolean("route_reflector_client", false)
        .boolean("suppress_inactive", false)
        .boolean("allowas_in", false)
        .scalar("allowas_in_max", "3")
        .joint_group("allowas_in", ["allowas_in", "allowas_in_max"])
        .boolean("default_originate", false)
        .scalar("default_originate_route_map", "")
        .joint_group(
            "default_originate",
            ["default_originate", "default_originate_route_map"],
        )
        .boolean("soft_reconfiguration_in", false)
        .boolean("soft_reconfiguration_in_always", false)
        .joint_group(
            "soft_reconfiguration_in",
            ["soft_reconfiguration_in", "soft_reconfiguration_in_always"],
        )
        .scalar("max_prefix_limit", "")
        .scalar("max_prefix_threshold", "")
        .scalar("max_prefix_interval", "")
        .boolean("max_prefix_warning", false)
        .joint_group(
            "max_prefix",
            [
                "max_prefix_limit",
                "max_prefix_threshold",
                "max_prefix_interval",
                "max_prefix_warning",
            ],
        )
        .mutually_exclusive(["max_prefix_interval", "max_prefix_warning"])
        .requires("max_prefix_threshold", "max_prefix_limit")
        .requires("max_prefix_interval", "max_prefix_limit")
        .build()
}

/// Builds an address-family identity, normalizing the ASN.
pub fn identity(
    asn: &str,
    vrf: &str,
    neighbor: &str,
    afi: &str,
    safi: &str,
) -> Result<Identity, AsnError> {
    let plain = asn::normalize(asn)?;
    Ok(Identity::new([
        plain.to_string(),
        vrf.to_string(),
        neighbor.to_string(),
        afi.to_string(),
        safi.to_string(),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_shape() {
        let kind = schema().unwrap();
        assert_eq!(kind.identity_fields().len(), 5);
        assert_eq!(kind.joint_groups().len(), 4);
        assert_eq!(kind.group_of("max_prefix_warning"), Some("max_prefix"));
        assert_eq!(kind.group_of("allowas_in_max"), Some("allowas_in"));
        assert!(kind.gate().is_none());
    }

    #[test]
    fn test_group_ordering_is_declared_order() {
        let kind = schema().unwrap();
        let ids: Vec<&str> = kind.joint_groups().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "allowas_in",
                "default_originate",
                "soft_reconfiguration_in",
                "max_prefix",
            ]
        );
    }

    #[test]
    fn test_identity() {
        let a = identity("65001", "default", "10.1.1.1", "ipv4", "unicast").unwrap();
        let b = identity("65001", "DEFAULT", "10.1.1.1", "IPv4", "unicast").unwrap();
        assert_eq!(a, b);
    }
}
