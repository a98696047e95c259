//! VXLAN VTEP / VNI binding.
//!
//! Addressed by (interface, vni). Multicast group and ingress replication
//! are the device's two BUM-traffic mechanisms and cannot coexist on one
//! VNI, so they are mutually exclusive at validation time rather than
//! failing on the wire.

use nxcfg_engine::{ReconcileResult, ResourceKind};
use nxcfg_types::Identity;

/// Builds the `vxlan_vtep_vni` schema.
pub fn schema() -> ReconcileResult<ResourceKind> {
    ResourceKind::builder("vxlan_vtep_vni")
        .identity(["interface", "vni"])
        .boolean("assoc_vrf", false)
        .scalar("multicast_group", "")
        .scalar("ingress_replication", "")
        .list("peer_list")
        .boolean("suppress_arp", false)
        .boolean("suppress_uuc", false)
        .mutually_exclusive(["multicast_group", "ingress_replication"])
        .requires("peer_list", "ingress_replication")
        .build()
}

/// Builds a VNI binding identity.
pub fn identity(interface: &str, vni: u32) -> Identity {
    Identity::new([interface.to_string(), vni.to_string()])
}
