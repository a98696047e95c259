//! HSRP group on an interface.
//!
//! Addressed by (interface, group, iptype). HSRP is all joint setters:
//! authentication is a six-field tuple, preempt carries its delay triple,
//! priority its forwarding thresholds, and the timers their msec flags.
//! Changing any one field re-sends the whole tuple with the others
//! backfilled from current state.

use nxcfg_engine::{ReconcileResult, ResourceKind};
use nxcfg_types::Identity;

/// Builds the `hsrp_group` schema.
pub fn schema() -> ReconcileResult<ResourceKind> {
    ResourceKind::builder("hsrp_group")
        .identity(["interface", "group", "iptype"])
        .scalar("group_name", "")
        .scalar("mac_addr", "")
        .boolean("ipv4_enable", false)
        .scalar("ipv4_vip", "")
        .joint_group("ipv4_vip", ["ipv4_enable", "ipv4_vip"])
        .scalar("authentication_auth_type", "cleartext")
        .scalar("authentication_enc_type", "0")
        .scalar("authentication_key_type", "key-chain")
        .scalar("authentication_string", "")
        .scalar("authentication_timeout", "0")
        .boolean("authentication_compatibility", false)
        .joint_group(
            "authentication",
            [
                "authentication_auth_type",
                "authentication_enc_type",
                "authentication_key_type",
                "authentication_string",
                "authentication_timeout",
                "authentication_compatibility",
            ],
        )
        .boolean("preempt", false)
        .scalar("preempt_delay_minimum", "0")
        .scalar("preempt_delay_reload", "0")
        .scalar("preempt_delay_sync", "0")
        .joint_group(
            "preempt",
            [
                "preempt",
                "preempt_delay_minimum",
                "preempt_delay_reload",
                "preempt_delay_sync",
            ],
        )
        .scalar("priority", "100")
        .scalar("priority_forward_thresh_lower", "")
        .scalar("priority_forward_thresh_upper", "")
        .joint_group(
            "priority",
            [
                "priority",
                "priority_forward_thresh_lower",
                "priority_forward_thresh_upper",
            ],
        )
        .boolean("timers_hello_msec", false)
        .scalar("timers_hello", "3")
        .boolean("timers_hold_msec", false)
        .scalar("timers_hold", "10")
        .joint_group(
            "timers",
            [
                "timers_hello_msec",
                "timers_hello",
                "timers_hold_msec",
                "timers_hold",
            ],
        )
        .build()
}

/// Builds an HSRP group identity.
pub fn identity(interface: &str, group: u32, iptype: &str) -> Identity {
    Identity::new([interface.to_string(), group.to_string(), iptype.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_shape() {
        let kind = schema().unwrap();
        assert_eq!(kind.identity_fields(), ["interface", "group", "iptype"]);
        assert_eq!(kind.joint_groups().len(), 5);

        // Every property except the two plain ones belongs to a group
        let plain: Vec<&str> = kind
            .properties()
            .iter()
            .filter(|p| kind.group_of(&p.name).is_none())
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(plain, vec!["group_name", "mac_addr"]);
    }

    #[test]
    fn test_authentication_group_members() {
        let kind = schema().unwrap();
        let auth = kind
            .joint_groups()
            .iter()
            .find(|g| g.id == "authentication")
            .unwrap();
        assert_eq!(auth.members.len(), 6);
    }

    #[test]
    fn test_identity() {
        assert_eq!(
            identity("Vlan10", 5, "ipv4"),
            Identity::new(["vlan10", "5", "ipv4"])
        );
    }
}
