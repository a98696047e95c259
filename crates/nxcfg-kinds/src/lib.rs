//! Resource-kind schemas.
//!
//! Every configurable object type is a thin instantiation of the generic
//! reconciliation engine: an identity-field list, property descriptors,
//! joint setter groups with their ordering, and the occasional gate or
//! cross-property constraint. The modules here declare those schemas; no
//! per-resource reconciliation code exists anywhere.

pub mod bgp_neighbor;
pub mod bgp_neighbor_af;
pub mod hsrp_group;
pub mod trunk_port;
pub mod vxlan_vtep_vni;

use nxcfg_engine::{ReconcileResult, SchemaRegistry};

/// Builds a registry with every kind this crate defines.
pub fn default_registry() -> ReconcileResult<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry.register(bgp_neighbor::schema()?)?;
    registry.register(bgp_neighbor_af::schema()?)?;
    registry.register(hsrp_group::schema()?)?;
    registry.register(trunk_port::schema()?)?;
    registry.register(vxlan_vtep_vni::schema()?)?;
    Ok(registry)
}
