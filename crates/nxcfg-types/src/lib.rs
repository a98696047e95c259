//! Shared types for the NXCFG reconciliation crates.
//!
//! This crate carries the pure data types that every other crate in the
//! workspace builds on:
//!
//! - [`value`]: property values and desired-value sentinels
//! - [`identity`]: composite identity tuples with normalized equality
//! - [`vlan_range`]: VLAN ID set <-> compact range string codec
//! - [`asn`]: BGP autonomous-system number normalization
//!
//! Everything here is synchronous and free of device or I/O concerns.

pub mod asn;
pub mod identity;
pub mod value;
pub mod vlan_range;

// Re-export commonly used items at crate root
pub use asn::AsnError;
pub use identity::Identity;
pub use value::{DesiredValue, PropertyMap, PropertyValue};
pub use vlan_range::{RangeError, MAX_VLAN_ID};
