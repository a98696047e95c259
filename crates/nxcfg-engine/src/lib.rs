//! Declarative state-reconciliation core for network-device configuration.
//!
//! Given a desired property set for a configuration object and the object's
//! live state read back from a device, this crate computes the minimal set
//! of property mutations, applies them in a constrained order, and reports
//! convergence:
//!
//! - [`schema`]: per-kind property schemas, joint setter groups, gates
//! - [`driver`]: the device-driver boundary (the only path to a device)
//! - [`memory`]: in-memory reference driver for simulation and tests
//! - [`index`]: identity-keyed scan of live instances
//! - [`matcher`]: desired-to-live matching
//! - [`delta`]: sentinel resolution, canonicalization, joint-group backfill
//! - [`reconciler`]: ordered apply with partial-failure reporting
//!
//! # Example
//!
//! ```
//! use nxcfg_engine::{
//!     DesiredResource, MemoryDriver, Reconciler, ResourceKind, SchemaRegistry,
//! };
//! use nxcfg_types::Identity;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = SchemaRegistry::new();
//! registry.register(
//!     ResourceKind::builder("vlan")
//!         .identity(["vlan_id"])
//!         .scalar("vlan_name", "")
//!         .boolean("shutdown", false)
//!         .gate("shutdown", false)
//!         .build()?,
//! )?;
//!
//! let driver = MemoryDriver::new();
//! let reconciler = Reconciler::new(&driver, &registry);
//!
//! let desired = vec![DesiredResource::present(Identity::new(["100"]))
//!     .with("vlan_name", "web_tier")];
//! let results = reconciler.reconcile("vlan", &desired).await?;
//! assert!(results[0].converged());
//! # Ok(())
//! # }
//! ```

pub mod canon;
pub mod delta;
pub mod desired;
pub mod driver;
pub mod error;
pub mod index;
pub mod matcher;
pub mod memory;
pub mod reconciler;
pub mod schema;

// Re-export the working surface at crate root
pub use delta::{diff, Delta, EnsureAction, JointInvocation, PropertyChange};
pub use desired::{DesiredResource, Ensure};
pub use driver::{DeviceDriver, DeviceHandle, DriverError, DriverResult, InstanceRecord, JointArgs};
pub use error::{ReconcileError, ReconcileResult};
pub use index::{Instance, InstanceIndex, ScanPolicy};
pub use matcher::match_desired;
pub use memory::{MemoryDriver, Mutation};
pub use reconciler::{AppliedChange, ChangeTarget, ReconciliationResult, Reconciler};
pub use schema::{
    Constraint, GateProperty, JointGroup, PropertySpec, ResourceKind, SchemaRegistry, ValueKind,
};
