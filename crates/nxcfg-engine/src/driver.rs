//! Device driver boundary.
//!
//! The reconciliation core never talks to a device directly; everything goes
//! through the [`DeviceDriver`] trait. Transport concerns (NXAPI, SSH,
//! session handling, credentials) live behind implementations of this trait.
//!
//! The core treats a driver as a shared, serialized resource: one in-flight
//! command per device unless an implementation documents otherwise. Reads
//! are assumed reentrant.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use nxcfg_types::{Identity, PropertyMap, PropertyValue};

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors surfaced by a device driver.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// The addressed object does not exist on the device.
    #[error("Object '{identity}' not found on device")]
    NotFound {
        /// The identity that failed to resolve.
        identity: Identity,
    },

    /// The device rejected the property as not applicable to this instance.
    #[error("Property '{property}' not applicable on this instance")]
    NotApplicable {
        /// The inapplicable property.
        property: String,
    },

    /// The device accepted the session but the command failed.
    #[error("Device command failed: {detail}")]
    CommandFailed {
        /// Device-reported failure detail.
        detail: String,
    },

    /// The device session itself failed.
    #[error("Device connection failed: {message}")]
    Connection {
        /// Transport-level failure message.
        message: String,
    },
}

impl DriverError {
    /// Creates a not-found error.
    pub fn not_found(identity: Identity) -> Self {
        Self::NotFound { identity }
    }

    /// Creates a not-applicable error.
    pub fn not_applicable(property: impl Into<String>) -> Self {
        Self::NotApplicable {
            property: property.into(),
        }
    }

    /// Creates a command-failed error.
    pub fn command_failed(detail: impl Into<String>) -> Self {
        Self::CommandFailed {
            detail: detail.into(),
        }
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Returns true if retrying without re-reading device state is safe.
    /// Mutations are never blindly retryable; only session setup is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DriverError::Connection { .. })
    }
}

/// Opaque handle addressing one live device object.
///
/// Handles are issued by [`DeviceDriver::create`] and by enumeration, and are
/// invalidated by [`DeviceDriver::destroy`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub(crate) u64);

/// One live object as reported by the driver.
#[derive(Debug, Clone)]
pub struct InstanceRecord {
    /// Handle for follow-up mutations.
    pub handle: DeviceHandle,
    /// The object's identity tuple.
    pub identity: Identity,
    /// Property values as currently configured. Properties the device
    /// reports as not applicable are simply absent.
    pub properties: PropertyMap,
}

/// Fully-resolved argument map for a joint setter invocation.
pub type JointArgs = BTreeMap<String, PropertyValue>;

/// Transport-agnostic device access used by the reconciliation core.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    /// Enumerates every live instance of a resource kind.
    async fn enumerate(&self, kind: &str) -> DriverResult<Vec<InstanceRecord>>;

    /// Reads one instance by identity. `Ok(None)` means the object does not
    /// exist (this is the normal "needs create" answer, not an error).
    async fn read(&self, kind: &str, identity: &Identity) -> DriverResult<Option<InstanceRecord>>;

    /// Sets a single property on an existing object.
    async fn write(
        &self,
        kind: &str,
        identity: &Identity,
        property: &str,
        value: &PropertyValue,
    ) -> DriverResult<()>;

    /// Issues one combined command for a joint setter group. The argument
    /// map is always fully populated by the caller.
    async fn write_joint(
        &self,
        kind: &str,
        identity: &Identity,
        group: &str,
        args: &JointArgs,
    ) -> DriverResult<()>;

    /// Creates a new, unconfigured object and returns its handle.
    async fn create(&self, kind: &str, identity: &Identity) -> DriverResult<DeviceHandle>;

    /// Removes an object; its handle becomes invalid.
    async fn destroy(&self, handle: &DeviceHandle) -> DriverResult<()>;
}
