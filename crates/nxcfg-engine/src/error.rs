//! Error types for the reconciliation core.
//!
//! All errors implement `std::error::Error` via `thiserror`. The taxonomy
//! separates failures detected before any mutation (schema, validation,
//! malformed ranges, match ambiguity) from device failures during apply,
//! which are always reported together with the changes that already
//! succeeded.

use thiserror::Error;

use nxcfg_types::{Identity, RangeError};

use crate::driver::DriverError;

/// Result type alias for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors that can occur while building schemas or reconciling resources.
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    /// Malformed resource-kind definition. Raised at registration time,
    /// never during reconciliation.
    #[error("Invalid schema for '{kind}': {message}")]
    Schema {
        /// The resource kind being defined.
        kind: String,
        /// What was wrong with the definition.
        message: String,
    },

    /// A range-typed value could not be decoded.
    #[error(transparent)]
    MalformedRange(#[from] RangeError),

    /// Desired state violates a cross-property precondition.
    #[error("Validation failed for '{property}': {message}")]
    Validation {
        /// The property that triggered the failure.
        property: String,
        /// Why the desired state is invalid.
        message: String,
    },

    /// More than one live instance carries the same identity tuple.
    #[error("Multiple live instances match identity '{identity}'")]
    MatchAmbiguity {
        /// The colliding identity.
        identity: Identity,
    },

    /// The device driver failed during read or write.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl ReconcileError {
    /// Creates a schema-definition error.
    pub fn schema(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            property: property.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error is detected before any mutation, i.e. the
    /// device is guaranteed untouched for the failing resource.
    pub fn is_pre_mutation(&self) -> bool {
        !matches!(self, ReconcileError::Driver { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReconcileError::schema("bgp_neighbor", "duplicate property 'weight'");
        assert_eq!(
            err.to_string(),
            "Invalid schema for 'bgp_neighbor': duplicate property 'weight'"
        );

        let err = ReconcileError::validation("max_prefix_interval", "mutually exclusive");
        assert_eq!(
            err.to_string(),
            "Validation failed for 'max_prefix_interval': mutually exclusive"
        );
    }

    #[test]
    fn test_range_error_conversion() {
        let err: ReconcileError = RangeError::MalformedToken {
            token: "abc".to_string(),
        }
        .into();
        assert!(matches!(err, ReconcileError::MalformedRange(_)));
        assert!(err.is_pre_mutation());
    }

    #[test]
    fn test_driver_error_is_not_pre_mutation() {
        let err: ReconcileError = DriverError::command_failed("link down").into();
        assert!(!err.is_pre_mutation());
    }
}
