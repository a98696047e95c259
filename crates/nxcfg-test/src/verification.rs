//! Convergence verification helpers.
//!
//! Assertion helpers for the properties the engine guarantees: idempotence
//! (a second pass is all no-ops), joint-group backfill completeness, and
//! mutation ordering.

use thiserror::Error;

use nxcfg_engine::{
    Delta, DesiredResource, EnsureAction, MemoryDriver, ReconcileError, ReconciliationResult,
    Reconciler, ResourceKind, SchemaRegistry,
};

/// Verification failure reasons.
#[derive(Error, Debug)]
pub enum VerificationError {
    /// The engine itself failed.
    #[error("Engine error: {0}")]
    Engine(#[from] ReconcileError),

    /// A resource did not reach convergence.
    #[error("Resource '{identity}' not converged: action was {action} on re-run")]
    NotConverged {
        /// The resource identity.
        identity: String,
        /// The non-noop action the re-run produced.
        action: String,
    },

    /// An expected mutation target never appeared.
    #[error("Expected applied target '{target}' not found")]
    MissingTarget {
        /// The missing property or group.
        target: String,
    },

    /// Two mutations ran in the wrong order.
    #[error("'{earlier}' must be applied before '{later}'")]
    OrderViolation {
        /// The mutation that had to run first.
        earlier: String,
        /// The mutation that had to run later.
        later: String,
    },

    /// A joint invocation omitted a group member.
    #[error("Joint group '{group}' is missing member '{member}'")]
    IncompleteArgs {
        /// The group id.
        group: String,
        /// The omitted member.
        member: String,
    },
}

/// Result type for verification operations.
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Re-runs a batch and asserts every resource reports `NoOp`.
///
/// This is the idempotence law: diff, apply, diff again must find nothing.
pub async fn verify_idempotent(
    driver: &MemoryDriver,
    registry: &SchemaRegistry,
    kind: &str,
    desired: &[DesiredResource],
) -> VerifyResult<()> {
    let reconciler = Reconciler::new(driver, registry);
    let results = reconciler.reconcile(kind, desired).await?;
    for result in results {
        if let Some(err) = result.error {
            return Err(err.into());
        }
        if result.action != EnsureAction::NoOp {
            return Err(VerificationError::NotConverged {
                identity: result.identity.to_string(),
                action: result.action.as_str().to_string(),
            });
        }
    }
    Ok(())
}

/// The applied mutation targets of a result, in order.
pub fn applied_targets(result: &ReconciliationResult) -> Vec<String> {
    result
        .applied
        .iter()
        .map(|change| change.target.to_string())
        .collect()
}

/// Asserts `earlier` was applied before `later` in one result.
pub fn assert_applied_before(
    result: &ReconciliationResult,
    earlier: &str,
    later: &str,
) -> VerifyResult<()> {
    let targets = applied_targets(result);
    let position = |target: &str| {
        targets
            .iter()
            .position(|t| t == target)
            .ok_or_else(|| VerificationError::MissingTarget {
                target: target.to_string(),
            })
    };
    let first = position(earlier)?;
    let second = position(later)?;
    if first >= second {
        return Err(VerificationError::OrderViolation {
            earlier: earlier.to_string(),
            later: later.to_string(),
        });
    }
    Ok(())
}

/// Asserts every joint invocation in a delta resolves all of its group's
/// members, changed or not.
pub fn assert_backfill_complete(kind: &ResourceKind, delta: &Delta) -> VerifyResult<()> {
    for invocation in &delta.joint {
        let Some(group) = kind
            .joint_groups()
            .iter()
            .find(|g| g.id == invocation.group)
        else {
            return Err(VerificationError::MissingTarget {
                target: invocation.group.clone(),
            });
        };
        for member in &group.members {
            if !invocation.args.contains_key(member) {
                return Err(VerificationError::IncompleteArgs {
                    group: group.id.clone(),
                    member: member.clone(),
                });
            }
        }
    }
    Ok(())
}
