//! Delta engine.
//!
//! Computes the property-level difference between a desired resource and its
//! live instance. The result is an immutable [`Delta`] value handed to the
//! reconciler; nothing here touches the device.
//!
//! The one rule everything else hangs on: a joint setter group is invoked
//! with a FULLY populated argument map. Changed members carry their new
//! value; unchanged members are backfilled from the instance's current value
//! or, failing that, the schema default. A partial joint invocation would
//! silently revert the omitted siblings to the device's own defaults
//! (authentication tuples, preempt-delay triples, max-prefix bundles all
//! fail this way).

use std::collections::HashMap;
use tracing::warn;

use nxcfg_types::{DesiredValue, PropertyValue};

use crate::canon::canonicalize;
use crate::desired::{DesiredResource, Ensure};
use crate::driver::JointArgs;
use crate::error::{ReconcileError, ReconcileResult};
use crate::index::Instance;
use crate::schema::{Constraint, PropertySpec, ResourceKind};

/// How the reconciler must transition this resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureAction {
    /// Object does not exist and must be created.
    Create,
    /// Object exists; some properties differ.
    Update,
    /// Object exists and must be removed.
    Delete,
    /// Nothing to do.
    NoOp,
}

impl EnsureAction {
    /// Name for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnsureAction::Create => "create",
            EnsureAction::Update => "update",
            EnsureAction::Delete => "delete",
            EnsureAction::NoOp => "noop",
        }
    }
}

/// One single-property mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    /// Property name.
    pub name: String,
    /// Canonical current value; `None` when the object is being created.
    pub old: Option<PropertyValue>,
    /// Canonical target value.
    pub new: PropertyValue,
}

/// One joint setter group invocation with a fully resolved argument map.
#[derive(Debug, Clone, PartialEq)]
pub struct JointInvocation {
    /// Group id.
    pub group: String,
    /// Argument per member, every member present.
    pub args: JointArgs,
    /// The members that actually changed (subset of `args` keys).
    pub changed: Vec<String>,
}

/// The computed difference for one (instance, desired) pair.
#[derive(Debug, Clone)]
pub struct Delta {
    /// Transition the reconciler must perform.
    pub action: EnsureAction,
    /// Changes to properties outside joint groups, in schema order.
    pub changes: Vec<PropertyChange>,
    /// Joint invocations, in declared group order.
    pub joint: Vec<JointInvocation>,
}

impl Delta {
    /// True if applying this delta would not touch the device.
    pub fn is_noop(&self) -> bool {
        self.action == EnsureAction::NoOp
    }

    /// Number of device mutations this delta will issue (excluding the
    /// create/destroy transition itself).
    pub fn mutation_count(&self) -> usize {
        self.changes.len() + self.joint.len()
    }
}

/// Computes the delta for one resource.
///
/// Validation failures and malformed ranges are returned before anything is
/// compared, so a failing resource never reaches the device.
pub fn diff(
    kind: &ResourceKind,
    desired: &DesiredResource,
    instance: Option<&Instance>,
) -> ReconcileResult<Delta> {
    validate(kind, desired, instance)?;

    if desired.ensure == Ensure::Absent {
        return Ok(Delta {
            action: if instance.is_some() {
                EnsureAction::Delete
            } else {
                EnsureAction::NoOp
            },
            changes: Vec::new(),
            joint: Vec::new(),
        });
    }

    // Resolve and canonicalize both sides for every schema property.
    let mut new_values: HashMap<&str, PropertyValue> = HashMap::new();
    let mut effective_current: HashMap<&str, PropertyValue> = HashMap::new();
    let mut changed: Vec<&str> = Vec::new();

    for prop in kind.properties() {
        let current = resolve_current(kind, prop, instance);
        let effective = match &current {
            Some(v) => v.clone(),
            None => canonicalize(prop, &prop.default)?,
        };
        effective_current.insert(prop.name.as_str(), effective.clone());

        let Some(desired_value) = desired.property(&prop.name) else {
            continue; // unmanaged
        };
        let resolved = resolve_sentinel(prop, desired_value);
        let canonical_new = canonicalize(prop, &resolved)?;

        let differs = match instance {
            // Creating: every managed property is a change from nothing.
            None => true,
            Some(_) => match &current {
                Some(cur) => *cur != canonical_new,
                // Never set on the device: compare against the default it
                // is effectively at.
                None => effective != canonical_new,
            },
        };
        if differs {
            changed.push(prop.name.as_str());
            new_values.insert(prop.name.as_str(), canonical_new);
        }
    }

    // Plain changes: everything changed that no joint group owns.
    let mut changes = Vec::new();
    for prop in kind.properties() {
        if !changed.contains(&prop.name.as_str()) || kind.group_of(&prop.name).is_some() {
            continue;
        }
        changes.push(PropertyChange {
            name: prop.name.clone(),
            old: instance.map(|_| effective_current[prop.name.as_str()].clone()),
            new: new_values[prop.name.as_str()].clone(),
        });
    }

    // Joint invocations: any group with at least one changed member fires
    // once, with every member resolved.
    let mut joint = Vec::new();
    for group in kind.joint_groups() {
        let changed_members: Vec<String> = group
            .members
            .iter()
            .filter(|m| changed.contains(&m.as_str()))
            .cloned()
            .collect();
        if changed_members.is_empty() {
            continue;
        }
        let mut args = JointArgs::new();
        for member in &group.members {
            let value = match new_values.get(member.as_str()) {
                Some(v) => v.clone(),
                None => effective_current[member.as_str()].clone(),
            };
            args.insert(member.clone(), value);
        }
        joint.push(JointInvocation {
            group: group.id.clone(),
            args,
            changed: changed_members,
        });
    }

    let action = match instance {
        None => EnsureAction::Create,
        Some(_) if changes.is_empty() && joint.is_empty() => EnsureAction::NoOp,
        Some(_) => EnsureAction::Update,
    };

    Ok(Delta {
        action,
        changes,
        joint,
    })
}

/// Canonical current value of one property, if the device has it set.
fn resolve_current(
    kind: &ResourceKind,
    prop: &PropertySpec,
    instance: Option<&Instance>,
) -> Option<PropertyValue> {
    let raw = instance?.current(&prop.name)?;
    match canonicalize(prop, raw) {
        Ok(v) => Some(v),
        Err(err) => {
            // Garbage on the device reads as "differs"; the write will
            // converge it.
            warn!(
                kind = kind.name(),
                property = %prop.name,
                error = %err,
                "current value failed canonicalization"
            );
            None
        }
    }
}

/// Resolves the `Default`/`Unset` sentinels against the schema.
fn resolve_sentinel(prop: &PropertySpec, desired: &DesiredValue) -> PropertyValue {
    match desired {
        DesiredValue::Value(v) => v.clone(),
        DesiredValue::Default => prop.default.clone(),
        DesiredValue::Unset => prop.unset_value(),
    }
}

/// True when the desired entry manages the property to something.
fn manages(desired: &DesiredResource, property: &str) -> bool {
    matches!(
        desired.property(property),
        Some(DesiredValue::Value(_)) | Some(DesiredValue::Default)
    )
}

fn validate(
    kind: &ResourceKind,
    desired: &DesiredResource,
    instance: Option<&Instance>,
) -> ReconcileResult<()> {
    for name in desired.properties.keys() {
        if kind.property(name).is_none() {
            return Err(ReconcileError::validation(
                name,
                format!("not a property of '{}'", kind.name()),
            ));
        }
    }

    for constraint in kind.constraints() {
        match constraint {
            Constraint::MutuallyExclusive { properties } => {
                let present: Vec<&str> = properties
                    .iter()
                    .filter(|p| manages(desired, p))
                    .map(String::as_str)
                    .collect();
                if present.len() > 1 {
                    return Err(ReconcileError::validation(
                        present[1],
                        format!("mutually exclusive with '{}'", present[0]),
                    ));
                }
            }
            Constraint::RequiresSibling { property, requires } => {
                if !manages(desired, property) {
                    continue;
                }
                let satisfied = manages(desired, requires)
                    || instance
                        .and_then(|i| i.current(requires))
                        .map(|v| !v.is_empty_value())
                        .unwrap_or(false);
                if !satisfied {
                    return Err(ReconcileError::validation(
                        property,
                        format!("requires '{}' to be set", requires),
                    ));
                }
            }
        }
    }
    Ok(())
}
