//! Value canonicalization.
//!
//! Desired and current values must be normalized identically before they are
//! compared, otherwise reconciliation is not idempotent: `7` vs `"7"`,
//! unsorted member lists, or an uncompacted VLAN range would all show up as
//! phantom diffs. Canonicalization is idempotent by construction; applying
//! it twice yields the same value as once.

use nxcfg_types::{vlan_range, PropertyValue};

use crate::error::{ReconcileError, ReconcileResult};
use crate::schema::{PropertySpec, ValueKind};

/// Canonicalizes a value according to its property's kind.
pub fn canonicalize(prop: &PropertySpec, value: &PropertyValue) -> ReconcileResult<PropertyValue> {
    match prop.kind {
        ValueKind::Scalar => scalar_text(prop, value).map(PropertyValue::Str),
        ValueKind::Bool => match value.as_bool() {
            Some(b) => Ok(PropertyValue::Bool(b)),
            None => Err(ReconcileError::validation(
                &prop.name,
                format!("'{}' is not a boolean", value),
            )),
        },
        ValueKind::List => {
            let items = match value {
                PropertyValue::List(items) => items.clone(),
                // A lone scalar is accepted as a one-element list.
                other => vec![other.clone()],
            };
            let mut texts = Vec::with_capacity(items.len());
            for item in &items {
                texts.push(scalar_text(prop, item)?);
            }
            texts.sort();
            texts.dedup();
            Ok(PropertyValue::List(
                texts.into_iter().map(PropertyValue::Str).collect(),
            ))
        }
        ValueKind::VlanRange => {
            let ids = match value {
                PropertyValue::Str(s) => vlan_range::decode(s)?,
                PropertyValue::Int(i) => vlan_range::decode(&i.to_string())?,
                PropertyValue::List(items) => {
                    let mut ids = Vec::with_capacity(items.len());
                    for item in items {
                        let text = scalar_text(prop, item)?;
                        ids.extend(vlan_range::decode(&text)?);
                    }
                    ids
                }
                PropertyValue::Bool(_) => {
                    return Err(ReconcileError::validation(
                        &prop.name,
                        "boolean is not a VLAN range",
                    ))
                }
            };
            Ok(PropertyValue::Str(vlan_range::encode(&ids)))
        }
    }
}

fn scalar_text(prop: &PropertySpec, value: &PropertyValue) -> ReconcileResult<String> {
    value.scalar_text().ok_or_else(|| {
        ReconcileError::validation(&prop.name, format!("'{}' is not a scalar", value))
    })
}
