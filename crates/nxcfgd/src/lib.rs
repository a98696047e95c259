//! nxcfgd - declarative configuration apply tool.
//!
//! Loads a JSON manifest of desired resources (and optionally a seeded
//! device state), reconciles every kind in it against the in-memory
//! reference driver, and reports per-resource convergence. The manifest
//! format is owned by this binary; the reconciliation core only ever sees
//! typed [`DesiredResource`] values.

pub mod manifest;

use anyhow::{bail, Context, Result};
use tracing::info;

use nxcfg_engine::{MemoryDriver, ReconciliationResult, Reconciler, ScanPolicy, SchemaRegistry};

use crate::manifest::{DeviceState, Manifest};

/// Seeds the in-memory device from a state file.
pub async fn seed_device(driver: &MemoryDriver, state: &DeviceState) -> Result<()> {
    for object in &state.objects {
        let (identity, properties) = object.to_parts()?;
        driver.seed(&object.kind, identity, properties).await;
    }
    info!(objects = state.objects.len(), "seeded device state");
    Ok(())
}

/// Applies a manifest kind by kind, in manifest order.
///
/// Returns every result paired with its kind name. Kinds are processed
/// sequentially against the single driver; resources within a kind are
/// reconciled in batch.
pub async fn apply_manifest(
    driver: &MemoryDriver,
    registry: &SchemaRegistry,
    manifest: &Manifest,
    threshold: usize,
) -> Result<Vec<(String, ReconciliationResult)>> {
    let reconciler = Reconciler::new(driver, registry).with_policy(ScanPolicy {
        targeted_fetch_threshold: threshold,
    });

    let mut all = Vec::new();
    for (kind, desired) in manifest.desired_by_kind()? {
        if registry.describe(&kind).is_none() {
            bail!("manifest references unknown kind '{}'", kind);
        }
        let results = reconciler
            .reconcile(&kind, &desired)
            .await
            .with_context(|| format!("reconciling kind '{}'", kind))?;
        all.extend(results.into_iter().map(|r| (kind.clone(), r)));
    }
    Ok(all)
}

/// Renders one result as a JSON report line.
pub fn render_result(kind: &str, result: &ReconciliationResult) -> serde_json::Value {
    serde_json::json!({
        "kind": kind,
        "identity": result.identity.to_string(),
        "action": result.action.as_str(),
        "converged": result.converged(),
        "applied": result
            .applied
            .iter()
            .map(|change| change.summary.clone())
            .collect::<Vec<_>>(),
        "error": result.error.as_ref().map(|e| e.to_string()),
        "notes": result.notes.clone(),
    })
}

/// Renders a kind's schema for the `describe` subcommand.
pub fn render_schema(registry: &SchemaRegistry, kind_name: &str) -> Result<serde_json::Value> {
    let Some(kind) = registry.describe(kind_name) else {
        bail!(
            "unknown kind '{}' (known: {})",
            kind_name,
            registry.kind_names().join(", ")
        );
    };
    Ok(serde_json::json!({
        "name": kind.name(),
        "identity": kind.identity_fields(),
        "properties": kind
            .properties()
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name.clone(),
                    "kind": p.kind.as_str(),
                    "default": p.default.to_string(),
                    "joint_group": kind.group_of(&p.name),
                })
            })
            .collect::<Vec<_>>(),
        "joint_groups": kind
            .joint_groups()
            .iter()
            .map(|g| serde_json::json!({ "id": g.id.clone(), "members": g.members.clone() }))
            .collect::<Vec<_>>(),
        "gate": kind.gate().map(|g| {
            serde_json::json!({ "property": g.name.clone(), "enabled_when": g.enabled_when })
        }),
    }))
}
