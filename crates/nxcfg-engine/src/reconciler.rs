//! Reconciler / flush.
//!
//! Applies a computed [`Delta`] to the device in a constrained order and
//! reports convergence per resource.
//!
//! State machine per resource:
//! `{Absent} -> [Create] -> {Present} -> [Update]* -> {Present}` and
//! `{Present} -> [Delete] -> {Absent}`. Create and Delete are terminal
//! transitions; Update is the steady state.
//!
//! Ordering rules:
//! - Create: plain setters in schema order, then joint groups in declared
//!   order, then the gate. A new object comes up fully configured.
//! - Update with a gate transitioning disabled->enabled: everything else
//!   first, the gate flips last.
//! - Update with a gate transitioning enabled->disabled: the gate first,
//!   then the rest in normal order.
//!
//! On the first failed mutation the result carries exactly the changes that
//! already succeeded. There is no rollback and no automatic retry: a blind
//! retry of a stateful device mutation is unsafe without re-reading current
//! state, so cleanup is the caller's re-invocation.

use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, instrument, warn};

use nxcfg_types::Identity;

use crate::delta::{diff, Delta, EnsureAction, JointInvocation, PropertyChange};
use crate::desired::DesiredResource;
use crate::driver::DeviceDriver;
use crate::error::{ReconcileError, ReconcileResult};
use crate::index::{Instance, InstanceIndex, ScanPolicy};
use crate::matcher::match_desired;
use crate::schema::{ResourceKind, SchemaRegistry};

/// What one applied mutation targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeTarget {
    /// A single property write.
    Property(String),
    /// A joint setter group write.
    JointGroup(String),
}

impl fmt::Display for ChangeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeTarget::Property(name) => write!(f, "{}", name),
            ChangeTarget::JointGroup(id) => write!(f, "{}()", id),
        }
    }
}

/// One successfully applied mutation.
#[derive(Debug, Clone)]
pub struct AppliedChange {
    /// The property or group that was written.
    pub target: ChangeTarget,
    /// Human-readable rendering of what was written.
    pub summary: String,
}

/// Outcome record for one resource.
#[derive(Debug)]
pub struct ReconciliationResult {
    /// The resource's identity.
    pub identity: Identity,
    /// The transition that was attempted.
    pub action: EnsureAction,
    /// Mutations applied, in order, all successful.
    pub applied: Vec<AppliedChange>,
    /// First fatal error, if any. When set after a partial apply, `applied`
    /// lists exactly what succeeded before it.
    pub error: Option<ReconcileError>,
    /// Informational messages.
    pub notes: Vec<String>,
}

impl ReconciliationResult {
    fn new(identity: Identity, action: EnsureAction) -> Self {
        Self {
            identity,
            action,
            applied: Vec::new(),
            error: None,
            notes: Vec::new(),
        }
    }

    fn failed(identity: Identity, error: ReconcileError, note: impl Into<String>) -> Self {
        Self {
            identity,
            action: EnsureAction::NoOp,
            applied: Vec::new(),
            error: Some(error),
            notes: vec![note.into()],
        }
    }

    /// True if the resource fully converged.
    pub fn converged(&self) -> bool {
        self.error.is_none()
    }
}

enum Step<'a> {
    Plain(&'a PropertyChange),
    Joint(&'a JointInvocation),
}

/// Applies deltas against one device.
pub struct Reconciler<'d> {
    driver: &'d dyn DeviceDriver,
    registry: &'d SchemaRegistry,
    policy: ScanPolicy,
}

impl<'d> Reconciler<'d> {
    /// Creates a reconciler over a driver and a schema registry.
    pub fn new(driver: &'d dyn DeviceDriver, registry: &'d SchemaRegistry) -> Self {
        Self {
            driver,
            registry,
            policy: ScanPolicy::default(),
        }
    }

    /// Overrides the scan policy.
    pub fn with_policy(mut self, policy: ScanPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reconciles a batch of desired resources of one kind.
    ///
    /// Resources are processed strictly sequentially: the driver is a shared
    /// serialized channel, and the default assumption is no concurrent
    /// mutation against the same device.
    #[instrument(skip_all, fields(kind = kind_name, batch = desired.len()))]
    pub async fn reconcile(
        &self,
        kind_name: &str,
        desired: &[DesiredResource],
    ) -> ReconcileResult<Vec<ReconciliationResult>> {
        let kind = self
            .registry
            .describe(kind_name)
            .ok_or_else(|| ReconcileError::schema(kind_name, "kind not registered"))?;

        let index = InstanceIndex::scan_for(&kind, self.driver, desired, self.policy).await?;
        let matches = match_desired(desired, &index);

        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(desired.len());
        for (resource, instance) in matches {
            if !seen.insert(resource.identity.clone()) {
                results.push(ReconciliationResult::failed(
                    resource.identity.clone(),
                    ReconcileError::validation(
                        "identity",
                        "duplicate identity in desired batch",
                    ),
                    "skipped: an earlier entry already manages this identity",
                ));
                continue;
            }

            match diff(&kind, resource, instance) {
                Ok(delta) => {
                    results.push(self.apply(&kind, resource, instance, &delta).await);
                }
                Err(err) => {
                    warn!(identity = %resource.identity, error = %err, "rejected before mutation");
                    results.push(ReconciliationResult::failed(
                        resource.identity.clone(),
                        err,
                        "rejected before any mutation; device untouched",
                    ));
                }
            }
        }
        Ok(results)
    }

    /// Applies one delta. Never returns `Err`: failures are reported inside
    /// the result together with what already succeeded.
    #[instrument(skip_all, fields(identity = %desired.identity, action = delta.action.as_str()))]
    pub async fn apply(
        &self,
        kind: &ResourceKind,
        desired: &DesiredResource,
        instance: Option<&Instance>,
        delta: &Delta,
    ) -> ReconciliationResult {
        let mut result = ReconciliationResult::new(desired.identity.clone(), delta.action);

        match delta.action {
            EnsureAction::NoOp => {
                debug!("already converged");
            }
            EnsureAction::Delete => {
                // diff only yields Delete when an instance matched.
                let Some(instance) = instance else {
                    result.error = Some(ReconcileError::validation(
                        "ensure",
                        "delete requested without a live instance",
                    ));
                    return result;
                };
                match self.driver.destroy(&instance.handle).await {
                    Ok(()) => {
                        info!(identity = %desired.identity, "destroyed");
                        result.notes.push("destroyed".to_string());
                    }
                    Err(err) => result.error = Some(err.into()),
                }
            }
            EnsureAction::Create => {
                if let Err(err) = self.driver.create(kind.name(), &desired.identity).await {
                    result.error = Some(err.into());
                    return result;
                }
                result.notes.push("created".to_string());
                let steps = order_steps(kind, delta, GateSlot::Last);
                self.run_steps(kind, desired, steps, &mut result).await;
            }
            EnsureAction::Update => {
                let slot = update_gate_slot(kind, delta);
                let steps = order_steps(kind, delta, slot);
                self.run_steps(kind, desired, steps, &mut result).await;
            }
        }
        result
    }

    async fn run_steps(
        &self,
        kind: &ResourceKind,
        desired: &DesiredResource,
        steps: Vec<Step<'_>>,
        result: &mut ReconciliationResult,
    ) {
        for step in steps {
            let outcome = match &step {
                Step::Plain(change) => {
                    self.driver
                        .write(kind.name(), &desired.identity, &change.name, &change.new)
                        .await
                }
                Step::Joint(invocation) => {
                    self.driver
                        .write_joint(
                            kind.name(),
                            &desired.identity,
                            &invocation.group,
                            &invocation.args,
                        )
                        .await
                }
            };
            match outcome {
                Ok(()) => result.applied.push(applied(&step)),
                Err(err) => {
                    warn!(
                        identity = %desired.identity,
                        applied = result.applied.len(),
                        error = %err,
                        "apply failed mid-flight"
                    );
                    result.notes.push(format!(
                        "partial success: {} change(s) applied before failure",
                        result.applied.len()
                    ));
                    result.error = Some(err.into());
                    return;
                }
            }
        }
    }
}

fn applied(step: &Step<'_>) -> AppliedChange {
    match step {
        Step::Plain(change) => AppliedChange {
            target: ChangeTarget::Property(change.name.clone()),
            summary: format!("{}={}", change.name, change.new),
        },
        Step::Joint(invocation) => AppliedChange {
            target: ChangeTarget::JointGroup(invocation.group.clone()),
            summary: format!("{}(changed: {})", invocation.group, invocation.changed.join(",")),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateSlot {
    First,
    Last,
    None,
}

/// Chooses where the gate change runs during an update.
///
/// Mirrors the device behavior this exists for: an object must never be
/// active while half-configured. Coming up means configure first, enable
/// last; going down means disable first, then reconfigure freely.
fn update_gate_slot(kind: &ResourceKind, delta: &Delta) -> GateSlot {
    let Some(gate) = kind.gate() else {
        return GateSlot::None;
    };
    let Some(change) = delta.changes.iter().find(|c| c.name == gate.name) else {
        return GateSlot::None;
    };
    let becomes_enabled = change.new.as_bool() == Some(gate.enabled_when);
    if becomes_enabled {
        GateSlot::Last
    } else {
        GateSlot::First
    }
}

fn order_steps<'a>(kind: &ResourceKind, delta: &'a Delta, slot: GateSlot) -> Vec<Step<'a>> {
    let gate_name = kind.gate().map(|g| g.name.as_str());
    let is_gate = |change: &PropertyChange| Some(change.name.as_str()) == gate_name;

    let mut steps = Vec::with_capacity(delta.mutation_count());
    let gate_change = delta.changes.iter().find(|c| is_gate(c));

    if slot == GateSlot::First {
        if let Some(change) = gate_change {
            steps.push(Step::Plain(change));
        }
    }
    steps.extend(
        delta
            .changes
            .iter()
            .filter(|c| !is_gate(c))
            .map(Step::Plain),
    );
    steps.extend(delta.joint.iter().map(Step::Joint));
    if slot == GateSlot::Last {
        if let Some(change) = gate_change {
            steps.push(Step::Plain(change));
        }
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDriver, Mutation};
    use nxcfg_types::{PropertyMap, PropertyValue as V};

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                ResourceKind::builder("itd_service")
                    .identity(["name"])
                    .scalar("device_group", "")
                    .scalar("virtual_ip", "")
                    .list("ingress_interface")
                    .scalar("load_bal_method", "")
                    .boolean("load_bal_enable", false)
                    .joint_group("load_balance", ["load_bal_method", "load_bal_enable"])
                    .boolean("shutdown", true)
                    .gate("shutdown", false)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    fn props(entries: &[(&str, V)]) -> PropertyMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn mutation_targets(log: &[Mutation]) -> Vec<String> {
        log.iter()
            .filter_map(|m| m.target_name().map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_create_configures_before_enabling() {
        let driver = MemoryDriver::new();
        let registry = registry();
        let reconciler = Reconciler::new(&driver, &registry);

        let desired = vec![DesiredResource::present(Identity::new(["web_service"]))
            .with("device_group", "dg1")
            .with("virtual_ip", "10.0.0.1")
            .with("shutdown", false)];

        let results = reconciler.reconcile("itd_service", &desired).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].converged());
        assert_eq!(results[0].action, EnsureAction::Create);

        let targets = mutation_targets(&driver.mutation_log().await);
        // Gate flips last on create
        assert_eq!(targets.last().map(String::as_str), Some("shutdown"));
        assert!(targets.contains(&"device_group".to_string()));
    }

    #[tokio::test]
    async fn test_update_enabling_gate_runs_last() {
        let driver = MemoryDriver::new();
        driver
            .seed(
                "itd_service",
                Identity::new(["web_service"]),
                props(&[
                    ("shutdown", V::Bool(true)),
                    ("device_group", V::str("dg1")),
                ]),
            )
            .await;

        let registry = registry();
        let reconciler = Reconciler::new(&driver, &registry);
        let desired = vec![DesiredResource::present(Identity::new(["web_service"]))
            .with("device_group", "dg2")
            .with("virtual_ip", "10.0.0.2")
            .with("shutdown", false)];

        let results = reconciler.reconcile("itd_service", &desired).await.unwrap();
        assert!(results[0].converged());

        let targets = mutation_targets(&driver.mutation_log().await);
        assert_eq!(
            targets,
            vec!["device_group", "virtual_ip", "shutdown"],
            "all non-gate changes must precede an enabling gate flip"
        );
    }

    #[tokio::test]
    async fn test_update_disabling_gate_runs_first() {
        let driver = MemoryDriver::new();
        driver
            .seed(
                "itd_service",
                Identity::new(["web_service"]),
                props(&[
                    ("shutdown", V::Bool(false)),
                    ("device_group", V::str("dg1")),
                ]),
            )
            .await;

        let registry = registry();
        let reconciler = Reconciler::new(&driver, &registry);
        let desired = vec![DesiredResource::present(Identity::new(["web_service"]))
            .with("device_group", "dg2")
            .with("shutdown", true)];

        let results = reconciler.reconcile("itd_service", &desired).await.unwrap();
        assert!(results[0].converged());

        let targets = mutation_targets(&driver.mutation_log().await);
        assert_eq!(targets, vec!["shutdown", "device_group"]);
    }

    #[tokio::test]
    async fn test_partial_failure_reports_prior_successes() {
        let driver = MemoryDriver::new();
        driver
            .seed("itd_service", Identity::new(["web_service"]), PropertyMap::new())
            .await;
        driver.fail_writes("itd_service", "virtual_ip").await;

        let registry = registry();
        let reconciler = Reconciler::new(&driver, &registry);
        // Three planned changes in schema order; the second fails.
        let desired = vec![DesiredResource::present(Identity::new(["web_service"]))
            .with("device_group", "dg1")
            .with("virtual_ip", "10.0.0.1")
            .with("ingress_interface", V::str_list(["Ethernet1/1"]))];

        let results = reconciler.reconcile("itd_service", &desired).await.unwrap();
        let result = &results[0];
        assert!(!result.converged());
        assert_eq!(result.applied.len(), 1);
        assert_eq!(
            result.applied[0].target,
            ChangeTarget::Property("device_group".to_string())
        );
        assert!(matches!(result.error, Some(ReconcileError::Driver(_))));
        assert!(result.notes.iter().any(|n| n.contains("partial success")));

        // The failed and unreached writes never landed
        let current = driver
            .properties("itd_service", &Identity::new(["web_service"]))
            .await
            .unwrap();
        assert_eq!(current.get("device_group"), Some(&V::str("dg1")));
        assert_eq!(current.get("virtual_ip"), None);
        assert_eq!(current.get("ingress_interface"), None);
    }

    #[tokio::test]
    async fn test_joint_group_applied_after_plain_changes() {
        let driver = MemoryDriver::new();
        driver
            .seed("itd_service", Identity::new(["web_service"]), PropertyMap::new())
            .await;

        let registry = registry();
        let reconciler = Reconciler::new(&driver, &registry);
        let desired = vec![DesiredResource::present(Identity::new(["web_service"]))
            .with("device_group", "dg1")
            .with("load_bal_method", "src-ip")];

        let results = reconciler.reconcile("itd_service", &desired).await.unwrap();
        assert!(results[0].converged());

        let log = driver.mutation_log().await;
        let targets = mutation_targets(&log);
        assert_eq!(targets, vec!["device_group", "load_balance"]);

        // The joint write carried the backfilled sibling
        let Some(Mutation::WriteJoint { args, .. }) = log.last() else {
            panic!("expected a joint write");
        };
        assert_eq!(args.get("load_bal_method"), Some(&V::str("src-ip")));
        assert_eq!(args.get("load_bal_enable"), Some(&V::Bool(false)));
    }

    #[tokio::test]
    async fn test_delete_and_absent_noop() {
        let driver = MemoryDriver::new();
        driver
            .seed("itd_service", Identity::new(["web_service"]), PropertyMap::new())
            .await;

        let registry = registry();
        let reconciler = Reconciler::new(&driver, &registry);

        let desired = vec![
            DesiredResource::absent(Identity::new(["web_service"])),
            DesiredResource::absent(Identity::new(["gone_already"])),
        ];
        let results = reconciler.reconcile("itd_service", &desired).await.unwrap();
        assert_eq!(results[0].action, EnsureAction::Delete);
        assert!(results[0].converged());
        assert_eq!(results[1].action, EnsureAction::NoOp);

        assert_eq!(driver.population("itd_service").await, 0);
    }

    #[tokio::test]
    async fn test_validation_failure_leaves_device_untouched() {
        let driver = MemoryDriver::new();
        let registry = registry();
        let reconciler = Reconciler::new(&driver, &registry);

        let desired = vec![DesiredResource::present(Identity::new(["web_service"]))
            .with("not_a_property", 1i64)];
        let results = reconciler.reconcile("itd_service", &desired).await.unwrap();
        assert!(!results[0].converged());
        assert!(results[0].applied.is_empty());
        assert!(driver.mutation_log().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_desired_identity_rejected() {
        let driver = MemoryDriver::new();
        let registry = registry();
        let reconciler = Reconciler::new(&driver, &registry);

        let desired = vec![
            DesiredResource::present(Identity::new(["web_service"])).with("device_group", "a"),
            DesiredResource::present(Identity::new(["WEB_SERVICE"])).with("device_group", "b"),
        ];
        let results = reconciler.reconcile("itd_service", &desired).await.unwrap();
        assert!(results[0].converged());
        assert!(!results[1].converged());
        assert!(matches!(
            results[1].error,
            Some(ReconcileError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let driver = MemoryDriver::new();
        let registry = registry();
        let reconciler = Reconciler::new(&driver, &registry);
        let err = reconciler.reconcile("no_such_kind", &[]).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Schema { .. }));
    }

    #[tokio::test]
    async fn test_reapply_is_noop() {
        let driver = MemoryDriver::new();
        let registry = registry();
        let reconciler = Reconciler::new(&driver, &registry);

        let desired = vec![DesiredResource::present(Identity::new(["web_service"]))
            .with("device_group", "dg1")
            .with("load_bal_method", "src-ip")
            .with("shutdown", false)];

        let first = reconciler.reconcile("itd_service", &desired).await.unwrap();
        assert!(first[0].converged());
        let mutations_after_first = driver.mutation_log().await.len();

        let second = reconciler.reconcile("itd_service", &desired).await.unwrap();
        assert_eq!(second[0].action, EnsureAction::NoOp);
        assert_eq!(driver.mutation_log().await.len(), mutations_after_first);
    }
}
