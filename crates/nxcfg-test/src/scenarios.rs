//! End-to-end scenarios spanning kinds, engine and the memory driver.

use nxcfg_engine::{
    diff, DesiredResource, EnsureAction, InstanceIndex, MemoryDriver, Mutation, ReconcileError,
    Reconciler, ScanPolicy,
};
use nxcfg_kinds::{bgp_neighbor, bgp_neighbor_af, default_registry, hsrp_group, trunk_port};
use nxcfg_types::{Identity, PropertyValue as V};

use crate::fixtures::{bgp_fixtures, hsrp_fixtures, trunk_fixtures};
use crate::verification::{
    applied_targets, assert_applied_before, assert_backfill_complete, verify_idempotent,
};

#[tokio::test]
async fn timers_change_resends_both_members() {
    let driver = MemoryDriver::new();
    let identity = bgp_fixtures::single_neighbor(&driver).await;
    let registry = default_registry().unwrap();
    let reconciler = Reconciler::new(&driver, &registry);

    // Only the holdtime changes; the keepalive must ride along at its
    // current device value.
    let desired = vec![DesiredResource::present(identity.clone()).with("timers_holdtime", 240i64)];
    let results = reconciler.reconcile("bgp_neighbor", &desired).await.unwrap();
    assert!(results[0].converged());

    let log = driver.mutation_log().await;
    let Some(Mutation::WriteJoint { group, args, .. }) = log.last() else {
        panic!("expected a joint timers write, got {:?}", log.last());
    };
    assert_eq!(group, "timers");
    assert_eq!(args.get("timers_holdtime"), Some(&V::str("240")));
    assert_eq!(args.get("timers_keepalive"), Some(&V::str("60")));
}

#[tokio::test]
async fn authentication_tuple_backfills_all_six_fields() {
    let driver = MemoryDriver::new();
    let identity = hsrp_fixtures::authenticated_group(&driver).await;
    let registry = default_registry().unwrap();

    let kind = registry.describe("hsrp_group").unwrap();
    let index = InstanceIndex::scan(&kind, &driver).await.unwrap();
    let instance = index.get(&identity);

    let desired = DesiredResource::present(identity.clone()).with("authentication_string", "n3w");
    let delta = diff(&kind, &desired, instance).unwrap();

    assert_backfill_complete(&kind, &delta).unwrap();
    assert_eq!(delta.joint.len(), 1);
    let inv = &delta.joint[0];
    assert_eq!(inv.group, "authentication");
    assert_eq!(inv.changed, vec!["authentication_string".to_string()]);
    assert_eq!(inv.args.len(), 6);
    // Unchanged siblings carry current device values, not defaults
    assert_eq!(inv.args.get("authentication_auth_type"), Some(&V::str("md5")));
    assert_eq!(inv.args.get("authentication_timeout"), Some(&V::str("30")));
    // Never-set sibling falls back to the schema default
    assert_eq!(
        inv.args.get("authentication_compatibility"),
        Some(&V::Bool(false))
    );
}

#[tokio::test]
async fn unshutting_neighbor_applies_config_first() {
    let driver = MemoryDriver::new();
    let identity = Identity::new(["65001", "default", "10.2.2.2"]);
    driver
        .seed(
            "bgp_neighbor",
            identity.clone(),
            crate::fixtures::property_map([
                ("shutdown", V::Bool(true)),
                ("remote_as", V::str("65002")),
            ]),
        )
        .await;
    let registry = default_registry().unwrap();
    let reconciler = Reconciler::new(&driver, &registry);

    let desired = vec![DesiredResource::present(identity.clone())
        .with("description", "edge peer")
        .with("timers_holdtime", 240i64)
        .with("shutdown", false)];
    let results = reconciler.reconcile("bgp_neighbor", &desired).await.unwrap();
    let result = &results[0];
    assert!(result.converged());

    // Everything else lands before the gate flip, joint groups included.
    assert_applied_before(result, "description", "shutdown").unwrap();
    assert_applied_before(result, "timers()", "shutdown").unwrap();
    assert_eq!(applied_targets(result).last().map(String::as_str), Some("shutdown"));
}

#[tokio::test]
async fn shutting_neighbor_disables_first() {
    let driver = MemoryDriver::new();
    let identity = bgp_fixtures::single_neighbor(&driver).await;
    let registry = default_registry().unwrap();
    let reconciler = Reconciler::new(&driver, &registry);

    let desired = vec![DesiredResource::present(identity.clone())
        .with("description", "decommissioning")
        .with("shutdown", true)];
    let results = reconciler.reconcile("bgp_neighbor", &desired).await.unwrap();
    let result = &results[0];
    assert!(result.converged());
    assert_applied_before(result, "shutdown", "description").unwrap();
}

#[tokio::test]
async fn full_convergence_is_idempotent() {
    let driver = MemoryDriver::new();
    trunk_fixtures::trunk_with_vlans(&driver, "Ethernet1/1").await;
    let registry = default_registry().unwrap();
    let reconciler = Reconciler::new(&driver, &registry);

    let desired = vec![
        // Update an existing trunk
        DesiredResource::present(trunk_port::identity("Ethernet1/1"))
            .with("mode", "trunk")
            .with("tagged_vlans", "10-20,30"),
        // Create a new one from scratch
        DesiredResource::present(trunk_port::identity("Ethernet1/2"))
            .with("mode", "trunk")
            .with("untagged_vlan", 100i64)
            .with("tagged_vlans", V::str_list(["100", "200"]))
            .with("shutdown", false),
    ];
    let results = reconciler.reconcile("trunk_port", &desired).await.unwrap();
    assert!(results.iter().all(|r| r.converged()));
    assert_eq!(results[0].action, EnsureAction::Update);
    assert_eq!(results[1].action, EnsureAction::Create);

    verify_idempotent(&driver, &registry, "trunk_port", &desired)
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_then_recreate_cycle() {
    let driver = MemoryDriver::new();
    let identity = bgp_fixtures::single_neighbor(&driver).await;
    let registry = default_registry().unwrap();
    let reconciler = Reconciler::new(&driver, &registry);

    let absent = vec![DesiredResource::absent(identity.clone())];
    let results = reconciler.reconcile("bgp_neighbor", &absent).await.unwrap();
    assert_eq!(results[0].action, EnsureAction::Delete);
    assert_eq!(driver.population("bgp_neighbor").await, 0);

    let present = vec![DesiredResource::present(identity.clone()).with("remote_as", "65002")];
    let results = reconciler.reconcile("bgp_neighbor", &present).await.unwrap();
    assert_eq!(results[0].action, EnsureAction::Create);
    assert!(results[0].converged());
    assert_eq!(driver.population("bgp_neighbor").await, 1);
}

#[tokio::test]
async fn max_prefix_misuse_never_reaches_device() {
    let driver = MemoryDriver::new();
    let registry = default_registry().unwrap();
    let reconciler = Reconciler::new(&driver, &registry);

    let identity = bgp_neighbor_af::identity("65001", "default", "10.1.1.1", "ipv4", "unicast")
        .unwrap();
    let desired = vec![DesiredResource::present(identity)
        .with("max_prefix_limit", 100i64)
        .with("max_prefix_interval", 30i64)
        .with("max_prefix_warning", true)];

    let results = reconciler
        .reconcile("bgp_neighbor_af", &desired)
        .await
        .unwrap();
    assert!(matches!(
        results[0].error,
        Some(ReconcileError::Validation { .. })
    ));
    assert!(driver.mutation_log().await.is_empty());
}

#[tokio::test]
async fn partial_failure_reports_what_landed() {
    let driver = MemoryDriver::new();
    let identity = hsrp_fixtures::authenticated_group(&driver).await;
    driver.fail_writes("hsrp_group", "authentication").await;
    let registry = default_registry().unwrap();
    let reconciler = Reconciler::new(&driver, &registry);

    let desired = vec![DesiredResource::present(identity.clone())
        .with("group_name", "gateway")
        .with("authentication_string", "n3w")];
    let results = reconciler.reconcile("hsrp_group", &desired).await.unwrap();
    let result = &results[0];

    assert!(!result.converged());
    assert_eq!(applied_targets(result), vec!["group_name"]);
    assert!(result.notes.iter().any(|n| n.contains("partial success")));

    // The plain write landed; the failed group did not.
    let current = driver.properties("hsrp_group", &identity).await.unwrap();
    assert_eq!(current.get("group_name"), Some(&V::str("gateway")));
    assert_eq!(current.get("authentication_string"), Some(&V::str("s3cret")));
}

#[tokio::test]
async fn asdot_and_asplain_address_the_same_neighbor() {
    let driver = MemoryDriver::new();
    let registry = default_registry().unwrap();
    let reconciler = Reconciler::new(&driver, &registry);

    let asdot = bgp_neighbor::identity("1.5", "default", "10.9.9.9").unwrap();
    let desired = vec![DesiredResource::present(asdot).with("remote_as", "65002")];
    let results = reconciler.reconcile("bgp_neighbor", &desired).await.unwrap();
    assert_eq!(results[0].action, EnsureAction::Create);

    // Re-addressed in plain notation: already converged.
    let asplain = bgp_neighbor::identity("65541", "default", "10.9.9.9").unwrap();
    let desired = vec![DesiredResource::present(asplain).with("remote_as", "65002")];
    let results = reconciler.reconcile("bgp_neighbor", &desired).await.unwrap();
    assert_eq!(results[0].action, EnsureAction::NoOp);
}

#[tokio::test]
async fn small_batch_uses_targeted_fetches() {
    let driver = MemoryDriver::new();
    for i in 0..50u32 {
        driver
            .seed(
                "hsrp_group",
                hsrp_group::identity("Vlan10", i, "ipv4"),
                crate::fixtures::property_map([("priority", V::Int(100))]),
            )
            .await;
    }
    let registry = default_registry().unwrap();
    let reconciler = Reconciler::new(&driver, &registry).with_policy(ScanPolicy {
        targeted_fetch_threshold: 4,
    });

    let desired = vec![DesiredResource::present(hsrp_group::identity("Vlan10", 7, "ipv4"))
        .with("priority", 120i64)];
    let results = reconciler.reconcile("hsrp_group", &desired).await.unwrap();
    assert!(results[0].converged());
    assert_eq!(results[0].action, EnsureAction::Update);
}
