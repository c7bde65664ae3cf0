// tests/packs.rs

//! Recipe pack inspection and singleton coverage.
//!
//! These tests verify that:
//! 1. Resource types claimed by several packs are reported in inspection order
//! 2. Unresolvable pack references are skipped, unreadable packs are fatal
//! 3. Ensuring singleton coverage converges and never rewrites existing packs

mod common;

use common::*;
use recipe_engine::Error;
use recipe_engine::config::DEFAULT_PACK_SCOPE;
use recipe_engine::pack::{
    ConflictDetector, FilePackClient, InMemoryPackClient, PackClient, PackId,
    SINGLETON_DEFINITIONS, ensure_missing_singletons, extract_pack_ids, pack_id_exists,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

fn id(name: &str) -> String {
    PackId::new(DEFAULT_PACK_SCOPE, name).to_string()
}

#[tokio::test]
async fn test_two_packs_claiming_redis_conflict() {
    let client = InMemoryPackClient::new()
        .with_pack("default", pack_with(&[REDIS, "Radius.Compute/containers"]))
        .with_pack("custom", pack_with(&[REDIS]));
    let detector = ConflictDetector::new().with_client(DEFAULT_PACK_SCOPE, Arc::new(client));

    let report = detector.inspect(&[id("default"), id("custom")]).await.unwrap();

    assert_eq!(report.conflicts[REDIS], vec!["default", "custom"]);
    assert_eq!(report.covered[REDIS], "default");
    assert_eq!(report.covered["Radius.Compute/containers"], "default");

    let err = report.conflict_error().unwrap();
    assert!(matches!(err, Error::ConflictDetected(_)));
    let message = err.to_string();
    assert!(message.contains(REDIS));
    assert!(message.contains("default, custom"));
}

#[tokio::test]
async fn test_inspection_order_decides_coverage() {
    let client = Arc::new(
        InMemoryPackClient::new()
            .with_pack("default", pack_with(&[REDIS]))
            .with_pack("custom", pack_with(&[REDIS])),
    );
    let detector = ConflictDetector::new().with_client(DEFAULT_PACK_SCOPE, client);

    let report = detector.inspect(&[id("custom"), id("default")]).await.unwrap();
    assert_eq!(report.conflicts[REDIS], vec!["custom", "default"]);
    assert_eq!(report.covered[REDIS], "custom");
}

#[tokio::test]
async fn test_file_store_inspection() {
    let dir = tempfile::tempdir().unwrap();
    let store = FilePackClient::new(dir.path());
    store.create_or_update("default", &pack_with(&[REDIS])).await.unwrap();
    store.create_or_update("storage", &pack_with(&[POSTGRES])).await.unwrap();
    std::fs::write(dir.path().join("broken.json"), "{").unwrap();

    let detector = ConflictDetector::new().with_client(DEFAULT_PACK_SCOPE, Arc::new(store));

    let report = detector
        .inspect(&[id("default"), id("storage"), id("missing"), "garbage".to_string()])
        .await
        .unwrap();
    assert!(!report.has_conflicts());
    assert_eq!(report.covered.len(), 2);
    assert_eq!(report.skipped.len(), 2);

    let err = detector.inspect(&[id("default"), id("broken")]).await.unwrap_err();
    assert!(matches!(err, Error::PackFetchFailed { .. }));
}

fn modified(path: &std::path::Path) -> std::time::SystemTime {
    std::fs::metadata(path).unwrap().modified().unwrap()
}

#[tokio::test]
async fn test_ensure_twice_creates_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let client = FilePackClient::new(dir.path().join("packs"));
    let covered = BTreeMap::new();

    let first = ensure_missing_singletons(&client, DEFAULT_PACK_SCOPE, &covered)
        .await
        .unwrap();
    assert_eq!(first.created.len(), SINGLETON_DEFINITIONS.len());
    let stored = client.list().await.unwrap();
    assert_eq!(stored.len(), SINGLETON_DEFINITIONS.len());

    let before: Vec<_> = stored
        .iter()
        .map(|name| modified(&dir.path().join("packs").join(format!("{name}.json"))))
        .collect();

    let second = ensure_missing_singletons(&client, DEFAULT_PACK_SCOPE, &covered)
        .await
        .unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.coverage, first.coverage);
    assert_eq!(second.pack_ids().len(), first.pack_ids().len());

    let after: Vec<_> = stored
        .iter()
        .map(|name| modified(&dir.path().join("packs").join(format!("{name}.json"))))
        .collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_ensure_respects_existing_coverage() {
    let packs = Arc::new(
        InMemoryPackClient::new().with_pack(
            "platform",
            pack_with(&["Radius.Compute/containers", "Radius.Security/secrets"]),
        ),
    );
    let detector = ConflictDetector::new().with_client(DEFAULT_PACK_SCOPE, packs.clone());
    let inspection = detector.inspect(&[id("platform")]).await.unwrap();

    let ensured = ensure_missing_singletons(&*packs, DEFAULT_PACK_SCOPE, &inspection.covered)
        .await
        .unwrap();

    assert_eq!(ensured.created, vec![id("persistentvolumes"), id("routes")]);
    assert_eq!(ensured.coverage["Radius.Compute/containers"], "platform");
    assert_eq!(ensured.coverage["Radius.Compute/routes"], "routes");
    assert_eq!(packs.write_count(), 2);

    // the new packs do not collide with the existing one
    let mut all = vec![id("platform")];
    all.extend(ensured.pack_ids());
    let recheck = detector.inspect(&all).await.unwrap();
    assert!(!recheck.has_conflicts());
    assert_eq!(recheck.covered.len(), 4);
}

#[test]
fn test_environment_pack_references() {
    let env = json!({
        "recipePacks": [id("default"), 42, id("custom")],
        "compute": { "kind": "kubernetes" }
    });
    let ids = extract_pack_ids(Some(&env)).unwrap();
    assert_eq!(ids, vec![id("default"), id("custom")]);
    assert!(pack_id_exists(&ids, &id("DEFAULT")));
    assert!(!pack_id_exists(&ids, &id("other")));

    assert_eq!(extract_pack_ids(Some(&json!({ "recipePacks": [] }))), None);
    assert_eq!(extract_pack_ids(Some(&json!({ "recipePacks": "x" }))), None);
    assert_eq!(extract_pack_ids(None), None);
}
