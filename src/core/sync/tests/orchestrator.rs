use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::Notify;

use super::{MockSource, form, harness, item};
use crate::core::sync::SourceError;

fn two_form_source() -> MockSource {
    let mut leads = HashMap::new();
    leads.insert(
        "f1".to_string(),
        vec![vec![
            item(Some("L1"), &[("full_name", "Ana")]),
            item(Some("L2"), &[("full_name", "Bia")]),
        ]],
    );
    leads.insert(
        "f2".to_string(),
        vec![vec![item(Some("L3"), &[("nome", "Caio")])]],
    );
    MockSource {
        forms: vec![vec![form("f1"), form("f2")]],
        leads,
        ..MockSource::default()
    }
}

#[tokio::test]
async fn unconfigured_source_is_a_logged_no_op() {
    let h = harness(two_form_source(), 5).await;
    let report = h.orchestrator.sync_once().await.unwrap();
    assert!(!report.configured);
    assert_eq!(report.imported, 0);

    let logs = h.store.list_integration_logs(10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "info");
}

#[tokio::test]
async fn missing_token_counts_as_unconfigured() {
    let h = harness(two_form_source(), 5).await;
    h.store.save_source_config(Some("page-1"), true).await.unwrap();
    let report = h.orchestrator.sync_once().await.unwrap();
    assert!(!report.configured);
}

#[tokio::test]
async fn sync_imports_distributes_and_is_idempotent() {
    let h = harness(two_form_source(), 5).await;
    h.configure().await;
    let a = h.add_broker("ana").await;
    let b = h.add_broker("bia").await;

    let first = h.orchestrator.sync_once().await.unwrap();
    assert!(first.configured);
    assert_eq!(first.containers_seen, 2);
    assert_eq!(first.items_seen, 3);
    assert_eq!(first.imported, 3);
    let brokers: Vec<i64> = first.distribution.assigned.iter().map(|(_, b)| *b).collect();
    assert_eq!(brokers, vec![a, b, a]);

    let source = h.store.get_source_config().await.unwrap();
    assert!(source.last_sync.is_some());
    let logs = h.store.list_integration_logs(10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "Imported 3 new leads");

    let second = h.orchestrator.sync_once().await.unwrap();
    assert_eq!(second.imported, 0);
    assert_eq!(second.duplicates_skipped, 3);
    assert!(second.distribution.assigned.is_empty());
    // An empty batch writes no integration entry.
    assert_eq!(h.store.list_integration_logs(10).await.unwrap().len(), 1);
    assert_eq!(h.store.list_assignments().await.unwrap().len(), 3);
}

#[tokio::test]
async fn same_external_id_in_two_forms_imports_once() {
    let mut leads = HashMap::new();
    leads.insert("f1".to_string(), vec![vec![item(Some("DUP"), &[("name", "A")])]]);
    leads.insert("f2".to_string(), vec![vec![item(Some("DUP"), &[("name", "A")])]]);
    let source = MockSource {
        forms: vec![vec![form("f1"), form("f2")]],
        leads,
        ..MockSource::default()
    };
    let h = harness(source, 5).await;
    h.configure().await;

    let report = h.orchestrator.sync_once().await.unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(report.duplicates_skipped, 1);
}

#[tokio::test]
async fn leads_without_external_id_are_imported_every_time() {
    let mut leads = HashMap::new();
    leads.insert("f1".to_string(), vec![vec![item(None, &[("name", "Anon")])]]);
    let source = MockSource {
        forms: vec![vec![form("f1")]],
        leads,
        ..MockSource::default()
    };
    let h = harness(source, 5).await;
    h.configure().await;

    h.orchestrator.sync_once().await.unwrap();
    let second = h.orchestrator.sync_once().await.unwrap();
    assert_eq!(second.imported, 1);
    assert_eq!(
        h.store
            .list_leads(&Default::default())
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn failing_form_is_logged_and_others_continue() {
    let mut source = two_form_source();
    source.failing_forms = vec!["f1".to_string()];
    let h = harness(source, 5).await;
    h.configure().await;

    let report = h.orchestrator.sync_once().await.unwrap();
    assert_eq!(report.failures, 1);
    assert_eq!(report.imported, 1);

    let logs = h.store.list_integration_logs(10).await.unwrap();
    let error = logs.iter().find(|l| l.status == "error").unwrap();
    assert!(error.message.contains("f1"));
    assert_eq!(error.details.as_ref().unwrap()["status"], 500);
}

#[tokio::test]
async fn unreadable_entries_are_logged_and_the_page_still_imports() {
    let mut source = two_form_source();
    source.rejected.insert(
        "f1".to_string(),
        vec![SourceError::Decode("lead bad-2: unsupported field value".to_string())],
    );
    let h = harness(source, 5).await;
    h.configure().await;

    let report = h.orchestrator.sync_once().await.unwrap();
    assert_eq!(report.imported, 3);
    assert_eq!(report.failures, 1);
    assert_eq!(report.items_seen, 4);

    let logs = h.store.list_integration_logs(10).await.unwrap();
    let error = logs.iter().find(|l| l.status == "error").unwrap();
    assert_eq!(error.action, "sync_leads");
    assert!(error.message.contains("f1"));
    assert_eq!(error.details.as_ref().unwrap()["kind"], "decode");
}

#[tokio::test]
async fn failed_duplicate_check_is_logged_with_the_external_id() {
    let h = harness(two_form_source(), 5).await;
    h.configure().await;
    h.store
        .get_db()
        .lock()
        .await
        .execute_batch("DROP TABLE lead_assignments; DROP TABLE leads;")
        .unwrap();

    let report = h.orchestrator.sync_once().await.unwrap();
    assert_eq!(report.imported, 0);
    assert_eq!(report.failures, 3);

    let logs = h.store.list_integration_logs(10).await.unwrap();
    let errors: Vec<_> = logs
        .iter()
        .filter(|l| l.status == "error" && l.action == "sync_leads")
        .collect();
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().all(|l| l.message.contains("Duplicate check")));
    assert!(
        errors
            .iter()
            .any(|l| l.details.as_ref().unwrap()["external_id"] == "L2")
    );
}

#[tokio::test]
async fn pagination_is_followed_up_to_the_page_limit() {
    let mut leads = HashMap::new();
    leads.insert(
        "f1".to_string(),
        vec![
            vec![item(Some("P1"), &[("name", "One")])],
            vec![item(Some("P2"), &[("name", "Two")])],
            vec![item(Some("P3"), &[("name", "Three")])],
        ],
    );
    let source = MockSource {
        forms: vec![vec![form("f1")]],
        leads,
        ..MockSource::default()
    };
    let h = harness(source, 2).await;
    h.configure().await;

    let report = h.orchestrator.sync_once().await.unwrap();
    assert_eq!(report.items_seen, 2);
    assert_eq!(report.imported, 2);
}

#[tokio::test]
async fn timer_cycle_is_skipped_while_a_sync_runs() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut source = two_form_source();
    source.gate = Some((entered.clone(), release.clone()));
    let h = harness(source, 5).await;
    h.configure().await;

    let running = {
        let orchestrator = h.orchestrator.clone();
        tokio::spawn(async move { orchestrator.sync_once().await.unwrap() })
    };
    tokio::time::timeout(Duration::from_secs(5), entered.notified())
        .await
        .unwrap();

    assert!(h.orchestrator.sync_if_idle().await.unwrap().is_none());

    release.notify_one();
    let report = running.await.unwrap();
    assert_eq!(report.imported, 3);

    // Idle again: the timer path runs.
    release.notify_one();
    assert!(h.orchestrator.sync_if_idle().await.unwrap().is_some());
}

#[tokio::test]
async fn connection_test_logs_outcome() {
    let mut source = two_form_source();
    source.page_name = Some("Imobiliaria Centro".to_string());
    let h = harness(source, 5).await;

    assert!(h.orchestrator.test_connection().await.is_err());

    h.configure().await;
    let name = h.orchestrator.test_connection().await.unwrap();
    assert_eq!(name, "Imobiliaria Centro");
    let logs = h.store.list_integration_logs(5).await.unwrap();
    assert_eq!(logs[0].status, "success");
}

#[tokio::test]
async fn failed_connection_test_is_logged_as_error() {
    let h = harness(two_form_source(), 5).await;
    h.configure().await;
    assert!(h.orchestrator.test_connection().await.is_err());
    let logs = h.store.list_integration_logs(5).await.unwrap();
    assert_eq!(logs[0].status, "error");
    assert_eq!(logs[0].details.as_ref().unwrap()["kind"], "timeout");
}

#[tokio::test]
async fn containers_are_listed_once_per_run() {
    let source = two_form_source();
    let calls = source.container_calls.clone();
    let h = harness(source, 5).await;
    h.configure().await;
    h.orchestrator.sync_once().await.unwrap();
    h.orchestrator.sync_once().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
