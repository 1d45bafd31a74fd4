use std::sync::Arc;

use super::{add_broker, add_leads};
use crate::core::distribution::{LeadDistributor, RotationConfig, RotationPolicy};
use crate::core::store::{BrokerFlags, LeadStore, test_lead_store};

#[tokio::test]
async fn round_robin_assigns_in_order_and_persists_cursor() {
    let store = Arc::new(test_lead_store().await);
    let a = add_broker(&store, "ana").await;
    let b = add_broker(&store, "bia").await;
    let c = add_broker(&store, "caio").await;
    let leads = add_leads(&store, 4).await;

    let distributor = LeadDistributor::new(store.clone());
    let report = distributor.distribute(&leads).await.unwrap();

    let brokers: Vec<i64> = report.assigned.iter().map(|(_, broker)| *broker).collect();
    assert_eq!(brokers, vec![a.id, b.id, c.id, a.id]);
    assert!(report.unassigned.is_empty());
    assert_eq!(store.load_rotation_state().await.unwrap().cursor, 1);
    assert_eq!(store.list_assignments().await.unwrap().len(), 4);
}

#[tokio::test]
async fn rotation_continues_across_batches() {
    let store = Arc::new(test_lead_store().await);
    let a = add_broker(&store, "ana").await;
    let b = add_broker(&store, "bia").await;
    let leads = add_leads(&store, 3).await;
    let distributor = LeadDistributor::new(store.clone());

    distributor.distribute(&leads[..1]).await.unwrap();
    let second = distributor.distribute(&leads[1..]).await.unwrap();
    assert_eq!(second.assigned, vec![(leads[1].id, b.id), (leads[2].id, a.id)]);
}

#[tokio::test]
async fn already_assigned_leads_are_skipped() {
    let store = Arc::new(test_lead_store().await);
    add_broker(&store, "ana").await;
    let leads = add_leads(&store, 2).await;
    let distributor = LeadDistributor::new(store.clone());

    distributor.distribute(&leads).await.unwrap();
    // Same stale records again: nothing changes.
    let again = distributor.distribute(&leads).await.unwrap();
    assert!(again.assigned.is_empty());
    assert_eq!(again.already_assigned, 2);
    assert_eq!(store.list_assignments().await.unwrap().len(), 2);
}

#[tokio::test]
async fn no_eligible_broker_leaves_leads_unassigned() {
    let store = Arc::new(test_lead_store().await);
    let only = add_broker(&store, "ana").await;
    store
        .update_broker_flags(
            only.id,
            &BrokerFlags {
                accepts_leads: Some(false),
                ..BrokerFlags::default()
            },
        )
        .await
        .unwrap();
    let leads = add_leads(&store, 2).await;
    let distributor = LeadDistributor::new(store.clone());

    let report = distributor.distribute(&leads).await.unwrap();
    assert!(report.assigned.is_empty());
    assert_eq!(report.unassigned, vec![leads[0].id, leads[1].id]);
    assert_eq!(store.load_rotation_state().await.unwrap().cursor, 0);

    let logs = store.list_integration_logs(10).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.status == "warning"));

    // Opt back in and retry the leftovers.
    store
        .update_broker_flags(
            only.id,
            &BrokerFlags {
                accepts_leads: Some(true),
                ..BrokerFlags::default()
            },
        )
        .await
        .unwrap();
    let retry = distributor.distribute_pending().await.unwrap();
    assert_eq!(retry.assigned.len(), 2);
    assert!(store.list_unassigned_leads().await.unwrap().is_empty());
}

#[tokio::test]
async fn manual_order_skips_inactive_broker() {
    let store = Arc::new(test_lead_store().await);
    let x = add_broker(&store, "xavier").await;
    let y = add_broker(&store, "yara").await;
    let z = add_broker(&store, "zeca").await;
    store
        .update_broker_flags(
            y.id,
            &BrokerFlags {
                active: Some(false),
                ..BrokerFlags::default()
            },
        )
        .await
        .unwrap();

    let distributor = LeadDistributor::new(store.clone());
    distributor
        .update_rotation_config(&RotationConfig {
            policy: RotationPolicy::Manual,
            broker_order: Some(vec![x.id, y.id, z.id]),
            skip_inactive: true,
        })
        .await
        .unwrap();

    let leads = add_leads(&store, 2).await;
    let report = distributor.distribute(&leads).await.unwrap();
    assert_eq!(report.assigned, vec![(leads[0].id, x.id), (leads[1].id, z.id)]);
    assert_eq!(store.load_rotation_state().await.unwrap().cursor, 0);

    let assignments = store.list_assignments().await.unwrap();
    assert_eq!(assignments[1].assignment_order, Some(2));
}

#[tokio::test]
async fn manual_with_empty_order_behaves_like_round_robin() {
    let store = Arc::new(test_lead_store().await);
    let a = add_broker(&store, "ana").await;
    let b = add_broker(&store, "bia").await;
    let distributor = LeadDistributor::new(store.clone());
    distributor
        .update_rotation_config(&RotationConfig {
            policy: RotationPolicy::Manual,
            broker_order: None,
            skip_inactive: true,
        })
        .await
        .unwrap();

    let leads = add_leads(&store, 3).await;
    let report = distributor.distribute(&leads).await.unwrap();
    let brokers: Vec<i64> = report.assigned.iter().map(|(_, broker)| *broker).collect();
    assert_eq!(brokers, vec![a.id, b.id, a.id]);
}

#[tokio::test]
async fn config_update_resets_cursor_and_keeps_order_when_absent() {
    let store = Arc::new(test_lead_store().await);
    add_broker(&store, "ana").await;
    add_broker(&store, "bia").await;
    let distributor = LeadDistributor::new(store.clone());

    distributor
        .update_rotation_config(&RotationConfig {
            policy: RotationPolicy::Manual,
            broker_order: Some(vec![2, 1]),
            skip_inactive: true,
        })
        .await
        .unwrap();
    let leads = add_leads(&store, 1).await;
    distributor.distribute(&leads).await.unwrap();
    assert_eq!(store.load_rotation_state().await.unwrap().cursor, 1);

    let state = distributor
        .update_rotation_config(&RotationConfig {
            policy: RotationPolicy::RoundRobin,
            broker_order: None,
            skip_inactive: false,
        })
        .await
        .unwrap();
    assert_eq!(state.cursor, 0);
    assert_eq!(state.broker_order, vec![2, 1]);
    assert!(!state.skip_inactive);
    assert_eq!(store.load_rotation_state().await.unwrap(), state);
}

#[tokio::test]
async fn failed_assignment_keeps_cursor_and_batch_continues() {
    let store = Arc::new(test_lead_store().await);
    let a = add_broker(&store, "ana").await;
    add_broker(&store, "bia").await;
    let leads = add_leads(&store, 2).await;
    {
        let db = store.get_db();
        let db = db.lock().await;
        db.execute_batch(&format!(
            "CREATE TRIGGER reject_first BEFORE INSERT ON lead_assignments
             WHEN NEW.lead_id = {}
             BEGIN SELECT RAISE(ABORT, 'write rejected'); END;",
            leads[0].id
        ))
        .unwrap();
    }

    let distributor = LeadDistributor::new(store.clone());
    let report = distributor.distribute(&leads).await.unwrap();

    assert_eq!(report.unassigned, vec![leads[0].id]);
    // The failed write did not consume broker A's turn.
    assert_eq!(report.assigned, vec![(leads[1].id, a.id)]);
    assert!(store.get_lead(leads[0].id).await.unwrap().unwrap().broker_id.is_none());
    assert_eq!(store.load_rotation_state().await.unwrap().cursor, 1);

    let logs = store.list_integration_logs(10).await.unwrap();
    assert!(logs.iter().any(|l| l.status == "error"));
}

#[tokio::test]
async fn concurrent_batches_never_share_a_slot() {
    let store = Arc::new(test_lead_store().await);
    for name in ["ana", "bia", "caio", "duda"] {
        add_broker(&store, name).await;
    }
    let leads = add_leads(&store, 8).await;
    let distributor = Arc::new(LeadDistributor::new(store.clone()));

    let first = {
        let d = distributor.clone();
        let batch = leads[..4].to_vec();
        tokio::spawn(async move { d.distribute(&batch).await.unwrap() })
    };
    let second = {
        let d = distributor.clone();
        let batch = leads[4..].to_vec();
        tokio::spawn(async move { d.distribute(&batch).await.unwrap() })
    };
    first.await.unwrap();
    second.await.unwrap();

    let mut per_broker = std::collections::HashMap::new();
    for assignment in store.list_assignments().await.unwrap() {
        *per_broker.entry(assignment.broker_id).or_insert(0) += 1;
    }
    assert_eq!(per_broker.len(), 4);
    assert!(per_broker.values().all(|count| *count == 2));
}

#[tokio::test]
async fn inactive_brokers_are_skipped_even_with_skip_inactive_off() {
    let store = Arc::new(test_lead_store().await);
    let a = add_broker(&store, "ana").await;
    let b = add_broker(&store, "bia").await;
    store
        .update_broker_flags(
            b.id,
            &BrokerFlags {
                active: Some(false),
                ..BrokerFlags::default()
            },
        )
        .await
        .unwrap();

    let distributor = LeadDistributor::new(store.clone());
    let state = distributor
        .update_rotation_config(&RotationConfig {
            policy: RotationPolicy::Manual,
            broker_order: Some(vec![a.id, b.id]),
            skip_inactive: false,
        })
        .await
        .unwrap();
    assert!(!state.skip_inactive);

    let leads = add_leads(&store, 2).await;
    let report = distributor.distribute(&leads).await.unwrap();
    assert_eq!(report.assigned, vec![(leads[0].id, a.id), (leads[1].id, a.id)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn distributors_on_separate_connections_never_share_a_slot() {
    let dir = std::env::temp_dir().join(format!("leadflow-shared-{}", uuid::Uuid::new_v4()));
    let first = Arc::new(LeadStore::new(&dir).await.unwrap());
    let second = Arc::new(LeadStore::new(&dir).await.unwrap());
    let a = add_broker(&first, "ana").await;
    let b = add_broker(&first, "bia").await;
    let leads = add_leads(&first, 12).await;

    let left = LeadDistributor::new(first.clone());
    let right = LeadDistributor::new(second.clone());
    let (left_report, right_report) =
        tokio::join!(left.distribute(&leads[..6]), right.distribute(&leads[6..]));
    let left_report = left_report.unwrap();
    let right_report = right_report.unwrap();
    assert_eq!(left_report.assigned.len() + right_report.assigned.len(), 12);

    let mut per_broker = std::collections::HashMap::new();
    for assignment in first.list_assignments().await.unwrap() {
        *per_broker.entry(assignment.broker_id).or_insert(0) += 1;
    }
    assert_eq!(per_broker.get(&a.id), Some(&6));
    assert_eq!(per_broker.get(&b.id), Some(&6));
    assert_eq!(second.load_rotation_state().await.unwrap().cursor, 0);
}
