mod engine;
mod round_robin;

use crate::core::store::{BrokerRecord, LeadRecord, LeadStore, NewBroker, NewLead};

pub(super) fn broker(id: i64, active: bool, accepts_leads: bool) -> BrokerRecord {
    BrokerRecord {
        id,
        username: format!("broker{id}"),
        email: format!("broker{id}@example.com"),
        active,
        accepts_leads,
        can_access_reports: false,
        created_at: "2024-01-01 00:00:00".to_string(),
    }
}

pub(super) async fn add_broker(store: &LeadStore, username: &str) -> BrokerRecord {
    store
        .create_broker(&NewBroker {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            accepts_leads: true,
            can_access_reports: false,
        })
        .await
        .unwrap()
}

pub(super) async fn add_leads(store: &LeadStore, count: usize) -> Vec<LeadRecord> {
    let mut leads = Vec::new();
    for i in 0..count {
        let lead = store
            .insert_lead(&NewLead {
                external_id: Some(format!("ext-{i}")),
                name: format!("Lead {i}"),
                ..NewLead::default()
            })
            .await
            .unwrap()
            .unwrap();
        leads.push(lead);
    }
    leads
}
