use super::types::Selection;
use crate::core::store::BrokerRecord;

/// Pick `eligible[cursor mod n]`. `eligible` must already be filtered and
/// sorted by ascending id.
pub fn select_round_robin(eligible: &[BrokerRecord], cursor: usize) -> Option<Selection> {
    if eligible.is_empty() {
        return None;
    }
    let index = cursor % eligible.len();
    Some(Selection {
        broker: eligible[index].clone(),
        position: index,
        next_cursor: (index + 1) % eligible.len(),
    })
}

/// Walk `order` from `cursor mod len`, wrapping at most once, and take the
/// first id that belongs to an eligible broker. Ids of unknown, inactive or
/// opted-out brokers are passed over.
pub fn select_manual(
    order: &[i64],
    cursor: usize,
    eligible: &[BrokerRecord],
) -> Option<Selection> {
    let len = order.len();
    if len == 0 {
        return None;
    }
    let start = cursor % len;
    (0..len).find_map(|step| {
        let position = (start + step) % len;
        let broker_id = order[position];
        eligible
            .iter()
            .find(|b| b.id == broker_id && b.is_eligible())
            .map(|broker| Selection {
                broker: broker.clone(),
                position,
                next_cursor: (position + 1) % len,
            })
    })
}
