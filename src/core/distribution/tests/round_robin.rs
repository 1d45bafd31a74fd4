use super::broker;
use crate::core::distribution::select_round_robin;

#[test]
fn empty_eligible_set_selects_nothing() {
    assert!(select_round_robin(&[], 0).is_none());
    assert!(select_round_robin(&[], 7).is_none());
}

#[test]
fn cursor_walks_the_list_and_wraps() {
    let eligible = vec![broker(1, true, true), broker(2, true, true), broker(3, true, true)];
    let mut cursor = 0;
    let mut picked = Vec::new();
    for _ in 0..4 {
        let selection = select_round_robin(&eligible, cursor).unwrap();
        picked.push(selection.broker.id);
        cursor = selection.next_cursor;
    }
    assert_eq!(picked, vec![1, 2, 3, 1]);
    assert_eq!(cursor, 1);
}

#[test]
fn stale_cursor_is_reduced_modulo_the_list() {
    let eligible = vec![broker(4, true, true), broker(9, true, true)];
    let selection = select_round_robin(&eligible, 5).unwrap();
    assert_eq!(selection.broker.id, 9);
    assert_eq!(selection.position, 1);
    assert_eq!(selection.next_cursor, 0);
}

#[test]
fn every_broker_is_visited_once_per_cycle() {
    for n in 1..=6usize {
        let eligible: Vec<_> = (1..=n as i64).map(|id| broker(id, true, true)).collect();
        let mut cursor = 0;
        let mut seen = Vec::new();
        for _ in 0..n {
            let selection = select_round_robin(&eligible, cursor).unwrap();
            seen.push(selection.broker.id);
            cursor = selection.next_cursor;
        }
        seen.sort();
        assert_eq!(seen, (1..=n as i64).collect::<Vec<_>>());
        assert_eq!(cursor, 0, "cursor returns to start after {n} picks");
    }
}
