//! Candidate arbitration shared by every field.
//!
//! Candidates are ordered by `(priority, value)`, both descending: the most
//! specific rule wins, and among equally specific rules the larger value
//! wins, since OCR drops digits more often than it invents them. For dates
//! the larger value is the more recent date.

use std::cmp::Ordering;

use super::FieldCandidate;

fn by_rank<T: Ord>(a: &FieldCandidate<T>, b: &FieldCandidate<T>) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| a.value.cmp(&b.value))
}

/// Pick the winning candidate, or `None` for an empty set.
pub fn select<T: Ord>(candidates: &[FieldCandidate<T>]) -> Option<&FieldCandidate<T>> {
    candidates.iter().max_by(|a, b| by_rank(a, b))
}

/// All candidates, winner first.
pub fn rank<T: Ord>(candidates: &[FieldCandidate<T>]) -> Vec<&FieldCandidate<T>> {
    let mut ranked: Vec<_> = candidates.iter().collect();
    // Stable sort keeps discovery order among full ties.
    ranked.sort_by(|a, b| by_rank(b, a));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bill::rules::Field;

    fn candidate(value: u32, priority: u8) -> FieldCandidate<u32> {
        FieldCandidate::new(Field::Units, value, priority, "test")
    }

    #[test]
    fn test_priority_wins_over_value() {
        let candidates = vec![candidate(900, 20), candidate(250, 90), candidate(300, 50)];
        assert_eq!(select(&candidates).unwrap().value, 250);
    }

    #[test]
    fn test_larger_value_breaks_tie() {
        let candidates = vec![candidate(180, 60), candidate(1800, 60)];
        assert_eq!(select(&candidates).unwrap().value, 1800);
    }

    #[test]
    fn test_empty_set() {
        let candidates: Vec<FieldCandidate<u32>> = Vec::new();
        assert!(select(&candidates).is_none());
        assert!(rank(&candidates).is_empty());
    }

    #[test]
    fn test_selection_is_idempotent_and_order_independent() {
        let mut candidates = vec![
            candidate(10, 30),
            candidate(250, 90),
            candidate(250, 90),
            candidate(400, 50),
        ];
        let first = select(&candidates).unwrap().value;
        assert_eq!(select(&candidates).unwrap().value, first);

        candidates.reverse();
        assert_eq!(select(&candidates).unwrap().value, first);
    }

    #[test]
    fn test_rank_orders_winner_first() {
        let candidates = vec![candidate(10, 30), candidate(250, 90), candidate(400, 50)];
        let values: Vec<u32> = rank(&candidates).iter().map(|c| c.value).collect();
        assert_eq!(values, vec![250, 400, 10]);
    }
}
