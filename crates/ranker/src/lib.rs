//! # Pulse Ranker
//!
//! Orders scored games for presentation. Works on the output of any strategy.

use core_types::ScoreRecord;
use std::cmp::Ordering;

/// Sorts `ScoreRecord`s by popularity, highest first.
///
/// Equal scores are ordered by ascending game id, so the output order depends
/// only on the records themselves and never on the order they arrived in.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ranker;

impl Ranker {
    pub fn new() -> Self {
        Self
    }

    /// Returns a ranked copy of `records`; the input is left untouched.
    pub fn rank(&self, records: &[ScoreRecord]) -> Vec<ScoreRecord> {
        let mut ranked = records.to_vec();
        ranked.sort_by(compare);
        tracing::debug!(count = ranked.len(), "Ranked score records");
        ranked
    }

    /// Ranks an owned batch in place and returns it.
    pub fn rank_owned(&self, mut records: Vec<ScoreRecord>) -> Vec<ScoreRecord> {
        records.sort_by(compare);
        records
    }
}

/// Descending score, then ascending id.
pub fn compare(a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
    b.popularity_score
        .cmp(&a.popularity_score)
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use core_types::{Game, GameId, StrategyId};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(id: i64, score: Decimal) -> ScoreRecord {
        let game = Game {
            id: GameId(id),
            name: format!("game-{id}"),
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        ScoreRecord::for_game(&game, StrategyId::FleetNormalized, score)
    }

    fn ids(records: &[ScoreRecord]) -> Vec<i64> {
        records.iter().map(|r| r.id.0).collect()
    }

    #[test]
    fn sorts_descending_by_score() {
        let input = vec![record(1, dec!(48.00)), record(2, dec!(100.00)), record(3, dec!(0))];
        assert_eq!(ids(&Ranker::new().rank(&input)), vec![2, 1, 3]);
        // Input is not reordered.
        assert_eq!(ids(&input), vec![1, 2, 3]);
    }

    #[test]
    fn ties_break_by_ascending_id() {
        let input = vec![
            record(9, dec!(10.5)),
            record(4, dec!(10.50)),
            record(7, dec!(20)),
            record(1, dec!(10.5)),
        ];
        assert_eq!(ids(&Ranker::new().rank(&input)), vec![7, 1, 4, 9]);
        assert_eq!(ids(&Ranker::new().rank_owned(input)), vec![7, 1, 4, 9]);
    }

    #[test]
    fn empty_input_ranks_to_empty() {
        assert!(Ranker::new().rank(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn ranking_is_sorted_and_order_independent(
            scores in prop::collection::vec(0u32..50, 0..40),
            rotate in 0usize..40,
        ) {
            let records: Vec<ScoreRecord> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| record(i as i64, Decimal::from(*s)))
                .collect();
            let ranked = Ranker::new().rank(&records);

            for pair in ranked.windows(2) {
                prop_assert!(pair[0].popularity_score >= pair[1].popularity_score);
                if pair[0].popularity_score == pair[1].popularity_score {
                    prop_assert!(pair[0].id < pair[1].id);
                }
            }

            let mut shuffled = records.clone();
            if !shuffled.is_empty() {
                let k = rotate % shuffled.len();
                shuffled.rotate_left(k);
                shuffled.reverse();
            }
            prop_assert_eq!(ids(&Ranker::new().rank(&shuffled)), ids(&ranked));
        }
    }
}
