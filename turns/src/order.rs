//! The pivot-anchored speaking-order rule.

use serde::{Deserialize, Serialize};
use std::fmt;

use moot_types::SeatId;

/// Which way around the table the speaking order walks from the pivot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// Coin-flip draw, used when nobody gets to pick the order.
    pub fn random() -> Self {
        if rand::random::<bool>() {
            Direction::Ascending
        } else {
            Direction::Descending
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Ascending => "ascending",
            Direction::Descending => "descending",
        };
        write!(f, "{name}")
    }
}

/// Build the speaking order for a roster around a pivot seat.
///
/// Rules:
/// - seats are sorted numerically, then split into the half before the pivot
///   and the half after it;
/// - ascending: both halves reversed, before-half first;
/// - descending: after-half first, neither half reversed;
/// - the pivot always speaks last.
///
/// Reference: seats {1,2,3,4,5} with pivot 3 give [2,1,5,4,3] ascending and
/// [4,5,1,2,3] descending. Identical inputs always give identical output.
pub fn speaking_order(seats: &[SeatId], pivot: SeatId, direction: Direction) -> Vec<SeatId> {
    let mut sorted: Vec<SeatId> = seats.to_vec();
    sorted.sort();
    sorted.dedup();

    let pivot_present = sorted.contains(&pivot);
    let before: Vec<SeatId> = sorted.iter().copied().filter(|s| *s < pivot).collect();
    let after: Vec<SeatId> = sorted.iter().copied().filter(|s| *s > pivot).collect();

    let mut order = Vec::with_capacity(sorted.len());
    match direction {
        Direction::Ascending => {
            order.extend(before.iter().rev());
            order.extend(after.iter().rev());
        }
        Direction::Descending => {
            order.extend(after.iter());
            order.extend(before.iter());
        }
    }
    if pivot_present {
        order.push(pivot);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seats(ns: &[u32]) -> Vec<SeatId> {
        ns.iter().map(|&n| SeatId::new(n)).collect()
    }

    #[test]
    fn ascending_reference_order() {
        let order = speaking_order(&seats(&[1, 2, 3, 4, 5]), SeatId::new(3), Direction::Ascending);
        assert_eq!(order, seats(&[2, 1, 5, 4, 3]));
    }

    #[test]
    fn descending_reference_order() {
        let order = speaking_order(
            &seats(&[1, 2, 3, 4, 5]),
            SeatId::new(3),
            Direction::Descending,
        );
        assert_eq!(order, seats(&[4, 5, 1, 2, 3]));
    }

    #[test]
    fn unsorted_input_gives_same_order() {
        let shuffled = seats(&[5, 3, 1, 4, 2]);
        let order = speaking_order(&shuffled, SeatId::new(3), Direction::Ascending);
        assert_eq!(order, seats(&[2, 1, 5, 4, 3]));
    }

    #[test]
    fn lowest_pivot_has_empty_before_half() {
        let order = speaking_order(&seats(&[1, 2, 3]), SeatId::new(1), Direction::Ascending);
        assert_eq!(order, seats(&[3, 2, 1]));
        let order = speaking_order(&seats(&[1, 2, 3]), SeatId::new(1), Direction::Descending);
        assert_eq!(order, seats(&[2, 3, 1]));
    }

    #[test]
    fn highest_pivot_has_empty_after_half() {
        let order = speaking_order(&seats(&[1, 2, 3]), SeatId::new(3), Direction::Descending);
        assert_eq!(order, seats(&[1, 2, 3]));
    }

    #[test]
    fn singleton_roster_is_just_the_pivot() {
        let order = speaking_order(&seats(&[7]), SeatId::new(7), Direction::Ascending);
        assert_eq!(order, seats(&[7]));
    }

    #[test]
    fn absent_pivot_still_splits_the_table() {
        // Dead pivot seat: everyone else still gets ordered around the gap.
        let order = speaking_order(&seats(&[1, 2, 4, 5]), SeatId::new(3), Direction::Ascending);
        assert_eq!(order, seats(&[2, 1, 5, 4]));
    }
}
