//! Interrupt voting against the current speaker.

use serde::{Deserialize, Serialize};

use moot_types::SeatId;

/// What a toggle did with the seat's interrupt vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterruptVote {
    Cast,
    Retracted,
}

/// The per-turn interrupt ballot.
///
/// Voters are seats (living players), recorded in cast order so a passed vote
/// can name them publicly. The ballot is cleared on every advance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptBallot {
    voters: Vec<SeatId>,
}

impl InterruptBallot {
    pub fn new() -> Self {
        Self { voters: Vec::new() }
    }

    /// Cast or retract this seat's interrupt vote.
    pub fn toggle(&mut self, seat: SeatId) -> InterruptVote {
        if let Some(pos) = self.voters.iter().position(|v| *v == seat) {
            self.voters.remove(pos);
            InterruptVote::Retracted
        } else {
            self.voters.push(seat);
            InterruptVote::Cast
        }
    }

    pub fn votes(&self) -> usize {
        self.voters.len()
    }

    /// Voters in cast order, for the public announcement.
    pub fn voters(&self) -> &[SeatId] {
        &self.voters
    }

    /// Whether the vote passes: strictly more than half the living players.
    pub fn passed(&self, living: usize) -> bool {
        self.voters.len() > living / 2
    }

    /// How many more votes are needed to pass, given the living count.
    pub fn needed(&self, living: usize) -> usize {
        (living / 2 + 1).saturating_sub(self.voters.len())
    }

    pub fn clear(&mut self) {
        self.voters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(n: u32) -> SeatId {
        SeatId::new(n)
    }

    #[test]
    fn passes_at_strict_majority_of_seven() {
        let mut ballot = InterruptBallot::new();
        for n in 1..=3 {
            ballot.toggle(seat(n));
        }
        assert!(!ballot.passed(7));
        assert_eq!(ballot.needed(7), 1);

        ballot.toggle(seat(4));
        assert!(ballot.passed(7));
        assert_eq!(ballot.needed(7), 0);
    }

    #[test]
    fn even_table_still_needs_strict_majority() {
        let mut ballot = InterruptBallot::new();
        for n in 1..=3 {
            ballot.toggle(seat(n));
        }
        // 3 of 6 is exactly half, not strictly more.
        assert!(!ballot.passed(6));
        ballot.toggle(seat(4));
        assert!(ballot.passed(6));
    }

    #[test]
    fn toggle_retracts_and_keeps_cast_order() {
        let mut ballot = InterruptBallot::new();
        ballot.toggle(seat(5));
        ballot.toggle(seat(2));
        ballot.toggle(seat(8));
        assert_eq!(ballot.toggle(seat(2)), InterruptVote::Retracted);
        assert_eq!(ballot.voters(), &[seat(5), seat(8)]);
        assert_eq!(ballot.toggle(seat(2)), InterruptVote::Cast);
        assert_eq!(ballot.voters(), &[seat(5), seat(8), seat(2)]);
    }

    #[test]
    fn clear_resets_the_ballot() {
        let mut ballot = InterruptBallot::new();
        ballot.toggle(seat(1));
        ballot.clear();
        assert_eq!(ballot.votes(), 0);
        assert!(!ballot.passed(1));
    }
}
