//! One candidate and the ballots cast for them.

use serde::{Deserialize, Serialize};
use std::fmt;

use moot_types::{ActorId, SeatId};

/// A vote total in half-vote units, so the office-holder's 1.5x ballot stays
/// exact integer arithmetic: one elector = 2 units, the weighted bonus = 1.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct VoteCount(u32);

impl VoteCount {
    pub const ZERO: Self = Self(0);

    pub fn from_halves(halves: u32) -> Self {
        Self(halves)
    }

    /// `electors` whole votes plus an optional half-vote bonus.
    pub fn from_electors(electors: u32, bonus: bool) -> Self {
        Self(electors * 2 + u32::from(bonus))
    }

    pub fn halves(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for VoteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 2 == 0 {
            write!(f, "{}", self.0 / 2)
        } else {
            write!(f, "{}.5", self.0 / 2)
        }
    }
}

/// One seat entered into a poll, carrying the ballots cast for it.
///
/// Electors stay listed even if they later die or quit the game; staleness is
/// tolerated until the next tally reads the list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// The seat standing in this poll.
    pub seat: SeatId,
    /// Quit candidates stay visible but tally zero.
    pub quit: bool,
    /// Set on the tied seats when a PK re-vote starts.
    pub pk: bool,
    /// Voter identities backing this candidate, in cast order, each unique.
    pub electors: Vec<ActorId>,
}

impl Candidate {
    pub fn new(seat: SeatId) -> Self {
        Self {
            seat,
            quit: false,
            pk: false,
            electors: Vec::new(),
        }
    }

    /// Tally this candidate's votes.
    ///
    /// Rules:
    /// - a quit candidate always counts zero, ballots or not;
    /// - each elector is one whole vote;
    /// - if `weighted` names an elector on this list, their ballot counts 1.5.
    pub fn votes(&self, weighted: Option<ActorId>) -> VoteCount {
        if self.quit {
            return VoteCount::ZERO;
        }
        let bonus = weighted.is_some_and(|w| self.has_elector(w));
        VoteCount::from_electors(self.electors.len() as u32, bonus)
    }

    pub fn has_elector(&self, voter: ActorId) -> bool {
        self.electors.contains(&voter)
    }

    /// Append a ballot. No-op if the voter already backs this candidate.
    pub fn add_elector(&mut self, voter: ActorId) {
        if !self.has_elector(voter) {
            self.electors.push(voter);
        }
    }

    /// Remove a ballot; returns whether one was present.
    pub fn remove_elector(&mut self, voter: ActorId) -> bool {
        let before = self.electors.len();
        self.electors.retain(|e| *e != voter);
        self.electors.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(n: u32) -> SeatId {
        SeatId::new(n)
    }

    fn actor(n: u64) -> ActorId {
        ActorId::new(n)
    }

    #[test]
    fn empty_candidate_tallies_zero() {
        let c = Candidate::new(seat(1));
        assert_eq!(c.votes(None), VoteCount::ZERO);
    }

    #[test]
    fn each_elector_is_one_whole_vote() {
        let mut c = Candidate::new(seat(1));
        c.add_elector(actor(10));
        c.add_elector(actor(11));
        assert_eq!(c.votes(None), VoteCount::from_halves(4));
        assert_eq!(c.votes(None).to_string(), "2");
    }

    #[test]
    fn weighted_elector_adds_half_vote() {
        let mut c = Candidate::new(seat(1));
        c.add_elector(actor(10));
        c.add_elector(actor(11));
        assert_eq!(c.votes(Some(actor(11))), VoteCount::from_halves(5));
        assert_eq!(c.votes(Some(actor(11))).to_string(), "2.5");
    }

    #[test]
    fn weighted_non_elector_adds_nothing() {
        let mut c = Candidate::new(seat(1));
        c.add_elector(actor(10));
        assert_eq!(c.votes(Some(actor(99))), VoteCount::from_halves(2));
    }

    #[test]
    fn quit_candidate_tallies_zero_even_with_ballots() {
        let mut c = Candidate::new(seat(1));
        c.add_elector(actor(10));
        c.add_elector(actor(11));
        c.quit = true;
        assert_eq!(c.votes(Some(actor(10))), VoteCount::ZERO);
    }

    #[test]
    fn duplicate_elector_not_added_twice() {
        let mut c = Candidate::new(seat(1));
        c.add_elector(actor(10));
        c.add_elector(actor(10));
        assert_eq!(c.electors.len(), 1);
    }

    #[test]
    fn remove_elector_reports_presence() {
        let mut c = Candidate::new(seat(1));
        c.add_elector(actor(10));
        assert!(c.remove_elector(actor(10)));
        assert!(!c.remove_elector(actor(10)));
        assert!(c.electors.is_empty());
    }
}
