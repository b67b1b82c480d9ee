//! The ballot aggregate for one poll instance.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use moot_types::{ActorId, SeatId};

use crate::candidate::{Candidate, VoteCount};
use crate::error::TallyError;

/// What a toggle did with the voter's ballot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BallotReceipt {
    /// First ballot from this voter.
    Cast,
    /// The voter's existing ballot moved here from another candidate.
    Moved { from: SeatId },
    /// The voter re-picked their existing choice; the ballot was withdrawn
    /// and the voter now abstains.
    Retracted,
}

/// Candidates of one poll, keyed by seat.
///
/// The `BTreeMap` gives deterministic seat-order iteration, which makes tie
/// sets and status listings stable. One voter holds at most one ballot across
/// the whole box; [`BallotBox::toggle_vote`] is the only mutation path for
/// ballots and preserves that invariant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotBox {
    candidates: BTreeMap<SeatId, Candidate>,
}

impl BallotBox {
    pub fn new() -> Self {
        Self {
            candidates: BTreeMap::new(),
        }
    }

    /// A box pre-filled with one candidate per given seat (expulsion polls,
    /// PK re-votes).
    pub fn with_candidates(seats: impl IntoIterator<Item = SeatId>) -> Self {
        let candidates = seats
            .into_iter()
            .map(|seat| (seat, Candidate::new(seat)))
            .collect();
        Self { candidates }
    }

    /// Enter a seat into the race. Returns false if it already ran.
    pub fn enroll(&mut self, seat: SeatId) -> bool {
        if self.candidates.contains_key(&seat) {
            return false;
        }
        self.candidates.insert(seat, Candidate::new(seat));
        true
    }

    /// Remove a seat's entry entirely (enrollment-stage withdrawal).
    pub fn withdraw(&mut self, seat: SeatId) -> bool {
        self.candidates.remove(&seat).is_some()
    }

    /// Mark a seat quit but keep it visible (withdrawal-stage quit).
    pub fn mark_quit(&mut self, seat: SeatId) -> bool {
        match self.candidates.get_mut(&seat) {
            Some(c) => {
                c.quit = true;
                true
            }
            None => false,
        }
    }

    pub fn candidate(&self, seat: SeatId) -> Option<&Candidate> {
        self.candidates.get(&seat)
    }

    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.values()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Whether this seat ever entered (quit candidates still count).
    pub fn has_candidate(&self, seat: SeatId) -> bool {
        self.candidates.contains_key(&seat)
    }

    /// All candidate seats in seat order.
    pub fn seats(&self) -> Vec<SeatId> {
        self.candidates.keys().copied().collect()
    }

    /// Seats still in the running (not quit), in seat order.
    pub fn contenders(&self) -> Vec<SeatId> {
        self.candidates
            .values()
            .filter(|c| !c.quit)
            .map(|c| c.seat)
            .collect()
    }

    /// Seats flagged for the current PK re-vote.
    pub fn pk_seats(&self) -> Vec<SeatId> {
        self.candidates
            .values()
            .filter(|c| c.pk)
            .map(|c| c.seat)
            .collect()
    }

    /// True when the box is non-empty and every candidate has quit.
    pub fn all_quit(&self) -> bool {
        !self.candidates.is_empty() && self.candidates.values().all(|c| c.quit)
    }

    /// The seat this voter currently backs, if any.
    pub fn ballot_of(&self, voter: ActorId) -> Option<SeatId> {
        self.candidates
            .values()
            .find(|c| c.has_elector(voter))
            .map(|c| c.seat)
    }

    /// Number of distinct voters currently holding a ballot.
    pub fn ballot_count(&self) -> u32 {
        // One ballot per voter across the box, so summing lists is exact.
        self.candidates
            .values()
            .map(|c| c.electors.len() as u32)
            .sum()
    }

    /// Toggle `voter`'s ballot onto `target`.
    ///
    /// Rules:
    /// - an existing ballot for a different candidate moves here;
    /// - an existing ballot for this candidate is withdrawn (abstain);
    /// - otherwise the ballot is cast fresh.
    pub fn toggle_vote(
        &mut self,
        voter: ActorId,
        target: SeatId,
    ) -> Result<BallotReceipt, TallyError> {
        if !self.candidates.contains_key(&target) {
            return Err(TallyError::UnknownCandidate(target));
        }

        match self.ballot_of(voter) {
            Some(existing) if existing == target => {
                if let Some(c) = self.candidates.get_mut(&target) {
                    c.remove_elector(voter);
                }
                Ok(BallotReceipt::Retracted)
            }
            Some(existing) => {
                if let Some(c) = self.candidates.get_mut(&existing) {
                    c.remove_elector(voter);
                }
                if let Some(c) = self.candidates.get_mut(&target) {
                    c.add_elector(voter);
                }
                Ok(BallotReceipt::Moved { from: existing })
            }
            None => {
                if let Some(c) = self.candidates.get_mut(&target) {
                    c.add_elector(voter);
                }
                Ok(BallotReceipt::Cast)
            }
        }
    }

    /// Winner set for the current ballots: the seats sharing the highest
    /// positive tally, in seat order.
    ///
    /// Empty when nobody polled above zero; a singleton is a clear winner;
    /// two or more seats is a tie heading for a PK re-vote.
    pub fn winning_set(&self, weighted: Option<ActorId>) -> Vec<SeatId> {
        let mut top = VoteCount::ZERO;
        let mut winners = Vec::new();

        for candidate in self.candidates.values() {
            let votes = candidate.votes(weighted);
            if votes.is_zero() {
                continue;
            }
            if votes > top {
                top = votes;
                winners.clear();
                winners.push(candidate.seat);
            } else if votes == top {
                winners.push(candidate.seat);
            }
        }

        winners
    }

    /// Wipe the ballots of the given seats (PK reset).
    pub fn clear_votes(&mut self, seats: &[SeatId]) {
        for seat in seats {
            if let Some(c) = self.candidates.get_mut(seat) {
                c.electors.clear();
            }
        }
    }

    /// Flag the given seats as PK participants.
    pub fn mark_pk(&mut self, seats: &[SeatId]) {
        for seat in seats {
            if let Some(c) = self.candidates.get_mut(seat) {
                c.pk = true;
            }
        }
    }

    /// Drop every candidate not in the given set (PK restriction).
    pub fn restrict_to(&mut self, seats: &[SeatId]) {
        self.candidates.retain(|seat, _| seats.contains(seat));
    }
}
