//! The expulsion poll: an enrollment-free ballot over every living seat.

use serde::{Deserialize, Serialize};

use moot_tally::{BallotBox, BallotReceipt, TallyError};
use moot_types::{AbandonReason, ActorId, SeatId, Stage, ValidationError};

use crate::error::ElectionError;
use crate::outcome::PollOutcome;

/// The two windows an expulsion poll moves between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpulsionStage {
    /// Ballot open.
    Voting,
    /// Tie-break speeches running; the ballot reopens afterwards.
    RunoffSpeech,
}

impl ExpulsionStage {
    /// The shared stage vocabulary used in status and error reporting.
    pub fn as_stage(&self) -> Stage {
        match self {
            ExpulsionStage::Voting => Stage::Voting,
            ExpulsionStage::RunoffSpeech => Stage::Speech,
        }
    }
}

/// One guild's expulsion poll.
///
/// Unlike an election, every living seat is a candidate from the start and
/// candidates vote like anyone else. The only voters ever barred are the tied
/// seats themselves during the PK re-vote.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpulsionMachine {
    stage: ExpulsionStage,
    ballots: BallotBox,
    pk_round: bool,
}

impl ExpulsionMachine {
    pub fn new(living: impl IntoIterator<Item = SeatId>) -> Self {
        Self {
            stage: ExpulsionStage::Voting,
            ballots: BallotBox::with_candidates(living),
            pk_round: false,
        }
    }

    pub fn stage(&self) -> ExpulsionStage {
        self.stage
    }

    pub fn ballots(&self) -> &BallotBox {
        &self.ballots
    }

    pub fn is_pk_round(&self) -> bool {
        self.pk_round
    }

    /// Toggle a ballot during the voting window.
    ///
    /// `voter_seat` is the living seat bound to the acting identity. During
    /// the PK round the tied candidates may not vote on their own runoff.
    pub fn toggle_vote(
        &mut self,
        voter: ActorId,
        voter_seat: SeatId,
        target: SeatId,
    ) -> Result<BallotReceipt, ValidationError> {
        if self.stage != ExpulsionStage::Voting {
            return Err(ValidationError::WrongStage(self.stage.as_stage()));
        }
        if self.pk_round
            && self
                .ballots
                .candidate(voter_seat)
                .is_some_and(|c| c.pk)
        {
            return Err(ValidationError::NotEligible);
        }
        self.ballots.toggle_vote(voter, target).map_err(|e| match e {
            TallyError::UnknownCandidate(seat) => ValidationError::UnknownCandidate(seat),
        })
    }

    /// Close the ballot window and tally.
    pub fn close_voting(&mut self, weighted: Option<ActorId>) -> Result<PollOutcome, ElectionError> {
        if self.stage != ExpulsionStage::Voting {
            return Err(ElectionError::UnexpectedStage {
                expected: Stage::Voting,
                actual: self.stage.as_stage(),
            });
        }

        let winners = self.ballots.winning_set(weighted);
        let outcome = match winners.len() {
            0 => PollOutcome::Abandoned(AbandonReason::NoBallots),
            1 => PollOutcome::Decided(winners[0]),
            _ if self.pk_round => PollOutcome::Abandoned(AbandonReason::TiedTwice),
            _ => {
                self.pk_round = true;
                self.ballots.clear_votes(&winners);
                self.ballots.mark_pk(&winners);
                self.ballots.restrict_to(&winners);
                self.stage = ExpulsionStage::RunoffSpeech;
                PollOutcome::TieRunoff(winners)
            }
        };
        Ok(outcome)
    }

    /// The PK speech round completed; reopen the ballot over the tied seats.
    pub fn speech_finished(&mut self) -> Result<Vec<SeatId>, ElectionError> {
        if self.stage != ExpulsionStage::RunoffSpeech {
            return Err(ElectionError::UnexpectedStage {
                expected: Stage::Speech,
                actual: self.stage.as_stage(),
            });
        }
        self.stage = ExpulsionStage::Voting;
        Ok(self.ballots.contenders())
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

    fn machine(living: &[u32]) -> ExpulsionMachine {
        ExpulsionMachine::new(living.iter().map(|&n| seat(n)))
    }

    #[test]
    fn every_living_seat_is_a_candidate() {
        let m = machine(&[1, 2, 3]);
        assert_eq!(m.ballots().seats(), vec![seat(1), seat(2), seat(3)]);
        assert_eq!(m.stage(), ExpulsionStage::Voting);
    }

    #[test]
    fn candidates_vote_like_anyone_else() {
        let mut m = machine(&[1, 2, 3]);
        // Seat 1 votes against seat 2 while being a candidate itself.
        m.toggle_vote(actor(10), seat(1), seat(2)).unwrap();
        m.toggle_vote(actor(20), seat(2), seat(2)).unwrap();
        m.toggle_vote(actor(30), seat(3), seat(2)).unwrap();

        assert_eq!(m.close_voting(None).unwrap(), PollOutcome::Decided(seat(2)));
    }

    #[test]
    fn no_ballots_means_no_expulsion() {
        let mut m = machine(&[1, 2]);
        assert_eq!(
            m.close_voting(None).unwrap(),
            PollOutcome::Abandoned(AbandonReason::NoBallots)
        );
    }

    #[test]
    fn tie_runs_a_restricted_runoff() {
        let mut m = machine(&[1, 2, 3, 4]);
        m.toggle_vote(actor(30), seat(3), seat(1)).unwrap();
        m.toggle_vote(actor(40), seat(4), seat(2)).unwrap();

        let outcome = m.close_voting(None).unwrap();
        assert_eq!(outcome, PollOutcome::TieRunoff(vec![seat(1), seat(2)]));
        assert_eq!(m.stage(), ExpulsionStage::RunoffSpeech);
        assert!(!m.ballots().has_candidate(seat(3)));
        assert_eq!(m.ballots().ballot_count(), 0);

        assert_eq!(m.speech_finished().unwrap(), vec![seat(1), seat(2)]);
        assert_eq!(m.stage(), ExpulsionStage::Voting);
    }

    #[test]
    fn pk_candidates_cannot_vote_in_the_runoff() {
        let mut m = machine(&[1, 2, 3, 4]);
        m.toggle_vote(actor(30), seat(3), seat(1)).unwrap();
        m.toggle_vote(actor(20), seat(2), seat(1)).unwrap();
        m.toggle_vote(actor(10), seat(1), seat(2)).unwrap();
        m.toggle_vote(actor(40), seat(4), seat(2)).unwrap();

        m.close_voting(None).unwrap();
        m.speech_finished().unwrap();

        // Tied seats 1 and 2 are barred; seat 3 still votes.
        assert_eq!(
            m.toggle_vote(actor(10), seat(1), seat(2)),
            Err(ValidationError::NotEligible)
        );
        m.toggle_vote(actor(30), seat(3), seat(2)).unwrap();
        assert_eq!(m.close_voting(None).unwrap(), PollOutcome::Decided(seat(2)));
    }

    #[test]
    fn second_tie_expels_nobody() {
        let mut m = machine(&[1, 2, 3, 4]);
        m.toggle_vote(actor(30), seat(3), seat(1)).unwrap();
        m.toggle_vote(actor(40), seat(4), seat(2)).unwrap();
        m.close_voting(None).unwrap();
        m.speech_finished().unwrap();

        m.toggle_vote(actor(30), seat(3), seat(1)).unwrap();
        m.toggle_vote(actor(40), seat(4), seat(2)).unwrap();
        assert_eq!(
            m.close_voting(None).unwrap(),
            PollOutcome::Abandoned(AbandonReason::TiedTwice)
        );
    }

    #[test]
    fn votes_rejected_while_runoff_speeches_run() {
        let mut m = machine(&[1, 2, 3]);
        m.toggle_vote(actor(30), seat(3), seat(1)).unwrap();
        m.toggle_vote(actor(20), seat(2), seat(2)).unwrap();
        m.close_voting(None).unwrap();

        assert_eq!(
            m.toggle_vote(actor(30), seat(3), seat(1)),
            Err(ValidationError::WrongStage(Stage::Speech))
        );
    }

    #[test]
    fn weighted_ballot_applies_when_the_driver_passes_it() {
        let mut m = machine(&[1, 2, 3]);
        m.toggle_vote(actor(10), seat(1), seat(2)).unwrap();
        m.toggle_vote(actor(20), seat(2), seat(1)).unwrap();

        // Without the bonus this is a tie; with it, seat 2 falls.
        assert_eq!(
            m.close_voting(Some(actor(10))).unwrap(),
            PollOutcome::Decided(seat(2))
        );
    }
}
