//! The election state machine: enrollment → speech → withdrawal → voting,
//! with one PK re-vote on a tie.

use serde::{Deserialize, Serialize};

use moot_tally::{BallotBox, BallotReceipt, TallyError};
use moot_types::{AbandonReason, ActorId, SeatId, Stage, ValidationError};

use crate::error::ElectionError;
use crate::outcome::PollOutcome;

/// What an enrollment toggle did, by stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnrollmentMove {
    /// The seat entered the race.
    Entered,
    /// The seat left during enrollment; its entry is gone.
    Withdrew,
    /// The seat quit during withdrawal; it stays visible but tallies zero.
    Quit,
}

/// How the enrollment window closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    /// Nobody entered; the election is over.
    Nobody,
    /// A single candidate wins unopposed, skipping speech and voting.
    Unopposed(SeatId),
    /// Two or more candidates; the machine moved to the speech stage and
    /// these seats hold campaign speeches.
    Contested(Vec<SeatId>),
}

/// Where the machine went after a speech round completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeechAftermath {
    /// Campaign speeches done: open the withdrawal window.
    OpenWithdrawal,
    /// PK speeches done: open the ballot directly over these seats.
    OpenBallot(Vec<SeatId>),
}

/// How the withdrawal window closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WithdrawalOutcome {
    /// Everyone quit; the election is over.
    AllQuit,
    /// Open the ballot with one control per listed (non-quit) seat.
    OpenBallot(Vec<SeatId>),
}

/// One guild's election, from enrollment to a winner or abandonment.
///
/// The machine is pure: the driver opens windows on timers and calls the
/// `close_*` methods when they elapse. Creating the machine is the
/// `NONE → ENROLLMENT` transition, so a fresh machine already accepts
/// enrollment toggles over an empty candidate box.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElectionMachine {
    stage: Stage,
    ballots: BallotBox,
    pk_round: bool,
}

impl ElectionMachine {
    pub fn new() -> Self {
        Self {
            stage: Stage::Enrollment,
            ballots: BallotBox::new(),
            pk_round: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn ballots(&self) -> &BallotBox {
        &self.ballots
    }

    /// Whether the poll is in its single PK retry.
    pub fn is_pk_round(&self) -> bool {
        self.pk_round
    }

    fn expect_stage(&self, expected: Stage) -> Result<(), ElectionError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(ElectionError::UnexpectedStage {
                expected,
                actual: self.stage,
            })
        }
    }

    /// Toggle a seat's candidacy.
    ///
    /// Stage rules:
    /// - enrollment: in ⇄ out, removing the entry entirely on the way out;
    /// - withdrawal: an existing candidate marks themselves quit (idempotent);
    /// - speech and voting: rejected, the race is frozen.
    pub fn enroll_toggle(&mut self, seat: SeatId) -> Result<EnrollmentMove, ValidationError> {
        match self.stage {
            Stage::Enrollment => {
                if self.ballots.withdraw(seat) {
                    Ok(EnrollmentMove::Withdrew)
                } else {
                    self.ballots.enroll(seat);
                    Ok(EnrollmentMove::Entered)
                }
            }
            Stage::Withdrawal => {
                if self.ballots.mark_quit(seat) {
                    Ok(EnrollmentMove::Quit)
                } else {
                    Err(ValidationError::NotACandidate)
                }
            }
            stage => Err(ValidationError::WrongStage(stage)),
        }
    }

    /// Close the enrollment window.
    pub fn close_enrollment(&mut self) -> Result<EnrollmentOutcome, ElectionError> {
        self.expect_stage(Stage::Enrollment)?;

        let seats = self.ballots.seats();
        let outcome = match seats.len() {
            0 => EnrollmentOutcome::Nobody,
            1 => EnrollmentOutcome::Unopposed(seats[0]),
            _ => {
                self.stage = Stage::Speech;
                EnrollmentOutcome::Contested(seats)
            }
        };
        Ok(outcome)
    }

    /// A speech round over the candidates has completed.
    pub fn speech_finished(&mut self) -> Result<SpeechAftermath, ElectionError> {
        self.expect_stage(Stage::Speech)?;

        if self.pk_round {
            // PK path: straight back to the ballot, no second withdrawal.
            self.stage = Stage::Voting;
            Ok(SpeechAftermath::OpenBallot(self.ballots.contenders()))
        } else {
            self.stage = Stage::Withdrawal;
            Ok(SpeechAftermath::OpenWithdrawal)
        }
    }

    /// Close the withdrawal window.
    pub fn close_withdrawal(&mut self) -> Result<WithdrawalOutcome, ElectionError> {
        self.expect_stage(Stage::Withdrawal)?;

        if self.ballots.all_quit() {
            return Ok(WithdrawalOutcome::AllQuit);
        }
        self.stage = Stage::Voting;
        Ok(WithdrawalOutcome::OpenBallot(self.ballots.contenders()))
    }

    /// Toggle a ballot during the voting window.
    ///
    /// `voter_seat` is the living seat bound to the acting identity. Anyone
    /// who ever enrolled in this election — including candidates who quit —
    /// is barred from voting in it.
    pub fn toggle_vote(
        &mut self,
        voter: ActorId,
        voter_seat: SeatId,
        target: SeatId,
    ) -> Result<BallotReceipt, ValidationError> {
        if self.stage != Stage::Voting {
            return Err(ValidationError::WrongStage(self.stage));
        }
        if self.ballots.has_candidate(voter_seat) {
            return Err(ValidationError::NotEligible);
        }
        if self.ballots.candidate(target).is_some_and(|c| c.quit) {
            return Err(ValidationError::UnknownCandidate(target));
        }
        self.ballots.toggle_vote(voter, target).map_err(|e| match e {
            TallyError::UnknownCandidate(seat) => ValidationError::UnknownCandidate(seat),
        })
    }

    /// Close the ballot window and tally.
    ///
    /// A first tie flips the machine into its PK round: tied ballots are
    /// cleared, the box is restricted to the tied seats, and the stage
    /// returns to speech. A tie during the PK round abandons the election.
    pub fn close_voting(&mut self, weighted: Option<ActorId>) -> Result<PollOutcome, ElectionError> {
        self.expect_stage(Stage::Voting)?;

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
                self.stage = Stage::Speech;
                PollOutcome::TieRunoff(winners)
            }
        };
        Ok(outcome)
    }
}

impl Default for ElectionMachine {
    fn default() -> Self {
        Self::new()
    }
}
