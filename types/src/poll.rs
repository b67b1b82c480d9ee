//! Poll vocabulary: stages, poll kinds, and abandon reasons.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Time-boxed phase of the election state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Candidates may enter (or leave again) the race.
    Enrollment,
    /// Campaign speech round; the candidate list is frozen.
    Speech,
    /// Candidates may mark themselves quit but stay visible until tally.
    Withdrawal,
    /// Ballot window; tallied automatically at close.
    Voting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Enrollment => "enrollment",
            Stage::Speech => "speech",
            Stage::Withdrawal => "withdrawal",
            Stage::Voting => "voting",
        };
        write!(f, "{name}")
    }
}

/// Which of the two ballot-driven procedures a vote belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollKind {
    Election,
    Expulsion,
}

impl fmt::Display for PollKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollKind::Election => "election",
            PollKind::Expulsion => "expulsion",
        };
        write!(f, "{name}")
    }
}

/// Why a poll ended without a winner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonReason {
    /// Enrollment closed with nobody in the race.
    NoCandidates,
    /// Every candidate quit during the withdrawal window.
    AllWithdrew,
    /// The ballot window closed without a single vote.
    NoBallots,
    /// Two consecutive tied tallies; the PK retry is spent.
    TiedTwice,
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AbandonReason::NoCandidates => "no candidates enrolled",
            AbandonReason::AllWithdrew => "all candidates withdrew",
            AbandonReason::NoBallots => "no ballots were cast",
            AbandonReason::TiedTwice => "tied twice with no winner",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_serializes_snake_case() {
        let json = serde_json::to_string(&Stage::Withdrawal).unwrap();
        assert_eq!(json, "\"withdrawal\"");
    }
}
