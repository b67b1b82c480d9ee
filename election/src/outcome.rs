//! Tally outcomes shared by the election and expulsion machines.

use moot_types::{AbandonReason, SeatId};

/// What closing a ballot window decided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// A clear winner. For elections this seat takes office; for expulsions
    /// this seat leaves play.
    Decided(SeatId),
    /// The poll is over with no winner; the session should tear down.
    Abandoned(AbandonReason),
    /// First tie: a PK re-vote over exactly these seats, after a speech
    /// round. The machine has already cleared and restricted the ballots.
    TieRunoff(Vec<SeatId>),
}
