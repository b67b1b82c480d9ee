//! Tally-level errors.

use thiserror::Error;

use moot_types::SeatId;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TallyError {
    /// The targeted seat is not (or no longer) a candidate in this poll.
    #[error("seat {0} is not a candidate in this poll")]
    UnknownCandidate(SeatId),
}
