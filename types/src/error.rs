//! User-visible rejection reasons shared across crates.

use thiserror::Error;

use crate::id::SeatId;
use crate::poll::{PollKind, Stage};

/// Why an actor's request was rejected without touching any state.
///
/// Every variant maps to a reply the platform adapter shows the actor; none
/// of them indicate an engine fault.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("you are not a player in this game")]
    NotAPlayer,

    #[error("dead players cannot take part in this")]
    NotAlive,

    #[error("you are not eligible to vote in this poll")]
    NotEligible,

    #[error("no {0} poll is running in this guild")]
    PollNotActive(PollKind),

    #[error("that cannot be done during the {0} stage")]
    WrongStage(Stage),

    #[error("this poll has already been decided")]
    AlreadyDecided,

    #[error("another procedure is already running in this guild")]
    GuildBusy,

    #[error("no speech queue is running in this guild")]
    NoActiveQueue,

    #[error("nobody is speaking right now")]
    NoActiveTurn,

    #[error("only the current speaker may skip")]
    NotCurrentSpeaker,

    #[error("speakers cannot vote to interrupt their own turn; use skip")]
    SpeakerSelfInterrupt,

    #[error("the countdown is already paused")]
    AlreadyPaused,

    #[error("the countdown is not paused")]
    NotPaused,

    #[error("seat {0} is not a candidate in this poll")]
    UnknownCandidate(SeatId),

    #[error("you are not a candidate in this poll")]
    NotACandidate,

    #[error("this session reference is stale")]
    StaleSession,

    #[error("only the office-holder may do this")]
    NotOfficeHolder,

    #[error("no office transfer is pending in this guild")]
    NoPendingTransfer,
}
