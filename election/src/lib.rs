//! Phase state machines for moot's ballot-driven procedures.
//!
//! The machines here are pure: they hold candidates and stage state, decide
//! transitions, and return outcomes. Deadlines, prompts, cues, and roster
//! mutation belong to the drivers in `moot-engine`, which call into these
//! machines when a window closes or an actor acts.

pub mod election;
pub mod error;
pub mod expulsion;
pub mod office;
pub mod outcome;

pub use election::{
    ElectionMachine, EnrollmentMove, EnrollmentOutcome, SpeechAftermath, WithdrawalOutcome,
};
pub use error::ElectionError;
pub use expulsion::{ExpulsionMachine, ExpulsionStage};
pub use office::OfficeTransfer;
pub use outcome::PollOutcome;
