//! Candidate and ballot model for moot polls.
//!
//! A [`BallotBox`] holds the candidates of one poll instance and enforces the
//! one-ballot-per-voter rule through its toggle semantics: voting a second
//! time moves the ballot, voting for your existing choice retracts it.
//! Tallies are fixed-point ([`VoteCount`], half-vote units) so the
//! office-holder's 1.5x ballot compares exactly.

pub mod ballot_box;
pub mod candidate;
pub mod error;

pub use ballot_box::{BallotBox, BallotReceipt};
pub use candidate::{Candidate, VoteCount};
pub use error::TallyError;
