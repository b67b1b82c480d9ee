//! Speaking order and turn-queue state for moot.
//!
//! Everything here is synchronous and deterministic; the async driver in
//! `moot-engine` owns the actual deadlines and cancellation. [`speaking_order`]
//! implements the table's pivot-anchored ordering rule, [`TurnQueue`] tracks
//! who holds the floor, and [`InterruptBallot`] counts the strict-majority
//! votes needed to take it away.

pub mod interrupt;
pub mod order;
pub mod queue;

pub use interrupt::{InterruptBallot, InterruptVote};
pub use order::{speaking_order, Direction};
pub use queue::TurnQueue;
