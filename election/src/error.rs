//! Internal sequencing errors for the phase machines.

use thiserror::Error;

use moot_types::Stage;

/// A driver asked a machine to close a window it is not in.
///
/// With the engine's epoch-guarded timers this cannot fire from a stale
/// deadline; seeing one logged means a driver bug, not user input.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ElectionError {
    #[error("expected the {expected} stage but the poll is in {actual}")]
    UnexpectedStage { expected: Stage, actual: Stage },
}
