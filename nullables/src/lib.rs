//! Nullable platform collaborators for deterministic testing.
//!
//! The engine reaches the chat platform only through its four collaborator
//! traits (roster, messenger, presence, cue player). This crate provides
//! recording implementations that:
//! - Keep all state in memory
//! - Log every call for assertions
//! - Can be switched into a failing mode programmatically
//! - Never touch a real chat platform
//!
//! Usage: bundle a [`NullPlatform`] and hand its [`Platform`] to the engine.

use std::sync::Arc;

use moot_engine::traits::Platform;

pub mod cues;
pub mod messenger;
pub mod presence;
pub mod roster;

pub use cues::NullCuePlayer;
pub use messenger::{NullMessenger, Posted};
pub use presence::NullPresence;
pub use roster::NullRoster;

/// All four nullables bundled, with handles kept out for assertions.
pub struct NullPlatform {
    pub roster: Arc<NullRoster>,
    pub messenger: Arc<NullMessenger>,
    pub presence: Arc<NullPresence>,
    pub cues: Arc<NullCuePlayer>,
}

impl NullPlatform {
    pub fn new() -> Self {
        Self {
            roster: Arc::new(NullRoster::new()),
            messenger: Arc::new(NullMessenger::new()),
            presence: Arc::new(NullPresence::new()),
            cues: Arc::new(NullCuePlayer::new()),
        }
    }

    /// The collaborator bundle the engine constructor wants.
    pub fn platform(&self) -> Platform {
        Platform::new(
            self.roster.clone(),
            self.messenger.clone(),
            self.presence.clone(),
            self.cues.clone(),
        )
    }
}

impl Default for NullPlatform {
    fn default() -> Self {
        Self::new()
    }
}
