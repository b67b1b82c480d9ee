//! Nullable presence — record mute changes without a voice channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use moot_engine::error::CollabError;
use moot_engine::traits::Presence;
use moot_types::{ActorId, GuildId};

/// A test presence controller that records mute changes.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullPresence {
    changes: Mutex<Vec<(GuildId, ActorId, bool)>>,
    failing: AtomicBool,
}

impl NullPresence {
    pub fn new() -> Self {
        Self {
            changes: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Every mute change in arrival order (for assertions).
    pub fn changes(&self) -> Vec<(GuildId, ActorId, bool)> {
        self.changes.lock().unwrap().clone()
    }

    /// The most recent mute state recorded for `actor`, if any.
    pub fn last_for(&self, actor: ActorId) -> Option<bool> {
        self.changes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, a, _)| *a == actor)
            .map(|(_, _, muted)| *muted)
    }

    /// Make every presence call fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

impl Default for NullPresence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Presence for NullPresence {
    async fn set_muted(
        &self,
        guild: GuildId,
        actor: ActorId,
        muted: bool,
    ) -> Result<(), CollabError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(CollabError::new("presence unavailable"));
        }
        self.changes.lock().unwrap().push((guild, actor, muted));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_changes_and_reports_the_latest() {
        let presence = NullPresence::new();
        let guild = GuildId::new(7);
        let actor = ActorId::new(10);

        presence.set_muted(guild, actor, true).await.unwrap();
        presence.set_muted(guild, actor, false).await.unwrap();

        assert_eq!(presence.changes().len(), 2);
        assert_eq!(presence.last_for(actor), Some(false));
        assert_eq!(presence.last_for(ActorId::new(99)), None);
    }

    #[tokio::test]
    async fn failing_mode_rejects_the_call() {
        let presence = NullPresence::new();
        presence.set_failing(true);

        let err = presence
            .set_muted(GuildId::new(7), ActorId::new(10), true)
            .await;
        assert!(err.is_err());
        assert!(presence.changes().is_empty());
    }
}
