//! Nullable cue player — record audio cues without playing them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use moot_engine::error::CollabError;
use moot_engine::traits::CuePlayer;
use moot_types::{Cue, GuildId};

/// A test cue player that records every cue fired.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullCuePlayer {
    played: Mutex<Vec<(GuildId, Cue)>>,
    failing: AtomicBool,
}

impl NullCuePlayer {
    pub fn new() -> Self {
        Self {
            played: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Every cue fired so far, in order (for assertions).
    pub fn played(&self) -> Vec<(GuildId, Cue)> {
        self.played.lock().unwrap().clone()
    }

    /// Whether `cue` was fired for `guild` at least once.
    pub fn heard(&self, guild: GuildId, cue: Cue) -> bool {
        self.played
            .lock()
            .unwrap()
            .iter()
            .any(|entry| *entry == (guild, cue))
    }

    /// Make every cue call fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

impl Default for NullCuePlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CuePlayer for NullCuePlayer {
    async fn play(&self, guild: GuildId, cue: Cue) -> Result<(), CollabError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(CollabError::new("cue player unavailable"));
        }
        self.played.lock().unwrap().push((guild, cue));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_cues_in_order() {
        let cues = NullCuePlayer::new();
        let guild = GuildId::new(7);

        cues.play(guild, Cue::BallotOpen).await.unwrap();
        cues.play(guild, Cue::TenSecondsLeft).await.unwrap();

        assert_eq!(
            cues.played(),
            vec![(guild, Cue::BallotOpen), (guild, Cue::TenSecondsLeft)]
        );
        assert!(cues.heard(guild, Cue::BallotOpen));
        assert!(!cues.heard(guild, Cue::TimeUp));
    }

    #[tokio::test]
    async fn failing_mode_rejects_the_call() {
        let cues = NullCuePlayer::new();
        cues.set_failing(true);

        assert!(cues.play(GuildId::new(7), Cue::TimeUp).await.is_err());
        assert!(cues.played().is_empty());
    }
}
