//! Nullable messenger — record channel traffic without posting it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use moot_engine::error::CollabError;
use moot_engine::traits::Messenger;
use moot_types::{ChannelId, MessageRef};

/// One recorded messenger call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Posted {
    Prompt { at: MessageRef, body: String },
    Update { target: MessageRef, body: String },
    Reply { to: MessageRef, body: String },
    Announcement { channel: ChannelId, body: String },
}

impl Posted {
    pub fn body(&self) -> &str {
        match self {
            Posted::Prompt { body, .. }
            | Posted::Update { body, .. }
            | Posted::Reply { body, .. }
            | Posted::Announcement { body, .. } => body,
        }
    }
}

/// A test messenger that records messages instead of sending them.
/// Thread-safe for use with tokio's multi-threaded runtime.
///
/// Prompt handles are allocated from a private counter, so a test can
/// correlate later updates and replies with the prompt they target.
pub struct NullMessenger {
    log: Mutex<Vec<Posted>>,
    next_message: AtomicU64,
    failing: AtomicBool,
}

impl NullMessenger {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            next_message: AtomicU64::new(1),
            failing: AtomicBool::new(false),
        }
    }

    /// Every call in arrival order (for assertions).
    pub fn log(&self) -> Vec<Posted> {
        self.log.lock().unwrap().clone()
    }

    /// Message bodies only, in arrival order.
    pub fn bodies(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.body().to_string())
            .collect()
    }

    /// Whether any recorded body contains `needle`.
    pub fn saw(&self, needle: &str) -> bool {
        self.log
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.body().contains(needle))
    }

    /// Make every messenger call fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Clear the recorded log.
    pub fn reset(&self) {
        self.log.lock().unwrap().clear();
    }

    fn check_available(&self) -> Result<(), CollabError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(CollabError::new("messenger unavailable"));
        }
        Ok(())
    }
}

impl Default for NullMessenger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Messenger for NullMessenger {
    async fn post_prompt(
        &self,
        channel: ChannelId,
        body: String,
    ) -> Result<MessageRef, CollabError> {
        self.check_available()?;
        let at = MessageRef::new(channel, self.next_message.fetch_add(1, Ordering::Relaxed));
        self.log.lock().unwrap().push(Posted::Prompt { at, body });
        Ok(at)
    }

    async fn update_prompt(&self, target: MessageRef, body: String) -> Result<(), CollabError> {
        self.check_available()?;
        self.log
            .lock()
            .unwrap()
            .push(Posted::Update { target, body });
        Ok(())
    }

    async fn reply(&self, to: MessageRef, body: String) -> Result<(), CollabError> {
        self.check_available()?;
        self.log.lock().unwrap().push(Posted::Reply { to, body });
        Ok(())
    }

    async fn announce(&self, channel: ChannelId, body: String) -> Result<(), CollabError> {
        self.check_available()?;
        self.log
            .lock()
            .unwrap()
            .push(Posted::Announcement { channel, body });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> ChannelId {
        ChannelId::new(500)
    }

    #[tokio::test]
    async fn prompts_get_distinct_handles_in_the_channel() {
        let messenger = NullMessenger::new();

        let a = messenger
            .post_prompt(channel(), "first".into())
            .await
            .unwrap();
        let b = messenger
            .post_prompt(channel(), "second".into())
            .await
            .unwrap();

        assert_eq!(a.channel, channel());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn the_log_keeps_arrival_order() {
        let messenger = NullMessenger::new();

        let at = messenger
            .post_prompt(channel(), "ballot".into())
            .await
            .unwrap();
        messenger.reply(at, "update".into()).await.unwrap();
        messenger.announce(channel(), "done".into()).await.unwrap();

        assert_eq!(messenger.bodies(), vec!["ballot", "update", "done"]);
        assert!(messenger.saw("ball"));
        assert!(!messenger.saw("missing"));
    }

    #[tokio::test]
    async fn failing_mode_rejects_every_call() {
        let messenger = NullMessenger::new();
        messenger.set_failing(true);

        assert!(messenger
            .post_prompt(channel(), "x".into())
            .await
            .is_err());
        assert!(messenger.announce(channel(), "x".into()).await.is_err());
        assert!(messenger.log().is_empty());
    }
}
