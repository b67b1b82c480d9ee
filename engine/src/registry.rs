//! Per-guild bookkeeping: the engagement token and live session slots.
//!
//! A guild runs at most one floor-owning procedure at a time. Whoever starts
//! one claims the guild's engagement token first and releases it at teardown;
//! speech rounds spawned inside a poll (campaign, runoff, last words) ride
//! the owning poll's claim instead of taking their own.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use moot_types::{GuildId, ValidationError};

/// What kind of procedure currently owns a guild's floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Engagement {
    /// A free-standing speech round (daytime discussion or last words).
    Speech,
    Election,
    Expulsion,
    /// An office badge being handed over or retired.
    Office,
}

impl fmt::Display for Engagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Engagement::Speech => "speech",
            Engagement::Election => "election",
            Engagement::Expulsion => "expulsion",
            Engagement::Office => "office",
        };
        write!(f, "{name}")
    }
}

/// The per-guild engagement tokens.
#[derive(Default)]
pub struct Engagements {
    inner: Mutex<HashMap<GuildId, Engagement>>,
}

impl Engagements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guild for `owner`. Fails with
    /// [`ValidationError::GuildBusy`] while any procedure holds the claim.
    pub async fn claim(&self, guild: GuildId, owner: Engagement) -> Result<(), ValidationError> {
        let mut inner = self.inner.lock().await;
        if let Some(holder) = inner.get(&guild) {
            tracing::debug!(%guild, %holder, attempted = %owner, "guild already engaged");
            return Err(ValidationError::GuildBusy);
        }
        inner.insert(guild, owner);
        Ok(())
    }

    /// Release the guild's claim. No-op when nothing is claimed.
    pub async fn release(&self, guild: GuildId) {
        self.inner.lock().await.remove(&guild);
    }

    pub async fn owner(&self, guild: GuildId) -> Option<Engagement> {
        self.inner.lock().await.get(&guild).copied()
    }

    /// Forget every claim (shutdown).
    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }
}

/// Live sessions of one driver, keyed by guild.
///
/// Sessions are handed out as cheaply cloned `Arc<Mutex<_>>` handles, so a
/// deadline task and a user operation can both reach the same session while
/// the map lock is long released.
pub struct SessionSlots<S> {
    inner: RwLock<HashMap<GuildId, Arc<Mutex<S>>>>,
}

impl<S> SessionSlots<S> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a fresh session. Fails with [`ValidationError::GuildBusy`] if
    /// the guild already has a live one.
    pub async fn insert(
        &self,
        guild: GuildId,
        session: S,
    ) -> Result<Arc<Mutex<S>>, ValidationError> {
        let mut inner = self.inner.write().await;
        if inner.contains_key(&guild) {
            return Err(ValidationError::GuildBusy);
        }
        let slot = Arc::new(Mutex::new(session));
        inner.insert(guild, slot.clone());
        Ok(slot)
    }

    pub async fn get(&self, guild: GuildId) -> Option<Arc<Mutex<S>>> {
        self.inner.read().await.get(&guild).cloned()
    }

    pub async fn remove(&self, guild: GuildId) -> Option<Arc<Mutex<S>>> {
        self.inner.write().await.remove(&guild)
    }

    /// Drop every live session (shutdown). Timers disarm as sessions drop.
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

impl<S> Default for SessionSlots<S> {
    fn default() -> Self {
        Self::new()
    }
}
