//! Platform collaborator seams.
//!
//! The engine never talks to a chat platform directly. Everything it needs
//! from the outside world comes through these four traits: the roster that
//! owns player state, the messenger that posts and edits prompts, the
//! presence controller for voice mutes, and the cue player for short audio
//! signals. Production adapters wrap the platform SDK; tests plug in the
//! recording doubles from `moot-nullables`.

use std::sync::Arc;

use async_trait::async_trait;

use moot_types::{ActorId, ChannelId, Cue, GuildId, MessageRef, Player, SeatId, ValidationError};

use crate::error::CollabError;

/// Read and mutate the externally owned player roster.
#[async_trait]
pub trait Roster: Send + Sync {
    /// Every seat of the guild's running game, in seat order.
    async fn players(&self, guild: GuildId) -> Result<Vec<Player>, CollabError>;

    /// Mark a seat dead. The seat keeps its place at the table.
    async fn eliminate(&self, guild: GuildId, seat: SeatId) -> Result<(), CollabError>;

    /// Move the office badge to `seat`, or retire it with `None`.
    async fn set_officer(&self, guild: GuildId, seat: Option<SeatId>) -> Result<(), CollabError>;
}

/// Post and edit messages in a guild text channel.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post a fresh interactive prompt, returning a handle for later edits.
    async fn post_prompt(&self, channel: ChannelId, body: String)
        -> Result<MessageRef, CollabError>;

    /// Edit a previously posted prompt in place.
    async fn update_prompt(&self, target: MessageRef, body: String) -> Result<(), CollabError>;

    /// Post a threaded reply under an earlier prompt.
    async fn reply(&self, to: MessageRef, body: String) -> Result<(), CollabError>;

    /// Post a plain announcement.
    async fn announce(&self, channel: ChannelId, body: String) -> Result<(), CollabError>;
}

/// Server-mute control in the guild's voice channel.
#[async_trait]
pub trait Presence: Send + Sync {
    async fn set_muted(&self, guild: GuildId, actor: ActorId, muted: bool)
        -> Result<(), CollabError>;
}

/// Fire-and-forget audio cues. The engine never waits on playback.
#[async_trait]
pub trait CuePlayer: Send + Sync {
    async fn play(&self, guild: GuildId, cue: Cue) -> Result<(), CollabError>;
}

/// The four collaborator seams bundled, as handed to the engine constructor.
#[derive(Clone)]
pub struct Platform {
    pub roster: Arc<dyn Roster>,
    pub messenger: Arc<dyn Messenger>,
    pub presence: Arc<dyn Presence>,
    pub cues: Arc<dyn CuePlayer>,
}

impl Platform {
    pub fn new(
        roster: Arc<dyn Roster>,
        messenger: Arc<dyn Messenger>,
        presence: Arc<dyn Presence>,
        cues: Arc<dyn CuePlayer>,
    ) -> Self {
        Self {
            roster,
            messenger,
            presence,
            cues,
        }
    }
}

// ── Roster snapshot helpers ────────────────────────────────────────────

/// The living, seated player bound to `actor`.
///
/// Spectators resolve to [`ValidationError::NotAPlayer`], dead players to
/// [`ValidationError::NotAlive`].
pub(crate) fn living_seat(players: &[Player], actor: ActorId) -> Result<Player, ValidationError> {
    let player = players
        .iter()
        .find(|p| p.is_bound_to(actor))
        .ok_or(ValidationError::NotAPlayer)?;
    if !player.alive {
        return Err(ValidationError::NotAlive);
    }
    Ok(*player)
}

/// Any seated player bound to `actor`, dead or alive. Used where the dead
/// still act (last words, a dying office-holder picking a successor).
pub(crate) fn any_seat(players: &[Player], actor: ActorId) -> Result<Player, ValidationError> {
    players
        .iter()
        .find(|p| p.is_bound_to(actor))
        .copied()
        .ok_or(ValidationError::NotAPlayer)
}

/// Seats that are alive and have someone in them, in seat order.
pub(crate) fn living_seats(players: &[Player]) -> Vec<SeatId> {
    players
        .iter()
        .filter(|p| p.alive && p.actor.is_some())
        .map(|p| p.seat)
        .collect()
}

/// The identity holding the weighted ballot, if a living officer exists.
pub(crate) fn officer_actor(players: &[Player]) -> Option<ActorId> {
    players
        .iter()
        .find(|p| p.officer && p.alive)
        .and_then(|p| p.actor)
}
