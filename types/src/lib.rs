//! Fundamental types for the moot game-orchestration engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! ids, the player model, game parameters, stages, broadcast events, and timestamps.

pub mod cue;
pub mod error;
pub mod event;
pub mod id;
pub mod params;
pub mod player;
pub mod poll;
pub mod time;

pub use cue::Cue;
pub use error::ValidationError;
pub use event::GameEvent;
pub use id::{ActorId, ChannelId, GuildId, MessageRef, SeatId, SessionId, SessionRef};
pub use params::GameParams;
pub use player::Player;
pub use poll::{AbandonReason, PollKind, Stage};
pub use time::Timestamp;
