//! Moot orchestration engine — drives every timed procedure of a game.
//!
//! The engine is the central coordinator that:
//! - Runs ordered speech rounds with per-speaker countdowns
//! - Handles skip requests and majority interrupt votes
//! - Stages elections (enrollment, campaign speeches, withdrawal, ballots)
//! - Runs expulsion polls, runoffs, and last words
//! - Oversees the office hand-over window
//! - Publishes game events to per-topic subscribers
//!
//! Hosts supply the platform collaborators ([`Roster`], [`Messenger`],
//! [`Presence`], [`CuePlayer`]) and drive everything through [`MootEngine`].

pub mod config;
pub mod election;
pub mod engine;
pub mod error;
pub mod expulsion;
pub mod hub;
pub mod logging;
pub mod metrics;
pub mod office;
pub mod registry;
pub mod shutdown;
pub mod speech;
pub mod timer;
pub mod traits;

pub use config::EngineConfig;
pub use election::{CandidateStatus, ElectionEngine, ElectionStatus};
pub use engine::MootEngine;
pub use error::{CollabError, EngineError};
pub use expulsion::{ExpulsionEngine, ExpulsionStatus, PollFollowup};
pub use hub::{EventHub, Topic};
pub use logging::{init_logging, LogFormat};
pub use metrics::EngineMetrics;
pub use office::OfficeEngine;
pub use registry::{Engagement, Engagements, SessionSlots};
pub use shutdown::ShutdownController;
pub use speech::{InterruptStatus, RoundFollowup, SpeechEngine, SpeechStatus, TurnPurpose};
pub use timer::StageTimer;
pub use traits::{CuePlayer, Messenger, Platform, Presence, Roster};
