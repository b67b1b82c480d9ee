//! Structured state-change events published on the engine's event hub.
//!
//! Subscribers (dashboards, the platform adapter's log channel) receive these
//! as JSON wrapped in a topic envelope by the hub.

use serde::{Deserialize, Serialize};

use crate::id::{GuildId, SeatId};
use crate::poll::{AbandonReason, PollKind, Stage};
use crate::time::Timestamp;

/// One observable state change inside the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    // ── Speaking turns ───────────────────────────────────────────────────
    /// A new speaker's turn has begun.
    SpeakerChanged {
        guild: GuildId,
        seat: SeatId,
        duration_secs: u64,
        deadline: Timestamp,
    },
    /// The current speaker's deadline moved (extension or resume).
    SpeechExtended {
        guild: GuildId,
        seat: SeatId,
        deadline: Timestamp,
    },
    /// The floor was taken away by a passed interrupt vote or an admin.
    SpeechInterrupted {
        guild: GuildId,
        seat: SeatId,
        /// Seats whose interrupt votes forced the advance; empty for an
        /// admin override.
        voters: Vec<SeatId>,
    },
    /// The queue ran out of speakers and tore itself down.
    SpeechQueueFinished { guild: GuildId },
    /// The queue was aborted with speakers still waiting.
    SpeechQueueAborted { guild: GuildId },

    // ── Polls ────────────────────────────────────────────────────────────
    /// An election stage window opened.
    StageOpened {
        guild: GuildId,
        stage: Stage,
        closes_at: Timestamp,
    },
    /// A player entered the race.
    CandidateEnrolled { guild: GuildId, seat: SeatId },
    /// A player left the race during enrollment (entry removed).
    CandidateWithdrew { guild: GuildId, seat: SeatId },
    /// A candidate marked themselves quit during withdrawal.
    CandidateQuit { guild: GuildId, seat: SeatId },
    /// Ballot traffic: how many distinct electors currently hold a ballot.
    BallotActivity {
        guild: GuildId,
        poll: PollKind,
        ballots: u32,
    },
    /// A tie-break re-vote opened, restricted to the tied seats.
    PkStarted {
        guild: GuildId,
        poll: PollKind,
        seats: Vec<SeatId>,
    },
    /// The election produced a winner.
    ElectionDecided {
        guild: GuildId,
        winner: SeatId,
        unopposed: bool,
    },
    /// The election ended with no winner.
    ElectionAbandoned {
        guild: GuildId,
        reason: AbandonReason,
    },
    /// The expulsion poll removed a player.
    ExpulsionDecided { guild: GuildId, seat: SeatId },
    /// The expulsion poll ended with nobody removed.
    ExpulsionAbandoned {
        guild: GuildId,
        reason: AbandonReason,
    },
    /// The office badge moved to a new holder, or was destroyed (`None`).
    OfficeChanged {
        guild: GuildId,
        holder: Option<SeatId>,
    },
}

impl GameEvent {
    /// The guild this event belongs to.
    pub fn guild(&self) -> GuildId {
        match self {
            GameEvent::SpeakerChanged { guild, .. }
            | GameEvent::SpeechExtended { guild, .. }
            | GameEvent::SpeechInterrupted { guild, .. }
            | GameEvent::SpeechQueueFinished { guild }
            | GameEvent::SpeechQueueAborted { guild }
            | GameEvent::StageOpened { guild, .. }
            | GameEvent::CandidateEnrolled { guild, .. }
            | GameEvent::CandidateWithdrew { guild, .. }
            | GameEvent::CandidateQuit { guild, .. }
            | GameEvent::BallotActivity { guild, .. }
            | GameEvent::PkStarted { guild, .. }
            | GameEvent::ElectionDecided { guild, .. }
            | GameEvent::ElectionAbandoned { guild, .. }
            | GameEvent::ExpulsionDecided { guild, .. }
            | GameEvent::ExpulsionAbandoned { guild, .. }
            | GameEvent::OfficeChanged { guild, .. } => *guild,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_tag_with_snake_case_type() {
        let event = GameEvent::ElectionDecided {
            guild: GuildId::new(1),
            winner: SeatId::new(4),
            unopposed: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "election_decided");
        assert_eq!(json["winner"], 4);
    }

    #[test]
    fn guild_accessor_covers_every_variant() {
        let guild = GuildId::new(9);
        let event = GameEvent::SpeechQueueFinished { guild };
        assert_eq!(event.guild(), guild);
    }
}
