//! The engine's event hub.
//!
//! Every observable state change is serialized into a JSON envelope and
//! broadcast on its topic channel. Subscribers (the platform adapter's log
//! channel, spectator tooling) pick the topics they care about; a hub with no
//! subscribers drops events silently.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use moot_types::{GameEvent, Timestamp};

/// Event topics, one broadcast channel each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Speech,
    Election,
    Expulsion,
    Office,
}

impl Topic {
    /// The topic an event belongs on.
    pub fn of(event: &GameEvent) -> Topic {
        match event {
            GameEvent::SpeakerChanged { .. }
            | GameEvent::SpeechExtended { .. }
            | GameEvent::SpeechInterrupted { .. }
            | GameEvent::SpeechQueueFinished { .. }
            | GameEvent::SpeechQueueAborted { .. } => Topic::Speech,

            GameEvent::StageOpened { .. }
            | GameEvent::CandidateEnrolled { .. }
            | GameEvent::CandidateWithdrew { .. }
            | GameEvent::CandidateQuit { .. }
            | GameEvent::ElectionDecided { .. }
            | GameEvent::ElectionAbandoned { .. } => Topic::Election,

            GameEvent::BallotActivity { poll, .. } | GameEvent::PkStarted { poll, .. } => {
                match poll {
                    moot_types::PollKind::Election => Topic::Election,
                    moot_types::PollKind::Expulsion => Topic::Expulsion,
                }
            }

            GameEvent::ExpulsionDecided { .. } | GameEvent::ExpulsionAbandoned { .. } => {
                Topic::Expulsion
            }

            GameEvent::OfficeChanged { .. } => Topic::Office,
        }
    }
}

/// Broadcast channels for each event topic.
pub struct EventHub {
    speech_tx: broadcast::Sender<String>,
    election_tx: broadcast::Sender<String>,
    expulsion_tx: broadcast::Sender<String>,
    office_tx: broadcast::Sender<String>,
}

impl EventHub {
    /// Create a hub with the given per-topic channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (speech_tx, _) = broadcast::channel(capacity);
        let (election_tx, _) = broadcast::channel(capacity);
        let (expulsion_tx, _) = broadcast::channel(capacity);
        let (office_tx, _) = broadcast::channel(capacity);
        Self {
            speech_tx,
            election_tx,
            expulsion_tx,
            office_tx,
        }
    }

    fn sender_for(&self, topic: Topic) -> &broadcast::Sender<String> {
        match topic {
            Topic::Speech => &self.speech_tx,
            Topic::Election => &self.election_tx,
            Topic::Expulsion => &self.expulsion_tx,
            Topic::Office => &self.office_tx,
        }
    }

    /// Subscribe to one topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<String> {
        self.sender_for(topic).subscribe()
    }

    /// Publish an event on its topic, wrapped in the JSON envelope.
    pub fn publish(&self, event: &GameEvent) {
        let topic = Topic::of(event);
        let envelope = serde_json::json!({
            "topic": topic,
            "at": Timestamp::now().as_secs(),
            "event": event,
        });
        let _ = self.sender_for(topic).send(envelope.to_string());
    }
}
