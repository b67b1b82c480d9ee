//! Game parameters — every stage duration, cue offset, and weighting rule.
//!
//! All values are TOML-overridable; the defaults match the table rules the
//! engine was written for (30s enrollment, 180s/210s speeches, one PK retry).

use serde::{Deserialize, Serialize};

/// Tunable timing and weighting parameters for one engine instance.
///
/// Loaded as part of the engine configuration; every field falls back to its
/// default when absent from the TOML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameParams {
    // ── Election stage windows ───────────────────────────────────────────
    /// Length of the enrollment window, in seconds.
    #[serde(default = "default_enrollment_secs")]
    pub enrollment_secs: u64,

    /// Length of the withdrawal window after campaign speeches, in seconds.
    #[serde(default = "default_withdrawal_secs")]
    pub withdrawal_secs: u64,

    /// Length of every ballot window (election and expulsion), in seconds.
    #[serde(default = "default_ballot_secs")]
    pub ballot_secs: u64,

    /// How many seconds before a stage closes the warning cue fires.
    /// Stages shorter than this get no warning.
    #[serde(default = "default_stage_warning_secs")]
    pub stage_warning_secs: u64,

    // ── Speaking turns ───────────────────────────────────────────────────
    /// Speaking time for a regular participant, in seconds.
    #[serde(default = "default_speech_secs")]
    pub speech_secs: u64,

    /// Speaking time for the current office-holder, in seconds.
    #[serde(default = "default_officer_speech_secs")]
    pub officer_speech_secs: u64,

    /// How many seconds before a turn ends the warning cue fires.
    /// Turns shorter than this get no warning.
    #[serde(default = "default_speech_warning_secs")]
    pub speech_warning_secs: u64,

    /// Whether a speaker is re-muted once their turn ends.
    #[serde(default = "default_true")]
    pub mute_after_speech: bool,

    // ── Vote weighting ───────────────────────────────────────────────────
    /// Whether the office-holder's ballot counts 1.5x in expulsion polls.
    #[serde(default = "default_true")]
    pub weighted_expulsion: bool,

    /// Whether the 1.5x bonus still applies on an election PK re-vote.
    #[serde(default = "default_true")]
    pub weighted_election_runoff: bool,

    /// Whether the 1.5x bonus still applies on an expulsion PK re-vote.
    #[serde(default)]
    pub weighted_expulsion_runoff: bool,

    // ── Expulsion ────────────────────────────────────────────────────────
    /// Whether an expelled player gets a single last-words turn.
    #[serde(default = "default_true")]
    pub last_words_after_expulsion: bool,

    // ── Office transfer ──────────────────────────────────────────────────
    /// How long a departing office-holder has to pick a successor before the
    /// badge is destroyed, in seconds.
    #[serde(default = "default_transfer_secs")]
    pub transfer_secs: u64,
}

impl GameParams {
    /// Speaking time for one player, depending on whether they hold office.
    pub fn speech_duration_secs(&self, officer: bool) -> u64 {
        if officer {
            self.officer_speech_secs
        } else {
            self.speech_secs
        }
    }
}

impl Default for GameParams {
    fn default() -> Self {
        Self {
            enrollment_secs: default_enrollment_secs(),
            withdrawal_secs: default_withdrawal_secs(),
            ballot_secs: default_ballot_secs(),
            stage_warning_secs: default_stage_warning_secs(),
            speech_secs: default_speech_secs(),
            officer_speech_secs: default_officer_speech_secs(),
            speech_warning_secs: default_speech_warning_secs(),
            mute_after_speech: true,
            weighted_expulsion: true,
            weighted_election_runoff: true,
            weighted_expulsion_runoff: false,
            last_words_after_expulsion: true,
            transfer_secs: default_transfer_secs(),
        }
    }
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_enrollment_secs() -> u64 {
    30
}

fn default_withdrawal_secs() -> u64 {
    20
}

fn default_ballot_secs() -> u64 {
    30
}

fn default_stage_warning_secs() -> u64 {
    10
}

fn default_speech_secs() -> u64 {
    180
}

fn default_officer_speech_secs() -> u64 {
    210
}

fn default_speech_warning_secs() -> u64 {
    30
}

fn default_transfer_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn officer_speaks_longer() {
        let params = GameParams::default();
        assert_eq!(params.speech_duration_secs(false), 180);
        assert_eq!(params.speech_duration_secs(true), 210);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let params: GameParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params, GameParams::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let params: GameParams =
            serde_json::from_str(r#"{"speech_secs": 90, "weighted_expulsion": false}"#).unwrap();
        assert_eq!(params.speech_secs, 90);
        assert!(!params.weighted_expulsion);
        assert_eq!(params.ballot_secs, 30);
        assert!(params.weighted_election_runoff);
    }
}
