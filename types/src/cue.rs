//! Named short audio cues fired into a guild's voice channel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of cues the engine asks the cue player to fire.
///
/// Playback is best-effort; the engine never waits on a cue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// Election enrollment has opened.
    EnrollmentOpen,
    /// An election ballot window has opened.
    BallotOpen,
    /// An expulsion ballot window has opened.
    ExpulsionOpen,
    /// Ten seconds remain in the current stage window.
    TenSecondsLeft,
    /// Thirty seconds remain in the current speaking turn.
    ThirtySecondsLeft,
    /// The current speaking turn has ended.
    TimeUp,
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cue::EnrollmentOpen => "enrollment_open",
            Cue::BallotOpen => "ballot_open",
            Cue::ExpulsionOpen => "expulsion_open",
            Cue::TenSecondsLeft => "ten_seconds_left",
            Cue::ThirtySecondsLeft => "thirty_seconds_left",
            Cue::TimeUp => "time_up",
        };
        write!(f, "{name}")
    }
}
