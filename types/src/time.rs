//! Timestamp type used for stage deadlines and broadcast events.
//!
//! Timestamps are Unix epoch seconds (UTC). Deadlines driving the actual
//! timers are tokio instants inside the engine; these wall-clock values exist
//! for status queries, events, and logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs();
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// This timestamp shifted `secs` into the future.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds from `now` until this timestamp; zero once it has passed.
    pub fn remaining_at(&self, now: Timestamp) -> u64 {
        self.0.saturating_sub(now.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_counts_down_and_saturates() {
        let deadline = Timestamp::new(100);
        assert_eq!(deadline.remaining_at(Timestamp::new(70)), 30);
        assert_eq!(deadline.remaining_at(Timestamp::new(100)), 0);
        assert_eq!(deadline.remaining_at(Timestamp::new(130)), 0);
    }

    #[test]
    fn plus_secs_builds_deadlines() {
        let opened = Timestamp::new(1000);
        assert_eq!(opened.plus_secs(30), Timestamp::new(1030));
        assert_eq!(opened.plus_secs(30).remaining_at(opened), 30);
    }
}
