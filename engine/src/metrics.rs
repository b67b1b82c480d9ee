//! Prometheus metrics for the orchestration engine.
//!
//! Counters and gauges covering polls, speaking turns, and ballot traffic.
//! The [`EngineMetrics`] struct owns a dedicated [`Registry`] that an
//! operator-facing `/metrics` endpoint can encode into the Prometheus text
//! exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

/// Central collection of all engine-level Prometheus metrics.
pub struct EngineMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Elections started.
    pub elections_started: IntCounter,
    /// Elections that produced a winner (unopposed wins included).
    pub elections_decided: IntCounter,
    /// Elections that ended with no winner.
    pub elections_abandoned: IntCounter,
    /// Expulsion polls started.
    pub expulsions_started: IntCounter,
    /// Expulsion polls that removed a player.
    pub expulsions_decided: IntCounter,
    /// Expulsion polls that removed nobody.
    pub expulsions_abandoned: IntCounter,
    /// Speech rounds started (daytime, campaign, runoff, last words).
    pub speech_rounds_started: IntCounter,
    /// Speaking turns handed out.
    pub turns_taken: IntCounter,
    /// Interrupt votes accepted (casts and retractions).
    pub interrupt_votes: IntCounter,
    /// Ballot toggles accepted across all polls.
    pub ballots_cast: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Speech rounds currently running.
    pub active_speech_rounds: IntGauge,
    /// Election and expulsion polls currently open.
    pub active_polls: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Observed length of completed speaking turns, in seconds.
    pub turn_seconds: Histogram,
}

impl EngineMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        // Counters
        let elections_started = register_int_counter_with_registry!(
            Opts::new("moot_elections_started_total", "Elections started"),
            registry
        )
        .expect("failed to register elections_started counter");

        let elections_decided = register_int_counter_with_registry!(
            Opts::new(
                "moot_elections_decided_total",
                "Elections that produced a winner"
            ),
            registry
        )
        .expect("failed to register elections_decided counter");

        let elections_abandoned = register_int_counter_with_registry!(
            Opts::new(
                "moot_elections_abandoned_total",
                "Elections that ended with no winner"
            ),
            registry
        )
        .expect("failed to register elections_abandoned counter");

        let expulsions_started = register_int_counter_with_registry!(
            Opts::new("moot_expulsions_started_total", "Expulsion polls started"),
            registry
        )
        .expect("failed to register expulsions_started counter");

        let expulsions_decided = register_int_counter_with_registry!(
            Opts::new(
                "moot_expulsions_decided_total",
                "Expulsion polls that removed a player"
            ),
            registry
        )
        .expect("failed to register expulsions_decided counter");

        let expulsions_abandoned = register_int_counter_with_registry!(
            Opts::new(
                "moot_expulsions_abandoned_total",
                "Expulsion polls that removed nobody"
            ),
            registry
        )
        .expect("failed to register expulsions_abandoned counter");

        let speech_rounds_started = register_int_counter_with_registry!(
            Opts::new("moot_speech_rounds_started_total", "Speech rounds started"),
            registry
        )
        .expect("failed to register speech_rounds_started counter");

        let turns_taken = register_int_counter_with_registry!(
            Opts::new("moot_turns_taken_total", "Speaking turns handed out"),
            registry
        )
        .expect("failed to register turns_taken counter");

        let interrupt_votes = register_int_counter_with_registry!(
            Opts::new("moot_interrupt_votes_total", "Interrupt votes accepted"),
            registry
        )
        .expect("failed to register interrupt_votes counter");

        let ballots_cast = register_int_counter_with_registry!(
            Opts::new("moot_ballots_cast_total", "Ballot toggles accepted"),
            registry
        )
        .expect("failed to register ballots_cast counter");

        // Gauges
        let active_speech_rounds = register_int_gauge_with_registry!(
            Opts::new(
                "moot_active_speech_rounds",
                "Speech rounds currently running"
            ),
            registry
        )
        .expect("failed to register active_speech_rounds gauge");

        let active_polls = register_int_gauge_with_registry!(
            Opts::new("moot_active_polls", "Polls currently open"),
            registry
        )
        .expect("failed to register active_polls gauge");

        // Histograms
        let turn_seconds = register_histogram_with_registry!(
            HistogramOpts::new(
                "moot_turn_seconds",
                "Observed length of completed speaking turns"
            )
            .buckets(vec![5.0, 15.0, 30.0, 60.0, 120.0, 180.0, 240.0]),
            registry
        )
        .expect("failed to register turn_seconds histogram");

        Self {
            registry,
            elections_started,
            elections_decided,
            elections_abandoned,
            expulsions_started,
            expulsions_decided,
            expulsions_abandoned,
            speech_rounds_started,
            turns_taken,
            interrupt_votes,
            ballots_cast,
            active_speech_rounds,
            active_polls,
            turn_seconds,
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
