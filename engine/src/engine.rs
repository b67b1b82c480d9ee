//! The engine facade — wires every driver together behind one handle.
//!
//! Hosts construct a [`MootEngine`] from a config and a [`Platform`] bundle,
//! then drive the whole orchestration surface through it: elections,
//! expulsion polls, speech rounds, office hand-overs, event subscriptions.
//! The facade owns the shared registries so the drivers agree on who holds
//! each guild's floor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use moot_election::EnrollmentMove;
use moot_tally::BallotReceipt;
use moot_turns::Direction;
use moot_types::{ActorId, ChannelId, GuildId, PollKind, SeatId, SessionRef};

use crate::config::EngineConfig;
use crate::election::{ElectionEngine, ElectionStatus};
use crate::error::EngineError;
use crate::expulsion::{ExpulsionEngine, ExpulsionStatus, PollFollowup};
use crate::hub::{EventHub, Topic};
use crate::metrics::EngineMetrics;
use crate::office::OfficeEngine;
use crate::registry::Engagements;
use crate::shutdown::ShutdownController;
use crate::speech::{InterruptStatus, RoundFollowup, SpeechEngine, SpeechStatus};
use crate::traits::Platform;

/// A running orchestration engine.
pub struct MootEngine {
    pub config: EngineConfig,
    pub hub: Arc<EventHub>,
    pub metrics: Arc<EngineMetrics>,
    pub shutdown: Arc<ShutdownController>,
    pub speech: Arc<SpeechEngine>,
    pub elections: Arc<ElectionEngine>,
    pub expulsions: Arc<ExpulsionEngine>,
    pub office: Arc<OfficeEngine>,
    engagements: Arc<Engagements>,
}

impl MootEngine {
    /// Wire up a fresh engine over the given platform collaborators.
    pub fn new(config: EngineConfig, platform: Platform) -> Self {
        let params = config.params.clone();

        // Shared infrastructure
        let hub = Arc::new(EventHub::new(config.event_capacity));
        let metrics = Arc::new(EngineMetrics::new());
        let shutdown = Arc::new(ShutdownController::new());
        let engagements = Arc::new(Engagements::new());

        // Drivers. The speech engine comes first; the poll drivers run
        // their campaign, runoff, and last-words rounds through it.
        let speech = SpeechEngine::new(
            params.clone(),
            platform.clone(),
            hub.clone(),
            metrics.clone(),
            engagements.clone(),
        );
        let elections = ElectionEngine::new(
            params.clone(),
            platform.clone(),
            hub.clone(),
            metrics.clone(),
            engagements.clone(),
            speech.clone(),
        );
        let expulsions = ExpulsionEngine::new(
            params.clone(),
            platform.clone(),
            hub.clone(),
            metrics.clone(),
            engagements.clone(),
            speech.clone(),
        );
        let office = OfficeEngine::new(params, platform, hub.clone(), engagements.clone());

        Self {
            config,
            hub,
            metrics,
            shutdown,
            speech,
            elections,
            expulsions,
            office,
            engagements,
        }
    }

    // ── Elections ───────────────────────────────────────────────────────

    /// Open an election in `channel`: enrollment window first, then the
    /// staged flow runs on its own timers.
    pub async fn start_election_enrollment(
        &self,
        session: SessionRef,
        channel: ChannelId,
    ) -> Result<(), EngineError> {
        self.elections.start(session, channel).await
    }

    /// Toggle the caller's candidacy (enrollment) or quit flag (withdrawal).
    pub async fn enroll_or_withdraw(
        &self,
        session: SessionRef,
        actor: ActorId,
    ) -> Result<EnrollmentMove, EngineError> {
        self.elections.enroll_or_withdraw(session, actor).await
    }

    /// Admin override: close the current election waiting window right now.
    pub async fn force_start_voting(&self, session: SessionRef) -> Result<(), EngineError> {
        self.elections.force_start_voting(session).await
    }

    pub async fn election_status(&self, guild: GuildId) -> Result<ElectionStatus, EngineError> {
        self.elections.status(guild).await
    }

    // ── Ballots ─────────────────────────────────────────────────────────

    /// Toggle the caller's ballot onto `target` in whichever poll `poll`
    /// names. Same toggle semantics in both: re-toggling the same seat
    /// abstains, toggling another seat moves the ballot.
    pub async fn toggle_vote(
        &self,
        poll: PollKind,
        session: SessionRef,
        actor: ActorId,
        target: SeatId,
    ) -> Result<BallotReceipt, EngineError> {
        match poll {
            PollKind::Election => self.elections.toggle_vote(session, actor, target).await,
            PollKind::Expulsion => self.expulsions.toggle_vote(session, actor, target).await,
        }
    }

    // ── Expulsion polls ─────────────────────────────────────────────────

    /// Open an expulsion poll over every living seat. `on_complete` fires
    /// once when the poll concludes, after any last words.
    pub async fn start_expulsion_poll(
        &self,
        session: SessionRef,
        channel: ChannelId,
        on_complete: Option<PollFollowup>,
    ) -> Result<(), EngineError> {
        self.expulsions.start(session, channel, on_complete).await
    }

    pub async fn expulsion_status(&self, guild: GuildId) -> Result<ExpulsionStatus, EngineError> {
        self.expulsions.status(guild).await
    }

    // ── Speech rounds ───────────────────────────────────────────────────

    /// Start a discussion round over `seats`, ordered around `pivot`.
    /// Returns the dealt speaking order.
    pub async fn start_speech_queue(
        &self,
        guild: GuildId,
        channel: ChannelId,
        seats: &[SeatId],
        pivot: SeatId,
        direction: Option<Direction>,
        on_complete: Option<RoundFollowup>,
    ) -> Result<Vec<SeatId>, EngineError> {
        self.speech
            .start_speech_queue(guild, channel, seats, pivot, direction, on_complete)
            .await
    }

    /// Give one seat a last-words turn.
    pub async fn start_last_words(
        &self,
        guild: GuildId,
        channel: ChannelId,
        seat: SeatId,
        on_complete: Option<RoundFollowup>,
    ) -> Result<(), EngineError> {
        self.speech
            .start_last_words(guild, channel, seat, on_complete)
            .await
    }

    /// The current speaker yields the rest of their time.
    pub async fn skip_current(&self, guild: GuildId, actor: ActorId) -> Result<(), EngineError> {
        self.speech.skip_current(guild, actor).await
    }

    /// Toggle the caller's interrupt vote against the current speaker.
    pub async fn vote_interrupt(
        &self,
        guild: GuildId,
        actor: ActorId,
    ) -> Result<InterruptStatus, EngineError> {
        self.speech.vote_interrupt(guild, actor).await
    }

    /// Admin override: end the current turn immediately.
    pub async fn force_advance_speaker(&self, guild: GuildId) -> Result<(), EngineError> {
        self.speech.force_advance_speaker(guild).await
    }

    /// Admin override: abort the guild's whole speech round.
    pub async fn interrupt_all(
        &self,
        guild: GuildId,
        fire_followup: bool,
    ) -> Result<(), EngineError> {
        self.speech.interrupt_all(guild, fire_followup).await
    }

    /// Blanket mute control over every living seat.
    pub async fn set_all_muted(&self, guild: GuildId, muted: bool) -> Result<(), EngineError> {
        self.speech.set_all_muted(guild, muted).await
    }

    /// Freeze the current speaker's countdown.
    pub async fn pause_speech(&self, guild: GuildId) -> Result<(), EngineError> {
        self.speech.pause(guild).await
    }

    /// Restart a paused countdown with the time it had left.
    pub async fn resume_speech(&self, guild: GuildId) -> Result<(), EngineError> {
        self.speech.resume(guild).await
    }

    /// Grant the current speaker extra time.
    pub async fn extend_speech(&self, guild: GuildId, extra: Duration) -> Result<(), EngineError> {
        self.speech.extend_current(guild, extra.as_secs()).await
    }

    pub async fn speech_status(&self, guild: GuildId) -> Result<SpeechStatus, EngineError> {
        self.speech.status(guild).await
    }

    // ── Office hand-over ────────────────────────────────────────────────

    /// Open the hand-over window for the guild's current office-holder.
    pub async fn start_office_transfer(
        &self,
        session: SessionRef,
        channel: ChannelId,
    ) -> Result<(), EngineError> {
        self.office.start(session, channel).await
    }

    /// The departing holder names their successor.
    pub async fn choose_successor(
        &self,
        session: SessionRef,
        actor: ActorId,
        seat: SeatId,
    ) -> Result<(), EngineError> {
        self.office.choose_successor(session, actor, seat).await
    }

    /// The departing holder destroys the badge instead.
    pub async fn destroy_office(
        &self,
        session: SessionRef,
        actor: ActorId,
    ) -> Result<(), EngineError> {
        self.office.destroy_office(session, actor).await
    }

    // ── Events ──────────────────────────────────────────────────────────

    /// Subscribe to one event topic. Events arrive as JSON envelopes.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<String> {
        self.hub.subscribe(topic)
    }

    // ── Shutdown ────────────────────────────────────────────────────────

    /// Stop the engine: signal subscribers, drop every live session, and
    /// release every guild claim. Pending stage timers disarm as their
    /// sessions drop.
    pub async fn stop(&self) {
        tracing::info!("engine stopping");
        self.shutdown.shutdown();
        self.speech.abort_all().await;
        self.elections.abort_all().await;
        self.expulsions.abort_all().await;
        self.office.abort_all().await;
        self.engagements.clear().await;
        tracing::info!("engine stopped");
    }
}
