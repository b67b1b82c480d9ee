//! The expulsion driver: a timed ballot over every living seat, with one
//! tie-break re-vote and last words for whoever falls.
//!
//! Built on the same pieces as the election driver: a pure machine behind a
//! per-guild slot, stage windows on [`StageTimer`], and tie-break speeches
//! run through the speech engine. The poll holds the guild's floor claim
//! until the expelled seat has finished speaking, so nothing else can start
//! in the gap between the verdict and the last words.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::Serialize;

use moot_election::{ExpulsionMachine, PollOutcome};
use moot_tally::{BallotBox, BallotReceipt};
use moot_turns::{speaking_order, Direction};
use moot_types::{
    AbandonReason, ActorId, ChannelId, Cue, GameEvent, GameParams, GuildId, MessageRef, PollKind,
    SeatId, SessionRef, Stage, Timestamp, ValidationError,
};

use crate::election::CandidateStatus;
use crate::error::EngineError;
use crate::hub::EventHub;
use crate::metrics::EngineMetrics;
use crate::registry::{Engagement, Engagements, SessionSlots};
use crate::speech::{RoundFollowup, SpeechEngine, TurnPurpose};
use crate::timer::StageTimer;
use crate::traits::{living_seat, living_seats, officer_actor, Platform};

/// Ran exactly once when the poll concludes, whatever the outcome. Hosts
/// use this to continue their day flow after the verdict and last words.
pub type PollFollowup = Box<dyn FnOnce() + Send + 'static>;

/// Snapshot of a running expulsion poll, for status queries.
#[derive(Clone, Debug, Serialize)]
pub struct ExpulsionStatus {
    pub stage: Stage,
    pub pk_round: bool,
    pub closes_at: Timestamp,
    pub remaining_secs: u64,
    pub candidates: Vec<CandidateStatus>,
    pub ballots: u32,
}

struct ExpulsionSession {
    session: SessionRef,
    channel: ChannelId,
    machine: ExpulsionMachine,
    /// Bumped every time a ballot window opens; deadline tasks carry the
    /// epoch they were armed under and no-op on mismatch.
    epoch: u64,
    timer: Option<StageTimer>,
    closes_at: Timestamp,
    prompt: Option<MessageRef>,
    closed: bool,
    on_complete: Option<PollFollowup>,
}

/// Drives every expulsion poll of every guild.
pub struct ExpulsionEngine {
    params: GameParams,
    platform: Platform,
    hub: Arc<EventHub>,
    metrics: Arc<EngineMetrics>,
    engagements: Arc<Engagements>,
    speeches: Arc<SpeechEngine>,
    slots: SessionSlots<ExpulsionSession>,
}

impl ExpulsionEngine {
    pub(crate) fn new(
        params: GameParams,
        platform: Platform,
        hub: Arc<EventHub>,
        metrics: Arc<EngineMetrics>,
        engagements: Arc<Engagements>,
        speeches: Arc<SpeechEngine>,
    ) -> Arc<Self> {
        Arc::new(Self {
            params,
            platform,
            hub,
            metrics,
            engagements,
            speeches,
            slots: SessionSlots::new(),
        })
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Open an expulsion poll over every living seat: claim the guild, post
    /// the ballot, start the voting window.
    pub async fn start(
        self: &Arc<Self>,
        session: SessionRef,
        channel: ChannelId,
        on_complete: Option<PollFollowup>,
    ) -> Result<(), EngineError> {
        let guild = session.guild;
        let players = self.platform.roster.players(guild).await?;
        let living = living_seats(&players);

        self.engagements.claim(guild, Engagement::Expulsion).await?;

        let state = ExpulsionSession {
            session,
            channel,
            machine: ExpulsionMachine::new(living),
            epoch: 0,
            timer: None,
            closes_at: Timestamp::EPOCH,
            prompt: None,
            closed: false,
            on_complete,
        };
        let slot = match self.slots.insert(guild, state).await {
            Ok(slot) => slot,
            Err(e) => {
                self.engagements.release(guild).await;
                return Err(e.into());
            }
        };
        self.metrics.expulsions_started.inc();
        self.metrics.active_polls.inc();

        let mut s = slot.lock().await;
        self.open_ballot(&mut s, guild).await;
        tracing::info!(%guild, "expulsion poll started");
        Ok(())
    }

    async fn open_ballot(self: &Arc<Self>, s: &mut ExpulsionSession, guild: GuildId) {
        let text = ballot_text(s.machine.ballots(), s.machine.is_pk_round());
        self.post_prompt(s, guild, text).await;
        self.play_cue(guild, Cue::ExpulsionOpen).await;

        s.epoch += 1;
        let epoch = s.epoch;
        s.closes_at = Timestamp::now().plus_secs(self.params.ballot_secs);

        let on_warning = {
            let engine = self.clone();
            async move { engine.stage_warning(guild, epoch).await }
        };
        let on_deadline = {
            let engine = self.clone();
            async move { engine.close_voting(guild, Some(epoch)).await }
        };
        s.timer = Some(StageTimer::spawn_with_warning(
            Duration::from_secs(self.params.ballot_secs),
            Duration::from_secs(self.params.stage_warning_secs),
            on_warning,
            on_deadline,
        ));
        self.hub.publish(&GameEvent::StageOpened {
            guild,
            stage: Stage::Voting,
            closes_at: s.closes_at,
        });
        tracing::debug!(%guild, pk = s.machine.is_pk_round(), "expulsion ballot opened");
    }

    async fn stage_warning(self: Arc<Self>, guild: GuildId, epoch: u64) {
        {
            let Some(slot) = self.slots.get(guild).await else {
                return;
            };
            let s = slot.lock().await;
            if s.closed || s.epoch != epoch {
                return;
            }
        }
        self.play_cue(guild, Cue::TenSecondsLeft).await;
    }

    async fn close_voting(self: &Arc<Self>, guild: GuildId, expected: Option<u64>) {
        let Some(slot) = self.slots.get(guild).await else {
            return;
        };
        let mut s = slot.lock().await;
        if s.closed {
            return;
        }
        if let Some(epoch) = expected {
            if s.epoch != epoch {
                return;
            }
        }
        if let Some(timer) = s.timer.take() {
            timer.cancel();
        }

        let weighted = self.weighted_elector(guild, s.machine.is_pk_round()).await;
        if s.machine.ballots().ballot_count() > 0 {
            let count = tally_line(s.machine.ballots(), weighted);
            self.announce(s.channel, guild, count).await;
        }
        match s.machine.close_voting(weighted) {
            Ok(PollOutcome::Decided(seat)) => {
                self.expel(&mut s, guild, seat).await;
            }
            Ok(PollOutcome::Abandoned(reason)) => {
                self.abandon(&mut s, guild, reason).await;
            }
            Ok(PollOutcome::TieRunoff(seats)) => {
                self.hub.publish(&GameEvent::PkStarted {
                    guild,
                    poll: PollKind::Expulsion,
                    seats: seats.clone(),
                });
                let note = format!(
                    "Seats {} are tied. One tie-break round: short speeches, then a fresh ballot.",
                    seat_list(&seats)
                );
                self.announce(s.channel, guild, note).await;
                self.start_runoff_speeches(&mut s, guild, &seats).await;
            }
            Err(e) => tracing::warn!(%guild, error = %e, "ballot close out of order"),
        }
    }

    /// The identity whose ballot counts extra at this tally, if any. The
    /// first vote and the re-vote carry separate weighting switches.
    async fn weighted_elector(&self, guild: GuildId, pk_round: bool) -> Option<ActorId> {
        let weighted = if pk_round {
            self.params.weighted_expulsion_runoff
        } else {
            self.params.weighted_expulsion
        };
        if !weighted {
            return None;
        }
        match self.platform.roster.players(guild).await {
            Ok(players) => officer_actor(&players),
            Err(e) => {
                tracing::warn!(%guild, error = %e, "roster unavailable at tally, unweighted");
                None
            }
        }
    }

    /// Tie-break speeches over the tied seats, ordered around a random pivot
    /// in a random direction. The follow-up reopens the ballot.
    async fn start_runoff_speeches(
        self: &Arc<Self>,
        s: &mut ExpulsionSession,
        guild: GuildId,
        seats: &[SeatId],
    ) {
        let pivot = match seats.choose(&mut rand::thread_rng()) {
            Some(&seat) => seat,
            None => return,
        };
        let order = speaking_order(seats, pivot, Direction::random());

        let followup: RoundFollowup = {
            let engine = self.clone();
            Box::new(move || {
                tokio::spawn(async move { engine.runoff_done(guild).await });
            })
        };
        if let Err(e) = self
            .speeches
            .start_owned_round(guild, s.channel, TurnPurpose::Runoff, order, followup)
            .await
        {
            tracing::error!(%guild, error = %e, "failed to start tie-break speeches");
        }
    }

    // Boxed rather than an `async fn`: the future re-enters `open_ballot`,
    // and the resulting cycle keeps the compiler from proving the opaque
    // future `Send` for the spawn above.
    fn runoff_done(
        self: Arc<Self>,
        guild: GuildId,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let Some(slot) = self.slots.get(guild).await else {
                tracing::debug!(%guild, "speech follow-up for a finished expulsion, dropping");
                return;
            };
            let mut s = slot.lock().await;
            if s.closed {
                return;
            }
            match s.machine.speech_finished() {
                Ok(_) => self.open_ballot(&mut s, guild).await,
                Err(e) => tracing::warn!(%guild, error = %e, "speech follow-up out of order"),
            }
        })
    }

    async fn expel(self: &Arc<Self>, s: &mut ExpulsionSession, guild: GuildId, seat: SeatId) {
        let bound = match self.platform.roster.players(guild).await {
            Ok(players) => players
                .iter()
                .find(|p| p.seat == seat)
                .is_some_and(|p| p.actor.is_some()),
            Err(e) => {
                tracing::warn!(%guild, error = %e, "roster unavailable at expulsion");
                false
            }
        };

        self.announce(
            s.channel,
            guild,
            format!("The vote falls on seat {seat}. They are out of the game."),
        )
        .await;
        if let Err(e) = self.platform.roster.eliminate(guild, seat).await {
            tracing::error!(%guild, %seat, error = %e, "failed to persist the expulsion");
        }
        self.hub.publish(&GameEvent::ExpulsionDecided { guild, seat });
        self.metrics.expulsions_decided.inc();
        tracing::info!(%guild, %seat, "expulsion decided");

        // Poll bookkeeping closes now; the floor stays claimed while the
        // expelled seat gets its last words.
        let on_complete = s.on_complete.take();
        let channel = s.channel;
        self.close_slot(s, guild).await;

        if self.params.last_words_after_expulsion && bound {
            let conclusion = self.conclusion(guild, on_complete);
            if let Err(e) = self
                .speeches
                .start_owned_round(guild, channel, TurnPurpose::LastWords, vec![seat], conclusion)
                .await
            {
                // The conclusion already ran inside the failed start.
                tracing::warn!(%guild, %seat, error = %e, "last words could not start");
            }
            return;
        }
        self.conclude(guild, on_complete).await;
    }

    async fn abandon(&self, s: &mut ExpulsionSession, guild: GuildId, reason: AbandonReason) {
        self.announce(
            s.channel,
            guild,
            format!("The expulsion poll ends with nobody out: {reason}."),
        )
        .await;
        self.hub
            .publish(&GameEvent::ExpulsionAbandoned { guild, reason });
        self.metrics.expulsions_abandoned.inc();
        tracing::info!(%guild, %reason, "expulsion abandoned");

        let on_complete = s.on_complete.take();
        self.close_slot(s, guild).await;
        self.conclude(guild, on_complete).await;
    }

    async fn close_slot(&self, s: &mut ExpulsionSession, guild: GuildId) {
        s.closed = true;
        if let Some(timer) = s.timer.take() {
            timer.cancel();
        }
        self.slots.remove(guild).await;
        self.metrics.active_polls.dec();
    }

    async fn conclude(&self, guild: GuildId, on_complete: Option<PollFollowup>) {
        self.engagements.release(guild).await;
        if let Some(f) = on_complete {
            f();
        }
    }

    /// The deferred form of [`Self::conclude`], run when the last-words round
    /// tears down: release the floor first, then hand control back.
    fn conclusion(&self, guild: GuildId, on_complete: Option<PollFollowup>) -> RoundFollowup {
        let engagements = self.engagements.clone();
        Box::new(move || {
            tokio::spawn(async move {
                engagements.release(guild).await;
                if let Some(f) = on_complete {
                    f();
                }
            });
        })
    }

    // ── Player operations ───────────────────────────────────────────────

    /// Toggle the caller's ballot onto `target` during the voting window.
    pub async fn toggle_vote(
        &self,
        session: SessionRef,
        actor: ActorId,
        target: SeatId,
    ) -> Result<BallotReceipt, EngineError> {
        let guild = session.guild;
        let players = self.platform.roster.players(guild).await?;
        let voter = living_seat(&players, actor)?;

        let slot = self.live_slot(guild).await?;
        let mut s = slot.lock().await;
        check_session(&s, session)?;

        let receipt = s.machine.toggle_vote(actor, voter.seat, target)?;
        self.metrics.ballots_cast.inc();
        self.hub.publish(&GameEvent::BallotActivity {
            guild,
            poll: PollKind::Expulsion,
            ballots: s.machine.ballots().ballot_count(),
        });
        let text = ballot_text(s.machine.ballots(), s.machine.is_pk_round());
        self.update_prompt(&mut s, guild, text).await;
        Ok(receipt)
    }

    /// Snapshot of the guild's running expulsion poll.
    pub async fn status(&self, guild: GuildId) -> Result<ExpulsionStatus, EngineError> {
        let slot = self.live_slot(guild).await?;
        let s = slot.lock().await;
        if s.closed {
            return Err(ValidationError::PollNotActive(PollKind::Expulsion).into());
        }

        let candidates = s
            .machine
            .ballots()
            .candidates()
            .map(|c| CandidateStatus {
                seat: c.seat,
                quit: c.quit,
                pk: c.pk,
            })
            .collect();
        Ok(ExpulsionStatus {
            stage: s.machine.stage().as_stage(),
            pk_round: s.machine.is_pk_round(),
            closes_at: s.closes_at,
            remaining_secs: s.closes_at.remaining_at(Timestamp::now()),
            candidates,
            ballots: s.machine.ballots().ballot_count(),
        })
    }

    /// Whether the guild has a live expulsion poll.
    pub async fn is_running(&self, guild: GuildId) -> bool {
        self.slots.get(guild).await.is_some()
    }

    pub(crate) async fn abort_all(&self) {
        let live = self.slots.len().await;
        self.slots.clear().await;
        self.metrics.active_polls.sub(live as i64);
    }

    async fn live_slot(
        &self,
        guild: GuildId,
    ) -> Result<Arc<tokio::sync::Mutex<ExpulsionSession>>, ValidationError> {
        self.slots
            .get(guild)
            .await
            .ok_or(ValidationError::PollNotActive(PollKind::Expulsion))
    }

    // ── Collaborator plumbing ───────────────────────────────────────────

    async fn post_prompt(&self, s: &mut ExpulsionSession, guild: GuildId, body: String) {
        match self.platform.messenger.post_prompt(s.channel, body).await {
            Ok(prompt) => s.prompt = Some(prompt),
            Err(e) => {
                tracing::warn!(%guild, error = %e, "failed to post expulsion prompt");
                s.prompt = None;
            }
        }
    }

    async fn update_prompt(&self, s: &mut ExpulsionSession, guild: GuildId, body: String) {
        let Some(prompt) = s.prompt else {
            return;
        };
        if let Err(e) = self.platform.messenger.update_prompt(prompt, body).await {
            tracing::warn!(%guild, error = %e, "failed to update expulsion prompt");
        }
    }

    async fn announce(&self, channel: ChannelId, guild: GuildId, body: String) {
        if let Err(e) = self.platform.messenger.announce(channel, body).await {
            tracing::warn!(%guild, error = %e, "expulsion announcement failed");
        }
    }

    async fn play_cue(&self, guild: GuildId, cue: Cue) {
        if let Err(e) = self.platform.cues.play(guild, cue).await {
            tracing::debug!(%guild, %cue, error = %e, "cue failed");
        }
    }
}

fn check_session(s: &ExpulsionSession, session: SessionRef) -> Result<(), ValidationError> {
    if s.closed {
        return Err(ValidationError::PollNotActive(PollKind::Expulsion));
    }
    if s.session.session != session.session {
        return Err(ValidationError::StaleSession);
    }
    Ok(())
}

fn seat_list(seats: &[SeatId]) -> String {
    let names: Vec<String> = seats.iter().map(|s| s.to_string()).collect();
    names.join(", ")
}

fn ballot_text(ballots: &BallotBox, pk_round: bool) -> String {
    let header = if pk_round {
        "Tie-break ballot. Only the tied seats are up, and they sit this vote out."
    } else {
        "An expulsion poll is open. Toggle a seat to vote or abstain."
    };
    let mut lines = vec![String::from(header)];
    for c in ballots.candidates() {
        lines.push(format!("- seat {}", c.seat));
    }
    lines.push(format!("{} ballots cast.", ballots.ballot_count()));
    lines.join("\n")
}

fn tally_line(ballots: &BallotBox, weighted: Option<ActorId>) -> String {
    let parts: Vec<String> = ballots
        .candidates()
        .map(|c| format!("seat {} ({})", c.seat, c.votes(weighted)))
        .collect();
    format!("Final tally: {}.", parts.join(", "))
}
