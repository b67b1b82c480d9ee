//! The speech round driver: seats speakers, runs their countdowns, and
//! handles skips, interrupts, pauses, and extensions.
//!
//! A round is a [`TurnQueue`] plus one armed [`StageTimer`] for the current
//! speaker. Every way a turn can end (timeout, skip, interrupt vote, admin
//! override) funnels into the same advance path; an epoch counter per round
//! makes a stale deadline task lose the race cleanly instead of advancing a
//! turn that already ended.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use moot_turns::{speaking_order, Direction, InterruptVote, TurnQueue};
use moot_types::{
    ActorId, ChannelId, Cue, GameEvent, GameParams, GuildId, MessageRef, Player, SeatId,
    Timestamp, ValidationError,
};

use crate::error::EngineError;
use crate::hub::EventHub;
use crate::metrics::EngineMetrics;
use crate::registry::{Engagement, Engagements, SessionSlots};
use crate::timer::StageTimer;
use crate::traits::{any_seat, living_seat, living_seats, Platform};

/// Why a speech round is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPurpose {
    /// Free-standing daytime discussion round.
    Daytime,
    /// Campaign speeches inside an election.
    Campaign,
    /// Tie-break speeches inside a PK re-vote.
    Runoff,
    /// A single turn for an expelled or departing player.
    LastWords,
}

impl fmt::Display for TurnPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPurpose::Daytime => "daytime",
            TurnPurpose::Campaign => "campaign",
            TurnPurpose::Runoff => "runoff",
            TurnPurpose::LastWords => "last_words",
        };
        write!(f, "{name}")
    }
}

/// Ran exactly once when the round tears down, unless the round is aborted
/// with the follow-up suppressed. Poll drivers use this to continue their
/// state machine after campaign or runoff speeches.
pub type RoundFollowup = Box<dyn FnOnce() + Send + 'static>;

/// Result of one accepted interrupt toggle.
#[derive(Clone, Debug, Serialize)]
pub struct InterruptStatus {
    /// Whether the toggle cast or retracted the caller's vote.
    #[serde(skip)]
    pub vote: InterruptVote,
    /// Votes currently standing against the speaker.
    pub votes: usize,
    /// Votes still missing for a strict majority of the living.
    pub needed: usize,
    /// Whether this toggle pushed the vote over the threshold.
    pub passed: bool,
}

/// Snapshot of a running round, for status queries.
#[derive(Clone, Debug, Serialize)]
pub struct SpeechStatus {
    pub purpose: TurnPurpose,
    pub current: Option<SeatId>,
    pub deadline: Timestamp,
    pub remaining_secs: u64,
    pub paused: bool,
    pub queued: Vec<SeatId>,
    pub interrupt_votes: usize,
    pub interrupt_voters: Vec<SeatId>,
}

struct SpeechRound {
    channel: ChannelId,
    purpose: TurnPurpose,
    /// Whether this round holds the guild's engagement claim itself (daytime
    /// and free-standing last words) or rides a poll's claim.
    owns_claim: bool,
    queue: TurnQueue,
    /// Bumped every time a turn timer is (re)armed; deadline tasks carry the
    /// epoch they were armed under and no-op on mismatch.
    epoch: u64,
    timer: Option<StageTimer>,
    deadline: Timestamp,
    duration_secs: u64,
    paused_remaining: Option<u64>,
    /// The prompt posted for the current speaker, replied to on interrupts.
    prompt: Option<MessageRef>,
    aborted: bool,
    closed: bool,
    followup: Option<RoundFollowup>,
}

/// Drives every speech round of every guild.
pub struct SpeechEngine {
    params: GameParams,
    platform: Platform,
    hub: Arc<EventHub>,
    metrics: Arc<EngineMetrics>,
    engagements: Arc<Engagements>,
    slots: SessionSlots<SpeechRound>,
}

impl SpeechEngine {
    pub(crate) fn new(
        params: GameParams,
        platform: Platform,
        hub: Arc<EventHub>,
        metrics: Arc<EngineMetrics>,
        engagements: Arc<Engagements>,
    ) -> Arc<Self> {
        Arc::new(Self {
            params,
            platform,
            hub,
            metrics,
            engagements,
            slots: SessionSlots::new(),
        })
    }

    // ── Starting rounds ─────────────────────────────────────────────────

    /// Start a discussion round over `seats`, ordered around `pivot`. With
    /// no explicit direction one is drawn at random. Claims the guild; fails
    /// while anything else runs.
    ///
    /// Returns the speaking order that was dealt.
    pub async fn start_speech_queue(
        self: &Arc<Self>,
        guild: GuildId,
        channel: ChannelId,
        seats: &[SeatId],
        pivot: SeatId,
        direction: Option<Direction>,
        on_complete: Option<RoundFollowup>,
    ) -> Result<Vec<SeatId>, EngineError> {
        let direction = direction.unwrap_or_else(Direction::random);
        let order = speaking_order(seats, pivot, direction);

        self.engagements.claim(guild, Engagement::Speech).await?;
        if let Err(e) = self
            .begin_round(
                guild,
                channel,
                TurnPurpose::Daytime,
                order.clone(),
                on_complete,
                true,
            )
            .await
        {
            self.engagements.release(guild).await;
            return Err(e);
        }
        tracing::info!(%guild, %pivot, %direction, speakers = order.len(), "speech round started");
        Ok(order)
    }

    /// Give one seat a free-standing last-words turn. Claims the guild.
    pub async fn start_last_words(
        self: &Arc<Self>,
        guild: GuildId,
        channel: ChannelId,
        seat: SeatId,
        on_complete: Option<RoundFollowup>,
    ) -> Result<(), EngineError> {
        self.engagements.claim(guild, Engagement::Speech).await?;
        if let Err(e) = self
            .begin_round(
                guild,
                channel,
                TurnPurpose::LastWords,
                vec![seat],
                on_complete,
                true,
            )
            .await
        {
            self.engagements.release(guild).await;
            return Err(e);
        }
        Ok(())
    }

    /// Start a round on behalf of a poll driver that already holds the
    /// guild's claim. The follow-up fires when the round tears down, or
    /// right away if the round cannot start, so the poll is never stranded.
    pub(crate) async fn start_owned_round(
        self: &Arc<Self>,
        guild: GuildId,
        channel: ChannelId,
        purpose: TurnPurpose,
        order: Vec<SeatId>,
        followup: RoundFollowup,
    ) -> Result<(), EngineError> {
        self.begin_round(guild, channel, purpose, order, Some(followup), false)
            .await
    }

    async fn begin_round(
        self: &Arc<Self>,
        guild: GuildId,
        channel: ChannelId,
        purpose: TurnPurpose,
        order: Vec<SeatId>,
        mut followup: Option<RoundFollowup>,
        owns_claim: bool,
    ) -> Result<(), EngineError> {
        let players = match self.platform.roster.players(guild).await {
            Ok(players) => players,
            Err(e) => {
                if let Some(f) = followup.take() {
                    f();
                }
                return Err(e.into());
            }
        };

        let round = SpeechRound {
            channel,
            purpose,
            owns_claim,
            queue: TurnQueue::from_order(order),
            epoch: 0,
            timer: None,
            deadline: Timestamp::EPOCH,
            duration_secs: 0,
            paused_remaining: None,
            prompt: None,
            aborted: false,
            closed: false,
            followup: None,
        };
        let slot = match self.slots.insert(guild, round).await {
            Ok(slot) => slot,
            Err(e) => {
                if let Some(f) = followup.take() {
                    f();
                }
                return Err(e.into());
            }
        };
        self.metrics.speech_rounds_started.inc();
        self.metrics.active_speech_rounds.inc();

        let mut s = slot.lock().await;
        s.followup = followup;
        self.seat_next(&mut s, guild, &players).await;
        Ok(())
    }

    // ── The advance path ────────────────────────────────────────────────

    /// End the current turn and seat the next speaker (or tear down).
    ///
    /// `expected_epoch` makes the call a no-op if the turn it targeted
    /// already ended; `interrupted` carries the seats whose votes forced the
    /// advance (empty for an admin override, `None` for a natural end).
    async fn advance_round(
        self: &Arc<Self>,
        guild: GuildId,
        expected_epoch: Option<u64>,
        interrupted: Option<Vec<SeatId>>,
    ) {
        let Some(slot) = self.slots.get(guild).await else {
            return;
        };
        let players = match self.platform.roster.players(guild).await {
            Ok(players) => players,
            Err(e) => {
                tracing::warn!(%guild, error = %e, "roster unavailable while advancing, ending round");
                Vec::new()
            }
        };

        let mut s = slot.lock().await;
        if s.closed {
            return;
        }
        if let Some(epoch) = expected_epoch {
            if s.epoch != epoch {
                return;
            }
        }
        self.end_current(&mut s, guild, &players, interrupted).await;
        self.seat_next(&mut s, guild, &players).await;
    }

    async fn end_current(
        &self,
        s: &mut SpeechRound,
        guild: GuildId,
        players: &[Player],
        interrupted: Option<Vec<SeatId>>,
    ) {
        if let Some(timer) = s.timer.take() {
            timer.cancel();
        }
        let Some(seat) = s.queue.current() else {
            return;
        };

        let spoken = match s.paused_remaining {
            Some(remaining) => s.duration_secs.saturating_sub(remaining),
            None => s
                .duration_secs
                .saturating_sub(s.deadline.remaining_at(Timestamp::now())),
        };
        self.metrics.turn_seconds.observe(spoken as f64);

        if self.params.mute_after_speech {
            if let Some(actor) = players
                .iter()
                .find(|p| p.seat == seat)
                .and_then(|p| p.actor)
            {
                if let Err(e) = self.platform.presence.set_muted(guild, actor, true).await {
                    tracing::warn!(%guild, %seat, error = %e, "failed to re-mute speaker");
                }
            }
        }

        if let Some(voters) = interrupted {
            self.hub
                .publish(&GameEvent::SpeechInterrupted { guild, seat, voters });
        }
    }

    async fn seat_next(self: &Arc<Self>, s: &mut SpeechRound, guild: GuildId, players: &[Player]) {
        loop {
            let Some(seat) = s.queue.advance() else {
                self.teardown(s, guild).await;
                return;
            };
            let Some(player) = players.iter().find(|p| p.seat == seat) else {
                tracing::debug!(%guild, %seat, "queued seat no longer at the table, skipping");
                continue;
            };
            if !player.alive && s.purpose != TurnPurpose::LastWords {
                tracing::debug!(%guild, %seat, "queued seat died while waiting, skipping");
                continue;
            }
            let Some(actor) = player.actor else {
                tracing::debug!(%guild, %seat, "queued seat has nobody bound, skipping");
                continue;
            };

            if let Err(e) = self.platform.presence.set_muted(guild, actor, false).await {
                tracing::warn!(%guild, %seat, error = %e, "failed to unmute speaker");
            }
            let duration = self.params.speech_duration_secs(player.officer);
            s.paused_remaining = None;
            s.duration_secs = duration;
            self.arm_turn_timer(s, guild, duration);

            let body = format!("Seat {seat} has the floor for {duration} seconds.");
            s.prompt = match self.platform.messenger.post_prompt(s.channel, body).await {
                Ok(prompt) => Some(prompt),
                Err(e) => {
                    tracing::warn!(%guild, %seat, error = %e, "speaker prompt failed");
                    None
                }
            };

            self.hub.publish(&GameEvent::SpeakerChanged {
                guild,
                seat,
                duration_secs: duration,
                deadline: s.deadline,
            });
            self.metrics.turns_taken.inc();
            tracing::debug!(%guild, %seat, duration, "speaker seated");
            return;
        }
    }

    fn arm_turn_timer(self: &Arc<Self>, s: &mut SpeechRound, guild: GuildId, secs: u64) {
        s.epoch += 1;
        let epoch = s.epoch;
        s.deadline = Timestamp::now().plus_secs(secs);

        let on_warning = {
            let engine = self.clone();
            async move { engine.turn_warning(guild, epoch).await }
        };
        let on_deadline = {
            let engine = self.clone();
            async move { engine.turn_elapsed(guild, epoch).await }
        };
        s.timer = Some(StageTimer::spawn_with_warning(
            Duration::from_secs(secs),
            Duration::from_secs(self.params.speech_warning_secs),
            on_warning,
            on_deadline,
        ));
    }

    async fn turn_warning(self: Arc<Self>, guild: GuildId, epoch: u64) {
        {
            let Some(slot) = self.slots.get(guild).await else {
                return;
            };
            let s = slot.lock().await;
            if s.closed || s.epoch != epoch || s.paused_remaining.is_some() {
                return;
            }
        }
        if let Err(e) = self.platform.cues.play(guild, Cue::ThirtySecondsLeft).await {
            tracing::debug!(%guild, error = %e, "turn warning cue failed");
        }
    }

    async fn turn_elapsed(self: Arc<Self>, guild: GuildId, epoch: u64) {
        {
            let Some(slot) = self.slots.get(guild).await else {
                return;
            };
            let s = slot.lock().await;
            if s.closed || s.epoch != epoch {
                return;
            }
        }
        if let Err(e) = self.platform.cues.play(guild, Cue::TimeUp).await {
            tracing::debug!(%guild, error = %e, "time-up cue failed");
        }
        self.advance_round(guild, Some(epoch), None).await;
    }

    async fn teardown(&self, s: &mut SpeechRound, guild: GuildId) {
        s.closed = true;
        if let Some(timer) = s.timer.take() {
            timer.cancel();
        }
        let event = if s.aborted {
            GameEvent::SpeechQueueAborted { guild }
        } else {
            GameEvent::SpeechQueueFinished { guild }
        };
        self.hub.publish(&event);
        self.metrics.active_speech_rounds.dec();
        self.slots.remove(guild).await;
        if s.owns_claim {
            self.engagements.release(guild).await;
        }
        tracing::info!(%guild, purpose = %s.purpose, aborted = s.aborted, "speech round over");
        if let Some(followup) = s.followup.take() {
            followup();
        }
    }

    // ── Turn controls ───────────────────────────────────────────────────

    /// The current speaker yields the rest of their time.
    pub async fn skip_current(
        self: &Arc<Self>,
        guild: GuildId,
        actor: ActorId,
    ) -> Result<(), EngineError> {
        let players = self.platform.roster.players(guild).await?;
        let slot = self.live_slot(guild).await?;

        let epoch = {
            let s = slot.lock().await;
            check_open(&s)?;
            let current = s.queue.current().ok_or(ValidationError::NoActiveTurn)?;
            // Last-words speakers are dead, so dead seats may skip too.
            let player = any_seat(&players, actor)?;
            if player.seat != current {
                return Err(ValidationError::NotCurrentSpeaker.into());
            }
            s.epoch
        };
        tracing::info!(%guild, "current speaker skipped");
        self.advance_round(guild, Some(epoch), None).await;
        Ok(())
    }

    /// Toggle the caller's interrupt vote against the current speaker. A
    /// strict majority of the living ends the turn on the spot.
    pub async fn vote_interrupt(
        self: &Arc<Self>,
        guild: GuildId,
        actor: ActorId,
    ) -> Result<InterruptStatus, EngineError> {
        let players = self.platform.roster.players(guild).await?;
        let voter = living_seat(&players, actor)?;
        let living = living_seats(&players).len();
        let slot = self.live_slot(guild).await?;

        let mut passed_with = None;
        let status = {
            let mut s = slot.lock().await;
            check_open(&s)?;
            let current = s.queue.current().ok_or(ValidationError::NoActiveTurn)?;
            if voter.seat == current {
                return Err(ValidationError::SpeakerSelfInterrupt.into());
            }
            let vote = s.queue.toggle_interrupt(voter.seat);
            self.metrics.interrupt_votes.inc();

            let ballot = s.queue.interrupts();
            let status = InterruptStatus {
                vote,
                votes: ballot.votes(),
                needed: ballot.needed(living),
                passed: ballot.passed(living),
            };
            if status.passed {
                passed_with = Some((s.epoch, ballot.voters().to_vec(), current, s.prompt));
            }
            status
        };

        if let Some((epoch, voters, current, prompt)) = passed_with {
            tracing::info!(%guild, seat = %current, votes = voters.len(), "interrupt vote passed");
            let names: Vec<String> = voters.iter().map(|v| v.to_string()).collect();
            let note = format!(
                "The table voted to interrupt seat {current} (seats {}).",
                names.join(", ")
            );
            self.note_round(guild, prompt, note).await;
            self.advance_round(guild, Some(epoch), Some(voters)).await;
        }
        Ok(status)
    }

    /// Admin override: end the current turn immediately.
    pub async fn force_advance_speaker(
        self: &Arc<Self>,
        guild: GuildId,
    ) -> Result<(), EngineError> {
        let slot = self.live_slot(guild).await?;
        let (epoch, prompt) = {
            let s = slot.lock().await;
            check_open(&s)?;
            s.queue.current().ok_or(ValidationError::NoActiveTurn)?;
            (s.epoch, s.prompt)
        };
        self.note_round(guild, prompt, "The speaker was sent off the stage.".into())
            .await;
        self.advance_round(guild, Some(epoch), Some(Vec::new()))
            .await;
        Ok(())
    }

    /// Admin override: abort the whole round. With `fire_followup` false the
    /// owning poll's follow-up is suppressed, for hosts tearing down the
    /// poll alongside the round.
    pub async fn interrupt_all(
        self: &Arc<Self>,
        guild: GuildId,
        fire_followup: bool,
    ) -> Result<(), EngineError> {
        let slot = self.live_slot(guild).await?;
        let (epoch, channel) = {
            let mut s = slot.lock().await;
            check_open(&s)?;
            s.queue.clear_remaining();
            s.aborted = true;
            if !fire_followup {
                s.followup = None;
            }
            (s.epoch, s.channel)
        };
        tracing::info!(%guild, fire_followup, "speech round aborted by admin");
        if let Err(e) = self
            .platform
            .messenger
            .announce(channel, "The speech round was cut short.".into())
            .await
        {
            tracing::warn!(%guild, error = %e, "abort announcement failed");
        }
        self.advance_round(guild, Some(epoch), Some(Vec::new()))
            .await;
        Ok(())
    }

    /// Freeze the current speaker's countdown.
    pub async fn pause(&self, guild: GuildId) -> Result<(), EngineError> {
        let slot = self.live_slot(guild).await?;
        let mut s = slot.lock().await;
        check_open(&s)?;
        s.queue.current().ok_or(ValidationError::NoActiveTurn)?;
        if s.paused_remaining.is_some() {
            return Err(ValidationError::AlreadyPaused.into());
        }
        if let Some(timer) = s.timer.take() {
            timer.cancel();
        }
        // Strand any deadline task already past its cancellation check.
        s.epoch += 1;
        let remaining = s.deadline.remaining_at(Timestamp::now());
        s.paused_remaining = Some(remaining);
        tracing::info!(%guild, remaining, "turn countdown paused");
        Ok(())
    }

    /// Restart a paused countdown with the time it had left.
    pub async fn resume(self: &Arc<Self>, guild: GuildId) -> Result<(), EngineError> {
        let slot = self.live_slot(guild).await?;
        let mut s = slot.lock().await;
        check_open(&s)?;
        let remaining = s
            .paused_remaining
            .take()
            .ok_or(ValidationError::NotPaused)?;
        self.arm_turn_timer(&mut s, guild, remaining);
        if let Some(seat) = s.queue.current() {
            self.hub.publish(&GameEvent::SpeechExtended {
                guild,
                seat,
                deadline: s.deadline,
            });
        }
        tracing::info!(%guild, remaining, "turn countdown resumed");
        Ok(())
    }

    /// Grant the current speaker extra seconds, paused or not.
    pub async fn extend_current(
        self: &Arc<Self>,
        guild: GuildId,
        extra_secs: u64,
    ) -> Result<(), EngineError> {
        let slot = self.live_slot(guild).await?;
        let mut s = slot.lock().await;
        check_open(&s)?;
        let seat = s.queue.current().ok_or(ValidationError::NoActiveTurn)?;

        s.duration_secs = s.duration_secs.saturating_add(extra_secs);
        if let Some(remaining) = s.paused_remaining {
            s.paused_remaining = Some(remaining.saturating_add(extra_secs));
        } else {
            let remaining = s
                .deadline
                .remaining_at(Timestamp::now())
                .saturating_add(extra_secs);
            self.arm_turn_timer(&mut s, guild, remaining);
            self.hub.publish(&GameEvent::SpeechExtended {
                guild,
                seat,
                deadline: s.deadline,
            });
        }
        tracing::info!(%guild, %seat, extra_secs, "turn extended");
        Ok(())
    }

    /// Blanket mute control over every living seat. Best-effort per player.
    pub async fn set_all_muted(&self, guild: GuildId, muted: bool) -> Result<(), EngineError> {
        let players = self.platform.roster.players(guild).await?;
        for player in players.iter().filter(|p| p.alive) {
            if let Some(actor) = player.actor {
                if let Err(e) = self.platform.presence.set_muted(guild, actor, muted).await {
                    tracing::warn!(%guild, seat = %player.seat, error = %e, "mute change failed");
                }
            }
        }
        Ok(())
    }

    /// Snapshot of the guild's running round.
    pub async fn status(&self, guild: GuildId) -> Result<SpeechStatus, EngineError> {
        let slot = self.live_slot(guild).await?;
        let s = slot.lock().await;
        check_open(&s)?;
        let remaining_secs = s
            .paused_remaining
            .unwrap_or_else(|| s.deadline.remaining_at(Timestamp::now()));
        Ok(SpeechStatus {
            purpose: s.purpose,
            current: s.queue.current(),
            deadline: s.deadline,
            remaining_secs,
            paused: s.paused_remaining.is_some(),
            queued: s.queue.queued(),
            interrupt_votes: s.queue.interrupts().votes(),
            interrupt_voters: s.queue.interrupts().voters().to_vec(),
        })
    }

    /// Whether the guild has a live round.
    pub async fn is_running(&self, guild: GuildId) -> bool {
        self.slots.get(guild).await.is_some()
    }

    pub(crate) async fn abort_all(&self) {
        let live = self.slots.len().await;
        self.slots.clear().await;
        self.metrics.active_speech_rounds.sub(live as i64);
    }

    async fn note_round(&self, guild: GuildId, prompt: Option<MessageRef>, body: String) {
        let result = match prompt {
            Some(prompt) => self.platform.messenger.reply(prompt, body).await,
            None => {
                let Some(slot) = self.slots.get(guild).await else {
                    return;
                };
                let channel = slot.lock().await.channel;
                self.platform.messenger.announce(channel, body).await
            }
        };
        if let Err(e) = result {
            tracing::warn!(%guild, error = %e, "round note failed");
        }
    }

    async fn live_slot(
        &self,
        guild: GuildId,
    ) -> Result<Arc<tokio::sync::Mutex<SpeechRound>>, ValidationError> {
        self.slots
            .get(guild)
            .await
            .ok_or(ValidationError::NoActiveQueue)
    }
}

fn check_open(s: &SpeechRound) -> Result<(), ValidationError> {
    if s.closed {
        return Err(ValidationError::NoActiveQueue);
    }
    Ok(())
}
