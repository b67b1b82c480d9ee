//! The election driver: owns the stage timers, prompts, and side effects
//! around one guild's [`ElectionMachine`].
//!
//! The machine itself is pure; this driver opens the timed windows, closes
//! them when the deadline task fires, runs campaign and tie-break speeches
//! through the speech engine, and crowns the winner on the roster.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::Serialize;

use moot_election::{
    ElectionMachine, EnrollmentMove, EnrollmentOutcome, PollOutcome, SpeechAftermath,
    WithdrawalOutcome,
};
use moot_tally::{BallotBox, BallotReceipt};
use moot_turns::{speaking_order, Direction};
use moot_types::{
    AbandonReason, ActorId, ChannelId, Cue, GameEvent, GameParams, GuildId, MessageRef, PollKind,
    SeatId, SessionRef, Stage, Timestamp, ValidationError,
};

use crate::error::EngineError;
use crate::hub::EventHub;
use crate::metrics::EngineMetrics;
use crate::registry::{Engagement, Engagements, SessionSlots};
use crate::speech::{RoundFollowup, SpeechEngine, TurnPurpose};
use crate::timer::StageTimer;
use crate::traits::{living_seat, officer_actor, Platform};

/// One candidate row in an election status snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct CandidateStatus {
    pub seat: SeatId,
    pub quit: bool,
    pub pk: bool,
}

/// Snapshot of a running election, for status queries.
#[derive(Clone, Debug, Serialize)]
pub struct ElectionStatus {
    pub stage: Stage,
    pub pk_round: bool,
    pub closes_at: Timestamp,
    pub remaining_secs: u64,
    pub candidates: Vec<CandidateStatus>,
    pub ballots: u32,
}

struct ElectionSession {
    session: SessionRef,
    channel: ChannelId,
    machine: ElectionMachine,
    /// Bumped every time a stage window opens; deadline tasks carry the
    /// epoch they were armed under and no-op on mismatch.
    epoch: u64,
    timer: Option<StageTimer>,
    closes_at: Timestamp,
    prompt: Option<MessageRef>,
    closed: bool,
}

/// Drives every election of every guild.
pub struct ElectionEngine {
    params: GameParams,
    platform: Platform,
    hub: Arc<EventHub>,
    metrics: Arc<EngineMetrics>,
    engagements: Arc<Engagements>,
    speeches: Arc<SpeechEngine>,
    slots: SessionSlots<ElectionSession>,
}

impl ElectionEngine {
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

    /// Open an election: claim the guild and start the enrollment window.
    pub async fn start(
        self: &Arc<Self>,
        session: SessionRef,
        channel: ChannelId,
    ) -> Result<(), EngineError> {
        let guild = session.guild;
        self.engagements.claim(guild, Engagement::Election).await?;

        let state = ElectionSession {
            session,
            channel,
            machine: ElectionMachine::new(),
            epoch: 0,
            timer: None,
            closes_at: Timestamp::EPOCH,
            prompt: None,
            closed: false,
        };
        let slot = match self.slots.insert(guild, state).await {
            Ok(slot) => slot,
            Err(e) => {
                self.engagements.release(guild).await;
                return Err(e.into());
            }
        };
        self.metrics.elections_started.inc();
        self.metrics.active_polls.inc();

        let mut s = slot.lock().await;
        let text = enrollment_text(s.machine.ballots());
        self.post_prompt(&mut s, guild, text).await;
        self.play_cue(guild, Cue::EnrollmentOpen).await;
        self.open_stage(&mut s, guild, Stage::Enrollment, self.params.enrollment_secs);
        tracing::info!(%guild, "election started");
        Ok(())
    }

    fn open_stage(
        self: &Arc<Self>,
        s: &mut ElectionSession,
        guild: GuildId,
        stage: Stage,
        secs: u64,
    ) {
        s.epoch += 1;
        let epoch = s.epoch;
        s.closes_at = Timestamp::now().plus_secs(secs);

        let on_warning = {
            let engine = self.clone();
            async move { engine.stage_warning(guild, epoch).await }
        };
        let on_deadline = {
            let engine = self.clone();
            async move { engine.stage_elapsed(guild, stage, epoch).await }
        };
        s.timer = Some(StageTimer::spawn_with_warning(
            Duration::from_secs(secs),
            Duration::from_secs(self.params.stage_warning_secs),
            on_warning,
            on_deadline,
        ));
        self.hub.publish(&GameEvent::StageOpened {
            guild,
            stage,
            closes_at: s.closes_at,
        });
        tracing::debug!(%guild, %stage, secs, "election stage opened");
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

    async fn stage_elapsed(self: Arc<Self>, guild: GuildId, stage: Stage, epoch: u64) {
        match stage {
            Stage::Enrollment => self.close_enrollment(guild, Some(epoch)).await,
            Stage::Withdrawal => self.close_withdrawal(guild, Some(epoch)).await,
            Stage::Voting => self.close_voting(guild, Some(epoch)).await,
            // Speech rounds are ended by the speech engine, not a stage timer.
            Stage::Speech => {}
        }
    }

    async fn close_enrollment(self: &Arc<Self>, guild: GuildId, expected: Option<u64>) {
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

        let outcome = match s.machine.close_enrollment() {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(%guild, error = %e, "enrollment close out of order");
                return;
            }
        };
        match outcome {
            EnrollmentOutcome::Nobody => {
                self.abandon(&mut s, guild, AbandonReason::NoCandidates).await;
            }
            EnrollmentOutcome::Unopposed(winner) => {
                self.crown(&mut s, guild, winner, true).await;
            }
            EnrollmentOutcome::Contested(seats) => {
                let note = format!(
                    "Enrollment closed with seats {} in the race. Campaign speeches begin.",
                    seat_list(&seats)
                );
                self.announce(s.channel, guild, note).await;
                self.start_speeches(&mut s, guild, TurnPurpose::Campaign, &seats)
                    .await;
            }
        }
    }

    /// Campaign or tie-break speeches over `seats`, ordered around a random
    /// pivot in a random direction. The follow-up re-enters the machine.
    async fn start_speeches(
        self: &Arc<Self>,
        s: &mut ElectionSession,
        guild: GuildId,
        purpose: TurnPurpose,
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
                tokio::spawn(async move { engine.speeches_done(guild).await });
            })
        };
        if let Err(e) = self
            .speeches
            .start_owned_round(guild, s.channel, purpose, order, followup)
            .await
        {
            tracing::error!(%guild, error = %e, "failed to start election speeches");
        }
    }

    async fn speeches_done(self: Arc<Self>, guild: GuildId) {
        let Some(slot) = self.slots.get(guild).await else {
            tracing::debug!(%guild, "speech follow-up for a finished election, dropping");
            return;
        };
        let mut s = slot.lock().await;
        if s.closed {
            return;
        }
        match s.machine.speech_finished() {
            Ok(SpeechAftermath::OpenWithdrawal) => {
                let text = withdrawal_text(s.machine.ballots());
                self.post_prompt(&mut s, guild, text).await;
                self.open_stage(&mut s, guild, Stage::Withdrawal, self.params.withdrawal_secs);
            }
            Ok(SpeechAftermath::OpenBallot(_)) => {
                self.open_ballot(&mut s, guild).await;
            }
            Err(e) => tracing::warn!(%guild, error = %e, "speech follow-up out of order"),
        }
    }

    async fn close_withdrawal(self: &Arc<Self>, guild: GuildId, expected: Option<u64>) {
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

        match s.machine.close_withdrawal() {
            Ok(WithdrawalOutcome::AllQuit) => {
                self.abandon(&mut s, guild, AbandonReason::AllWithdrew).await;
            }
            Ok(WithdrawalOutcome::OpenBallot(_)) => {
                self.open_ballot(&mut s, guild).await;
            }
            Err(e) => tracing::warn!(%guild, error = %e, "withdrawal close out of order"),
        }
    }

    async fn open_ballot(self: &Arc<Self>, s: &mut ElectionSession, guild: GuildId) {
        let text = ballot_text(s.machine.ballots());
        self.post_prompt(s, guild, text).await;
        self.play_cue(guild, Cue::BallotOpen).await;
        self.open_stage(s, guild, Stage::Voting, self.params.ballot_secs);
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
            Ok(PollOutcome::Decided(winner)) => {
                self.crown(&mut s, guild, winner, false).await;
            }
            Ok(PollOutcome::Abandoned(reason)) => {
                self.abandon(&mut s, guild, reason).await;
            }
            Ok(PollOutcome::TieRunoff(seats)) => {
                self.hub.publish(&GameEvent::PkStarted {
                    guild,
                    poll: PollKind::Election,
                    seats: seats.clone(),
                });
                let note = format!(
                    "Seats {} are tied. One tie-break round: short speeches, then a fresh ballot.",
                    seat_list(&seats)
                );
                self.announce(s.channel, guild, note).await;
                self.start_speeches(&mut s, guild, TurnPurpose::Runoff, &seats)
                    .await;
            }
            Err(e) => tracing::warn!(%guild, error = %e, "ballot close out of order"),
        }
    }

    /// The identity whose ballot counts extra at this tally, if any.
    async fn weighted_elector(&self, guild: GuildId, pk_round: bool) -> Option<ActorId> {
        if pk_round && !self.params.weighted_election_runoff {
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

    async fn crown(&self, s: &mut ElectionSession, guild: GuildId, winner: SeatId, unopposed: bool) {
        if let Err(e) = self.platform.roster.set_officer(guild, Some(winner)).await {
            tracing::error!(%guild, %winner, error = %e, "failed to persist the new officer");
        }
        let note = if unopposed {
            format!("Seat {winner} ran unopposed and takes office.")
        } else {
            format!("Seat {winner} wins the election and takes office.")
        };
        self.announce(s.channel, guild, note).await;
        self.hub.publish(&GameEvent::ElectionDecided {
            guild,
            winner,
            unopposed,
        });
        self.hub.publish(&GameEvent::OfficeChanged {
            guild,
            holder: Some(winner),
        });
        self.metrics.elections_decided.inc();
        tracing::info!(%guild, %winner, unopposed, "election decided");
        self.finish(s, guild).await;
    }

    async fn abandon(&self, s: &mut ElectionSession, guild: GuildId, reason: AbandonReason) {
        self.announce(
            s.channel,
            guild,
            format!("The election ends with no winner: {reason}."),
        )
        .await;
        self.hub
            .publish(&GameEvent::ElectionAbandoned { guild, reason });
        self.metrics.elections_abandoned.inc();
        tracing::info!(%guild, %reason, "election abandoned");
        self.finish(s, guild).await;
    }

    async fn finish(&self, s: &mut ElectionSession, guild: GuildId) {
        s.closed = true;
        if let Some(timer) = s.timer.take() {
            timer.cancel();
        }
        self.slots.remove(guild).await;
        self.engagements.release(guild).await;
        self.metrics.active_polls.dec();
    }

    // ── Player operations ───────────────────────────────────────────────

    /// Toggle the caller's candidacy (enrollment) or quit flag (withdrawal).
    pub async fn enroll_or_withdraw(
        &self,
        session: SessionRef,
        actor: ActorId,
    ) -> Result<EnrollmentMove, EngineError> {
        let guild = session.guild;
        let players = self.platform.roster.players(guild).await?;
        let player = living_seat(&players, actor)?;

        let slot = self.live_slot(guild).await?;
        let mut s = slot.lock().await;
        check_session(&s, session)?;

        let moved = s.machine.enroll_toggle(player.seat)?;
        let event = match moved {
            EnrollmentMove::Entered => GameEvent::CandidateEnrolled {
                guild,
                seat: player.seat,
            },
            EnrollmentMove::Withdrew => GameEvent::CandidateWithdrew {
                guild,
                seat: player.seat,
            },
            EnrollmentMove::Quit => GameEvent::CandidateQuit {
                guild,
                seat: player.seat,
            },
        };
        self.hub.publish(&event);

        let text = match s.machine.stage() {
            Stage::Enrollment => enrollment_text(s.machine.ballots()),
            _ => withdrawal_text(s.machine.ballots()),
        };
        self.update_prompt(&mut s, guild, text).await;
        Ok(moved)
    }

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
            poll: PollKind::Election,
            ballots: s.machine.ballots().ballot_count(),
        });
        let text = ballot_text(s.machine.ballots());
        self.update_prompt(&mut s, guild, text).await;
        Ok(receipt)
    }

    /// Admin override: close the current waiting window right now.
    ///
    /// Valid during enrollment and withdrawal; speeches are ended through
    /// the speech engine and an open ballot closes on its own timer.
    pub async fn force_start_voting(self: &Arc<Self>, session: SessionRef) -> Result<(), EngineError> {
        let guild = session.guild;
        let (stage, epoch) = {
            let slot = self.live_slot(guild).await?;
            let s = slot.lock().await;
            check_session(&s, session)?;
            (s.machine.stage(), s.epoch)
        };
        match stage {
            Stage::Enrollment => {
                tracing::info!(%guild, "enrollment window cut short by admin");
                self.close_enrollment(guild, Some(epoch)).await;
                Ok(())
            }
            Stage::Withdrawal => {
                tracing::info!(%guild, "withdrawal window cut short by admin");
                self.close_withdrawal(guild, Some(epoch)).await;
                Ok(())
            }
            stage => Err(ValidationError::WrongStage(stage).into()),
        }
    }

    /// Snapshot of the guild's running election.
    pub async fn status(&self, guild: GuildId) -> Result<ElectionStatus, EngineError> {
        let slot = self.live_slot(guild).await?;
        let s = slot.lock().await;
        if s.closed {
            return Err(ValidationError::PollNotActive(PollKind::Election).into());
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
        Ok(ElectionStatus {
            stage: s.machine.stage(),
            pk_round: s.machine.is_pk_round(),
            closes_at: s.closes_at,
            remaining_secs: s.closes_at.remaining_at(Timestamp::now()),
            candidates,
            ballots: s.machine.ballots().ballot_count(),
        })
    }

    /// Whether the guild has a live election.
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
    ) -> Result<Arc<tokio::sync::Mutex<ElectionSession>>, ValidationError> {
        self.slots
            .get(guild)
            .await
            .ok_or(ValidationError::PollNotActive(PollKind::Election))
    }

    // ── Collaborator plumbing ───────────────────────────────────────────

    async fn post_prompt(&self, s: &mut ElectionSession, guild: GuildId, body: String) {
        match self.platform.messenger.post_prompt(s.channel, body).await {
            Ok(prompt) => s.prompt = Some(prompt),
            Err(e) => {
                tracing::warn!(%guild, error = %e, "failed to post election prompt");
                s.prompt = None;
            }
        }
    }

    async fn update_prompt(&self, s: &mut ElectionSession, guild: GuildId, body: String) {
        let Some(prompt) = s.prompt else {
            return;
        };
        if let Err(e) = self.platform.messenger.update_prompt(prompt, body).await {
            tracing::warn!(%guild, error = %e, "failed to update election prompt");
        }
    }

    async fn announce(&self, channel: ChannelId, guild: GuildId, body: String) {
        if let Err(e) = self.platform.messenger.announce(channel, body).await {
            tracing::warn!(%guild, error = %e, "election announcement failed");
        }
    }

    async fn play_cue(&self, guild: GuildId, cue: Cue) {
        if let Err(e) = self.platform.cues.play(guild, cue).await {
            tracing::debug!(%guild, %cue, error = %e, "cue failed");
        }
    }
}

fn check_session(s: &ElectionSession, session: SessionRef) -> Result<(), ValidationError> {
    if s.closed {
        return Err(ValidationError::PollNotActive(PollKind::Election));
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

fn enrollment_text(ballots: &BallotBox) -> String {
    let mut text =
        String::from("An election is open. Toggle your candidacy while enrollment lasts.\n");
    if ballots.is_empty() {
        text.push_str("No candidates yet.");
    } else {
        text.push_str(&format!("In the race: seats {}.", seat_list(&ballots.seats())));
    }
    text
}

fn withdrawal_text(ballots: &BallotBox) -> String {
    let mut lines = vec![String::from(
        "Last chance to bow out. Candidates may toggle to quit the race.",
    )];
    for c in ballots.candidates() {
        if c.quit {
            lines.push(format!("- seat {} (quit)", c.seat));
        } else {
            lines.push(format!("- seat {}", c.seat));
        }
    }
    lines.join("\n")
}

fn ballot_text(ballots: &BallotBox) -> String {
    let mut lines = vec![String::from("Cast your ballot. Toggle a seat to vote or abstain.")];
    for c in ballots.candidates() {
        if c.quit {
            lines.push(format!("- seat {} (quit)", c.seat));
        } else {
            lines.push(format!("- seat {}", c.seat));
        }
    }
    lines.push(format!("{} ballots cast.", ballots.ballot_count()));
    lines.join("\n")
}

fn tally_line(ballots: &BallotBox, weighted: Option<ActorId>) -> String {
    let parts: Vec<String> = ballots
        .candidates()
        .filter(|c| !c.quit)
        .map(|c| format!("seat {} ({})", c.seat, c.votes(weighted)))
        .collect();
    format!("Final tally: {}.", parts.join(", "))
}
