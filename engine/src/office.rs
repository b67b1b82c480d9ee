//! The office hand-over driver: a short window in which a departing
//! office-holder names a successor or the badge is destroyed.
//!
//! Thin compared to the poll drivers: one timed window, one decision, no
//! re-arm. The deadline path and the explicit decisions race on the slot
//! lock; whoever closes the window first wins and the rest no-op.

use std::sync::Arc;
use std::time::Duration;

use moot_election::OfficeTransfer;
use moot_types::{
    ActorId, ChannelId, GameEvent, GameParams, GuildId, MessageRef, SeatId, SessionRef,
    Timestamp, ValidationError,
};

use crate::error::EngineError;
use crate::hub::EventHub;
use crate::registry::{Engagement, Engagements, SessionSlots};
use crate::timer::StageTimer;
use crate::traits::{any_seat, living_seats, Platform};

struct TransferSession {
    session: SessionRef,
    channel: ChannelId,
    transfer: OfficeTransfer,
    timer: Option<StageTimer>,
    closes_at: Timestamp,
    prompt: Option<MessageRef>,
    closed: bool,
}

/// Drives office hand-overs, one per guild at a time.
pub struct OfficeEngine {
    params: GameParams,
    platform: Platform,
    hub: Arc<EventHub>,
    engagements: Arc<Engagements>,
    slots: SessionSlots<TransferSession>,
}

impl OfficeEngine {
    pub(crate) fn new(
        params: GameParams,
        platform: Platform,
        hub: Arc<EventHub>,
        engagements: Arc<Engagements>,
    ) -> Arc<Self> {
        Arc::new(Self {
            params,
            platform,
            hub,
            engagements,
            slots: SessionSlots::new(),
        })
    }

    /// Open the hand-over window for the guild's current office-holder.
    ///
    /// The holder may be dead already (a dying officer is exactly who this
    /// is for); the successors offered are the living seats. On timeout the
    /// badge is destroyed.
    pub async fn start(
        self: &Arc<Self>,
        session: SessionRef,
        channel: ChannelId,
    ) -> Result<(), EngineError> {
        let guild = session.guild;
        let players = self.platform.roster.players(guild).await?;
        let holder = players
            .iter()
            .find(|p| p.officer)
            .map(|p| p.seat)
            .ok_or(ValidationError::NotOfficeHolder)?;
        let eligible = living_seats(&players);

        self.engagements.claim(guild, Engagement::Office).await?;

        let state = TransferSession {
            session,
            channel,
            transfer: OfficeTransfer::new(holder, eligible),
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

        let mut s = slot.lock().await;
        s.closes_at = Timestamp::now().plus_secs(self.params.transfer_secs);
        let body = transfer_text(&s.transfer, self.params.transfer_secs);
        match self.platform.messenger.post_prompt(channel, body).await {
            Ok(prompt) => s.prompt = Some(prompt),
            Err(e) => {
                tracing::warn!(%guild, error = %e, "failed to post transfer prompt");
            }
        }

        let on_deadline = {
            let engine = self.clone();
            async move { engine.window_elapsed(guild).await }
        };
        s.timer = Some(StageTimer::spawn(
            Duration::from_secs(self.params.transfer_secs),
            on_deadline,
        ));
        tracing::info!(%guild, %holder, "office transfer window opened");
        Ok(())
    }

    async fn window_elapsed(self: Arc<Self>, guild: GuildId) {
        let Some(slot) = self.slots.get(guild).await else {
            return;
        };
        let mut s = slot.lock().await;
        if s.closed {
            return;
        }
        tracing::info!(%guild, "transfer window expired, destroying the office");
        self.note(&s, guild, "No hand-over in time. The office is destroyed.".into())
            .await;
        self.apply(&mut s, guild, None).await;
    }

    /// The departing holder names their successor.
    pub async fn choose_successor(
        &self,
        session: SessionRef,
        actor: ActorId,
        seat: SeatId,
    ) -> Result<(), EngineError> {
        let guild = session.guild;
        let players = self.platform.roster.players(guild).await?;
        // The departing holder is often dead by now; any bound seat counts.
        let caller = any_seat(&players, actor)?;

        let slot = self.live_slot(guild).await?;
        let mut s = slot.lock().await;
        check_session(&s, session)?;

        let successor = s.transfer.choose(caller.seat, seat)?;
        self.note(&s, guild, format!("The office passes to seat {successor}."))
            .await;
        self.apply(&mut s, guild, Some(successor)).await;
        Ok(())
    }

    /// The departing holder destroys the badge instead.
    pub async fn destroy_office(
        &self,
        session: SessionRef,
        actor: ActorId,
    ) -> Result<(), EngineError> {
        let guild = session.guild;
        let players = self.platform.roster.players(guild).await?;
        let caller = any_seat(&players, actor)?;

        let slot = self.live_slot(guild).await?;
        let mut s = slot.lock().await;
        check_session(&s, session)?;

        s.transfer.destroy(caller.seat)?;
        self.note(&s, guild, "The office is destroyed.".into()).await;
        self.apply(&mut s, guild, None).await;
        Ok(())
    }

    /// Persist the decision on the roster and tear the window down.
    async fn apply(&self, s: &mut TransferSession, guild: GuildId, holder: Option<SeatId>) {
        if let Err(e) = self.platform.roster.set_officer(guild, holder).await {
            tracing::error!(%guild, ?holder, error = %e, "failed to persist the office change");
        }
        self.hub.publish(&GameEvent::OfficeChanged { guild, holder });

        s.closed = true;
        if let Some(timer) = s.timer.take() {
            timer.cancel();
        }
        self.slots.remove(guild).await;
        self.engagements.release(guild).await;
        tracing::info!(%guild, ?holder, "office transfer settled");
    }

    /// Whether the guild has a pending hand-over.
    pub async fn is_running(&self, guild: GuildId) -> bool {
        self.slots.get(guild).await.is_some()
    }

    pub(crate) async fn abort_all(&self) {
        self.slots.clear().await;
    }

    async fn note(&self, s: &TransferSession, guild: GuildId, body: String) {
        let result = match s.prompt {
            Some(prompt) => self.platform.messenger.reply(prompt, body).await,
            None => self.platform.messenger.announce(s.channel, body).await,
        };
        if let Err(e) = result {
            tracing::warn!(%guild, error = %e, "transfer note failed");
        }
    }

    async fn live_slot(
        &self,
        guild: GuildId,
    ) -> Result<Arc<tokio::sync::Mutex<TransferSession>>, ValidationError> {
        self.slots
            .get(guild)
            .await
            .ok_or(ValidationError::NoPendingTransfer)
    }
}

fn check_session(s: &TransferSession, session: SessionRef) -> Result<(), ValidationError> {
    if s.closed {
        return Err(ValidationError::NoPendingTransfer);
    }
    if s.session.session != session.session {
        return Err(ValidationError::StaleSession);
    }
    Ok(())
}

fn transfer_text(transfer: &OfficeTransfer, window_secs: u64) -> String {
    let mut text = format!(
        "Seat {} must hand over the office within {window_secs} seconds or it is destroyed.\n",
        transfer.holder()
    );
    if transfer.candidates().is_empty() {
        text.push_str("Nobody is eligible to take it.");
    } else {
        let names: Vec<String> = transfer.candidates().iter().map(|s| s.to_string()).collect();
        text.push_str(&format!("Eligible successors: seats {}.", names.join(", ")));
    }
    text
}
