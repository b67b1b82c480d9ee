//! Nullable roster — a thread-safe in-memory player table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use moot_engine::error::CollabError;
use moot_engine::traits::Roster;
use moot_types::{ActorId, GuildId, Player, SeatId};

/// An in-memory roster for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
///
/// Mutations are applied to the stored table and recorded for assertions.
pub struct NullRoster {
    tables: Mutex<HashMap<GuildId, Vec<Player>>>,
    eliminations: Mutex<Vec<(GuildId, SeatId)>>,
    officer_changes: Mutex<Vec<(GuildId, Option<SeatId>)>>,
    failing: AtomicBool,
}

impl NullRoster {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            eliminations: Mutex::new(Vec::new()),
            officer_changes: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Seat a table of players for a guild, replacing any previous table.
    pub fn seat(&self, guild: GuildId, players: Vec<Player>) {
        self.tables.lock().unwrap().insert(guild, players);
    }

    /// Seat `count` living players bound to actors: seat `n` gets actor
    /// `n * 10`, counting from 1.
    pub fn seat_bound(&self, guild: GuildId, count: u32) {
        let players = (1..=count)
            .map(|n| Player::bound(SeatId::new(n), ActorId::new(u64::from(n) * 10)))
            .collect();
        self.seat(guild, players);
    }

    /// The guild's current table (for assertions).
    pub fn table(&self, guild: GuildId) -> Vec<Player> {
        self.tables
            .lock()
            .unwrap()
            .get(&guild)
            .cloned()
            .unwrap_or_default()
    }

    /// Every elimination applied so far, in order.
    pub fn eliminations(&self) -> Vec<(GuildId, SeatId)> {
        self.eliminations.lock().unwrap().clone()
    }

    /// Every officer change applied so far, in order.
    pub fn officer_changes(&self) -> Vec<(GuildId, Option<SeatId>)> {
        self.officer_changes.lock().unwrap().clone()
    }

    /// Make every roster call fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), CollabError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(CollabError::new("roster unavailable"));
        }
        Ok(())
    }
}

impl Default for NullRoster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Roster for NullRoster {
    async fn players(&self, guild: GuildId) -> Result<Vec<Player>, CollabError> {
        self.check_available()?;
        self.tables
            .lock()
            .unwrap()
            .get(&guild)
            .cloned()
            .ok_or_else(|| CollabError::new(format!("no table for guild {guild}")))
    }

    async fn eliminate(&self, guild: GuildId, seat: SeatId) -> Result<(), CollabError> {
        self.check_available()?;
        let mut tables = self.tables.lock().unwrap();
        let table = tables
            .get_mut(&guild)
            .ok_or_else(|| CollabError::new(format!("no table for guild {guild}")))?;
        if let Some(player) = table.iter_mut().find(|p| p.seat == seat) {
            player.alive = false;
        }
        self.eliminations.lock().unwrap().push((guild, seat));
        Ok(())
    }

    async fn set_officer(&self, guild: GuildId, seat: Option<SeatId>) -> Result<(), CollabError> {
        self.check_available()?;
        let mut tables = self.tables.lock().unwrap();
        let table = tables
            .get_mut(&guild)
            .ok_or_else(|| CollabError::new(format!("no table for guild {guild}")))?;
        for player in table.iter_mut() {
            player.officer = seat == Some(player.seat);
        }
        self.officer_changes.lock().unwrap().push((guild, seat));
        Ok(())
    }
}
