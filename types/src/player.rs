//! The player model shared with the external roster.

use serde::{Deserialize, Serialize};

use crate::id::{ActorId, SeatId};

/// One seat at the table and the participant bound to it.
///
/// Players are owned by the external roster; the engine reads them and
/// mutates them only through the roster collaborator. A seat without a bound
/// actor is an empty chair (pre-game) and never speaks or votes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Table seat number.
    pub seat: SeatId,
    /// The platform identity sitting here, if anyone has claimed the seat.
    pub actor: Option<ActorId>,
    /// Dead players keep their seat but lose every speaking and voting right.
    pub alive: bool,
    /// Whether this player currently holds the elected office.
    pub officer: bool,
}

impl Player {
    pub fn new(seat: SeatId) -> Self {
        Self {
            seat,
            actor: None,
            alive: true,
            officer: false,
        }
    }

    pub fn bound(seat: SeatId, actor: ActorId) -> Self {
        Self {
            seat,
            actor: Some(actor),
            alive: true,
            officer: false,
        }
    }

    /// Whether the given platform identity is sitting in this seat.
    pub fn is_bound_to(&self, actor: ActorId) -> bool {
        self.actor == Some(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_player_matches_its_actor() {
        let p = Player::bound(SeatId::new(3), ActorId::new(42));
        assert!(p.is_bound_to(ActorId::new(42)));
        assert!(!p.is_bound_to(ActorId::new(43)));
    }

    #[test]
    fn unbound_player_matches_no_actor() {
        let p = Player::new(SeatId::new(3));
        assert!(!p.is_bound_to(ActorId::new(42)));
    }
}
