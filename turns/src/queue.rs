//! The per-guild turn queue: who holds the floor and who is still waiting.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use moot_types::SeatId;

use crate::interrupt::{InterruptBallot, InterruptVote};

/// Ordered speakers for one speech round.
///
/// The queue knows nothing about time: the engine driver owns the deadline
/// task and calls [`TurnQueue::advance`] when a turn ends for any reason.
/// The interrupt ballot belongs to the current turn and is cleared on every
/// advance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnQueue {
    remaining: VecDeque<SeatId>,
    current: Option<SeatId>,
    interrupts: InterruptBallot,
}

impl TurnQueue {
    /// Queue over a prebuilt speaking order (see [`crate::speaking_order`]).
    pub fn from_order(order: Vec<SeatId>) -> Self {
        Self {
            remaining: order.into(),
            current: None,
            interrupts: InterruptBallot::new(),
        }
    }

    /// Single-entry queue for a last-words turn.
    pub fn single(seat: SeatId) -> Self {
        Self::from_order(vec![seat])
    }

    /// End the current turn and seat the next speaker.
    ///
    /// Clears the interrupt ballot, pops the next entry into `current`, and
    /// returns it; `None` means the queue is exhausted and the session should
    /// tear down.
    pub fn advance(&mut self) -> Option<SeatId> {
        self.interrupts.clear();
        self.current = self.remaining.pop_front();
        self.current
    }

    pub fn current(&self) -> Option<SeatId> {
        self.current
    }

    /// Seats still waiting to speak, in speaking order.
    pub fn queued(&self) -> Vec<SeatId> {
        self.remaining.iter().copied().collect()
    }

    pub fn queued_len(&self) -> usize {
        self.remaining.len()
    }

    /// Drop everyone still waiting (abort path). The current speaker is
    /// unaffected; the driver stops their turn separately.
    pub fn clear_remaining(&mut self) {
        self.remaining.clear();
    }

    pub fn is_exhausted(&self) -> bool {
        self.current.is_none() && self.remaining.is_empty()
    }

    /// Toggle an interrupt vote from the given seat.
    pub fn toggle_interrupt(&mut self, seat: SeatId) -> InterruptVote {
        self.interrupts.toggle(seat)
    }

    pub fn interrupts(&self) -> &InterruptBallot {
        &self.interrupts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seats(ns: &[u32]) -> Vec<SeatId> {
        ns.iter().map(|&n| SeatId::new(n)).collect()
    }

    #[test]
    fn advance_walks_the_order_then_exhausts() {
        let mut queue = TurnQueue::from_order(seats(&[2, 1, 3]));
        assert_eq!(queue.advance(), Some(SeatId::new(2)));
        assert_eq!(queue.advance(), Some(SeatId::new(1)));
        assert_eq!(queue.advance(), Some(SeatId::new(3)));
        assert_eq!(queue.advance(), None);
        assert!(queue.is_exhausted());
    }

    #[test]
    fn advance_clears_the_interrupt_ballot() {
        let mut queue = TurnQueue::from_order(seats(&[1, 2]));
        queue.advance();
        queue.toggle_interrupt(SeatId::new(5));
        queue.toggle_interrupt(SeatId::new(6));
        assert_eq!(queue.interrupts().votes(), 2);

        queue.advance();
        assert_eq!(queue.interrupts().votes(), 0);
    }

    #[test]
    fn clear_remaining_keeps_current_speaker() {
        let mut queue = TurnQueue::from_order(seats(&[1, 2, 3]));
        queue.advance();
        queue.clear_remaining();
        assert_eq!(queue.current(), Some(SeatId::new(1)));
        assert_eq!(queue.queued_len(), 0);
        assert_eq!(queue.advance(), None);
    }

    #[test]
    fn single_queue_speaks_once() {
        let mut queue = TurnQueue::single(SeatId::new(9));
        assert_eq!(queue.advance(), Some(SeatId::new(9)));
        assert_eq!(queue.advance(), None);
    }
}
