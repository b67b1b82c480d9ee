//! Succession window opened when the sitting officer dies or walks out.

use serde::{Deserialize, Serialize};

use moot_types::{SeatId, ValidationError};

/// A pending hand-over of the office.
///
/// The departing holder has one decision inside the window: name a living
/// successor or destroy the office. Either way the transfer is spent and any
/// later input is rejected.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OfficeTransfer {
    holder: SeatId,
    eligible: Vec<SeatId>,
    decided: bool,
}

impl OfficeTransfer {
    /// `eligible` is the set of living seats the office may pass to; the
    /// holder itself is never part of it.
    pub fn new(holder: SeatId, eligible: impl IntoIterator<Item = SeatId>) -> Self {
        let mut eligible: Vec<SeatId> = eligible.into_iter().filter(|&s| s != holder).collect();
        eligible.sort_unstable();
        eligible.dedup();
        Self {
            holder,
            eligible,
            decided: false,
        }
    }

    pub fn holder(&self) -> SeatId {
        self.holder
    }

    pub fn candidates(&self) -> &[SeatId] {
        &self.eligible
    }

    pub fn is_decided(&self) -> bool {
        self.decided
    }

    /// Hand the office to `to`. Only the departing holder may do this, once.
    pub fn choose(&mut self, by: SeatId, to: SeatId) -> Result<SeatId, ValidationError> {
        if by != self.holder {
            return Err(ValidationError::NotOfficeHolder);
        }
        if self.decided {
            return Err(ValidationError::AlreadyDecided);
        }
        if !self.eligible.contains(&to) {
            return Err(ValidationError::NotEligible);
        }
        self.decided = true;
        Ok(to)
    }

    /// Retire the office with no successor. The timeout path uses this too.
    pub fn destroy(&mut self, by: SeatId) -> Result<(), ValidationError> {
        if by != self.holder {
            return Err(ValidationError::NotOfficeHolder);
        }
        if self.decided {
            return Err(ValidationError::AlreadyDecided);
        }
        self.decided = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(n: u32) -> SeatId {
        SeatId::new(n)
    }

    fn transfer() -> OfficeTransfer {
        OfficeTransfer::new(seat(1), [seat(2), seat(3)])
    }

    #[test]
    fn holder_names_a_successor() {
        let mut t = transfer();
        assert_eq!(t.choose(seat(1), seat(3)), Ok(seat(3)));
        assert!(t.is_decided());
    }

    #[test]
    fn only_the_holder_decides() {
        let mut t = transfer();
        assert_eq!(
            t.choose(seat(2), seat(3)),
            Err(ValidationError::NotOfficeHolder)
        );
        assert_eq!(t.destroy(seat(2)), Err(ValidationError::NotOfficeHolder));
    }

    #[test]
    fn successor_must_be_eligible() {
        let mut t = transfer();
        assert_eq!(
            t.choose(seat(1), seat(9)),
            Err(ValidationError::NotEligible)
        );
        // The holder cannot pass the office to itself.
        assert_eq!(
            t.choose(seat(1), seat(1)),
            Err(ValidationError::NotEligible)
        );
    }

    #[test]
    fn the_window_is_spent_after_one_decision() {
        let mut t = transfer();
        t.destroy(seat(1)).unwrap();
        assert_eq!(
            t.choose(seat(1), seat(2)),
            Err(ValidationError::AlreadyDecided)
        );
        assert_eq!(t.destroy(seat(1)), Err(ValidationError::AlreadyDecided));
    }
}
