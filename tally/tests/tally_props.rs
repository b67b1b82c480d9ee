use proptest::prelude::*;

use moot_tally::{BallotBox, VoteCount};
use moot_types::{ActorId, SeatId};

/// A small pool of seats and a random sequence of (voter, seat-index) toggles.
fn toggle_script() -> impl Strategy<Value = (Vec<u32>, Vec<(u64, usize)>)> {
    (
        prop::collection::btree_set(1u32..20, 2..8),
        prop::collection::vec((1u64..12, 0usize..8), 0..40),
    )
        .prop_map(|(seats, script)| (seats.into_iter().collect(), script))
}

fn run_script(seats: &[u32], script: &[(u64, usize)]) -> BallotBox {
    let mut ballots = BallotBox::with_candidates(seats.iter().map(|&n| SeatId::new(n)));
    for &(voter, idx) in script {
        let target = SeatId::new(seats[idx % seats.len()]);
        ballots
            .toggle_vote(ActorId::new(voter), target)
            .expect("target drawn from the candidate set");
    }
    ballots
}

proptest! {
    /// A voter never holds more than one ballot, whatever the toggle history.
    #[test]
    fn one_ballot_per_voter((seats, script) in toggle_script()) {
        let ballots = run_script(&seats, &script);
        for voter in 1u64..12 {
            let held = ballots
                .candidates()
                .filter(|c| c.has_elector(ActorId::new(voter)))
                .count();
            prop_assert!(held <= 1);
        }
    }

    /// Toggling the same target twice in a row always returns the voter to
    /// abstention, regardless of prior history.
    #[test]
    fn double_toggle_round_trips((seats, script) in toggle_script(), voter in 100u64..110, idx in 0usize..8) {
        let mut ballots = run_script(&seats, &script);
        let target = SeatId::new(seats[idx % seats.len()]);
        let voter = ActorId::new(voter);

        ballots.toggle_vote(voter, target).unwrap();
        ballots.toggle_vote(voter, target).unwrap();
        prop_assert_eq!(ballots.ballot_of(voter), None);
    }

    /// The winner set never contains a zero-tally candidate and every member
    /// shares the maximum tally.
    #[test]
    fn winners_share_the_positive_maximum((seats, script) in toggle_script(), weighted in prop::option::of(1u64..12)) {
        let ballots = run_script(&seats, &script);
        let weighted = weighted.map(ActorId::new);
        let winners = ballots.winning_set(weighted);

        let max = ballots
            .candidates()
            .map(|c| c.votes(weighted))
            .max()
            .unwrap_or(VoteCount::ZERO);

        for seat in &winners {
            let votes = ballots.candidate(*seat).unwrap().votes(weighted);
            prop_assert!(!votes.is_zero());
            prop_assert_eq!(votes, max);
        }
        // Every max-tally candidate is in the set (unless the max is zero).
        if !max.is_zero() {
            let expected = ballots
                .candidates()
                .filter(|c| c.votes(weighted) == max)
                .count();
            prop_assert_eq!(winners.len(), expected);
        } else {
            prop_assert!(winners.is_empty());
        }
    }

    /// The distinct-voter count equals the sum of elector-list lengths.
    #[test]
    fn ballot_count_matches_elector_lists((seats, script) in toggle_script()) {
        let ballots = run_script(&seats, &script);
        let listed: u32 = ballots.candidates().map(|c| c.electors.len() as u32).sum();
        prop_assert_eq!(ballots.ballot_count(), listed);
    }
}
