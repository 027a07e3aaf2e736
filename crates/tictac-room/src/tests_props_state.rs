//! Property-based tests for the room state machine.
//!
//! Drives a `RoomState` through arbitrary sequences of joins, leaves,
//! moves, resets and elapsed time, the way the room actor would, and
//! checks the seating invariants after every step.

use std::time::Duration;

use proptest::prelude::*;
use tictac_protocol::{PlayerId, Room, RoomId, RoomStatus, Stake, Symbol};
use tokio::time::Instant;

use crate::state::{Departure, RoomState};

const GRACE: Duration = Duration::from_secs(300);
const IDENTITIES: [&str; 4] = ["alice", "bob", "carol", "dave"];

#[derive(Debug, Clone)]
enum Step {
    Join(usize),
    Leave(usize),
    Move(usize, usize),
    Reset,
    DrawRestart,
    /// Seconds of idle time, followed by whatever grace windows closed.
    Elapse(u64),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        2 => (0..IDENTITIES.len()).prop_map(Step::Join),
        2 => (0..IDENTITIES.len()).prop_map(Step::Leave),
        4 => (0..IDENTITIES.len(), 0..9usize).prop_map(|(p, c)| Step::Move(p, c)),
        1 => Just(Step::Reset),
        1 => Just(Step::DrawRestart),
        2 => (0..400u64).prop_map(Step::Elapse),
    ]
}

fn seated_symbols(room: &Room) -> Vec<Symbol> {
    room.players
        .iter()
        .map(|p| p.symbol)
        .chain(room.disconnected_players.iter().map(|d| d.player.symbol))
        .collect()
}

fn check_invariants(room: &Room) -> Result<(), TestCaseError> {
    prop_assert!(room.seat_count() <= 2, "too many seats: {:?}", room);

    let symbols = seated_symbols(room);
    if let [a, b] = symbols.as_slice() {
        prop_assert_ne!(a, b, "two seats share a symbol: {:?}", room);
    }

    let mut ids: Vec<&PlayerId> = room
        .players
        .iter()
        .map(|p| &p.id)
        .chain(room.disconnected_players.iter().map(|d| &d.player.id))
        .collect();
    ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    ids.dedup();
    prop_assert_eq!(ids.len(), room.seat_count(), "identity seated twice");

    if room.status != RoomStatus::Finished {
        prop_assert_eq!(
            room.status == RoomStatus::Playing,
            room.seat_count() == 2,
            "status {} with {} seats",
            room.status,
            room.seat_count()
        );
    }

    let xs = (0..9).filter(|&i| room.board.get(i) == Some(Symbol::X)).count();
    let os = (0..9).filter(|&i| room.board.get(i) == Some(Symbol::O)).count();
    prop_assert!(xs == os || xs == os + 1, "X={} O={}", xs, os);
    if room.status == RoomStatus::Playing {
        let expected = if xs == os { Symbol::X } else { Symbol::O };
        prop_assert_eq!(room.current_player, expected);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Seats, symbols and status stay consistent after any sequence.
    #[test]
    fn prop_seating_invariants_hold(steps in prop::collection::vec(step(), 1..80)) {
        let mut now = Instant::now();
        let mut state = RoomState::new(Room::new(
            RoomId::parse("PROP01").unwrap(),
            "props".into(),
            PlayerId::from(IDENTITIES[0]),
            IDENTITIES[0].into(),
            Stake::default(),
            now,
        ));

        for step in steps {
            match step {
                Step::Join(p) => {
                    let _ = state.join(PlayerId::from(IDENTITIES[p]), IDENTITIES[p].into(), now);
                }
                Step::Leave(p) => {
                    if state.leave(&PlayerId::from(IDENTITIES[p]), now) == Departure::Abandoned {
                        // The registry deletes the room here.
                        return Ok(());
                    }
                }
                Step::Move(p, cell) => {
                    let _ = state.make_move(&PlayerId::from(IDENTITIES[p]), cell, now);
                }
                Step::Reset => state.reset(now),
                Step::DrawRestart => {
                    state.restart_after_draw(now);
                }
                Step::Elapse(secs) => {
                    now += Duration::from_secs(secs);
                    state.expire_disconnected(GRACE, now);
                }
            }
            check_invariants(state.room())?;
        }
    }

    /// A rejected join or move leaves the room exactly as it was.
    #[test]
    fn prop_rejections_do_not_mutate(steps in prop::collection::vec(step(), 1..60)) {
        let mut now = Instant::now();
        let mut state = RoomState::new(Room::new(
            RoomId::parse("PROP02").unwrap(),
            "props".into(),
            PlayerId::from(IDENTITIES[0]),
            IDENTITIES[0].into(),
            Stake::default(),
            now,
        ));

        for step in steps {
            let before = state.room().clone();
            let rejected = match step {
                Step::Join(p) => state
                    .join(PlayerId::from(IDENTITIES[p]), IDENTITIES[p].into(), now)
                    .is_err(),
                Step::Move(p, cell) => state
                    .make_move(&PlayerId::from(IDENTITIES[p]), cell, now)
                    .is_err(),
                Step::Leave(p) => {
                    if state.leave(&PlayerId::from(IDENTITIES[p]), now) == Departure::Abandoned {
                        return Ok(());
                    }
                    false
                }
                Step::Reset => {
                    state.reset(now);
                    false
                }
                Step::DrawRestart => {
                    state.restart_after_draw(now);
                    false
                }
                Step::Elapse(secs) => {
                    now += Duration::from_secs(secs);
                    state.expire_disconnected(GRACE, now);
                    false
                }
            };
            if rejected {
                prop_assert_eq!(state.room(), &before);
            }
        }
    }
}
