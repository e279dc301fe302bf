//! Room orchestrator tests - seating, countdown, timers, forfeits and resyncs
//!
//! Timers are driven by hand through `ManualTimerDriver`, so every test is
//! synchronous and deterministic.

use std::time::Duration;

use tokio::sync::mpsc;

use duel_tetris::adapter::{
    parse_client_message, ConnectionId, ErrorCode, ManualTimerDriver, Room, RoomConfig,
    RoomEvent, ServerMessage, TimerFire, TimerKind,
};
use duel_tetris::types::{MatchStatus, Side};

type Inbox = mpsc::UnboundedReceiver<ServerMessage>;

fn new_room() -> (Room<ManualTimerDriver>, ManualTimerDriver) {
    let driver = ManualTimerDriver::new();
    let config = RoomConfig::default().with_seed(Some(42));
    (Room::new("test", config, driver.clone()), driver)
}

fn connect(room: &mut Room<ManualTimerDriver>, conn: ConnectionId) -> Inbox {
    let (tx, rx) = mpsc::unbounded_channel();
    room.handle_event(RoomEvent::Connect { conn, tx });
    rx
}

fn send(room: &mut Room<ManualTimerDriver>, conn: ConnectionId, line: &str) {
    let message = parse_client_message(line).unwrap();
    room.handle_event(RoomEvent::Message { conn, message });
}

fn join(room: &mut Room<ManualTimerDriver>, conn: ConnectionId, player_id: &str) -> Inbox {
    let rx = connect(room, conn);
    send(
        room,
        conn,
        &format!(r#"{{"type":"join","playerId":"{player_id}"}}"#),
    );
    rx
}

fn drain(rx: &mut Inbox) -> Vec<ServerMessage> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn fire(room: &mut Room<ManualTimerDriver>, driver: &ManualTimerDriver, kind: TimerKind) {
    let timer = driver
        .live(kind)
        .unwrap_or_else(|| panic!("{kind:?} is not armed"));
    room.on_timer(timer.fire);
}

fn acked_side(messages: &[ServerMessage]) -> Option<&'static str> {
    messages.iter().find_map(|m| match m {
        ServerMessage::JoinAck(ack) => Some(ack.player),
        _ => None,
    })
}

fn has_error(messages: &[ServerMessage], code: ErrorCode) -> bool {
    messages
        .iter()
        .any(|m| matches!(m, ServerMessage::Error { message } if *message == code))
}

fn has_resync(messages: &[ServerMessage]) -> bool {
    messages.iter().any(|m| matches!(m, ServerMessage::RoomState(_)))
        && messages.iter().any(|m| matches!(m, ServerMessage::State { .. }))
}

fn countdowns(messages: &[ServerMessage]) -> Vec<u32> {
    messages
        .iter()
        .filter_map(|m| match m {
            ServerMessage::Countdown { seconds } => Some(*seconds),
            _ => None,
        })
        .collect()
}

/// Two humans seated and the match started through the normal countdown
fn playing_room() -> (Room<ManualTimerDriver>, ManualTimerDriver, Inbox, Inbox) {
    let (mut room, driver) = new_room();
    let mut a = join(&mut room, 1, "alice");
    let mut b = join(&mut room, 2, "bob");
    for _ in 0..3 {
        fire(&mut room, &driver, TimerKind::CountdownTick);
    }
    assert_eq!(room.status(), MatchStatus::Playing);
    drain(&mut a);
    drain(&mut b);
    (room, driver, a, b)
}

#[test]
fn test_first_join_takes_a_and_arms_fallback() {
    let (mut room, driver) = new_room();
    let mut rx = join(&mut room, 1, "alice");

    let messages = drain(&mut rx);
    assert_eq!(acked_side(&messages), Some("a"));
    assert!(has_resync(&messages));
    assert_eq!(room.seat(Side::A).map(|s| s.player_id.as_str()), Some("alice"));
    assert_eq!(room.status(), MatchStatus::Waiting);

    let fallback = driver.live(TimerKind::AiFallback).unwrap();
    assert_eq!(fallback.delay, RoomConfig::default().ai_fallback);
    assert_eq!(fallback.period, None);
}

#[test]
fn test_preferred_side_is_honoured() {
    let (mut room, _driver) = new_room();
    let mut rx = connect(&mut room, 1);
    send(&mut room, 1, r#"{"type":"join","playerId":"bob","preferredSide":"b"}"#);
    assert_eq!(acked_side(&drain(&mut rx)), Some("b"));
    assert!(room.seat(Side::A).is_none());

    let mut rx = join(&mut room, 2, "alice");
    assert_eq!(acked_side(&drain(&mut rx)), Some("a"));
}

#[test]
fn test_third_player_gets_room_full() {
    let (mut room, _driver) = new_room();
    let _a = join(&mut room, 1, "alice");
    let _b = join(&mut room, 2, "bob");
    let mut c = join(&mut room, 3, "carol");

    let messages = drain(&mut c);
    assert!(has_error(&messages, ErrorCode::RoomFull));
    assert_eq!(acked_side(&messages), None);
}

#[test]
fn test_countdown_runs_three_two_one_then_starts() {
    let (mut room, driver) = new_room();
    let mut a = join(&mut room, 1, "alice");
    let _b = join(&mut room, 2, "bob");

    assert_eq!(room.status(), MatchStatus::Countdown);
    assert!(driver.live(TimerKind::AiFallback).is_none());
    let tick = driver.live(TimerKind::CountdownTick).unwrap();
    assert_eq!(tick.period, Some(Duration::from_secs(1)));
    let deadline = driver.live(TimerKind::CountdownDeadline).unwrap();
    assert_eq!(deadline.delay, Duration::from_millis(4500));

    fire(&mut room, &driver, TimerKind::CountdownTick);
    fire(&mut room, &driver, TimerKind::CountdownTick);
    assert_eq!(room.countdown_remaining(), 1);
    fire(&mut room, &driver, TimerKind::CountdownTick);

    assert_eq!(room.status(), MatchStatus::Playing);
    assert_eq!(countdowns(&drain(&mut a)), vec![3, 2, 1]);
    assert!(driver.live(TimerKind::CountdownTick).is_none());
    assert!(driver.live(TimerKind::CountdownDeadline).is_none());
    assert!(driver.live(TimerKind::Gravity).is_some());
    assert!(driver.live(TimerKind::AiMove).is_none());
}

#[test]
fn test_deadline_forces_a_stalled_countdown() {
    let (mut room, driver) = new_room();
    let _a = join(&mut room, 1, "alice");
    let _b = join(&mut room, 2, "bob");

    fire(&mut room, &driver, TimerKind::CountdownDeadline);
    assert_eq!(room.status(), MatchStatus::Playing);
    assert!(driver.live(TimerKind::CountdownTick).is_none());
    assert!(room.timers().is_armed(TimerKind::Gravity));
}

#[test]
fn test_fallback_seats_an_ai() {
    let (mut room, driver) = new_room();
    let mut a = join(&mut room, 1, "alice");
    drain(&mut a);

    fire(&mut room, &driver, TimerKind::AiFallback);
    let seat = room.seat(Side::B).unwrap();
    assert!(seat.ai);
    assert_eq!(room.status(), MatchStatus::Countdown);
    assert!(!room.timers().is_armed(TimerKind::AiFallback));
    assert_eq!(countdowns(&drain(&mut a)), vec![3]);
}

#[test]
fn test_ai_opponent_plays_through_the_move_timer() {
    let (mut room, driver) = new_room();
    let mut rx = connect(&mut room, 1);
    send(&mut room, 1, r#"{"type":"join","playerId":"alice","aiOpponent":true}"#);
    assert!(room.seat(Side::B).is_some_and(|s| s.ai));
    assert_eq!(room.status(), MatchStatus::Countdown);

    for _ in 0..3 {
        fire(&mut room, &driver, TimerKind::CountdownTick);
    }
    let ai_move = driver.live(TimerKind::AiMove).unwrap();
    assert_eq!(ai_move.period, Some(RoomConfig::default().ai_move));
    drain(&mut rx);

    for _ in 0..40 {
        fire(&mut room, &driver, TimerKind::AiMove);
    }
    assert!(room.state().player(Side::B).piece_id() >= 2);
    assert!(drain(&mut rx)
        .iter()
        .any(|m| matches!(m, ServerMessage::State { .. })));
}

#[test]
fn test_disconnect_while_playing_forfeits_and_stops_timers() {
    let (mut room, driver, _a, mut b) = playing_room();
    room.handle_event(RoomEvent::Disconnect { conn: 1 });

    assert_eq!(room.status(), MatchStatus::Finished);
    assert_eq!(room.state().winner(), Some(Side::B));
    for kind in TimerKind::ALL {
        assert!(!room.timers().is_armed(kind), "{kind:?} still armed");
        assert!(driver.live(kind).is_none());
    }
    let messages = drain(&mut b);
    assert!(messages
        .iter()
        .any(|m| matches!(m, ServerMessage::Win { winner: "b" })));
}

#[test]
fn test_disconnect_during_countdown_forfeits() {
    let (mut room, _driver) = new_room();
    let _a = join(&mut room, 1, "alice");
    let _b = join(&mut room, 2, "bob");
    room.handle_event(RoomEvent::Disconnect { conn: 2 });
    assert_eq!(room.status(), MatchStatus::Finished);
    assert_eq!(room.state().winner(), Some(Side::A));
}

#[test]
fn test_waiting_disconnect_vacates_seat() {
    let (mut room, driver) = new_room();
    let _a = join(&mut room, 1, "alice");
    let _watcher = connect(&mut room, 2);
    room.handle_event(RoomEvent::Disconnect { conn: 1 });

    assert_eq!(room.status(), MatchStatus::Waiting);
    assert!(room.seat(Side::A).is_none());
    assert!(driver.live(TimerKind::AiFallback).is_none());
    assert_eq!(room.connection_count(), 1);
}

#[test]
fn test_last_disconnect_resets_room() {
    let (mut room, _driver, _a, _b) = playing_room();
    room.handle_event(RoomEvent::Disconnect { conn: 1 });
    room.handle_event(RoomEvent::Disconnect { conn: 2 });

    assert_eq!(room.connection_count(), 0);
    assert_eq!(room.status(), MatchStatus::Waiting);
    assert!(room.seat(Side::A).is_none());
    assert!(room.seat(Side::B).is_none());
}

#[test]
fn test_unbound_input_gets_not_joined_and_resync() {
    let (mut room, _driver) = new_room();
    let mut rx = connect(&mut room, 9);
    send(&mut room, 9, r#"{"type":"move","direction":"left"}"#);

    let messages = drain(&mut rx);
    assert!(has_error(&messages, ErrorCode::NotJoined));
    assert!(has_resync(&messages));
}

#[test]
fn test_input_during_countdown_is_resynced() {
    let (mut room, _driver) = new_room();
    let mut a = join(&mut room, 1, "alice");
    let _b = join(&mut room, 2, "bob");
    drain(&mut a);

    send(&mut room, 1, r#"{"type":"hard_drop"}"#);
    let messages = drain(&mut a);
    assert!(has_resync(&messages));
    assert!(!messages.iter().any(|m| matches!(m, ServerMessage::Error { .. })));
    assert_eq!(room.status(), MatchStatus::Countdown);
}

#[test]
fn test_input_after_finish_is_resynced() {
    let (mut room, _driver, _a, mut b) = playing_room();
    room.handle_event(RoomEvent::Disconnect { conn: 1 });
    drain(&mut b);

    let before = room.state().public_state();
    send(&mut room, 2, r#"{"type":"rotate","direction":"cw"}"#);
    assert!(has_resync(&drain(&mut b)));
    assert_eq!(room.state().public_state(), before);
}

#[test]
fn test_rejoin_by_player_id_keeps_side() {
    let (mut room, _driver, _a, _b) = playing_room();
    room.handle_event(RoomEvent::Disconnect { conn: 1 });
    assert_eq!(room.status(), MatchStatus::Finished);

    let mut again = join(&mut room, 3, "alice");
    let messages = drain(&mut again);
    assert_eq!(acked_side(&messages), Some("a"));
    assert_eq!(room.seat(Side::A).and_then(|s| s.connection), Some(3));
    assert_eq!(room.status(), MatchStatus::Finished);
}

#[test]
fn test_stale_fallback_is_ignored() {
    let (mut room, driver) = new_room();
    let _a = join(&mut room, 1, "alice");
    let stale: TimerFire = driver.live(TimerKind::AiFallback).unwrap().fire;
    let _b = join(&mut room, 2, "bob");

    room.on_timer(stale);
    assert!(!room.seat(Side::B).unwrap().ai);
    assert_eq!(room.status(), MatchStatus::Countdown);
}

#[test]
fn test_gravity_broadcasts_state() {
    let (mut room, driver, mut a, mut b) = playing_room();
    let before = room.state().player(Side::A).active();
    fire(&mut room, &driver, TimerKind::Gravity);

    assert_ne!(room.state().player(Side::A).active(), before);
    for inbox in [&mut a, &mut b] {
        assert!(drain(inbox)
            .iter()
            .any(|m| matches!(m, ServerMessage::State { .. })));
    }
}

#[test]
fn test_hard_drop_is_broadcast_to_both() {
    let (mut room, _driver, mut a, mut b) = playing_room();
    send(&mut room, 1, r#"{"type":"hard_drop"}"#);

    assert_eq!(room.state().player(Side::A).piece_id(), 2);
    assert!(!drain(&mut a).is_empty());
    assert!(!drain(&mut b).is_empty());
}

#[test]
fn test_ready_resyncs_sender() {
    let (mut room, _driver) = new_room();
    let mut stranger = connect(&mut room, 5);
    send(&mut room, 5, r#"{"type":"ready"}"#);
    let messages = drain(&mut stranger);
    assert!(has_error(&messages, ErrorCode::NotJoined));
    assert!(has_resync(&messages));

    let mut a = join(&mut room, 1, "alice");
    drain(&mut a);
    send(&mut room, 1, r#"{"type":"ready"}"#);
    let messages = drain(&mut a);
    assert!(has_resync(&messages));
    assert_eq!(room.status(), MatchStatus::Waiting);
}

#[test]
fn test_bound_connection_cannot_claim_the_other_seat() {
    let (mut room, _driver) = new_room();
    let mut a = join(&mut room, 1, "alice");
    let _b = join(&mut room, 2, "bob");
    drain(&mut a);

    send(&mut room, 1, r#"{"type":"join","playerId":"bob"}"#);
    let messages = drain(&mut a);
    assert_eq!(acked_side(&messages), Some("a"));
    assert!(has_resync(&messages));
    assert_eq!(room.seat(Side::A).and_then(|s| s.connection), Some(1));
    assert_eq!(room.seat(Side::B).and_then(|s| s.connection), Some(2));

    room.handle_event(RoomEvent::Disconnect { conn: 1 });
    assert_eq!(room.state().winner(), Some(Side::B));
    assert_eq!(room.seat(Side::B).and_then(|s| s.connection), Some(2));
}
