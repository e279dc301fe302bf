//! Room - the authoritative match orchestrator
//!
//! A room owns one [`MatchState`], the two seats, the connections attached to
//! it and its timers. It is driven by exactly three kinds of input: client
//! events ([`RoomEvent`]), timer firings ([`TimerFire`]) and nothing else, and
//! every handler runs to completion before the next one starts.
//!
//! Status flow: `waiting -> countdown -> playing -> finished`, and
//! `finished -> waiting` only once every connection has gone.

use std::collections::HashMap;
use std::time::Duration;

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::ai::{AiPilot, AiTuning, PilotStep};
use crate::core::{InputOutcome, MatchState};
use crate::protocol::{
    ClearView, ClientMessage, ErrorCode, JoinAck, JoinRequest, PerSide, RoomStateView,
    SeatView, ServerMessage,
};
use crate::timers::{RoomTimers, TimerDriver, TimerFire, TimerKind};
use crate::types::{
    MatchStatus, PlayerAction, Side, AI_FALLBACK_MS, COUNTDOWN_GRACE_MS, COUNTDOWN_SECONDS,
    COUNTDOWN_STEP_MS, DEFAULT_AI_MOVE_MS, GRAVITY_MS, MAX_AI_MOVE_MS, MIN_AI_MOVE_MS,
};

/// Server-assigned id of one client connection
pub type ConnectionId = u64;

/// Per-room timing and AI settings
#[derive(Debug, Clone, PartialEq)]
pub struct RoomConfig {
    pub gravity: Duration,
    pub countdown_seconds: u32,
    pub countdown_step: Duration,
    /// Extra time past the nominal countdown end before the deadline force-starts
    pub countdown_grace: Duration,
    pub ai_fallback: Duration,
    pub ai_move: Duration,
    /// Fixed match seed; a fresh one is drawn per match when unset
    pub seed: Option<u64>,
    pub ai_tuning: AiTuning,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            gravity: Duration::from_millis(GRAVITY_MS),
            countdown_seconds: COUNTDOWN_SECONDS,
            countdown_step: Duration::from_millis(COUNTDOWN_STEP_MS),
            countdown_grace: Duration::from_millis(COUNTDOWN_GRACE_MS),
            ai_fallback: Duration::from_millis(AI_FALLBACK_MS),
            ai_move: Duration::from_millis(DEFAULT_AI_MOVE_MS),
            seed: None,
            ai_tuning: AiTuning::STANDARD,
        }
    }
}

impl RoomConfig {
    /// Set the AI move interval, clamped to the supported range
    pub fn with_ai_move_ms(mut self, ms: u64) -> Self {
        self.ai_move = Duration::from_millis(ms.clamp(MIN_AI_MOVE_MS, MAX_AI_MOVE_MS));
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// When the safety deadline fires, measured from countdown start
    pub fn countdown_deadline(&self) -> Duration {
        self.countdown_step * self.countdown_seconds + self.countdown_grace
    }
}

/// Client-side events routed to a room
#[derive(Debug)]
pub enum RoomEvent {
    Connect {
        conn: ConnectionId,
        tx: mpsc::UnboundedSender<ServerMessage>,
    },
    Message {
        conn: ConnectionId,
        message: ClientMessage,
    },
    Disconnect {
        conn: ConnectionId,
    },
}

/// A player slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub player_id: String,
    /// Bound connection; None for AI seats and for disconnected humans
    pub connection: Option<ConnectionId>,
    pub ai: bool,
}

impl Seat {
    fn view(&self) -> SeatView {
        SeatView {
            player_id: self.player_id.clone(),
            ai: self.ai,
            connected: self.ai || self.connection.is_some(),
        }
    }
}

/// One match room
pub struct Room<D> {
    id: String,
    config: RoomConfig,
    driver: D,
    timers: RoomTimers,
    state: MatchState,
    seats: [Option<Seat>; 2],
    pilots: [Option<AiPilot<Pcg32>>; 2],
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>,
    countdown_remaining: u32,
    seed_rng: Pcg32,
}

impl<D: TimerDriver> Room<D> {
    pub fn new(id: impl Into<String>, config: RoomConfig, driver: D) -> Self {
        let mut seed_rng = Pcg32::seed_from_u64(config.seed.unwrap_or_else(rand::random));
        let seed = config.seed.unwrap_or_else(|| seed_rng.random());
        Self {
            id: id.into(),
            config,
            driver,
            timers: RoomTimers::new(),
            state: MatchState::new(seed),
            seats: [None, None],
            pilots: [None, None],
            connections: HashMap::new(),
            countdown_remaining: 0,
            seed_rng,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn status(&self) -> MatchStatus {
        self.state.status()
    }

    pub fn seat(&self, side: Side) -> Option<&Seat> {
        self.seats[side.index()].as_ref()
    }

    pub fn timers(&self) -> &RoomTimers {
        &self.timers
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn handle_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Connect { conn, tx } => self.handle_connect(conn, tx),
            RoomEvent::Message { conn, message } => self.handle_message(conn, message),
            RoomEvent::Disconnect { conn } => self.handle_disconnect(conn),
        }
    }

    pub fn handle_connect(&mut self, conn: ConnectionId, tx: mpsc::UnboundedSender<ServerMessage>) {
        debug!(room = %self.id, conn, "connection attached");
        self.connections.insert(conn, tx);
    }

    pub fn handle_message(&mut self, conn: ConnectionId, message: ClientMessage) {
        if let Some(action) = message.action() {
            self.handle_input(conn, action);
            return;
        }
        match message {
            ClientMessage::Join(join) => self.handle_join(conn, join),
            ClientMessage::Ready {} => self.handle_ready(conn),
            _ => {}
        }
    }

    // ============== Outbound ==============

    fn send(&self, conn: ConnectionId, message: ServerMessage) {
        if let Some(tx) = self.connections.get(&conn) {
            let _ = tx.send(message);
        }
    }

    fn broadcast(&self, message: ServerMessage) {
        for tx in self.connections.values() {
            let _ = tx.send(message.clone());
        }
    }

    fn room_state_message(&self) -> ServerMessage {
        ServerMessage::RoomState(RoomStateView {
            status: self.state.status().as_str(),
            winner: self.state.winner().map(Side::as_str),
            players: PerSide::from_fn(|side| self.seat(side).map(Seat::view)),
        })
    }

    fn broadcast_room_and_state(&self) {
        self.broadcast(self.room_state_message());
        self.broadcast(ServerMessage::state(&self.state.public_state()));
    }

    /// Send the sender the current room and match state
    fn resync(&self, conn: ConnectionId) {
        self.send(conn, self.room_state_message());
        self.send(conn, ServerMessage::state(&self.state.public_state()));
    }

    // ============== Seats ==============

    fn side_of(&self, conn: ConnectionId) -> Option<Side> {
        Side::ALL.into_iter().find(|&side| {
            self.seat(side)
                .is_some_and(|seat| seat.connection == Some(conn))
        })
    }

    fn seated_humans(&self) -> usize {
        self.seats.iter().flatten().filter(|seat| !seat.ai).count()
    }

    fn free_side(&self, preferred: Option<Side>) -> Option<Side> {
        preferred
            .into_iter()
            .chain(Side::ALL)
            .find(|side| self.seats[side.index()].is_none())
    }

    fn handle_join(&mut self, conn: ConnectionId, join: JoinRequest) {
        let Some(player_id) = join.player_id.clone().filter(|id| !id.trim().is_empty()) else {
            self.send(conn, ServerMessage::error(ErrorCode::MissingPlayerId));
            return;
        };

        // A bound connection keeps its side whatever id it sends
        if let Some(side) = self.side_of(conn) {
            let player_id = self.seat(side).map(|s| s.player_id.clone()).unwrap_or(player_id);
            self.send(conn, self.join_ack(side, player_id));
            self.resync(conn);
            return;
        }

        // Rejoin by player id keeps the side and the game
        let rejoin = Side::ALL.into_iter().find(|&side| {
            self.seat(side)
                .is_some_and(|seat| !seat.ai && seat.player_id == player_id)
        });
        if let Some(side) = rejoin {
            if let Some(seat) = self.seats[side.index()].as_mut() {
                seat.connection = Some(conn);
            }
            info!(room = %self.id, side = side.as_str(), player = %player_id, "player rejoined");
            self.send(conn, self.join_ack(side, player_id));
            self.broadcast(self.room_state_message());
            self.send(conn, ServerMessage::state(&self.state.public_state()));
            return;
        }

        let Some(side) = self.free_side(join.preferred_side()) else {
            warn!(room = %self.id, player = %player_id, "room full");
            self.send(conn, ServerMessage::error(ErrorCode::RoomFull));
            self.resync(conn);
            return;
        };

        info!(room = %self.id, side = side.as_str(), player = %player_id, "player joined");
        self.seats[side.index()] = Some(Seat {
            player_id: player_id.clone(),
            connection: Some(conn),
            ai: false,
        });
        self.send(conn, self.join_ack(side, player_id));

        if join.ai_opponent && self.seat(side.opponent()).is_none() {
            self.attach_ai(side.opponent());
        }

        self.update_ai_fallback();
        self.evaluate_countdown();
        self.broadcast_room_and_state();
    }

    fn join_ack(&self, side: Side, player_id: String) -> ServerMessage {
        ServerMessage::JoinAck(JoinAck {
            player: side.as_str(),
            player_id,
            room_id: self.id.clone(),
        })
    }

    fn attach_ai(&mut self, side: Side) {
        let player_id = format!("ai-{}", side.as_str());
        info!(room = %self.id, side = side.as_str(), "AI opponent attached");
        self.seats[side.index()] = Some(Seat {
            player_id,
            connection: None,
            ai: true,
        });
        let rng = Pcg32::seed_from_u64(self.seed_rng.random());
        self.pilots[side.index()] = Some(AiPilot::new(side, self.config.ai_tuning, rng));
    }

    /// Arm the AI fallback while exactly one human waits alone; disarm otherwise
    fn update_ai_fallback(&mut self) {
        let waiting_alone = self.state.status() == MatchStatus::Waiting
            && self.seated_humans() == 1
            && self.seats.iter().any(Option::is_none);
        if !waiting_alone {
            self.timers.cancel(TimerKind::AiFallback);
        } else if !self.timers.is_armed(TimerKind::AiFallback) {
            debug!(room = %self.id, "AI fallback armed");
            self.timers.arm(
                &mut self.driver,
                TimerKind::AiFallback,
                self.config.ai_fallback,
                None,
            );
        }
    }

    // ============== Countdown and start ==============

    fn handle_ready(&mut self, conn: ConnectionId) {
        if self.side_of(conn).is_none() {
            self.send(conn, ServerMessage::error(ErrorCode::NotJoined));
        } else {
            self.evaluate_countdown();
        }
        self.resync(conn);
    }

    /// Enter the countdown once both seats are filled
    fn evaluate_countdown(&mut self) {
        if self.state.status() != MatchStatus::Waiting || self.seats.iter().any(Option::is_none) {
            return;
        }
        if !self.state.begin_countdown() {
            return;
        }
        info!(room = %self.id, "countdown started");
        self.timers.cancel(TimerKind::AiFallback);
        self.countdown_remaining = self.config.countdown_seconds;
        self.broadcast(ServerMessage::Countdown {
            seconds: self.countdown_remaining,
        });

        let step = self.config.countdown_step;
        self.timers
            .arm(&mut self.driver, TimerKind::CountdownTick, step, Some(step));
        let deadline = self.config.countdown_deadline();
        self.timers
            .arm(&mut self.driver, TimerKind::CountdownDeadline, deadline, None);
        self.broadcast(self.room_state_message());
    }

    fn start_game(&mut self) {
        self.timers.cancel(TimerKind::CountdownTick);
        self.timers.cancel(TimerKind::CountdownDeadline);
        self.countdown_remaining = 0;

        if let Err(err) = self.state.start_match() {
            error!(room = %self.id, %err, "match start failed");
            self.broadcast(ServerMessage::error(ErrorCode::GameStartFailed));
            self.reset_match();
            self.broadcast_room_and_state();
            return;
        }

        if let Some(winner) = self.state.winner() {
            self.broadcast(ServerMessage::state(&self.state.public_state()));
            self.finish_match(winner);
            return;
        }

        info!(room = %self.id, seed = self.state.seed(), "match started");
        let gravity = self.config.gravity;
        self.timers
            .arm(&mut self.driver, TimerKind::Gravity, gravity, Some(gravity));
        if self.pilots.iter().any(Option::is_some) {
            let ai_move = self.config.ai_move;
            self.timers
                .arm(&mut self.driver, TimerKind::AiMove, ai_move, Some(ai_move));
        }
        self.broadcast_room_and_state();
    }

    // ============== Play ==============

    fn handle_input(&mut self, conn: ConnectionId, action: PlayerAction) {
        let Some(side) = self.side_of(conn) else {
            self.send(conn, ServerMessage::error(ErrorCode::NotJoined));
            self.resync(conn);
            return;
        };
        if self.state.status() != MatchStatus::Playing {
            self.resync(conn);
            return;
        }
        self.apply_action(side, action);
    }

    /// Run one input through the engine and broadcast what it changed
    fn apply_action(&mut self, side: Side, action: PlayerAction) {
        let InputOutcome {
            changed,
            clear,
            winner,
        } = self.state.apply_input(side, action);
        if let Some(event) = clear.as_ref() {
            self.broadcast(ServerMessage::Clear(ClearView::from(event)));
        }
        if changed {
            self.broadcast(ServerMessage::state(&self.state.public_state()));
        }
        if let Some(winner) = winner {
            self.finish_match(winner);
        }
    }

    fn gravity_tick(&mut self) {
        if self.state.status() != MatchStatus::Playing {
            return;
        }
        let outcome = self.state.tick();
        for event in &outcome.clears {
            self.broadcast(ServerMessage::Clear(ClearView::from(event)));
        }
        if outcome.changed {
            self.broadcast(ServerMessage::state(&self.state.public_state()));
        }
        if let Some(winner) = outcome.winner {
            self.finish_match(winner);
        }
    }

    fn ai_step(&mut self) {
        for side in Side::ALL {
            if self.state.status() != MatchStatus::Playing {
                return;
            }
            let step = match self.pilots[side.index()].as_mut() {
                Some(pilot) => pilot.step(&self.state),
                None => continue,
            };
            if let PilotStep::Input(action) = step {
                self.apply_action(side, action);
            }
        }
    }

    // ============== Terminal transitions ==============

    fn stop_everything(&mut self) {
        self.timers.cancel_all();
        for pilot in self.pilots.iter_mut().flatten() {
            pilot.reset();
        }
    }

    fn finish_match(&mut self, winner: Side) {
        self.stop_everything();
        if self.state.status() != MatchStatus::Finished {
            self.state.finish(winner);
        }
        info!(room = %self.id, winner = winner.as_str(), "match finished");
        self.broadcast(ServerMessage::Win {
            winner: winner.as_str(),
        });
        self.broadcast(self.room_state_message());
    }

    fn next_seed(&mut self) -> u64 {
        match self.config.seed {
            Some(seed) => seed,
            None => self.seed_rng.random(),
        }
    }

    /// Fresh waiting match, seats kept
    fn reset_match(&mut self) {
        self.stop_everything();
        let seed = self.next_seed();
        self.state = MatchState::new(seed);
        self.countdown_remaining = 0;
    }

    /// Fresh waiting match with every seat released
    fn reset_room(&mut self) {
        self.reset_match();
        self.seats = [None, None];
        self.pilots = [None, None];
        info!(room = %self.id, "room reset");
    }

    pub fn handle_disconnect(&mut self, conn: ConnectionId) {
        self.connections.remove(&conn);
        let side = self.side_of(conn);
        if let Some(side) = side {
            if let Some(seat) = self.seats[side.index()].as_mut() {
                seat.connection = None;
            }
        }
        debug!(room = %self.id, conn, ?side, "connection detached");

        if let Some(side) = side {
            match self.state.status() {
                MatchStatus::Countdown | MatchStatus::Playing
                    if self.seat(side.opponent()).is_some() =>
                {
                    info!(room = %self.id, side = side.as_str(), "player forfeited by disconnect");
                    self.finish_match(side.opponent());
                }
                MatchStatus::Waiting => {
                    self.seats[side.index()] = None;
                    self.update_ai_fallback();
                }
                _ => {}
            }
        }

        if self.connections.is_empty() {
            self.reset_room();
            return;
        }
        self.broadcast(self.room_state_message());
    }

    // ============== Timers ==============

    pub fn on_timer(&mut self, fire: TimerFire) {
        if !self.timers.is_current(fire) {
            debug!(room = %self.id, ?fire, "stale timer ignored");
            return;
        }
        match fire.kind {
            TimerKind::AiFallback => {
                self.timers.cancel(TimerKind::AiFallback);
                let open = Side::ALL.into_iter().find(|&s| self.seat(s).is_none());
                if let (MatchStatus::Waiting, Some(side), 1) =
                    (self.state.status(), open, self.seated_humans())
                {
                    self.attach_ai(side);
                    self.evaluate_countdown();
                    self.broadcast_room_and_state();
                }
            }
            TimerKind::CountdownTick => {
                if self.state.status() != MatchStatus::Countdown {
                    self.timers.cancel(TimerKind::CountdownTick);
                    return;
                }
                self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
                if self.countdown_remaining == 0 {
                    self.start_game();
                } else {
                    self.broadcast(ServerMessage::Countdown {
                        seconds: self.countdown_remaining,
                    });
                }
            }
            TimerKind::CountdownDeadline => {
                self.timers.cancel(TimerKind::CountdownDeadline);
                if self.state.status() == MatchStatus::Countdown {
                    warn!(room = %self.id, "countdown stalled, forcing match start");
                    self.start_game();
                }
            }
            TimerKind::Gravity => self.gravity_tick(),
            TimerKind::AiMove => self.ai_step(),
        }
    }
}
