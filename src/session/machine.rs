//! Client-side model of one live game.
//!
//! `SessionMachine` is synchronous and owns no timers or sockets: inbound
//! server events, connection changes, user intents and one-second ticks are
//! all fed in by the caller, and outbound commands leave through the injected
//! [`Transport`]. The server is the authority on position, history and
//! clocks; everything this machine predicts locally is replaced by the next
//! server value.

use chess::{Color, Piece};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::MoveRejection;
use crate::game::clock::ChessClock;
use crate::game::reconcile::{Applied, MoveKey, MoveLog, Tracked};
use crate::game::rules::{parse_square, Position};
use crate::game::utils::{color_to_string, fen_ply, fen_side_to_move, format_clock, promotion_to_string};
use crate::models::game_state::{
    ActiveGame, DrawNegotiation, GameResult, MatchmakingRequest, MatchmakingStatus, PendingAck,
    Phase, PhaseKind,
};
use crate::models::messages::{
    ClientCommand, ConnectionEvent, GameEndedData, GameStartData, MoveMadeData, MovePayload,
    PlayerDetails, ServerEvent, TimeoutPayload,
};
use crate::session::outcome;
use crate::websocket::transport::Transport;

const DEFAULT_OPPONENT_NAME: &str = "Opponent";
const DEFAULT_OPPONENT_RATING: u32 = 1500;

fn send(transport: &dyn Transport, command: ClientCommand) {
    info!("Emitting {}", command.name());
    transport.emit(command);
}

/// Everything the presentation layer needs to draw the screen
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: PhaseKind,
    pub status: String,
    pub game_id: Option<String>,
    pub color: Option<Color>,
    pub fen: Option<String>,
    pub moves: Vec<String>,
    pub white_clock: u32,
    pub black_clock: u32,
    pub my_turn: bool,
    pub opponent: Option<PlayerDetails>,
    pub draw: DrawNegotiation,
    pub search_elapsed: u32,
    pub result: Option<GameResult>,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub connected: bool,
}

impl SessionSnapshot {
    pub fn clock_text(&self, color: Color) -> String {
        match color {
            Color::White => format_clock(self.white_clock),
            Color::Black => format_clock(self.black_clock),
        }
    }
}

pub struct SessionMachine {
    phase: Phase,
    transport: Box<dyn Transport>,
    user_id: Option<String>,
    connected: bool,
    connection_error: Option<String>,
    closed: bool,
}

impl SessionMachine {
    pub fn new(transport: Box<dyn Transport>, time_control: u32, user_id: Option<String>) -> Self {
        Self {
            phase: Phase::Matchmaking(MatchmakingRequest::new(time_control)),
            transport,
            user_id,
            connected: false,
            connection_error: None,
            closed: false,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    /// Torn down or cancelled; every further input is ignored
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_searching(&self) -> bool {
        matches!(&self.phase, Phase::Matchmaking(request) if request.status == MatchmakingStatus::Searching)
    }

    pub fn matchmaking(&self) -> Option<&MatchmakingRequest> {
        match &self.phase {
            Phase::Matchmaking(request) => Some(request),
            _ => None,
        }
    }

    /// The current or finished game
    pub fn game(&self) -> Option<&ActiveGame> {
        match &self.phase {
            Phase::Matchmaking(_) => None,
            Phase::Playing(game) => Some(game),
            Phase::GameOver { game, .. } => Some(game),
        }
    }

    pub fn result(&self) -> Option<&GameResult> {
        match &self.phase {
            Phase::GameOver { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn awaiting_ack(&self) -> bool {
        matches!(&self.phase, Phase::Playing(game) if game.pending_ack.is_some())
    }

    // -- Matchmaking ---------------------------------------------------

    /// Send `find_game` unless a request is already out for this connection
    pub fn begin_search(&mut self) {
        if self.closed {
            return;
        }
        if let Phase::Matchmaking(request) = &mut self.phase {
            if request.request_sent || matches!(request.status, MatchmakingStatus::Error(_)) {
                return;
            }
            request.request_sent = true;
            info!("Starting game search with time control {}s", request.time_control);
            send(self.transport.as_ref(), ClientCommand::FindGame(request.time_control));
        }
    }

    /// Re-issue the same request after a matchmaking error
    pub fn retry_search(&mut self) -> bool {
        if self.closed {
            return false;
        }
        match &mut self.phase {
            Phase::Matchmaking(request) if matches!(request.status, MatchmakingStatus::Error(_)) => {
                request.status = MatchmakingStatus::Idle;
                request.elapsed = 0;
                request.request_sent = true;
                info!("Retrying game search");
                send(self.transport.as_ref(), ClientCommand::FindGame(request.time_control));
                true
            }
            _ => false,
        }
    }

    /// Give up on matchmaking; the session is closed afterwards
    pub fn cancel_search(&mut self) -> bool {
        if self.closed {
            return false;
        }
        match &mut self.phase {
            Phase::Matchmaking(request) => {
                request.request_sent = false;
                request.status = MatchmakingStatus::Idle;
                send(self.transport.as_ref(), ClientCommand::CancelSearch);
                self.closed = true;
                true
            }
            _ => false,
        }
    }

    pub fn tick_search(&mut self) {
        if let Phase::Matchmaking(request) = &mut self.phase {
            if request.status == MatchmakingStatus::Searching {
                request.elapsed += 1;
            }
        }
    }

    // -- Inbound -------------------------------------------------------

    pub fn on_connection(&mut self, event: ConnectionEvent) {
        if self.closed {
            return;
        }
        match event {
            ConnectionEvent::Connected => {
                info!("Socket connected");
                self.connected = true;
                self.connection_error = None;
                self.begin_search();
            }
            ConnectionEvent::Disconnected => {
                warn!("Socket disconnected");
                self.connected = false;
                // The server forgets queued players on disconnect
                if let Phase::Matchmaking(request) = &mut self.phase {
                    request.request_sent = false;
                }
            }
            ConnectionEvent::ConnectError(message) => {
                warn!("Socket error: {}", message);
                self.connection_error = Some(message);
            }
        }
    }

    pub fn on_event(&mut self, event: ServerEvent) {
        if self.closed {
            debug!("Ignoring {} for a closed session", event.name());
            return;
        }
        match event {
            ServerEvent::GameWaiting => self.on_game_waiting(),
            ServerEvent::GameStart(data) => self.on_game_start(data),
            ServerEvent::MoveMade(data) => self.on_move_made(data),
            ServerEvent::GameEnded(data) => self.on_game_ended(data),
            ServerEvent::MatchmakingError(message) => self.on_matchmaking_error(message),
            ServerEvent::DrawOffered => self.on_draw_offered(),
            ServerEvent::DrawDeclined => self.on_draw_declined(),
        }
    }

    fn on_game_waiting(&mut self) {
        if let Phase::Matchmaking(request) = &mut self.phase {
            info!("Game waiting - searching for opponent");
            request.status = MatchmakingStatus::Searching;
            request.elapsed = 0;
        }
    }

    fn on_matchmaking_error(&mut self, message: String) {
        if let Phase::Matchmaking(request) = &mut self.phase {
            warn!("Matchmaking error: {}", message);
            request.status = MatchmakingStatus::Error(message);
            request.request_sent = false;
        }
    }

    fn on_game_start(&mut self, data: GameStartData) {
        match &self.phase {
            Phase::Playing(game) if game.game_id == data.game_id => {
                info!("Game {} already initialized, skipping duplicate start", data.game_id);
                return;
            }
            Phase::GameOver { .. } => {
                warn!("Ignoring start of game {} after game over", data.game_id);
                return;
            }
            _ => {}
        }

        let color = if data.is_white { Color::White } else { Color::Black };
        let opponent = if data.is_white {
            data.black_player_details
        } else {
            data.white_player_details
        }
        .unwrap_or_else(|| PlayerDetails {
            name: DEFAULT_OPPONENT_NAME.to_string(),
            rating: DEFAULT_OPPONENT_RATING,
        });

        let played = data.moves.len() as u32;
        let base_ply = fen_ply(&data.fen).and_then(|ply| ply.checked_sub(played));
        if Position::from_fen(&data.fen).is_none() {
            warn!("Game {} started from an unreadable position {}", data.game_id, data.fen);
        }

        info!(
            "Game {} started as {} against {} ({})",
            data.game_id,
            color_to_string(color),
            opponent.name,
            opponent.rating
        );

        self.phase = Phase::Playing(ActiveGame {
            game_id: data.game_id,
            color,
            white_id: data.white,
            black_id: data.black,
            position: Tracked::Confirmed(data.fen),
            moves: MoveLog::from_confirmed(data.moves),
            base_ply,
            clock: ChessClock::new(data.white_time, data.black_time),
            opponent,
            draw: DrawNegotiation::default(),
            pending_ack: None,
            error: None,
            notice: None,
        });
    }

    fn on_move_made(&mut self, data: MoveMadeData) {
        let game = match &mut self.phase {
            Phase::Playing(game) => game,
            _ => {
                warn!("Ignoring move {} outside of play", data.san);
                return;
            }
        };

        let key = if let Some(ply) = data.ply {
            MoveKey::Ply(ply)
        } else if data.client_move_id.map_or(false, |id| game.moves.echoes_pending(id)) {
            debug!("Server confirmed our move {}", data.san);
            MoveKey::Next
        } else {
            match (fen_ply(&data.fen), game.base_ply) {
                (Some(ply), Some(base)) => game.moves.counter_key(ply.saturating_sub(base), &data.san),
                _ => MoveKey::LastNotation,
            }
        };

        if Position::from_fen(&data.fen).is_none() {
            warn!("Server position {} could not be read; trusting it anyway", data.fen);
        }

        game.position.confirm(data.fen);
        match game.moves.confirm(&data.san, key) {
            Applied::Appended => info!("Move {} recorded ({} total)", data.san, game.moves.len()),
            Applied::Duplicate => debug!("Move {} already recorded", data.san),
        }
        game.clock.resync(data.white_time, data.black_time);
    }

    fn on_game_ended(&mut self, data: GameEndedData) {
        let game = match &self.phase {
            Phase::Playing(game) => game,
            _ => {
                warn!("Ignoring game end ({}) outside of play", data.reason);
                return;
            }
        };

        let result = outcome::classify(game, self.user_id.as_deref(), &data);
        info!("Game {} ended: {}", game.game_id, result.message);

        let mut game = game.clone();
        game.draw.clear();
        game.pending_ack = None;
        game.error = None;
        self.phase = Phase::GameOver { game, result };
    }

    fn on_draw_offered(&mut self) {
        if let Phase::Playing(game) = &mut self.phase {
            info!("Opponent offered a draw in game {}", game.game_id);
            game.draw.offered_by_opponent = true;
            game.notice = Some("Your opponent offers a draw".to_string());
        }
    }

    fn on_draw_declined(&mut self) {
        if let Phase::Playing(game) = &mut self.phase {
            info!("Draw offer declined in game {}", game.game_id);
            game.draw.offered_by_me = false;
            game.notice = Some("Your draw offer was declined".to_string());
        }
    }

    // -- Intents -------------------------------------------------------

    /// Apply a local move optimistically and send it to the server.
    ///
    /// Refusals never reach the network.
    pub fn submit_move(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<Piece>,
    ) -> Result<(), MoveRejection> {
        if self.closed {
            return Err(MoveRejection::NotPlaying);
        }
        let game = match &mut self.phase {
            Phase::Playing(game) => game,
            _ => return Err(MoveRejection::NotPlaying),
        };

        let position =
            Position::from_fen(game.position.current()).ok_or(MoveRejection::UnreadablePosition)?;
        let from_square = parse_square(from)?;
        let to_square = parse_square(to)?;

        let owner = position.owner_of(from_square).ok_or(MoveRejection::NoPiece)?;
        if owner != game.color {
            return Err(MoveRejection::NotYourPiece);
        }
        if position.side_to_move() != game.color {
            return Err(MoveRejection::NotYourTurn);
        }

        let applied = position.try_move(from_square, to_square, promotion)?;
        let client_move_id = Uuid::new_v4();

        game.position.predict(applied.fen_after);
        game.moves.predict(client_move_id, applied.san.clone());
        game.notice = None;
        debug!("Predicted {} in game {}", applied.san, game.game_id);

        let payload = MovePayload {
            game_id: game.game_id.clone(),
            from: from_square.to_string(),
            to: to_square.to_string(),
            promotion: applied.chess_move.get_promotion().map(promotion_to_string),
            client_move_id,
        };
        send(self.transport.as_ref(), ClientCommand::MakeMove(payload));
        Ok(())
    }

    pub fn offer_draw(&mut self) -> bool {
        if self.closed {
            return false;
        }
        match &mut self.phase {
            Phase::Playing(game) if !game.draw.offered_by_me => {
                game.draw.offered_by_me = true;
                game.notice = None;
                send(self.transport.as_ref(), ClientCommand::OfferDraw(game.game_id.clone()));
                true
            }
            _ => false,
        }
    }

    /// Answer the opponent's pending draw offer
    pub fn respond_to_draw(&mut self, accept: bool) -> bool {
        if self.closed {
            return false;
        }
        match &mut self.phase {
            Phase::Playing(game) if game.draw.offered_by_opponent => {
                game.draw.offered_by_opponent = false;
                game.notice = None;
                let game_id = game.game_id.clone();
                let command = if accept {
                    ClientCommand::AcceptDraw(game_id)
                } else {
                    ClientCommand::DeclineDraw(game_id)
                };
                send(self.transport.as_ref(), command);
                true
            }
            _ => false,
        }
    }

    pub fn resign(&mut self) -> bool {
        self.request_end(PendingAck::Resign)
    }

    /// Only possible before both sides have moved
    pub fn abort(&mut self) -> bool {
        match &self.phase {
            Phase::Playing(game) if game.moves.len() >= 2 => {
                warn!("Game {} is past the opening; abort refused", game.game_id);
                false
            }
            _ => self.request_end(PendingAck::Abort),
        }
    }

    fn request_end(&mut self, kind: PendingAck) -> bool {
        if self.closed {
            return false;
        }
        match &mut self.phase {
            Phase::Playing(game) if game.pending_ack.is_none() => {
                game.pending_ack = Some(kind);
                game.error = None;
                let game_id = game.game_id.clone();
                let command = match kind {
                    PendingAck::Resign => ClientCommand::Resign(game_id),
                    PendingAck::Abort => ClientCommand::AbortGame(game_id),
                };
                send(self.transport.as_ref(), command);
                true
            }
            _ => false,
        }
    }

    /// The acknowledgment window for resign/abort has passed.
    ///
    /// The game stays in play; only an error is shown.
    pub fn ack_timed_out(&mut self) -> bool {
        match &mut self.phase {
            Phase::Playing(game) => match game.pending_ack.take() {
                Some(kind) => {
                    let what = match kind {
                        PendingAck::Resign => "resignation",
                        PendingAck::Abort => "abort",
                    };
                    warn!("No acknowledgment of {} for game {}", what, game.game_id);
                    game.error = Some(format!(
                        "The server did not confirm your {}. Please try again.",
                        what
                    ));
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// One second of local clock prediction
    pub fn tick_clock(&mut self) {
        if self.closed {
            return;
        }
        let game = match &mut self.phase {
            Phase::Playing(game) => game,
            _ => return,
        };
        let to_move = match fen_side_to_move(game.position.current()) {
            Some(color) => color,
            None => return,
        };

        if let Some(flagged) = game.clock.tick(to_move, game.color) {
            info!(
                "{} ran out of time in game {}; reporting",
                color_to_string(flagged),
                game.game_id
            );
            let payload = TimeoutPayload {
                game_id: game.game_id.clone(),
                color: color_to_string(flagged),
            };
            send(self.transport.as_ref(), ClientCommand::Timeout(payload));
        }
    }

    /// Leaving the screen: cancel a search or announce that we left the game
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        match &mut self.phase {
            Phase::Matchmaking(request)
                if request.request_sent || request.status == MatchmakingStatus::Searching =>
            {
                request.request_sent = false;
                send(self.transport.as_ref(), ClientCommand::CancelSearch);
            }
            Phase::Playing(game) => {
                send(self.transport.as_ref(), ClientCommand::LeaveGame(game.game_id.clone()));
            }
            _ => {}
        }
        self.closed = true;
    }

    // -- Output --------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot {
            phase: self.phase.kind(),
            status: String::new(),
            game_id: None,
            color: None,
            fen: None,
            moves: Vec::new(),
            white_clock: 0,
            black_clock: 0,
            my_turn: false,
            opponent: None,
            draw: DrawNegotiation::default(),
            search_elapsed: 0,
            result: None,
            error: self.connection_error.clone(),
            notice: None,
            connected: self.connected,
        };

        match &self.phase {
            Phase::Matchmaking(request) => {
                snapshot.search_elapsed = request.elapsed;
                snapshot.status = match &request.status {
                    MatchmakingStatus::Idle if !self.connected => "Connecting...".to_string(),
                    MatchmakingStatus::Idle => "Starting search...".to_string(),
                    MatchmakingStatus::Searching => format!(
                        "Searching for opponent... {} (Time Control: {}+0)",
                        format_clock(request.elapsed),
                        request.time_control / 60
                    ),
                    MatchmakingStatus::Error(message) => format!("Matchmaking failed: {}", message),
                };
            }
            Phase::Playing(game) | Phase::GameOver { game, .. } => {
                let fen = game.position.current();
                snapshot.my_turn = self.phase.kind() == PhaseKind::Playing
                    && fen_side_to_move(fen) == Some(game.color);
                snapshot.game_id = Some(game.game_id.clone());
                snapshot.color = Some(game.color);
                snapshot.fen = Some(fen.clone());
                snapshot.moves = game.moves.moves();
                snapshot.white_clock = game.clock.remaining(Color::White);
                snapshot.black_clock = game.clock.remaining(Color::Black);
                snapshot.opponent = Some(game.opponent.clone());
                snapshot.draw = game.draw;
                snapshot.notice = game.notice.clone();
                if game.error.is_some() {
                    snapshot.error = game.error.clone();
                }
                snapshot.status = if snapshot.my_turn {
                    "Your turn".to_string()
                } else {
                    "Waiting...".to_string()
                };
            }
        }

        if let Phase::GameOver { result, .. } = &self.phase {
            snapshot.status = result.message.clone();
            snapshot.result = Some(result.clone());
        }
        snapshot
    }
}
