use chess::Color;
use futures::channel::mpsc::UnboundedReceiver;

use chess_live_client::game::rules::START_FEN;
use chess_live_client::models::game_state::{MatchmakingStatus, Outcome, PhaseKind};
use chess_live_client::models::messages::{
    ClientCommand, ConnectionEvent, GameEndedData, GameStartData, MoveMadeData, PlayerDetails,
    ServerEvent, TimeoutPayload,
};
use chess_live_client::websocket::transport::{drain, ChannelTransport};
use chess_live_client::{MoveRejection, SessionMachine};

const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
const AFTER_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";
const AFTER_NF3: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2";

// Same positions as a server that never advances the FEN move counter writes them
const STUCK_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
const STUCK_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 1";
const STUCK_NF3: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 0 1";

fn session(user_id: &str) -> (SessionMachine, UnboundedReceiver<ClientCommand>) {
    let (transport, commands) = ChannelTransport::new();
    let machine = SessionMachine::new(Box::new(transport), 600, Some(user_id.to_string()));
    (machine, commands)
}

fn game_start(is_white: bool, white_time: u32, black_time: u32) -> ServerEvent {
    ServerEvent::GameStart(GameStartData {
        game_id: "g1".to_string(),
        white: Some("alice".to_string()),
        black: Some("bob".to_string()),
        fen: START_FEN.to_string(),
        moves: Vec::new(),
        is_white,
        white_time,
        black_time,
        white_player_details: Some(PlayerDetails {
            name: "alice".to_string(),
            rating: 1540,
        }),
        black_player_details: Some(PlayerDetails {
            name: "bob".to_string(),
            rating: 1460,
        }),
    })
}

fn move_made(fen: &str, san: &str, white_time: u32, black_time: u32) -> ServerEvent {
    ServerEvent::MoveMade(MoveMadeData {
        fen: fen.to_string(),
        san: san.to_string(),
        from: None,
        to: None,
        white_time,
        black_time,
        ply: None,
        client_move_id: None,
    })
}

fn game_ended(winner: Option<&str>, reason: &str) -> ServerEvent {
    ServerEvent::GameEnded(GameEndedData {
        winner: winner.map(str::to_string),
        reason: reason.to_string(),
        white_rating: Some(1548),
        black_rating: Some(1452),
        white_rating_change: Some(8),
        black_rating_change: Some(-8),
    })
}

#[test]
fn game_start_enters_play() {
    let (mut machine, _commands) = session("alice");
    machine.on_event(game_start(true, 600, 600));

    assert_eq!(machine.kind(), PhaseKind::Playing);
    let snapshot = machine.snapshot();
    assert_eq!(snapshot.color, Some(Color::White));
    assert_eq!((snapshot.white_clock, snapshot.black_clock), (600, 600));
    assert_eq!(snapshot.opponent.map(|o| o.name), Some("bob".to_string()));
    assert!(snapshot.my_turn);
}

#[test]
fn optimistic_move_then_server_echo() {
    let (mut machine, mut commands) = session("alice");
    machine.on_event(game_start(true, 600, 600));

    machine.submit_move("e2", "e4", None).unwrap();
    let game = machine.game().unwrap();
    assert!(game.position.is_predicted());
    assert_eq!(game.moves.moves(), vec!["e4"]);

    match drain(&mut commands).as_slice() {
        [ClientCommand::MakeMove(payload)] => {
            assert_eq!(payload.game_id, "g1");
            assert_eq!(payload.from, "e2");
            assert_eq!(payload.to, "e4");
            assert_eq!(payload.promotion, None);
        }
        other => panic!("expected a single make_move, got {:?}", other),
    }

    machine.on_event(move_made(AFTER_E4, "e4", 599, 600));
    let game = machine.game().unwrap();
    assert_eq!(game.moves.confirmed().to_vec(), vec!["e4"]);
    assert!(game.moves.pending().is_none());
    assert!(!game.position.is_predicted());
    assert_eq!(game.position.current(), AFTER_E4);

    let snapshot = machine.snapshot();
    assert_eq!((snapshot.white_clock, snapshot.black_clock), (599, 600));
    assert!(!snapshot.my_turn);
}

#[test]
fn history_counts_distinct_server_moves() {
    let (mut machine, _commands) = session("alice");
    machine.on_event(game_start(true, 600, 600));

    let events = [
        (AFTER_E4, "e4"),
        (AFTER_E4, "e4"),
        (AFTER_E5, "e5"),
        (AFTER_E4, "e4"),
        (AFTER_E5, "e5"),
        (AFTER_NF3, "Nf3"),
    ];
    let mut previous = 0;
    for (fen, san) in events {
        machine.on_event(move_made(fen, san, 600, 600));
        let len = machine.game().unwrap().moves.len();
        assert!(len >= previous);
        previous = len;
    }
    assert_eq!(machine.game().unwrap().moves.moves(), vec!["e4", "e5", "Nf3"]);
}

#[test]
fn history_survives_a_stuck_move_counter() {
    let (mut machine, _commands) = session("alice");
    machine.on_event(game_start(true, 600, 600));

    for (fen, san) in [
        (STUCK_E4, "e4"),
        (STUCK_E4, "e4"),
        (STUCK_E5, "e5"),
        (STUCK_NF3, "Nf3"),
        (STUCK_NF3, "Nf3"),
    ] {
        machine.on_event(move_made(fen, san, 600, 600));
    }
    assert_eq!(machine.game().unwrap().moves.moves(), vec!["e4", "e5", "Nf3"]);
}

#[test]
fn own_moves_confirmed_by_client_move_id() {
    let (mut machine, mut commands) = session("alice");
    machine.on_event(game_start(true, 600, 600));

    machine.submit_move("e2", "e4", None).unwrap();
    let id = match drain(&mut commands).pop() {
        Some(ClientCommand::MakeMove(payload)) => payload.client_move_id,
        other => panic!("expected make_move, got {:?}", other),
    };
    machine.on_event(ServerEvent::MoveMade(MoveMadeData {
        fen: STUCK_E4.to_string(),
        san: "e4".to_string(),
        from: Some("e2".to_string()),
        to: Some("e4".to_string()),
        white_time: 599,
        black_time: 600,
        ply: None,
        client_move_id: Some(id),
    }));
    machine.on_event(move_made(STUCK_E5, "e5", 599, 598));

    machine.submit_move("g1", "f3", None).unwrap();
    machine.on_event(move_made(STUCK_NF3, "Nf3", 597, 598));

    let game = machine.game().unwrap();
    assert!(game.moves.pending().is_none());
    assert_eq!(game.moves.confirmed().to_vec(), vec!["e4", "e5", "Nf3"]);
}

#[test]
fn repeated_notation_is_not_mistaken_for_a_duplicate() {
    let (mut machine, _commands) = session("alice");
    machine.on_event(game_start(true, 600, 600));

    for (ply, san) in ["Nf3", "Nf6", "Ng1", "Ng8", "Nf3"].iter().enumerate() {
        machine.on_event(ServerEvent::MoveMade(MoveMadeData {
            fen: START_FEN.to_string(),
            san: san.to_string(),
            from: None,
            to: None,
            white_time: 600,
            black_time: 600,
            ply: Some(ply as u32 + 1),
            client_move_id: None,
        }));
    }
    assert_eq!(machine.game().unwrap().moves.len(), 5);
}

#[test]
fn out_of_turn_and_foreign_moves_emit_nothing() {
    let (mut machine, mut commands) = session("bob");
    machine.on_event(game_start(false, 600, 600));

    assert_eq!(machine.submit_move("e7", "e5", None), Err(MoveRejection::NotYourTurn));
    assert_eq!(machine.submit_move("d2", "d4", None), Err(MoveRejection::NotYourPiece));
    assert!(drain(&mut commands).is_empty());
}

#[test]
fn clocks_follow_side_to_move_and_resync() {
    let (mut machine, _commands) = session("alice");
    machine.on_event(game_start(true, 600, 600));

    machine.tick_clock();
    machine.tick_clock();
    let snapshot = machine.snapshot();
    assert_eq!((snapshot.white_clock, snapshot.black_clock), (598, 600));

    machine.on_event(move_made(AFTER_E4, "e4", 597, 600));
    machine.tick_clock();
    let snapshot = machine.snapshot();
    assert_eq!((snapshot.white_clock, snapshot.black_clock), (597, 599));

    machine.on_event(move_made(AFTER_E5, "e5", 590, 591));
    let snapshot = machine.snapshot();
    assert_eq!((snapshot.white_clock, snapshot.black_clock), (590, 591));
}

#[test]
fn opponent_flag_is_reported_once() {
    let (mut machine, mut commands) = session("bob");
    machine.on_event(game_start(false, 2, 600));

    for _ in 0..5 {
        machine.tick_clock();
    }
    assert_eq!(machine.snapshot().white_clock, 0);
    assert_eq!(
        drain(&mut commands),
        vec![ClientCommand::Timeout(TimeoutPayload {
            game_id: "g1".to_string(),
            color: "white".to_string(),
        })]
    );
    assert_eq!(machine.kind(), PhaseKind::Playing);
}

#[test]
fn own_flag_is_left_to_the_opponent() {
    let (mut machine, mut commands) = session("alice");
    machine.on_event(game_start(true, 1, 600));
    machine.tick_clock();
    machine.tick_clock();
    assert!(drain(&mut commands).is_empty());
}

#[test]
fn draw_by_agreement() {
    let (mut machine, mut commands) = session("alice");
    machine.on_event(game_start(true, 600, 600));

    assert!(machine.offer_draw());
    assert!(machine.snapshot().draw.offered_by_me);
    machine.on_event(game_ended(None, "agreement"));

    assert_eq!(machine.kind(), PhaseKind::GameOver);
    let result = machine.result().unwrap();
    assert_eq!(result.outcome, Outcome::Draw);
    assert_eq!(result.message, "Draw by agreement");
    assert!(!machine.snapshot().draw.offered_by_me);
    assert_eq!(drain(&mut commands), vec![ClientCommand::OfferDraw("g1".to_string())]);
}

#[test]
fn resignation_acknowledged_by_game_end() {
    let (mut machine, mut commands) = session("alice");
    machine.on_event(game_start(true, 600, 600));

    assert!(machine.resign());
    machine.on_event(game_ended(Some("bob"), "resignation"));

    let result = machine.result().unwrap();
    assert_eq!(result.outcome, Outcome::Defeat);
    assert_eq!(result.message, "You resigned");
    assert_eq!(result.rating.map(|r| r.delta), Some(8));
    assert!(!machine.awaiting_ack());
    assert_eq!(drain(&mut commands), vec![ClientCommand::Resign("g1".to_string())]);
}

#[test]
fn matchmaking_reconnect_and_retry() {
    let (mut machine, mut commands) = session("alice");

    machine.on_connection(ConnectionEvent::Connected);
    machine.on_event(ServerEvent::GameWaiting);
    assert!(machine.is_searching());
    machine.on_connection(ConnectionEvent::Disconnected);
    machine.on_connection(ConnectionEvent::Connected);
    machine.on_event(ServerEvent::MatchmakingError("queue full".to_string()));
    assert_eq!(
        machine.matchmaking().map(|m| m.status.clone()),
        Some(MatchmakingStatus::Error("queue full".to_string()))
    );
    assert!(machine.retry_search());

    assert_eq!(
        drain(&mut commands),
        vec![
            ClientCommand::FindGame(600),
            ClientCommand::FindGame(600),
            ClientCommand::FindGame(600),
        ]
    );
}

#[test]
fn teardown_in_each_phase() {
    let (mut searching, mut commands) = session("alice");
    searching.on_connection(ConnectionEvent::Connected);
    searching.teardown();
    assert_eq!(
        drain(&mut commands),
        vec![ClientCommand::FindGame(600), ClientCommand::CancelSearch]
    );

    let (mut playing, mut commands) = session("alice");
    playing.on_event(game_start(true, 600, 600));
    playing.teardown();
    playing.on_event(move_made(AFTER_E4, "e4", 599, 600));
    assert!(playing.game().unwrap().moves.is_empty());
    assert_eq!(drain(&mut commands), vec![ClientCommand::LeaveGame("g1".to_string())]);
}
