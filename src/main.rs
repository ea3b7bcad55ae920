use actix::prelude::*;
use chess::{Color, Piece};
use log::{error, info, warn};
use std::io::BufRead;
use std::time::Duration;

use chess_live_client::api::profile::{recent, ProfileClient, RecordOutcome};
use chess_live_client::config::ClientConfig;
use chess_live_client::error::ClientError;
use chess_live_client::game::utils::{color_to_string, parse_promotion};
use chess_live_client::models::app_state::{AuthSession, SessionStore};
use chess_live_client::models::game_state::PhaseKind;
use chess_live_client::session::actor::{
    Abort, CancelSearch, GameSessionActor, Leave, OfferDraw, Resign, RespondToDraw, RetrySearch,
    SessionUpdate, SubmitMove,
};
use chess_live_client::session::machine::{SessionMachine, SessionSnapshot};
use chess_live_client::websocket::gateway::Gateway;
use chess_live_client::websocket::transport::ChannelTransport;

/// Prints the session whenever something visible changes
#[derive(Default)]
struct ConsoleView {
    last: Option<SessionSnapshot>,
}

impl Actor for ConsoleView {
    type Context = Context<Self>;
}

impl Handler<SessionUpdate> for ConsoleView {
    type Result = ();

    fn handle(&mut self, msg: SessionUpdate, _: &mut Self::Context) {
        let snapshot = msg.0;
        if self.last.as_ref() == Some(&snapshot) {
            return;
        }
        render(&snapshot);
        self.last = Some(snapshot);
    }
}

fn render(snapshot: &SessionSnapshot) {
    match snapshot.phase {
        PhaseKind::Matchmaking => println!("{}", snapshot.status),
        PhaseKind::Playing | PhaseKind::GameOver => {
            let me = snapshot.color.unwrap_or(Color::White);
            let them = !me;
            if let Some(opponent) = &snapshot.opponent {
                println!(
                    "{} ({})  {}",
                    opponent.name,
                    opponent.rating,
                    snapshot.clock_text(them)
                );
            }
            println!("You ({})  {}", color_to_string(me), snapshot.clock_text(me));
            if let Some(fen) = &snapshot.fen {
                println!("{}", fen);
            }
            if !snapshot.moves.is_empty() {
                println!("Moves: {}", snapshot.moves.join(" "));
            }
            if snapshot.draw.offered_by_opponent {
                println!("Your opponent offers a draw: type 'accept' or 'decline'");
            }
            if let Some(notice) = &snapshot.notice {
                println!("{}", notice);
            }
            match &snapshot.result {
                Some(result) => {
                    println!("{}: {}", result.outcome.title(), result.message);
                    if let Some(rating) = result.rating {
                        println!("Rating change: {:+}", rating.delta);
                    }
                }
                None => println!("{}", snapshot.status),
            }
        }
    }
    if let Some(error) = &snapshot.error {
        println!("Error: {}", error);
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Input {
    Move {
        from: String,
        to: String,
        promotion: Option<Piece>,
    },
    OfferDraw,
    Accept,
    Decline,
    Resign,
    Abort,
    Retry,
    Cancel,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim().to_ascii_lowercase();
    let input = match line.as_str() {
        "draw" => Input::OfferDraw,
        "accept" => Input::Accept,
        "decline" => Input::Decline,
        "resign" => Input::Resign,
        "abort" => Input::Abort,
        "retry" => Input::Retry,
        "cancel" => Input::Cancel,
        "quit" | "exit" => Input::Quit,
        text if (text.len() == 4 || text.len() == 5) && text.is_ascii() => {
            let promotion = match text.get(4..) {
                Some("") | None => None,
                Some(piece) => Some(parse_promotion(piece)?),
            };
            Input::Move {
                from: text[0..2].to_string(),
                to: text[2..4].to_string(),
                promotion,
            }
        }
        _ => return None,
    };
    Some(input)
}

fn login(config: &ClientConfig) -> Result<AuthSession, ClientError> {
    let store = SessionStore::new(&config.session_file);
    if let Some(session) = store.load()? {
        info!("Using stored login for {}", session.user_id);
        return Ok(session);
    }
    match (&config.user_id, &config.token) {
        (Some(user_id), Some(token)) => {
            let session = AuthSession::new(user_id.as_str(), token.as_str());
            store.save(&session)?;
            Ok(session)
        }
        _ => Err(ClientError::NotLoggedIn),
    }
}

async fn show_profile(config: &ClientConfig, auth: &AuthSession) {
    let client = ProfileClient::new(config.server_url.as_str(), auth.token.as_str());
    match client.fetch_profile(&auth.user_id).await {
        Ok(profile) => println!(
            "{}: {} wins, {} losses, {} draws",
            profile.name, profile.stats.wins, profile.stats.losses, profile.stats.draws
        ),
        Err(e) => warn!("Could not load profile: {}", e),
    }
    match client.fetch_history(&auth.user_id).await {
        Ok(games) => {
            for game in recent(games, 5) {
                let outcome = match game.outcome_for(&auth.user_id) {
                    RecordOutcome::Win => "win",
                    RecordOutcome::Loss => "loss",
                    RecordOutcome::Draw => "draw",
                };
                println!(
                    "  {} {} ({})",
                    game.game_id,
                    outcome,
                    game.game_type.as_deref().unwrap_or("blitz")
                );
            }
        }
        Err(e) => warn!("Could not load game history: {}", e),
    }
}

fn spawn_input(session: Addr<GameSessionActor>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            };
            match parse_input(&line) {
                Some(Input::Move { from, to, promotion }) => session.do_send(SubmitMove {
                    from,
                    to,
                    promotion,
                }),
                Some(Input::OfferDraw) => session.do_send(OfferDraw),
                Some(Input::Accept) => session.do_send(RespondToDraw { accept: true }),
                Some(Input::Decline) => session.do_send(RespondToDraw { accept: false }),
                Some(Input::Resign) => session.do_send(Resign),
                Some(Input::Abort) => session.do_send(Abort),
                Some(Input::Retry) => session.do_send(RetrySearch),
                Some(Input::Cancel) => session.do_send(CancelSearch),
                Some(Input::Quit) => {
                    session.do_send(Leave);
                    break;
                }
                None => println!(
                    "Commands: e2e4, e7e8q, draw, accept, decline, resign, abort, retry, cancel, quit"
                ),
            }
        }
    });
}

#[actix_rt::main]
async fn main() -> Result<(), ClientError> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ClientConfig::from_env();
    let auth = match login(&config) {
        Ok(auth) => auth,
        Err(e) => {
            error!("{}: set CHESS_USER_ID and CHESS_TOKEN", e);
            return Err(e);
        }
    };
    show_profile(&config, &auth).await;

    let (transport, commands) = ChannelTransport::new();
    let machine = SessionMachine::new(
        Box::new(transport),
        config.time_control,
        Some(auth.user_id.clone()),
    );
    let view = ConsoleView::default().start();
    let session = GameSessionActor::new(machine, config.timings())
        .subscribe(view.recipient())
        .start();

    let gateway = Gateway::new(
        config.gateway(),
        Some(auth.token.clone()),
        session.clone().recipient(),
        session.clone().recipient(),
    );
    actix_rt::spawn(gateway.run(commands));
    spawn_input(session.clone());

    info!("Connecting to {} with time control {}s", config.ws_url(), config.time_control);
    while session.connected() {
        actix_rt::time::sleep(Duration::from_millis(200)).await;
    }

    // Let the gateway flush the last command
    actix_rt::time::sleep(Duration::from_millis(300)).await;
    info!("Goodbye");
    Ok(())
}
