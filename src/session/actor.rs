use actix::prelude::*;
use chess::Piece;
use log::{debug, info};
use std::time::Duration;

use crate::error::MoveRejection;
use crate::models::game_state::PhaseKind;
use crate::models::messages::{ConnectionEvent, ServerEvent};
use crate::session::machine::{SessionMachine, SessionSnapshot};

/// Timer periods driving the session
#[derive(Debug, Clone, Copy)]
pub struct SessionTimings {
    pub tick: Duration,
    pub ack_timeout: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            ack_timeout: Duration::from_secs(10),
        }
    }
}

/// Published to subscribers after every change
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct SessionUpdate(pub SessionSnapshot);

#[derive(Message, Debug, Clone)]
#[rtype(result = "Result<(), MoveRejection>")]
pub struct SubmitMove {
    pub from: String,
    pub to: String,
    pub promotion: Option<Piece>,
}

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "bool")]
pub struct OfferDraw;

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "bool")]
pub struct RespondToDraw {
    pub accept: bool,
}

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "bool")]
pub struct Resign;

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "bool")]
pub struct Abort;

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "bool")]
pub struct RetrySearch;

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "bool")]
pub struct CancelSearch;

/// Leave the session screen; stops the actor
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "()")]
pub struct Leave;

#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "SessionSnapshot")]
pub struct GetSnapshot;

/// Owns the session machine and the timers around it.
///
/// The clock ticker runs only while playing, the search ticker only while
/// searching, and the acknowledgment deadline only while a resign or abort
/// is unanswered. The actor stops itself once the machine is closed.
pub struct GameSessionActor {
    machine: SessionMachine,
    timings: SessionTimings,
    clock_ticker: Option<SpawnHandle>,
    search_ticker: Option<SpawnHandle>,
    ack_deadline: Option<SpawnHandle>,
    subscribers: Vec<Recipient<SessionUpdate>>,
}

impl GameSessionActor {
    pub fn new(machine: SessionMachine, timings: SessionTimings) -> Self {
        Self {
            machine,
            timings,
            clock_ticker: None,
            search_ticker: None,
            ack_deadline: None,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(mut self, subscriber: Recipient<SessionUpdate>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    fn publish(&self) {
        let snapshot = self.machine.snapshot();
        for subscriber in &self.subscribers {
            subscriber.do_send(SessionUpdate(snapshot.clone()));
        }
    }

    fn sync_timers(&mut self, ctx: &mut Context<Self>) {
        let playing = self.machine.kind() == PhaseKind::Playing && !self.machine.is_closed();
        match (playing, self.clock_ticker) {
            (true, None) => {
                debug!("Starting clock ticker");
                self.clock_ticker = Some(ctx.run_interval(self.timings.tick, |act, ctx| {
                    act.machine.tick_clock();
                    act.refresh(ctx);
                }));
            }
            (false, Some(handle)) => {
                ctx.cancel_future(handle);
                self.clock_ticker = None;
            }
            _ => {}
        }

        let searching = self.machine.is_searching() && !self.machine.is_closed();
        match (searching, self.search_ticker) {
            (true, None) => {
                self.search_ticker = Some(ctx.run_interval(self.timings.tick, |act, ctx| {
                    act.machine.tick_search();
                    act.refresh(ctx);
                }));
            }
            (false, Some(handle)) => {
                ctx.cancel_future(handle);
                self.search_ticker = None;
            }
            _ => {}
        }

        if !self.machine.awaiting_ack() {
            if let Some(handle) = self.ack_deadline.take() {
                ctx.cancel_future(handle);
            }
        }
    }

    fn arm_ack_deadline(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.ack_deadline.take() {
            ctx.cancel_future(handle);
        }
        self.ack_deadline = Some(ctx.run_later(self.timings.ack_timeout, |act, ctx| {
            act.ack_deadline = None;
            act.machine.ack_timed_out();
            act.refresh(ctx);
        }));
    }

    fn cancel_timers(&mut self, ctx: &mut Context<Self>) {
        for handle in [
            self.clock_ticker.take(),
            self.search_ticker.take(),
            self.ack_deadline.take(),
        ]
        .into_iter()
        .flatten()
        {
            ctx.cancel_future(handle);
        }
    }

    fn refresh(&mut self, ctx: &mut Context<Self>) {
        self.sync_timers(ctx);
        self.publish();
        if self.machine.is_closed() {
            ctx.stop();
        }
    }
}

impl Actor for GameSessionActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("Game session started");
        self.refresh(ctx);
    }

    fn stopping(&mut self, ctx: &mut Self::Context) -> Running {
        self.machine.teardown();
        self.cancel_timers(ctx);
        self.publish();
        info!("Game session closed");
        Running::Stop
    }
}

impl Handler<ServerEvent> for GameSessionActor {
    type Result = ();

    fn handle(&mut self, msg: ServerEvent, ctx: &mut Self::Context) {
        debug!("Received {}", msg.name());
        self.machine.on_event(msg);
        self.refresh(ctx);
    }
}

impl Handler<ConnectionEvent> for GameSessionActor {
    type Result = ();

    fn handle(&mut self, msg: ConnectionEvent, ctx: &mut Self::Context) {
        self.machine.on_connection(msg);
        self.refresh(ctx);
    }
}

impl Handler<SubmitMove> for GameSessionActor {
    type Result = Result<(), MoveRejection>;

    fn handle(&mut self, msg: SubmitMove, ctx: &mut Self::Context) -> Self::Result {
        let result = self.machine.submit_move(&msg.from, &msg.to, msg.promotion);
        match &result {
            Ok(()) => self.refresh(ctx),
            Err(e) => info!("Move {}-{} refused: {}", msg.from, msg.to, e),
        }
        result
    }
}

impl Handler<OfferDraw> for GameSessionActor {
    type Result = MessageResult<OfferDraw>;

    fn handle(&mut self, _: OfferDraw, ctx: &mut Self::Context) -> Self::Result {
        let sent = self.machine.offer_draw();
        self.refresh(ctx);
        MessageResult(sent)
    }
}

impl Handler<RespondToDraw> for GameSessionActor {
    type Result = MessageResult<RespondToDraw>;

    fn handle(&mut self, msg: RespondToDraw, ctx: &mut Self::Context) -> Self::Result {
        let sent = self.machine.respond_to_draw(msg.accept);
        self.refresh(ctx);
        MessageResult(sent)
    }
}

impl Handler<Resign> for GameSessionActor {
    type Result = MessageResult<Resign>;

    fn handle(&mut self, _: Resign, ctx: &mut Self::Context) -> Self::Result {
        let sent = self.machine.resign();
        if sent {
            self.arm_ack_deadline(ctx);
        }
        self.refresh(ctx);
        MessageResult(sent)
    }
}

impl Handler<Abort> for GameSessionActor {
    type Result = MessageResult<Abort>;

    fn handle(&mut self, _: Abort, ctx: &mut Self::Context) -> Self::Result {
        let sent = self.machine.abort();
        if sent {
            self.arm_ack_deadline(ctx);
        }
        self.refresh(ctx);
        MessageResult(sent)
    }
}

impl Handler<RetrySearch> for GameSessionActor {
    type Result = MessageResult<RetrySearch>;

    fn handle(&mut self, _: RetrySearch, ctx: &mut Self::Context) -> Self::Result {
        let sent = self.machine.retry_search();
        self.refresh(ctx);
        MessageResult(sent)
    }
}

impl Handler<CancelSearch> for GameSessionActor {
    type Result = MessageResult<CancelSearch>;

    fn handle(&mut self, _: CancelSearch, ctx: &mut Self::Context) -> Self::Result {
        let sent = self.machine.cancel_search();
        self.refresh(ctx);
        MessageResult(sent)
    }
}

impl Handler<Leave> for GameSessionActor {
    type Result = ();

    fn handle(&mut self, _: Leave, ctx: &mut Self::Context) {
        info!("Leaving game session");
        ctx.stop();
    }
}

impl Handler<GetSnapshot> for GameSessionActor {
    type Result = MessageResult<GetSnapshot>;

    fn handle(&mut self, _: GetSnapshot, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.machine.snapshot())
    }
}
