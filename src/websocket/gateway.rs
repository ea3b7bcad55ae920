use actix::Recipient;
use awc::http::header::AUTHORIZATION;
use awc::ws::{Frame, Message};
use futures::channel::mpsc::UnboundedReceiver;
use futures::{select, Sink, SinkExt, Stream, StreamExt};
use log::{debug, error, info, warn};
use std::fmt::Display;
use std::time::Duration;

use crate::error::ClientError;
use crate::models::messages::{decode_event, encode_command, ClientCommand, ConnectionEvent, ServerEvent};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: String,
    /// Consecutive failed connects before giving up
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

/// Socket side of the session: writes queued commands, forwards decoded
/// events, and reconnects after drops.
pub struct Gateway {
    config: GatewayConfig,
    token: Option<String>,
    client: awc::Client,
    events: Recipient<ServerEvent>,
    connection: Recipient<ConnectionEvent>,
}

impl Gateway {
    pub fn new(
        config: GatewayConfig,
        token: Option<String>,
        events: Recipient<ServerEvent>,
        connection: Recipient<ConnectionEvent>,
    ) -> Self {
        Self {
            config,
            token,
            client: awc::Client::default(),
            events,
            connection,
        }
    }

    /// Runs until the command queue closes or reconnecting is given up
    pub async fn run(self, mut commands: UnboundedReceiver<ClientCommand>) {
        let mut failures = 0u32;

        loop {
            info!("Connecting to {}", self.config.url);
            let mut request = self.client.ws(self.config.url.as_str());
            if let Some(token) = &self.token {
                request = request.header(AUTHORIZATION, format!("Bearer {}", token));
            }

            match request.connect().await {
                Ok((_, framed)) => {
                    failures = 0;
                    self.connection.do_send(ConnectionEvent::Connected);

                    let (mut sink, stream) = framed.split::<Message>();
                    let finished = self.pump(stream, &mut sink, &mut commands).await;
                    self.connection.do_send(ConnectionEvent::Disconnected);
                    if finished {
                        info!("Command queue closed, gateway shutting down");
                        return;
                    }
                }
                Err(e) => {
                    failures += 1;
                    let e = ClientError::Connect(e.to_string());
                    warn!("{} (attempt {})", e, failures);
                    self.connection.do_send(ConnectionEvent::ConnectError(e.to_string()));
                    if failures >= self.config.reconnect_attempts {
                        error!("Giving up after {} failed connection attempts", failures);
                        return;
                    }
                }
            }

            actix_rt::time::sleep(self.config.reconnect_delay).await;
        }
    }

    /// Move frames both ways for one connection.
    ///
    /// Returns true when the command queue closed, false when the socket did.
    async fn pump<S, K, E, F>(
        &self,
        stream: S,
        sink: &mut K,
        commands: &mut UnboundedReceiver<ClientCommand>,
    ) -> bool
    where
        S: Stream<Item = Result<Frame, E>> + Unpin,
        K: Sink<Message, Error = F> + Unpin,
        E: Display,
        F: Display,
    {
        let mut frames = stream.fuse();

        loop {
            select! {
                command = commands.next() => match command {
                    Some(command) => match encode_command(&command) {
                        Ok(text) => {
                            debug!("-> {}", text);
                            if let Err(e) = sink.send(Message::Text(text.into())).await {
                                warn!("Failed to send {}: {}", command.name(), e);
                                return false;
                            }
                        }
                        Err(e) => warn!("Could not encode {}: {}", command.name(), e),
                    },
                    None => {
                        if let Err(e) = sink.send(Message::Close(None)).await {
                            debug!("Close frame not sent: {}", e);
                        }
                        return true;
                    }
                },
                frame = frames.next() => match frame {
                    Some(Ok(Frame::Text(bytes))) => self.dispatch(&bytes),
                    Some(Ok(Frame::Ping(payload))) => {
                        if let Err(e) = sink.send(Message::Pong(payload)).await {
                            warn!("Failed to answer ping: {}", e);
                            return false;
                        }
                    }
                    Some(Ok(Frame::Close(reason))) => {
                        info!("Server closed the connection: {:?}", reason);
                        return false;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("{}", ClientError::Protocol(e.to_string()));
                        return false;
                    }
                    None => {
                        info!("Connection stream ended");
                        return false;
                    }
                },
            }
        }
    }

    fn dispatch(&self, bytes: &[u8]) {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!("Dropping non UTF-8 frame: {}", e);
                return;
            }
        };
        debug!("<- {}", text);
        match decode_event(text) {
            Ok(event) => self.events.do_send(event),
            Err(e) => warn!("Ignoring unrecognized message {}: {}", text, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix::prelude::*;
    use awc::ws::Message;
    use futures::channel::mpsc::unbounded;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct Seen {
        events: Arc<Mutex<Vec<ServerEvent>>>,
    }

    impl Actor for Seen {
        type Context = Context<Self>;
    }

    impl Handler<ServerEvent> for Seen {
        type Result = ();

        fn handle(&mut self, msg: ServerEvent, _: &mut Self::Context) {
            self.events.lock().unwrap().push(msg);
        }
    }

    impl Handler<ConnectionEvent> for Seen {
        type Result = ();

        fn handle(&mut self, _: ConnectionEvent, _: &mut Self::Context) {}
    }

    fn gateway(seen: &Addr<Seen>) -> Gateway {
        Gateway::new(
            GatewayConfig {
                url: "ws://127.0.0.1:1/ws".to_string(),
                reconnect_attempts: 1,
                reconnect_delay: Duration::from_millis(1),
            },
            None,
            seen.clone().recipient(),
            seen.clone().recipient(),
        )
    }

    #[actix_rt::test]
    async fn text_frames_become_events() {
        let seen = Seen::default();
        let events = seen.events.clone();
        let addr = seen.start();
        let gateway = gateway(&addr);

        let frames = futures::stream::iter(vec![
            Ok::<Frame, String>(Frame::Text(r#"{"event":"game_waiting"}"#.into())),
            Ok(Frame::Text(r#"{"event":"bogus"}"#.into())),
            Ok(Frame::Text(r#"{"event":"draw_offered"}"#.into())),
        ]);
        let (mut sink, _written) = unbounded::<Message>();
        let (_commands_tx, mut commands) = unbounded::<ClientCommand>();

        let finished = gateway.pump(frames, &mut sink, &mut commands).await;
        actix_rt::time::sleep(Duration::from_millis(20)).await;

        assert!(!finished);
        assert_eq!(
            *events.lock().unwrap(),
            vec![ServerEvent::GameWaiting, ServerEvent::DrawOffered]
        );
    }

    #[actix_rt::test]
    async fn pings_are_answered() {
        let addr = Seen::default().start();
        let gateway = gateway(&addr);

        let frames = futures::stream::iter(vec![Ok::<Frame, String>(Frame::Ping("hi".into()))]);
        let (mut sink, mut written) = unbounded::<Message>();
        let (_commands_tx, mut commands) = unbounded::<ClientCommand>();

        gateway.pump(frames, &mut sink, &mut commands).await;
        assert!(matches!(written.try_recv(), Ok(Message::Pong(_))));
    }

    #[actix_rt::test]
    async fn commands_are_written_then_closed() {
        let addr = Seen::default().start();
        let gateway = gateway(&addr);

        let frames = futures::stream::pending::<Result<Frame, String>>();
        let (mut sink, mut written) = unbounded::<Message>();
        let (commands_tx, mut commands) = unbounded::<ClientCommand>();
        commands_tx.unbounded_send(ClientCommand::FindGame(300)).unwrap();
        drop(commands_tx);

        let finished = gateway.pump(frames, &mut sink, &mut commands).await;
        assert!(finished);
        match written.try_recv() {
            Ok(Message::Text(text)) => {
                assert_eq!(&*text, r#"{"event":"find_game","data":300}"#)
            }
            other => panic!("expected a text frame, got {:?}", other),
        }
        assert!(matches!(written.try_recv(), Ok(Message::Close(None))));
    }
}
