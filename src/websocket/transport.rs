use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use log::warn;

use crate::models::messages::ClientCommand;

/// Outbound side of the server connection, as the session sees it.
///
/// Emitting never blocks and never fails from the caller's point of view.
pub trait Transport {
    fn emit(&self, command: ClientCommand);
}

/// Queues commands for the gateway task to write to the socket
#[derive(Clone)]
pub struct ChannelTransport {
    sender: UnboundedSender<ClientCommand>,
}

impl ChannelTransport {
    pub fn new() -> (Self, UnboundedReceiver<ClientCommand>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl Transport for ChannelTransport {
    fn emit(&self, command: ClientCommand) {
        if let Err(e) = self.sender.unbounded_send(command) {
            warn!("Dropping {} command: gateway is gone", e.into_inner().name());
        }
    }
}

/// Everything queued so far, without waiting
pub fn drain(receiver: &mut UnboundedReceiver<ClientCommand>) -> Vec<ClientCommand> {
    let mut commands = Vec::new();
    while let Ok(command) = receiver.try_recv() {
        commands.push(command);
    }
    commands
}
