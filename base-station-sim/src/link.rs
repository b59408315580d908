//! In-memory link layer standing in for the radio stack.
use base_station_core::{LinkEvent, LinkLayer, NodeAddress, TxStatus};
use log::{debug, trace};
use smol::channel::Sender;
use std::collections::HashMap;

#[derive(thiserror::Error, Debug)]
pub enum SimLinkError {
    #[error("Unicast channel is not open.")]
    NotOpen,

    #[error("No node attached at address {0}.")]
    UnknownNode(NodeAddress),

    #[error("Queue closed.")]
    QueueClosed,
}

/// Delivers unicast payloads to the inbox of the addressed client and reports every
/// transmission back to the base station through the completion queue.
///
/// One transmission out of `loss_every` is lost (`0` disables losses).
pub struct SimLink {
    channel: Option<u16>,
    completions: Sender<LinkEvent>,
    inboxes: HashMap<NodeAddress, Sender<Vec<u8>>>,
    loss_every: usize,
    transmissions: usize,
}

impl SimLink {
    pub fn new(completions: Sender<LinkEvent>, loss_every: usize) -> Self {
        Self {
            channel: None,
            completions,
            inboxes: HashMap::new(),
            loss_every,
            transmissions: 0,
        }
    }

    pub fn attach(&mut self, address: NodeAddress, inbox: Sender<Vec<u8>>) {
        self.inboxes.insert(address, inbox);
    }

    fn is_lost(&self) -> bool {
        self.loss_every > 0 && self.transmissions % self.loss_every == 0
    }
}

impl LinkLayer for SimLink {
    type LinkError = SimLinkError;

    fn open(&mut self, channel: u16) -> Result<(), Self::LinkError> {
        debug!("Unicast channel {} opened.", channel);
        self.channel = Some(channel);
        Ok(())
    }

    fn send(&mut self, payload: &[u8], to: NodeAddress) -> Result<(), Self::LinkError> {
        if self.channel.is_none() {
            return Err(SimLinkError::NotOpen);
        }
        let inbox = self.inboxes.get(&to).ok_or(SimLinkError::UnknownNode(to))?;
        self.transmissions += 1;
        let status = if self.is_lost() {
            trace!("Dropping transmission #{} to {}.", self.transmissions, to);
            TxStatus::NoAck
        } else {
            inbox
                .try_send(payload.to_vec())
                .map_err(|_| SimLinkError::QueueClosed)?;
            TxStatus::Ok
        };
        let transmissions = if status.is_ok() { 1 } else { 3 };
        self.completions
            .try_send(LinkEvent::Sent {
                status,
                transmissions,
            })
            .map_err(|_| SimLinkError::QueueClosed)
    }
}
