//! Interfaces between the base station and the radio link layer.
use crate::station::Outcome;
use crate::NodeAddress;
use std::fmt::Debug;

/// Link layer able to carry single-hop unicast messages.
///
/// Sending is fire-and-forget: `send` only hands the payload over, the outcome of the
/// transmission comes back later as a [LinkEvent::Sent].
pub trait LinkLayer {
    type LinkError: Debug;

    /// Opens the unicast channel the base station listens on.
    fn open(&mut self, channel: u16) -> Result<(), Self::LinkError>;

    /// Queues `payload` for transmission to `to`.
    fn send(&mut self, payload: &[u8], to: NodeAddress) -> Result<(), Self::LinkError>;
}

/// Result of a transmission as reported by the MAC layer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TxStatus {
    Ok,
    Collision,
    NoAck,
    Deferred,
    Err,
    ErrFatal,
}

impl TxStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, TxStatus::Ok)
    }
}

/// Event delivered by the runtime to the base station, one at a time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LinkEvent {
    /// A unicast message was received.
    Received { from: NodeAddress, payload: Vec<u8> },
    /// The last queued transmission completed.
    Sent { status: TxStatus, transmissions: u8 },
}

/// Callbacks attached to an open unicast channel.
pub trait UnicastCallbacks {
    /// Called once per inbound unicast message.
    fn on_receive(&mut self, payload: &[u8], from: NodeAddress) -> Outcome;

    /// Called when the transmission queued by the previous `send` completed.
    fn on_sent(&mut self, status: TxStatus, transmissions: u8) -> Outcome;
}
