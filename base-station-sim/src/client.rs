//! Client nodes introducing themselves to the base station.
use base_station_core::frame::{Introduction, Reply};
use base_station_core::{LinkEvent, NodeAddress, ReplyStatus};
use log::{info, warn};
use smol::channel::Receiver;

/// Greeting every client puts in front of its name.
pub const GREETING: &[u8] = b"Hello, I am ";

/// A basic client node, introducing itself until the base station asks it to stop.
pub struct ClientNode {
    pub address: NodeAddress,
    pub name: Vec<u8>,
    inbox: Receiver<Vec<u8>>,
    stopped: bool,
}

impl ClientNode {
    pub fn new(address: NodeAddress, name: &[u8], inbox: Receiver<Vec<u8>>) -> Self {
        Self {
            address,
            name: name.to_owned(),
            inbox,
            stopped: false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn introduction(&self) -> LinkEvent {
        let payload = Introduction {
            header: GREETING,
            name: &self.name,
        }
        .to_bytes();
        LinkEvent::Received {
            from: self.address,
            payload,
        }
    }

    /// Reads every reply delivered since the last call.
    pub fn poll_replies(&mut self) {
        while let Ok(bytes) = self.inbox.try_recv() {
            match Reply::try_from_bytes(&bytes) {
                Ok(reply) => {
                    info!(
                        "Node {} received: {}",
                        self.address,
                        String::from_utf8_lossy(&bytes)
                    );
                    if reply.status == ReplyStatus::Stop {
                        self.stopped = true;
                    }
                }
                Err(err) => warn!("Node {} received garbage: {}", self.address, err),
            }
        }
    }
}
