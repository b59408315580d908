#![allow(dead_code)]

use base_station_core::{LinkEvent, LinkLayer, NodeAddress};

/// Link layer keeping every payload handed to it.
#[derive(Default)]
pub struct MockLink {
    pub opened: Option<u16>,
    pub sent: Vec<(NodeAddress, Vec<u8>)>,
}

impl LinkLayer for MockLink {
    type LinkError = String;

    fn open(&mut self, channel: u16) -> Result<(), Self::LinkError> {
        self.opened = Some(channel);
        Ok(())
    }

    fn send(&mut self, payload: &[u8], to: NodeAddress) -> Result<(), Self::LinkError> {
        self.sent.push((to, payload.to_vec()));
        Ok(())
    }
}

pub fn introduction(from: NodeAddress, name: &[u8]) -> LinkEvent {
    let mut payload = b"Hello, I am ".to_vec();
    payload.extend_from_slice(name);
    LinkEvent::Received { from, payload }
}

pub fn address(n: u8) -> NodeAddress {
    NodeAddress::new(n, 0)
}
