//! Protocol engine of a base station collecting introductions from client nodes.
//!
//! Clients send a single-hop unicast introduction carrying their name. The base station
//! remembers every distinct name in a bounded [registry](registry::SenderRegistry) and
//! answers either with a SUCCESS reply (first contact) or a STOP reply (already known).
//!
//! The scheduling runtime and the radio link layer are not part of this crate, they are
//! reached through the [LinkLayer](device::LinkLayer) trait and the [LinkEvent](device::LinkEvent)
//! values handed to [BaseStation::process](station::BaseStation::process).

pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod registry;
pub mod station;

pub use config::BaseStationConfig;
pub use device::{LinkEvent, LinkLayer, TxStatus, UnicastCallbacks};
pub use error::DispatchError;
pub use frame::ReplyStatus;
pub use registry::{SenderHandle, SenderRegistry};
pub use station::{BaseStation, Outcome};

use std::fmt;

/// Link-layer address of a node (two bytes, as handed out by the radio stack).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeAddress(pub [u8; 2]);

impl NodeAddress {
    pub const fn new(high: u8, low: u8) -> Self {
        NodeAddress([high, low])
    }
}

impl From<u16> for NodeAddress {
    fn from(inner: u16) -> Self {
        NodeAddress(inner.to_be_bytes())
    }
}

impl From<NodeAddress> for u16 {
    fn from(addr: NodeAddress) -> Self {
        u16::from_be_bytes(addr.0)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}.{:x}", self.0[0], self.0[1])
    }
}
