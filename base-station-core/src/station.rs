//! Base station dispatch logic and send-result handling.
use log::{debug, info, trace, warn};
use std::collections::VecDeque;

use crate::config::BaseStationConfig;
use crate::device::{LinkEvent, LinkLayer, TxStatus, UnicastCallbacks};
use crate::error::DispatchError;
use crate::frame::{self, ReplyStatus};
use crate::registry::{RegistryError, SenderHandle, SenderRegistry, SENDER_CAPACITY};
use crate::NodeAddress;

/// What the base station did with an event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// A reply was handed to the link layer.
    Replied {
        to: NodeAddress,
        status: ReplyStatus,
        sender: SenderHandle,
    },
    /// The inbound message was dropped without reply.
    Dropped(DispatchError),
    /// The reply was transmitted.
    Delivered,
    /// The reply failed and was sent again from the transmit buffer.
    Retransmitted { to: NodeAddress, attempt: u8 },
    /// The reply could not be transmitted and will not be retried.
    SendFailed {
        to: Option<NodeAddress>,
        status: TxStatus,
        transmissions: u8,
    },
}

/// Counters kept for diagnostics.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    pub received: u32,
    pub success_replies: u32,
    pub stop_replies: u32,
    pub dropped: u32,
    pub retransmissions: u32,
    pub send_failures: u32,
}

fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}

/// Transmission handed to the link layer whose completion has not been reported yet.
///
/// Completions are reported in the order transmissions were queued.
#[derive(Copy, Clone, Debug)]
struct InFlight {
    reply: u32,
    to: NodeAddress,
    retransmissions: u8,
}

/// Reply currently held by the transmit buffer.
#[derive(Copy, Clone, Debug)]
struct BufferedReply {
    reply: u32,
    len: usize,
}

/// Protocol engine of the base station.
///
/// Every entry point takes `&mut self` and runs to completion: the runtime delivers events one
/// at a time, so the registry and the transmit buffer are never observed mid-update.
pub struct BaseStation<L: LinkLayer, const N: usize = SENDER_CAPACITY> {
    link: L,
    config: BaseStationConfig,
    registry: SenderRegistry<N>,
    tx_buffer: Vec<u8>,
    buffered: Option<BufferedReply>,
    in_flight: VecDeque<InFlight>,
    next_reply: u32,
    stats: Stats,
}

impl<L: LinkLayer, const N: usize> BaseStation<L, N> {
    pub fn new(link: L, config: BaseStationConfig) -> Self {
        Self {
            link,
            tx_buffer: vec![0; config.tx_buffer_len],
            config,
            registry: SenderRegistry::new(),
            buffered: None,
            in_flight: VecDeque::new(),
            next_reply: 0,
            stats: Stats::default(),
        }
    }

    /// Opens the configured channel on the link layer.
    pub fn open(&mut self) -> Result<(), L::LinkError> {
        self.link.open(self.config.channel)?;
        info!("Waiting for clients on channel {}", self.config.channel);
        Ok(())
    }

    /// Processes a single event delivered by the runtime.
    pub fn process(&mut self, event: LinkEvent) -> Outcome {
        match event {
            LinkEvent::Received { from, payload } => self.on_receive(&payload, from),
            LinkEvent::Sent {
                status,
                transmissions,
            } => self.on_sent(status, transmissions),
        }
    }

    pub fn registry(&self) -> &SenderRegistry<N> {
        &self.registry
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn config(&self) -> &BaseStationConfig {
        &self.config
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Number of transmissions still waiting for their completion.
    pub fn unconfirmed(&self) -> usize {
        self.in_flight.len()
    }

    fn dispatch(
        &mut self,
        payload: &[u8],
        from: NodeAddress,
    ) -> Result<(ReplyStatus, SenderHandle), DispatchError> {
        let intro = frame::decode_introduction(payload, self.config.header_len)?;
        let (status, sender) = match self.registry.find(intro.name) {
            Some(sender) => (ReplyStatus::Stop, sender),
            None => (ReplyStatus::Success, self.registry.insert(intro.name)?),
        };
        // A duplicate is answered with the stored name, not the received bytes.
        self.reply_to_sender(from, sender, status)?;
        if let Some(record) = self.registry.get(sender) {
            match status {
                ReplyStatus::Success => info!("Received message from {}", record),
                ReplyStatus::Stop => info!("Received duplicate from {}", record),
            }
        }
        Ok((status, sender))
    }

    fn reply_to_sender(
        &mut self,
        to: NodeAddress,
        sender: SenderHandle,
        status: ReplyStatus,
    ) -> Result<(), DispatchError> {
        let record = self
            .registry
            .get(sender)
            .ok_or(RegistryError::UnknownSender {
                index: sender.index(),
            })?;
        let len = frame::encode_reply(status, record.name(), &mut self.tx_buffer)?;
        if let Some(previous) = self.buffered.take() {
            if self.in_flight.iter().any(|sent| sent.reply == previous.reply) {
                debug!("Transmit buffer reused before the previous reply was confirmed.");
            }
        }
        self.transmit(to, len)?;

        let reply = self.next_reply;
        self.next_reply = self.next_reply.wrapping_add(1);
        self.buffered = Some(BufferedReply { reply, len });
        self.in_flight.push_back(InFlight {
            reply,
            to,
            retransmissions: 0,
        });
        match status {
            ReplyStatus::Success => bump(&mut self.stats.success_replies),
            ReplyStatus::Stop => bump(&mut self.stats.stop_replies),
        }
        info!("Replied to {} status {}", to, status.code());
        Ok(())
    }

    fn transmit(&mut self, to: NodeAddress, len: usize) -> Result<(), DispatchError> {
        self.link
            .send(&self.tx_buffer[..len], to)
            .map_err(|err| DispatchError::SendFailed {
                to,
                context: format!("{:?}", err),
            })
    }

    /// Sends the buffered copy of `sent` again if it is still there and retries are left.
    fn retransmit(&mut self, sent: InFlight) -> Option<Result<Outcome, DispatchError>> {
        if sent.retransmissions >= self.config.max_retransmissions {
            return None;
        }
        let buffered = self.buffered.filter(|buffered| buffered.reply == sent.reply)?;
        let attempt = sent.retransmissions + 1;
        if let Err(err) = self.transmit(sent.to, buffered.len) {
            return Some(Err(err));
        }
        self.in_flight.push_back(InFlight {
            retransmissions: attempt,
            ..sent
        });
        bump(&mut self.stats.retransmissions);
        info!(
            "Retransmitting reply to {} (attempt {}/{}).",
            sent.to, attempt, self.config.max_retransmissions
        );
        Some(Ok(Outcome::Retransmitted {
            to: sent.to,
            attempt,
        }))
    }
}

impl<L: LinkLayer, const N: usize> UnicastCallbacks for BaseStation<L, N> {
    fn on_receive(&mut self, payload: &[u8], from: NodeAddress) -> Outcome {
        bump(&mut self.stats.received);
        match self.dispatch(payload, from) {
            Ok((status, sender)) => Outcome::Replied {
                to: from,
                status,
                sender,
            },
            Err(err) => {
                bump(&mut self.stats.dropped);
                warn!("Message from {} dropped: {}", from, err);
                Outcome::Dropped(err)
            }
        }
    }

    fn on_sent(&mut self, status: TxStatus, transmissions: u8) -> Outcome {
        let sent = self.in_flight.pop_front();
        if status.is_ok() {
            trace!("Reply transmitted after {} transmission(s).", transmissions);
            return Outcome::Delivered;
        }
        if let Some(sent) = sent {
            match self.retransmit(sent) {
                Some(Ok(outcome)) => return outcome,
                Some(Err(err)) => warn!("Retransmission failed: {}", err),
                None => {}
            }
        }
        bump(&mut self.stats.send_failures);
        let to = sent.map(|sent| sent.to);
        match to {
            Some(to) => warn!(
                "Couldn't transmit to {} ({:?} after {} transmission(s)).",
                to, status, transmissions
            ),
            None => warn!(
                "Couldn't transmit ({:?} after {} transmission(s)).",
                status, transmissions
            ),
        }
        Outcome::SendFailed {
            to,
            status,
            transmissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingLink {
        sent: Vec<(NodeAddress, Vec<u8>)>,
        refuse: bool,
    }

    impl LinkLayer for RecordingLink {
        type LinkError = &'static str;

        fn open(&mut self, _channel: u16) -> Result<(), Self::LinkError> {
            Ok(())
        }

        fn send(&mut self, payload: &[u8], to: NodeAddress) -> Result<(), Self::LinkError> {
            if self.refuse {
                return Err("radio busy");
            }
            self.sent.push((to, payload.to_vec()));
            Ok(())
        }
    }

    fn intro(name: &str) -> Vec<u8> {
        let mut payload = b"Hello, I am ".to_vec();
        payload.extend_from_slice(name.as_bytes());
        payload
    }

    const CLIENT: NodeAddress = NodeAddress::new(0x12, 0x01);

    #[test]
    fn test_retransmits_up_to_the_configured_bound() {
        let config = BaseStationConfig {
            max_retransmissions: 2,
            ..Default::default()
        };
        let mut station: BaseStation<RecordingLink> = BaseStation::new(RecordingLink::default(), config);
        station.on_receive(&intro("Dave"), CLIENT);

        assert_eq!(
            station.on_sent(TxStatus::NoAck, 3),
            Outcome::Retransmitted { to: CLIENT, attempt: 1 }
        );
        assert_eq!(
            station.on_sent(TxStatus::Collision, 3),
            Outcome::Retransmitted { to: CLIENT, attempt: 2 }
        );
        assert_eq!(
            station.on_sent(TxStatus::NoAck, 3),
            Outcome::SendFailed {
                to: Some(CLIENT),
                status: TxStatus::NoAck,
                transmissions: 3
            }
        );

        let sent = &station.link().sent;
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|(to, bytes)| *to == CLIENT && bytes == b"Well done Dave"));
        assert_eq!(station.stats().retransmissions, 2);
        assert_eq!(station.stats().send_failures, 1);
        assert_eq!(station.registry().len(), 1);
    }

    #[test]
    fn test_successful_retransmission_clears_pending_reply() {
        let config = BaseStationConfig {
            max_retransmissions: 1,
            ..Default::default()
        };
        let mut station: BaseStation<RecordingLink> = BaseStation::new(RecordingLink::default(), config);
        station.on_receive(&intro("Dave"), CLIENT);

        assert!(matches!(station.on_sent(TxStatus::Deferred, 1), Outcome::Retransmitted { .. }));
        assert_eq!(station.on_sent(TxStatus::Ok, 1), Outcome::Delivered);
        // Nothing left to retry.
        assert_eq!(
            station.on_sent(TxStatus::Err, 1),
            Outcome::SendFailed {
                to: None,
                status: TxStatus::Err,
                transmissions: 1
            }
        );
        assert_eq!(station.link().sent.len(), 2);
    }

    #[test]
    fn test_completion_of_overwritten_reply_is_not_retransmitted() {
        let config = BaseStationConfig {
            max_retransmissions: 3,
            ..Default::default()
        };
        let mut station: BaseStation<RecordingLink> = BaseStation::new(RecordingLink::default(), config);
        station.on_receive(&intro("Dave"), CLIENT);
        let other = NodeAddress::new(0x12, 0x02);
        station.on_receive(&intro("Erin"), other);
        assert_eq!(station.unconfirmed(), 2);

        // First completion belongs to Dave's reply, no longer in the buffer.
        assert_eq!(
            station.on_sent(TxStatus::NoAck, 1),
            Outcome::SendFailed {
                to: Some(CLIENT),
                status: TxStatus::NoAck,
                transmissions: 1
            }
        );
        // Second one is Erin's, still buffered.
        assert_eq!(
            station.on_sent(TxStatus::NoAck, 1),
            Outcome::Retransmitted { to: other, attempt: 1 }
        );
        let sent = &station.link().sent;
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2], (other, b"Well done Erin".to_vec()));
        assert_eq!(station.stats().send_failures, 1);
    }

    #[test]
    fn test_lost_reply_is_resent_to_its_own_address() {
        let config = BaseStationConfig {
            max_retransmissions: 1,
            ..Default::default()
        };
        let mut station: BaseStation<RecordingLink> = BaseStation::new(RecordingLink::default(), config);
        station.on_receive(&intro("Dave"), CLIENT);
        assert_eq!(station.on_sent(TxStatus::Ok, 1), Outcome::Delivered);

        let other = NodeAddress::new(0x12, 0x02);
        station.on_receive(&intro("Dave"), other);
        assert_eq!(
            station.on_sent(TxStatus::Collision, 2),
            Outcome::Retransmitted { to: other, attempt: 1 }
        );
        assert_eq!(station.on_sent(TxStatus::Ok, 1), Outcome::Delivered);
        assert_eq!(station.unconfirmed(), 0);

        let sent = &station.link().sent;
        assert_eq!(sent[1], sent[2]);
        assert_eq!(sent[2].0, other);
        assert_eq!(sent[2].1, b"Your message has already been received Dave".to_vec());
    }

    #[test]
    fn test_counters_saturate() {
        let mut station: BaseStation<RecordingLink> =
            BaseStation::new(RecordingLink::default(), BaseStationConfig::default());
        station.stats.received = u32::MAX;
        station.stats.dropped = u32::MAX;

        assert!(matches!(station.on_receive(b"short", CLIENT), Outcome::Dropped(_)));
        assert_eq!(station.stats().received, u32::MAX);
        assert_eq!(station.stats().dropped, u32::MAX);
    }

    #[test]
    fn test_refused_send_drops_message_but_keeps_sender() {
        let link = RecordingLink {
            refuse: true,
            ..Default::default()
        };
        let mut station: BaseStation<RecordingLink> = BaseStation::new(link, BaseStationConfig::default());

        let outcome = station.on_receive(&intro("Frank"), CLIENT);
        assert!(matches!(
            outcome,
            Outcome::Dropped(DispatchError::SendFailed { to: CLIENT, .. })
        ));
        assert_eq!(station.registry().len(), 1);
        assert_eq!(station.stats().dropped, 1);

        station.link_mut().refuse = false;
        assert!(matches!(
            station.on_receive(&intro("Frank"), CLIENT),
            Outcome::Replied { status: ReplyStatus::Stop, .. }
        ));
    }

    #[test]
    fn test_small_transmit_buffer_drops_reply() {
        let config = BaseStationConfig {
            tx_buffer_len: 16,
            ..Default::default()
        };
        let mut station: BaseStation<RecordingLink> = BaseStation::new(RecordingLink::default(), config);

        assert!(matches!(
            station.on_receive(&intro("Alice"), CLIENT),
            Outcome::Replied { status: ReplyStatus::Success, .. }
        ));
        assert_eq!(
            station.on_receive(&intro("Alice"), CLIENT),
            Outcome::Dropped(DispatchError::Frame(frame::FrameError::BufferTooSmall {
                needed: 44,
                available: 16
            }))
        );
        assert_eq!(station.link().sent.len(), 1);
    }
}
