use anyhow::{anyhow, Result};
use log::{info, warn};
use smol::Timer;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use base_station_core::{BaseStation, BaseStationConfig, LinkEvent, NodeAddress};

mod client;
mod link;

use client::ClientNode;
use link::SimLink;

const CHANNEL: u16 = 29;
const ROUNDS: usize = 6;
const ROUND_DELAY: Duration = Duration::from_millis(200);
const LOSS_EVERY: usize = 4; // one transmission out of four is lost
const MAX_RETRANSMISSIONS: u8 = 1;

const CLIENTS: [(u16, &str); 6] = [
    (0x0101, "Alice"),
    (0x0102, "Bob"),
    (0x0103, "Carol"),
    (0x0104, "Bob"),                        // same name, other node
    (0x0105, "Al"),                         // prefix of a known name
    (0x0106, "a-name-way-too-long-to-fit"), // refused by the registry
];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|err| anyhow!("Logger setup failed!\ncause: {:?}", err))?;

    let (station, clients) = smol::block_on(run(ROUND_DELAY))?;

    for client in clients.iter().filter(|c| !c.is_stopped()) {
        warn!(
            "Node {} ({}) was never told to stop.",
            client.address,
            String::from_utf8_lossy(&client.name)
        );
    }
    for (i, sender) in station.registry().iter().enumerate() {
        info!("Sender #{}: {}", i, sender);
    }
    info!("{:?}", station.stats());

    Ok(())
}

async fn run(round_delay: Duration) -> Result<(BaseStation<SimLink>, Vec<ClientNode>)> {
    let (inbound_tx, inbound_rx) = smol::channel::unbounded::<LinkEvent>();
    let (completions_tx, completions_rx) = smol::channel::unbounded::<LinkEvent>();

    let mut link = SimLink::new(completions_tx, LOSS_EVERY);
    let mut clients: Vec<ClientNode> = CLIENTS
        .iter()
        .map(|(address, name)| {
            let address = NodeAddress::from(*address);
            let (inbox_tx, inbox_rx) = smol::channel::unbounded();
            link.attach(address, inbox_tx);
            ClientNode::new(address, name.as_bytes(), inbox_rx)
        })
        .collect();

    let config = BaseStationConfig {
        channel: CHANNEL,
        max_retransmissions: MAX_RETRANSMISSIONS,
        ..Default::default()
    };
    let mut station: BaseStation<SimLink> = BaseStation::new(link, config);
    station
        .open()
        .map_err(|err| anyhow!("Failed to open channel {}!\ncause: {}", CHANNEL, err))?;

    // A truncated frame, shorter than the introduction header.
    inbound_tx
        .try_send(LinkEvent::Received {
            from: NodeAddress::from(0x01ff),
            payload: b"Hello".to_vec(),
        })
        .map_err(|_| anyhow!("Inbound queue closed."))?;

    for round in 0..ROUNDS {
        info!("Round {}", round + 1);
        for client in clients.iter().filter(|c| !c.is_stopped()) {
            inbound_tx
                .try_send(client.introduction())
                .map_err(|_| anyhow!("Inbound queue closed."))?;
        }

        // A message is only taken once the reply to the previous one completed, retries included.
        while let Ok(event) = inbound_rx.try_recv() {
            station.process(event);
            while let Ok(completion) = completions_rx.try_recv() {
                station.process(completion);
            }
        }

        for client in clients.iter_mut() {
            client.poll_replies();
        }
        if clients.iter().all(|c| c.is_stopped()) {
            break;
        }
        Timer::after(round_delay).await;
    }

    Ok((station, clients))
}
