use crate::frame::INTRODUCTION_HEADER_LEN;

/// Channel the base station listens on by default.
pub const DEFAULT_CHANNEL: u16 = 29;

/// Size of the shared transmit buffer of the radio stack (bytes).
pub const DEFAULT_TX_BUFFER_LEN: usize = 128;

/// Runtime parameters of a [BaseStation](crate::station::BaseStation).
///
/// Registry capacity is not part of it: it is fixed at compile time by the station type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BaseStationConfig {
    /// Link-layer channel opened at startup.
    pub channel: u16,
    /// Number of bytes preceding the sender name in an introduction message.
    pub header_len: usize,
    /// Capacity of the shared transmit buffer replies are encoded into.
    pub tx_buffer_len: usize,
    /// Resends of a reply after a failed transmission. `0` disables retries.
    pub max_retransmissions: u8,
}

impl Default for BaseStationConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL,
            header_len: INTRODUCTION_HEADER_LEN,
            tx_buffer_len: DEFAULT_TX_BUFFER_LEN,
            max_retransmissions: 0,
        }
    }
}
