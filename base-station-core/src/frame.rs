//! Wire formats exchanged between client nodes and the base station.
//!
//! Two layouts share the radio buffer:
//! - the **introduction** sent by a client: a fixed-size header followed by the client name;
//! - the **reply** sent back by the base station: an ASCII prefix depending on the
//!   [ReplyStatus], immediately followed by the name (no terminator).

/// Length of the header preceding the name in an introduction message.
pub const INTRODUCTION_HEADER_LEN: usize = 12;

pub const SUCCESS_PREFIX: &[u8] = b"Well done ";
pub const STOP_PREFIX: &[u8] = b"Your message has already been received ";

/// Trait to calculate size on frame for every component on frame.
pub trait FrameSize {
    /// Calculate component size on frame (meaning encoded) in bytes.
    fn size(&self) -> usize;
}

/// Kind of reply sent back to a client.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ReplyStatus {
    /// First introduction of this sender.
    Success,
    /// The sender is already known, it should stop introducing itself.
    Stop,
}

impl ReplyStatus {
    pub fn prefix(&self) -> &'static [u8] {
        match self {
            ReplyStatus::Success => SUCCESS_PREFIX,
            ReplyStatus::Stop => STOP_PREFIX,
        }
    }

    /// Numeric code used in diagnostics.
    pub fn code(&self) -> u8 {
        match self {
            ReplyStatus::Success => 0,
            ReplyStatus::Stop => 1,
        }
    }
}

/// Borrowed view of a decoded introduction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Introduction<'a> {
    /// Header bytes, skipped by the base station.
    pub header: &'a [u8],
    /// Name announced by the sender.
    pub name: &'a [u8],
}

/// Reply about to be encoded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Reply<'a> {
    pub status: ReplyStatus,
    pub name: &'a [u8],
}

impl FrameSize for ReplyStatus {
    fn size(&self) -> usize {
        self.prefix().len()
    }
}

impl FrameSize for Reply<'_> {
    fn size(&self) -> usize {
        self.status.size() + self.name.len()
    }
}

impl<'a> Introduction<'a> {
    /// Splits an introduction payload at `header_len`.
    ///
    /// The name is whatever follows the header, it must hold at least one byte.
    pub fn try_from_bytes(payload: &'a [u8], header_len: usize) -> Result<Self, FrameError> {
        if payload.len() <= header_len {
            return Err(FrameError::MalformedMessage {
                context: Some(format!(
                    "Introduction too small ({} bytes, header is {} bytes).",
                    payload.len(),
                    header_len
                )),
            });
        }
        let (header, name) = payload.split_at(header_len);
        Ok(Introduction { header, name })
    }

    /// Builds an introduction payload, used by client nodes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.header.len() + self.name.len());
        bytes.extend_from_slice(self.header);
        bytes.extend_from_slice(self.name);
        bytes
    }
}

impl<'a> Reply<'a> {
    pub fn new(status: ReplyStatus, name: &'a [u8]) -> Self {
        Self { status, name }
    }

    /// Writes the reply at the start of `out` and returns the encoded length.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.size();
        if out.len() < len {
            return Err(FrameError::BufferTooSmall {
                needed: len,
                available: out.len(),
            });
        }
        let prefix = self.status.prefix();
        out[..prefix.len()].copy_from_slice(prefix);
        out[prefix.len()..len].copy_from_slice(self.name);
        Ok(len)
    }

    /// Reads a reply back, used by client nodes.
    pub fn try_from_bytes(bytes: &'a [u8]) -> Result<Self, FrameError> {
        for status in [ReplyStatus::Stop, ReplyStatus::Success] {
            if let Some(name) = bytes.strip_prefix(status.prefix()) {
                if name.is_empty() {
                    return Err(FrameError::MalformedMessage {
                        context: Some(format!("Reply without a name.")),
                    });
                }
                return Ok(Reply { status, name });
            }
        }
        Err(FrameError::MalformedMessage {
            context: Some(format!("Unknown reply prefix.")),
        })
    }
}

/// Splits an introduction payload into its header and the sender name.
pub fn decode_introduction(payload: &[u8], header_len: usize) -> Result<Introduction<'_>, FrameError> {
    Introduction::try_from_bytes(payload, header_len)
}

/// Encodes a `status` reply for `name` into `out`, returns the number of bytes written.
pub fn encode_reply(status: ReplyStatus, name: &[u8], out: &mut [u8]) -> Result<usize, FrameError> {
    Reply::new(status, name).encode(out)
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Malformed message. Context: {}", .context.as_deref().unwrap_or("<none>"))]
    MalformedMessage { context: Option<String> },

    #[error("Buffer too small to encode frame ({needed} bytes needed, {available} available).")]
    BufferTooSmall { needed: usize, available: usize },
}
