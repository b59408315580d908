use crate::frame::FrameError;
use crate::registry::RegistryError;
use crate::NodeAddress;

/// Reasons for which an inbound message did not lead to a transmitted reply.
///
/// None of them is fatal: the message is dropped and the base station keeps serving.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to send reply to {to}. Context: {context}")]
    SendFailed { to: NodeAddress, context: String },
}
