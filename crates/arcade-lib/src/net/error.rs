use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid Message")]
    InvalidMessage,
    #[error("Peer disconnected")]
    Disconnected,
    #[error("Client version '{0}' does not match host version '{1}'")]
    VersionMismatch(String, String),
    #[error("{0}")]
    Message(String),
}

impl From<FrameError> for ProtocolError {
    fn from(e: FrameError) -> Self {
        Self::Message(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame exceeded max length")]
    FrameLength,
    #[error("Connection reset by peer")]
    ConnectionReset,
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization Error: {0}")]
    Bincode(#[from] bincode::Error),
}
