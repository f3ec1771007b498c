pub use error::{FrameError, ProtocolError};
pub use message::Message;

pub mod connection;
mod error;
mod message;
