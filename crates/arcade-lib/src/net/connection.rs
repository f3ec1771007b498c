use bytes::{Buf, BytesMut};
use std::io::Cursor;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use super::{FrameError, Message};

const LEN_PREFIX: usize = std::mem::size_of::<u16>();

pub fn from_socket(
    socket: TcpStream,
) -> (ConnectionTx<OwnedWriteHalf>, ConnectionRx<OwnedReadHalf>) {
    let (read_stream, write_stream) = socket.into_split();

    (
        ConnectionTx::new(write_stream),
        ConnectionRx::new(read_stream),
    )
}

/// Writes length-prefixed frames: a big-endian `u16` length followed by a bincode [`Message`].
#[derive(Debug)]
pub struct ConnectionTx<W> {
    write_stream: BufWriter<W>,
}

#[derive(Debug)]
pub struct ConnectionRx<R> {
    read_stream: R,
    buffer: BytesMut,
}

impl<W: AsyncWrite + Unpin> ConnectionTx<W> {
    pub fn new(write_stream: W) -> Self {
        Self {
            write_stream: BufWriter::new(write_stream),
        }
    }

    pub async fn write_frame(&mut self, frame: &Message) -> Result<(), FrameError> {
        let payload = bincode::serialize(frame)?;
        let len = u16::try_from(payload.len()).map_err(|_| FrameError::FrameLength)?;
        self.write_stream.write_all(&len.to_be_bytes()).await?;
        self.write_stream.write_all(&payload).await?;
        self.write_stream.flush().await?;
        Ok(())
    }
}

impl<R: AsyncRead + Unpin> ConnectionRx<R> {
    pub fn new(read_stream: R) -> Self {
        Self {
            read_stream,
            buffer: BytesMut::with_capacity(64),
        }
    }

    /// Read the next frame, or `None` once the remote closes the stream between frames.
    ///
    /// A frame that fails to deserialize is still consumed, so the caller may keep
    /// reading after a [`FrameError::Bincode`].
    pub async fn read_frame(&mut self) -> Result<Option<Message>, FrameError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            if self.read_stream.read_buf(&mut self.buffer).await? == 0 {
                if self.buffer.is_empty() {
                    // Remote closed Connection
                    return Ok(None);
                } else {
                    // Connection closed while still sending data
                    return Err(FrameError::ConnectionReset);
                }
            }
        }
    }

    fn parse_frame(&mut self) -> Result<Option<Message>, FrameError> {
        if self.buffer.len() < LEN_PREFIX {
            return Ok(None);
        }

        // Use a Cursor to avoid advancing the internal cursor of self.buffer
        let mut buf = Cursor::new(&self.buffer[..]);
        let message_len = usize::from(buf.get_u16());
        if self.buffer.len() < LEN_PREFIX + message_len {
            return Ok(None);
        }

        self.buffer.advance(LEN_PREFIX);
        let payload = self.buffer.split_to(message_len);
        tracing::trace!(len = message_len, "Frame received");
        Ok(Some(bincode::deserialize::<Message>(&payload)?))
    }
}
