use std::io::{ErrorKind, Read, Write};
use std::net::Shutdown;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::config::{Framing, TransportConfig};
use crate::error::{Result, TransportError};
use crate::stream::RpcStream;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;
const MAX_VARINT_LEN: usize = 10;

/// A single-call connection to a peer.
///
/// A connection is opened, carries one message in each direction, and is
/// closed. It is never reused.
pub struct Connection {
    stream: Option<Box<dyn RpcStream>>,
    config: TransportConfig,
    peer: String,
}

impl Connection {
    /// Wrap a connected stream and apply timeouts from config.
    pub fn new(stream: Box<dyn RpcStream>, config: TransportConfig) -> Result<Self> {
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        let peer = stream.peer_label();
        Ok(Self {
            stream: Some(stream),
            config,
            peer,
        })
    }

    /// Write one complete message and signal end-of-message.
    ///
    /// The write half is shut down afterwards in both framing modes, so
    /// the peer observes EOF once it has consumed the message.
    pub fn write_message(&mut self, payload: &[u8]) -> Result<()> {
        let max = self.config.max_message_size;
        if payload.len() > max {
            return Err(TransportError::MessageTooLarge {
                size: payload.len(),
                max,
            });
        }

        let framing = self.config.framing;
        let stream = self.stream_mut()?;
        if framing == Framing::LengthDelimited {
            let mut prefix = BytesMut::with_capacity(MAX_VARINT_LEN);
            prost::encoding::encode_varint(payload.len() as u64, &mut prefix);
            write_all(stream, &prefix)?;
        }
        write_all(stream, payload)?;
        flush(stream)?;
        stream.shutdown(Shutdown::Write)?;

        debug!(peer = %self.peer, size = payload.len(), "message written");
        Ok(())
    }

    /// Read one complete message according to the configured framing.
    pub fn read_message(&mut self) -> Result<Bytes> {
        let max = self.config.max_message_size;
        let framing = self.config.framing;
        let stream = self.stream_mut()?;
        let message = match framing {
            Framing::HalfClose => read_to_eof(stream, max)?,
            Framing::LengthDelimited => read_delimited(stream, max)?,
        };

        debug!(peer = %self.peer, size = message.len(), "message read");
        Ok(message)
    }

    /// Send a message. The connection is closed if the write fails.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let result = self.write_message(payload);
        if result.is_err() {
            self.close();
        }
        result
    }

    /// Receive a message. The connection is always closed on the way out.
    pub fn receive(&mut self) -> Result<Bytes> {
        let result = self.read_message();
        self.close();
        result
    }

    /// Close both directions. Idempotent; close-time errors are ignored.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!(peer = %self.peer, "connection closed");
        }
    }

    /// Whether [`close`](Self::close) has already run.
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Peer label for diagnostics.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Transport configuration in effect for this connection.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn stream_mut(&mut self) -> Result<&mut (dyn RpcStream + 'static)> {
        self.stream.as_deref_mut().ok_or(TransportError::Closed)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("framing", &self.config.framing)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn write_all<S: Write + ?Sized>(stream: &mut S, mut buf: &[u8]) -> Result<()> {
    while !buf.is_empty() {
        match stream.write(buf) {
            Ok(0) => {
                return Err(TransportError::Io(std::io::Error::new(
                    ErrorKind::WriteZero,
                    "peer stopped accepting data",
                )))
            }
            Ok(n) => buf = &buf[n..],
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
    Ok(())
}

fn flush<S: Write + ?Sized>(stream: &mut S) -> Result<()> {
    loop {
        match stream.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
}

fn read_to_eof<S: Read + ?Sized>(stream: &mut S, max: usize) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY);
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        let read = match stream.read(&mut chunk) {
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        };

        if read == 0 {
            return Ok(buf.freeze());
        }

        let size = buf.len() + read;
        if size > max {
            return Err(TransportError::MessageTooLarge { size, max });
        }
        buf.extend_from_slice(&chunk[..read]);
    }
}

fn read_delimited<S: Read + ?Sized>(stream: &mut S, max: usize) -> Result<Bytes> {
    let mut prefix = BytesMut::with_capacity(MAX_VARINT_LEN);
    loop {
        let mut byte = [0u8; 1];
        match stream.read(&mut byte) {
            Ok(0) => return Err(TransportError::ConnectionClosed),
            Ok(_) => {
                prefix.extend_from_slice(&byte);
                if byte[0] & 0x80 == 0 {
                    break;
                }
                if prefix.len() >= MAX_VARINT_LEN {
                    return Err(TransportError::InvalidFrame(
                        "length prefix is not a valid varint".to_string(),
                    ));
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }

    let len = prost::encoding::decode_varint(&mut prefix.freeze())
        .map_err(|err| TransportError::InvalidFrame(err.to_string()))?;
    let len = usize::try_from(len)
        .map_err(|_| TransportError::InvalidFrame("length prefix overflows usize".to_string()))?;
    if len > max {
        return Err(TransportError::MessageTooLarge { size: len, max });
    }

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).map_err(|err| {
        if err.kind() == ErrorKind::UnexpectedEof {
            TransportError::ConnectionClosed
        } else {
            TransportError::Io(err)
        }
    })?;
    Ok(Bytes::from(payload))
}
