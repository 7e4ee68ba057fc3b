use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// A bidirectional byte stream that can be half-closed.
///
/// `TcpStream` is the production implementation. The trait exists so that
/// a [`Connector`](crate::Connector) can hand out in-memory streams in tests.
pub trait RpcStream: Read + Write + Send {
    /// Shut down the read, write, or both halves of the stream.
    fn shutdown(&self, how: Shutdown) -> std::io::Result<()>;

    /// Set read timeout on the underlying stream.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()>;

    /// Set write timeout on the underlying stream.
    fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()>;

    /// Human-readable peer label for diagnostics.
    fn peer_label(&self) -> String {
        "unknown".to_string()
    }
}

impl RpcStream for TcpStream {
    fn shutdown(&self, how: Shutdown) -> std::io::Result<()> {
        TcpStream::shutdown(self, how)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        TcpStream::set_write_timeout(self, timeout)
    }

    fn peer_label(&self) -> String {
        self.peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}
