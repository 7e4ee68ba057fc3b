//! Stream transport for sockrpc.
//!
//! One connection carries exactly one call. The sender writes a complete
//! message and then shuts down its write half; the receiver reads until
//! end-of-stream. An opt-in length-delimited mode is available for peers
//! that agree on it (see [`Framing`]).
//!
//! This is the lowest layer of sockrpc. Everything else builds on top of
//! the [`Connection`] type provided here.

pub mod config;
pub mod connection;
pub mod error;
pub mod stream;
pub mod tcp;

pub use config::{Framing, TransportConfig, DEFAULT_MAX_MESSAGE_SIZE};
pub use connection::Connection;
pub use error::{Result, TransportError};
pub use stream::RpcStream;
pub use tcp::{Connector, RpcListener, TcpConnector};
