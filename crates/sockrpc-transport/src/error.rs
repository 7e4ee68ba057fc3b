/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host name could not be resolved.
    #[error("could not find host {host}")]
    UnknownHost {
        host: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Failed to connect to the resolved address.
    #[error("could not open I/O for {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to bind the listening socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The incoming message exceeds the configured maximum size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// A length prefix could not be decoded.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The peer closed the stream in the middle of a length-delimited message.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,

    /// The connection was already closed locally.
    #[error("connection already closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
