use std::time::Duration;

/// Default maximum message size: 64 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// How the end of a message is signalled on the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// Raw message bytes followed by a write-side shutdown.
    ///
    /// This is the deployed wire format; the receiver reads to EOF.
    #[default]
    HalfClose,
    /// Message prefixed with a base-128 varint length, then a write-side
    /// shutdown. Both peers must be configured for it.
    LengthDelimited,
}

/// Configuration shared by connect and accept paths.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Message boundary convention. Default: [`Framing::HalfClose`].
    pub framing: Framing,
    /// Maximum message size in bytes. Default: 64 MiB.
    pub max_message_size: usize,
    /// Upper bound on establishing a TCP connection.
    pub connect_timeout: Option<Duration>,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            framing: Framing::HalfClose,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl TransportConfig {
    /// Override the framing mode.
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Override the maximum message size.
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set both read and write timeouts.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self.write_timeout = Some(timeout);
        self
    }
}
