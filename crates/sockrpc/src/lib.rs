//! Minimal protobuf RPC over plain stream sockets.
//!
//! A client names a service and method, sends one serialized request over a
//! fresh TCP connection, and reads one serialized response back. The server
//! resolves the call against an explicit registry of services.
//!
//! # Crate Structure
//!
//! - [`transport`]: connections, framing, TCP connector and listener
//! - [`envelope`]: wire envelope, error reasons, call status, payload codec
//! - [`client`]: call pipeline and calling facade (behind `client` feature)
//! - [`server`]: registry, dispatcher, and server loop (behind `server` feature)

/// Re-export transport types.
pub mod transport {
    pub use sockrpc_transport::*;
}

/// Re-export envelope types.
pub mod envelope {
    pub use sockrpc_envelope::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use sockrpc_client::*;
}

/// Re-export server types (requires `server` feature).
#[cfg(feature = "server")]
pub mod server {
    pub use sockrpc_server::*;
}
