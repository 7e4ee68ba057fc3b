/// Errors from running a server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Transport-level error while binding or accepting.
    #[error("transport error: {0}")]
    Transport(#[from] sockrpc_transport::TransportError),

    /// A server or connection thread could not be started.
    #[error("failed to spawn server thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The accept loop thread panicked.
    #[error("server thread panicked")]
    Panicked,
}

/// Why a method handler could not produce an outcome.
///
/// Application-level failures are not errors here; handlers record those
/// on their [`Status`](sockrpc_envelope::Status).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MethodError {
    /// The payload did not decode as the method's request type.
    #[error("{0}")]
    BadRequest(String),

    /// The handler returned an error or panicked.
    #[error("{0}")]
    Fault(String),
}

/// Return type of typed handlers. `Err` is reported to the client as a
/// handler fault.
pub type HandlerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub type Result<T> = std::result::Result<T, ServerError>;
