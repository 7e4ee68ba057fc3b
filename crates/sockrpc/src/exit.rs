use std::fmt;
use std::io;

use sockrpc_client::CallError;
use sockrpc_envelope::ErrorReason;
use sockrpc_server::ServerError;
use sockrpc_transport::TransportError;

// Process exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. } | TransportError::Accept(source) => {
            io_error(context, source)
        }
        TransportError::MessageTooLarge { .. } | TransportError::InvalidFrame(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn server_error(context: &str, err: ServerError) -> CliError {
    match err {
        ServerError::Transport(err) => transport_error(context, err),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn reason_code(reason: ErrorReason) -> i32 {
    match reason {
        ErrorReason::UnknownHost | ErrorReason::IoError => TRANSPORT_ERROR,
        ErrorReason::BadRequestData
        | ErrorReason::BadRequestProto
        | ErrorReason::InvalidRequestProto
        | ErrorReason::BadResponseProto => DATA_INVALID,
        ErrorReason::ServiceNotFound | ErrorReason::MethodNotFound => USAGE,
        ErrorReason::RpcError | ErrorReason::RpcFailed => FAILURE,
    }
}

pub fn call_error(context: &str, err: CallError) -> CliError {
    let code = match &err {
        CallError::Failed { reason, .. } => reason_code(*reason),
        CallError::NoResponse => FAILURE,
        CallError::Timeout(_) => TIMEOUT,
        CallError::Aborted | CallError::Spawn(_) => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn call_failures_map_by_reason() {
        let failed = |reason| CallError::Failed {
            reason,
            message: "x".to_string(),
        };
        assert_eq!(call_error("c", failed(ErrorReason::UnknownHost)).code, TRANSPORT_ERROR);
        assert_eq!(call_error("c", failed(ErrorReason::BadResponseProto)).code, DATA_INVALID);
        assert_eq!(call_error("c", failed(ErrorReason::ServiceNotFound)).code, USAGE);
        assert_eq!(call_error("c", failed(ErrorReason::RpcFailed)).code, FAILURE);
    }

    #[test]
    fn timeout_maps_to_124() {
        let err = call_error("call failed", CallError::Timeout(Duration::from_millis(100)));
        assert_eq!(err.code, TIMEOUT);
        assert!(err.message.starts_with("call failed: "));
    }

    #[test]
    fn bind_in_use_is_transport_error() {
        let err = transport_error(
            "bind failed",
            TransportError::Bind {
                addr: "127.0.0.1:8090".to_string(),
                source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }
}
