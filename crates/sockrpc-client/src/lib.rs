//! Client side of sockrpc.
//!
//! [`RpcChannel`] runs one call through a fixed, fail-fast sequence of
//! stages: validate, connect, send, receive, parse the envelope, extract
//! the payload, deliver. Once a stage records a failure on the call's
//! [`Status`](sockrpc_envelope::Status), the remaining stages do nothing
//! and the completion callback is never run.
//!
//! [`RpcService`] and [`RemoteMethod`] put a calling facade on top: each
//! call runs on its own worker thread and is either callback-driven or
//! blocking with an optional timeout.

pub mod channel;
pub mod error;
pub mod lifecycle;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::RpcChannel;
pub use error::{CallError, Result};
pub use lifecycle::CallState;
pub use service::{CallHandle, CallReport, RemoteMethod, RpcService};
