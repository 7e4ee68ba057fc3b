//! Server side of sockrpc.
//!
//! Services are registered up front in a [`ServiceRegistry`] and handed to
//! an [`RpcServer`], which accepts connections and answers each one on its
//! own thread. The [`Dispatcher`] does the actual work: decode the request
//! envelope, resolve service and method, run the handler, and build the
//! response envelope. Every failure becomes an error response; nothing a
//! client sends can take down a connection worker.

pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::Dispatcher;
pub use error::{HandlerResult, MethodError, Result, ServerError};
pub use registry::{Done, MethodHandler, Service, ServiceRegistry, TypedMethod};
pub use server::{RpcServer, RunningServer, ShutdownHandle};
