//! Wire envelope for sockrpc.
//!
//! Every call travels as a protobuf [`RpcRequest`] naming the service and
//! method and carrying the serialized inner request. The server answers with
//! an [`RpcResponse`] that holds either the serialized inner response or an
//! error message with an [`ErrorReason`].
//!
//! The inner messages are opaque to this layer; anything implementing
//! [`MessageCodec`] can ride inside the envelope.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod status;

pub use codec::{MessageCodec, RawPayload};
pub use envelope::{ErrorReason, RpcRequest, RpcResponse};
pub use error::{EnvelopeError, Result};
pub use status::Status;
