use bytes::Bytes;
use prost::Message;
use sockrpc_envelope::{ErrorReason, MessageCodec, RpcRequest, RpcResponse, Status};
use sockrpc_transport::{Connection, TransportError};
use tracing::debug;

use crate::channel::RpcChannel;

/// Terminal state of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// The decoded response was handed to the completion callback.
    Delivered,
    /// The server answered without an error but did not complete the call
    /// (no payload, or `invoked` unset); the callback was not run and the
    /// status is not failed.
    NoResponse,
    /// The status records a failure; the callback was not run.
    Failed,
}

/// Per-call pipeline state.
///
/// Each stage returns immediately when the status is already failed, so a
/// call is a straight line of stages with a single "already failed?" check
/// in front of each.
pub(crate) struct Lifecycle<'a, Resp> {
    channel: &'a RpcChannel,
    status: &'a mut Status,
    connection: Option<Connection>,
    reply: Option<Bytes>,
    envelope: Option<RpcResponse>,
    response: Option<Resp>,
}

impl<'a, Resp: MessageCodec> Lifecycle<'a, Resp> {
    pub(crate) fn new(channel: &'a RpcChannel, status: &'a mut Status) -> Self {
        Self {
            channel,
            status,
            connection: None,
            reply: None,
            envelope: None,
            response: None,
        }
    }

    pub(crate) fn validate_request(&mut self, service_name: &str, method_name: &str) {
        if self.status.is_failed() {
            return;
        }
        if service_name.is_empty() || method_name.is_empty() {
            self.fail(
                ErrorReason::BadRequestProto,
                "client request is missing mandatory fields",
            );
        }
    }

    pub(crate) fn open_connection(&mut self) {
        if self.status.is_failed() {
            return;
        }
        let channel = self.channel;
        match channel
            .connector()
            .connect(channel.host(), channel.port(), channel.config())
        {
            Ok(connection) => self.connection = Some(connection),
            Err(err @ TransportError::UnknownHost { .. }) => {
                self.fail(ErrorReason::UnknownHost, err.to_string())
            }
            Err(err) => self.fail(ErrorReason::IoError, err.to_string()),
        }
    }

    pub(crate) fn send_request<Req: MessageCodec>(
        &mut self,
        service_name: &str,
        method_name: &str,
        request: &Req,
    ) {
        if self.status.is_failed() {
            return;
        }
        let envelope = RpcRequest::new(service_name, method_name, request.to_payload());
        let Some(connection) = self.connection.as_mut() else {
            self.fail(ErrorReason::IoError, "no open connection to send on");
            return;
        };
        debug!(service = service_name, method = method_name, "sending request");
        if let Err(err) = connection.send(&envelope.encode_to_vec()) {
            self.fail(
                ErrorReason::IoError,
                format!("error writing data to server: {err}"),
            );
        }
    }

    pub(crate) fn receive_reply(&mut self) {
        if self.status.is_failed() {
            return;
        }
        let Some(mut connection) = self.connection.take() else {
            self.fail(ErrorReason::IoError, "no open connection to receive on");
            return;
        };
        match connection.receive() {
            Ok(bytes) => self.reply = Some(bytes),
            Err(err) => self.fail(
                ErrorReason::IoError,
                format!("error reading data from server: {err}"),
            ),
        }
    }

    pub(crate) fn parse_envelope(&mut self) {
        if self.status.is_failed() {
            return;
        }
        let bytes = self.reply.take().unwrap_or_default();
        match RpcResponse::decode_initialized(&bytes) {
            Ok(envelope) => self.envelope = Some(envelope),
            Err(err) => self.fail(
                ErrorReason::BadResponseProto,
                format!("invalid response from server: {err}"),
            ),
        }
    }

    pub(crate) fn extract_payload(&mut self) {
        if self.status.is_failed() {
            return;
        }
        let Some(envelope) = self.envelope.take() else {
            self.fail(ErrorReason::BadResponseProto, "no response envelope");
            return;
        };

        if let Some(reason) = envelope.failure_reason() {
            self.fail(reason, envelope.error.unwrap_or_default());
            return;
        }

        let invoked = envelope.was_invoked();
        match envelope.payload.as_deref() {
            Some(bytes) if invoked => match Resp::from_payload(bytes) {
                Ok(response) => self.response = Some(response),
                Err(err) => self.fail(
                    ErrorReason::BadResponseProto,
                    format!("invalid response payload: {err}"),
                ),
            },
            payload => debug!(
                invoked,
                has_payload = payload.is_some(),
                "server did not complete the call"
            ),
        }
    }

    pub(crate) fn deliver<F: FnOnce(Resp)>(mut self, done: F) -> CallState {
        if self.status.is_failed() {
            return CallState::Failed;
        }
        match self.response.take() {
            Some(response) => {
                done(response);
                CallState::Delivered
            }
            None => CallState::NoResponse,
        }
    }

    fn fail(&mut self, reason: ErrorReason, message: impl Into<String>) {
        let message = message.into();
        debug!(%reason, error = %message, "call failed");
        self.status.fail(reason, message);
    }
}
