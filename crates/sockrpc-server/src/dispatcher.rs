use std::sync::Arc;

use sockrpc_envelope::{ErrorReason, RpcRequest, RpcResponse, Status};
use tracing::{debug, warn};

use crate::error::MethodError;
use crate::registry::ServiceRegistry;

/// Turns request envelopes into response envelopes.
///
/// Never fails: every problem is reported inside the returned
/// [`RpcResponse`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
}

impl Dispatcher {
    pub fn new(registry: impl Into<Arc<ServiceRegistry>>) -> Self {
        Self {
            registry: registry.into(),
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Decode raw request bytes and dispatch them.
    pub fn dispatch(&self, bytes: &[u8]) -> RpcResponse {
        match RpcRequest::decode_initialized(bytes) {
            Ok(request) => self.forward(&request),
            Err(err) => reject(
                ErrorReason::BadRequestData,
                format!("Invalid request from client: {err}"),
            ),
        }
    }

    /// Dispatch an already-decoded request.
    ///
    /// Useful for relaying requests that arrived by some other route.
    pub fn forward(&self, request: &RpcRequest) -> RpcResponse {
        let (Some(service_name), Some(method_name), Some(payload)) = (
            request.service_name.as_deref(),
            request.method_name.as_deref(),
            request.payload.as_deref(),
        ) else {
            let field = request.missing_field().unwrap_or("unknown");
            return reject(
                ErrorReason::BadRequestData,
                format!("Invalid request from client: missing {field}"),
            );
        };

        let Some(service) = self.registry.service(service_name) else {
            return reject(
                ErrorReason::ServiceNotFound,
                format!("Could not find service: {service_name}"),
            );
        };

        let Some(handler) = service.handler(method_name) else {
            return reject(
                ErrorReason::MethodNotFound,
                format!("Could not find method {method_name} in service {service_name}"),
            );
        };

        debug!(service = service_name, method = method_name, "dispatching");

        let mut status = Status::new();
        let completed = match handler.call(&mut status, payload) {
            Ok(completed) => completed,
            Err(MethodError::BadRequest(err)) => {
                return reject(
                    ErrorReason::BadRequestProto,
                    format!("Invalid request proto: {err}"),
                )
            }
            Err(MethodError::Fault(err)) => {
                return reject(
                    ErrorReason::RpcError,
                    format!("Error running method {service_name}.{method_name}: {err}"),
                )
            }
        };

        let response = RpcResponse::completed(completed);
        if !status.is_failed() {
            return response;
        }

        let reason = status.reason().unwrap_or(ErrorReason::RpcFailed);
        let message = status.message().unwrap_or_default();
        warn!(
            service = service_name,
            method = method_name,
            %reason,
            error = message,
            "handler reported failure"
        );
        response.with_failure(reason, message)
    }
}

fn reject(reason: ErrorReason, message: String) -> RpcResponse {
    warn!(%reason, error = %message, "rejecting request");
    RpcResponse::failure(reason, message)
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;
    use crate::testing::{registry, HelloReply, HelloRequest};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(registry())
    }

    fn request(service: &str, method: &str, name: &str) -> RpcRequest {
        RpcRequest::new(
            service,
            method,
            HelloRequest {
                name: name.to_string(),
            }
            .encode_to_vec(),
        )
    }

    #[test]
    fn registered_method_answers_with_payload() {
        let response = dispatcher().forward(&request("Greeter", "Hello", "Eric"));

        assert!(!response.has_error());
        assert!(response.was_invoked());
        let reply = HelloReply::decode(response.payload.as_deref().unwrap()).unwrap();
        assert_eq!(reply.greeting, "Hello Eric");
    }

    #[test]
    fn dispatch_decodes_envelope_bytes() {
        let bytes = request("Greeter", "Hello", "Ann").encode_to_vec();
        let response = dispatcher().dispatch(&bytes);
        let reply = HelloReply::decode(response.payload.as_deref().unwrap()).unwrap();
        assert_eq!(reply.greeting, "Hello Ann");
    }

    #[test]
    fn unknown_service_is_service_not_found() {
        let response = dispatcher().forward(&request("Unknown", "Hello", "Eric"));
        assert_eq!(response.failure_reason(), Some(ErrorReason::ServiceNotFound));
        assert_eq!(
            response.error.as_deref(),
            Some("Could not find service: Unknown")
        );
        assert!(response.payload.is_none());
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let response = dispatcher().forward(&request("Greeter", "Wave", "Eric"));
        assert_eq!(response.failure_reason(), Some(ErrorReason::MethodNotFound));
        assert_eq!(
            response.error.as_deref(),
            Some("Could not find method Wave in service Greeter")
        );
    }

    #[test]
    fn garbage_bytes_are_bad_request_data() {
        let response = dispatcher().dispatch(b"\xff\xff\xff not protobuf");
        assert_eq!(response.failure_reason(), Some(ErrorReason::BadRequestData));
    }

    #[test]
    fn missing_field_is_bad_request_data() {
        let partial = RpcRequest {
            service_name: Some("Greeter".to_string()),
            method_name: None,
            payload: Some(Vec::new()),
        };
        let response = dispatcher().forward(&partial);
        assert_eq!(response.failure_reason(), Some(ErrorReason::BadRequestData));
        assert!(response.error.unwrap().contains("method_name"));
    }

    #[test]
    fn undecodable_payload_is_bad_request_proto() {
        let bad = RpcRequest::new("Greeter", "Hello", vec![0x0a, 0x09, b'E']);
        let response = dispatcher().forward(&bad);
        assert_eq!(response.failure_reason(), Some(ErrorReason::BadRequestProto));
    }

    #[test]
    fn handler_error_is_rpc_error() {
        let response = dispatcher().forward(&request("Chips", "Burn", "Eric"));
        assert_eq!(response.failure_reason(), Some(ErrorReason::RpcError));
        assert_eq!(
            response.error.as_deref(),
            Some("Error running method Chips.Burn: fryer on fire")
        );
    }

    #[test]
    fn failed_status_keeps_payload_and_adds_rpc_failed() {
        let response = dispatcher().forward(&request("Chips", "Serve", "Eric"));
        assert_eq!(response.failure_reason(), Some(ErrorReason::RpcFailed));
        assert_eq!(response.error.as_deref(), Some("soggy chips"));
        assert!(response.was_invoked());
        assert!(response.payload.is_some());
    }
}
