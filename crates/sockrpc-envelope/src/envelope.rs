use prost::Message;

use crate::error::{EnvelopeError, Result};

/// Why a call failed. Values match the deployed `rpc.proto` enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ErrorReason {
    /// Server could not decode the request envelope.
    BadRequestData = 0,
    /// Request payload did not decode as the method's request type.
    BadRequestProto = 1,
    /// No service registered under the requested name.
    ServiceNotFound = 2,
    /// Service exists but has no such method.
    MethodNotFound = 3,
    /// Handler faulted while running.
    RpcError = 4,
    /// Handler reported an application-level failure.
    RpcFailed = 5,
    /// Reserved by the protocol; never produced by this implementation.
    InvalidRequestProto = 6,
    /// Client could not decode the response envelope or payload.
    BadResponseProto = 7,
    /// Client could not resolve the server host.
    UnknownHost = 8,
    /// Client-side socket failure.
    IoError = 9,
}

impl ErrorReason {
    /// Protocol name of the reason, as spelled in `rpc.proto`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorReason::BadRequestData => "BAD_REQUEST_DATA",
            ErrorReason::BadRequestProto => "BAD_REQUEST_PROTO",
            ErrorReason::ServiceNotFound => "SERVICE_NOT_FOUND",
            ErrorReason::MethodNotFound => "METHOD_NOT_FOUND",
            ErrorReason::RpcError => "RPC_ERROR",
            ErrorReason::RpcFailed => "RPC_FAILED",
            ErrorReason::InvalidRequestProto => "INVALID_REQUEST_PROTO",
            ErrorReason::BadResponseProto => "BAD_RESPONSE_PROTO",
            ErrorReason::UnknownHost => "UNKNOWN_HOST",
            ErrorReason::IoError => "IO_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outer request message.
///
/// All three fields are required by the protocol. They are declared
/// optional here so that absence can be detected after decoding; the
/// encoded bytes are the same either way.
#[derive(Clone, PartialEq, Message)]
pub struct RpcRequest {
    /// Fully-qualified service name.
    #[prost(string, optional, tag = "1")]
    pub service_name: Option<String>,
    /// Method name within the service.
    #[prost(string, optional, tag = "2")]
    pub method_name: Option<String>,
    /// Serialized inner request.
    #[prost(bytes = "vec", optional, tag = "3")]
    pub payload: Option<Vec<u8>>,
}

impl RpcRequest {
    /// Build a fully-populated request.
    pub fn new(
        service_name: impl Into<String>,
        method_name: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            service_name: Some(service_name.into()),
            method_name: Some(method_name.into()),
            payload: Some(payload),
        }
    }

    /// First required field that is absent, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.service_name.is_none() {
            Some("service_name")
        } else if self.method_name.is_none() {
            Some("method_name")
        } else if self.payload.is_none() {
            Some("request_proto")
        } else {
            None
        }
    }

    /// Whether every required field is present.
    pub fn is_initialized(&self) -> bool {
        self.missing_field().is_none()
    }

    /// Decode and require every mandatory field.
    pub fn decode_initialized(bytes: &[u8]) -> Result<Self> {
        let request = Self::decode(bytes)?;
        match request.missing_field() {
            Some(field) => Err(EnvelopeError::MissingField(field)),
            None => Ok(request),
        }
    }
}

/// Outer response message.
///
/// `payload` and `error` may both be set; a set `error` always wins at the
/// client.
#[derive(Clone, PartialEq, Message)]
pub struct RpcResponse {
    /// Serialized inner response, present when the handler completed.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub payload: Option<Vec<u8>>,
    /// Failure message.
    #[prost(string, optional, tag = "2")]
    pub error: Option<String>,
    /// Whether the handler ran its completion callback.
    #[prost(bool, optional, tag = "3")]
    pub invoked: Option<bool>,
    /// Failure code accompanying `error`.
    #[prost(enumeration = "ErrorReason", optional, tag = "4")]
    pub error_reason: Option<i32>,
}

impl RpcResponse {
    /// Response for a handler that ran to completion.
    ///
    /// `invoked` mirrors whether a payload was captured.
    pub fn completed(payload: Option<Vec<u8>>) -> Self {
        Self {
            invoked: Some(payload.is_some()),
            payload,
            error: None,
            error_reason: None,
        }
    }

    /// Error-only response.
    pub fn failure(reason: ErrorReason, message: impl Into<String>) -> Self {
        Self {
            payload: None,
            error: Some(message.into()),
            invoked: None,
            error_reason: Some(reason as i32),
        }
    }

    /// Attach an error to this response, keeping any payload already set.
    pub fn with_failure(mut self, reason: ErrorReason, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self.error_reason = Some(reason as i32);
        self
    }

    /// Whether the response carries an error.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Reason for the carried error.
    ///
    /// Returns `None` when there is no error. An error with an absent or
    /// unrecognised code reads as [`ErrorReason::RpcFailed`].
    pub fn failure_reason(&self) -> Option<ErrorReason> {
        self.error.as_ref()?;
        Some(
            self.error_reason
                .and_then(|code| ErrorReason::try_from(code).ok())
                .unwrap_or(ErrorReason::RpcFailed),
        )
    }

    /// Whether the handler reported running its completion callback.
    pub fn was_invoked(&self) -> bool {
        self.invoked.unwrap_or(false)
    }

    /// Decode a response envelope. No field is mandatory.
    pub fn decode_initialized(bytes: &[u8]) -> Result<Self> {
        Ok(Self::decode(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_encoding_matches_rpc_proto_layout() {
        let request = RpcRequest::new("Greeter", "Hello", vec![0x0a, 0x01, b'E']);
        let wire = request.encode_to_vec();

        let mut expected = vec![0x0a, 7];
        expected.extend_from_slice(b"Greeter");
        expected.extend_from_slice(&[0x12, 5]);
        expected.extend_from_slice(b"Hello");
        expected.extend_from_slice(&[0x1a, 3, 0x0a, 0x01, b'E']);
        assert_eq!(wire, expected);
    }

    #[test]
    fn failure_response_encodes_error_and_reason() {
        let response = RpcResponse::failure(ErrorReason::ServiceNotFound, "nope");
        let wire = response.encode_to_vec();

        let mut expected = vec![0x12, 4];
        expected.extend_from_slice(b"nope");
        expected.extend_from_slice(&[0x20, 0x02]);
        assert_eq!(wire, expected);
    }

    #[test]
    fn completed_response_sets_invoked_flag() {
        let response = RpcResponse::completed(Some(vec![1, 2, 3]));
        assert!(response.was_invoked());
        assert!(!response.has_error());

        let empty = RpcResponse::completed(None);
        assert!(!empty.was_invoked());
        assert_eq!(empty.invoked, Some(false));
    }

    #[test]
    fn decode_initialized_rejects_missing_fields() {
        let partial = RpcRequest {
            service_name: Some("Greeter".to_string()),
            method_name: None,
            payload: Some(Vec::new()),
        };
        let err = RpcRequest::decode_initialized(&partial.encode_to_vec()).unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingField("method_name")));
    }

    #[test]
    fn decode_initialized_accepts_empty_payload_bytes() {
        let request = RpcRequest::new("Greeter", "Hello", Vec::new());
        let decoded = RpcRequest::decode_initialized(&request.encode_to_vec()).unwrap();
        assert_eq!(decoded, request);
        assert!(decoded.is_initialized());
    }

    #[test]
    fn decode_rejects_garbage() {
        // Field 1, length-delimited, claims 255 bytes that are not there.
        let err = RpcRequest::decode_initialized(&[0x0a, 0xff, 0x01, b'x']).unwrap_err();
        assert!(matches!(err, EnvelopeError::Decode(_)));
    }

    #[test]
    fn empty_bytes_decode_to_uninitialized_request() {
        let err = RpcRequest::decode_initialized(&[]).unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingField("service_name")));
    }

    #[test]
    fn failure_reason_defaults_to_rpc_failed() {
        let mut response = RpcResponse::failure(ErrorReason::IoError, "x");
        assert_eq!(response.failure_reason(), Some(ErrorReason::IoError));

        response.error_reason = Some(42);
        assert_eq!(response.failure_reason(), Some(ErrorReason::RpcFailed));

        response.error_reason = None;
        assert_eq!(response.failure_reason(), Some(ErrorReason::RpcFailed));

        response.error = None;
        assert_eq!(response.failure_reason(), None);
    }

    #[test]
    fn with_failure_keeps_payload() {
        let response = RpcResponse::completed(Some(b"chips".to_vec()))
            .with_failure(ErrorReason::RpcFailed, "soggy chips");
        assert_eq!(response.payload.as_deref(), Some(b"chips".as_ref()));
        assert_eq!(response.error.as_deref(), Some("soggy chips"));
        assert!(response.was_invoked());
    }

    #[test]
    fn reason_names_match_protocol() {
        assert_eq!(ErrorReason::BadRequestData.as_str(), "BAD_REQUEST_DATA");
        assert_eq!(ErrorReason::IoError.to_string(), "IO_ERROR");
        assert_eq!(ErrorReason::try_from(7).ok(), Some(ErrorReason::BadResponseProto));
    }
}
