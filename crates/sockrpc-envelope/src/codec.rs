use bytes::Bytes;

use crate::error::Result;

/// Encode/decode pair for messages carried inside the envelope.
///
/// Every `prost` message gets this through a blanket impl. [`RawPayload`]
/// passes bytes through unchanged.
pub trait MessageCodec: Sized {
    /// Serialize to the bytes placed in the envelope payload.
    fn to_payload(&self) -> Vec<u8>;

    /// Parse envelope payload bytes.
    fn from_payload(bytes: &[u8]) -> Result<Self>;
}

impl<M> MessageCodec for M
where
    M: prost::Message + Default,
{
    fn to_payload(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    fn from_payload(bytes: &[u8]) -> Result<Self> {
        Ok(M::decode(bytes)?)
    }
}

/// Uninterpreted payload bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPayload(pub Bytes);

impl RawPayload {
    /// Wrap bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Borrow the bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Unwrap the bytes.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl MessageCodec for RawPayload {
    fn to_payload(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    fn from_payload(bytes: &[u8]) -> Result<Self> {
        Ok(Self(Bytes::copy_from_slice(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnvelopeError;

    #[derive(Clone, PartialEq, prost::Message)]
    struct Greeting {
        #[prost(string, tag = "1")]
        text: String,
    }

    #[test]
    fn prost_messages_use_protobuf_encoding() {
        let greeting = Greeting {
            text: "hi".to_string(),
        };
        assert_eq!(greeting.to_payload(), vec![0x0a, 2, b'h', b'i']);
        assert_eq!(Greeting::from_payload(&[0x0a, 2, b'h', b'i']).unwrap(), greeting);
    }

    #[test]
    fn prost_decode_failure_is_decode_error() {
        let err = Greeting::from_payload(&[0x0a, 9, b'h']).unwrap_err();
        assert!(matches!(err, EnvelopeError::Decode(_)));
    }

    #[test]
    fn raw_payload_is_passthrough() {
        let raw = RawPayload::from_payload(&[0xff, 0x00, 0x13]).unwrap();
        assert_eq!(raw.as_bytes(), &[0xff, 0x00, 0x13]);
        assert_eq!(raw.to_payload(), vec![0xff, 0x00, 0x13]);
    }
}
