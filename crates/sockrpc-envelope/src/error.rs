/// Errors that can occur while encoding or decoding envelopes and payloads.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The bytes are not a valid protobuf message.
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A required envelope field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
