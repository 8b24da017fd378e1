//! Error types for the protocol layer.

/// Errors raised while turning frames into bytes or back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes weren't a valid frame: malformed JSON, an unknown
    /// action tag, a missing field.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but breaks a protocol rule, such as a second
    /// `Join` on an already bound connection.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
