//! Error types for the protocol layer.

/// Errors raised while turning frames into text and back.
///
/// These never describe a game rule violation; those travel inside an
/// [`AckResult`](crate::AckResult) as an [`ErrorCode`](crate::ErrorCode).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown `type` tag,
    /// or a field of the wrong shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but breaks a protocol rule, e.g. a second
    /// handshake or a version mismatch.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
