//! Codec trait and implementations for text frames.
//!
//! Browsers speak WebSocket text frames, so a codec here maps values to
//! and from `String`. The server only depends on the [`Codec`] trait;
//! [`JsonCodec`] is the default implementation.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values into text frames and decodes them back.
///
/// `Send + Sync + 'static` because a single codec is shared by every
/// connection task through the server state.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the text is malformed or does
    /// not match the expected frame shape.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use whodunit_protocol::{Codec, JsonCodec, ClientFrame, Request};
///
/// let codec = JsonCodec;
/// let frame: ClientFrame<()> = ClientFrame {
///     id: 7,
///     request: Request::CreateRoom { name: "Ada".into() },
/// };
///
/// let text = codec.encode(&frame).unwrap();
/// let decoded: ClientFrame<()> = codec.decode(&text).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
