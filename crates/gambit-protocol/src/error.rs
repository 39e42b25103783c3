//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire events.
///
/// Decode failures are routine — any client can send garbage — and are
/// handled by dropping the frame, never by tearing anything down.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an event into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, unknown
    /// event tag, or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but is invalid at the protocol level — e.g.
    /// a non-`join` event arriving before the connection has joined.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
