//! Byte codecs for host events.
//!
//! The lobby does not care how events are serialized. It needs
//! something that implements [`Codec`]. The replay demo reads one JSON
//! document per line; an embedding host could plug in a binary codec
//! without touching the session layer.

use serde::{de::DeserializeOwned, Serialize};

use crate::{HostEvent, ProtocolError};

/// Turns values into bytes and back.
///
/// Shared by the event loop and the tasks it spawns, hence
/// `Send + Sync + 'static`.
pub trait Codec: Send + Sync + 'static {
    /// # Errors
    /// `ProtocolError::Encode` if the value can't be serialized.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// `ProtocolError::Decode` for malformed input or input of the wrong
    /// shape.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Decodes one line of an event script.
    ///
    /// Blank lines and lines starting with `#` yield `Ok(None)`.
    fn decode_line(&self, line: &str) -> Result<Option<HostEvent>, ProtocolError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        self.decode(line.as_bytes()).map(Some)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Human-readable, which makes event scripts easy to write by hand.
///
/// ## Example
///
/// ```rust
/// use lobbyforge_protocol::{Codec, HostEvent, JsonCodec};
///
/// let codec = JsonCodec;
/// let line = br#"{"type":"Shutdown"}"#;
///
/// let event: HostEvent = codec.decode(line).unwrap();
/// assert_eq!(event, HostEvent::Shutdown);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
