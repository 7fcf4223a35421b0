//! Codec trait and implementations for turning events into frames.
//!
//! The transport carries text frames, so a codec encodes to `String` and
//! decodes from raw bytes (clients may still send binary frames holding
//! UTF-8 JSON).

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values into text frames and decodes frames back into values.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a frame back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use encore_protocol::{ClientEvent, Codec, JsonCodec, RoomCode};
///
/// let codec = JsonCodec;
/// let event: ClientEvent = codec
///     .decode(br#"{"type":"joinRoom","roomCode":"ab12"}"#)
///     .unwrap();
/// assert_eq!(event.room_code(), &RoomCode::parse("AB12").unwrap());
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientEvent, PlayerId, ServerEvent};

    #[test]
    fn test_json_codec_encodes_server_event_as_text() {
        let text = JsonCodec
            .encode(&ServerEvent::TimeUpdate { time_left: 9 })
            .unwrap();
        assert_eq!(text, r#"{"type":"time_update","timeLeft":9}"#);
    }

    #[test]
    fn test_json_codec_decodes_client_event() {
        let event: ClientEvent = JsonCodec
            .decode(br#"{"type":"rejoinRoom","roomCode":"XY99","playerId":12}"#)
            .unwrap();
        match event {
            ClientEvent::RejoinRoom { room_code, player_id } => {
                assert_eq!(room_code.as_str(), "XY99");
                assert_eq!(player_id, PlayerId(12));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_json_codec_decode_rejects_garbage() {
        let result: Result<ClientEvent, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_decode_rejects_unknown_type() {
        let result: Result<ClientEvent, _> =
            JsonCodec.decode(br#"{"type":"kickEveryone","roomCode":"AB12"}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
