//! Identity types: who a player is and which room they are in.

use std::fmt;

use encore_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// Identifier of a player, scoped to the connection that created it.
///
/// A reconnecting client gets a fresh id from its new connection and hands
/// the old one back in `rejoinRoom` so the room can re-key its entry.
/// Serializes as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl From<ConnectionId> for PlayerId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// Number of characters in a room code.
pub const ROOM_CODE_LEN: usize = 4;

/// A room's short join code: four ASCII letters or digits, upper case.
///
/// Parsing normalises case, so `"ab12"` and `"AB12"` name the same room.
/// Deserialization goes through [`RoomCode::parse`], so a malformed code
/// never makes it past the codec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Validates and normalises a room code.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let trimmed = raw.trim();
        if trimmed.len() != ROOM_CODE_LEN || !trimmed.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ProtocolError::InvalidRoomCode(raw.to_owned()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&PlayerId(42)).unwrap(), "42");
        let pid: PlayerId = serde_json::from_str("42").unwrap();
        assert_eq!(pid, PlayerId(42));
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_player_id_from_connection_id() {
        assert_eq!(PlayerId::from(ConnectionId::new(5)), PlayerId(5));
    }

    #[test]
    fn test_room_code_parse_uppercases() {
        let code = RoomCode::parse("ab12").unwrap();
        assert_eq!(code.as_str(), "AB12");
        assert_eq!(code, RoomCode::parse(" AB12 ").unwrap());
    }

    #[test]
    fn test_room_code_parse_rejects_wrong_length() {
        assert!(RoomCode::parse("ABC").is_err());
        assert!(RoomCode::parse("ABCDE").is_err());
        assert!(RoomCode::parse("").is_err());
    }

    #[test]
    fn test_room_code_parse_rejects_non_alphanumeric() {
        assert!(RoomCode::parse("AB-1").is_err());
        assert!(RoomCode::parse("ÄB12").is_err());
    }

    #[test]
    fn test_room_code_serde_round_trips_as_string() {
        let code = RoomCode::parse("zz99").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"ZZ99\"");
        let bad: Result<RoomCode, _> = serde_json::from_str("\"toolong\"");
        assert!(bad.is_err());
    }
}
