//! Inbound and outbound events, and the records they carry.
//!
//! Every event is a JSON object tagged by `"type"`. Field names are
//! camelCase. Outbound event names mix camelCase and snake_case
//! (`roomJoined` next to `new_round`); clients depend on the exact names.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{PlayerId, ProtocolError, RoomCode};

/// Upper bound on rounds per game.
pub const MAX_ROUNDS_LIMIT: u32 = 10;

/// Longest answer accepted, in bytes, after trimming.
pub const MAX_ANSWER_LEN: usize = 200;

/// Accumulated points per player.
pub type Scores = BTreeMap<PlayerId, u32>;

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who an outbound event is addressed to, within one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every player in the room.
    All,
    /// One specific player.
    Player(PlayerId),
    /// Everyone except this player (roster deltas skip the actor).
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Coarse game state of a room.
///
/// ```text
/// Lobby → Playing → GameOver → Lobby
/// ```
///
/// The only backwards edge is play-again (`GameOver → Lobby`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Lobby,
    Playing,
    GameOver,
}

impl Phase {
    /// The single phase this one may move to.
    pub fn next(self) -> Self {
        match self {
            Self::Lobby => Self::Playing,
            Self::Playing => Self::GameOver,
            Self::GameOver => Self::Lobby,
        }
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == target
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "lobby"),
            Self::Playing => write!(f, "playing"),
            Self::GameOver => write!(f, "gameOver"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A player as every client sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub is_host: bool,
    /// Mirror of the room's score ledger entry for this player.
    pub score: u32,
}

/// One line of the final leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    #[serde(flatten)]
    pub player: Player,
    pub final_score: u32,
}

/// Room state sent to a joining or rejoining connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub phase: Phase,
    pub current_round: u32,
    pub max_rounds: u32,
    pub time_left: u32,
    pub scores: Scores,
    pub final_standings: Option<Vec<Standing>>,
}

/// What players see of a round. The correct answer is not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub category: String,
    /// Opaque playback/lookup token for the round's media.
    pub content_ref: Option<String>,
    /// Correct answer and distractors, shuffled.
    pub options: Vec<String>,
}

/// How one player answered a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub player_id: PlayerId,
    /// Display name at the time of answering.
    pub player: String,
    pub answer: String,
    pub elapsed_seconds: u32,
}

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room_code: RoomCode,
    },
    RejoinRoom {
        room_code: RoomCode,
        /// The id this client held before it lost its connection.
        player_id: PlayerId,
    },
    StartGame {
        room_code: RoomCode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_rounds: Option<u32>,
    },
    SetMaxRounds {
        room_code: RoomCode,
        max_rounds: u32,
    },
    SubmitAnswer {
        room_code: RoomCode,
        answer: String,
    },
    PlayAgain {
        room_code: RoomCode,
    },
    LeaveRoom {
        room_code: RoomCode,
    },
    RefreshAvatar {
        room_code: RoomCode,
    },
}

impl ClientEvent {
    /// The room this event targets.
    pub fn room_code(&self) -> &RoomCode {
        match self {
            Self::JoinRoom { room_code }
            | Self::RejoinRoom { room_code, .. }
            | Self::StartGame { room_code, .. }
            | Self::SetMaxRounds { room_code, .. }
            | Self::SubmitAnswer { room_code, .. }
            | Self::PlayAgain { room_code }
            | Self::LeaveRoom { room_code }
            | Self::RefreshAvatar { room_code } => room_code,
        }
    }

    /// Wire name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "joinRoom",
            Self::RejoinRoom { .. } => "rejoinRoom",
            Self::StartGame { .. } => "startGame",
            Self::SetMaxRounds { .. } => "setMaxRounds",
            Self::SubmitAnswer { .. } => "submitAnswer",
            Self::PlayAgain { .. } => "playAgain",
            Self::LeaveRoom { .. } => "leaveRoom",
            Self::RefreshAvatar { .. } => "refreshAvatar",
        }
    }

    /// Checks the rules serde can't express: round-count range and answer
    /// size. Room codes were already checked during decoding.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::StartGame {
                max_rounds: Some(n),
                ..
            }
            | Self::SetMaxRounds { max_rounds: n, .. } => {
                if !(1..=MAX_ROUNDS_LIMIT).contains(n) {
                    return Err(ProtocolError::InvalidMessage(format!(
                        "maxRounds must be between 1 and {MAX_ROUNDS_LIMIT}, got {n}"
                    )));
                }
            }
            Self::SubmitAnswer { answer, .. } => {
                let answer = answer.trim();
                if answer.is_empty() {
                    return Err(ProtocolError::InvalidMessage("answer is empty".into()));
                }
                if answer.len() > MAX_ANSWER_LEN {
                    return Err(ProtocolError::InvalidMessage(format!(
                        "answer exceeds {MAX_ANSWER_LEN} bytes"
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full snapshot for a fresh join.
    #[serde(rename = "roomJoined")]
    RoomJoined {
        room_code: RoomCode,
        player: Player,
        players: Vec<Player>,
        game: GameSnapshot,
    },

    /// Full snapshot after a successful rejoin.
    #[serde(rename = "roomRejoined")]
    RoomRejoined {
        room_code: RoomCode,
        player: Player,
        players: Vec<Player>,
        game: GameSnapshot,
    },

    #[serde(rename = "userJoined")]
    UserJoined { player: Player, players: Vec<Player> },

    #[serde(rename = "userRejoined")]
    UserRejoined { player: Player, players: Vec<Player> },

    #[serde(rename = "userLeft")]
    UserLeft {
        player_id: PlayerId,
        players: Vec<Player>,
    },

    /// A player's display attributes changed (avatar refresh).
    #[serde(rename = "playerUpdated")]
    PlayerUpdated { player: Player, players: Vec<Player> },

    #[serde(rename = "settingsUpdated")]
    SettingsUpdated { max_rounds: u32 },

    #[serde(rename = "gameStart")]
    GameStart { max_rounds: u32 },

    #[serde(rename = "new_round")]
    NewRound {
        round_number: u32,
        max_rounds: u32,
        content: RoundView,
        time_left: u32,
    },

    #[serde(rename = "time_update")]
    TimeUpdate { time_left: u32 },

    /// Private verdict for the answering player.
    #[serde(rename = "answer_result")]
    AnswerResult {
        correct: bool,
        points: u32,
        correct_answer: String,
    },

    #[serde(rename = "score_update")]
    ScoreUpdate { scores: Scores, players: Vec<Player> },

    #[serde(rename = "round_end")]
    RoundEnd {
        round_number: u32,
        correct_answer: String,
        scores: Scores,
        answers: Vec<AnswerRecord>,
        players: Vec<Player>,
    },

    #[serde(rename = "game_over")]
    GameOver {
        standings: Vec<Standing>,
        winner: Option<Standing>,
    },

    #[serde(rename = "gameReset")]
    GameReset { phase: Phase, players: Vec<Player> },

    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn code() -> RoomCode {
        RoomCode::parse("AB12").unwrap()
    }

    fn player(id: u64, host: bool) -> Player {
        Player {
            id: PlayerId(id),
            name: format!("Player {id}"),
            avatar: format!("avatar-{id}"),
            is_host: host,
            score: 0,
        }
    }

    // -- Phase --

    #[test]
    fn test_phase_transitions_cycle_through_play_again() {
        assert!(Phase::Lobby.can_transition_to(Phase::Playing));
        assert!(Phase::Playing.can_transition_to(Phase::GameOver));
        assert!(Phase::GameOver.can_transition_to(Phase::Lobby));
        assert!(!Phase::Lobby.can_transition_to(Phase::GameOver));
        assert!(!Phase::Playing.can_transition_to(Phase::Lobby));
        assert!(!Phase::GameOver.can_transition_to(Phase::Playing));
    }

    #[test]
    fn test_phase_serializes_camel_case() {
        assert_eq!(serde_json::to_value(Phase::GameOver).unwrap(), json!("gameOver"));
        assert_eq!(Phase::default(), Phase::Lobby);
        assert_eq!(Phase::Playing.to_string(), "playing");
    }

    // -- ClientEvent --

    #[test]
    fn test_client_event_start_game_max_rounds_optional() {
        let event: ClientEvent =
            serde_json::from_value(json!({"type": "startGame", "roomCode": "ab12"})).unwrap();
        assert_eq!(
            event,
            ClientEvent::StartGame {
                room_code: code(),
                max_rounds: None
            }
        );
    }

    #[test]
    fn test_client_event_rejects_bad_room_code() {
        let result: Result<ClientEvent, _> =
            serde_json::from_value(json!({"type": "joinRoom", "roomCode": "AB1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_client_event_validate_max_rounds_range() {
        let ok = ClientEvent::SetMaxRounds {
            room_code: code(),
            max_rounds: 10,
        };
        assert!(ok.validate().is_ok());

        let zero = ClientEvent::SetMaxRounds {
            room_code: code(),
            max_rounds: 0,
        };
        assert!(zero.validate().is_err());

        let eleven = ClientEvent::StartGame {
            room_code: code(),
            max_rounds: Some(11),
        };
        assert!(eleven.validate().is_err());
    }

    #[test]
    fn test_client_event_validate_answer() {
        let blank = ClientEvent::SubmitAnswer {
            room_code: code(),
            answer: "   ".into(),
        };
        assert!(blank.validate().is_err());

        let long = ClientEvent::SubmitAnswer {
            room_code: code(),
            answer: "x".repeat(MAX_ANSWER_LEN + 1),
        };
        assert!(long.validate().is_err());

        let fine = ClientEvent::SubmitAnswer {
            room_code: code(),
            answer: "Song - Artist".into(),
        };
        assert!(fine.validate().is_ok());
    }

    #[test]
    fn test_client_event_room_code_and_kind() {
        let event = ClientEvent::LeaveRoom { room_code: code() };
        assert_eq!(event.room_code(), &code());
        assert_eq!(event.kind(), "leaveRoom");
    }

    // -- ServerEvent --

    #[test]
    fn test_server_event_names_match_wire() {
        let cases = [
            (ServerEvent::GameStart { max_rounds: 3 }, "gameStart"),
            (ServerEvent::TimeUpdate { time_left: 3 }, "time_update"),
            (ServerEvent::error("nope"), "error"),
            (
                ServerEvent::UserLeft {
                    player_id: PlayerId(1),
                    players: vec![],
                },
                "userLeft",
            ),
            (
                ServerEvent::GameReset {
                    phase: Phase::Lobby,
                    players: vec![],
                },
                "gameReset",
            ),
        ];
        for (event, name) in cases {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], name);
        }
    }

    #[test]
    fn test_server_event_fields_are_camel_case() {
        let value = serde_json::to_value(ServerEvent::AnswerResult {
            correct: true,
            points: 1333,
            correct_answer: "Song - Artist".into(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({
                "type": "answer_result",
                "correct": true,
                "points": 1333,
                "correctAnswer": "Song - Artist"
            })
        );
    }

    #[test]
    fn test_standing_flattens_player_fields() {
        let standing = Standing {
            player: player(1, true),
            final_score: 2000,
        };
        let value = serde_json::to_value(&standing).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["isHost"], true);
        assert_eq!(value["finalScore"], 2000);

        let back: Standing = serde_json::from_value(value).unwrap();
        assert_eq!(back, standing);
    }

    #[test]
    fn test_snapshot_scores_keyed_by_player_id() {
        let mut scores = Scores::new();
        scores.insert(PlayerId(4), 1200);
        let snapshot = GameSnapshot {
            phase: Phase::Playing,
            current_round: 1,
            max_rounds: 3,
            time_left: 12,
            scores,
            final_standings: None,
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["scores"]["4"], 1200);
        assert_eq!(value["finalStandings"], serde_json::Value::Null);

        let back: GameSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_new_round_never_carries_correct_answer() {
        let event = ServerEvent::NewRound {
            round_number: 1,
            max_rounds: 3,
            content: RoundView {
                category: "Jazz".into(),
                content_ref: Some("Take Five - Dave Brubeck".into()),
                options: vec!["a".into(), "b".into()],
            },
            time_left: 15,
        };
        let text = serde_json::to_string(&event).unwrap();
        assert!(!text.contains("correctAnswer"));
        assert!(text.contains("\"roundNumber\":1"));
    }
}
