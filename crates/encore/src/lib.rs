//! # Encore
//!
//! A real-time multiplayer song-trivia server.
//!
//! Players connect over WebSocket, join a room by its four-character code,
//! and play timed multiple-choice rounds whose content comes from a
//! [`RoundContentProvider`](encore_content::RoundContentProvider). Each room
//! is its own actor; the [`Coordinator`] routes events between connections
//! and rooms.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use encore::prelude::*;
//!
//! # async fn run() -> Result<(), EncoreError> {
//! let server = EncoreServerBuilder::new()
//!     .bind("0.0.0.0:3001")
//!     .game_config(GameConfig::default())
//!     .build(PlaceholderProvider::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod coordinator;
mod error;
mod handler;
mod server;

pub use coordinator::{Coordinator, ROOM_NOT_FOUND_MESSAGE};
pub use error::EncoreError;
pub use server::{DEFAULT_IDLE_TIMEOUT, EncoreServer, EncoreServerBuilder};

/// Everything needed to run a server or drive one from a test.
pub mod prelude {
    pub use crate::{Coordinator, EncoreError, EncoreServer, EncoreServerBuilder};
    pub use encore_content::{
        ChatCompletionsProvider, ContentError, ContentSuggestion, OpenAiConfig,
        PlaceholderProvider, RoundContentProvider,
    };
    pub use encore_protocol::{
        ClientEvent, Codec, JsonCodec, Phase, Player, PlayerId, RoomCode, ServerEvent, Standing,
    };
    pub use encore_room::{GameConfig, RoomRegistry};
    pub use encore_session::PlayerSender;
}
