//! Trivia rooms for Encore.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! roster, the round timer, and the content for the current game.
//!
//! # Key types
//!
//! - [`Room`]: the room's state and rules, free of any I/O
//! - [`RoomRegistry`]: creates rooms on first join and finds them by code
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`GameConfig`]: round length, round limits, grace window

mod config;
mod error;
mod registry;
mod room;
mod state;

pub use config::GameConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{CONTENT_FAILURE_MESSAGE, RejoinOutcome, RoomHandle, RoomInfo};
pub use state::{Outbound, Room, avatar_url, points_for};
