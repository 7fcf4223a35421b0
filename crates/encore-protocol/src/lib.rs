//! Wire protocol for Encore.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Identity** ([`PlayerId`], [`RoomCode`]): who and where.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]) and the records they
//!   carry ([`Player`], [`Standing`], [`GameSnapshot`], [`RoundView`]).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): events to text frames
//!   and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! Every inbound event is checked here, at the boundary. A room never sees
//! a malformed room code, an out-of-range round count, or an empty answer.
//!
//! ```text
//! Transport (frames) → Protocol (ClientEvent) → Coordinator → Room
//! ```

mod codec;
mod error;
mod events;
mod ids;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{
    AnswerRecord, ClientEvent, GameSnapshot, MAX_ANSWER_LEN, MAX_ROUNDS_LIMIT, Phase, Player,
    Recipient, RoundView, Scores, ServerEvent, Standing,
};
pub use ids::{PlayerId, ROOM_CODE_LEN, RoomCode};
