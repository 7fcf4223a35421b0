//! Round content for Encore.
//!
//! A room never talks to an LLM or a media service directly. It consumes a
//! [`RoundContentProvider`]: given a category and an option count, return
//! one correct answer and enough distractors. This crate defines that
//! interface and everything around it:
//!
//! - [`RoundContent`]: a validated, shuffled round, ready to show.
//! - [`prefetch_rounds`]: fetch a whole game's rounds up front, spaced
//!   out to respect the provider's rate limits.
//! - [`GENRES`] / [`random_genre`]: the category catalogue.
//! - [`ChatCompletionsProvider`]: asks an OpenAI-compatible chat API for
//!   song suggestions (feature `openai`, on by default).
//! - [`PlaceholderProvider`]: a fixed offline catalogue.

mod error;
mod genre;
#[cfg(feature = "openai")]
mod openai;
mod placeholder;
mod prefetch;
mod provider;

pub use error::ContentError;
pub use genre::{GENRES, random_genre};
#[cfg(feature = "openai")]
pub use openai::{ChatCompletionsProvider, OpenAiConfig};
pub use placeholder::PlaceholderProvider;
pub use prefetch::prefetch_rounds;
pub use provider::{
    ContentSuggestion, RoundContent, RoundContentProvider, SongSuggestion, parse_suggestions,
};
