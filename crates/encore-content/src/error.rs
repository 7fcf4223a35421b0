//! Error types for round content.

/// Errors that can occur while obtaining round content.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// The provider could not be reached or returned a failure.
    #[error("content provider failed: {0}")]
    Provider(String),

    /// The provider answered, but not with a usable round.
    #[error("malformed round content: {0}")]
    Malformed(String),

    /// Fewer usable rounds than the game needs.
    #[error("only {got} of {wanted} rounds could be fetched")]
    Insufficient { wanted: usize, got: usize },
}
