//! The provider interface and the validated round it produces.

use std::fmt;
use std::future::Future;

use encore_protocol::RoundView;
use rand::seq::SliceRandom;

use crate::ContentError;

// ---------------------------------------------------------------------------
// RoundContentProvider
// ---------------------------------------------------------------------------

/// Supplies the answer set for one round.
///
/// Implementations are shared between rooms and called from spawned tasks,
/// hence `Send + Sync + 'static` and a `Send` future.
///
/// ## Example
///
/// ```rust
/// use encore_content::{ContentError, ContentSuggestion, RoundContentProvider};
///
/// struct AlwaysJazz;
///
/// impl RoundContentProvider for AlwaysJazz {
///     async fn fetch_round_content(
///         &self,
///         _category: &str,
///         option_count: usize,
///     ) -> Result<ContentSuggestion, ContentError> {
///         let distractors = (1..option_count).map(|i| format!("Tune {i} - Band")).collect();
///         Ok(ContentSuggestion {
///             correct_answer: "Take Five - Dave Brubeck".into(),
///             distractors,
///             content_ref: None,
///         })
///     }
/// }
/// ```
pub trait RoundContentProvider: Send + Sync + 'static {
    /// Fetches one correct answer and `option_count - 1` distractors for
    /// `category`.
    fn fetch_round_content(
        &self,
        category: &str,
        option_count: usize,
    ) -> impl Future<Output = Result<ContentSuggestion, ContentError>> + Send;
}

/// Raw provider output, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSuggestion {
    pub correct_answer: String,
    pub distractors: Vec<String>,
    /// Opaque playback/lookup token, if the provider has one.
    pub content_ref: Option<String>,
}

// ---------------------------------------------------------------------------
// Song suggestions
// ---------------------------------------------------------------------------

/// A "Song Title - Artist Name" pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongSuggestion {
    pub title: String,
    pub artist: String,
}

impl fmt::Display for SongSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}

/// Extracts song/artist pairs from free-form model output.
///
/// Keeps only lines containing `" - "`, strips list numbering (`"1. "`)
/// and double quotes, and drops pairs with an empty side.
pub fn parse_suggestions(text: &str) -> Vec<SongSuggestion> {
    text.trim()
        .lines()
        .filter(|line| line.contains(" - "))
        .filter_map(|line| {
            let cleaned = strip_list_number(line.trim()).replace('"', "");
            let mut parts = cleaned.split(" - ");
            let title = parts.next()?.trim();
            let artist = parts.next()?.trim();
            if title.is_empty() || artist.is_empty() {
                return None;
            }
            Some(SongSuggestion {
                title: title.to_owned(),
                artist: artist.to_owned(),
            })
        })
        .collect()
}

fn strip_list_number(line: &str) -> &str {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == line.len() {
        return line;
    }
    match rest.strip_prefix('.') {
        Some(after_dot) => after_dot.trim_start(),
        None => line,
    }
}

// ---------------------------------------------------------------------------
// RoundContent
// ---------------------------------------------------------------------------

/// One round's content, checked and with its option order fixed.
///
/// The option order is shuffled once, at construction, so everyone in the
/// room (including late joiners) sees the same layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundContent {
    category: String,
    correct_answer: String,
    distractors: Vec<String>,
    content_ref: Option<String>,
    options: Vec<String>,
}

impl RoundContent {
    /// Validates a suggestion for a round with `option_count` options.
    ///
    /// Distractors equal to the correct answer or to each other (ignoring
    /// case and surrounding whitespace) are dropped; surplus distractors
    /// are cut. Fails if fewer than `option_count - 1` remain.
    pub fn new(
        category: impl Into<String>,
        suggestion: ContentSuggestion,
        option_count: usize,
    ) -> Result<Self, ContentError> {
        if option_count < 2 {
            return Err(ContentError::Malformed(format!(
                "a round needs at least 2 options, asked for {option_count}"
            )));
        }
        let correct_answer = suggestion.correct_answer.trim().to_owned();
        if correct_answer.is_empty() {
            return Err(ContentError::Malformed("empty correct answer".into()));
        }

        let mut seen = vec![correct_answer.to_lowercase()];
        let mut distractors = Vec::with_capacity(option_count - 1);
        for candidate in suggestion.distractors {
            let candidate = candidate.trim();
            let key = candidate.to_lowercase();
            if candidate.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            distractors.push(candidate.to_owned());
            if distractors.len() == option_count - 1 {
                break;
            }
        }
        if distractors.len() < option_count - 1 {
            return Err(ContentError::Malformed(format!(
                "needed {} distinct distractors, got {}",
                option_count - 1,
                distractors.len()
            )));
        }

        let mut options = distractors.clone();
        options.push(correct_answer.clone());
        options.shuffle(&mut rand::rng());

        Ok(Self {
            category: category.into(),
            correct_answer,
            distractors,
            content_ref: suggestion.content_ref,
            options,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn distractors(&self) -> &[String] {
        &self.distractors
    }

    pub fn content_ref(&self) -> Option<&str> {
        self.content_ref.as_deref()
    }

    /// Correct answer and distractors, in the round's shuffled order.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Exact match against the correct answer, ignoring surrounding
    /// whitespace.
    pub fn is_correct(&self, answer: &str) -> bool {
        answer.trim() == self.correct_answer
    }

    /// What players are shown. Leaves out the correct answer.
    pub fn view(&self) -> RoundView {
        RoundView {
            category: self.category.clone(),
            content_ref: self.content_ref.clone(),
            options: self.options.clone(),
        }
    }
}
