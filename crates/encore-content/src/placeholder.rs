//! Offline provider backed by a fixed catalogue.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{ContentError, ContentSuggestion, RoundContentProvider};

const CATALOGUE: &[(&str, &str)] = &[
    ("Bohemian Rhapsody", "Queen"),
    ("Billie Jean", "Michael Jackson"),
    ("Smells Like Teen Spirit", "Nirvana"),
    ("Respect", "Aretha Franklin"),
    ("Take Five", "Dave Brubeck"),
    ("Hotel California", "Eagles"),
    ("Lose Yourself", "Eminem"),
    ("Jolene", "Dolly Parton"),
    ("One Love", "Bob Marley"),
    ("Superstition", "Stevie Wonder"),
    ("Dancing Queen", "ABBA"),
    ("Wonderwall", "Oasis"),
    ("Around the World", "Daft Punk"),
    ("Master of Puppets", "Metallica"),
    ("Dynamite", "BTS"),
    ("The Thrill Is Gone", "B.B. King"),
];

/// Serves rounds from a built-in list of well-known songs.
///
/// Ignores the category. Each call starts one entry further along the
/// catalogue, so consecutive rounds have different answers. Used when no
/// API key is configured.
#[derive(Debug, Default)]
pub struct PlaceholderProvider {
    cursor: AtomicUsize,
}

impl PlaceholderProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoundContentProvider for PlaceholderProvider {
    async fn fetch_round_content(
        &self,
        _category: &str,
        option_count: usize,
    ) -> Result<ContentSuggestion, ContentError> {
        if option_count == 0 || option_count > CATALOGUE.len() {
            return Err(ContentError::Malformed(format!(
                "catalogue holds {} songs, asked for {option_count}",
                CATALOGUE.len()
            )));
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        let mut picks = (0..option_count).map(|i| {
            let (title, artist) = CATALOGUE[(start + i) % CATALOGUE.len()];
            format!("{title} - {artist}")
        });

        let correct_answer = picks.next().unwrap_or_default();
        Ok(ContentSuggestion {
            content_ref: Some(correct_answer.clone()),
            correct_answer,
            distractors: picks.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_placeholder_returns_requested_option_count() {
        let provider = PlaceholderProvider::new();
        let s = provider.fetch_round_content("Jazz", 4).await.unwrap();
        assert_eq!(s.distractors.len(), 3);
        assert!(!s.distractors.contains(&s.correct_answer));
        assert_eq!(s.content_ref.as_deref(), Some(s.correct_answer.as_str()));
    }

    #[tokio::test]
    async fn test_placeholder_rotates_answers() {
        let provider = PlaceholderProvider::new();
        let first = provider.fetch_round_content("Pop", 4).await.unwrap();
        let second = provider.fetch_round_content("Pop", 4).await.unwrap();
        assert_ne!(first.correct_answer, second.correct_answer);
    }

    #[tokio::test]
    async fn test_placeholder_rejects_oversized_request() {
        let provider = PlaceholderProvider::new();
        let result = provider.fetch_round_content("Pop", 100).await;
        assert!(matches!(result, Err(ContentError::Malformed(_))));
    }
}
