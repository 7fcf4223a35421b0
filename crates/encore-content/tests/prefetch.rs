//! Integration tests for up-front round prefetching.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use encore_content::{
    ContentError, ContentSuggestion, PlaceholderProvider, RoundContentProvider, prefetch_rounds,
};
use tokio::time::Instant;

/// Replays a fixed script of outcomes and records when each call came in.
struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ContentSuggestion, ContentError>>>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Result<ContentSuggestion, ContentError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl RoundContentProvider for ScriptedProvider {
    async fn fetch_round_content(
        &self,
        _category: &str,
        _option_count: usize,
    ) -> Result<ContentSuggestion, ContentError> {
        self.calls.lock().unwrap().push(Instant::now());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ContentError::Provider("script exhausted".into())))
    }
}

fn good(answer: &str) -> Result<ContentSuggestion, ContentError> {
    Ok(ContentSuggestion {
        correct_answer: answer.into(),
        distractors: vec!["X".into(), "Y".into(), "Z".into()],
        content_ref: None,
    })
}

#[tokio::test(start_paused = true)]
async fn test_prefetch_returns_all_rounds_in_order() {
    let provider = ScriptedProvider::new(vec![good("A"), good("B"), good("C")]);

    let rounds = prefetch_rounds(&provider, 3, 4, Duration::ZERO).await.unwrap();

    let answers: Vec<_> = rounds.iter().map(|r| r.correct_answer()).collect();
    assert_eq!(answers, vec!["A", "B", "C"]);
    for round in &rounds {
        assert_eq!(round.options().len(), 4);
    }
}

#[tokio::test(start_paused = true)]
async fn test_prefetch_spaces_calls() {
    let provider = ScriptedProvider::new(vec![good("A"), good("B"), good("C")]);

    prefetch_rounds(&provider, 3, 4, Duration::from_millis(1000))
        .await
        .unwrap();

    let calls = provider.calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1] - calls[0], Duration::from_millis(1000));
    assert_eq!(calls[2] - calls[1], Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_prefetch_short_by_one_round_is_insufficient() {
    let provider = ScriptedProvider::new(vec![
        good("A"),
        Err(ContentError::Provider("rate limited".into())),
        good("C"),
    ]);

    let result = prefetch_rounds(&provider, 3, 4, Duration::ZERO).await;

    assert!(matches!(
        result,
        Err(ContentError::Insufficient { wanted: 3, got: 2 })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_prefetch_malformed_round_counts_as_missing() {
    let malformed = Ok(ContentSuggestion {
        correct_answer: "A".into(),
        distractors: vec!["A".into()],
        content_ref: None,
    });
    let provider = ScriptedProvider::new(vec![malformed, good("B")]);

    let result = prefetch_rounds(&provider, 2, 4, Duration::ZERO).await;

    assert!(matches!(
        result,
        Err(ContentError::Insufficient { wanted: 2, got: 1 })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_prefetch_does_not_retry_failed_round() {
    let provider = ScriptedProvider::new(vec![
        Err(ContentError::Provider("boom".into())),
        good("B"),
        good("C"),
    ]);

    let _ = prefetch_rounds(&provider, 2, 4, Duration::ZERO).await;

    assert_eq!(provider.calls.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_prefetch_with_placeholder_provider() {
    let provider = PlaceholderProvider::new();
    let rounds = prefetch_rounds(&provider, 10, 4, Duration::from_millis(1000))
        .await
        .unwrap();
    assert_eq!(rounds.len(), 10);
}
