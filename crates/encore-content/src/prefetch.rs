//! Up-front fetching of a whole game's rounds.

use std::time::Duration;

use crate::{ContentError, RoundContent, RoundContentProvider, random_genre};

/// Fetches `rounds` rounds, each in a random category.
///
/// Calls are made one at a time with `spacing` between them, to stay
/// under the provider's rate limit. A failed or malformed round is logged
/// and skipped, not retried; if that leaves fewer than `rounds`, the whole
/// fetch fails with [`ContentError::Insufficient`].
pub async fn prefetch_rounds<P>(
    provider: &P,
    rounds: usize,
    option_count: usize,
    spacing: Duration,
) -> Result<Vec<RoundContent>, ContentError>
where
    P: RoundContentProvider,
{
    let mut fetched = Vec::with_capacity(rounds);

    for attempt in 0..rounds {
        if attempt > 0 && !spacing.is_zero() {
            tokio::time::sleep(spacing).await;
        }

        let category = random_genre();
        let round = match provider.fetch_round_content(category, option_count).await {
            Ok(suggestion) => RoundContent::new(category, suggestion, option_count),
            Err(e) => Err(e),
        };

        match round {
            Ok(content) => {
                tracing::debug!(attempt, category, "round content fetched");
                fetched.push(content);
            }
            Err(e) => {
                tracing::warn!(attempt, category, error = %e, "skipping round");
            }
        }
    }

    if fetched.len() < rounds {
        return Err(ContentError::Insufficient {
            wanted: rounds,
            got: fetched.len(),
        });
    }
    Ok(fetched)
}
