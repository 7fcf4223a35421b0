//! `encore-server`: runs an Encore server configured from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `3001` |
//! | `OPENAI_API_KEY` | unset: serve the built-in placeholder rounds |
//! | `OPENAI_MODEL` | `gpt-4o-mini` |
//! | `ENCORE_ROUNDS` | `3` |
//! | `ENCORE_ROUND_TIME` | `15` (seconds) |
//! | `RUST_LOG` | `info` |

use std::env;
use std::str::FromStr;

use encore::prelude::*;
use tracing_subscriber::EnvFilter;

/// The provider picked at startup.
enum Provider {
    OpenAi(ChatCompletionsProvider),
    Placeholder(PlaceholderProvider),
}

impl RoundContentProvider for Provider {
    async fn fetch_round_content(
        &self,
        category: &str,
        option_count: usize,
    ) -> Result<ContentSuggestion, ContentError> {
        match self {
            Self::OpenAi(p) => p.fetch_round_content(category, option_count).await,
            Self::Placeholder(p) => p.fetch_round_content(category, option_count).await,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}

fn provider_from_env() -> Result<Provider, ContentError> {
    match env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            let mut config = OpenAiConfig::new(key.trim());
            if let Ok(model) = env::var("OPENAI_MODEL") {
                config = config.with_model(model);
            }
            tracing::info!(model = %config.model, "using chat-completions content provider");
            Ok(Provider::OpenAi(ChatCompletionsProvider::new(config)?))
        }
        _ => {
            tracing::warn!("OPENAI_API_KEY not set, serving placeholder rounds");
            Ok(Provider::Placeholder(PlaceholderProvider::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), EncoreError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env_parse("PORT").unwrap_or(3001);

    let mut game = GameConfig::default();
    if let Some(rounds) = env_parse("ENCORE_ROUNDS") {
        game.default_max_rounds = rounds;
    }
    if let Some(secs) = env_parse("ENCORE_ROUND_TIME") {
        game.round_time_secs = secs;
    }

    let server = EncoreServerBuilder::new()
        .bind(&format!("{host}:{port}"))
        .game_config(game)
        .build(provider_from_env()?)
        .await?;

    if let Ok(addr) = server.local_addr() {
        tracing::info!(%addr, "Encore listening");
    }

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "could not listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
}
