//! Chat-completions adapter: asks a language model for song suggestions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ContentError, ContentSuggestion, RoundContentProvider, parse_suggestions};

/// Settings for [`ChatCompletionsProvider`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    /// Full URL of the chat-completions endpoint.
    pub endpoint: String,
    pub request_timeout: Duration,
}

impl OpenAiConfig {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1/chat/completions";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_owned(),
            endpoint: Self::DEFAULT_ENDPOINT.to_owned(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Round content from an OpenAI-compatible chat-completions API.
///
/// Asks for `option_count` "Song Title - Artist Name" lines in the round's
/// genre. The first parsed line is the correct answer, the rest are
/// distractors, and the correct line doubles as the media lookup reference.
pub struct ChatCompletionsProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl ChatCompletionsProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, ContentError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("encore/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ContentError::Provider(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn prompt(category: &str, option_count: usize) -> String {
        format!(
            "Suggest {option_count} random, unique song and artist pairs from the {category} genre. \
             Format each as \"Song Title - Artist Name\", and separate them by new lines."
        )
    }

    async fn complete(&self, prompt: String) -> Result<String, ContentError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ContentError::Provider(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ContentError::Provider(format!(
                "chat API returned {}",
                resp.status()
            )));
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ContentError::Malformed(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ContentError::Malformed("response had no message content".into()))
    }
}

impl RoundContentProvider for ChatCompletionsProvider {
    async fn fetch_round_content(
        &self,
        category: &str,
        option_count: usize,
    ) -> Result<ContentSuggestion, ContentError> {
        let text = self.complete(Self::prompt(category, option_count)).await?;
        tracing::trace!(category, reply = %text, "chat completion");

        let mut songs = parse_suggestions(&text).into_iter().take(option_count);
        let correct = songs
            .next()
            .ok_or_else(|| ContentError::Malformed("no song suggestions in reply".into()))?
            .to_string();

        Ok(ContentSuggestion {
            content_ref: Some(correct.clone()),
            correct_answer: correct,
            distractors: songs.map(|s| s.to_string()).collect(),
        })
    }
}
