//! Follow-up message generation
//!
//! [`ReplyWriter`] never fails its caller: [`FollowupWriter`] asks an
//! OpenAI-style chat completion API for a short reply in the configured
//! tone, and any failure (missing key, HTTP error, empty response) falls
//! back to a fixed message built from the lead's name and interest.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::leads::Lead;
use crate::storage::{ChatStore, Direction, StoredMessage};

/// How many stored messages feed the conversational context.
const CONTEXT_MESSAGES: usize = 5;

#[derive(Debug, Error)]
enum WriteError {
    #[error("OPENAI_API_KEY is not configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("completion API returned {status}: {body}")]
    BadStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("completion API returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait ReplyWriter: Send + Sync {
    /// Write a follow-up to `lead` in the style of `tone_sample`.
    ///
    /// Always returns non-empty text.
    async fn generate(&self, lead: &Lead, tone_sample: &str) -> String;
}

/// Chat-completion-backed writer.
pub struct FollowupWriter {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    store: Arc<ChatStore>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<CompletionMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct CompletionMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

impl FollowupWriter {
    pub fn new(config: &Config, store: Arc<ChatStore>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.request_timeout)
                .build()
                .unwrap_or_default(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            base_url: config.openai_base_url.clone(),
            store,
        }
    }

    async fn try_generate(&self, lead: &Lead, tone_sample: &str) -> Result<String, WriteError> {
        let api_key = self.api_key.as_deref().ok_or(WriteError::MissingApiKey)?;

        let history = self.store.load(&lead.phone).await;
        let prompt = build_prompt(lead, tone_sample, &history);
        tracing::debug!(phone = %lead.phone, prompt, "completion prompt");

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![CompletionMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            max_tokens: 100,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WriteError::BadStatus { status, body });
        }

        let completion: CompletionResponse = response.json().await?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(WriteError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl ReplyWriter for FollowupWriter {
    async fn generate(&self, lead: &Lead, tone_sample: &str) -> String {
        match self.try_generate(lead, tone_sample).await {
            Ok(text) => {
                tracing::info!(phone = %lead.phone, "generated follow-up");
                text
            }
            Err(e) => {
                tracing::error!(phone = %lead.phone, error = %e, "generation failed, using fallback");
                fallback_message(lead)
            }
        }
    }
}

/// Deterministic reply used whenever generation fails.
pub fn fallback_message(lead: &Lead) -> String {
    format!(
        "Hi {}, just checking in about the {}. Let me know if you have any questions!",
        lead.name, lead.interest
    )
}

fn build_prompt(lead: &Lead, tone_sample: &str, history: &[StoredMessage]) -> String {
    let mut prompt = format!(
        "You are a real estate agent. Example tone:\n\"{tone_sample}\"\n\n\
         Now write a warm, concise follow-up to {} about their interest in {}. \
         Keep it <50 words.",
        lead.name, lead.interest
    );

    let context = format_history(history);
    if !context.is_empty() {
        prompt.push_str("\n\nRecent conversation:\n");
        prompt.push_str(&context);
    }

    prompt
}

/// The last few messages, one per line, labelled by who spoke.
fn format_history(history: &[StoredMessage]) -> String {
    let start = history.len().saturating_sub(CONTEXT_MESSAGES);
    history[start..]
        .iter()
        .map(|entry| {
            let speaker = match entry.direction {
                Direction::Incoming => "Client",
                Direction::Outgoing => "Agent",
            };
            format!("{speaker}: {}", entry.message)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn message(direction: Direction, text: &str) -> StoredMessage {
        StoredMessage {
            timestamp: Utc::now(),
            direction,
            message: text.to_string(),
            message_id: None,
        }
    }

    fn lead() -> Lead {
        Lead {
            name: "Sam Carter".to_string(),
            phone: "+15551234567".to_string(),
            interest: "Downtown Condo".to_string(),
        }
    }

    #[test]
    fn history_is_labelled_by_speaker() {
        let history = vec![
            message(Direction::Outgoing, "Hi Sam!"),
            message(Direction::Incoming, "Tell me more"),
        ];
        assert_eq!(format_history(&history), "Agent: Hi Sam!\nClient: Tell me more");
    }

    #[test]
    fn history_is_capped_at_five_messages() {
        let history: Vec<_> = (0..8)
            .map(|i| message(Direction::Incoming, &format!("msg {i}")))
            .collect();
        let formatted = format_history(&history);
        assert_eq!(formatted.lines().count(), 5);
        assert!(formatted.starts_with("Client: msg 3"));
        assert!(formatted.ends_with("Client: msg 7"));
    }

    #[test]
    fn prompt_without_history_has_no_context_block() {
        let prompt = build_prompt(&lead(), "Hey there.", &[]);
        assert!(prompt.contains("Sam Carter"));
        assert!(prompt.contains("Downtown Condo"));
        assert!(prompt.contains("Hey there."));
        assert!(!prompt.contains("Recent conversation:"));
    }

    #[test]
    fn fallback_references_name_and_interest() {
        let text = fallback_message(&lead());
        assert!(text.contains("Sam Carter"));
        assert!(text.contains("Downtown Condo"));
    }

    #[tokio::test]
    async fn missing_api_key_falls_back() {
        let dir = TempDir::new().unwrap();
        let config = Config::for_tests(dir.path().to_str().unwrap());
        let store = Arc::new(ChatStore::new(dir.path()));
        let writer = FollowupWriter::new(&config, store);

        let text = writer.generate(&lead(), "Hey there.").await;
        assert_eq!(text, fallback_message(&lead()));
    }
}
