//! Chat completion adapter

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::Turn;
use crate::{Error, Result};

/// Capability boundary around an external text-generation service
///
/// A reply is a pure function of the full history: the adapter keeps no
/// memory across calls, so the conversation store alone reproduces any
/// exchange.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce a reply to the given ordered history
    ///
    /// # Errors
    ///
    /// Returns [`Error::Answer`] when the service is unavailable
    async fn answer(&self, history: &[Turn]) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Generates answers via the OpenAI chat completions API
#[derive(Debug)]
pub struct ChatCompletions {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: Option<u32>,
}

impl ChatCompletions {
    /// Create a new chat completion adapter
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String, max_tokens: Option<u32>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for chat completions".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            max_tokens,
        })
    }
}

#[async_trait]
impl Responder for ChatCompletions {
    async fn answer(&self, history: &[Turn]) -> Result<String> {
        if history.is_empty() {
            return Err(Error::Answer("empty conversation history".to_string()));
        }

        let request = ChatRequest {
            model: &self.model,
            messages: history,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(turns = history.len(), model = %self.model, "requesting answer");

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat request failed");
                Error::Answer(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::Answer(format!("chat API error {status}: {body}")));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Answer(e.to_string()))?;

        let reply = result
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| Error::Answer("empty completion".to_string()))?;

        tracing::info!(reply_len = reply.len(), "answer received");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Turn;

    #[test]
    fn request_serializes_history_as_chat_messages() {
        let history = vec![
            Turn::system("You are a farming consultant."),
            Turn::user("When should I plant wheat?"),
        ];
        let request = ChatRequest {
            model: "gpt-4o",
            messages: &history,
            max_tokens: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "When should I plant wheat?");
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = ChatCompletions::new(String::new(), "gpt-4o".to_string(), None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
