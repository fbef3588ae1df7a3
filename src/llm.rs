//! Model-invocation capability.
//!
//! The pipeline talks to a [`LanguageModel`] trait object and stays unaware
//! of transport details. Retry and per-session history live here, never in
//! the pipeline: a failed stage is terminal for the question, while a failed
//! HTTP call may be retried up to the session's `max_retries`.

use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};

/// Per-call session options supplied by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Log/trace label for the session.
    pub name: String,
    /// Number of prior question/answer turns retained for this session.
    pub history_length: usize,
    /// Automatic retry count on transport failure.
    pub max_retries: u32,
    pub logging_enabled: bool,
}

impl SessionConfig {
    /// Session used for the table-selection call.
    pub fn selector() -> Self {
        Self {
            name: "table_selector".to_string(),
            history_length: 3,
            max_retries: 2,
            logging_enabled: true,
        }
    }

    /// Session used for the code-generation call.
    pub fn codegen() -> Self {
        Self {
            name: "logicgen".to_string(),
            history_length: 5,
            max_retries: 3,
            logging_enabled: true,
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one prompt and return the model's raw text response.
    async fn invoke(&self, session: &SessionConfig, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
struct ChatTurn {
    prompt: String,
    response: String,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
    history: Mutex<HashMap<String, Vec<ChatTurn>>>,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        Self {
            api_key,
            base_url,
            model: "gpt-4".to_string(),
            client: reqwest::Client::new(),
            history: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_messages(&self, session: &SessionConfig, prompt: &str) -> Vec<serde_json::Value> {
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": "You are a precise assistant for survey data analysis. Follow the output format in the prompt exactly."
        })];
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(turns) = history.get(&session.name) {
            for turn in tail(turns, session.history_length) {
                messages.push(serde_json::json!({"role": "user", "content": turn.prompt}));
                messages.push(serde_json::json!({"role": "assistant", "content": turn.response}));
            }
        }
        messages.push(serde_json::json!({"role": "user", "content": prompt}));
        messages
    }

    fn record_turn(&self, session: &SessionConfig, prompt: &str, response: &str) {
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let turns = history.entry(session.name.clone()).or_default();
        turns.push(ChatTurn {
            prompt: prompt.to_string(),
            response: response.to_string(),
        });
        let excess = turns.len().saturating_sub(session.history_length);
        if excess > 0 {
            turns.drain(..excess);
        }
    }

    async fn chat(&self, messages: &[serde_json::Value]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.1,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Llm(format!("LLM API call failed: {}", e)))?;

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AssistantError::Llm("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn invoke(&self, session: &SessionConfig, prompt: &str) -> Result<String> {
        let messages = self.build_messages(session, prompt);

        let mut last_err = None;
        for attempt in 0..=session.max_retries {
            if attempt > 0 && session.logging_enabled {
                warn!("[{}] retrying LLM call (attempt {})", session.name, attempt + 1);
            }
            match self.chat(&messages).await {
                Ok(text) => {
                    if session.logging_enabled {
                        info!("[{}] LLM returned {} chars", session.name, text.len());
                    }
                    self.record_turn(session, prompt, &text);
                    return Ok(text);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err
            .unwrap_or_else(|| AssistantError::Llm("LLM call made no attempts".to_string())))
    }
}

fn tail<T>(items: &[T], keep: usize) -> &[T] {
    &items[items.len().saturating_sub(keep)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_session_matches_configured_options() {
        let session = SessionConfig::selector();
        assert_eq!(session.name, "table_selector");
        assert_eq!(session.history_length, 3);
        assert_eq!(session.max_retries, 2);
        assert!(session.logging_enabled);
    }

    #[test]
    fn tail_keeps_most_recent_items() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(tail(&items, 2), &[4, 5]);
        assert_eq!(tail(&items, 10), &[1, 2, 3, 4, 5]);
        assert_eq!(tail(&items, 0), &[] as &[i32]);
    }

    #[test]
    fn recorded_turns_are_trimmed_to_history_length() {
        let client = OpenAiClient::new("key".to_string());
        let session = SessionConfig {
            name: "t".to_string(),
            history_length: 2,
            max_retries: 0,
            logging_enabled: false,
        };
        for i in 0..5 {
            client.record_turn(&session, &format!("q{}", i), &format!("a{}", i));
        }
        let messages = client.build_messages(&session, "next");
        // system + 2 retained turns (2 messages each) + the new prompt
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[1]["content"], "q3");
        assert_eq!(messages[3]["content"], "q4");
    }
}
