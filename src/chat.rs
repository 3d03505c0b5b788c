//! The dashboard chatbot.
//!
//! Every turn sends the system instruction, the whole conversation so far
//! and the new question to the completion backend. The exchange is added to
//! the session's log only once the backend has answered.

use async_trait::async_trait;

use crate::error::{DashboardError, Result};
use crate::session::{ChatLog, ChatMessage};

/// Name used in user-facing errors.
pub const SERVICE_NAME: &str = "The AI assistant";

/// Anything that can turn a message list into an assistant reply.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// System instruction that pins the model to the dataset summary.
pub fn system_prompt(dashboard_summary: &str) -> String {
    format!(
        r#"
You are a helpful assistant trained ONLY to answer questions about:
1. Global income inequality analysis
2. The dashboard provided in this web app.

Rules:
- ALWAYS use the provided dashboard summary for numbers, years, or metrics.
- NEVER invent values or guess. If something is not in the summary, say:
  "This detail is not available in the dashboard."
- If a user asks unrelated questions, reply:
  "I can only answer questions about global income inequality or the dashboard insights."

Dashboard summary:
{}
"#,
        dashboard_summary
    )
}

/// Full request for one turn: system message, history, then the question.
pub fn build_messages(dashboard_summary: &str, history: &ChatLog, question: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt(dashboard_summary)));
    messages.extend(history.messages().iter().cloned());
    messages.push(ChatMessage::user(question));
    messages
}

/// Asks one question. Returns the reply without touching `history`.
pub async fn ask(
    backend: &dyn CompletionBackend,
    dashboard_summary: &str,
    history: &ChatLog,
    question: &str,
) -> Result<String> {
    let question = question.trim();
    if question.is_empty() {
        return Err(DashboardError::Validation("Please type a question first.".to_string()));
    }
    let messages = build_messages(dashboard_summary, history, question);
    backend.complete(&messages).await
}

#[cfg(feature = "web")]
pub use openai::OpenAiClient;

#[cfg(feature = "web")]
mod openai {
    use async_trait::async_trait;
    use log::warn;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    use super::{CompletionBackend, SERVICE_NAME};
    use crate::error::{DashboardError, Result};
    use crate::session::ChatMessage;
    use crate::settings::OpenAi;

    #[derive(Serialize)]
    struct CompletionRequest<'a> {
        model: &'a str,
        messages: &'a [ChatMessage],
    }

    #[derive(Deserialize)]
    struct CompletionResponse {
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: ReplyMessage,
    }

    #[derive(Deserialize)]
    struct ReplyMessage {
        content: Option<String>,
    }

    /// Client for an OpenAI-compatible `/chat/completions` endpoint.
    pub struct OpenAiClient {
        http: reqwest::Client,
        base_url: String,
        api_key: String,
        model: String,
    }

    impl OpenAiClient {
        pub fn new(settings: &OpenAi) -> Result<Self> {
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(settings.timeout_secs))
                .build()
                .map_err(Self::unavailable)?;
            Ok(OpenAiClient {
                http,
                base_url: settings.base_url.trim_end_matches('/').to_string(),
                api_key: settings.api_key.clone(),
                model: settings.model.clone(),
            })
        }

        fn unavailable<E: std::fmt::Display>(reason: E) -> DashboardError {
            warn!("completion request failed: {}", reason);
            DashboardError::ExternalServiceUnavailable(SERVICE_NAME.to_string())
        }
    }

    #[async_trait]
    impl CompletionBackend for OpenAiClient {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            if self.api_key.is_empty() {
                return Err(Self::unavailable("no API key configured"));
            }
            let response = self
                .http
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&CompletionRequest {
                    model: &self.model,
                    messages,
                })
                .send()
                .await
                .map_err(Self::unavailable)?;

            if !response.status().is_success() {
                return Err(Self::unavailable(format!("status {}", response.status())));
            }

            let body: CompletionResponse = response.json().await.map_err(Self::unavailable)?;
            body.choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| Self::unavailable("response had no content"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_system_history_question() {
        let mut log = ChatLog::default();
        log.push_exchange("q1".into(), "a1".into());
        let messages = build_messages("Dashboard Insights:\n- x", &log, "q2");
        assert_eq!(messages.len(), 4);
        assert!(messages[0].content.contains("- x"));
        assert_eq!(messages[1], ChatMessage::user("q1"));
        assert_eq!(messages[2], ChatMessage::assistant("a1"));
        assert_eq!(messages[3], ChatMessage::user("q2"));
    }
}
