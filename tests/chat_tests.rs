use async_trait::async_trait;
use inequality_dashboard::chat::{self, CompletionBackend};
use inequality_dashboard::session::{ChatLog, ChatMessage, ChatRole};
use inequality_dashboard::{DashboardError, Result};
use std::sync::Mutex;

/// Records every request and answers with a canned reply.
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

#[async_trait]
impl CompletionBackend for Recorder {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.seen.lock().unwrap().push(messages.to_vec());
        Ok(format!("reply {}", messages.len()))
    }
}

struct Down;

#[async_trait]
impl CompletionBackend for Down {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(DashboardError::ExternalServiceUnavailable(chat::SERVICE_NAME.to_string()))
    }
}

#[tokio::test]
async fn each_turn_sends_summary_history_and_question() {
    let backend = Recorder::default();
    let summary = "Dashboard Insights:\n- Number of countries: 2";
    let mut log = ChatLog::default();

    let first = chat::ask(&backend, summary, &log, "Which country is most unequal?")
        .await
        .unwrap();
    log.push_exchange("Which country is most unequal?".to_string(), first);
    let second = chat::ask(&backend, summary, &log, "  And the least?  ").await.unwrap();
    log.push_exchange("And the least?".to_string(), second);

    let seen = backend.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    let turn = &seen[1];
    assert_eq!(turn.len(), 4);
    assert_eq!(turn[0].role, ChatRole::System);
    assert!(turn[0].content.contains(summary));
    assert_eq!(turn[1], ChatMessage::user("Which country is most unequal?"));
    assert_eq!(turn[2], ChatMessage::assistant("reply 2"));
    assert_eq!(turn[3], ChatMessage::user("And the least?"));
    assert_eq!(log.len(), 4);
}

#[tokio::test]
async fn empty_question_never_reaches_the_backend() {
    let backend = Recorder::default();
    let err = chat::ask(&backend, "s", &ChatLog::default(), "   ").await.unwrap_err();
    assert!(matches!(err, DashboardError::Validation(_)));
    assert!(backend.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn backend_failure_is_reported_as_unavailable() {
    let err = chat::ask(&Down, "s", &ChatLog::default(), "hi").await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "The AI assistant is currently unavailable. Please try again."
    );
}

#[test]
fn system_prompt_embeds_the_summary() {
    let prompt = chat::system_prompt("Dashboard Insights:\n- Average Gini index: 38.2");
    assert!(prompt.contains("- Average Gini index: 38.2"));
    assert!(prompt.contains("This detail is not available in the dashboard."));
}

#[cfg(feature = "web")]
mod openai {
    use super::*;
    use inequality_dashboard::chat::OpenAiClient;
    use inequality_dashboard::settings::OpenAi;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str, api_key: &str) -> OpenAiClient {
        OpenAiClient::new(&OpenAi {
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            model: "test-model".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn posts_the_conversation_and_returns_the_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "messages": [
                    { "role": "system" },
                    { "role": "user", "content": "What is the Gini index?" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "A measure of inequality." } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = client(&server.uri(), "test-key");
        let reply = chat::ask(&backend, "summary", &ChatLog::default(), "What is the Gini index?")
            .await
            .unwrap();
        assert_eq!(reply, "A measure of inequality.");
    }

    #[tokio::test]
    async fn server_errors_become_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let backend = client(&server.uri(), "test-key");
        let err = chat::ask(&backend, "summary", &ChatLog::default(), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::ExternalServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn reply_without_choices_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let backend = client(&format!("{}/", server.uri()), "test-key");
        let err = chat::ask(&backend, "summary", &ChatLog::default(), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::ExternalServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let backend = client(&server.uri(), "");
        let err = chat::ask(&backend, "summary", &ChatLog::default(), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::ExternalServiceUnavailable(_)));
    }
}
