use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use hazfill_core::Extractor;
use hazfill_shared::{HazfillError, LlmConfig, Result};

use crate::{build_client, check_status, endpoint};

/// OpenAI-compatible chat completion over `POST {base_url}/chat/completions`.
pub struct ChatCompletionsExtractor {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
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

impl ChatCompletionsExtractor {
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: endpoint(&config.base_url, "chat/completions")?,
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl Extractor for ChatCompletionsExtractor {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| HazfillError::Network(format!("{}: {e}", self.url)))?;
        let response = check_status(response, &self.url).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| HazfillError::Extraction(format!("malformed completion response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| HazfillError::Extraction("completion has no message content".into()))?;
        debug!(chars = content.len(), "completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn extractor(server: &MockServer) -> ChatCompletionsExtractor {
        let config = LlmConfig {
            base_url: format!("{}/v1", server.uri()),
            ..LlmConfig::default()
        };
        ChatCompletionsExtractor::new(&config, "sk-test").unwrap()
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "Chemical: Nitrogen"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "{\"updates\": []}"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = extractor(&server)
            .complete("sys", "Chemical: Nitrogen")
            .await
            .unwrap();
        assert_eq!(text, r#"{"updates": []}"#);
    }

    #[tokio::test]
    async fn empty_choices_is_extraction_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = extractor(&server).complete("sys", "user").await.unwrap_err();
        assert!(matches!(err, HazfillError::Extraction(_)));
    }

    #[tokio::test]
    async fn null_content_is_extraction_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let err = extractor(&server).complete("sys", "user").await.unwrap_err();
        assert!(matches!(err, HazfillError::Extraction(_)));
    }

    #[tokio::test]
    async fn server_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = extractor(&server).complete("sys", "user").await.unwrap_err();
        assert!(matches!(err, HazfillError::Network(_)));
    }
}
