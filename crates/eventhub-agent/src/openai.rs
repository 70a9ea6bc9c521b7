use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

/// OpenAI-compatible chat-completions client (non-streaming).
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = build_request_body(req);
        let url = format!("{}/v1/chat/completions", self.base_url);

        debug!(model = %req.model, "sending request to OpenAI");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ProviderError::Connect(e.to_string())
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|s| s * 1000) // seconds to ms
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry,
            });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "OpenAI API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(parse_response(api_resp))
    }
}

fn build_request_body(req: &ChatRequest) -> serde_json::Value {
    // flat messages array; the system prompt goes first
    let mut messages = vec![serde_json::json!({
        "role": "system",
        "content": req.system,
    })];

    for m in &req.messages {
        messages.push(serde_json::json!({
            "role": m.role,
            "content": m.content,
        }));
    }

    serde_json::json!({
        "model": req.model,
        "messages": messages,
        "max_tokens": req.max_tokens,
        "temperature": req.temperature,
    })
}

fn parse_response(resp: ApiResponse) -> ChatResponse {
    let choice = resp.choices.into_iter().next();
    let content = choice
        .as_ref()
        .and_then(|c| c.message.content.as_deref())
        .unwrap_or("")
        .to_string();
    let stop_reason = choice.and_then(|c| c.finish_reason).unwrap_or_default();

    ChatResponse {
        content,
        model: resp.model,
        tokens_in: resp.usage.as_ref().map(|u| u.prompt_tokens).unwrap_or(0),
        tokens_out: resp.usage.as_ref().map(|u| u.completion_tokens).unwrap_or(0),
        stop_reason,
    }
}

// response types (deserialization only)

#[derive(Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ApiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatMessage, Role};

    #[test]
    fn system_prompt_is_prepended() {
        let req = ChatRequest {
            model: "gpt-3.5-turbo".into(),
            system: "be brief".into(),
            messages: vec![
                ChatMessage::user("hi"),
                ChatMessage { role: Role::Assistant, content: "hello".into() },
            ],
            max_tokens: 300,
            temperature: 0.8,
        };
        let body = build_request_body(&req);
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[2]["role"], "assistant");
        assert_eq!(body["max_tokens"], 300);
        assert!((body["temperature"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn parses_first_choice() {
        let raw = r#"{
            "model": "gpt-3.5-turbo-0125",
            "choices": [{"message": {"content": "Try the meetup"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4}
        }"#;
        let resp = parse_response(serde_json::from_str(raw).unwrap());
        assert_eq!(resp.content, "Try the meetup");
        assert_eq!(resp.stop_reason, "stop");
        assert_eq!(resp.tokens_in, 12);
    }

    #[test]
    fn empty_choices_yield_empty_content() {
        let raw = r#"{"model": "m", "choices": []}"#;
        let resp = parse_response(serde_json::from_str(raw).unwrap());
        assert!(resp.content.is_empty());
        assert_eq!(resp.tokens_out, 0);
    }
}
