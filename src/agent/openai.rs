//! OpenAI-compatible chat-completions backend

use super::{ChatMessage, ChatModel};
use crate::config::ModelConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::debug;

pub struct OpenAiChatModel {
    client: Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
}

impl OpenAiChatModel {
    pub fn new(base_url: &str, model: &str, api_key: SecretString) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        }
    }

    /// Build from config, reading the API key from `config.api_key_env`
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Config(format!(
                "Environment variable {} not set",
                config.api_key_env
            ))
        })?;
        Ok(Self::new(
            &config.base_url,
            &config.model,
            SecretString::from(api_key),
        ))
    }

    fn request_body(&self, messages: &[ChatMessage], tools: &[Value]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.to_vec());
        }
        body
    }
}

/// Extract the first choice's message from a chat-completions response
fn parse_response(body: Value) -> Result<ChatMessage> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(Error::Model(message));
    }

    let message = body
        .pointer("/choices/0/message")
        .cloned()
        .ok_or_else(|| Error::Model("No choices in model response".to_string()))?;

    serde_json::from_value(message)
        .map_err(|e| Error::Model(format!("Failed to parse model message: {}", e)))
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, messages: &[ChatMessage], tools: &[Value]) -> Result<ChatMessage> {
        debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "Requesting completion"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(messages, tools))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() && body.get("error").is_none() {
            return Err(Error::Model(format!("HTTP {}: {}", status, body)));
        }

        parse_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ToolCall;

    fn model() -> OpenAiChatModel {
        OpenAiChatModel::new(
            "http://localhost:8080/v1/",
            "test-model",
            SecretString::from("sk-test".to_string()),
        )
    }

    #[test]
    fn endpoint_and_body() {
        let model = model();
        assert_eq!(model.endpoint, "http://localhost:8080/v1/chat/completions");

        let body = model.request_body(&[ChatMessage::user("hello")], &[]);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("tools").is_none());

        let tools = vec![json!({ "type": "function", "function": { "name": "x" } })];
        let body = model.request_body(&[], &tools);
        assert_eq!(body["tools"][0]["function"]["name"], "x");
    }

    #[test]
    fn parses_tool_call_reply() {
        let reply = parse_response(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": { "name": "get_wallet_details", "arguments": "{}" }
                    }]
                }
            }]
        }))
        .unwrap();

        assert_eq!(
            reply,
            ChatMessage::Assistant {
                content: None,
                tool_calls: vec![ToolCall::new("call_abc", "get_wallet_details", &json!({}))],
            }
        );
    }

    #[test]
    fn surfaces_backend_errors() {
        let err = parse_response(json!({ "error": { "message": "invalid api key" } })).unwrap_err();
        assert!(err.to_string().contains("invalid api key"));

        assert!(parse_response(json!({ "choices": [] })).is_err());
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = ModelConfig {
            api_key_env: "LIQUIDITY_AGENT_TEST_MISSING_KEY".to_string(),
            ..ModelConfig::default()
        };
        assert!(OpenAiChatModel::from_config(&config).is_err());
    }
}
