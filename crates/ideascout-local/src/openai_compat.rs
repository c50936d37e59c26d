use crate::env_any;
use ideascout_core::{ChatMessage, CompletionProvider, Error, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Error codes that mean "back off", independent of the HTTP status.
const QUOTA_CODES: [&str; 2] = ["insufficient_quota", "rate_limit_exceeded"];

fn openai_base_url_from_env() -> Option<String> {
    env_any(&["IDEASCOUT_OPENAI_BASE_URL"])
}

fn openai_api_key_from_env() -> Option<String> {
    env_any(&["IDEASCOUT_OPENAI_API_KEY", "OPENAI_API_KEY"])
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Hosted OpenAI needs a key; a custom base URL (local gateway, test fake) may not.
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let base_url = openai_base_url_from_env();
        let api_key = openai_api_key_from_env();
        if base_url.is_none() && api_key.is_none() {
            return Err(Error::NotConfigured(
                "missing IDEASCOUT_OPENAI_API_KEY (or OPENAI_API_KEY)".to_string(),
            ));
        }
        Ok(Self::new(
            client,
            base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            api_key,
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_chat_completions(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiCompatClient {
    fn name(&self) -> &'static str {
        "openai_compat"
    }

    async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<String> {
        let req = ChatCompletionsRequest {
            model,
            messages,
            stream: Some(false),
        };

        let mut rb = self
            .client
            .post(self.endpoint_chat_completions())
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let resp = rb
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let parsed: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

fn classify_failure(status: reqwest::StatusCode, body: &str) -> Error {
    let code = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.code.or(e.error.kind));
    let msg = match &code {
        Some(c) => format!("openai_compat chat.completions HTTP {status} ({c})"),
        None => format!("openai_compat chat.completions HTTP {status}"),
    };
    let quota_code = code
        .as_deref()
        .is_some_and(|c| QUOTA_CODES.contains(&c));
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || quota_code {
        Error::RateLimited(msg)
    } else {
        Error::Llm(msg)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn insufficient_quota_is_rate_limited_even_without_429() {
        let body = r#"{ "error": { "message": "quota", "type": "insufficient_quota", "code": "insufficient_quota" } }"#;
        let e = classify_failure(StatusCode::FORBIDDEN, body);
        assert!(matches!(e, Error::RateLimited(_)), "got {e:?}");
    }

    #[test]
    fn plain_429_is_rate_limited() {
        let e = classify_failure(StatusCode::TOO_MANY_REQUESTS, "not json");
        assert!(matches!(e, Error::RateLimited(_)), "got {e:?}");
    }

    #[test]
    fn other_failures_are_llm_errors() {
        let body = r#"{ "error": { "code": "invalid_api_key" } }"#;
        let e = classify_failure(StatusCode::UNAUTHORIZED, body);
        assert!(matches!(e, Error::Llm(ref m) if m.contains("invalid_api_key")), "got {e:?}");
    }

    #[test]
    fn request_serializes_roles_in_lowercase() {
        let msgs = [ChatMessage::system("s"), ChatMessage::user("u")];
        let v = serde_json::to_value(ChatCompletionsRequest {
            model: "gpt-4o-mini",
            messages: &msgs,
            stream: None,
        })
        .unwrap();
        assert_eq!(
            v,
            json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "s" },
                    { "role": "user", "content": "u" }
                ]
            })
        );
    }

    #[tokio::test]
    async fn complete_returns_first_choice_content() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                let last = body["messages"][1]["content"].as_str().unwrap_or("").to_string();
                Json(json!({
                    "choices": [ { "message": { "role": "assistant", "content": format!("echo: {last}") } } ]
                }))
            }),
        );
        let addr = serve(app).await;
        let c = OpenAiCompatClient::new(reqwest::Client::new(), &format!("http://{addr}/"), None);
        let out = c
            .complete(&[ChatMessage::system("s"), ChatMessage::user("hello")], "m")
            .await
            .unwrap();
        assert_eq!(out, "echo: hello");
    }

    #[tokio::test]
    async fn missing_choices_yield_empty_content() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({ "choices": [] })) }),
        );
        let addr = serve(app).await;
        let c = OpenAiCompatClient::new(reqwest::Client::new(), &format!("http://{addr}"), None);
        let out = c.complete(&[ChatMessage::user("x")], "m").await.unwrap();
        assert_eq!(out, "");
    }
}
