//! Minimal OpenAI Chat Completions API client.
//!
//! This crate provides a focused client for the chat completions endpoint
//! with:
//! - Non-streaming completions
//! - JSON mode (`response_format: json_object`)
//! - A bounded retry policy with exponential backoff for transient failures

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Errors that can occur when using the client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether a retry could plausibly succeed.
    fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Retry policy for transient API failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff delay before retry number `retry` (1-based).
    fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// OpenAI chat completions client.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl Client {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Create a client from the OPENAI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| Error::NoApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the retry policy for transient failures.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send a completion request, retrying transient failures per the
    /// configured policy, and return the assistant's text content.
    pub async fn complete(&self, request: Request) -> Result<Completion, Error> {
        let mut last_err = None;

        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry.delay_for(attempt - 1)).await;
            }

            match self.complete_once(&request).await {
                Ok(completion) => return Ok(completion),
                Err(err) if err.is_transient() && attempt < self.retry.max_attempts => {
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Network("retries exhausted".to_string())))
    }

    async fn complete_once(&self, request: &Request) -> Result<Completion, Error> {
        let api_request = self.build_api_request(request);
        let headers = self.build_headers()?;

        let response = self
            .http
            .post(format!("{API_BASE}/chat/completions"))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        parse_completion(api_response)
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }

    fn build_api_request(&self, request: &Request) -> ApiRequest {
        ApiRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages: request.messages.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: if request.json_mode {
                Some(ResponseFormat {
                    r#type: "json_object".to_string(),
                })
            } else {
                None
            },
        }
    }
}

fn parse_completion(api_response: ApiResponse) -> Result<Completion, Error> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Parse("response contained no choices".to_string()))?;

    Ok(Completion {
        id: api_response.id,
        model: api_response.model,
        content: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
        usage: api_response.usage.unwrap_or_default(),
    })
}

// ============================================================================
// Public types
// ============================================================================

/// A completion request.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub json_mode: bool,
}

impl Request {
    /// Create a new request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            messages,
            max_tokens: None,
            temperature: None,
            json_mode: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Force the model to emit a single JSON object.
    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A parsed completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub id: String,
    pub model: String,
    /// The assistant's text content.
    pub content: String,
    pub finish_reason: String,
    pub usage: Usage,
}

/// Token usage for a completion.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = Request::new(vec![Message::user("hello")])
            .with_model("gpt-4o")
            .with_max_tokens(600)
            .with_temperature(0.9)
            .with_json_mode();

        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.max_tokens, Some(600));
        assert!(request.json_mode);
    }

    #[test]
    fn test_message_roles_serialize_lowercase() {
        let json = serde_json::to_string(&Message::system("rules")).unwrap();
        assert!(json.contains(r#""role":"system""#));

        let json = serde_json::to_string(&Message::assistant("ok")).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
    }

    #[test]
    fn test_parse_completion() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [
                {"message": {"role": "assistant", "content": "{\"narrative\": \"hi\"}"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7}
        }"#;

        let api: ApiResponse = serde_json::from_str(raw).unwrap();
        let completion = parse_completion(api).unwrap();

        assert_eq!(completion.content, "{\"narrative\": \"hi\"}");
        assert_eq!(completion.finish_reason, "stop");
        assert_eq!(completion.usage.prompt_tokens, 12);
    }

    #[test]
    fn test_parse_completion_no_choices() {
        let raw = r#"{"id": "x", "model": "m", "choices": []}"#;
        let api: ApiResponse = serde_json::from_str(raw).unwrap();
        assert!(parse_completion(api).is_err());
    }

    #[test]
    fn test_transient_errors() {
        assert!(Error::Network("reset".to_string()).is_transient());
        assert!(Error::Api {
            status: 429,
            message: String::new()
        }
        .is_transient());
        assert!(Error::Api {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!Error::Api {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!Error::NoApiKey.is_transient());
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }
}
