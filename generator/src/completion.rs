use std::time::Duration;

use async_trait::async_trait;
use common::{
    env_config::CompletionConfig,
    error::{AppError, Res},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One call to the text generation provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    /// JSON schema the provider must follow; plain text when absent.
    pub schema: Option<ResponseSchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub schema: Value,
}

impl CompletionRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        CompletionRequest {
            system: None,
            prompt: prompt.into(),
            schema: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_schema(mut self, name: &'static str, schema: Value) -> Self {
        self.schema = Some(ResponseSchema { name, schema });
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Transport(String),

    #[error("Completion request timed out")]
    Timeout,

    #[error("Completion provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Completion provider returned no content")]
    Empty,
}

impl CompletionError {
    /// Transport failures, timeouts, rate limiting and server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Transport(_) | CompletionError::Timeout => true,
            CompletionError::Status { status, .. } => *status == 429 || *status >= 500,
            CompletionError::Empty => false,
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout
        } else {
            CompletionError::Transport(e.to_string())
        }
    }
}

impl From<CompletionError> for AppError {
    fn from(e: CompletionError) -> Self {
        AppError::Service(e.to_string())
    }
}

/// Text generation provider, injected wherever a prompt has to be completed.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client of an OpenAI-compatible chat completions endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(config: &CompletionConfig) -> Res<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(AppError::from)?;

        Ok(OpenAiClient {
            http,
            endpoint: format!("{}/chat/completions", config.api_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let response_format = request.schema.as_ref().map(|schema| {
            json!({
                "type": "json_schema",
                "json_schema": { "name": schema.name, "schema": schema.schema }
            })
        });

        ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Completion provider returned {}: {}", status, body);
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::Empty)
    }
}

/// Retries retryable failures of the wrapped client with exponential backoff.
pub struct RetryingClient<C> {
    inner: C,
    max_attempts: u32,
    backoff: Duration,
}

impl<C: CompletionClient> RetryingClient<C> {
    pub fn new(inner: C, max_attempts: u32, backoff: Duration) -> Self {
        RetryingClient {
            inner,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(inner: C, config: &CompletionConfig) -> Self {
        Self::new(
            inner,
            config.max_attempts,
            Duration::from_millis(config.backoff_ms),
        )
    }
}

#[async_trait]
impl<C: CompletionClient> CompletionClient for RetryingClient<C> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let mut attempt = 1;
        loop {
            match self.inner.complete(request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt - 1);
                    log::warn!(
                        "Completion attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;

    /// Replays queued outcomes, then succeeds.
    struct Scripted {
        failures: Mutex<Vec<CompletionError>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(failures: Vec<CompletionError>) -> Self {
            Scripted {
                failures: Mutex::new(failures),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for Scripted {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.failures.lock().unwrap().pop();
            match next {
                Some(e) => Err(e),
                None => Ok("MEAL PLAN:\nGROCERY LIST:".to_string()),
            }
        }
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let client = RetryingClient::new(
            Scripted::new(vec![
                CompletionError::Timeout,
                CompletionError::Status {
                    status: 503,
                    body: String::new(),
                },
            ]),
            3,
            Duration::from_millis(1),
        );
        let text = client.complete(&CompletionRequest::text("hi")).await.unwrap();
        assert!(text.starts_with("MEAL PLAN:"));
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let client = RetryingClient::new(
            Scripted::new(vec![
                CompletionError::Transport("reset".into()),
                CompletionError::Transport("reset".into()),
            ]),
            2,
            Duration::from_millis(1),
        );
        let err = client.complete(&CompletionRequest::text("hi")).await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let client = RetryingClient::new(
            Scripted::new(vec![CompletionError::Status {
                status: 401,
                body: "bad key".into(),
            }]),
            3,
            Duration::from_millis(1),
        );
        assert!(client.complete(&CompletionRequest::text("hi")).await.is_err());
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn service_errors_hide_provider_details() {
        let err: AppError = CompletionError::Status {
            status: 500,
            body: "stack trace".into(),
        }
        .into();
        assert!(matches!(err, AppError::Service(_)));
        assert_eq!(err.user_message(), common::error::SERVICE_FAILURE_MESSAGE);
    }

    #[test]
    fn schema_requests_ask_for_json_output() {
        let client = OpenAiClient::new(&CompletionConfig::default()).unwrap();
        let request = CompletionRequest::text("plan")
            .with_system("be brief")
            .with_schema("meal_plan", json!({"type": "object"}));
        let body = serde_json::to_value(client.body(&request)).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "plan");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "meal_plan");

        let plain = serde_json::to_value(client.body(&CompletionRequest::text("plan"))).unwrap();
        assert!(plain.get("response_format").is_none());
    }
}
