//! Structured generation against an external language model.
//!
//! Every analysis step talks to the model through [`StructuredModel`]: a
//! natural-language instruction plus a target [`OutputSchema`] in, a JSON
//! value conforming to that schema out. The shipped backend speaks the
//! OpenAI-compatible `/chat/completions` API with `json_schema` response
//! formatting; tests substitute in-memory implementations.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::config::ModelConfig;

// ============================================================================
// StructuredModel trait
// ============================================================================

/// Abstraction over structured-generation providers.
#[async_trait]
pub trait StructuredModel: Send + Sync {
    /// Run `prompt` and return a value shaped like `schema`.
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: OutputSchema,
    ) -> Result<Value, ModelError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Run a structured call and deserialize the result into `T`.
pub async fn generate<T: DeserializeOwned>(
    model: &dyn StructuredModel,
    prompt: &str,
    schema: OutputSchema,
) -> Result<T, ModelError> {
    let value = model.generate_structured(prompt, schema).await?;
    serde_json::from_value(value).map_err(|e| ModelError::SchemaMismatch {
        schema: schema.name(),
        message: e.to_string(),
    })
}

// ============================================================================
// Schemas
// ============================================================================

/// The two output shapes the analysis pipeline asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSchema {
    /// `{ "name": string }`
    Name,
    /// `{ "suggestions": string[] }`
    Suggestions,
}

impl OutputSchema {
    pub fn name(self) -> &'static str {
        match self {
            OutputSchema::Name => "name_response",
            OutputSchema::Suggestions => "suggestions_response",
        }
    }

    pub fn json_schema(self) -> Value {
        match self {
            OutputSchema::Name => json!({
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"],
                "additionalProperties": false
            }),
            OutputSchema::Suggestions => json!({
                "type": "object",
                "properties": {
                    "suggestions": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["suggestions"],
                "additionalProperties": false
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameResponse {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Response does not match {schema}: {message}")]
    SchemaMismatch {
        schema: &'static str,
        message: String,
    },

    #[error("All {attempts} attempts failed, last error: {last}")]
    RetryExhausted { attempts: usize, last: String },

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),
}

// ============================================================================
// Client configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct ModelClientConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl ModelClientConfig {
    pub fn from_config(config: &ModelConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        }
    }
}

/// Create the default backend from configuration.
pub fn create_model(
    config: &ModelConfig,
    api_key: impl Into<String>,
) -> Result<Box<dyn StructuredModel>, ModelError> {
    let client = OpenAiStructuredClient::new(ModelClientConfig::from_config(config, api_key))?;
    Ok(Box::new(client))
}

// ============================================================================
// OpenAI API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiStructuredClient
// ============================================================================

/// Structured-output client for OpenAI-compatible chat completion APIs.
#[derive(Debug, Clone)]
pub struct OpenAiStructuredClient {
    client: Client,
    config: ModelClientConfig,
}

impl OpenAiStructuredClient {
    pub fn new(config: ModelClientConfig) -> Result<Self, ModelError> {
        if config.api_key.trim().is_empty() {
            return Err(ModelError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self { client, config })
    }

    async fn generate_once(&self, prompt: &str, schema: OutputSchema) -> Result<Value, ModelError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: schema.name(),
                    strict: true,
                    schema: schema.json_schema(),
                },
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Model API error");

            return Err(ModelError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let message = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(ModelError::EmptyResponse)?;

        if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
            return Err(ModelError::SchemaMismatch {
                schema: schema.name(),
                message: format!("model refused: {}", refusal),
            });
        }

        let content = message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)?;

        serde_json::from_str(&content).map_err(|e| ModelError::SchemaMismatch {
            schema: schema.name(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl StructuredModel for OpenAiStructuredClient {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: OutputSchema,
    ) -> Result<Value, ModelError> {
        if self.config.max_retries == 0 {
            return self.generate_once(prompt, schema).await;
        }

        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        let result = Retry::spawn(retry_strategy, || self.generate_once(prompt, schema)).await;

        result.map_err(|e| {
            let attempts = self.config.max_retries + 1;
            tracing::error!(attempts, error = %e, "All structured generation attempts failed");
            ModelError::RetryExhausted {
                attempts,
                last: e.to_string(),
            }
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// TimeoutModel
// ============================================================================

/// Wraps another model and bounds every call by `call_timeout`, clipped to
/// whatever remains before `deadline`. Once the deadline has passed every
/// call fails immediately with [`ModelError::Timeout`].
pub struct TimeoutModel {
    inner: Arc<dyn StructuredModel>,
    call_timeout: Duration,
    deadline: Option<Instant>,
}

impl TimeoutModel {
    pub fn new(inner: Arc<dyn StructuredModel>, call_timeout: Duration) -> Self {
        Self {
            inner,
            call_timeout,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn budget(&self) -> Duration {
        match self.deadline {
            Some(deadline) => self
                .call_timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.call_timeout,
        }
    }
}

#[async_trait]
impl StructuredModel for TimeoutModel {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: OutputSchema,
    ) -> Result<Value, ModelError> {
        let budget = self.budget();
        if budget.is_zero() {
            return Err(ModelError::Timeout(budget));
        }

        match tokio::time::timeout(budget, self.inner.generate_structured(prompt, schema)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    model = self.inner.name(),
                    schema = schema.name(),
                    timeout_ms = budget.as_millis() as u64,
                    "Model call timed out"
                );
                Err(ModelError::Timeout(budget))
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

// ============================================================================
// TESTS
// ============================================================================
