//! `ChatClient` trait and the Gemini `generateContent` implementation.
//!
//! The client is stateless: callers own the message history and resupply it
//! on every call.  System-role messages become the request's
//! `systemInstruction` (the last one wins); user and assistant messages keep
//! their order in `contents`, with `assistant` renamed to Gemini's `model`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::api::{self, ApiError, DEFAULT_TIMEOUT};
use crate::llm::message::{ChatMessage, Role};

/// Gemini model used for conversation.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash";

/// Gemini REST endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const SERVICE: &str = "gemini";

// Generation parameters are fixed for spoken replies.
const MAX_OUTPUT_TOKENS: u32 = 256;
const TEMPERATURE: f64 = 0.7;
const TOP_P: f64 = 0.9;

// ---------------------------------------------------------------------------
// ChatClient trait
// ---------------------------------------------------------------------------

/// Async interface for chat-completion backends.
///
/// Implementors must be `Send + Sync` so they can be shared behind
/// `Arc<dyn ChatClient>`.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send the full conversation and return the model's reply text.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ApiError>;

    /// `true` once credentials are present.
    fn is_configured(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Body of `POST /models/{model}:generateContent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// Calls Gemini's `generateContent` endpoint with the API key as a query
/// parameter.
///
/// ```rust,no_run
/// use super_characters::llm::{ChatClient, ChatMessage, GeminiClient};
///
/// # async fn example() {
/// let client = GeminiClient::new("AIza...");
/// let reply = client
///     .chat(&[ChatMessage::user("Hello!")])
///     .await
///     .unwrap();
/// println!("{reply}");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Build a client with the default model, endpoint and 30 s timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: api::http_client(DEFAULT_TIMEOUT),
            api_key: api_key.into(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at another endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Translate a role-tagged conversation into Gemini's request schema.
    pub fn build_request(messages: &[ChatMessage]) -> GenerateContentRequest {
        let mut system_instruction = None;
        let mut contents = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg.role {
                // Gemini has no system role; the instruction travels as "user".
                Role::System => system_instruction = Some(Content::text("user", &msg.content)),
                Role::User => contents.push(Content::text("user", &msg.content)),
                Role::Assistant => contents.push(Content::text("model", &msg.content)),
            }
        }

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                temperature: TEMPERATURE,
                top_p: TOP_P,
            },
        }
    }
}

#[async_trait]
impl ChatClient for GeminiClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ApiError> {
        if self.api_key.is_empty() {
            return Err(ApiError::NotConfigured("gemini API key"));
        }

        let body = serde_json::to_vec(&Self::build_request(messages))
            .map_err(|e| ApiError::Build(e.to_string()))?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let parsed: GenerateContentResponse =
            api::read_json(SERVICE, response, &[StatusCode::OK]).await?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(ApiError::EmptyResult(SERVICE))?;

        log::debug!("Gemini replied with {} chars", text.len());
        Ok(text)
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
