//! `SpeechSynthesizer` trait and the ElevenLabs text-to-speech client.
//!
//! One POST per call, 30 s timeout, no streaming: the whole MP3 payload is
//! buffered and returned byte-for-byte.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use crate::api::{self, ApiError, DEFAULT_TIMEOUT};

/// ElevenLabs TTS model.
pub const DEFAULT_TTS_MODEL: &str = "eleven_turbo_v2_5";

/// Default voice (Rachel).
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// ElevenLabs REST endpoint.
pub const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";

const SERVICE: &str = "elevenlabs";

const STABILITY: f64 = 0.5;
const SIMILARITY_BOOST: f64 = 0.75;

// ---------------------------------------------------------------------------
// SpeechSynthesizer trait
// ---------------------------------------------------------------------------

/// Async interface for text-to-speech backends.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Convert `text` to encoded audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ApiError>;

    /// `true` once credentials are present.
    fn is_configured(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
}

// ---------------------------------------------------------------------------
// ElevenLabsClient
// ---------------------------------------------------------------------------

/// Calls `POST {base}/text-to-speech/{voice_id}` with the `xi-api-key`
/// header and returns the MP3 body.
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    client: reqwest::Client,
    api_key: String,
    voice_id: String,
    model: String,
    base_url: String,
}

impl ElevenLabsClient {
    /// Build a client with the default voice, model, endpoint and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: api::http_client(DEFAULT_TIMEOUT),
            api_key: api_key.into(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model: DEFAULT_TTS_MODEL.to_string(),
            base_url: ELEVENLABS_BASE_URL.to_string(),
        }
    }

    /// Use `voice_id`; an empty id keeps the current voice.
    pub fn with_voice_id(mut self, voice_id: &str) -> Self {
        if !voice_id.is_empty() {
            self.voice_id = voice_id.to_string();
        }
        self
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

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ApiError> {
        if self.api_key.is_empty() {
            return Err(ApiError::NotConfigured("elevenlabs API key"));
        }

        let request = SynthesisRequest {
            text,
            model_id: &self.model,
            voice_settings: VoiceSettings {
                stability: STABILITY,
                similarity_boost: SIMILARITY_BOOST,
            },
        };
        let body = serde_json::to_vec(&request).map_err(|e| ApiError::Build(e.to_string()))?;
        let url = format!("{}/text-to-speech/{}", self.base_url, self.voice_id);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .header("xi-api-key", self.api_key.as_str())
            .body(body)
            .send()
            .await?;

        let audio = api::read_body(SERVICE, response, &[StatusCode::OK]).await?;
        log::info!("Synthesized {} bytes of audio", audio.len());
        Ok(audio)
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
