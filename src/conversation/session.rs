//! One voice conversation: history, chat turn, speech.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::api::ApiError;
use crate::llm::{ChatClient, ConversationHistory, CONVERSATION_SYSTEM_PROMPT};
use crate::tts::SpeechSynthesizer;

/// Speaking rate used to estimate playback length.
const WORDS_PER_MINUTE: f64 = 150.0;
const CHARS_PER_WORD: f64 = 5.0;

// ---------------------------------------------------------------------------
// ConversationError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConversationError {
    /// `process_input` was called before `start` (or after `stop`).
    #[error("conversation is not active")]
    Inactive,

    /// The chat backend failed; the user turn stays in history.
    #[error("chat failed: {0}")]
    Chat(#[from] ApiError),
}

// ---------------------------------------------------------------------------
// ConversationReply
// ---------------------------------------------------------------------------

/// The assistant's answer to one user utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationReply {
    pub text: String,
    /// MP3 audio, absent when speech is unconfigured or synthesis failed.
    pub audio: Option<Vec<u8>>,
}

impl ConversationReply {
    /// Rough playback length of `audio`, at least one second.
    ///
    /// `None` for text-only replies.
    pub fn estimated_duration(&self) -> Option<Duration> {
        self.audio.as_ref()?;
        let words = self.text.chars().count() as f64 / CHARS_PER_WORD;
        let secs = (words / WORDS_PER_MINUTE * 60.0) as u64;
        Some(Duration::from_secs(secs.max(1)))
    }
}

// ---------------------------------------------------------------------------
// ConversationSession
// ---------------------------------------------------------------------------

/// Drives chat-then-speech turns over a capped history.
pub struct ConversationSession {
    chat: Arc<dyn ChatClient>,
    tts: Option<Arc<dyn SpeechSynthesizer>>,
    system_prompt: String,
    history: ConversationHistory,
    active: bool,
}

impl ConversationSession {
    pub fn new(chat: Arc<dyn ChatClient>, tts: Option<Arc<dyn SpeechSynthesizer>>) -> Self {
        Self {
            chat,
            tts,
            system_prompt: CONVERSATION_SYSTEM_PROMPT.to_string(),
            history: ConversationHistory::default(),
            active: false,
        }
    }

    /// Use `prompt` instead of the default voice-assistant prompt from the
    /// next [`start`](Self::start).
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Begin a fresh conversation seeded with the system prompt.
    pub fn start(&mut self) {
        self.history = ConversationHistory::new(self.system_prompt.clone());
        self.active = true;
        log::info!("Conversation started");
    }

    /// End the conversation and drop its history.
    pub fn stop(&mut self) {
        self.active = false;
        self.history.clear();
        log::info!("Conversation stopped");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Run one turn for the user's `text`.
    ///
    /// Blank input is ignored (`Ok(None)`).  A speech failure degrades to a
    /// text-only reply; a chat failure is returned as an error.
    pub async fn process_input(
        &mut self,
        text: &str,
    ) -> Result<Option<ConversationReply>, ConversationError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if !self.active {
            return Err(ConversationError::Inactive);
        }

        log::info!("Processing user input ({} chars)", text.len());
        self.history.push_user(text);

        let response = self.chat.chat(&self.history.messages()).await?;
        self.history.push_assistant(response.clone());

        let audio = self.speak(&response).await;
        log::info!("Reply ready (audio: {})", audio.is_some());

        Ok(Some(ConversationReply {
            text: response,
            audio,
        }))
    }

    async fn speak(&self, text: &str) -> Option<Vec<u8>> {
        let tts = match &self.tts {
            Some(tts) if tts.is_configured() => tts,
            _ => {
                log::info!("Speech synthesis not configured; replying with text only");
                return None;
            }
        };

        match tts.synthesize(text).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                log::warn!("Speech synthesis failed (falling back to text-only): {e}");
                None
            }
        }
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("active", &self.active)
            .field("turns", &self.history.len())
            .field("tts", &self.tts.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, Role};
    use async_trait::async_trait;
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Echoes the last user message and records every request it saw.
    #[derive(Default)]
    struct EchoChat {
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatClient for EchoChat {
        async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ApiError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("echo: {last}"))
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    struct FailChat;

    #[async_trait]
    impl ChatClient for FailChat {
        async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, ApiError> {
            Err(ApiError::Timeout)
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    struct FixedTts(Result<Vec<u8>, u16>);

    #[async_trait]
    impl SpeechSynthesizer for FixedTts {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, ApiError> {
            self.0.clone().map_err(|status| ApiError::Remote {
                service: "elevenlabs",
                status,
                body: "nope".into(),
            })
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    struct UnconfiguredTts;

    #[async_trait]
    impl SpeechSynthesizer for UnconfiguredTts {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, ApiError> {
            panic!("must not be called when unconfigured");
        }

        fn is_configured(&self) -> bool {
            false
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn inactive_session_rejects_input() {
        let mut session = ConversationSession::new(Arc::new(EchoChat::default()), None);
        let err = session.process_input("hello").await.unwrap_err();
        assert!(matches!(err, ConversationError::Inactive));
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let chat = Arc::new(EchoChat::default());
        let mut session = ConversationSession::new(chat.clone(), None);
        assert!(session.process_input("").await.unwrap().is_none());

        session.start();
        assert!(session.process_input("   ").await.unwrap().is_none());
        assert!(chat.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn turn_sends_history_and_speaks_reply() {
        let chat = Arc::new(EchoChat::default());
        let tts = Arc::new(FixedTts(Ok(vec![0xFF, 0xFB])));
        let mut session = ConversationSession::new(chat.clone(), Some(tts));
        session.start();

        let reply = session.process_input("hi").await.unwrap().unwrap();
        assert_eq!(reply.text, "echo: hi");
        assert_eq!(reply.audio, Some(vec![0xFF, 0xFB]));

        session.process_input("again").await.unwrap();
        let seen = chat.seen.lock().unwrap();
        let roles: Vec<Role> = seen[1].iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(seen[1][0].content, CONVERSATION_SYSTEM_PROMPT);
        assert_eq!(seen[1][2].content, "echo: hi");
    }

    #[tokio::test]
    async fn speech_failure_falls_back_to_text() {
        let tts = Arc::new(FixedTts(Err(401)));
        let mut session = ConversationSession::new(Arc::new(EchoChat::default()), Some(tts));
        session.start();

        let reply = session.process_input("hi").await.unwrap().unwrap();
        assert_eq!(reply.text, "echo: hi");
        assert_eq!(reply.audio, None);
        assert_eq!(reply.estimated_duration(), None);
    }

    #[tokio::test]
    async fn unconfigured_speech_is_skipped() {
        let mut session =
            ConversationSession::new(Arc::new(EchoChat::default()), Some(Arc::new(UnconfiguredTts)));
        session.start();
        let reply = session.process_input("hi").await.unwrap().unwrap();
        assert!(reply.audio.is_none());
    }

    #[tokio::test]
    async fn chat_failure_keeps_user_turn() {
        let mut session = ConversationSession::new(Arc::new(FailChat), None);
        session.start();

        let err = session.process_input("hello").await.unwrap_err();
        assert!(matches!(err, ConversationError::Chat(ApiError::Timeout)));
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn stop_clears_history() {
        let mut session =
            ConversationSession::new(Arc::new(EchoChat::default()), None).with_system_prompt("S");
        session.start();
        session.process_input("hi").await.unwrap();
        assert_eq!(session.history().len(), 2);

        session.stop();
        assert!(!session.is_active());
        assert!(session.history().is_empty());

        session.start();
        assert_eq!(session.history().messages(), vec![ChatMessage::system("S")]);
    }

    #[test]
    fn duration_estimate_has_one_second_floor() {
        let short = ConversationReply {
            text: "Hi".into(),
            audio: Some(vec![1]),
        };
        assert_eq!(short.estimated_duration(), Some(Duration::from_secs(1)));

        // 1500 chars = 300 words = two minutes at 150 wpm.
        let long = ConversationReply {
            text: "a".repeat(1500),
            audio: Some(vec![1]),
        };
        assert_eq!(long.estimated_duration(), Some(Duration::from_secs(120)));
    }
}
