//! Chat module for Super Characters.
//!
//! This module provides:
//! * [`ChatMessage`] / [`Role`]: role-tagged conversation messages.
//! * [`ChatClient`]: async trait implemented by chat backends.
//! * [`GeminiClient`]: Gemini `generateContent` client.
//! * [`ConversationHistory`]: caller-owned history with a turn cap.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use super_characters::llm::{ChatClient, ConversationHistory, GeminiClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = GeminiClient::new("AIza...");
//!     let mut history = ConversationHistory::default();
//!
//!     history.push_user("What's the capital of France?");
//!     let reply = client.chat(&history.messages()).await.unwrap();
//!     history.push_assistant(reply.clone());
//!     println!("{reply}");
//! }
//! ```

pub mod gemini;
pub mod history;
pub mod message;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use gemini::{
    ChatClient, Content, GeminiClient, GenerateContentRequest, GenerationConfig, Part,
    DEFAULT_CHAT_MODEL, GEMINI_BASE_URL,
};
pub use history::{ConversationHistory, CONVERSATION_SYSTEM_PROMPT, MAX_CONVERSATION_TURNS};
pub use message::{ChatMessage, Role};
