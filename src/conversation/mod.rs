//! Voice conversation loop.
//!
//! ```text
//! user text ─▶ ConversationSession::process_input
//!                 ├─ push user turn, trim to the last N turns
//!                 ├─ ChatClient::chat(history)        (Gemini)
//!                 ├─ push assistant turn
//!                 └─ SpeechSynthesizer::synthesize    (ElevenLabs, optional)
//!                       └─ failure ─▶ text-only reply
//! ```

pub mod session;

pub use session::{ConversationError, ConversationReply, ConversationSession};
