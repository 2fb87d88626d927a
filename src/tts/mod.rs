//! Speech synthesis module.
//!
//! [`SpeechSynthesizer`] is the seam the conversation session talks to;
//! [`ElevenLabsClient`] is the production implementation.
//!
//! ```rust,no_run
//! use super_characters::tts::{ElevenLabsClient, SpeechSynthesizer};
//!
//! # async fn example() {
//! let tts = ElevenLabsClient::new("xi-...").with_voice_id("21m00Tcm4TlvDq8ikWAM");
//! let mp3 = tts.synthesize("Hello!").await.unwrap();
//! std::fs::write("hello.mp3", mp3).unwrap();
//! # }
//! ```

pub mod elevenlabs;

pub use elevenlabs::{
    ElevenLabsClient, SpeechSynthesizer, DEFAULT_TTS_MODEL, DEFAULT_VOICE_ID, ELEVENLABS_BASE_URL,
};
