//! Super Characters: backend for a voice-driven virtual character assistant.
//!
//! * [`config`] persists settings and the onboarding flag under `~`.
//! * [`llm`] talks to Gemini; [`tts`] to ElevenLabs.
//! * [`conversation`] chains the two for one spoken turn.
//! * [`permissions`] reports OS permission state and gates onboarding.
//! * [`hotkey`] listens for the global press-and-talk combo.
//! * [`connect`] reaches third-party accounts through Pipedream Connect.

pub mod api;
pub mod config;
pub mod connect;
pub mod conversation;
pub mod hotkey;
pub mod llm;
pub mod permissions;
pub mod tts;

pub use api::ApiError;
