//! Global press-and-talk hotkey, backed by `rdev`.
//!
//! # Design
//!
//! `rdev::listen()` is a blocking OS-level call that never returns while the
//! process is alive.  It must run on a **dedicated OS thread**; it cannot be
//! used inside a tokio task.
//!
//! Inside that thread every key event goes through two small state machines:
//!
//! 1. [`ComboTracker`] turns raw presses/releases into "combo fully held" and
//!    "combo let go" transitions, swallowing OS auto-repeat.
//! 2. [`ModeHandler`] turns those transitions into [`HotkeyEvent::Start`] /
//!    [`HotkeyEvent::Stop`] according to the [`HotkeyMode`].
//!
//! # Usage
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use super_characters::hotkey::{Hotkey, HotkeyListener, HotkeyMode};
//!
//! let (tx, mut rx) = mpsc::channel(16);
//! let hotkey = Hotkey::parse("Ctrl+Shift+Space").expect("valid hotkey");
//! let _listener = HotkeyListener::start(hotkey, HotkeyMode::HoldToTalk, tx);
//!
//! // In your async loop:
//! // while let Some(ev) = rx.recv().await { ... }
//! ```

pub mod combo;
pub mod listener;
pub mod mode;

use std::fmt;

use rdev::Key;
use thiserror::Error;

pub use combo::{ComboTracker, ComboTransition};
pub use listener::HotkeyListener;
pub use mode::{HotkeyMode, ModeHandler};

// ---------------------------------------------------------------------------
// HotkeyEvent
// ---------------------------------------------------------------------------

/// Events emitted by the hotkey listener thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// Begin listening to the user.
    Start,
    /// Stop listening and process what was heard.
    Stop,
}

// ---------------------------------------------------------------------------
// HotkeyError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error("hotkey is empty")]
    Empty,

    #[error("unknown key '{0}' in hotkey")]
    UnknownKey(String),

    #[error("hotkey has more than one non-modifier key ('{0}' and '{1}')")]
    MultipleKeys(String, String),

    #[error("failed to spawn hotkey listener thread: {0}")]
    Spawn(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Key names
// ---------------------------------------------------------------------------

/// Canonical key names, in the form [`Hotkey`]'s `Display` renders them.
const KEY_NAMES: &[(&str, Key)] = &[
    ("Space", Key::Space),
    ("Escape", Key::Escape),
    ("Return", Key::Return),
    ("Tab", Key::Tab),
    ("Backspace", Key::Backspace),
    ("Delete", Key::Delete),
    ("Home", Key::Home),
    ("End", Key::End),
    ("PageUp", Key::PageUp),
    ("PageDown", Key::PageDown),
    ("UpArrow", Key::UpArrow),
    ("DownArrow", Key::DownArrow),
    ("LeftArrow", Key::LeftArrow),
    ("RightArrow", Key::RightArrow),
    ("CapsLock", Key::CapsLock),
    ("NumLock", Key::NumLock),
    ("ScrollLock", Key::ScrollLock),
    ("PrintScreen", Key::PrintScreen),
    ("Pause", Key::Pause),
    ("F1", Key::F1),
    ("F2", Key::F2),
    ("F3", Key::F3),
    ("F4", Key::F4),
    ("F5", Key::F5),
    ("F6", Key::F6),
    ("F7", Key::F7),
    ("F8", Key::F8),
    ("F9", Key::F9),
    ("F10", Key::F10),
    ("F11", Key::F11),
    ("F12", Key::F12),
    ("A", Key::KeyA),
    ("B", Key::KeyB),
    ("C", Key::KeyC),
    ("D", Key::KeyD),
    ("E", Key::KeyE),
    ("F", Key::KeyF),
    ("G", Key::KeyG),
    ("H", Key::KeyH),
    ("I", Key::KeyI),
    ("J", Key::KeyJ),
    ("K", Key::KeyK),
    ("L", Key::KeyL),
    ("M", Key::KeyM),
    ("N", Key::KeyN),
    ("O", Key::KeyO),
    ("P", Key::KeyP),
    ("Q", Key::KeyQ),
    ("R", Key::KeyR),
    ("S", Key::KeyS),
    ("T", Key::KeyT),
    ("U", Key::KeyU),
    ("V", Key::KeyV),
    ("W", Key::KeyW),
    ("X", Key::KeyX),
    ("Y", Key::KeyY),
    ("Z", Key::KeyZ),
    ("0", Key::Num0),
    ("1", Key::Num1),
    ("2", Key::Num2),
    ("3", Key::Num3),
    ("4", Key::Num4),
    ("5", Key::Num5),
    ("6", Key::Num6),
    ("7", Key::Num7),
    ("8", Key::Num8),
    ("9", Key::Num9),
];

/// Alternative spellings accepted by [`parse_key`].
const KEY_ALIASES: &[(&str, Key)] = &[
    ("Esc", Key::Escape),
    ("Enter", Key::Return),
    ("Del", Key::Delete),
    ("Up", Key::UpArrow),
    ("Down", Key::DownArrow),
    ("Left", Key::LeftArrow),
    ("Right", Key::RightArrow),
];

/// Parse a single (non-modifier) key name into an [`rdev::Key`].
///
/// Supports F1–F12, common named keys, ASCII letters and digits.  Matching
/// is case-insensitive.  Returns `None` for unrecognised names.
///
/// # Examples
///
/// ```
/// use super_characters::hotkey::parse_key;
///
/// assert_eq!(parse_key("F9"),      Some(rdev::Key::F9));
/// assert_eq!(parse_key("space"),   Some(rdev::Key::Space));
/// assert_eq!(parse_key("a"),       Some(rdev::Key::KeyA));
/// assert_eq!(parse_key("xyz"),     None);
/// ```
pub fn parse_key(key_str: &str) -> Option<Key> {
    KEY_NAMES
        .iter()
        .chain(KEY_ALIASES)
        .find(|(name, _)| name.eq_ignore_ascii_case(key_str))
        .map(|(_, key)| *key)
}

/// Canonical name of a key [`parse_key`] understands.
pub fn key_name(key: Key) -> Option<&'static str> {
    KEY_NAMES
        .iter()
        .find(|(_, k)| *k == key)
        .map(|(name, _)| *name)
}

// ---------------------------------------------------------------------------
// Hotkey
// ---------------------------------------------------------------------------

/// A key combination such as `Ctrl+Shift+Space`.
///
/// Modifier-only combinations (`Ctrl+Shift`) are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hotkey {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// Command on macOS, the Windows/Super key elsewhere.
    pub meta: bool,
    pub key: Option<Key>,
}

impl Hotkey {
    /// Parse a `+`-separated combination.
    ///
    /// ```
    /// use super_characters::hotkey::Hotkey;
    ///
    /// let hk = Hotkey::parse("shift+CTRL+space").unwrap();
    /// assert!(hk.ctrl && hk.shift);
    /// assert_eq!(hk.to_string(), "Ctrl+Shift+Space");
    /// ```
    pub fn parse(input: &str) -> Result<Self, HotkeyError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(HotkeyError::Empty);
        }

        let mut hotkey = Hotkey::default();
        let mut key_token: Option<&str> = None;

        for token in input.split('+').map(str::trim) {
            match token.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => hotkey.ctrl = true,
                "shift" => hotkey.shift = true,
                "alt" | "option" => hotkey.alt = true,
                "cmd" | "command" | "meta" | "super" => hotkey.meta = true,
                _ => {
                    let key =
                        parse_key(token).ok_or_else(|| HotkeyError::UnknownKey(token.to_string()))?;
                    if let Some(previous) = key_token {
                        return Err(HotkeyError::MultipleKeys(
                            previous.to_string(),
                            token.to_string(),
                        ));
                    }
                    key_token = Some(token);
                    hotkey.key = Some(key);
                }
            }
        }

        Ok(hotkey)
    }

    pub fn has_modifiers(&self) -> bool {
        self.ctrl || self.shift || self.alt || self.meta
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::with_capacity(5);
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.meta {
            parts.push("Cmd");
        }
        if let Some(key) = self.key {
            parts.push(key_name(key).unwrap_or("?"));
        }
        f.write_str(&parts.join("+"))
    }
}

impl std::str::FromStr for Hotkey {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PRESS_AND_TALK_HOTKEY;

    #[test]
    fn parse_function_keys() {
        assert_eq!(parse_key("F9"), Some(Key::F9));
        assert_eq!(parse_key("F1"), Some(Key::F1));
        assert_eq!(parse_key("f12"), Some(Key::F12));
    }

    #[test]
    fn parse_named_keys_and_aliases() {
        assert_eq!(parse_key("Escape"), Some(Key::Escape));
        assert_eq!(parse_key("Esc"), Some(Key::Escape));
        assert_eq!(parse_key("SPACE"), Some(Key::Space));
        assert_eq!(parse_key("Enter"), Some(Key::Return));
        assert_eq!(parse_key("7"), Some(Key::Num7));
    }

    #[test]
    fn parse_unknown_key_returns_none() {
        assert_eq!(parse_key("xyz"), None);
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("Ctrl+V"), None);
    }

    #[test]
    fn default_hotkey_parses() {
        let hk = Hotkey::parse(DEFAULT_PRESS_AND_TALK_HOTKEY).unwrap();
        assert_eq!(
            hk,
            Hotkey {
                ctrl: true,
                shift: true,
                alt: false,
                meta: false,
                key: Some(Key::Space),
            }
        );
        assert_eq!(hk.to_string(), DEFAULT_PRESS_AND_TALK_HOTKEY);
    }

    #[test]
    fn modifier_aliases_and_canonical_order() {
        let hk = Hotkey::parse("Command + option + x").unwrap();
        assert!(hk.meta && hk.alt && !hk.ctrl && !hk.shift);
        assert_eq!(hk.to_string(), "Alt+Cmd+X");
    }

    #[test]
    fn modifier_only_combo_is_allowed() {
        let hk = Hotkey::parse("Ctrl+Shift").unwrap();
        assert_eq!(hk.key, None);
        assert!(hk.has_modifiers());
        assert_eq!(hk.to_string(), "Ctrl+Shift");
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(Hotkey::parse("   "), Err(HotkeyError::Empty)));
        assert!(matches!(
            Hotkey::parse("Ctrl+Banana"),
            Err(HotkeyError::UnknownKey(k)) if k == "Banana"
        ));
        assert!(matches!(Hotkey::parse("Ctrl++"), Err(HotkeyError::UnknownKey(_))));
        assert!(matches!(
            Hotkey::parse("A+B"),
            Err(HotkeyError::MultipleKeys(a, b)) if a == "A" && b == "B"
        ));
    }

    #[test]
    fn every_canonical_name_round_trips() {
        for (name, key) in KEY_NAMES {
            assert_eq!(parse_key(name), Some(*key), "{name}");
            assert_eq!(key_name(*key), Some(*name));
        }
    }
}
