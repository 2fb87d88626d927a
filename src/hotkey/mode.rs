//! Hold-to-talk vs. toggle behaviour.

use serde::{Deserialize, Serialize};

use super::{ComboTransition, HotkeyEvent};

/// How the press-and-talk hotkey starts and stops listening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotkeyMode {
    /// Listen while the combo is held.
    #[default]
    HoldToTalk,
    /// Each press flips between listening and idle.
    Toggle,
}

/// Converts combo edges into [`HotkeyEvent`]s for the active mode.
#[derive(Debug, Clone, Default)]
pub struct ModeHandler {
    mode: HotkeyMode,
    active: bool,
}

impl ModeHandler {
    pub fn new(mode: HotkeyMode) -> Self {
        Self {
            mode,
            active: false,
        }
    }

    pub fn mode(&self) -> HotkeyMode {
        self.mode
    }

    /// Switch modes; any session in progress is forgotten.
    pub fn set_mode(&mut self, mode: HotkeyMode) {
        self.mode = mode;
        self.active = false;
    }

    /// `true` between a `Start` and its matching `Stop`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn handle(&mut self, transition: ComboTransition) -> Option<HotkeyEvent> {
        match transition {
            ComboTransition::Pressed => self.on_pressed(),
            ComboTransition::Released => self.on_released(),
        }
    }

    pub fn on_pressed(&mut self) -> Option<HotkeyEvent> {
        match self.mode {
            HotkeyMode::HoldToTalk => {
                if self.active {
                    return None;
                }
                self.active = true;
                Some(HotkeyEvent::Start)
            }
            HotkeyMode::Toggle => {
                self.active = !self.active;
                Some(if self.active {
                    HotkeyEvent::Start
                } else {
                    HotkeyEvent::Stop
                })
            }
        }
    }

    pub fn on_released(&mut self) -> Option<HotkeyEvent> {
        match self.mode {
            HotkeyMode::HoldToTalk if self.active => {
                self.active = false;
                Some(HotkeyEvent::Stop)
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.active = false;
    }
}
