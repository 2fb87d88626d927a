//! Tracks whether a [`Hotkey`] combination is currently held.

use rdev::Key;

use super::Hotkey;

/// Edge reported by [`ComboTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboTransition {
    /// Every part of the combo is now held.
    Pressed,
    /// A part of a previously held combo was released.
    Released,
}

// Bit per physical modifier key so left/right are tracked independently.
const CTRL_LEFT: u8 = 1 << 0;
const CTRL_RIGHT: u8 = 1 << 1;
const SHIFT_LEFT: u8 = 1 << 2;
const SHIFT_RIGHT: u8 = 1 << 3;
const ALT: u8 = 1 << 4;
const ALT_GR: u8 = 1 << 5;
const META_LEFT: u8 = 1 << 6;
const META_RIGHT: u8 = 1 << 7;

const CTRL: u8 = CTRL_LEFT | CTRL_RIGHT;
const SHIFT: u8 = SHIFT_LEFT | SHIFT_RIGHT;
const ANY_ALT: u8 = ALT | ALT_GR;
const META: u8 = META_LEFT | META_RIGHT;

fn modifier_bit(key: Key) -> Option<u8> {
    match key {
        Key::ControlLeft => Some(CTRL_LEFT),
        Key::ControlRight => Some(CTRL_RIGHT),
        Key::ShiftLeft => Some(SHIFT_LEFT),
        Key::ShiftRight => Some(SHIFT_RIGHT),
        Key::Alt => Some(ALT),
        Key::AltGr => Some(ALT_GR),
        Key::MetaLeft => Some(META_LEFT),
        Key::MetaRight => Some(META_RIGHT),
        _ => None,
    }
}

/// Feeds on raw key presses and releases and reports combo edges.
///
/// Extra keys held alongside the combo do not prevent it from firing.
/// Auto-repeat presses while the combo is held report nothing.
#[derive(Debug, Clone)]
pub struct ComboTracker {
    hotkey: Hotkey,
    modifiers: u8,
    key_down: bool,
    active: bool,
}

impl ComboTracker {
    pub fn new(hotkey: Hotkey) -> Self {
        Self {
            hotkey,
            modifiers: 0,
            key_down: false,
            active: false,
        }
    }

    pub fn hotkey(&self) -> &Hotkey {
        &self.hotkey
    }

    /// `true` while the whole combo is held.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn press(&mut self, key: Key) -> Option<ComboTransition> {
        self.set(key, true);
        self.transition()
    }

    pub fn release(&mut self, key: Key) -> Option<ComboTransition> {
        self.set(key, false);
        self.transition()
    }

    /// Forget all held keys, e.g. after the listener lost focus.
    pub fn reset(&mut self) {
        self.modifiers = 0;
        self.key_down = false;
        self.active = false;
    }

    fn set(&mut self, key: Key, down: bool) {
        if let Some(bit) = modifier_bit(key) {
            if down {
                self.modifiers |= bit;
            } else {
                self.modifiers &= !bit;
            }
        }
        if self.hotkey.key == Some(key) {
            self.key_down = down;
        }
    }

    fn held(&self) -> bool {
        let hk = &self.hotkey;
        let mods_ok = (!hk.ctrl || self.modifiers & CTRL != 0)
            && (!hk.shift || self.modifiers & SHIFT != 0)
            && (!hk.alt || self.modifiers & ANY_ALT != 0)
            && (!hk.meta || self.modifiers & META != 0);
        let key_ok = hk.key.is_none() || self.key_down;
        mods_ok && key_ok && (hk.key.is_some() || hk.has_modifiers())
    }

    fn transition(&mut self) -> Option<ComboTransition> {
        match (self.active, self.held()) {
            (false, true) => {
                self.active = true;
                Some(ComboTransition::Pressed)
            }
            (true, false) => {
                self.active = false;
                Some(ComboTransition::Released)
            }
            _ => None,
        }
    }
}
