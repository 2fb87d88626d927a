//! Dedicated OS-thread hotkey listener using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`HotkeyListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Setting the stop flag
//! prevents events from being forwarded, but the OS thread itself will remain
//! blocked in the rdev event loop until the process exits.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use super::{ComboTracker, Hotkey, HotkeyError, HotkeyEvent, HotkeyMode, ModeHandler};

// ---------------------------------------------------------------------------
// HotkeyListener
// ---------------------------------------------------------------------------

/// Handle to a running hotkey listener thread.
///
/// Construct one with [`HotkeyListener::start`].  Drop it to stop forwarding
/// events.
pub struct HotkeyListener {
    /// Shared stop flag, set `true` on [`Drop`].
    stop: Arc<AtomicBool>,
    /// Never joined: `rdev::listen` does not return.
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn a dedicated OS thread that watches for `hotkey` and forwards
    /// [`HotkeyEvent::Start`] / [`HotkeyEvent::Stop`] on `tx` according to
    /// `mode`.
    ///
    /// The thread uses `blocking_send`, so `tx` may belong to any runtime.
    pub fn start(
        hotkey: Hotkey,
        mode: HotkeyMode,
        tx: mpsc::Sender<HotkeyEvent>,
    ) -> Result<Self, HotkeyError> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        log::info!("Listening for {hotkey} ({mode:?})");

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let mut combo = ComboTracker::new(hotkey);
                let mut handler = ModeHandler::new(mode);

                let result = rdev::listen(move |event| {
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }

                    let transition = match event.event_type {
                        rdev::EventType::KeyPress(k) => combo.press(k),
                        rdev::EventType::KeyRelease(k) => combo.release(k),
                        _ => None,
                    };

                    if let Some(action) = transition.and_then(|t| handler.handle(t)) {
                        log::debug!("hotkey-listener: {action:?}");
                        if tx.blocking_send(action).is_err() {
                            // Receiver gone; nothing left to notify.
                            stop_clone.store(true, Ordering::Relaxed);
                        }
                    }
                });

                if let Err(e) = result {
                    log::error!("hotkey-listener: rdev::listen exited with error: {:?}", e);
                }
            })?;

        Ok(Self {
            stop,
            _thread: thread,
        })
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
