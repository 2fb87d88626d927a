//! Configuration module for Super Characters.
//!
//! Provides the [`SettingsStore`] (API keys, voice, hotkey, VAD silence and
//! connector credentials persisted as JSON), the independent
//! [`OnboardingStore`], and [`AppPaths`] for the home-directory file layout.

pub mod onboarding;
pub mod paths;
pub mod settings;

use std::io::Write;
use std::path::Path;

use thiserror::Error;

pub use onboarding::{OnboardingConfig, OnboardingStore};
pub use paths::AppPaths;
pub use settings::{
    Settings, SettingsStore, DEFAULT_PRESS_AND_TALK_HOTKEY, DEFAULT_SILENCE_DURATION_MS,
    MAX_SILENCE_DURATION_MS, MIN_SILENCE_DURATION_MS,
};

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors raised by the settings and onboarding stores.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform could not report the user's home directory.
    #[error("failed to get home directory")]
    HomeDir,

    /// Reading, writing or creating a config file or directory failed.
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The record could not be converted to or from JSON.
    #[error("failed to (de)serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

/// Serialize `value` as pretty JSON and replace `path` with it.
///
/// The bytes go to a sibling `*.tmp` file first and are renamed over the
/// target, so readers never observe a half-written record.  On Unix the file
/// is created with `mode`.
pub(crate) fn write_json<T: serde::Serialize>(
    path: &Path,
    value: &T,
    mode: u32,
) -> Result<(), ConfigError> {
    #[cfg(not(unix))]
    let _ = mode;

    let data = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("json.tmp");
    {
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        let mut file = options.open(&tmp)?;
        file.write_all(&data)?;
        file.sync_all()?;
    }

    // `mode` only applies on creation; tighten a pre-existing temp file too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(mode))?;
    }

    std::fs::rename(&tmp, path)?;
    Ok(())
}
