//! One-time onboarding flag, stored apart from the settings record.
//!
//! `~/.supercharacters/config.json` holds `{"onboarding_complete": bool}`.
//! The file is re-read on every query so an external reset is picked up
//! without restarting; a missing or malformed file reads as "not complete".

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::{write_json, AppPaths, ConfigError};

const ONBOARDING_FILE_MODE: u32 = 0o644;

/// On-disk shape of the onboarding file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingConfig {
    #[serde(default)]
    pub onboarding_complete: bool,
}

/// Persisted onboarding-complete flag guarded by its own lock.
#[derive(Debug)]
pub struct OnboardingStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl OnboardingStore {
    /// Open the store at `~/.supercharacters/config.json`.
    pub fn open() -> Result<Self, ConfigError> {
        Self::open_at(AppPaths::new()?.onboarding_file)
    }

    /// Open the store backed by an explicit file, creating its directory.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the user has finished onboarding.
    pub fn is_complete(&self) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let Ok(data) = std::fs::read(&self.path) else {
            return false;
        };
        match serde_json::from_slice::<OnboardingConfig>(&data) {
            Ok(config) => config.onboarding_complete,
            Err(e) => {
                log::debug!("Onboarding file {} unreadable: {e}", self.path.display());
                false
            }
        }
    }

    /// Mark onboarding as finished.
    pub fn complete(&self) -> Result<(), ConfigError> {
        self.store(true)
    }

    /// Clear the flag so onboarding runs again on next startup.
    pub fn reset(&self) -> Result<(), ConfigError> {
        self.store(false)
    }

    fn store(&self, onboarding_complete: bool) -> Result<(), ConfigError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        write_json(
            &self.path,
            &OnboardingConfig {
                onboarding_complete,
            },
            ONBOARDING_FILE_MODE,
        )
    }
}
