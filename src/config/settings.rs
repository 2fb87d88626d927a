//! Settings record, defaults and JSON persistence.
//!
//! [`SettingsStore`] owns the one in-memory copy of [`Settings`] behind a
//! single `RwLock`.  Every setter is a synchronous read-modify-write-persist
//! unit: take the write lock, change one field, release, then rewrite the
//! whole record on disk.
//!
//! Defaults are applied when *reading* (`press_and_talk_hotkey`,
//! `silence_duration_ms`, `pipedream_environment`), never when writing, so an
//! empty stored value stays empty in `settings.json`.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Deserializer, Serialize};

use super::{write_json, AppPaths, ConfigError};
use crate::connect::{ConnectConfig, ConnectEnvironment};

/// Hotkey returned when none is stored.
pub const DEFAULT_PRESS_AND_TALK_HOTKEY: &str = "Ctrl+Shift+Space";

/// VAD silence duration returned when none is stored.
pub const DEFAULT_SILENCE_DURATION_MS: u32 = 300;
/// Lower clamp bound for [`SettingsStore::set_silence_duration_ms`].
pub const MIN_SILENCE_DURATION_MS: u32 = 100;
/// Upper clamp bound for [`SettingsStore::set_silence_duration_ms`].
pub const MAX_SILENCE_DURATION_MS: u32 = 1000;

/// `settings.json` is private to the owner: it holds API keys.
const SETTINGS_FILE_MODE: u32 = 0o600;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Flat application settings record, serialised as `settings.json`.
///
/// Keys are camelCase on disk.  Missing keys load as empty / zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Chat (Gemini) API key.
    pub gemini_api_key: String,
    /// Speech synthesis (ElevenLabs) API key.
    pub eleven_labs_api_key: String,
    /// Speech synthesis voice; empty means the client's default voice.
    pub eleven_labs_voice_id: String,
    /// Press-and-talk hotkey, e.g. `"Ctrl+Shift+Space"`.
    pub press_and_talk_hotkey: String,
    /// Silence that ends an utterance in continuous listening; `<= 0` = unset.
    ///
    /// Older files may hold any number here, so loading never rejects it.
    #[serde(deserialize_with = "lenient_millis")]
    pub silence_duration_ms: i64,

    /// Connector platform OAuth client id.
    pub pipedream_client_id: String,
    /// Connector platform OAuth client secret.
    pub pipedream_client_secret: String,
    /// Connector platform project id.
    pub pipedream_project_id: String,
    /// `"development"` or `"production"`; empty = unset.
    pub pipedream_environment: String,
}

// ---------------------------------------------------------------------------
// SettingsStore
// ---------------------------------------------------------------------------

/// Owner of the settings record and its backing file.
///
/// Construct it once at startup and pass it by reference to whatever needs
/// it.
///
/// ```rust,no_run
/// use super_characters::config::SettingsStore;
///
/// let store = SettingsStore::open().unwrap();
/// store.set_silence_duration_ms(5_000).unwrap();
/// assert_eq!(store.silence_duration_ms(), 1_000);
/// ```
#[derive(Debug)]
pub struct SettingsStore {
    settings: RwLock<Settings>,
    path: PathBuf,
    /// Serialises snapshot + write so the newest snapshot always lands last.
    persist: Mutex<()>,
}

impl SettingsStore {
    /// Open the store at `~/.super-characters/settings.json`.
    pub fn open() -> Result<Self, ConfigError> {
        Self::open_at(AppPaths::new()?.settings_file)
    }

    /// Open the store backed by an explicit file.
    ///
    /// The parent directory is created if needed.  A missing file means a
    /// first run and yields defaults.  Any other load failure (unreadable
    /// file, malformed JSON) is logged and also yields defaults.
    ///
    /// # Errors
    ///
    /// Only fails when the parent directory cannot be created.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let settings = match load_from(&path) {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                log::warn!(
                    "Failed to load settings from {} ({e}); using defaults",
                    path.display()
                );
                Settings::default()
            }
        };
        log::debug!("Settings store opened at {}", path.display());

        Ok(Self {
            settings: RwLock::new(settings),
            path,
            persist: Mutex::new(()),
        })
    }

    /// Path of the backing `settings.json`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the backing file with the full in-memory record.
    pub fn save(&self) -> Result<(), ConfigError> {
        let _guard = self.persist.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.read().clone();
        write_json(&self.path, &snapshot, SETTINGS_FILE_MODE)
    }

    /// A copy of the current record.
    pub fn settings(&self) -> Settings {
        self.read().clone()
    }

    /// Replace the whole record and persist it.
    pub fn update_settings(&self, settings: Settings) -> Result<(), ConfigError> {
        self.update(|s| *s = settings)
    }

    // -----------------------------------------------------------------------
    // API keys / voice
    // -----------------------------------------------------------------------

    pub fn set_gemini_api_key(&self, key: &str) -> Result<(), ConfigError> {
        self.update(|s| s.gemini_api_key = key.to_string())
    }

    pub fn set_elevenlabs_api_key(&self, key: &str) -> Result<(), ConfigError> {
        self.update(|s| s.eleven_labs_api_key = key.to_string())
    }

    pub fn set_elevenlabs_voice_id(&self, voice_id: &str) -> Result<(), ConfigError> {
        self.update(|s| s.eleven_labs_voice_id = voice_id.to_string())
    }

    // -----------------------------------------------------------------------
    // Hotkey / VAD
    // -----------------------------------------------------------------------

    pub fn set_press_and_talk_hotkey(&self, hotkey: &str) -> Result<(), ConfigError> {
        self.update(|s| s.press_and_talk_hotkey = hotkey.to_string())
    }

    /// Stored hotkey, or [`DEFAULT_PRESS_AND_TALK_HOTKEY`] when empty.
    pub fn press_and_talk_hotkey(&self) -> String {
        let settings = self.read();
        if settings.press_and_talk_hotkey.is_empty() {
            DEFAULT_PRESS_AND_TALK_HOTKEY.to_string()
        } else {
            settings.press_and_talk_hotkey.clone()
        }
    }

    /// Store `duration_ms` clamped to
    /// [`MIN_SILENCE_DURATION_MS`]..=[`MAX_SILENCE_DURATION_MS`].
    pub fn set_silence_duration_ms(&self, duration_ms: i64) -> Result<(), ConfigError> {
        let clamped = duration_ms.clamp(
            i64::from(MIN_SILENCE_DURATION_MS),
            i64::from(MAX_SILENCE_DURATION_MS),
        );
        self.update(|s| s.silence_duration_ms = clamped)
    }

    /// Stored silence duration, or [`DEFAULT_SILENCE_DURATION_MS`] when unset
    /// or not positive.
    pub fn silence_duration_ms(&self) -> u32 {
        match self.read().silence_duration_ms {
            ms if ms <= 0 => DEFAULT_SILENCE_DURATION_MS,
            ms => u32::try_from(ms).unwrap_or(u32::MAX),
        }
    }

    // -----------------------------------------------------------------------
    // Connector platform
    // -----------------------------------------------------------------------

    pub fn set_pipedream_client_id(&self, client_id: &str) -> Result<(), ConfigError> {
        self.update(|s| s.pipedream_client_id = client_id.to_string())
    }

    pub fn set_pipedream_client_secret(&self, client_secret: &str) -> Result<(), ConfigError> {
        self.update(|s| s.pipedream_client_secret = client_secret.to_string())
    }

    pub fn set_pipedream_project_id(&self, project_id: &str) -> Result<(), ConfigError> {
        self.update(|s| s.pipedream_project_id = project_id.to_string())
    }

    /// Store the environment; anything other than `development` or
    /// `production` is stored as `development`.
    pub fn set_pipedream_environment(&self, environment: &str) -> Result<(), ConfigError> {
        let environment = ConnectEnvironment::parse_lossy(environment);
        self.update(|s| s.pipedream_environment = environment.as_str().to_string())
    }

    /// Stored environment, or development when empty or unrecognised.
    pub fn pipedream_environment(&self) -> ConnectEnvironment {
        ConnectEnvironment::parse_lossy(&self.read().pipedream_environment)
    }

    /// `true` iff client id, client secret and project id are all non-empty.
    pub fn is_pipedream_configured(&self) -> bool {
        let s = self.read();
        !s.pipedream_client_id.is_empty()
            && !s.pipedream_client_secret.is_empty()
            && !s.pipedream_project_id.is_empty()
    }

    /// Connector credentials as a client configuration.
    pub fn connect_config(&self) -> ConnectConfig {
        let s = self.read();
        ConnectConfig {
            client_id: s.pipedream_client_id.clone(),
            client_secret: s.pipedream_client_secret.clone(),
            project_id: s.pipedream_project_id.clone(),
            environment: ConnectEnvironment::parse_lossy(&s.pipedream_environment),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn update(&self, mutate: impl FnOnce(&mut Settings)) -> Result<(), ConfigError> {
        mutate(&mut *self.write());
        self.save()
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Any JSON number, saturated into `i64`; anything else reads as unset.
fn lenient_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    let millis = match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        other => {
            log::warn!("Ignoring non-numeric silenceDurationMs {other}");
            0
        }
    };
    Ok(millis)
}

/// `Ok(None)` when the file does not exist yet.
fn load_from(path: &Path) -> Result<Option<Settings>, ConfigError> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&data)?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
