//! Permission and onboarding gate.
//!
//! Super Characters needs two OS permissions: accessibility (global hotkey
//! and input monitoring) and microphone.  Their state is read from the OS on
//! every query and never cached.  Requests and "open settings" actions are
//! fire-and-forget; callers re-query [`PermissionGate::state`] to observe
//! the outcome of a system dialog.
//!
//! The onboarding-complete flag is persisted separately by
//! [`OnboardingStore`] and decides whether the UI shows onboarding at
//! startup.

#[cfg(not(target_os = "macos"))]
mod desktop;
#[cfg(target_os = "macos")]
mod macos;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, OnboardingStore};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A permission the app depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Accessibility,
    Microphone,
}

impl PermissionKind {
    pub const ALL: [PermissionKind; 2] = [PermissionKind::Accessibility, PermissionKind::Microphone];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accessibility => "accessibility",
            Self::Microphone => "microphone",
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accessibility" => Ok(Self::Accessibility),
            "microphone" | "mic" => Ok(Self::Microphone),
            other => Err(format!(
                "unknown permission '{other}' (expected accessibility or microphone)"
            )),
        }
    }
}

/// OS authorisation state of one permission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    #[default]
    Unknown,
    Granted,
    Denied,
    NotAsked,
    Restricted,
}

impl PermissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::NotAsked => "not_asked",
            Self::Restricted => "restricted",
        }
    }

    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of every permission, taken on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsState {
    pub accessibility: PermissionStatus,
    pub microphone: PermissionStatus,
}

impl PermissionsState {
    pub fn all_granted(&self) -> bool {
        self.accessibility.is_granted() && self.microphone.is_granted()
    }
}

// ---------------------------------------------------------------------------
// PermissionProvider
// ---------------------------------------------------------------------------

/// Platform binding to the OS permission APIs.
pub trait PermissionProvider: Send + Sync {
    /// Current OS state for `kind`.
    fn status(&self, kind: PermissionKind) -> PermissionStatus;

    /// Trigger the OS request flow for `kind`; returns immediately.
    fn request(&self, kind: PermissionKind);

    /// Open the system settings pane for `kind`.
    fn open_settings(&self, kind: PermissionKind);
}

/// The provider for the platform this binary was built for.
pub fn platform_provider() -> Box<dyn PermissionProvider> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacPermissionProvider)
    }
    #[cfg(not(target_os = "macos"))]
    {
        Box::new(desktop::DesktopPermissionProvider)
    }
}

// ---------------------------------------------------------------------------
// PermissionGate
// ---------------------------------------------------------------------------

/// Startup gate combining live permission state with the onboarding flag.
pub struct PermissionGate {
    provider: Box<dyn PermissionProvider>,
    onboarding: OnboardingStore,
}

impl PermissionGate {
    pub fn new(provider: Box<dyn PermissionProvider>, onboarding: OnboardingStore) -> Self {
        Self {
            provider,
            onboarding,
        }
    }

    /// Gate backed by [`platform_provider`].
    pub fn for_platform(onboarding: OnboardingStore) -> Self {
        Self::new(platform_provider(), onboarding)
    }

    pub fn status(&self, kind: PermissionKind) -> PermissionStatus {
        self.provider.status(kind)
    }

    pub fn state(&self) -> PermissionsState {
        PermissionsState {
            accessibility: self.provider.status(PermissionKind::Accessibility),
            microphone: self.provider.status(PermissionKind::Microphone),
        }
    }

    pub fn all_granted(&self) -> bool {
        self.state().all_granted()
    }

    pub fn request(&self, kind: PermissionKind) {
        log::info!("Requesting {kind} permission");
        self.provider.request(kind);
    }

    pub fn open_settings(&self, kind: PermissionKind) {
        log::info!("Opening {kind} settings");
        self.provider.open_settings(kind);
    }

    /// `true` until onboarding has been completed.
    pub fn needs_onboarding(&self) -> bool {
        !self.onboarding.is_complete()
    }

    pub fn complete_onboarding(&self) -> Result<(), ConfigError> {
        self.onboarding.complete()
    }

    pub fn reset_onboarding(&self) -> Result<(), ConfigError> {
        self.onboarding.reset()
    }

    pub fn onboarding(&self) -> &OnboardingStore {
        &self.onboarding
    }
}

impl fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionGate")
            .field("onboarding", &self.onboarding.path())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
