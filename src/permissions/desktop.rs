//! Permission provider for Windows and Linux desktops.
//!
//! Neither platform gates global input behind an accessibility permission,
//! so it always reads as granted.  Microphone access is inferred from
//! whether `cpal` can open the default input device's configuration.

use cpal::traits::{DeviceTrait, HostTrait};

use super::{PermissionKind, PermissionProvider, PermissionStatus};

pub struct DesktopPermissionProvider;

impl PermissionProvider for DesktopPermissionProvider {
    fn status(&self, kind: PermissionKind) -> PermissionStatus {
        match kind {
            PermissionKind::Accessibility => PermissionStatus::Granted,
            PermissionKind::Microphone => microphone_status(),
        }
    }

    fn request(&self, kind: PermissionKind) {
        log::info!("No {kind} permission dialog on this platform; nothing to request");
    }

    fn open_settings(&self, kind: PermissionKind) {
        match settings_uri(kind) {
            Some(uri) => {
                if let Err(e) = open::that(uri) {
                    log::warn!("Failed to open {uri}: {e}");
                }
            }
            None => log::info!("No {kind} settings page on this platform"),
        }
    }
}

fn microphone_status() -> PermissionStatus {
    let host = cpal::default_host();
    let Some(device) = host.default_input_device() else {
        log::debug!("No default input device");
        return PermissionStatus::Unknown;
    };

    match device.default_input_config() {
        Ok(_) => PermissionStatus::Granted,
        Err(e) => {
            log::debug!("Default input config unavailable: {e}");
            PermissionStatus::Denied
        }
    }
}

#[cfg(target_os = "windows")]
fn settings_uri(kind: PermissionKind) -> Option<&'static str> {
    match kind {
        PermissionKind::Accessibility => None,
        PermissionKind::Microphone => Some("ms-settings:privacy-microphone"),
    }
}

#[cfg(not(target_os = "windows"))]
fn settings_uri(_kind: PermissionKind) -> Option<&'static str> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessibility_is_never_gated() {
        assert_eq!(
            DesktopPermissionProvider.status(PermissionKind::Accessibility),
            PermissionStatus::Granted
        );
    }

    #[test]
    fn accessibility_has_no_settings_page() {
        assert_eq!(settings_uri(PermissionKind::Accessibility), None);
    }
}
