//! macOS permission provider (ApplicationServices + AVFoundation).

use block::{Block, ConcreteBlock};
use objc::runtime::{Object, BOOL};
use objc::{class, msg_send, sel, sel_impl};

use super::{PermissionKind, PermissionProvider, PermissionStatus};

const ACCESSIBILITY_PANE: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility";
const MICROPHONE_PANE: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_Microphone";

pub struct MacPermissionProvider;

impl PermissionProvider for MacPermissionProvider {
    fn status(&self, kind: PermissionKind) -> PermissionStatus {
        match kind {
            PermissionKind::Accessibility => accessibility_status(),
            PermissionKind::Microphone => microphone_status(),
        }
    }

    fn request(&self, kind: PermissionKind) {
        match kind {
            // There is no request dialog for accessibility; the user has to
            // tick the app in System Settings.
            PermissionKind::Accessibility => self.open_settings(kind),
            PermissionKind::Microphone => request_microphone(),
        }
    }

    fn open_settings(&self, kind: PermissionKind) {
        let pane = settings_pane(kind);
        if let Err(e) = open::that(pane) {
            log::warn!("Failed to open {pane}: {e}");
        }
    }
}

fn settings_pane(kind: PermissionKind) -> &'static str {
    match kind {
        PermissionKind::Accessibility => ACCESSIBILITY_PANE,
        PermissionKind::Microphone => MICROPHONE_PANE,
    }
}

fn accessibility_status() -> PermissionStatus {
    if unsafe { AXIsProcessTrusted() } != 0 {
        PermissionStatus::Granted
    } else {
        PermissionStatus::Denied
    }
}

/// Maps `AVAuthorizationStatus`.
fn microphone_status() -> PermissionStatus {
    let status: isize = unsafe {
        msg_send![class!(AVCaptureDevice), authorizationStatusForMediaType: AVMediaTypeAudio]
    };
    authorization_status(status)
}

fn authorization_status(raw: isize) -> PermissionStatus {
    match raw {
        0 => PermissionStatus::NotAsked,
        1 => PermissionStatus::Restricted,
        2 => PermissionStatus::Denied,
        3 => PermissionStatus::Granted,
        _ => PermissionStatus::Unknown,
    }
}

fn request_microphone() {
    // The outcome is observed by polling `microphone_status` again.
    let handler = ConcreteBlock::new(|_granted: BOOL| {}).copy();
    let handler_ptr: *const Block<(BOOL,), ()> = &*handler;
    unsafe {
        let _: () = msg_send![
            class!(AVCaptureDevice),
            requestAccessForMediaType: AVMediaTypeAudio
            completionHandler: handler_ptr
        ];
    }
}

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> u8;
}

#[link(name = "AVFoundation", kind = "framework")]
extern "C" {
    static AVMediaTypeAudio: *const Object;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_status_mapping() {
        assert_eq!(authorization_status(0), PermissionStatus::NotAsked);
        assert_eq!(authorization_status(1), PermissionStatus::Restricted);
        assert_eq!(authorization_status(2), PermissionStatus::Denied);
        assert_eq!(authorization_status(3), PermissionStatus::Granted);
        assert_eq!(authorization_status(42), PermissionStatus::Unknown);
    }

    #[test]
    fn panes_are_privacy_urls() {
        assert!(settings_pane(PermissionKind::Accessibility).ends_with("Privacy_Accessibility"));
        assert!(settings_pane(PermissionKind::Microphone).ends_with("Privacy_Microphone"));
    }
}
