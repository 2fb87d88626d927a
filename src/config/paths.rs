//! Home-directory application paths using the `dirs` crate.
//!
//! Layout (all platforms):
//!
//!   ~/.super-characters/settings.json   settings record (API keys, hotkey, VAD, connector)
//!   ~/.supercharacters/config.json      onboarding flag
//!
//! The two directories differ by a dash.  Both names are fixed by the files
//! already present on users' machines and must not be merged.

use std::path::{Path, PathBuf};

use super::ConfigError;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `settings.json`.
    pub settings_dir: PathBuf,
    /// Full path to `settings.json`.
    pub settings_file: PathBuf,
    /// Directory holding the onboarding `config.json`.
    pub onboarding_dir: PathBuf,
    /// Full path to the onboarding `config.json`.
    pub onboarding_file: PathBuf,
}

impl AppPaths {
    const SETTINGS_DIR: &'static str = ".super-characters";
    const ONBOARDING_DIR: &'static str = ".supercharacters";

    /// Resolves all paths under the current user's home directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HomeDir`] when the platform cannot report a
    /// home directory.
    pub fn new() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeDir)?;
        Ok(Self::under(&home))
    }

    /// Resolves all paths under an explicit root instead of `$HOME`.
    pub fn under(root: &Path) -> Self {
        let settings_dir = root.join(Self::SETTINGS_DIR);
        let onboarding_dir = root.join(Self::ONBOARDING_DIR);

        Self {
            settings_file: settings_dir.join("settings.json"),
            onboarding_file: onboarding_dir.join("config.json"),
            settings_dir,
            onboarding_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_under_root() {
        let paths = AppPaths::under(Path::new("/home/alice"));
        assert_eq!(
            paths.settings_file,
            PathBuf::from("/home/alice/.super-characters/settings.json")
        );
        assert_eq!(
            paths.onboarding_file,
            PathBuf::from("/home/alice/.supercharacters/config.json")
        );
        assert_eq!(paths.settings_file.parent(), Some(paths.settings_dir.as_path()));
    }

    #[test]
    fn home_paths_have_expected_file_names() {
        // Some CI sandboxes have no home directory; nothing to check there.
        let Ok(paths) = AppPaths::new() else { return };
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.json"));
        assert!(paths
            .onboarding_file
            .file_name()
            .is_some_and(|n| n == "config.json"));
    }
}
