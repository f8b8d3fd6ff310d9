//! Tool settings
//!
//! Settings live in a versioned JSON envelope. They are read from an explicit
//! path, or from `settings.json` in the platform config directory, and fall
//! back to defaults when neither exists.

use directories::ProjectDirs;
use pdf_engine::SaveOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: u32 = 1;
const SETTINGS_FILE: &str = "settings.json";
/// Characters of annotation content shown in log lines.
pub const DEFAULT_PREVIEW_CHARS: usize = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to resolve config directory")]
    NoConfigDirectory,
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("settings version {found} is newer than supported version {SETTINGS_SCHEMA_VERSION}")]
    UnsupportedVersion { found: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rebuild every input's object table before reading it
    pub repair_inputs: bool,
    /// Characters of annotation content shown in log lines
    pub preview_chars: usize,
    /// Deflate streams when writing output documents
    pub compress_output: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repair_inputs: true,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            compress_output: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsEnvelope {
    version: u32,
    #[serde(default)]
    settings: Settings,
}

impl Settings {
    /// Location of the per-user settings file.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("dev", "annotmerge", "annotmerge")
            .ok_or(ConfigError::NoConfigDirectory)?;

        Ok(dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Load from `explicit` if given, else from the default location when the
    /// file exists, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::default_path() {
            Ok(path) if path.exists() => Self::load(&path),
            Ok(_) => Ok(Self::default()),
            Err(err) => {
                tracing::debug!(%err, "no config directory, using default settings");
                Ok(Self::default())
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes =
            fs::read(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let envelope: SettingsEnvelope = serde_json::from_slice(&bytes)
            .map_err(|source| ConfigError::Serde { path: path.to_path_buf(), source })?;

        if envelope.version > SETTINGS_SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedVersion { found: envelope.version });
        }

        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(envelope.settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let envelope =
            SettingsEnvelope { version: SETTINGS_SCHEMA_VERSION, settings: self.clone() };
        let bytes = serde_json::to_vec_pretty(&envelope)
            .map_err(|source| ConfigError::Serde { path: path.to_path_buf(), source })?;
        fs::write(path, bytes).map_err(io_error)?;
        Ok(())
    }

    pub fn save_options(&self) -> SaveOptions {
        SaveOptions { compress: self.compress_output }
    }
}
