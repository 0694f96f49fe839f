// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::defs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Live,
    Mock,
}

/// Client-side settings: how to reach the engine, not what the engine does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendKind,
    pub binary: PathBuf,
    pub shell: PathBuf,
    pub use_su: bool,
    pub debounce_ms: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Live,
            binary: PathBuf::from(defs::HYMO_BINARY),
            shell: PathBuf::from(defs::DEFAULT_SHELL),
            use_su: false,
            debounce_ms: defs::DEFAULT_DEBOUNCE_MS,
            log_file: Some(PathBuf::from(defs::CLIENT_LOG_FILE)),
        }
    }
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    /// Reads `path`, or the default location when `None`. A missing default
    /// file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::from_file(p);
        }
        let default = Path::new(defs::SETTINGS_FILE_DEFAULT);
        if default.exists() {
            Self::from_file(default)
        } else {
            Ok(Self::default())
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_uses_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        fs::write(&path, "backend = \"mock\"\ndebounce_ms = 250\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.backend, BackendKind::Mock);
        assert_eq!(settings.debounce(), Duration::from_millis(250));
        assert_eq!(settings.binary, PathBuf::from(defs::HYMO_BINARY));
        assert!(!settings.use_su);
    }

    #[test]
    fn invalid_backend_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        fs::write(&path, "backend = \"remote\"\n").unwrap();
        assert!(Settings::from_file(&path).is_err());
    }
}
