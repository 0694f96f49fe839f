// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{core::partitions::PartitionSet, defs, utils};

pub const CONFIG_FILE_DEFAULT: &str = defs::CONFIG_FILE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsType {
    #[default]
    Auto,
    Tmpfs,
    Erofs,
    Ext4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MountStage {
    PostFsData,
    #[default]
    Metamount,
    Services,
}

/// Engine configuration as the client sees it.
///
/// `hymofs_available`, `tmpfs_xattr_supported` and `logfile` are reported by the
/// engine or used locally; they never reach the persisted file, see
/// [`PersistedConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub moduledir: PathBuf,
    pub tempdir: String,
    pub mountsource: String,
    pub logfile: PathBuf,
    pub debug: bool,
    pub verbose: bool,
    pub fs_type: FsType,
    pub disable_umount: bool,
    pub enable_nuke: bool,
    pub ignore_protocol_mismatch: bool,
    pub enable_kernel_debug: bool,
    pub enable_stealth: bool,
    pub hymofs_enabled: bool,
    pub uname_release: String,
    pub uname_version: String,
    pub mount_stage: MountStage,
    pub partitions: PartitionSet,

    pub hymofs_available: bool,
    pub tmpfs_xattr_supported: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            moduledir: PathBuf::from(defs::DEFAULT_MODULE_DIR),
            tempdir: String::new(),
            mountsource: defs::DEFAULT_MOUNT_SOURCE.to_string(),
            logfile: PathBuf::from(defs::DAEMON_LOG_FILE),
            debug: false,
            verbose: false,
            fs_type: FsType::Auto,
            disable_umount: false,
            enable_nuke: false,
            ignore_protocol_mismatch: false,
            enable_kernel_debug: false,
            enable_stealth: false,
            hymofs_enabled: true,
            uname_release: String::new(),
            uname_version: String::new(),
            mount_stage: MountStage::Metamount,
            partitions: PartitionSet::default(),
            hymofs_available: false,
            tmpfs_xattr_supported: false,
        }
    }
}

/// The fields written to the engine's config file. Anything not listed here
/// stays in memory.
#[derive(Debug, Serialize)]
pub struct PersistedConfig<'a> {
    pub moduledir: &'a Path,
    pub tempdir: &'a str,
    pub mountsource: &'a str,
    pub debug: bool,
    pub verbose: bool,
    pub fs_type: FsType,
    pub disable_umount: bool,
    pub enable_nuke: bool,
    pub ignore_protocol_mismatch: bool,
    pub enable_kernel_debug: bool,
    pub enable_stealth: bool,
    pub hymofs_enabled: bool,
    pub uname_release: &'a str,
    pub uname_version: &'a str,
    pub mount_stage: MountStage,
    pub partitions: &'a PartitionSet,
}

impl<'a> From<&'a Config> for PersistedConfig<'a> {
    fn from(c: &'a Config) -> Self {
        Self {
            moduledir: &c.moduledir,
            tempdir: &c.tempdir,
            mountsource: &c.mountsource,
            debug: c.debug,
            verbose: c.verbose,
            fs_type: c.fs_type,
            disable_umount: c.disable_umount,
            enable_nuke: c.enable_nuke,
            ignore_protocol_mismatch: c.ignore_protocol_mismatch,
            enable_kernel_debug: c.enable_kernel_debug,
            enable_stealth: c.enable_stealth,
            hymofs_enabled: c.hymofs_enabled,
            uname_release: &c.uname_release,
            uname_version: &c.uname_version,
            mount_stage: c.mount_stage,
            partitions: &c.partitions,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn load_default() -> Result<Self> {
        Self::from_file(CONFIG_FILE_DEFAULT)
    }

    pub fn persisted(&self) -> PersistedConfig<'_> {
        PersistedConfig::from(self)
    }

    pub fn to_persisted_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.persisted())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut content = self.to_persisted_json()?;
        content.push('\n');
        utils::atomic_write(path.as_ref(), content)
            .with_context(|| format!("Failed to save config to {}", path.as_ref().display()))
    }

    /// Returns a copy with a single field replaced. For text fields `raw` is the
    /// new value as typed; other fields take it as JSON (`true`, `3`,
    /// `["system"]`), falling back to a plain string.
    pub fn with_field(&self, key: &str, raw: &str) -> Result<Self> {
        let mut doc = serde_json::to_value(self)?;
        let Some(fields) = doc.as_object_mut() else {
            bail!("config did not serialize to an object");
        };
        let value = match fields.get(key) {
            None => bail!("Unknown config key: {key}"),
            Some(Value::String(_)) => Value::from(raw),
            Some(_) => serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw)),
        };
        fields.insert(key.to_string(), value);
        serde_json::from_value(doc).with_context(|| format!("Invalid value for {key}: {raw}"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;

    use super::*;

    const PERSISTED_KEYS: [&str; 16] = [
        "moduledir",
        "tempdir",
        "mountsource",
        "debug",
        "verbose",
        "fs_type",
        "disable_umount",
        "enable_nuke",
        "ignore_protocol_mismatch",
        "enable_kernel_debug",
        "enable_stealth",
        "hymofs_enabled",
        "uname_release",
        "uname_version",
        "mount_stage",
        "partitions",
    ];

    #[test]
    fn saved_file_contains_only_persistent_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hymo/config.json");

        let config = Config {
            hymofs_available: true,
            tmpfs_xattr_supported: true,
            partitions: PartitionSet::from_iter(["system", "vendor"]),
            ..Config::default()
        };
        config.save_to_file(&path).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let keys: BTreeSet<&str> = written
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, BTreeSet::from(PERSISTED_KEYS));
        assert_eq!(written["partitions"], serde_json::json!(["system", "vendor"]));
    }

    #[test]
    fn unknown_fields_from_engine_are_dropped() {
        let raw = r#"{
            "moduledir": "/data/adb/modules",
            "fs_type": "erofs",
            "mount_stage": "post-fs-data",
            "hymofs_available": true,
            "some_future_field": 42
        }"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.fs_type, FsType::Erofs);
        assert_eq!(config.mount_stage, MountStage::PostFsData);
        assert!(config.hymofs_available);

        let persisted = config.to_persisted_json().unwrap();
        assert!(!persisted.contains("some_future_field"));
        assert!(!persisted.contains("hymofs_available"));
    }

    #[test]
    fn round_trip_through_file_keeps_persistent_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            enable_stealth: true,
            uname_release: "5.10.0".into(),
            ..Config::default()
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn with_field_parses_json_or_falls_back_to_string() {
        let base = Config::default();

        let c = base.with_field("debug", "true").unwrap();
        assert!(c.debug);

        let c = base.with_field("uname_release", "5.15.0-hymo").unwrap();
        assert_eq!(c.uname_release, "5.15.0-hymo");

        let c = base
            .with_field("partitions", r#"["odm","odm","my_product"]"#)
            .unwrap();
        assert_eq!(c.partitions.as_slice(), ["odm", "my_product"]);

        assert!(base.with_field("no_such_key", "1").is_err());
        assert!(base.with_field("fs_type", "zfs").is_err());
    }

    #[test]
    fn with_field_keeps_numeric_looking_text_as_text() {
        let base = Config::default();

        let c = base.with_field("uname_release", "5.10").unwrap();
        assert_eq!(c.uname_release, "5.10");

        let c = base.with_field("uname_release", "true").unwrap();
        assert_eq!(c.uname_release, "true");

        let c = base.with_field("tempdir", "1234").unwrap();
        assert_eq!(c.tempdir, "1234");

        let c = base.with_field("fs_type", "erofs").unwrap();
        assert_eq!(c.fs_type, FsType::Erofs);
        assert!(base.with_field("debug", "yes").is_err());
    }
}
