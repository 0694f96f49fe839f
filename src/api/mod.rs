// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

//! The one interface a client talks to, with a live and a mock implementation.
//!
//! Read operations never fail: missing or malformed answers become defaults.
//! Operations that change engine state return [`crate::Result`].

pub mod live;
pub mod mock;

use std::{fmt, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;

pub use self::{live::LiveApi, mock::MockApi};
use crate::{
    bridge::{CommandChannel, shell::ShellResolver},
    conf::{
        config::Config,
        settings::{BackendKind, Settings},
    },
    core::{
        modules::{ConflictEntry, Module},
        rules::Rule,
        storage::StorageInfo,
        system::SystemInfo,
    },
    defs,
    error::Result,
};

/// Settings pushed to the running engine after the config file is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveSetting {
    KernelDebug,
    Stealth,
    Hymofs,
    Uname,
}

impl fmt::Display for LiveSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LiveSetting::KernelDebug => "kernel debug",
            LiveSetting::Stealth => "stealth",
            LiveSetting::Hymofs => "hymofs",
            LiveSetting::Uname => "uname spoof",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveSettingFailure {
    pub setting: LiveSetting,
    pub message: String,
}

/// Outcome of a successful config save. The file is written; some live
/// settings may still have been refused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub failures: Vec<LiveSettingFailure>,
}

impl SaveReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    /// HymoFS lines from the kernel ring buffer.
    Kernel,
    File(PathBuf),
}

impl Default for LogSource {
    fn default() -> Self {
        LogSource::File(PathBuf::from(defs::DAEMON_LOG_FILE))
    }
}

#[async_trait]
pub trait HymoApi: Send + Sync {
    async fn load_config(&self) -> Config;
    async fn save_config(&self, config: &Config) -> Result<SaveReport>;

    async fn scan_modules(&self) -> Vec<Module>;
    async fn save_modules(&self, modules: &[Module]) -> Result<()>;
    async fn save_rules(&self, modules: &[Module]) -> Result<()>;
    async fn check_conflicts(&self) -> Vec<ConflictEntry>;
    async fn hot_mount(&self, module_id: &str) -> Result<()>;
    async fn hot_unmount(&self, module_id: &str) -> Result<()>;

    /// Asks the engine to sync its partition list and returns its report.
    async fn sync_partitions(&self) -> Result<String>;
    /// Runs a partition sync and returns the partition names it added.
    async fn scan_partitions(&self) -> Result<Vec<String>>;

    async fn read_logs(&self, source: &LogSource, lines: usize) -> Result<String>;
    async fn clear_logs(&self) -> Result<()>;

    async fn storage_usage(&self) -> StorageInfo;
    async fn system_info(&self) -> SystemInfo;

    async fn user_hide_rules(&self) -> Vec<String>;
    /// Active rules with ownership resolved against the user hide list.
    async fn all_rules(&self) -> Vec<Rule>;
    async fn add_user_hide_rule(&self, path: &str) -> Result<()>;
    async fn remove_user_hide_rule(&self, path: &str) -> Result<()>;
}

/// Picks the backend for this process. Not switchable afterwards.
pub fn select_backend(settings: &Settings) -> Arc<dyn HymoApi> {
    match settings.backend {
        BackendKind::Mock => {
            log::info!("Backend: mock");
            Arc::new(MockApi)
        }
        BackendKind::Live => {
            let program = if settings.use_su {
                PathBuf::from(defs::DEFAULT_SU)
            } else {
                settings.shell.clone()
            };
            log::info!(
                "Backend: live ({} via {})",
                settings.binary.display(),
                program.display()
            );
            let channel = CommandChannel::new(ShellResolver::new(program));
            Arc::new(LiveApi::new(channel, settings.binary.to_string_lossy()))
        }
    }
}
