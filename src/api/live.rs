// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{collections::HashSet, path::PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use super::{HymoApi, LiveSetting, LiveSettingFailure, LogSource, SaveReport};
use crate::{
    bridge::{CommandChannel, CommandOutput},
    conf::config::Config,
    core::{
        modules::{self, ConflictEntry, Module},
        partitions, reconcile,
        rules::{self, Rule},
        storage::{self, StorageInfo},
        system::{self, SystemInfo},
    },
    defs,
    error::{Error, Result},
    utils::{self, shell_quote},
};

/// Files the client writes on the engine's behalf.
#[derive(Debug, Clone)]
pub struct EnginePaths {
    pub config: PathBuf,
    pub mode_config: PathBuf,
    pub rules_config: PathBuf,
    pub daemon_log: PathBuf,
}

impl Default for EnginePaths {
    fn default() -> Self {
        Self {
            config: PathBuf::from(defs::CONFIG_FILE),
            mode_config: PathBuf::from(defs::MODE_CONFIG_FILE),
            rules_config: PathBuf::from(defs::RULES_CONFIG_FILE),
            daemon_log: PathBuf::from(defs::DAEMON_LOG_FILE),
        }
    }
}

pub struct LiveApi {
    channel: CommandChannel,
    binary: String,
    paths: EnginePaths,
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "enable" } else { "disable" }
}

fn quote_path(path: &std::path::Path) -> String {
    shell_quote(&path.to_string_lossy())
}

impl LiveApi {
    pub fn new(channel: CommandChannel, binary: impl Into<String>) -> Self {
        Self {
            channel,
            binary: binary.into(),
            paths: EnginePaths::default(),
        }
    }

    pub fn with_paths(mut self, paths: EnginePaths) -> Self {
        self.paths = paths;
        self
    }

    fn engine(&self, args: &str) -> String {
        format!("{} {}", self.binary, args)
    }

    /// Runs a read. Transport problems are logged and reported as `None`.
    async fn read(&self, what: &str, command: &str) -> Option<CommandOutput> {
        match self.channel.execute(command).await {
            Ok(out) => Some(out),
            Err(e) => {
                log::warn!("Failed to {}: {}", what, e);
                None
            }
        }
    }

    /// Stdout of a read that succeeded with content.
    async fn read_payload(&self, what: &str, command: &str) -> Option<String> {
        let out = self.read(what, command).await?;
        match out.payload() {
            Some(p) => Some(p.to_string()),
            None => {
                if !out.success() {
                    log::warn!("Failed to {}: exit code {}", what, out.exit_code);
                }
                None
            }
        }
    }

    /// Runs a state-changing command; any failure is an error.
    async fn mutate(
        &self,
        action: &'static str,
        command: &str,
        fallback: &str,
    ) -> Result<CommandOutput> {
        let out = self.channel.execute(command).await?;
        if out.success() {
            Ok(out)
        } else {
            Err(Error::command_failed(action, out.error_message(fallback)))
        }
    }

    /// Replaces `path` with pretty JSON: parent created, temp file written,
    /// then renamed over the target.
    async fn write_json<T: Serialize + ?Sized + Sync>(
        &self,
        action: &'static str,
        path: &std::path::Path,
        value: &T,
    ) -> Result<()> {
        let data = serde_json::to_string_pretty(value)?;
        let target = quote_path(path);
        let tmp = quote_path(&path.with_extension("json.tmp"));
        let command = format!(
            "mkdir -p \"$(dirname {target})\" && printf '%s\\n' {data} > {tmp} \
             && mv -f {tmp} {target}",
            data = shell_quote(&data),
        );
        self.mutate(action, &command, "write failed").await?;
        Ok(())
    }

    async fn apply(&self, setting: LiveSetting, command: &str) -> Option<LiveSettingFailure> {
        let message = match self.channel.execute(command).await {
            Ok(out) if out.success() => return None,
            Ok(out) => out.error_message(&format!("exit code {}", out.exit_code)),
            Err(e) => e.to_string(),
        };
        log::error!("Failed to apply {}: {}", setting, message);
        Some(LiveSettingFailure { setting, message })
    }

    async fn stdout_of(&self, what: &str, command: &str) -> Option<String> {
        self.read(what, command)
            .await
            .filter(CommandOutput::success)
            .map(|out| out.stdout)
    }
}

#[async_trait]
impl HymoApi for LiveApi {
    async fn load_config(&self) -> Config {
        let Some(stdout) = self
            .read_payload("load config", &self.engine("config show"))
            .await
        else {
            return Config::default();
        };
        serde_json::from_str(&stdout).unwrap_or_else(|e| {
            log::warn!("Unreadable config from engine, using defaults: {}", e);
            Config::default()
        })
    }

    async fn save_config(&self, config: &Config) -> Result<SaveReport> {
        self.write_json("save config", &self.paths.config, &config.persisted())
            .await?;
        log::info!("Config saved to {}", self.paths.config.display());

        let mut commands = vec![
            (
                LiveSetting::KernelDebug,
                self.engine(&format!("debug {}", on_off(config.enable_kernel_debug))),
            ),
            (
                LiveSetting::Stealth,
                self.engine(&format!("debug stealth {}", on_off(config.enable_stealth))),
            ),
        ];
        if config.hymofs_available {
            commands.push((
                LiveSetting::Hymofs,
                self.engine(&format!("hymofs {}", on_off(config.hymofs_enabled))),
            ));
        }
        // Always sent so that clearing both fields clears the spoof.
        commands.push((
            LiveSetting::Uname,
            self.engine(&format!(
                "debug set-uname {} {}",
                shell_quote(&config.uname_release),
                shell_quote(&config.uname_version)
            )),
        ));

        let mut report = SaveReport::default();
        for (setting, command) in commands {
            if let Some(failure) = self.apply(setting, &command).await {
                report.failures.push(failure);
            }
        }
        Ok(report)
    }

    async fn scan_modules(&self) -> Vec<Module> {
        let Some(stdout) = self
            .read_payload("scan modules", &self.engine("module list"))
            .await
        else {
            return Vec::new();
        };
        modules::parse_modules(&stdout).unwrap_or_else(|e| {
            log::error!("Module scan failed: {}", e);
            Vec::new()
        })
    }

    async fn save_modules(&self, modules: &[Module]) -> Result<()> {
        let overrides = modules::mode_overrides(modules);
        self.write_json("save modes", &self.paths.mode_config, &overrides)
            .await
    }

    async fn save_rules(&self, modules: &[Module]) -> Result<()> {
        let overrides = modules::rule_overrides(modules);
        self.write_json("save rules", &self.paths.rules_config, &overrides)
            .await
    }

    async fn check_conflicts(&self) -> Vec<ConflictEntry> {
        let Some(stdout) = self
            .read_payload("check conflicts", &self.engine("module check-conflicts"))
            .await
        else {
            return Vec::new();
        };
        serde_json::from_str(&stdout).unwrap_or_else(|e| {
            log::error!("Check conflicts failed: {}", e);
            Vec::new()
        })
    }

    async fn hot_mount(&self, module_id: &str) -> Result<()> {
        utils::validate_module_id(module_id)?;
        self.mutate(
            "hot mount",
            &self.engine(&format!("module hot-mount \"{}\"", module_id)),
            "Hot mount failed",
        )
        .await?;
        Ok(())
    }

    async fn hot_unmount(&self, module_id: &str) -> Result<()> {
        utils::validate_module_id(module_id)?;
        self.mutate(
            "hot unmount",
            &self.engine(&format!("module hot-unmount \"{}\"", module_id)),
            "Hot unmount failed",
        )
        .await?;
        Ok(())
    }

    async fn sync_partitions(&self) -> Result<String> {
        let out = self
            .mutate(
                "sync partitions",
                &self.engine("config sync-partitions"),
                "Sync failed",
            )
            .await?;
        Ok(out.stdout)
    }

    async fn scan_partitions(&self) -> Result<Vec<String>> {
        let out = self
            .mutate(
                "scan partitions",
                &self.engine("config sync-partitions 2>&1"),
                "Sync failed",
            )
            .await?;
        let found = partitions::extract_partitions(&out.stdout);
        log::info!("Partition scan found {} partition(s)", found.len());
        Ok(found)
    }

    async fn read_logs(&self, source: &LogSource, lines: usize) -> Result<String> {
        let command = match source {
            LogSource::Kernel => format!("dmesg | grep -i hymofs | tail -n {}", lines),
            LogSource::File(path) => {
                let f = quote_path(path);
                format!("[ -f {f} ] && tail -n {lines} {f} || echo \"\"")
            }
        };
        let out = match self.channel.execute(&command).await {
            Ok(out) => out,
            Err(e) if e.is_transport() => {
                log::warn!("Failed to read logs: {}", e);
                return Ok(String::new());
            }
            Err(e) => return Err(e),
        };
        // grep exits 1 when nothing matches
        if out.success() || matches!(source, LogSource::Kernel) {
            Ok(out.stdout)
        } else {
            Err(Error::command_failed(
                "read logs",
                out.error_message("Log file not found"),
            ))
        }
    }

    async fn clear_logs(&self) -> Result<()> {
        let command = format!("echo -n > {}", quote_path(&self.paths.daemon_log));
        self.mutate("clear logs", &command, "Failed to clear logs")
            .await?;
        Ok(())
    }

    async fn storage_usage(&self) -> StorageInfo {
        match self
            .read_payload("check storage", &self.engine("api storage"))
            .await
        {
            Some(stdout) => storage::parse_storage(&stdout),
            None => StorageInfo::default(),
        }
    }

    async fn system_info(&self) -> SystemInfo {
        if !self.channel.is_available() {
            return SystemInfo::default();
        }
        let api_system = self.engine("api system");
        let hymofs_version = self.engine("hymofs version");
        let (proc_version, selinux, system, mount) = tokio::join!(
            self.stdout_of("read kernel version", "cat /proc/version"),
            self.stdout_of("read selinux status", "getenforce"),
            self.stdout_of("read system info", &api_system),
            self.stdout_of("read hymofs version", &hymofs_version),
        );
        system::assemble(
            proc_version.as_deref(),
            selinux.as_deref(),
            system.as_deref(),
            mount.as_deref(),
        )
    }

    async fn user_hide_rules(&self) -> Vec<String> {
        self.read_payload("list hide rules", &self.engine("hide list"))
            .await
            .map(|stdout| rules::parse_user_hide_rules(&stdout))
            .unwrap_or_default()
    }

    async fn all_rules(&self) -> Vec<Rule> {
        let list = self.engine("hymofs list");
        let (user, listing) = tokio::join!(
            self.user_hide_rules(),
            self.read_payload("list active rules", &list)
        );
        let user: HashSet<String> = user.into_iter().collect();
        let parsed = rules::parse_rules(listing.as_deref().unwrap_or(""), &user);
        reconcile::reconcile(&user, parsed)
    }

    async fn add_user_hide_rule(&self, path: &str) -> Result<()> {
        self.mutate(
            "add hide rule",
            &self.engine(&format!("hide add {}", shell_quote(path))),
            "Failed to add hide rule",
        )
        .await?;
        Ok(())
    }

    async fn remove_user_hide_rule(&self, path: &str) -> Result<()> {
        self.mutate(
            "remove hide rule",
            &self.engine(&format!("hide remove {}", shell_quote(path))),
            "Failed to remove hide rule",
        )
        .await?;
        Ok(())
    }
}
