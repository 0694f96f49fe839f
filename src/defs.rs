// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

pub const BASE_DIR: &str = "/data/adb/hymo/";

// Engine command line, invoked through the privileged bridge
pub const HYMO_BINARY: &str = "/data/adb/modules/hymo/hymod";

pub const CONFIG_FILE: &str = "/data/adb/hymo/config.json";
pub const MODE_CONFIG_FILE: &str = "/data/adb/hymo/module_mode.json";
pub const RULES_CONFIG_FILE: &str = "/data/adb/hymo/module_rules.json";
pub const DAEMON_LOG_FILE: &str = "/data/adb/hymo/daemon.log";

pub const SETTINGS_FILE_DEFAULT: &str = "/data/adb/hymo/bridge.toml";
pub const CLIENT_LOG_FILE: &str = "/data/adb/hymo/bridge.log";

pub const DEFAULT_MODULE_DIR: &str = "/data/adb/modules";
pub const DEFAULT_MOUNT_SOURCE: &str = "KSU";
pub const DEFAULT_MOUNT_BASE: &str = "/dev/hymo_mirror";

pub const DEFAULT_SHELL: &str = "/system/bin/sh";
pub const DEFAULT_SU: &str = "su";

pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_LOG_LINES: usize = 1000;

pub const UNKNOWN: &str = "Unknown";
pub const STORAGE_PLACEHOLDER: &str = "-";
