// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{core::partitions::Partition, defs};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MountStats {
    pub total_mounts: u64,
    pub successful_mounts: u64,
    pub failed_mounts: u64,
    pub tmpfs_created: u64,
    pub files_mounted: u64,
    pub dirs_mounted: u64,
    pub symlinks_created: u64,
    pub overlayfs_mounts: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub kernel: String,
    pub selinux: String,
    pub mount_base: String,
    pub uname_release: String,
    pub uname_version: String,
    pub hymofs_modules: Vec<String>,
    pub hymofs_mismatch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_stats: Option<MountStats>,
    pub detected_partitions: Vec<Partition>,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            kernel: defs::UNKNOWN.to_string(),
            selinux: defs::UNKNOWN.to_string(),
            mount_base: defs::DEFAULT_MOUNT_BASE.to_string(),
            uname_release: String::new(),
            uname_version: String::new(),
            hymofs_modules: Vec::new(),
            hymofs_mismatch: false,
            mismatch_message: None,
            mount_stats: None,
            detected_partitions: Vec::new(),
        }
    }
}

/// Kernel identity as found in `/proc/version`, which is not affected by uname spoofing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KernelVersion {
    pub release: String,
    pub version: String,
}

/// Drops `(user@host)` / `(gcc version ..)` groups, which may nest.
fn strip_leading_groups(mut s: &str) -> &str {
    while s.starts_with('(') {
        let mut depth = 0usize;
        let mut end = None;
        for (i, c) in s.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        match end {
            Some(i) => s = s[i + 1..].trim_start(),
            None => break,
        }
    }
    s
}

pub fn parse_proc_version(text: &str) -> Option<KernelVersion> {
    let rest = text.trim().strip_prefix("Linux version ")?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let release = parts.next().filter(|r| !r.is_empty())?.to_string();

    let mut version = strip_leading_groups(parts.next().unwrap_or("").trim());
    if let Some(hash) = version.find('#')
        && hash > 0
    {
        version = &version[hash..];
    }

    Some(KernelVersion {
        release,
        version: version.trim().to_string(),
    })
}

fn parse_object(stdout: Option<&str>) -> Value {
    stdout
        .and_then(|s| serde_json::from_str::<Value>(s).ok())
        .filter(Value::is_object)
        .unwrap_or(Value::Null)
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Builds the system overview from the raw outputs of `cat /proc/version`,
/// `getenforce`, `api system` and `hymofs version`. Any of them may be missing.
pub fn assemble(
    proc_version: Option<&str>,
    selinux: Option<&str>,
    api_system: Option<&str>,
    hymofs_version: Option<&str>,
) -> SystemInfo {
    let mut info = SystemInfo::default();

    if let Some(text) = proc_version.filter(|t| !t.trim().is_empty()) {
        match parse_proc_version(text) {
            Some(k) => {
                info.kernel = k.release.clone();
                info.uname_release = k.release;
                info.uname_version = k.version;
            }
            None => info.kernel = text.trim().to_string(),
        }
    }

    if let Some(s) = selinux.map(str::trim).filter(|s| !s.is_empty()) {
        info.selinux = s.to_string();
    }

    let system = parse_object(api_system);
    let mount = parse_object(hymofs_version);

    if let Some(base) =
        string_field(&system, "mount_base").or_else(|| string_field(&mount, "mount_base"))
    {
        info.mount_base = base;
    }
    info.mount_stats = system
        .get("mountStats")
        .and_then(|v| serde_json::from_value(v.clone()).ok());
    info.detected_partitions = system
        .get("detectedPartitions")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    info.hymofs_modules = mount
        .get("active_modules")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    info.hymofs_mismatch = mount
        .get("protocol_mismatch")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    info.mismatch_message = string_field(&mount, "mismatch_message");

    info
}
