// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::defs::STORAGE_PLACEHOLDER;

/// Usage of the engine's module storage, as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub size: String,
    pub used: String,
    pub avail: String,
    pub percent: f64,
    pub mode: Option<String>,
}

impl Default for StorageInfo {
    /// Dash-valued stats for "unknown" or "not mounted".
    fn default() -> Self {
        Self {
            size: STORAGE_PLACEHOLDER.to_string(),
            used: STORAGE_PLACEHOLDER.to_string(),
            avail: STORAGE_PLACEHOLDER.to_string(),
            percent: 0.0,
            mode: None,
        }
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1}G", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.0}M", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0}K", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

fn size_field(data: &Value, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(format_size)
            .unwrap_or_else(|| n.to_string()),
        _ => STORAGE_PLACEHOLDER.to_string(),
    }
}

/// Reads `api storage` output. An `{"error": ..}` object (storage not
/// mounted) or anything unparsable gives the placeholder stats.
pub fn parse_storage(stdout: &str) -> StorageInfo {
    let Ok(data) = serde_json::from_str::<Value>(stdout) else {
        log::warn!("Unreadable storage report, showing placeholders");
        return StorageInfo::default();
    };
    if !data.is_object() || data.get("error").is_some_and(|e| !e.is_null()) {
        return StorageInfo::default();
    }

    StorageInfo {
        size: size_field(&data, "size"),
        used: size_field(&data, "used"),
        avail: size_field(&data, "avail"),
        percent: data.get("percent").and_then(Value::as_f64).unwrap_or(0.0),
        mode: data
            .get("mode")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string),
    }
}
