// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils;

/// How a module (or one of its paths) is mounted. `Auto` leaves the choice
/// to the engine; `None` keeps it unmounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleMode {
    #[default]
    Auto,
    Hymofs,
    Overlay,
    Magic,
    None,
}

impl ModuleMode {
    /// Unrecognized labels degrade to `Auto`.
    pub fn parse(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "hymofs" => ModuleMode::Hymofs,
            "overlay" => ModuleMode::Overlay,
            "magic" => ModuleMode::Magic,
            "none" => ModuleMode::None,
            _ => ModuleMode::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRule {
    pub path: String,
    pub mode: ModuleMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub mode: ModuleMode,
    pub strategy: String,
    pub path: String,
    pub rules: Vec<ModuleRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictEntry {
    pub partition: String,
    pub relative_path: String,
    pub contending_modules: Vec<String>,
}

fn module_from_value(m: &Value) -> Option<Module> {
    let text = |key: &str| m.get(key).and_then(Value::as_str).map(str::to_string);
    let id = text("id").filter(|id| !id.is_empty())?;

    let rules = m
        .get("rules")
        .and_then(Value::as_array)
        .map(|rules| {
            rules
                .iter()
                .filter_map(|r| {
                    Some(ModuleRule {
                        path: r.get("path")?.as_str()?.to_string(),
                        mode: ModuleMode::parse(
                            r.get("mode").and_then(Value::as_str).unwrap_or(""),
                        ),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Module {
        name: text("name").filter(|n| !n.is_empty()).unwrap_or_else(|| id.clone()),
        version: text("version").unwrap_or_default(),
        author: text("author").unwrap_or_default(),
        description: text("description").unwrap_or_default(),
        mode: ModuleMode::parse(&text("mode").unwrap_or_default()),
        strategy: text("strategy")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "overlay".to_string()),
        path: text("path").unwrap_or_default(),
        rules,
        id,
    })
}

/// Reads `module list`: either `{"modules": [..]}` or a bare array. Entries
/// without an id are skipped.
pub fn parse_modules(stdout: &str) -> serde_json::Result<Vec<Module>> {
    let data: Value = serde_json::from_str(stdout)?;
    let list: &[Value] = match &data {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => obj
            .get("modules")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    };
    Ok(list.iter().filter_map(module_from_value).collect())
}

/// Mode override file contents: non-auto modes only, and only for ids that
/// are safe to use as keys.
pub fn mode_overrides(modules: &[Module]) -> BTreeMap<String, ModuleMode> {
    modules
        .iter()
        .filter(|m| m.mode != ModuleMode::Auto)
        .filter(|m| {
            let ok = utils::is_valid_module_id(&m.id);
            if !ok {
                log::warn!("Skipping mode override for invalid module id '{}'", m.id);
            }
            ok
        })
        .map(|m| (m.id.clone(), m.mode))
        .collect()
}

/// Path rule override file contents for modules that have any.
pub fn rule_overrides(modules: &[Module]) -> BTreeMap<String, Vec<ModuleRule>> {
    modules
        .iter()
        .filter(|m| !m.rules.is_empty())
        .map(|m| (m.id.clone(), m.rules.clone()))
        .collect()
}
