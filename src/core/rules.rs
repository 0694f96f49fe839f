// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

//! Rule listings as printed by `hymofs list`.
//!
//! Newer engines print a JSON array of rule objects. Older ones print one rule
//! per line, either `hide <path>` or `<KIND> <path> [<source>]`.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleKind {
    Hide,
    Merge,
    Add,
    Spoof,
    Inject,
    Unknown,
}

impl RuleKind {
    pub fn parse(label: &str) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "HIDE" => RuleKind::Hide,
            "MERGE" => RuleKind::Merge,
            "ADD" => RuleKind::Add,
            "SPOOF" => RuleKind::Spoof,
            "INJECT" => RuleKind::Inject,
            _ => RuleKind::Unknown,
        }
    }

    /// Internal directives that are never shown.
    pub fn is_internal(self) -> bool {
        self == RuleKind::Inject
    }

    fn carries_source(self) -> bool {
        matches!(self, RuleKind::Merge | RuleKind::Add)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleKind::Hide => "HIDE",
            RuleKind::Merge => "MERGE",
            RuleKind::Add => "ADD",
            RuleKind::Spoof => "SPOOF",
            RuleKind::Inject => "INJECT",
            RuleKind::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub is_user_defined: bool,
}

impl Rule {
    pub fn new(kind: RuleKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            target: None,
            source: None,
            is_user_defined: false,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Ownership: only hide rules whose path the user added themselves.
    pub fn owned_by(&self, user_paths: &HashSet<String>) -> bool {
        self.kind == RuleKind::Hide && !self.path.is_empty() && user_paths.contains(&self.path)
    }
}

/// Which of the two listing formats a given output turned out to be.
#[derive(Debug)]
enum Listing<'a> {
    Structured(Vec<Value>),
    Legacy(&'a str),
}

impl<'a> Listing<'a> {
    fn detect(stdout: &'a str) -> Self {
        match serde_json::from_str::<Value>(stdout) {
            Ok(Value::Array(items)) => Listing::Structured(items),
            _ => Listing::Legacy(stdout),
        }
    }

    fn into_rules(self) -> Vec<Rule> {
        match self {
            Listing::Structured(items) => items.iter().filter_map(structured_rule).collect(),
            Listing::Legacy(text) => text.lines().filter_map(legacy_rule).collect(),
        }
    }
}

fn structured_rule(item: &Value) -> Option<Rule> {
    let field = |name: &str| item.get(name).and_then(Value::as_str).map(str::to_string);

    let kind = field("type")
        .map(|t| RuleKind::parse(&t))
        .unwrap_or(RuleKind::Unknown);
    if kind.is_internal() {
        return None;
    }

    let target = field("target");
    let path = field("path").or_else(|| target.clone()).unwrap_or_default();

    Some(Rule {
        kind,
        path,
        target,
        source: field("source"),
        is_user_defined: false,
    })
}

fn legacy_rule(line: &str) -> Option<Rule> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(rest) = line.strip_prefix("hide ") {
        let path = rest.trim();
        return (!path.is_empty()).then(|| Rule::new(RuleKind::Hide, path));
    }

    let mut tokens = line.split_whitespace();
    let kind = RuleKind::parse(tokens.next()?);
    let first = tokens.next()?;
    if kind.is_internal() {
        return None;
    }

    // SPOOF and friends have no source column in this format; the remainder is the path.
    if kind.carries_source() {
        let mut rule = Rule::new(kind, first);
        rule.source = tokens.next().map(str::to_string);
        Some(rule)
    } else {
        let path = std::iter::once(first)
            .chain(tokens)
            .collect::<Vec<_>>()
            .join(" ");
        Some(Rule::new(kind, path))
    }
}

/// Parses one `hymofs list` output. Never fails: output that is not a JSON
/// array is read as the line format, and empty output is an empty listing.
/// Ownership flags are provisional here, see [`crate::core::reconcile`].
pub fn parse_rules(stdout: &str, user_paths: &HashSet<String>) -> Vec<Rule> {
    let mut rules = Listing::detect(stdout).into_rules();
    for rule in &mut rules {
        rule.is_user_defined = rule.owned_by(user_paths);
    }
    rules
}

/// Parses `hide list`: a JSON array of paths, or one absolute path per line.
pub fn parse_user_hide_rules(stdout: &str) -> Vec<String> {
    if let Ok(paths) = serde_json::from_str::<Vec<String>>(stdout) {
        return paths;
    }
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('/'))
        .map(str::to_string)
        .collect()
}
