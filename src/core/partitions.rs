// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

static ADDED_PARTITION_REGEX: OnceLock<Regex> = OnceLock::new();

/// A partition reported by the engine's system scan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Partition {
    pub name: String,
    pub mount_point: String,
    pub fs_type: String,
    pub is_read_only: bool,
    pub exists_as_symlink: bool,
}

/// Partition names without duplicates, in the order they were first added.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PartitionSet(Vec<String>);

impl PartitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `name` was already present or blank.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return false;
        }
        self.0.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|p| p == name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|p| p != name);
        self.0.len() != before
    }

    /// Adds every name not yet present and returns how many were new.
    pub fn union<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for name in names {
            if self.insert(name) {
                added += 1;
            }
        }
        added
    }

    /// Splits free text typed by a user: names separated by commas and/or whitespace.
    pub fn parse_user_input(input: &str) -> Vec<String> {
        input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for PartitionSet {
    fn from(names: Vec<String>) -> Self {
        let mut set = Self::new();
        set.union(names);
        set
    }
}

impl From<PartitionSet> for Vec<String> {
    fn from(set: PartitionSet) -> Self {
        set.0
    }
}

impl<S: Into<String>> FromIterator<S> for PartitionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

impl<S: Into<String>> Extend<S> for PartitionSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.union(iter);
    }
}

impl<'a> IntoIterator for &'a PartitionSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Collects every `Added partition: <name>` reported in a partition sync.
/// Finding nothing is a valid answer.
pub fn extract_partitions(output: &str) -> Vec<String> {
    let re = ADDED_PARTITION_REGEX
        .get_or_init(|| Regex::new(r"Added partition:\s*(\S+)").expect("Invalid Regex pattern"));

    let mut found = PartitionSet::new();
    for line in output.lines() {
        for caps in re.captures_iter(line) {
            if let Some(name) = caps.get(1) {
                found.insert(name.as_str());
            }
        }
    }
    found.into()
}
