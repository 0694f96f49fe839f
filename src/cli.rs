// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hymo_bridge::{conf::config::CONFIG_FILE_DEFAULT, defs};

#[derive(Parser, Debug)]
#[command(name = "hymo-bridge", version, about = "Client for the hymo rule engine")]
pub struct Cli {
    #[arg(short = 's', long = "settings")]
    pub settings: Option<PathBuf>,
    /// Answer from built-in sample data instead of the device
    #[arg(long = "mock")]
    pub mock: bool,
    #[arg(short = 'b', long = "binary")]
    pub binary: Option<PathBuf>,
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    Modules {
        #[command(subcommand)]
        action: ModuleAction,
    },
    /// User hide rules
    Hide {
        #[command(subcommand)]
        action: HideAction,
    },
    /// All active rules, with user-owned hide rules marked
    Rules,
    Storage,
    System,
    Logs {
        /// HymoFS lines from dmesg instead of the daemon log
        #[arg(long = "kernel")]
        kernel: bool,
        #[arg(short = 'f', long = "file", conflicts_with = "kernel")]
        file: Option<PathBuf>,
        #[arg(short = 'n', long = "lines", default_value_t = defs::DEFAULT_LOG_LINES)]
        lines: usize,
        #[arg(long = "clear", conflicts_with_all = ["kernel", "file"])]
        clear: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    Show,
    /// Write a default config file
    Gen {
        #[arg(short = 'o', long = "output", default_value = CONFIG_FILE_DEFAULT)]
        output: PathBuf,
    },
    /// Change one field and save, e.g. `set enable_stealth true`
    Set { key: String, value: String },
    /// Sync partitions and add any newly reported ones to the config
    ScanPartitions,
}

#[derive(Subcommand, Debug)]
pub enum ModuleAction {
    List,
    Conflicts,
    Mount { id: String },
    Unmount { id: String },
    SetMode { id: String, mode: String },
}

#[derive(Subcommand, Debug)]
pub enum HideAction {
    List,
    Add { path: String },
    Remove { path: String },
}
