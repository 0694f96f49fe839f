// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

//! Client side of the hymo rule engine: command channel, output parsers,
//! rule ownership reconciliation and debounced config persistence.

pub mod api;
pub mod bridge;
pub mod conf;
pub mod core;
pub mod defs;
pub mod error;
pub mod utils;

pub use error::{Error, Result};
