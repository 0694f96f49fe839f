// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod modules;
pub mod partitions;
pub mod reconcile;
pub mod rules;
pub mod storage;
pub mod sync;
pub mod system;
