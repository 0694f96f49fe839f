// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    env,
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use async_trait::async_trait;
use tokio::process::Command;

use super::{Bridge, BridgeResolver, CommandOutput};
use crate::error::{Error, Result};

/// Runs commands as `<program> -c <command>`: a root shell, or `su -c`.
pub struct ShellBridge {
    program: PathBuf,
}

impl ShellBridge {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Bridge for ShellBridge {
    async fn exec(&self, command: &str) -> Result<CommandOutput> {
        let output = Command::new(&self.program)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(Error::Launch)?;

        Ok(CommandOutput {
            // Killed by a signal
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

pub struct ShellResolver {
    program: PathBuf,
}

impl ShellResolver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl BridgeResolver for ShellResolver {
    fn resolve(&self) -> Option<Arc<dyn Bridge>> {
        let program = find_program(&self.program)?;
        log::info!("Privileged bridge: {}", program.display());
        Some(Arc::new(ShellBridge::new(program)))
    }
}

/// Bare names are looked up on `PATH`; anything with a separator must exist as given.
fn find_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|candidate| candidate.is_file())
    })
}
