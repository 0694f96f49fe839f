// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    fs::{self, OpenOptions, create_dir_all},
    io::Write,
    path::Path,
    sync::OnceLock,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use regex_lite::Regex;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

use crate::error::Error;

static MODULE_ID_REGEX: OnceLock<Regex> = OnceLock::new();

/// Installs the global subscriber. `log` records are forwarded into it, so
/// library code keeps using the `log` macros.
///
/// The returned guard flushes the file writer on drop and must outlive `main`'s work.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_log::LogTracer::init().context("Failed to bridge log records into tracing")?;

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let mut guard = None;
    let file_layer = match log_file.and_then(|p| Some((p.parent()?, p.file_name()?))) {
        Some((dir, name)) => match open_log_appender(dir, name) {
            Ok(appender) => {
                let (writer, g) = tracing_appender::non_blocking(appender);
                guard = Some(g);
                Some(fmt::layer().with_writer(writer).with_ansi(false))
            }
            Err(e) => {
                eprintln!("Log file disabled: {:#}", e);
                None
            }
        },
        None => None,
    };

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer);

    #[cfg(target_os = "android")]
    let registry = registry.with(tracing_android::layer("hymo").ok());

    tracing::subscriber::set_global_default(registry)
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn open_log_appender(dir: &Path, name: &std::ffi::OsStr) -> Result<RollingFileAppender> {
    ensure_dir_exists(dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy().as_ref())
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

/// 原子性写入文件，包含清理守卫
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir_exists(dir)?;

    let temp_name = format!(
        ".hymo_tmp_{}_{}.tmp",
        std::process::id(),
        SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos()
    );
    let temp_file = dir.join(temp_name);

    // 清理守卫：如果函数中途出错，自动删除临时文件
    struct CleanupGuard<'a>(&'a Path);
    impl Drop for CleanupGuard<'_> {
        fn drop(&mut self) {
            let _ = fs::remove_file(self.0);
        }
    }
    let guard = CleanupGuard(&temp_file);

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_file)
            .context("Failed to create temporary file for atomic write")?;
        file.write_all(content.as_ref())?;
        file.sync_all()?;
    }

    fs::rename(&temp_file, path).context("Failed to rename atomic temporary file")?;
    std::mem::forget(guard);
    Ok(())
}

pub fn ensure_dir_exists<T: AsRef<Path>>(dir: T) -> Result<()> {
    if !dir.as_ref().exists() {
        create_dir_all(&dir)?;
    }
    Ok(())
}

fn module_id_regex() -> &'static Regex {
    MODULE_ID_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("Invalid Regex pattern"))
}

pub fn is_valid_module_id(module_id: &str) -> bool {
    module_id_regex().is_match(module_id)
}

pub fn validate_module_id(module_id: &str) -> crate::Result<()> {
    if is_valid_module_id(module_id) {
        Ok(())
    } else {
        Err(Error::InvalidModuleId(module_id.to_string()))
    }
}

/// Wraps `payload` in single quotes for `sh`, replacing each embedded `'`
/// with `'\''`.
pub fn shell_quote(payload: &str) -> String {
    format!("'{}'", payload.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_quote_escapes_embedded_quotes() {
        assert_eq!(shell_quote("5.10.0"), "'5.10.0'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn module_ids_are_restricted() {
        assert!(is_valid_module_id("example_module"));
        assert!(is_valid_module_id("zygisk-next.v2"));
        assert!(!is_valid_module_id(""));
        assert!(!is_valid_module_id("bad id"));
        assert!(!is_valid_module_id("a\"; rm -rf /"));
        assert!(matches!(
            validate_module_id("../etc"),
            Err(Error::InvalidModuleId(_))
        ));
    }

    #[test]
    fn atomic_write_creates_parent_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/config.json");

        atomic_write(&target, "first").unwrap();
        atomic_write(&target, "second").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with(".hymo_tmp_"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
