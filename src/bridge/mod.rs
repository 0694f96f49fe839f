// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

//! The privileged command channel.
//!
//! Every engine interaction is a single shell-style command string answered
//! with an exit code plus captured output. How that string reaches a
//! privileged shell is a [`Bridge`]; finding a bridge is a [`BridgeResolver`],
//! consulted once per [`CommandChannel`].

pub mod shell;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Stdout of a successful run that actually printed something.
    pub fn payload(&self) -> Option<&str> {
        (self.success() && !self.stdout.trim().is_empty()).then_some(self.stdout.as_str())
    }

    /// Stderr if present, otherwise `fallback`. Used for domain error messages.
    pub fn error_message(&self, fallback: &str) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            fallback.to_string()
        } else {
            stderr.to_string()
        }
    }
}

#[async_trait]
pub trait Bridge: Send + Sync {
    /// Runs one command. `Err` only for transport problems; a non-zero exit
    /// code is a successful `Ok`.
    async fn exec(&self, command: &str) -> Result<CommandOutput>;
}

pub trait BridgeResolver: Send + Sync {
    fn resolve(&self) -> Option<Arc<dyn Bridge>>;
}

impl<F> BridgeResolver for F
where
    F: Fn() -> Option<Arc<dyn Bridge>> + Send + Sync,
{
    fn resolve(&self) -> Option<Arc<dyn Bridge>> {
        self()
    }
}

/// Resolver for hosts without any privileged bridge.
pub struct NoBridge;

impl BridgeResolver for NoBridge {
    fn resolve(&self) -> Option<Arc<dyn Bridge>> {
        None
    }
}

/// Resolves its bridge on first use and keeps the answer, including "none",
/// for the rest of its lifetime.
pub struct CommandChannel {
    resolver: Box<dyn BridgeResolver>,
    bridge: OnceLock<Option<Arc<dyn Bridge>>>,
}

impl CommandChannel {
    pub fn new(resolver: impl BridgeResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            bridge: OnceLock::new(),
        }
    }

    pub fn with_bridge(bridge: Arc<dyn Bridge>) -> Self {
        let channel = Self::new(NoBridge);
        let _ = channel.bridge.set(Some(bridge));
        channel
    }

    fn bridge(&self) -> Option<&Arc<dyn Bridge>> {
        self.bridge
            .get_or_init(|| {
                let bridge = self.resolver.resolve();
                if bridge.is_none() {
                    log::warn!("No privileged bridge available, engine commands disabled");
                }
                bridge
            })
            .as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.bridge().is_some()
    }

    pub async fn execute(&self, command: &str) -> Result<CommandOutput> {
        let bridge = self.bridge().ok_or(Error::BridgeUnavailable)?;
        log::debug!("exec: {}", command);
        let output = bridge.exec(command).await?;
        if !output.success() {
            log::debug!(
                "exit {} from `{}`: {}",
                output.exit_code,
                command,
                output.stderr.trim()
            );
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{testing::ScriptedBridge, *};

    #[tokio::test]
    async fn resolver_runs_once_and_is_reused() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let bridge = Arc::new(ScriptedBridge::new().on("echo hi", CommandOutput::ok("hi\n")));
        let channel = CommandChannel::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(bridge.clone() as Arc<dyn Bridge>)
        });

        for _ in 0..3 {
            let out = channel.execute("echo hi").await.unwrap();
            assert_eq!(out.stdout, "hi\n");
        }
        assert!(channel.is_available());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_bridge_is_cached_and_reported_as_transport() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let channel = CommandChannel::new(move || -> Option<Arc<dyn Bridge>> {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });

        let err = channel.execute("true").await.unwrap_err();
        assert!(err.is_transport());
        assert!(!channel.is_available());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_zero_exit_is_not_an_error() {
        let bridge = ScriptedBridge::new().on("false", CommandOutput::failed(1, "nope"));
        let channel = CommandChannel::with_bridge(Arc::new(bridge));
        let out = channel.execute("false").await.unwrap();
        assert!(!out.success());
        assert_eq!(out.payload(), None);
        assert_eq!(out.error_message("fallback"), "nope");
    }
}
