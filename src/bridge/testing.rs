// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use super::{Bridge, CommandChannel, CommandOutput};
use crate::error::{Error, Result};

#[derive(Clone)]
enum Reply {
    Output(CommandOutput),
    LaunchFailure,
}

/// In-memory bridge answering from a script and recording every command.
/// Unscripted commands exit 127.
#[derive(Default)]
pub struct ScriptedBridge {
    exact: HashMap<String, Reply>,
    prefixed: Vec<(String, Reply)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, command: impl Into<String>, output: CommandOutput) -> Self {
        self.exact.insert(command.into(), Reply::Output(output));
        self
    }

    pub fn on_prefix(mut self, prefix: impl Into<String>, output: CommandOutput) -> Self {
        self.prefixed.push((prefix.into(), Reply::Output(output)));
        self
    }

    pub fn launch_failure(mut self, command: impl Into<String>) -> Self {
        self.exact.insert(command.into(), Reply::LaunchFailure);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn into_channel(self) -> (Arc<Self>, CommandChannel) {
        let bridge = Arc::new(self);
        let channel = CommandChannel::with_bridge(bridge.clone());
        (bridge, channel)
    }
}

#[async_trait]
impl Bridge for ScriptedBridge {
    async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.to_string());

        let reply = self.exact.get(command).cloned().or_else(|| {
            self.prefixed
                .iter()
                .find(|(prefix, _)| command.starts_with(prefix.as_str()))
                .map(|(_, reply)| reply.clone())
        });

        match reply {
            Some(Reply::Output(out)) => Ok(out),
            Some(Reply::LaunchFailure) => Err(Error::Launch(std::io::Error::other(
                "scripted launch failure",
            ))),
            None => Ok(CommandOutput::failed(127, format!("not scripted: {command}"))),
        }
    }
}
