// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

//! Debounced config persistence.
//!
//! Edits are sent to a single worker task that owns the config and the last
//! successfully saved snapshot. Each edit (re)arms a quiet-period timer; when
//! it fires the worker saves, unless nothing changed since the last save.
//! Edits arriving while a save is running queue up in the mailbox and start
//! the next cycle afterwards.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{self, Instant},
};

use crate::{
    api::{HymoApi, LiveSetting, SaveReport},
    conf::config::Config,
    error::{Error, Result},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Saved,
    Unchanged,
    SaveFailed(String),
    LiveSettingFailed {
        setting: LiveSetting,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Saved(SaveReport),
    Unchanged,
}

/// Events kept for a receiver that is not reading. Later ones are dropped.
pub const EVENT_BACKLOG: usize = 64;

enum SyncMsg {
    Edit(Box<Config>),
    Flush(oneshot::Sender<Result<FlushOutcome>>),
}

/// Handle to the sync worker. Dropping it cancels a pending save.
pub struct ConfigSync {
    mailbox: mpsc::UnboundedSender<SyncMsg>,
    worker: JoinHandle<()>,
}

impl ConfigSync {
    /// `initial` is taken as already persisted. At most [`EVENT_BACKLOG`]
    /// unread events are buffered on the returned receiver.
    pub fn spawn(
        api: Arc<dyn HymoApi>,
        initial: Config,
        delay: Duration,
    ) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::channel(EVENT_BACKLOG);

        let worker = Worker {
            api,
            events,
            current: initial.clone(),
            saved: initial,
        };
        let worker = tokio::spawn(worker.run(inbox, delay));

        (Self { mailbox, worker }, event_rx)
    }

    /// Replaces the config and restarts the quiet period.
    pub fn edit(&self, config: Config) {
        if self.mailbox.send(SyncMsg::Edit(Box::new(config))).is_err() {
            log::warn!("Config edit dropped: synchronizer has stopped");
        }
    }

    /// Saves now instead of waiting for the timer.
    pub async fn flush(&self) -> Result<FlushOutcome> {
        let (reply, answer) = oneshot::channel();
        self.mailbox
            .send(SyncMsg::Flush(reply))
            .map_err(|_| Error::SyncStopped)?;
        answer.await.map_err(|_| Error::SyncStopped)?
    }

    /// Stops the worker without writing anything still pending. A save that
    /// is already running completes first.
    pub async fn shutdown(self) {
        let Self { mailbox, worker } = self;
        drop(mailbox);
        if let Err(e) = worker.await {
            log::error!("Config sync worker failed: {}", e);
        }
    }
}

struct Worker {
    api: Arc<dyn HymoApi>,
    events: mpsc::Sender<SyncEvent>,
    current: Config,
    saved: Config,
}

impl Worker {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<SyncMsg>, delay: Duration) {
        let mut deadline: Option<Instant> = None;

        loop {
            let msg = match deadline {
                Some(at) => tokio::select! {
                    msg = inbox.recv() => msg,
                    _ = time::sleep_until(at) => {
                        deadline = None;
                        let _ = self.flush().await;
                        continue;
                    }
                },
                None => inbox.recv().await,
            };

            match msg {
                Some(SyncMsg::Edit(config)) => {
                    self.current = *config;
                    deadline = Some(Instant::now() + delay);
                }
                Some(SyncMsg::Flush(reply)) => {
                    deadline = None;
                    let _ = reply.send(self.flush().await);
                }
                None => {
                    if deadline.is_some() {
                        log::debug!("Config sync stopped with a pending save, discarding it");
                    }
                    break;
                }
            }
        }
    }

    fn emit(&self, event: SyncEvent) {
        if let Err(mpsc::error::TrySendError::Full(event)) = self.events.try_send(event) {
            log::debug!("Sync event backlog full, dropping {:?}", event);
        }
    }

    async fn flush(&mut self) -> Result<FlushOutcome> {
        if self.current == self.saved {
            log::debug!("Config unchanged, skipping save");
            self.emit(SyncEvent::Unchanged);
            return Ok(FlushOutcome::Unchanged);
        }

        match self.api.save_config(&self.current).await {
            Ok(report) => {
                self.saved = self.current.clone();
                self.emit(SyncEvent::Saved);
                for failure in &report.failures {
                    self.emit(SyncEvent::LiveSettingFailed {
                        setting: failure.setting,
                        message: failure.message.clone(),
                    });
                }
                Ok(FlushOutcome::Saved(report))
            }
            Err(e) => {
                // snapshot stays behind so the same payload is retried
                log::error!("Failed to save config: {}", e);
                self.emit(SyncEvent::SaveFailed(e.to_string()));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        api::LiveApi,
        bridge::{Bridge, CommandChannel, CommandOutput, testing::ScriptedBridge},
    };

    const BIN: &str = "hymod";
    const DELAY: Duration = Duration::from_secs(1);

    fn live(bridge: ScriptedBridge) -> (Arc<ScriptedBridge>, Arc<dyn HymoApi>) {
        let (bridge, channel) = bridge.into_channel();
        (bridge, Arc::new(LiveApi::new(channel, BIN)))
    }

    fn accepting() -> (Arc<ScriptedBridge>, Arc<dyn HymoApi>) {
        live(
            ScriptedBridge::new()
                .on_prefix("mkdir -p", CommandOutput::ok(""))
                .on_prefix(BIN, CommandOutput::ok("")),
        )
    }

    fn writes(bridge: &ScriptedBridge) -> Vec<String> {
        bridge
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("mkdir -p"))
            .collect()
    }

    fn with_release(release: &str) -> Config {
        Config {
            uname_release: release.to_string(),
            ..Config::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_coalesce_into_one_write() {
        let (bridge, api) = accepting();
        let (sync, mut events) = ConfigSync::spawn(api, Config::default(), DELAY);

        for i in 0..5 {
            sync.edit(with_release(&format!("5.10.{i}")));
            time::sleep(Duration::from_millis(200)).await;
        }
        assert!(writes(&bridge).is_empty());

        assert_eq!(events.recv().await, Some(SyncEvent::Saved));
        let written = writes(&bridge);
        assert_eq!(written.len(), 1);
        assert!(written[0].contains("5.10.4"));
        assert!(bridge.calls().contains(&format!("{BIN} debug set-uname '5.10.4' ''")));

        sync.shutdown().await;
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn equal_state_is_not_written_again() {
        let (bridge, api) = accepting();
        let (sync, mut events) = ConfigSync::spawn(api, Config::default(), DELAY);

        sync.edit(Config::default());
        assert_eq!(events.recv().await, Some(SyncEvent::Unchanged));

        sync.edit(with_release("6.1"));
        assert_eq!(events.recv().await, Some(SyncEvent::Saved));
        sync.edit(with_release("6.1"));
        assert_eq!(events.recv().await, Some(SyncEvent::Unchanged));

        assert_eq!(writes(&bridge).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_flush_skips_the_timer() {
        let (bridge, api) = accepting();
        let (sync, mut events) = ConfigSync::spawn(api, Config::default(), DELAY);

        sync.edit(with_release("6.1"));
        let outcome = sync.flush().await.unwrap();
        assert_eq!(outcome, FlushOutcome::Saved(SaveReport::default()));
        assert_eq!(events.recv().await, Some(SyncEvent::Saved));

        time::sleep(DELAY * 3).await;
        assert_eq!(sync.flush().await.unwrap(), FlushOutcome::Unchanged);
        assert_eq!(events.recv().await, Some(SyncEvent::Unchanged));
        assert_eq!(writes(&bridge).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_keeps_old_snapshot() {
        let (bridge, api) = live(
            ScriptedBridge::new().on_prefix("mkdir -p", CommandOutput::failed(1, "read-only")),
        );
        let (sync, mut events) = ConfigSync::spawn(api, Config::default(), DELAY);

        sync.edit(with_release("6.1"));
        assert_eq!(
            events.recv().await,
            Some(SyncEvent::SaveFailed("save config failed: read-only".into()))
        );

        // same payload, but it was never stored, so it is attempted again
        assert!(sync.flush().await.is_err());
        assert_eq!(writes(&bridge).len(), 2);
        assert!(bridge.calls().iter().all(|c| c.starts_with("mkdir -p")));
    }

    #[tokio::test(start_paused = true)]
    async fn refused_live_settings_are_reported_individually() {
        let (_, api) = live(
            ScriptedBridge::new()
                .on_prefix("mkdir -p", CommandOutput::ok(""))
                .on(format!("{BIN} debug stealth enable"), CommandOutput::failed(1, "no stealth"))
                .on_prefix(BIN, CommandOutput::ok("")),
        );
        let (sync, mut events) = ConfigSync::spawn(api, Config::default(), DELAY);

        sync.edit(Config {
            enable_stealth: true,
            ..Config::default()
        });
        assert_eq!(events.recv().await, Some(SyncEvent::Saved));
        assert_eq!(
            events.recv().await,
            Some(SyncEvent::LiveSettingFailed {
                setting: LiveSetting::Stealth,
                message: "no stealth".into(),
            })
        );
    }

    /// Config writes take `latency`; everything else answers at once.
    struct SlowStorage {
        inner: Arc<ScriptedBridge>,
        latency: Duration,
    }

    #[async_trait]
    impl Bridge for SlowStorage {
        async fn exec(&self, command: &str) -> Result<CommandOutput> {
            if command.starts_with("mkdir -p") {
                time::sleep(self.latency).await;
            }
            self.inner.exec(command).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn edit_during_a_save_is_written_afterwards() {
        let inner = Arc::new(
            ScriptedBridge::new()
                .on_prefix("mkdir -p", CommandOutput::ok(""))
                .on_prefix(BIN, CommandOutput::ok("")),
        );
        let storage = SlowStorage {
            inner: inner.clone(),
            latency: Duration::from_secs(5),
        };
        let api: Arc<dyn HymoApi> = Arc::new(LiveApi::new(
            CommandChannel::with_bridge(Arc::new(storage)),
            BIN,
        ));
        let (sync, mut events) = ConfigSync::spawn(api, Config::default(), DELAY);

        sync.edit(with_release("first"));
        // timer fired at 1s, the write runs until 6s
        time::sleep(Duration::from_secs(3)).await;
        assert!(writes(&inner).is_empty());
        sync.edit(with_release("second"));

        assert_eq!(events.recv().await, Some(SyncEvent::Saved));
        assert_eq!(events.recv().await, Some(SyncEvent::Saved));

        let written = writes(&inner);
        assert_eq!(written.len(), 2);
        assert!(written[0].contains("\"uname_release\": \"first\""));
        assert!(written[1].contains("\"uname_release\": \"second\""));
    }

    #[tokio::test(start_paused = true)]
    async fn unread_events_are_capped() {
        let (_, api) = accepting();
        let (sync, mut events) = ConfigSync::spawn(api, Config::default(), DELAY);

        for _ in 0..EVENT_BACKLOG + 10 {
            assert_eq!(sync.flush().await.unwrap(), FlushOutcome::Unchanged);
        }
        sync.shutdown().await;

        let mut received = 0;
        while let Some(event) = events.recv().await {
            assert_eq!(event, SyncEvent::Unchanged);
            received += 1;
        }
        assert_eq!(received, EVENT_BACKLOG);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_discards_pending_edit() {
        let (bridge, api) = accepting();
        let (sync, mut events) = ConfigSync::spawn(api, Config::default(), DELAY);

        sync.edit(with_release("6.1"));
        time::sleep(DELAY / 2).await;
        sync.shutdown().await;
        time::sleep(DELAY * 2).await;

        assert_eq!(events.recv().await, None);
        assert!(bridge.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels_too() {
        let (bridge, api) = accepting();
        let (sync, mut events) = ConfigSync::spawn(api, Config::default(), DELAY);

        sync.edit(with_release("6.1"));
        drop(sync);

        assert_eq!(events.recv().await, None);
        assert!(bridge.calls().is_empty());
    }
}
