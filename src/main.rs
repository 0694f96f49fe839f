// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use hymo_bridge::{
    api::{self, HymoApi, LogSource},
    conf::{
        config::Config,
        settings::{BackendKind, Settings},
    },
    core::{
        modules::ModuleMode,
        sync::{ConfigSync, FlushOutcome, SyncEvent},
    },
    utils,
};
use serde::Serialize;
use serde_json::{Value, json};

use cli::{Cli, Commands, ConfigAction, HideAction, ModuleAction};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.settings.as_deref())?;
    if cli.mock {
        settings.backend = BackendKind::Mock;
    }
    if let Some(binary) = &cli.binary {
        settings.binary = binary.clone();
    }
    Ok(settings)
}

/// Saves `config` through the synchronizer and describes the outcome.
async fn commit(
    api: Arc<dyn HymoApi>,
    loaded: Config,
    config: Config,
    settings: &Settings,
) -> Result<Value> {
    let (sync, mut events) = ConfigSync::spawn(api, loaded, settings.debounce());
    sync.edit(config);
    let outcome = sync.flush().await;
    sync.shutdown().await;

    while let Some(event) = events.recv().await {
        if let SyncEvent::LiveSettingFailed { setting, message } = event {
            log::warn!("Live setting {} not applied: {}", setting, message);
        }
    }

    Ok(match outcome.context("Failed to save config")? {
        FlushOutcome::Unchanged => json!({ "saved": false }),
        FlushOutcome::Saved(report) => json!({
            "saved": true,
            "failures": report.failures,
        }),
    })
}

async fn scan_partitions(api: Arc<dyn HymoApi>, settings: &Settings) -> Result<Value> {
    let loaded = api.load_config().await;
    let found = api.scan_partitions().await?;
    let mut config = loaded.clone();
    let added = config.partitions.union(found.iter().cloned());
    log::info!("{} new partition(s) out of {} reported", added, found.len());

    let partitions = config.partitions.clone();
    let save = if added > 0 {
        commit(api, loaded, config, settings).await?
    } else {
        json!({ "saved": false })
    };
    Ok(json!({
        "found": found,
        "added": added,
        "partitions": partitions,
        "save": save,
    }))
}

async fn handle_config(
    api: Arc<dyn HymoApi>,
    action: ConfigAction,
    settings: &Settings,
) -> Result<()> {
    match action {
        ConfigAction::Show => print_json(&api.load_config().await),
        ConfigAction::Gen { output } => {
            Config::default().save_to_file(&output)?;
            log::info!("Default config written to {}", output.display());
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let loaded = api.load_config().await;
            let config = loaded.with_field(&key, &value)?;
            print_json(&commit(api, loaded, config, settings).await?)
        }
        ConfigAction::ScanPartitions => print_json(&scan_partitions(api, settings).await?),
    }
}

async fn handle_modules(api: Arc<dyn HymoApi>, action: ModuleAction) -> Result<()> {
    match action {
        ModuleAction::List => print_json(&api.scan_modules().await),
        ModuleAction::Conflicts => print_json(&api.check_conflicts().await),
        ModuleAction::Mount { id } => {
            api.hot_mount(&id).await?;
            log::info!("Module {} mounted", id);
            Ok(())
        }
        ModuleAction::Unmount { id } => {
            api.hot_unmount(&id).await?;
            log::info!("Module {} unmounted", id);
            Ok(())
        }
        ModuleAction::SetMode { id, mode } => {
            let mut modules = api.scan_modules().await;
            let Some(module) = modules.iter_mut().find(|m| m.id == id) else {
                bail!("Module not found: {id}");
            };
            module.mode = ModuleMode::parse(&mode);
            api.save_modules(&modules).await?;
            log::info!("Mode of {} saved", id);
            Ok(())
        }
    }
}

async fn handle_hide(api: Arc<dyn HymoApi>, action: HideAction) -> Result<()> {
    match action {
        HideAction::List => print_json(&api.user_hide_rules().await),
        HideAction::Add { path } => {
            api.add_user_hide_rule(&path).await?;
            log::info!("Hide rule added: {}", path);
            Ok(())
        }
        HideAction::Remove { path } => {
            api.remove_user_hide_rule(&path).await?;
            log::info!("Hide rule removed: {}", path);
            Ok(())
        }
    }
}

async fn dispatch(cli: Cli, settings: Settings) -> Result<()> {
    let api = api::select_backend(&settings);

    match cli.command {
        Commands::Config { action } => handle_config(api, action, &settings).await,
        Commands::Modules { action } => handle_modules(api, action).await,
        Commands::Hide { action } => handle_hide(api, action).await,
        Commands::Rules => print_json(&api.all_rules().await),
        Commands::Storage => print_json(&api.storage_usage().await),
        Commands::System => print_json(&api.system_info().await),
        Commands::Logs {
            kernel,
            file,
            lines,
            clear,
        } => {
            if clear {
                api.clear_logs().await?;
                log::info!("Logs cleared");
                return Ok(());
            }
            let source = match (kernel, file) {
                (true, _) => LogSource::Kernel,
                (false, Some(path)) => LogSource::File(path),
                (false, None) => LogSource::default(),
            };
            print!("{}", api.read_logs(&source, lines).await?);
            Ok(())
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    let _log_guard = utils::init_logging(cli.verbose, settings.log_file.as_deref())?;
    log::debug!("Settings: {:?}", settings);

    dispatch(cli, settings).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        log::error!("Fatal Error: {:#}", e);
        eprintln!("Fatal Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn mock() -> Arc<dyn HymoApi> {
        Arc::new(api::MockApi)
    }

    #[tokio::test]
    async fn commit_describes_the_flush_outcome() {
        let settings = Settings::default();
        let loaded = mock().load_config().await;

        let unchanged = commit(mock(), loaded.clone(), loaded.clone(), &settings)
            .await
            .unwrap();
        assert_eq!(unchanged, json!({ "saved": false }));

        let mut config = loaded.clone();
        config.partitions.insert("odm");
        let saved = commit(mock(), loaded, config, &settings).await.unwrap();
        assert_eq!(saved, json!({ "saved": true, "failures": [] }));
    }

    #[tokio::test]
    async fn scan_partitions_is_a_single_document() {
        let out = scan_partitions(mock(), &Settings::default()).await.unwrap();
        assert_eq!(
            out,
            json!({
                "found": ["system", "product", "my_custom_partition"],
                "added": 2,
                "partitions": ["system", "vendor", "product", "my_custom_partition"],
                "save": { "saved": true, "failures": [] },
            })
        );
    }
}
