// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

//! Canned answers for running without a device.

use std::collections::HashSet;

use async_trait::async_trait;

use super::{HymoApi, LogSource, SaveReport};
use crate::{
    conf::config::Config,
    core::{
        modules::{ConflictEntry, Module, ModuleMode},
        partitions::{Partition, PartitionSet},
        reconcile,
        rules::{Rule, RuleKind},
        storage::StorageInfo,
        system::{MountStats, SystemInfo},
    },
    error::Result,
    utils,
};

const USER_HIDE_RULES: [&str; 2] = ["/data/adb/magisk", "/data/local/tmp/test_file"];

pub struct MockApi;

fn partition(name: &str, exists_as_symlink: bool) -> Partition {
    Partition {
        name: name.to_string(),
        mount_point: format!("/{name}"),
        fs_type: "ext4".to_string(),
        is_read_only: true,
        exists_as_symlink,
    }
}

#[async_trait]
impl HymoApi for MockApi {
    async fn load_config(&self) -> Config {
        Config {
            partitions: PartitionSet::from_iter(["system", "vendor"]),
            hymofs_available: true,
            ..Config::default()
        }
    }

    async fn save_config(&self, _config: &Config) -> Result<SaveReport> {
        log::info!("[mock] config saved");
        Ok(SaveReport::default())
    }

    async fn scan_modules(&self) -> Vec<Module> {
        vec![Module {
            id: "example_module".into(),
            name: "Example Module".into(),
            version: "1.0.0".into(),
            author: "Developer".into(),
            description: "A demo module for testing".into(),
            mode: ModuleMode::Auto,
            strategy: "overlay".into(),
            path: "/data/adb/modules/example_module".into(),
            rules: Vec::new(),
        }]
    }

    async fn save_modules(&self, modules: &[Module]) -> Result<()> {
        log::info!("[mock] {} module mode(s) saved", modules.len());
        Ok(())
    }

    async fn save_rules(&self, modules: &[Module]) -> Result<()> {
        log::info!("[mock] rules for {} module(s) saved", modules.len());
        Ok(())
    }

    async fn check_conflicts(&self) -> Vec<ConflictEntry> {
        Vec::new()
    }

    async fn hot_mount(&self, module_id: &str) -> Result<()> {
        utils::validate_module_id(module_id)?;
        log::info!("[mock] hot mount {}", module_id);
        Ok(())
    }

    async fn hot_unmount(&self, module_id: &str) -> Result<()> {
        utils::validate_module_id(module_id)?;
        log::info!("[mock] hot unmount {}", module_id);
        Ok(())
    }

    async fn sync_partitions(&self) -> Result<String> {
        Ok("Sync completed (mock)".to_string())
    }

    async fn scan_partitions(&self) -> Result<Vec<String>> {
        Ok(vec![
            "system".into(),
            "product".into(),
            "my_custom_partition".into(),
        ])
    }

    async fn read_logs(&self, _source: &LogSource, lines: usize) -> Result<String> {
        let sample = ["Sample log line 1", "Sample log line 2", "Sample log line 3"];
        let skip = sample.len().saturating_sub(lines);
        Ok(sample[skip..].join("\n"))
    }

    async fn clear_logs(&self) -> Result<()> {
        log::info!("[mock] logs cleared");
        Ok(())
    }

    async fn storage_usage(&self) -> StorageInfo {
        StorageInfo {
            size: "512M".into(),
            used: "128M".into(),
            avail: "384M".into(),
            percent: 25.0,
            mode: Some("tmpfs".into()),
        }
    }

    async fn system_info(&self) -> SystemInfo {
        SystemInfo {
            kernel: "5.15.0-hymo".into(),
            selinux: "Permissive".into(),
            mount_base: "/dev/hymofs".into(),
            hymofs_modules: vec!["example_module".into()],
            mount_stats: Some(MountStats {
                total_mounts: 45,
                successful_mounts: 44,
                failed_mounts: 1,
                tmpfs_created: 3,
                files_mounted: 20,
                dirs_mounted: 15,
                symlinks_created: 10,
                overlayfs_mounts: 0,
                success_rate: 97.8,
            }),
            detected_partitions: vec![
                partition("system", false),
                partition("vendor", true),
                partition("product", true),
                partition("odm", false),
            ],
            ..SystemInfo::default()
        }
    }

    async fn user_hide_rules(&self) -> Vec<String> {
        USER_HIDE_RULES.iter().map(|p| p.to_string()).collect()
    }

    async fn all_rules(&self) -> Vec<Rule> {
        let user: HashSet<String> = self.user_hide_rules().await.into_iter().collect();
        let rules = vec![
            Rule::new(RuleKind::Spoof, "uname").with_target("5.10.0"),
            Rule::new(RuleKind::Spoof, "uname").with_target("#1 SMP"),
            Rule::new(RuleKind::Hide, "/data/adb/magisk"),
            Rule::new(RuleKind::Hide, "/data/local/tmp/test_file"),
            Rule::new(RuleKind::Hide, "/system/app/EdXposed"),
            Rule::new(RuleKind::Hide, "/data/adb/modules/test/.hidden"),
            Rule::new(RuleKind::Merge, "/system/app")
                .with_source("/data/adb/modules/foo/system/app"),
        ];
        reconcile::reconcile(&user, rules)
    }

    async fn add_user_hide_rule(&self, path: &str) -> Result<()> {
        log::info!("[mock] add hide rule {}", path);
        Ok(())
    }

    async fn remove_user_hide_rule(&self, path: &str) -> Result<()> {
        log::info!("[mock] remove hide rule {}", path);
        Ok(())
    }
}
