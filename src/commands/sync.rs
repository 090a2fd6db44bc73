use crate::core::conflict::ConflictMode;
use crate::core::observer::ConsoleObserver;
use crate::core::registry::{RegistryFormat, RegistryStore};
use crate::core::scanner::ScanConfig;
use crate::core::{EngineConfig, SyncDecision, SyncEngine, SyncStatus};
use crate::profile::ProfileStore;
use crate::storage::create_storage;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// sync 命令参数
pub struct SyncArgs {
    pub profile: String,
    pub format: String,
    pub conflicts: String,
    pub jobs: Option<usize>,
    pub dry_run: bool,
}

/// 运行一次同步；返回是否有未恢复的失败（决定进程退出码）
pub async fn run(profiles: &ProfileStore, data_dir: &Path, args: SyncArgs) -> Result<bool> {
    let format: RegistryFormat = args
        .format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let mode: ConflictMode = args
        .conflicts
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let profile = profiles
        .load(&args.profile)?
        .with_context(|| format!("profile 不存在: {}", args.profile))?;

    let storage_a = create_storage(&profile.path_a)?;
    let storage_b = create_storage(&profile.path_b)?;

    let registry_store = RegistryStore::new(data_dir);
    let mut registry = registry_store.load(&profile.name, format)?;

    let mut config = EngineConfig {
        scan_config: ScanConfig {
            exclude_patterns: profile.exclude_patterns.clone(),
        },
        ..Default::default()
    };
    if let Some(jobs) = args.jobs {
        config.max_concurrent_actions = jobs.max(1);
    }

    let mut engine = SyncEngine::with_config(storage_a, storage_b, mode.into_policy(), config);
    engine.register_observer(Arc::new(ConsoleObserver));

    if args.dry_run {
        let (decisions, summary) = engine.analyze(&registry).await?;

        for (path, decision) in &decisions {
            let line = match decision {
                SyncDecision::NoChange => continue,
                SyncDecision::NewOnA => format!("复制 A -> B: {}", path),
                SyncDecision::NewOnB => format!("复制 B -> A: {}", path),
                SyncDecision::ModifiedOnA => format!("更新 A -> B: {}", path),
                SyncDecision::ModifiedOnB => format!("更新 B -> A: {}", path),
                SyncDecision::DeletedOnA => format!("删除 B: {}", path),
                SyncDecision::DeletedOnB => format!("删除 A: {}", path),
                SyncDecision::Conflict => format!("冲突: {}", path),
            };
            println!("[预览] {}", line);
        }

        println!(
            "预览完成: 新增 {}, 更新 {}, 删除 {}, 冲突 {}, 未变化 {}",
            summary.new_on_a + summary.new_on_b,
            summary.modified_on_a + summary.modified_on_b,
            summary.deleted_on_a + summary.deleted_on_b,
            summary.conflicts,
            summary.no_change
        );
        return Ok(false);
    }

    // ctrl-c 触发取消；运行结束后撤掉处理任务
    let cancel_flag = engine.cancel_flag();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，正在取消同步...");
            cancel_flag.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    });

    let report = engine.run(&profile.name, &mut registry).await?;
    ctrl_c.abort();

    // 取消的运行保持基线为运行前状态，不落盘
    if report.status != SyncStatus::Cancelled {
        registry_store.save(&registry, &profile.name, format)?;
    }

    println!(
        "同步完成: {} - 复制 {}, 删除 {}, 跳过 {}, 冲突解决 {}, 失败 {} ({} 字节, {} 秒)",
        profile.name,
        report.files_copied,
        report.files_deleted,
        report.files_skipped,
        report.conflicts_resolved,
        report.files_failed,
        report.bytes_transferred,
        report.duration
    );

    for path in &report.conflicts_skipped {
        println!("冲突未解决（已跳过）: {}", path);
    }
    for error in &report.errors {
        eprintln!("失败: {}", error);
    }

    Ok(report.files_failed > 0)
}
