use crate::core::conflict::ConflictPolicy;
use crate::core::error::SyncError;
use crate::core::executor::{ActionExecutor, RegistryUpdate};
use crate::core::observer::{SyncEventKind, SyncObserver};
use crate::core::reconciler::{
    self, ActionKind, DecisionSummary, Side, SyncAction, SyncDecision,
};
use crate::core::registry::Registry;
use crate::core::scanner::{FileScanner, ScanConfig, Snapshot};
use crate::storage::Storage;
use futures::future::join_all;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info, warn};

/// 同步配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 最大并发动作数
    pub max_concurrent_actions: usize,
    /// 扫描配置
    pub scan_config: ScanConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_actions: 4,
            scan_config: ScanConfig::default(),
        }
    }
}

/// 同步结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Completed,
    Failed,
    Cancelled,
}

/// 同步报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub run_id: String,
    pub profile: String,
    pub start_time: i64,
    pub end_time: i64,
    pub status: SyncStatus,
    pub files_scanned: u32,
    pub files_copied: u32,
    pub files_deleted: u32,
    pub files_skipped: u32,
    pub conflicts_resolved: u32,
    pub conflicts_skipped: Vec<String>,
    pub files_failed: u32,
    pub bytes_transferred: u64,
    pub duration: u64,
    pub errors: Vec<String>,
}

/// 为判定生成带时间戳保留的复制动作；来源侧不在快照中返回 None
fn copy_from(side: Side, snapshot: &Snapshot, path: &str) -> Option<SyncAction> {
    let info = snapshot.get(path)?;
    Some(SyncAction {
        path: path.to_string(),
        kind: ActionKind::Copy {
            source: side,
            modified_time: info.modified_time,
            size: info.size,
            preserve_timestamp: true,
        },
    })
}

/// 执行统计
#[derive(Debug, Default)]
struct ActionStats {
    files_copied: AtomicU64,
    files_deleted: AtomicU64,
    files_failed: AtomicU64,
    bytes_transferred: AtomicU64,
}

/// 同步引擎
///
/// 所有依赖（两侧存储、冲突策略、事件接收器）都显式注入，
/// 不依赖任何进程级单例。
pub struct SyncEngine {
    storage_a: Arc<dyn Storage>,
    storage_b: Arc<dyn Storage>,
    policy: Arc<dyn ConflictPolicy>,
    observers: Vec<Arc<dyn SyncObserver>>,
    config: EngineConfig,
    cancelled: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(
        storage_a: Arc<dyn Storage>,
        storage_b: Arc<dyn Storage>,
        policy: Arc<dyn ConflictPolicy>,
    ) -> Self {
        Self::with_config(storage_a, storage_b, policy, EngineConfig::default())
    }

    pub fn with_config(
        storage_a: Arc<dyn Storage>,
        storage_b: Arc<dyn Storage>,
        policy: Arc<dyn ConflictPolicy>,
        config: EngineConfig,
    ) -> Self {
        Self {
            storage_a,
            storage_b,
            policy,
            observers: Vec::new(),
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn register_observer(&mut self, observer: Arc<dyn SyncObserver>) {
        self.observers.push(observer);
    }

    /// 取消标志，供外部（如 ctrl-c 处理）触发
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn notify(&self, kind: SyncEventKind, description: &str) {
        for observer in &self.observers {
            observer.on_event(kind, description);
        }
    }

    /// 并行扫描两侧目录树
    async fn scan_both(&self) -> Result<(Snapshot, Snapshot), SyncError> {
        // 两侧根目录都不存在说明配置有误，在任何改动前中止
        let a_exists = self.storage_a.root_exists().await.unwrap_or(false);
        let b_exists = self.storage_b.root_exists().await.unwrap_or(false);
        if !a_exists && !b_exists {
            return Err(SyncError::Scan {
                side: format!("{} / {}", self.storage_a.name(), self.storage_b.name()),
                message: "两侧根目录均不存在".to_string(),
            });
        }

        let scanner_a =
            FileScanner::with_cancel(self.config.scan_config.clone(), self.cancelled.clone());
        let scanner_b =
            FileScanner::with_cancel(self.config.scan_config.clone(), self.cancelled.clone());

        // 两次扫描互相独立，各自只写自己的快照
        let (snapshot_a, snapshot_b) = tokio::join!(
            scanner_a.scan_storage(self.storage_a.as_ref()),
            scanner_b.scan_storage(self.storage_b.as_ref()),
        );

        Ok((snapshot_a?, snapshot_b?))
    }

    /// 只扫描与判定，不执行任何动作，基线不变
    pub async fn analyze(
        &self,
        registry: &Registry,
    ) -> Result<(Vec<(String, SyncDecision)>, DecisionSummary), SyncError> {
        let (snapshot_a, snapshot_b) = self.scan_both().await?;
        let decisions = reconciler::reconcile(&snapshot_a, &snapshot_b, registry);
        let summary = DecisionSummary::of(&decisions);
        Ok((decisions, summary))
    }

    /// 运行一次完整同步
    ///
    /// 基线在内存中按成功的动作更新；取消的运行不改动基线，
    /// 由调用方决定何时持久化。
    pub async fn run(
        &self,
        profile_name: &str,
        registry: &mut Registry,
    ) -> Result<SyncReport, SyncError> {
        let start_time = chrono::Utc::now().timestamp();
        let run_id = uuid::Uuid::new_v4().to_string();

        info!("开始同步: {} (运行 {})", profile_name, run_id);
        self.cancelled.store(false, Ordering::SeqCst);

        let (snapshot_a, snapshot_b) = self.scan_both().await?;
        let files_scanned = (snapshot_a.len() + snapshot_b.len()) as u32;

        let decisions = reconciler::reconcile(&snapshot_a, &snapshot_b, registry);
        let summary = DecisionSummary::of(&decisions);

        debug!(
            "判定完成: 新增 A/B {}/{}, 更新 A/B {}/{}, 删除 A/B {}/{}, 冲突 {}, 未变化 {}",
            summary.new_on_a,
            summary.new_on_b,
            summary.modified_on_a,
            summary.modified_on_b,
            summary.deleted_on_a,
            summary.deleted_on_b,
            summary.conflicts,
            summary.no_change
        );

        // 先解决全部冲突再批量执行，交互式询问不会阻塞其他路径的动作
        let (actions, conflicts_resolved, conflicts_skipped) =
            self.translate_decisions(&decisions, &snapshot_a, &snapshot_b);

        if self.is_cancelled() {
            return Ok(self.build_report(
                run_id,
                profile_name,
                start_time,
                SyncStatus::Cancelled,
                files_scanned,
                &summary,
                0,
                0,
                0,
                0,
                conflicts_resolved,
                conflicts_skipped,
                vec!["同步已取消".to_string()],
            ));
        }

        let (files_copied, files_deleted, files_failed, bytes_transferred, updates, errors) =
            self.execute_actions(actions).await;

        // 单一写入方：所有动作结束后统一施加基线变更；
        // 取消的运行保持基线为运行前状态
        if !self.is_cancelled() {
            for update in updates {
                match update {
                    RegistryUpdate::Set {
                        path,
                        modified_time,
                    } => registry.set(path, modified_time),
                    RegistryUpdate::Remove { path } => registry.remove(&path),
                }
            }
        }

        let status = if self.is_cancelled() {
            SyncStatus::Cancelled
        } else if files_failed > 0 {
            SyncStatus::Failed
        } else {
            SyncStatus::Completed
        };

        info!(
            "同步完成: {} - 复制 {}, 删除 {}, 跳过 {}, 失败 {}",
            profile_name, files_copied, files_deleted, summary.no_change, files_failed
        );

        Ok(self.build_report(
            run_id,
            profile_name,
            start_time,
            status,
            files_scanned,
            &summary,
            files_copied,
            files_deleted,
            files_failed,
            bytes_transferred,
            conflicts_resolved,
            conflicts_skipped,
            errors,
        ))
    }

    /// 把判定翻译为动作；冲突路径经策略转为带时间戳保留的复制
    fn translate_decisions(
        &self,
        decisions: &[(String, SyncDecision)],
        snapshot_a: &Snapshot,
        snapshot_b: &Snapshot,
    ) -> (Vec<SyncAction>, u32, Vec<String>) {
        let mut actions = Vec::new();
        let mut conflicts_resolved = 0u32;
        let mut conflicts_skipped = Vec::new();

        for (path, decision) in decisions {
            let action = match decision {
                SyncDecision::NoChange => continue,
                SyncDecision::NewOnA => {
                    self.notify(SyncEventKind::Copy, &format!("A -> B: {}", path));
                    copy_from(Side::A, snapshot_a, path)
                }
                SyncDecision::NewOnB => {
                    self.notify(SyncEventKind::Copy, &format!("B -> A: {}", path));
                    copy_from(Side::B, snapshot_b, path)
                }
                SyncDecision::ModifiedOnA => {
                    self.notify(SyncEventKind::Update, &format!("A -> B: {}", path));
                    copy_from(Side::A, snapshot_a, path)
                }
                SyncDecision::ModifiedOnB => {
                    self.notify(SyncEventKind::Update, &format!("B -> A: {}", path));
                    copy_from(Side::B, snapshot_b, path)
                }
                SyncDecision::DeletedOnA => {
                    // A 侧已删除，传播到 B
                    self.notify(SyncEventKind::Delete, &format!("B: {}", path));
                    Some(SyncAction {
                        path: path.clone(),
                        kind: ActionKind::Delete { target: Side::B },
                    })
                }
                SyncDecision::DeletedOnB => {
                    self.notify(SyncEventKind::Delete, &format!("A: {}", path));
                    Some(SyncAction {
                        path: path.clone(),
                        kind: ActionKind::Delete { target: Side::A },
                    })
                }
                SyncDecision::Conflict => {
                    match self
                        .policy
                        .resolve(path, snapshot_a.get(path), snapshot_b.get(path))
                    {
                        Ok(choice) => {
                            let side = choice.side();
                            let snapshot = match side {
                                Side::A => snapshot_a,
                                Side::B => snapshot_b,
                            };
                            match copy_from(side, snapshot, path) {
                                Some(action) => {
                                    self.notify(
                                        SyncEventKind::ResolveConflict,
                                        &format!("{} -> {}: {}", side, side.other(), path),
                                    );
                                    conflicts_resolved += 1;
                                    Some(action)
                                }
                                None => {
                                    // 选择了不存在的一侧，按策略失败处理
                                    warn!("冲突选择的 {} 侧不存在: {}", side, path);
                                    conflicts_skipped.push(path.clone());
                                    None
                                }
                            }
                        }
                        Err(e) => {
                            warn!("{}", e);
                            conflicts_skipped.push(path.clone());
                            None
                        }
                    }
                }
            };

            if let Some(action) = action {
                actions.push(action);
            }
        }

        // 按操作类型和路径排序，保证执行顺序一致
        actions.sort_by(|a, b| {
            let order = |action: &SyncAction| match action.kind {
                ActionKind::Copy { .. } => 0,
                ActionKind::Delete { .. } => 1,
            };
            order(a).cmp(&order(b)).then_with(|| a.path.cmp(&b.path))
        });

        (actions, conflicts_resolved, conflicts_skipped)
    }

    /// 并行执行动作，收集统计、基线变更与错误
    async fn execute_actions(
        &self,
        actions: Vec<SyncAction>,
    ) -> (u32, u32, u32, u64, Vec<RegistryUpdate>, Vec<String>) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_actions));
        let stats = Arc::new(ActionStats::default());
        let updates = Arc::new(RwLock::new(Vec::<RegistryUpdate>::new()));
        let errors = Arc::new(RwLock::new(Vec::<String>::new()));
        let executor = Arc::new(ActionExecutor::new(
            self.storage_a.clone(),
            self.storage_b.clone(),
        ));

        let mut handles = Vec::new();

        for action in actions {
            if self.is_cancelled() {
                break;
            }

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };
            let executor = executor.clone();
            let stats = stats.clone();
            let updates = updates.clone();
            let errors = errors.clone();

            let handle = tokio::spawn(async move {
                match executor.apply(&action).await {
                    Ok(outcome) => {
                        if outcome.deleted {
                            stats.files_deleted.fetch_add(1, Ordering::Relaxed);
                        } else {
                            stats.files_copied.fetch_add(1, Ordering::Relaxed);
                        }
                        stats
                            .bytes_transferred
                            .fetch_add(outcome.bytes, Ordering::Relaxed);

                        let mut list = updates.write().await;
                        list.push(outcome.update);
                    }
                    Err(e) => {
                        // 失败路径不产生基线变更，下次运行重新评估
                        stats.files_failed.fetch_add(1, Ordering::Relaxed);
                        let mut list = errors.write().await;
                        list.push(e.to_string());
                    }
                }

                drop(permit);
            });

            handles.push(handle);
        }

        join_all(handles).await;

        let files_copied = stats.files_copied.load(Ordering::Relaxed) as u32;
        let files_deleted = stats.files_deleted.load(Ordering::Relaxed) as u32;
        let files_failed = stats.files_failed.load(Ordering::Relaxed) as u32;
        let bytes_transferred = stats.bytes_transferred.load(Ordering::Relaxed);

        let updates = updates.read().await.clone();
        let errors = errors.read().await.clone();

        (
            files_copied,
            files_deleted,
            files_failed,
            bytes_transferred,
            updates,
            errors,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build_report(
        &self,
        run_id: String,
        profile: &str,
        start_time: i64,
        status: SyncStatus,
        files_scanned: u32,
        summary: &DecisionSummary,
        files_copied: u32,
        files_deleted: u32,
        files_failed: u32,
        bytes_transferred: u64,
        conflicts_resolved: u32,
        conflicts_skipped: Vec<String>,
        errors: Vec<String>,
    ) -> SyncReport {
        let end_time = chrono::Utc::now().timestamp();
        SyncReport {
            run_id,
            profile: profile.to_string(),
            start_time,
            end_time,
            status,
            files_scanned,
            files_copied,
            files_deleted,
            files_skipped: summary.no_change as u32,
            conflicts_resolved,
            conflicts_skipped,
            files_failed,
            bytes_transferred,
            duration: (end_time - start_time) as u64,
            errors,
        }
    }
}
