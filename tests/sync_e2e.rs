//! 端到端同步场景测试
//!
//! 在临时目录上运行完整引擎，覆盖新增传播、删除传播、冲突解决、
//! 幂等性与预览模式。

use foldersync::core::conflict::{PreferSidePolicy, SkipPolicy};
use foldersync::core::registry::{Registry, RegistryFormat, RegistryStore};
use foldersync::core::reconciler::Side;
use foldersync::core::{EngineConfig, ScanConfig, SyncEngine, SyncStatus};
use foldersync::storage::create_storage;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

/// 写入文件并固定其修改时间（Unix 秒）
fn write_file(root: &Path, rel: &str, content: &str, mtime: i64) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    set_mtime(root, rel, mtime);
}

fn set_mtime(root: &Path, rel: &str, mtime: i64) {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(root.join(rel))
        .unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(mtime as u64))
        .unwrap();
}

fn mtime_of(root: &Path, rel: &str) -> i64 {
    std::fs::metadata(root.join(rel))
        .unwrap()
        .modified()
        .unwrap()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn engine_for(
    root_a: &Path,
    root_b: &Path,
    policy: Arc<dyn foldersync::core::conflict::ConflictPolicy>,
) -> SyncEngine {
    let storage_a = create_storage(root_a.to_str().unwrap()).unwrap();
    let storage_b = create_storage(root_b.to_str().unwrap()).unwrap();
    SyncEngine::with_config(
        storage_a,
        storage_b,
        policy,
        EngineConfig {
            max_concurrent_actions: 2,
            scan_config: ScanConfig::default(),
        },
    )
}

#[tokio::test]
async fn new_file_on_a_is_copied_to_b_and_registered() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    write_file(dir_a.path(), "file.txt", "hello", 100);

    let engine = engine_for(dir_a.path(), dir_b.path(), Arc::new(SkipPolicy));
    let mut registry = Registry::new();

    let report = engine.run("t", &mut registry).await.unwrap();

    assert_eq!(report.status, SyncStatus::Completed);
    assert_eq!(report.files_copied, 1);
    assert_eq!(
        std::fs::read_to_string(dir_b.path().join("file.txt")).unwrap(),
        "hello"
    );
    // 时间戳保留，基线记录来源侧的修改时间
    assert_eq!(mtime_of(dir_b.path(), "file.txt"), 100);
    assert_eq!(registry.get("file.txt"), Some(100));
}

#[tokio::test]
async fn nested_paths_keep_forward_slash_keys() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    write_file(dir_a.path(), "docs/2024/notes.md", "x", 50);

    let engine = engine_for(dir_a.path(), dir_b.path(), Arc::new(SkipPolicy));
    let mut registry = Registry::new();
    engine.run("t", &mut registry).await.unwrap();

    assert!(dir_b.path().join("docs/2024/notes.md").exists());
    assert_eq!(registry.get("docs/2024/notes.md"), Some(50));
}

#[tokio::test]
async fn matching_baseline_propagates_deletion() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    // 基线记录 file.txt @100；A 侧保持不变，B 侧已删除
    write_file(dir_a.path(), "file.txt", "old", 100);
    let mut registry = Registry::new();
    registry.set("file.txt", 100);

    let engine = engine_for(dir_a.path(), dir_b.path(), Arc::new(SkipPolicy));
    let report = engine.run("t", &mut registry).await.unwrap();

    // 删除传播到 A，基线记录移除
    assert_eq!(report.files_deleted, 1);
    assert!(!dir_a.path().join("file.txt").exists());
    assert_eq!(registry.get("file.txt"), None);
}

#[tokio::test]
async fn diverged_baseline_with_missing_side_is_conflict() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    // A 侧在上次同步后又被修改过，B 侧删除 -> 冲突而不是盲目删除
    write_file(dir_a.path(), "file.txt", "edited", 150);
    let mut registry = Registry::new();
    registry.set("file.txt", 100);

    let engine = engine_for(dir_a.path(), dir_b.path(), Arc::new(SkipPolicy));
    let report = engine.run("t", &mut registry).await.unwrap();

    assert_eq!(report.conflicts_skipped, vec!["file.txt".to_string()]);
    // 跳过的冲突不动文件也不动基线
    assert!(dir_a.path().join("file.txt").exists());
    assert_eq!(registry.get("file.txt"), Some(100));
}

#[tokio::test]
async fn conflict_resolution_copies_chosen_side_with_timestamp() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    write_file(dir_a.path(), "file.txt", "from a", 150);
    write_file(dir_b.path(), "file.txt", "from b", 160);
    let mut registry = Registry::new();
    registry.set("file.txt", 100);

    let engine = engine_for(
        dir_a.path(),
        dir_b.path(),
        Arc::new(PreferSidePolicy(Side::A)),
    );
    let report = engine.run("t", &mut registry).await.unwrap();

    assert_eq!(report.conflicts_resolved, 1);
    assert_eq!(
        std::fs::read_to_string(dir_b.path().join("file.txt")).unwrap(),
        "from a"
    );
    // 冲突解决强制保留时间戳，基线更新为胜出侧的修改时间
    assert_eq!(mtime_of(dir_b.path(), "file.txt"), 150);
    assert_eq!(registry.get("file.txt"), Some(150));
}

#[tokio::test]
async fn second_run_without_changes_is_a_no_op() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    write_file(dir_a.path(), "one.txt", "1", 100);
    write_file(dir_a.path(), "sub/two.txt", "2", 200);
    write_file(dir_b.path(), "three.txt", "3", 300);

    let engine = engine_for(dir_a.path(), dir_b.path(), Arc::new(SkipPolicy));
    let mut registry = Registry::new();

    let first = engine.run("t", &mut registry).await.unwrap();
    assert_eq!(first.files_copied, 3);
    assert_eq!(first.files_failed, 0);

    let second = engine.run("t", &mut registry).await.unwrap();
    assert_eq!(second.status, SyncStatus::Completed);
    assert_eq!(second.files_copied, 0);
    assert_eq!(second.files_deleted, 0);
    // 两侧各 3 个文件全部判定为未变化
    assert_eq!(second.files_skipped, 3);
}

#[tokio::test]
async fn equal_mtimes_without_baseline_are_left_alone() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    write_file(dir_a.path(), "same.txt", "a version", 100);
    write_file(dir_b.path(), "same.txt", "b version", 100);

    let engine = engine_for(dir_a.path(), dir_b.path(), Arc::new(SkipPolicy));
    let mut registry = Registry::new();
    let report = engine.run("t", &mut registry).await.unwrap();

    // 等时间戳按未修改处理，不做内容校验，基线也不记录
    assert_eq!(report.files_copied, 0);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(registry.get("same.txt"), None);
    assert_eq!(
        std::fs::read_to_string(dir_b.path().join("same.txt")).unwrap(),
        "b version"
    );
}

#[tokio::test]
async fn missing_target_root_is_bootstrapped_by_first_sync() {
    let dir_a = TempDir::new().unwrap();
    let dir_b_parent = TempDir::new().unwrap();
    let dir_b = dir_b_parent.path().join("not-yet-created");

    write_file(dir_a.path(), "seed.txt", "s", 100);

    let engine = engine_for(dir_a.path(), &dir_b, Arc::new(SkipPolicy));
    let mut registry = Registry::new();
    let report = engine.run("t", &mut registry).await.unwrap();

    // 缺失的根目录按空快照处理，复制时自动建立
    assert_eq!(report.files_copied, 1);
    assert!(dir_b.join("seed.txt").exists());
}

#[tokio::test]
async fn analyze_reports_decisions_without_touching_anything() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    write_file(dir_a.path(), "new.txt", "n", 100);

    let engine = engine_for(dir_a.path(), dir_b.path(), Arc::new(SkipPolicy));
    let registry = Registry::new();
    let (decisions, summary) = engine.analyze(&registry).await.unwrap();

    assert_eq!(summary.new_on_a, 1);
    assert_eq!(decisions.len(), 1);
    // 预览不产生任何副作用
    assert!(!dir_b.path().join("new.txt").exists());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn excluded_patterns_do_not_participate() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    write_file(dir_a.path(), "keep.txt", "k", 100);
    write_file(dir_a.path(), "skip.log", "s", 100);

    let storage_a = create_storage(dir_a.path().to_str().unwrap()).unwrap();
    let storage_b = create_storage(dir_b.path().to_str().unwrap()).unwrap();
    let engine = SyncEngine::with_config(
        storage_a,
        storage_b,
        Arc::new(SkipPolicy),
        EngineConfig {
            max_concurrent_actions: 2,
            scan_config: ScanConfig {
                exclude_patterns: vec!["*.log".to_string()],
            },
        },
    );

    let mut registry = Registry::new();
    engine.run("t", &mut registry).await.unwrap();

    assert!(dir_b.path().join("keep.txt").exists());
    assert!(!dir_b.path().join("skip.log").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn symlinks_are_neither_scanned_nor_copied() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    write_file(dir_a.path(), "real.txt", "r", 100);
    std::os::unix::fs::symlink(dir_a.path().join("real.txt"), dir_a.path().join("link.txt"))
        .unwrap();

    let engine = engine_for(dir_a.path(), dir_b.path(), Arc::new(SkipPolicy));
    let mut registry = Registry::new();
    let report = engine.run("t", &mut registry).await.unwrap();

    assert_eq!(report.files_copied, 1);
    assert!(dir_b.path().join("real.txt").exists());
    assert!(!dir_b.path().join("link.txt").exists());
    assert_eq!(registry.get("link.txt"), None);
}

#[tokio::test]
async fn both_roots_missing_aborts_before_any_mutation() {
    let parent = TempDir::new().unwrap();
    let engine = engine_for(
        &parent.path().join("gone-a"),
        &parent.path().join("gone-b"),
        Arc::new(SkipPolicy),
    );

    let mut registry = Registry::new();
    registry.set("stale.txt", 100);

    assert!(engine.run("t", &mut registry).await.is_err());
    // 基线保持运行前状态
    assert_eq!(registry.get("stale.txt"), Some(100));
}

#[cfg(unix)]
#[tokio::test]
async fn failed_action_leaves_registry_entry_untouched() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    // B 侧同名目录挡住写入，复制动作必然失败
    write_file(dir_a.path(), "item", "payload", 100);
    std::fs::create_dir(dir_b.path().join("item")).unwrap();

    let engine = engine_for(dir_a.path(), dir_b.path(), Arc::new(SkipPolicy));
    let mut registry = Registry::new();
    let report = engine.run("t", &mut registry).await.unwrap();

    assert_eq!(report.status, SyncStatus::Failed);
    assert_eq!(report.files_failed, 1);
    assert!(!report.errors.is_empty());
    // 失败路径不进入基线，下次运行重新评估
    assert_eq!(registry.get("item"), None);
}

#[tokio::test]
async fn registry_survives_save_and_reload_between_runs() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let data_dir = TempDir::new().unwrap();

    write_file(dir_a.path(), "nested/deep/file.txt", "x", 100);

    let engine = engine_for(dir_a.path(), dir_b.path(), Arc::new(SkipPolicy));
    let store = RegistryStore::new(data_dir.path());

    let mut registry = store.load("p", RegistryFormat::Properties).unwrap();
    engine.run("p", &mut registry).await.unwrap();
    store
        .save(&registry, "p", RegistryFormat::Properties)
        .unwrap();

    // 第二轮从磁盘加载基线后仍然全部为未变化
    let mut reloaded = store.load("p", RegistryFormat::Properties).unwrap();
    assert_eq!(reloaded.get("nested/deep/file.txt"), Some(100));

    let second = engine.run("p", &mut reloaded).await.unwrap();
    assert_eq!(second.files_copied, 0);
    assert_eq!(second.files_skipped, 1);
}
