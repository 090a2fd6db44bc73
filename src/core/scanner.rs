use crate::core::error::SyncError;
use crate::storage::{FileInfo, Storage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// 目录树快照：相对路径 -> 文件信息
///
/// 只包含文件条目，目录在扫描时被遍历但不参与同步比较。
/// 每次同步各侧构建一次，运行结束即丢弃，从不持久化。
pub type Snapshot = HashMap<String, FileInfo>;

/// 文件扫描器配置
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// 排除规则（glob patterns）
    pub exclude_patterns: Vec<String>,
}

/// 文件扫描器
pub struct FileScanner {
    config: ScanConfig,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl FileScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            cancel_flag: None,
        }
    }

    /// 创建带取消标志的扫描器
    pub fn with_cancel(config: ScanConfig, cancel_flag: Arc<AtomicBool>) -> Self {
        Self {
            config,
            cancel_flag: Some(cancel_flag),
        }
    }

    /// 检查是否已取消
    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .map(|f| f.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// 检查路径是否应该被排除
    fn should_exclude(&self, path: &str) -> bool {
        self.config
            .exclude_patterns
            .iter()
            .any(|pattern| Self::matches_pattern(path, pattern))
    }

    /// 简单的 glob 模式匹配
    fn matches_pattern(path: &str, pattern: &str) -> bool {
        let path = path.to_lowercase();
        let pattern = pattern.to_lowercase();

        // 处理 ** 通配符
        if pattern.contains("**") {
            let parts: Vec<&str> = pattern.split("**").collect();
            if parts.len() == 2 {
                let prefix = parts[0].trim_end_matches('/');
                let suffix = parts[1].trim_start_matches('/');

                if prefix.is_empty() && suffix.is_empty() {
                    return true;
                }

                if !prefix.is_empty() && !path.starts_with(prefix) {
                    return false;
                }

                if !suffix.is_empty() && !path.ends_with(suffix) {
                    return false;
                }

                return true;
            }
        }

        // 处理 * 通配符
        if pattern.contains('*') {
            let regex_pattern = pattern.replace('.', "\\.").replace('*', ".*");

            if let Ok(re) = regex::Regex::new(&format!("^{}$", regex_pattern)) {
                return re.is_match(&path);
            }
        }

        // 精确匹配
        path == pattern || path.ends_with(&format!("/{}", pattern))
    }

    /// 扫描存储并返回扁平化快照
    pub async fn scan_storage(&self, storage: &dyn Storage) -> Result<Snapshot, SyncError> {
        if self.is_cancelled() {
            return Err(SyncError::Scan {
                side: storage.name().to_string(),
                message: "操作已取消".to_string(),
            });
        }

        info!("开始扫描存储: {}", storage.name());

        let files = storage.list_files().await.map_err(|e| SyncError::Scan {
            side: storage.name().to_string(),
            message: e.to_string(),
        })?;

        let mut tree = Snapshot::new();
        let mut excluded_count = 0;
        let mut dir_count = 0;

        for file in files {
            // 每处理一定数量检查一次取消状态
            if tree.len() % 100 == 0 && self.is_cancelled() {
                return Err(SyncError::Scan {
                    side: storage.name().to_string(),
                    message: "操作已取消".to_string(),
                });
            }

            // 目录被遍历但不进入快照
            if file.is_dir {
                dir_count += 1;
                continue;
            }

            if self.should_exclude(&file.path) {
                debug!("排除文件: {}", file.path);
                excluded_count += 1;
                continue;
            }

            tree.insert(file.path.clone(), file);
        }

        info!(
            "扫描完成: {} - {} 个文件, {} 个目录, {} 个被排除",
            storage.name(),
            tree.len(),
            dir_count,
            excluded_count
        );

        Ok(tree)
    }
}
