use std::path::PathBuf;
use thiserror::Error;

/// 同步过程中的错误分类
///
/// Scan 和 RegistryFormat 属于结构性错误，整个同步中止；
/// Action 和 ConflictPolicy 按路径收集，不影响其他路径的处理。
#[derive(Debug, Error)]
pub enum SyncError {
    /// 目录树扫描失败（根目录不可读等）
    #[error("扫描失败 ({side}): {message}")]
    Scan { side: String, message: String },

    /// 单个同步动作执行失败
    #[error("{path}: {message}")]
    Action { path: String, message: String },

    /// 同步基线文件格式损坏，拒绝在错误基线上同步
    #[error("基线文件格式错误 ({path}): {message}")]
    RegistryFormat { path: PathBuf, message: String },

    /// 冲突解决策略未能给出选择
    #[error("冲突未解决 ({path}): {message}")]
    ConflictPolicy { path: String, message: String },
}

impl SyncError {
    pub fn action(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SyncError::Action {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn conflict_policy(path: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::ConflictPolicy {
            path: path.into(),
            message: message.into(),
        }
    }
}
