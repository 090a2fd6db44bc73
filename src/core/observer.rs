/// 同步事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEventKind {
    /// 新文件复制
    Copy,
    /// 已有文件更新
    Update,
    /// 删除传播
    Delete,
    /// 冲突已解决
    ResolveConflict,
}

impl std::fmt::Display for SyncEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncEventKind::Copy => write!(f, "COPY"),
            SyncEventKind::Update => write!(f, "UPDATE"),
            SyncEventKind::Delete => write!(f, "DELETE"),
            SyncEventKind::ResolveConflict => write!(f, "RESOLVE CONFLICT"),
        }
    }
}

/// 同步事件接收器
///
/// 纯观察用途：实现不得阻塞或失败，不影响同步流程。
pub trait SyncObserver: Send + Sync {
    fn on_event(&self, kind: SyncEventKind, description: &str);
}

/// 输出到控制台的接收器
pub struct ConsoleObserver;

impl SyncObserver for ConsoleObserver {
    fn on_event(&self, kind: SyncEventKind, description: &str) {
        println!("[{}] {}", kind, description);
    }
}
