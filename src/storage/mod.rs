pub mod local;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use local::LocalStorage;

/// 文件信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// 相对根目录的路径（统一使用 / 分隔符）
    pub path: String,
    pub size: u64,
    /// 修改时间（Unix 秒）
    pub modified_time: i64,
    pub is_dir: bool,
}

/// 文件元数据（用于快速检查）
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub size: u64,
    pub modified_time: i64,
    pub is_dir: bool,
}

/// 存储抽象接口
///
/// 同步引擎通过该接口访问两侧目录树，不关心具体实现。
#[async_trait]
pub trait Storage: Send + Sync {
    /// 递归列出所有条目（跳过符号链接）
    async fn list_files(&self) -> Result<Vec<FileInfo>>;

    /// 获取文件元数据；路径不存在返回 None
    async fn stat(&self, path: &str) -> Result<Option<FileMeta>>;

    /// 读取整个文件
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// 写入整个文件（必要时创建父目录）
    async fn write(&self, path: &str, data: Vec<u8>) -> Result<()>;

    /// 删除文件；路径不存在视为成功
    async fn delete(&self, path: &str) -> Result<()>;

    /// 检查文件是否存在
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.stat(path).await?.is_some())
    }

    /// 设置文件修改时间（Unix 秒）
    async fn set_modified(&self, path: &str, modified_time: i64) -> Result<()>;

    /// 根目录是否存在
    async fn root_exists(&self) -> Result<bool>;

    /// 根目录路径
    fn base_path(&self) -> &str;

    /// 存储名称（用于日志）
    fn name(&self) -> &str;
}

/// 根据路径创建存储实例
///
/// 目前仅支持本地文件系统；未来可根据路径前缀（如 http://）
/// 返回远程协议的实现。
pub fn create_storage(path: &str) -> Result<std::sync::Arc<dyn Storage>> {
    tracing::debug!("初始化本地存储: {}", path);
    Ok(std::sync::Arc::new(LocalStorage::new(path)) as std::sync::Arc<dyn Storage>)
}
