use super::{FileInfo, FileMeta, Storage};
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::{Duration, UNIX_EPOCH};
use tokio::fs;
use walkdir::WalkDir;

pub struct LocalStorage {
    base_path: PathBuf,
    name: String,
}

impl LocalStorage {
    pub fn new(path: &str) -> Self {
        let base_path = PathBuf::from(path);
        let name = format!("local:{}", path);
        Self { base_path, name }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = path.trim_start_matches('/').trim_start_matches('\\');
        if path.is_empty() {
            self.base_path.clone()
        } else {
            self.base_path.join(path)
        }
    }

    /// 规范化路径分隔符（统一使用 /）
    fn normalize_path(path: &str) -> String {
        path.replace('\\', "/")
    }

    fn system_time(modified_time: i64) -> std::time::SystemTime {
        UNIX_EPOCH + Duration::from_secs(modified_time.max(0) as u64)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn list_files(&self) -> Result<Vec<FileInfo>> {
        let base = self.base_path.clone();

        // 根目录不存在不算错误：首次同步时另一侧可能还没有建立
        if !base.exists() {
            return Ok(Vec::new());
        }

        // 根目录存在但不可读（如权限不足）是致命错误，提前暴露
        std::fs::read_dir(&base)?;

        let base_path = self.base_path.clone();

        // 使用 spawn_blocking 避免阻塞 async runtime
        let entries: Vec<_> = tokio::task::spawn_blocking(move || {
            WalkDir::new(&base)
                .follow_links(false)
                .into_iter()
                // 符号链接既不跟随也不记录
                .filter_entry(|e| !e.path_is_symlink())
                .filter_map(|e| match e {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        tracing::warn!("扫描条目失败: {}", err);
                        None
                    }
                })
                .filter_map(|entry| {
                    let path = entry.path();
                    let metadata = entry.metadata().ok()?;

                    let relative_path = path.strip_prefix(&base_path).ok()?.to_str()?.to_string();

                    // 跳过根目录本身
                    if relative_path.is_empty() {
                        return None;
                    }

                    let modified = metadata
                        .modified()
                        .ok()?
                        .duration_since(UNIX_EPOCH)
                        .ok()?
                        .as_secs() as i64;

                    Some(FileInfo {
                        path: Self::normalize_path(&relative_path),
                        size: if metadata.is_dir() { 0 } else { metadata.len() },
                        modified_time: modified,
                        is_dir: metadata.is_dir(),
                    })
                })
                .collect()
        })
        .await?;

        Ok(entries)
    }

    async fn stat(&self, path: &str) -> Result<Option<FileMeta>> {
        let full_path = self.resolve_path(path);

        match fs::metadata(&full_path).await {
            Ok(metadata) => {
                let modified = metadata
                    .modified()?
                    .duration_since(UNIX_EPOCH)?
                    .as_secs() as i64;

                Ok(Some(FileMeta {
                    size: if metadata.is_dir() { 0 } else { metadata.len() },
                    modified_time: modified,
                    is_dir: metadata.is_dir(),
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.resolve_path(path)).await?;
        Ok(data)
    }

    async fn write(&self, path: &str, data: Vec<u8>) -> Result<()> {
        let full_path = self.resolve_path(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // 使用临时文件写入，然后原子重命名
        let temp_path = full_path.with_extension("tmp");
        fs::write(&temp_path, data).await?;
        fs::rename(&temp_path, &full_path).await?;

        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);

        if !full_path.exists() {
            return Ok(());
        }

        if full_path.is_dir() {
            fs::remove_dir_all(&full_path).await?;
        } else {
            fs::remove_file(&full_path).await?;
        }

        Ok(())
    }

    async fn set_modified(&self, path: &str, modified_time: i64) -> Result<()> {
        let full_path = self.resolve_path(path);
        let mtime = Self::system_time(modified_time);

        tokio::task::spawn_blocking(move || -> Result<()> {
            let file = std::fs::OpenOptions::new().write(true).open(&full_path)?;
            file.set_modified(mtime)?;
            Ok(())
        })
        .await?
    }

    async fn root_exists(&self) -> Result<bool> {
        Ok(self.base_path.exists())
    }

    fn base_path(&self) -> &str {
        self.base_path.to_str().unwrap_or("")
    }

    fn name(&self) -> &str {
        &self.name
    }
}
