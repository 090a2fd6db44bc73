//! 同步配置（profile）管理
//!
//! 一个 profile 把名字映射到两个根目录路径，每个 profile 以
//! 独立 JSON 文件保存在数据目录下。

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// 同步配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub path_a: String,
    pub path_b: String,
    /// 扫描时排除的 glob 模式
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    pub created_at: i64,
}

impl Profile {
    pub fn new(
        name: String,
        path_a: String,
        path_b: String,
        exclude_patterns: Vec<String>,
    ) -> Self {
        Self {
            name,
            path_a,
            path_b,
            exclude_patterns,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// profile 文件存取
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn profile_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.profile.json", name))
    }

    /// 名字将作为文件名，不允许路径成分
    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            anyhow::bail!("profile 名称不能为空");
        }
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            anyhow::bail!("profile 名称不能包含路径分隔符: {}", name);
        }
        Ok(())
    }

    pub fn save(&self, profile: &Profile) -> Result<()> {
        Self::validate_name(&profile.name)?;
        fs::create_dir_all(&self.dir)?;

        let path = self.profile_path(&profile.name);
        let content = serde_json::to_string_pretty(profile)?;
        fs::write(&path, content)?;

        debug!("profile 已保存: {:?}", path);
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<Option<Profile>> {
        Self::validate_name(name)?;

        let path = self.profile_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let profile = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("profile 文件损坏 ({:?}): {}", path, e))?;
        Ok(Some(profile))
    }

    /// 列出已有 profile 名称（按字母序）
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(".profile.json") {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());

        let profile = Profile::new(
            "work".to_string(),
            "/data/a".to_string(),
            "/data/b".to_string(),
            vec!["*.tmp".to_string()],
        );
        store.save(&profile).unwrap();

        let loaded = store.load("work").unwrap().unwrap();
        assert_eq!(loaded.name, "work");
        assert_eq!(loaded.path_a, "/data/a");
        assert_eq!(loaded.exclude_patterns, vec!["*.tmp".to_string()]);
    }

    #[test]
    fn missing_profile_is_none() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        assert!(store.load("nope").unwrap().is_none());
    }

    #[test]
    fn name_with_path_components_is_rejected() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());

        let profile = Profile::new(
            "../evil".to_string(),
            "/a".to_string(),
            "/b".to_string(),
            vec![],
        );
        assert!(store.save(&profile).is_err());
        assert!(store.load("a/b").is_err());
    }

    #[test]
    fn list_returns_sorted_names() {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(dir.path());

        for name in ["zeta", "alpha"] {
            let profile = Profile::new(
                name.to_string(),
                "/a".to_string(),
                "/b".to_string(),
                vec![],
            );
            store.save(&profile).unwrap();
        }

        assert_eq!(store.list().unwrap(), vec!["alpha", "zeta"]);
    }
}
