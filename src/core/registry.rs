//! 同步基线持久化
//!
//! 基线记录每个路径在上次成功同步结束时的修改时间，是下一轮三方
//! 比较的共同祖先。磁盘编码对引擎不可见，这里提供 JSON 和扁平
//! 键值对两种格式，按命令行的格式提示选择。

use crate::core::error::SyncError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

/// 同步基线：相对路径 -> 上次同步时的修改时间（Unix 秒）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: HashMap<String, i64>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<i64> {
        self.entries.get(path).copied()
    }

    pub fn set(&mut self, path: impl Into<String>, modified_time: i64) {
        self.entries.insert(path.into(), modified_time);
    }

    pub fn remove(&mut self, path: &str) {
        self.entries.remove(path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按路径排序的条目列表（用于展示和序列化）
    pub fn sorted_entries(&self) -> Vec<(&str, i64)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(p, t)| (p.as_str(), *t))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// 基线文件编码格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryFormat {
    Json,
    Properties,
}

impl RegistryFormat {
    fn extension(self) -> &'static str {
        match self {
            RegistryFormat::Json => "json",
            RegistryFormat::Properties => "properties",
        }
    }
}

impl std::fmt::Display for RegistryFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for RegistryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(RegistryFormat::Json),
            "properties" | "props" => Ok(RegistryFormat::Properties),
            other => Err(format!("不支持的基线格式: {}", other)),
        }
    }
}

/// JSON 编码的文件结构
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryFile {
    profile_name: String,
    entries: Vec<RegistryFileEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryFileEntry {
    path: String,
    last_modified: i64,
}

/// 基线文件存取
pub struct RegistryStore {
    dir: PathBuf,
}

impl RegistryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 指定配置与格式对应的基线文件路径
    pub fn registry_path(&self, profile: &str, format: RegistryFormat) -> PathBuf {
        self.dir
            .join(format!("{}.registry.{}", profile, format.extension()))
    }

    /// 加载基线；文件不存在返回空基线（首次同步），格式损坏则报错中止
    pub fn load(&self, profile: &str, format: RegistryFormat) -> Result<Registry, SyncError> {
        let path = self.registry_path(profile, format);

        if !path.exists() {
            debug!("基线文件不存在，使用空基线: {:?}", path);
            return Ok(Registry::new());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| SyncError::RegistryFormat {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let registry = match format {
            RegistryFormat::Json => Self::decode_json(&content),
            RegistryFormat::Properties => Self::decode_properties(&content),
        }
        .map_err(|message| SyncError::RegistryFormat {
            path: path.clone(),
            message,
        })?;

        debug!("加载基线 {:?}: {} 条记录", path, registry.len());
        Ok(registry)
    }

    /// 原子保存基线：先写临时文件再重命名，避免写到一半崩溃时丢失历史
    pub fn save(
        &self,
        registry: &Registry,
        profile: &str,
        format: RegistryFormat,
    ) -> Result<(), SyncError> {
        let path = self.registry_path(profile, format);

        let content = match format {
            RegistryFormat::Json => Self::encode_json(registry, profile),
            RegistryFormat::Properties => Self::encode_properties(registry, profile),
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| SyncError::RegistryFormat {
            path: path.clone(),
            message: e.to_string(),
        })?;

        // 写入或重命名失败时清理临时文件
        let temp_path = path.with_extension("tmp");
        let guard = scopeguard::guard(temp_path.clone(), |p| {
            let _ = std::fs::remove_file(p);
        });

        std::fs::write(&temp_path, content).map_err(|e| SyncError::RegistryFormat {
            path: path.clone(),
            message: e.to_string(),
        })?;

        std::fs::rename(&temp_path, &path).map_err(|e| SyncError::RegistryFormat {
            path: path.clone(),
            message: e.to_string(),
        })?;

        scopeguard::ScopeGuard::into_inner(guard);

        info!("基线已保存: {:?} ({} 条记录)", path, registry.len());
        Ok(())
    }

    fn encode_json(registry: &Registry, profile: &str) -> String {
        let file = RegistryFile {
            profile_name: profile.to_string(),
            entries: registry
                .sorted_entries()
                .into_iter()
                .map(|(path, last_modified)| RegistryFileEntry {
                    path: path.to_string(),
                    last_modified,
                })
                .collect(),
        };

        // 结构体序列化不会失败
        serde_json::to_string_pretty(&file).unwrap_or_default()
    }

    fn decode_json(content: &str) -> Result<Registry, String> {
        let file: RegistryFile = serde_json::from_str(content).map_err(|e| e.to_string())?;

        let mut registry = Registry::new();
        for entry in file.entries {
            registry.set(entry.path, entry.last_modified);
        }
        Ok(registry)
    }

    fn encode_properties(registry: &Registry, profile: &str) -> String {
        let mut out = format!("# Sync registry for profile: {}\n", profile);

        for (path, modified_time) in registry.sorted_entries() {
            out.push_str(&Self::escape_key(path));
            out.push('=');
            out.push_str(&modified_time.to_string());
            out.push('\n');
        }

        out
    }

    fn decode_properties(content: &str) -> Result<Registry, String> {
        let mut registry = Registry::new();

        for (lineno, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (key, value) = Self::split_unescaped(line)
                .ok_or_else(|| format!("第 {} 行缺少分隔符", lineno + 1))?;

            let modified_time: i64 = value
                .trim()
                .parse()
                .map_err(|_| format!("第 {} 行时间戳无效: {}", lineno + 1, value.trim()))?;

            registry.set(Self::unescape_key(key)?, modified_time);
        }

        Ok(registry)
    }

    /// 转义键中的特殊字符，路径分隔符 / 原样保留
    fn escape_key(key: &str) -> String {
        let mut out = String::with_capacity(key.len());
        for ch in key.chars() {
            match ch {
                '\\' => out.push_str("\\\\"),
                '=' => out.push_str("\\="),
                ':' => out.push_str("\\:"),
                '#' => out.push_str("\\#"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(ch),
            }
        }
        out
    }

    fn unescape_key(key: &str) -> Result<String, String> {
        let mut out = String::with_capacity(key.len());
        let mut chars = key.chars();

        while let Some(ch) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('=') => out.push('='),
                Some(':') => out.push(':'),
                Some('#') => out.push('#'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => return Err(format!("无效的转义序列: \\{}", other)),
                None => return Err("键以未闭合的转义符结尾".to_string()),
            }
        }

        Ok(out)
    }

    /// 在第一个未转义的 = 处拆分键值
    fn split_unescaped(line: &str) -> Option<(&str, &str)> {
        let bytes = line.as_bytes();
        let mut escaped = false;

        for (i, &b) in bytes.iter().enumerate() {
            if escaped {
                escaped = false;
                continue;
            }
            match b {
                b'\\' => escaped = true,
                b'=' => return Some((&line[..i], &line[i + 1..])),
                _ => {}
            }
        }

        None
    }
}
