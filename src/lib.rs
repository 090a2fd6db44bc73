use std::path::PathBuf;

pub mod commands;
pub mod core;
pub mod logging;
pub mod profile;
pub mod storage;

pub use crate::core::{EngineConfig, SyncEngine, SyncReport, SyncStatus};
pub use profile::{Profile, ProfileStore};

/// 解析数据目录：命令行覆盖优先，否则使用平台约定的配置目录
pub fn data_dir(override_dir: Option<PathBuf>) -> PathBuf {
    override_dir.unwrap_or_else(|| {
        dirs::config_dir()
            .map(|p| p.join("foldersync"))
            .unwrap_or_else(|| PathBuf::from(".foldersync"))
    })
}

pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            // Linux
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        }
    }
}
