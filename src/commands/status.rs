use crate::core::registry::{RegistryFormat, RegistryStore};
use crate::profile::ProfileStore;
use anyhow::{Context, Result};
use chrono::DateTime;
use std::path::Path;

/// 展示 profile 当前的同步基线
pub fn run(profiles: &ProfileStore, data_dir: &Path, name: &str, format: &str) -> Result<()> {
    let format: RegistryFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let profile = profiles
        .load(name)?
        .with_context(|| format!("profile 不存在: {}", name))?;

    println!("profile: {}", profile.name);
    println!("目录 A: {}", profile.path_a);
    println!("目录 B: {}", profile.path_b);
    if !profile.exclude_patterns.is_empty() {
        println!("排除规则: {}", profile.exclude_patterns.join(", "));
    }
    println!("基线格式: {}", format);

    let registry = RegistryStore::new(data_dir).load(&profile.name, format)?;

    println!();
    if registry.is_empty() {
        println!("基线为空（尚未进行过同步）");
        return Ok(());
    }

    println!("基线记录 ({} 条):", registry.len());
    for (path, modified_time) in registry.sorted_entries() {
        let formatted = DateTime::from_timestamp(modified_time, 0)
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| modified_time.to_string());
        println!("  {} (修改时间: {})", path, formatted);
    }

    Ok(())
}
