use crate::profile::{Profile, ProfileStore};
use anyhow::Result;

/// 创建（或覆盖）一个同步配置
pub fn new_profile(
    store: &ProfileStore,
    name: String,
    path_a: String,
    path_b: String,
    exclude_patterns: Vec<String>,
) -> Result<()> {
    if store.load(&name)?.is_some() {
        tracing::warn!("profile 已存在，将被覆盖: {}", name);
    }

    let profile = Profile::new(name.clone(), path_a, path_b, exclude_patterns);
    store.save(&profile)?;

    println!("profile '{}' 创建成功", name);
    Ok(())
}

/// 列出已有配置
pub fn list_profiles(store: &ProfileStore) -> Result<()> {
    let names = store.list()?;

    if names.is_empty() {
        println!("尚未创建任何 profile");
        return Ok(());
    }

    for name in names {
        match store.load(&name)? {
            Some(profile) => {
                println!("{}  (A: {}, B: {})", name, profile.path_a, profile.path_b)
            }
            None => println!("{}", name),
        }
    }

    Ok(())
}
