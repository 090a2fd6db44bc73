//! 冲突解决策略
//!
//! 当一个路径在两侧都相对基线发生变化时，引擎无法自行判断去留，
//! 通过注入的策略取得方向选择。策略只给出选择，复制动作由引擎
//! 生成（强制保留时间戳，使传播后的文件相对新基线看起来未修改）。

use crate::core::error::SyncError;
use crate::core::reconciler::Side;
use crate::storage::FileInfo;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::io::Write;
use std::str::FromStr;

/// 冲突方向选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionChoice {
    UseA,
    UseB,
}

impl ResolutionChoice {
    pub fn side(self) -> Side {
        match self {
            ResolutionChoice::UseA => Side::A,
            ResolutionChoice::UseB => Side::B,
        }
    }
}

/// 冲突解决策略接口
///
/// 引擎在批量执行复制/删除之前为每个冲突路径同步调用一次；
/// 返回错误表示该路径跳过，留待下次同步处理。
pub trait ConflictPolicy: Send + Sync {
    fn resolve(
        &self,
        path: &str,
        a: Option<&FileInfo>,
        b: Option<&FileInfo>,
    ) -> Result<ResolutionChoice, SyncError>;
}

/// 命令行上的冲突处理模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictMode {
    /// 交互式询问（默认）
    Ask,
    /// 总是采用修改时间较新的一侧
    Newer,
    /// 总是采用 A 侧
    PreferA,
    /// 总是采用 B 侧
    PreferB,
    /// 全部跳过
    Skip,
}

impl FromStr for ConflictMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ask" => Ok(ConflictMode::Ask),
            "newer" => Ok(ConflictMode::Newer),
            "a" | "prefer-a" => Ok(ConflictMode::PreferA),
            "b" | "prefer-b" => Ok(ConflictMode::PreferB),
            "skip" => Ok(ConflictMode::Skip),
            other => Err(format!("不支持的冲突模式: {}", other)),
        }
    }
}

impl ConflictMode {
    /// 构造对应的策略实例
    pub fn into_policy(self) -> std::sync::Arc<dyn ConflictPolicy> {
        match self {
            ConflictMode::Ask => std::sync::Arc::new(InteractivePolicy),
            ConflictMode::Newer => std::sync::Arc::new(PreferNewerPolicy),
            ConflictMode::PreferA => std::sync::Arc::new(PreferSidePolicy(Side::A)),
            ConflictMode::PreferB => std::sync::Arc::new(PreferSidePolicy(Side::B)),
            ConflictMode::Skip => std::sync::Arc::new(SkipPolicy),
        }
    }
}

fn describe(info: Option<&FileInfo>) -> String {
    match info {
        Some(f) => format!("修改时间 {}, {} 字节", f.modified_time, f.size),
        None => "不存在".to_string(),
    }
}

/// 交互式策略：在控制台询问采用哪一侧
pub struct InteractivePolicy;

impl ConflictPolicy for InteractivePolicy {
    fn resolve(
        &self,
        path: &str,
        a: Option<&FileInfo>,
        b: Option<&FileInfo>,
    ) -> Result<ResolutionChoice, SyncError> {
        println!("检测到冲突: {}", path);
        println!("  1. 采用 A 侧版本 ({})", describe(a));
        println!("  2. 采用 B 侧版本 ({})", describe(b));

        let stdin = std::io::stdin();
        let mut lines = stdin.lock().lines();

        // 限制重试次数，避免无效输入时死循环
        for _ in 0..3 {
            print!("请选择 (1 或 2): ");
            let _ = std::io::stdout().flush();

            let line = match lines.next() {
                Some(Ok(line)) => line,
                // EOF：非交互环境，按策略失败处理
                _ => return Err(SyncError::conflict_policy(path, "标准输入已关闭")),
            };

            match line.trim() {
                "1" => return Ok(ResolutionChoice::UseA),
                "2" => return Ok(ResolutionChoice::UseB),
                other => println!("无效输入: {}", other),
            }
        }

        Err(SyncError::conflict_policy(path, "多次输入无效"))
    }
}

/// 总是采用修改时间较新一侧的策略；缺失的一侧视为最旧
pub struct PreferNewerPolicy;

impl ConflictPolicy for PreferNewerPolicy {
    fn resolve(
        &self,
        _path: &str,
        a: Option<&FileInfo>,
        b: Option<&FileInfo>,
    ) -> Result<ResolutionChoice, SyncError> {
        let mtime_a = a.map(|f| f.modified_time).unwrap_or(i64::MIN);
        let mtime_b = b.map(|f| f.modified_time).unwrap_or(i64::MIN);

        // 同样新时选 A，保证结果确定
        if mtime_b > mtime_a {
            Ok(ResolutionChoice::UseB)
        } else {
            Ok(ResolutionChoice::UseA)
        }
    }
}

/// 固定采用某一侧的策略
pub struct PreferSidePolicy(pub Side);

impl ConflictPolicy for PreferSidePolicy {
    fn resolve(
        &self,
        _path: &str,
        _a: Option<&FileInfo>,
        _b: Option<&FileInfo>,
    ) -> Result<ResolutionChoice, SyncError> {
        Ok(match self.0 {
            Side::A => ResolutionChoice::UseA,
            Side::B => ResolutionChoice::UseB,
        })
    }
}

/// 跳过全部冲突的策略
pub struct SkipPolicy;

impl ConflictPolicy for SkipPolicy {
    fn resolve(
        &self,
        path: &str,
        _a: Option<&FileInfo>,
        _b: Option<&FileInfo>,
    ) -> Result<ResolutionChoice, SyncError> {
        Err(SyncError::conflict_policy(path, "按配置跳过"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(modified_time: i64) -> FileInfo {
        FileInfo {
            path: "f.txt".to_string(),
            size: 10,
            modified_time,
            is_dir: false,
        }
    }

    #[test]
    fn prefer_newer_picks_larger_mtime() {
        let policy = PreferNewerPolicy;

        let choice = policy
            .resolve("f.txt", Some(&info(100)), Some(&info(200)))
            .unwrap();
        assert_eq!(choice, ResolutionChoice::UseB);

        let choice = policy
            .resolve("f.txt", Some(&info(300)), Some(&info(200)))
            .unwrap();
        assert_eq!(choice, ResolutionChoice::UseA);
    }

    #[test]
    fn prefer_newer_never_picks_missing_side() {
        let policy = PreferNewerPolicy;

        let choice = policy.resolve("f.txt", Some(&info(100)), None).unwrap();
        assert_eq!(choice, ResolutionChoice::UseA);

        let choice = policy.resolve("f.txt", None, Some(&info(100))).unwrap();
        assert_eq!(choice, ResolutionChoice::UseB);
    }

    #[test]
    fn prefer_newer_is_deterministic_on_tie() {
        let policy = PreferNewerPolicy;
        let choice = policy
            .resolve("f.txt", Some(&info(100)), Some(&info(100)))
            .unwrap();
        assert_eq!(choice, ResolutionChoice::UseA);
    }

    #[test]
    fn skip_policy_always_errors() {
        let policy = SkipPolicy;
        let err = policy
            .resolve("f.txt", Some(&info(100)), Some(&info(200)))
            .unwrap_err();
        assert!(matches!(err, SyncError::ConflictPolicy { .. }));
    }

    #[test]
    fn mode_parses_from_cli_strings() {
        assert_eq!("ask".parse::<ConflictMode>().unwrap(), ConflictMode::Ask);
        assert_eq!("newer".parse::<ConflictMode>().unwrap(), ConflictMode::Newer);
        assert_eq!("a".parse::<ConflictMode>().unwrap(), ConflictMode::PreferA);
        assert_eq!("prefer-b".parse::<ConflictMode>().unwrap(), ConflictMode::PreferB);
        assert!("both".parse::<ConflictMode>().is_err());
    }
}
