use crate::core::registry::Registry;
use crate::core::scanner::Snapshot;
use std::collections::BTreeSet;
use tracing::debug;

/// 同步两侧的标识
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl Side {
    /// 对侧
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// 单个路径的同步判定
///
/// DeletedOnA 表示文件已从 A 侧删除且 B 侧与基线一致，删除应传播到 B；
/// DeletedOnB 对称。基线（registry）扮演三方比较中共同祖先的角色：
/// 基线中没有记录的路径单侧存在时一律视为新增，避免首次同步或基线
/// 丢失后误删数据。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    NoChange,
    NewOnA,
    NewOnB,
    ModifiedOnA,
    ModifiedOnB,
    DeletedOnA,
    DeletedOnB,
    Conflict,
}

/// 同步动作
#[derive(Debug, Clone)]
pub struct SyncAction {
    pub path: String,
    pub kind: ActionKind,
}

#[derive(Debug, Clone)]
pub enum ActionKind {
    /// 复制文件：从 source 侧复制到对侧
    Copy {
        source: Side,
        /// 复制来源在快照中的修改时间；写入后同步基线记录同一值
        modified_time: i64,
        size: u64,
        /// 是否将目标文件的修改时间设为来源的修改时间
        preserve_timestamp: bool,
    },
    /// 从 target 侧删除文件
    Delete { target: Side },
}

/// 对单个路径应用判定规则
///
/// 等时间戳、两侧都有、无基线记录时按未修改处理；该近似不做内容校验。
pub fn decide(
    mtime_a: Option<i64>,
    mtime_b: Option<i64>,
    registry_time: Option<i64>,
) -> SyncDecision {
    match (mtime_a, mtime_b, registry_time) {
        (Some(_), None, None) => SyncDecision::NewOnA,
        (Some(a), None, Some(reg)) => {
            if a == reg {
                SyncDecision::DeletedOnB
            } else {
                SyncDecision::Conflict
            }
        }
        (None, Some(_), None) => SyncDecision::NewOnB,
        (None, Some(b), Some(reg)) => {
            if b == reg {
                SyncDecision::DeletedOnA
            } else {
                SyncDecision::Conflict
            }
        }
        (Some(a), Some(b), None) => {
            if a > b {
                SyncDecision::ModifiedOnA
            } else if b > a {
                SyncDecision::ModifiedOnB
            } else {
                SyncDecision::NoChange
            }
        }
        (Some(a), Some(b), Some(reg)) => {
            let a_changed = a != reg;
            let b_changed = b != reg;
            match (a_changed, b_changed) {
                (true, true) => SyncDecision::Conflict,
                (true, false) => SyncDecision::ModifiedOnA,
                (false, true) => SyncDecision::ModifiedOnB,
                (false, false) => SyncDecision::NoChange,
            }
        }
        (None, None, _) => SyncDecision::NoChange,
    }
}

/// 比较两侧快照与基线，为每个路径给出判定
///
/// 遍历两侧快照键的并集；只出现在基线中的路径不参与本轮处理，
/// 其记录保持原样。结果按路径排序，保证运行间输出一致。
pub fn reconcile(
    snapshot_a: &Snapshot,
    snapshot_b: &Snapshot,
    registry: &Registry,
) -> Vec<(String, SyncDecision)> {
    let all_paths: BTreeSet<&String> = snapshot_a.keys().chain(snapshot_b.keys()).collect();

    let mut decisions = Vec::with_capacity(all_paths.len());

    for path in all_paths {
        let mtime_a = snapshot_a.get(path).map(|f| f.modified_time);
        let mtime_b = snapshot_b.get(path).map(|f| f.modified_time);
        let registry_time = registry.get(path);

        let decision = decide(mtime_a, mtime_b, registry_time);

        if decision != SyncDecision::NoChange {
            debug!(
                "判定 {}: {:?} (A={:?}, B={:?}, 基线={:?})",
                path, decision, mtime_a, mtime_b, registry_time
            );
        }

        decisions.push((path.clone(), decision));
    }

    decisions
}

/// 判定统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionSummary {
    pub new_on_a: usize,
    pub new_on_b: usize,
    pub modified_on_a: usize,
    pub modified_on_b: usize,
    pub deleted_on_a: usize,
    pub deleted_on_b: usize,
    pub conflicts: usize,
    pub no_change: usize,
}

impl DecisionSummary {
    pub fn of(decisions: &[(String, SyncDecision)]) -> Self {
        let mut summary = DecisionSummary::default();

        for (_, decision) in decisions {
            match decision {
                SyncDecision::NewOnA => summary.new_on_a += 1,
                SyncDecision::NewOnB => summary.new_on_b += 1,
                SyncDecision::ModifiedOnA => summary.modified_on_a += 1,
                SyncDecision::ModifiedOnB => summary.modified_on_b += 1,
                SyncDecision::DeletedOnA => summary.deleted_on_a += 1,
                SyncDecision::DeletedOnB => summary.deleted_on_b += 1,
                SyncDecision::Conflict => summary.conflicts += 1,
                SyncDecision::NoChange => summary.no_change += 1,
            }
        }

        summary
    }

    /// 需要实际执行动作的路径数
    pub fn actionable(&self) -> usize {
        self.new_on_a
            + self.new_on_b
            + self.modified_on_a
            + self.modified_on_b
            + self.deleted_on_a
            + self.deleted_on_b
            + self.conflicts
    }
}
