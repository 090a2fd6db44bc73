use crate::core::error::SyncError;
use crate::core::reconciler::{ActionKind, Side, SyncAction};
use crate::storage::Storage;
use std::sync::Arc;
use tracing::debug;

/// 动作执行后应施加到基线上的变更
///
/// 执行器只产出变更，不直接改写基线；基线由引擎中的单一写入方
/// 在所有动作结束后统一应用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryUpdate {
    Set { path: String, modified_time: i64 },
    Remove { path: String },
}

/// 执行结果
#[derive(Debug)]
pub struct ActionOutcome {
    pub update: RegistryUpdate,
    pub bytes: u64,
    pub deleted: bool,
}

/// 同步动作执行器：通过两侧存储接口应用复制与删除
pub struct ActionExecutor {
    storage_a: Arc<dyn Storage>,
    storage_b: Arc<dyn Storage>,
}

impl ActionExecutor {
    pub fn new(storage_a: Arc<dyn Storage>, storage_b: Arc<dyn Storage>) -> Self {
        Self {
            storage_a,
            storage_b,
        }
    }

    fn side(&self, side: Side) -> &dyn Storage {
        match side {
            Side::A => self.storage_a.as_ref(),
            Side::B => self.storage_b.as_ref(),
        }
    }

    /// 应用单个动作
    ///
    /// 复制：从来源侧读出，写入对侧，按需把目标修改时间设为来源
    /// 扫描时的修改时间，使下一轮扫描观察到的值与基线一致。
    /// 删除：目标已不存在视为成功（幂等）。
    pub async fn apply(&self, action: &SyncAction) -> Result<ActionOutcome, SyncError> {
        match &action.kind {
            ActionKind::Copy {
                source,
                modified_time,
                size,
                preserve_timestamp,
            } => {
                let from = self.side(*source);
                let to = self.side(source.other());

                debug!(
                    "复制: {} ({} -> {}, {} 字节)",
                    action.path,
                    source,
                    source.other(),
                    size
                );

                let data = from
                    .read(&action.path)
                    .await
                    .map_err(|e| SyncError::action(&action.path, e))?;

                to.write(&action.path, data)
                    .await
                    .map_err(|e| SyncError::action(&action.path, e))?;

                if *preserve_timestamp {
                    to.set_modified(&action.path, *modified_time)
                        .await
                        .map_err(|e| SyncError::action(&action.path, e))?;
                }

                Ok(ActionOutcome {
                    update: RegistryUpdate::Set {
                        path: action.path.clone(),
                        modified_time: *modified_time,
                    },
                    bytes: *size,
                    deleted: false,
                })
            }
            ActionKind::Delete { target } => {
                debug!("删除: {} ({} 侧)", action.path, target);

                self.side(*target)
                    .delete(&action.path)
                    .await
                    .map_err(|e| SyncError::action(&action.path, e))?;

                Ok(ActionOutcome {
                    update: RegistryUpdate::Remove {
                        path: action.path.clone(),
                    },
                    bytes: 0,
                    deleted: true,
                })
            }
        }
    }
}
