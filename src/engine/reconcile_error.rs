// ==========================================
// 配送时段运营核心 - 对账错误类型
// ==========================================
// 所有错误均按分配隔离，不中断整次对账
// ==========================================

use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 对账失败所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileStage {
    ListAssignments,
    ReadOrders,
    CompleteAssignment,
    MirrorLegacy,
}

impl fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStage::ListAssignments => write!(f, "LIST_ASSIGNMENTS"),
            ReconcileStage::ReadOrders => write!(f, "READ_ORDERS"),
            ReconcileStage::CompleteAssignment => write!(f, "COMPLETE_ASSIGNMENT"),
            ReconcileStage::MirrorLegacy => write!(f, "MIRROR_LEGACY"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// 读取失败（订单或分配）
    #[error("读取失败 (stage={stage}): {source}")]
    ReadFailure {
        stage: ReconcileStage,
        #[source]
        source: RepositoryError,
    },

    /// 已判定完成，但完成写入未持久化
    #[error("写入失败 (stage={stage}): {source}")]
    WriteFailure {
        stage: ReconcileStage,
        #[source]
        source: RepositoryError,
    },

    /// 权威记录已完成，旧版记录镜像失败
    #[error("旧版记录镜像失败: {source}")]
    LegacyMirrorFailure {
        #[source]
        source: RepositoryError,
    },

    /// 单次存储操作超时
    #[error("操作超时 (stage={stage}): 超过 {timeout_ms}ms")]
    Timeout { stage: ReconcileStage, timeout_ms: u64 },
}

impl ReconcileError {
    pub fn stage(&self) -> ReconcileStage {
        match self {
            ReconcileError::ReadFailure { stage, .. }
            | ReconcileError::WriteFailure { stage, .. }
            | ReconcileError::Timeout { stage, .. } => *stage,
            ReconcileError::LegacyMirrorFailure { .. } => ReconcileStage::MirrorLegacy,
        }
    }
}
