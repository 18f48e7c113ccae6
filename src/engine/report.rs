// ==========================================
// 配送时段运营核心 - 对账报告
// ==========================================
// 职责: 汇总每个分配的对账结果，供运维复核
// ==========================================

use crate::domain::assignment::AssignmentKey;
use crate::engine::reconcile_error::{ReconcileError, ReconcileStage};
use crate::engine::store::LegacyMirrorOutcome;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 单个分配的对账结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentOutcome {
    /// 已完成（legacy_mirror 为 None 表示镜像写入被配置关闭）
    Completed {
        delivered: usize,
        total: usize,
        legacy_mirror: Option<LegacyMirrorOutcome>,
    },
    /// 权威记录已完成，旧版记录镜像失败
    PartiallyFixed {
        delivered: usize,
        total: usize,
        error: String,
    },
    /// 无匹配订单（无法区分"尚未下单"与"无事可做"）
    SkippedNoOrders,
    /// 仍有未送达订单
    StillActive { delivered: usize, total: usize },
    /// 条件写入未命中：并发运行已完成该分配
    AlreadyCompleted { delivered: usize, total: usize },
    /// 试运行: 满足完成条件，未写入
    WouldComplete { delivered: usize, total: usize },
    /// 读取失败
    ReadFailed { stage: ReconcileStage, error: String },
    /// 已判定完成但未持久化
    WriteFailed {
        delivered: usize,
        total: usize,
        stage: ReconcileStage,
        error: String,
    },
}

impl AssignmentOutcome {
    pub(crate) fn read_failed(err: &ReconcileError) -> Self {
        AssignmentOutcome::ReadFailed {
            stage: err.stage(),
            error: err.to_string(),
        }
    }

    pub(crate) fn write_failed(delivered: usize, total: usize, err: &ReconcileError) -> Self {
        AssignmentOutcome::WriteFailed {
            delivered,
            total,
            stage: err.stage(),
            error: err.to_string(),
        }
    }

    /// 完成写入超时：写入可能在超时后仍被提交，持久化结果未知
    pub(crate) fn write_unknown(delivered: usize, total: usize, err: &ReconcileError) -> Self {
        AssignmentOutcome::WriteFailed {
            delivered,
            total,
            stage: err.stage(),
            error: format!("持久化结果未知，重试前请先核对分配状态: {}", err),
        }
    }

    /// 送达比例（如 "2/3"），无订单计数的结果返回 None
    pub fn ratio(&self) -> Option<String> {
        match self {
            AssignmentOutcome::Completed { delivered, total, .. }
            | AssignmentOutcome::PartiallyFixed { delivered, total, .. }
            | AssignmentOutcome::StillActive { delivered, total }
            | AssignmentOutcome::AlreadyCompleted { delivered, total }
            | AssignmentOutcome::WouldComplete { delivered, total }
            | AssignmentOutcome::WriteFailed { delivered, total, .. } => {
                Some(format!("{}/{}", delivered, total))
            }
            AssignmentOutcome::SkippedNoOrders | AssignmentOutcome::ReadFailed { .. } => None,
        }
    }

    /// 本次运行是否写入了完成状态
    pub fn is_newly_completed(&self) -> bool {
        matches!(
            self,
            AssignmentOutcome::Completed { .. } | AssignmentOutcome::PartiallyFixed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentReconcileEntry {
    pub assignment_id: String,
    pub key: AssignmentKey,
    pub outcome: AssignmentOutcome,
}

/// 结果计数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub completed: usize,
    pub partially_fixed: usize,
    pub skipped_no_orders: usize,
    pub still_active: usize,
    pub already_completed: usize,
    pub would_complete: usize,
    pub failed: usize,
}

// ==========================================
// ReconciliationReport
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub run_id: String,
    pub reference_date: NaiveDate,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// 激活分配列表读取失败时的错误（此时 entries 为空）
    pub list_failure: Option<String>,
    pub entries: Vec<AssignmentReconcileEntry>,
    pub summary: ReconcileSummary,
}

impl ReconciliationReport {
    pub fn new(reference_date: NaiveDate, dry_run: bool, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            reference_date,
            dry_run,
            started_at,
            finished_at: None,
            list_failure: None,
            entries: Vec::new(),
            summary: ReconcileSummary::default(),
        }
    }

    /// 记录单个分配结果并更新计数
    pub fn record(&mut self, entry: AssignmentReconcileEntry) {
        let s = &mut self.summary;
        match entry.outcome {
            AssignmentOutcome::Completed { .. } => s.completed += 1,
            AssignmentOutcome::PartiallyFixed { .. } => s.partially_fixed += 1,
            AssignmentOutcome::SkippedNoOrders => s.skipped_no_orders += 1,
            AssignmentOutcome::StillActive { .. } => s.still_active += 1,
            AssignmentOutcome::AlreadyCompleted { .. } => s.already_completed += 1,
            AssignmentOutcome::WouldComplete { .. } => s.would_complete += 1,
            AssignmentOutcome::ReadFailed { .. } | AssignmentOutcome::WriteFailed { .. } => {
                s.failed += 1
            }
        }
        self.entries.push(entry);
    }

    /// 本次运行新完成的分配
    pub fn newly_completed(&self) -> Vec<&AssignmentReconcileEntry> {
        self.entries
            .iter()
            .filter(|e| e.outcome.is_newly_completed())
            .collect()
    }

    /// 需要人工复核的分配（失败、部分修复、无订单）
    pub fn needs_attention(&self) -> Vec<&AssignmentReconcileEntry> {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.outcome,
                    AssignmentOutcome::PartiallyFixed { .. }
                        | AssignmentOutcome::SkippedNoOrders
                        | AssignmentOutcome::ReadFailed { .. }
                        | AssignmentOutcome::WriteFailed { .. }
                )
            })
            .collect()
    }

    pub fn find(&self, assignment_id: &str) -> Option<&AssignmentReconcileEntry> {
        self.entries.iter().find(|e| e.assignment_id == assignment_id)
    }
}
