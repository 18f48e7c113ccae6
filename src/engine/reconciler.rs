// ==========================================
// 配送时段运营核心 - 配送分配对账引擎
// ==========================================
// 职责: 检测并修复"订单已全部送达"与"分配仍为激活"之间的偏差
// 红线:
// - 零订单不是完成证据，保持激活并报告
// - 完成写入为条件写入（仅当仍激活），保证至多一次完成
// - 单个分配的失败隔离，不中断整次对账
// - 不自动重新激活已完成分配
// ==========================================

use crate::config::ReconcileConfigReader;
use crate::domain::assignment::Assignment;
use crate::engine::reconcile_error::{ReconcileError, ReconcileStage};
use crate::engine::report::{AssignmentOutcome, AssignmentReconcileEntry, ReconciliationReport};
use crate::engine::store::{AssignmentStore, CompletionWrite, LegacyAssignmentMirror};
use crate::repository::error::RepositoryResult;
use chrono::{DateTime, NaiveDate, Utc};
use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 默认单次存储操作超时（毫秒）
pub const DEFAULT_ITEM_TIMEOUT_MS: u64 = 10_000;

// ==========================================
// ReconcilerSettings - 对账参数
// ==========================================
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub item_timeout: Duration,     // 单次存储操作超时
    pub legacy_mirror_enabled: bool, // 是否镜像写入旧版分配表
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            item_timeout: Duration::from_millis(DEFAULT_ITEM_TIMEOUT_MS),
            legacy_mirror_enabled: true,
        }
    }
}

impl ReconcilerSettings {
    /// 从配置读取器加载
    pub async fn load(config: &dyn ReconcileConfigReader) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            item_timeout: Duration::from_millis(config.get_item_timeout_ms().await?),
            legacy_mirror_enabled: config.get_legacy_mirror_enabled().await?,
        })
    }
}

/// 单次对账选项
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// 试运行: 只读不写
    pub dry_run: bool,
}

// ==========================================
// AssignmentReconciler
// ==========================================
pub struct AssignmentReconciler {
    store: Arc<dyn AssignmentStore>,
    legacy: Option<Arc<dyn LegacyAssignmentMirror>>,
    settings: ReconcilerSettings,
}

impl AssignmentReconciler {
    /// 创建对账引擎
    ///
    /// # 参数
    /// - store: 权威分配存储
    /// - legacy: 旧版分配兼容层（None 表示不存在旧版表）
    /// - settings: 对账参数
    pub fn new(
        store: Arc<dyn AssignmentStore>,
        legacy: Option<Arc<dyn LegacyAssignmentMirror>>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            store,
            legacy,
            settings,
        }
    }

    /// 对账（主入口）
    pub async fn reconcile(&self, reference_date: NaiveDate) -> ReconciliationReport {
        self.reconcile_with(reference_date, ReconcileOptions::default(), Utc::now())
            .await
    }

    /// 对账（指定选项与完成时间戳）
    ///
    /// # 参数
    /// - reference_date: 参考日期，只处理 assigned_date <= reference_date 的分配
    /// - options: 对账选项
    /// - now: 完成时间戳 completed_at
    pub async fn reconcile_with(
        &self,
        reference_date: NaiveDate,
        options: ReconcileOptions,
        now: DateTime<Utc>,
    ) -> ReconciliationReport {
        let mut report = ReconciliationReport::new(reference_date, options.dry_run, now);

        let assignments = match self
            .guarded(
                ReconcileStage::ListAssignments,
                self.store.list_active_assignments(reference_date),
            )
            .await
        {
            Ok(list) => list,
            Err(e) => {
                warn!(
                    run_id = %report.run_id,
                    reference_date = %reference_date,
                    error = %e,
                    "激活分配读取失败，本次对账无结果"
                );
                report.list_failure = Some(e.to_string());
                report.finished_at = Some(Utc::now());
                return report;
            }
        };

        info!(
            run_id = %report.run_id,
            reference_date = %reference_date,
            dry_run = options.dry_run,
            active = assignments.len(),
            "开始对账"
        );

        for assignment in assignments {
            let outcome = self.reconcile_one(&assignment, options, now).await;
            report.record(AssignmentReconcileEntry {
                assignment_id: assignment.assignment_id,
                key: assignment.key,
                outcome,
            });
        }

        report.finished_at = Some(Utc::now());
        let s = &report.summary;
        info!(
            run_id = %report.run_id,
            completed = s.completed,
            partially_fixed = s.partially_fixed,
            skipped_no_orders = s.skipped_no_orders,
            still_active = s.still_active,
            already_completed = s.already_completed,
            would_complete = s.would_complete,
            failed = s.failed,
            "对账完成"
        );

        report
    }

    /// 单个分配对账
    async fn reconcile_one(
        &self,
        assignment: &Assignment,
        options: ReconcileOptions,
        now: DateTime<Utc>,
    ) -> AssignmentOutcome {
        let id = assignment.assignment_id.as_str();

        // === 步骤 1: 读取该配送员的匹配订单 ===
        let orders = match self
            .guarded(
                ReconcileStage::ReadOrders,
                self.store.list_partner_orders(assignment),
            )
            .await
        {
            Ok(orders) => orders,
            Err(e) => {
                warn!(assignment_id = id, key = %assignment.key, error = %e, "订单读取失败");
                return AssignmentOutcome::read_failed(&e);
            }
        };

        // === 步骤 2: 零订单 → 无法判定，保持激活 ===
        if orders.is_empty() {
            debug!(assignment_id = id, key = %assignment.key, "无匹配订单，跳过");
            return AssignmentOutcome::SkippedNoOrders;
        }

        // === 步骤 3: 统计送达 ===
        let total = orders.len();
        let delivered = orders.iter().filter(|o| o.is_fully_delivered()).count();

        if delivered < total {
            debug!(assignment_id = id, delivered, total, "仍有未送达订单");
            return AssignmentOutcome::StillActive { delivered, total };
        }

        if options.dry_run {
            info!(assignment_id = id, delivered, total, "[试运行] 满足完成条件");
            return AssignmentOutcome::WouldComplete { delivered, total };
        }

        // === 步骤 4: 条件完成写入 ===
        let write = match self
            .guarded(
                ReconcileStage::CompleteAssignment,
                self.store.complete_assignment(id, now),
            )
            .await
        {
            Ok(write) => write,
            Err(e @ ReconcileError::Timeout { .. }) => {
                warn!(assignment_id = id, key = %assignment.key, error = %e, "完成写入超时，持久化结果未知");
                return AssignmentOutcome::write_unknown(delivered, total, &e);
            }
            Err(e) => {
                warn!(assignment_id = id, key = %assignment.key, error = %e, "已判定完成但写入失败");
                return AssignmentOutcome::write_failed(delivered, total, &e);
            }
        };

        if write == CompletionWrite::AlreadyInactive {
            info!(assignment_id = id, "分配已被其他对账运行完成");
            return AssignmentOutcome::AlreadyCompleted { delivered, total };
        }

        // === 步骤 5: 旧版记录镜像 ===
        let legacy = match (&self.legacy, self.settings.legacy_mirror_enabled) {
            (Some(legacy), true) => legacy,
            _ => {
                info!(assignment_id = id, delivered, total, "分配已完成");
                return AssignmentOutcome::Completed {
                    delivered,
                    total,
                    legacy_mirror: None,
                };
            }
        };

        let key = &assignment.key;
        match self
            .guarded(
                ReconcileStage::MirrorLegacy,
                legacy.mirror_completion(&key.delivery_partner_id, &key.slot_id, key.assigned_date, now),
            )
            .await
        {
            Ok(mirror) => {
                info!(assignment_id = id, delivered, total, legacy = ?mirror, "分配已完成");
                AssignmentOutcome::Completed {
                    delivered,
                    total,
                    legacy_mirror: Some(mirror),
                }
            }
            Err(e) => {
                warn!(assignment_id = id, key = %key, error = %e, "旧版记录镜像失败，分配部分修复");
                AssignmentOutcome::PartiallyFixed {
                    delivered,
                    total,
                    error: e.to_string(),
                }
            }
        }
    }

    /// 为单次存储操作施加超时，并按阶段归类错误
    async fn guarded<T, F>(&self, stage: ReconcileStage, fut: F) -> Result<T, ReconcileError>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        match tokio::time::timeout(self.settings.item_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(match stage {
                ReconcileStage::ListAssignments | ReconcileStage::ReadOrders => {
                    ReconcileError::ReadFailure { stage, source }
                }
                ReconcileStage::CompleteAssignment => ReconcileError::WriteFailure { stage, source },
                ReconcileStage::MirrorLegacy => ReconcileError::LegacyMirrorFailure { source },
            }),
            Err(_) => Err(ReconcileError::Timeout {
                stage,
                timeout_ms: self.settings.item_timeout.as_millis() as u64,
            }),
        }
    }
}
