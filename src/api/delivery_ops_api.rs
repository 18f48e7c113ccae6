// ==========================================
// 配送时段运营核心 - 配送运营 API
// ==========================================
// 职责: 对外门面（定时任务 / 命令行 / 展示层）
// 1. 对账: 加载配置 → 执行对账 → 记录运行
// 2. 时段阶段查询
// 3. 对账运行记录查询
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ReconcileConfigReader};
use crate::domain::types::SlotPhase;
use crate::engine::{
    AssignmentReconciler, LegacyAssignmentMirror, ReconcileOptions, ReconcileSummary, ReconcilerSettings,
    ReconciliationReport, SlotPhaseClassifier, SlotPhaseWindows,
};
use crate::repository::{DeliverySlotRepository, ReconcileRunRepository, SqliteDeliveryStore};

/// 运行记录查询上限
const MAX_RECENT_RUNS: usize = 100;

/// 时段阶段查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotPhaseInfo {
    pub slot_id: String,
    pub delivery_date: NaiveDate,
    pub phase: SlotPhase,
    pub accepts_orders: bool,
    pub windows: SlotPhaseWindows,
    pub next_phase: Option<SlotPhase>,
    pub next_phase_at: Option<NaiveDateTime>,
}

// ==========================================
// DeliveryOpsApi
// ==========================================
pub struct DeliveryOpsApi {
    conn: Arc<Mutex<Connection>>,
    config: Arc<ConfigManager>,
    slot_repo: Arc<DeliverySlotRepository>,
    run_repo: Arc<ReconcileRunRepository>,
}

impl DeliveryOpsApi {
    /// 基于共享连接创建 API
    pub fn new(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        Ok(Self {
            slot_repo: Arc::new(DeliverySlotRepository::from_connection(conn.clone())),
            run_repo: Arc::new(ReconcileRunRepository::new(conn.clone())),
            config: Arc::new(config),
            conn,
        })
    }

    /// 执行配送分配对账
    ///
    /// # 参数
    /// - reference_date: 参考日期
    /// - dry_run: 试运行（只读，不记录运行）
    ///
    /// # 返回
    /// - Ok(report): 对账报告（单个分配的失败包含在报告中）
    /// - Err: 仅配置读取失败
    pub async fn reconcile_assignments(
        &self,
        reference_date: NaiveDate,
        dry_run: bool,
    ) -> ApiResult<ReconciliationReport> {
        let settings = ReconcilerSettings::load(self.config.as_ref())
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let store = Arc::new(SqliteDeliveryStore::from_connection(self.conn.clone()));
        let legacy: Arc<dyn LegacyAssignmentMirror> = store.clone();
        let reconciler = AssignmentReconciler::new(store, Some(legacy), settings);

        let report = reconciler
            .reconcile_with(reference_date, ReconcileOptions { dry_run }, chrono::Utc::now())
            .await;

        if !dry_run {
            let snapshot = match self.config.get_config_snapshot() {
                Ok(json) => Some(json),
                Err(e) => {
                    tracing::warn!(run_id = %report.run_id, error = %e, "配置快照读取失败");
                    None
                }
            };
            // 运行记录写入失败不影响已完成的修复
            if let Err(e) = self.run_repo.insert(&report, snapshot.as_deref()) {
                tracing::warn!(run_id = %report.run_id, error = %e, "对账运行记录写入失败");
            }
        }

        Ok(report)
    }

    /// 查询时段在指定时刻的阶段
    ///
    /// # 参数
    /// - slot_id: 时段ID
    /// - delivery_date: 配送日期
    /// - now: 参考时刻（本地时间）
    pub async fn get_slot_phase(
        &self,
        slot_id: &str,
        delivery_date: NaiveDate,
        now: NaiveDateTime,
    ) -> ApiResult<SlotPhaseInfo> {
        if slot_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("时段ID不能为空".to_string()));
        }

        let slot = self
            .slot_repo
            .find_by_id(slot_id)?
            .ok_or_else(|| ApiError::NotFound(format!("时段(id={})不存在", slot_id)))?;

        let default_delay = self
            .config
            .get_default_pickup_delay_minutes()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let config = slot.config_for(delivery_date, default_delay);
        config.validate()?;

        let phase = SlotPhaseClassifier::classify(&config, now);
        let next = SlotPhaseClassifier::next_transition(&config, now);

        Ok(SlotPhaseInfo {
            slot_id: slot.slot_id,
            delivery_date,
            phase,
            accepts_orders: phase.accepts_orders(),
            windows: SlotPhaseClassifier::windows(&config),
            next_phase: next.map(|(p, _)| p),
            next_phase_at: next.map(|(_, t)| t),
        })
    }

    /// 读取历史对账报告
    pub fn get_reconcile_run(&self, run_id: &str) -> ApiResult<ReconciliationReport> {
        if run_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("运行ID不能为空".to_string()));
        }
        self.run_repo
            .find_by_id(run_id)?
            .ok_or_else(|| ApiError::NotFound(format!("对账运行(id={})不存在", run_id)))
    }

    /// 读取对账运行时的配置快照
    pub fn get_reconcile_run_config(&self, run_id: &str) -> ApiResult<serde_json::Value> {
        let raw = self
            .run_repo
            .find_config_snapshot(run_id)?
            .ok_or_else(|| ApiError::NotFound(format!("对账运行(id={})配置快照不存在", run_id)))?;
        serde_json::from_str(&raw).map_err(|e| ApiError::InternalError(e.to_string()))
    }

    /// 最近的对账运行摘要
    pub fn list_recent_runs(&self, limit: usize) -> ApiResult<Vec<(String, ReconcileSummary)>> {
        if limit == 0 || limit > MAX_RECENT_RUNS {
            return Err(ApiError::InvalidInput(format!(
                "limit 必须在 1..={} 之间",
                MAX_RECENT_RUNS
            )));
        }
        Ok(self.run_repo.list_recent(limit)?)
    }
}
