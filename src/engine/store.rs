// ==========================================
// 配送时段运营核心 - 对账数据访问接口
// ==========================================
// 职责: 定义对账引擎所需的外部存储能力（依赖倒置）
// 说明: Engine 层定义 trait，Repository 层提供实现；
//       测试可注入内存实现
// ==========================================

use crate::domain::assignment::Assignment;
use crate::domain::order::PartnerOrder;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 完成写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionWrite {
    /// 本次写入生效
    Applied,
    /// 写入时分配已非激活（并发运行已完成）
    AlreadyInactive,
}

/// 旧版记录镜像结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyMirrorOutcome {
    Updated,
    Missing, // 不存在对应旧版记录
}

// ==========================================
// AssignmentStore - 权威分配存储
// ==========================================
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// 查询 assigned_date <= up_to 的激活分配（稳定顺序）
    async fn list_active_assignments(&self, up_to: NaiveDate) -> RepositoryResult<Vec<Assignment>>;

    /// 查询分配对应 (时段, 日期) 下、属于该配送员的订单
    async fn list_partner_orders(&self, assignment: &Assignment) -> RepositoryResult<Vec<PartnerOrder>>;

    /// 条件完成写入（仅当仍激活）
    async fn complete_assignment(
        &self,
        assignment_id: &str,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<CompletionWrite>;
}

// ==========================================
// LegacyAssignmentMirror - 旧版分配兼容层
// ==========================================
#[async_trait]
pub trait LegacyAssignmentMirror: Send + Sync {
    async fn mirror_completion(
        &self,
        delivery_partner_id: &str,
        slot_id: &str,
        assigned_date: NaiveDate,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<LegacyMirrorOutcome>;
}
