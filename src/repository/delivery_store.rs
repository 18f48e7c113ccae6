// ==========================================
// 配送时段运营核心 - SQLite 对账存储适配器
// ==========================================
// 职责: 以仓储实现引擎层的 AssignmentStore / LegacyAssignmentMirror
// 说明: 仓储为同步 rusqlite 调用，单连接互斥访问；
//       每次调用放入 spawn_blocking，使引擎侧超时可以生效
// ==========================================

use crate::domain::assignment::Assignment;
use crate::domain::order::PartnerOrder;
use crate::engine::store::{
    AssignmentStore, CompletionWrite, LegacyAssignmentMirror, LegacyMirrorOutcome,
};
use crate::repository::assignment_repo::AssignmentRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::legacy_assignment_repo::LegacyAssignmentRepository;
use crate::repository::order_repo::OrderRepository;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// 对账存储仓储集合
pub struct SqliteDeliveryStore {
    assignment_repo: Arc<AssignmentRepository>,
    order_repo: Arc<OrderRepository>,
    legacy_repo: Arc<LegacyAssignmentRepository>,
}

impl SqliteDeliveryStore {
    pub fn new(
        assignment_repo: Arc<AssignmentRepository>,
        order_repo: Arc<OrderRepository>,
        legacy_repo: Arc<LegacyAssignmentRepository>,
    ) -> Self {
        Self {
            assignment_repo,
            order_repo,
            legacy_repo,
        }
    }

    /// 基于共享连接构建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self::new(
            Arc::new(AssignmentRepository::from_connection(conn.clone())),
            Arc::new(OrderRepository::from_connection(conn.clone())),
            Arc::new(LegacyAssignmentRepository::from_connection(conn)),
        )
    }
}

/// 在阻塞线程池中执行仓储调用
///
/// 调用方放弃等待（超时）后，已开始的 SQLite 操作仍会执行完毕
async fn run_blocking<T, F>(f: F) -> RepositoryResult<T>
where
    F: FnOnce() -> RepositoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RepositoryError::InternalError(format!("任务执行失败: {}", e)))?
}

#[async_trait]
impl AssignmentStore for SqliteDeliveryStore {
    async fn list_active_assignments(&self, up_to: NaiveDate) -> RepositoryResult<Vec<Assignment>> {
        let repo = self.assignment_repo.clone();
        run_blocking(move || repo.find_active_up_to(up_to)).await
    }

    async fn list_partner_orders(&self, assignment: &Assignment) -> RepositoryResult<Vec<PartnerOrder>> {
        let repo = self.order_repo.clone();
        let slot_id = assignment.key.slot_id.clone();
        let partner_id = assignment.key.delivery_partner_id.clone();
        let date = assignment.key.assigned_date;
        run_blocking(move || repo.find_partner_orders(&slot_id, date, &partner_id)).await
    }

    async fn complete_assignment(
        &self,
        assignment_id: &str,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<CompletionWrite> {
        let repo = self.assignment_repo.clone();
        let assignment_id = assignment_id.to_string();
        let rows = run_blocking(move || repo.complete_if_active(&assignment_id, completed_at)).await?;
        Ok(if rows > 0 {
            CompletionWrite::Applied
        } else {
            CompletionWrite::AlreadyInactive
        })
    }
}

#[async_trait]
impl LegacyAssignmentMirror for SqliteDeliveryStore {
    async fn mirror_completion(
        &self,
        delivery_partner_id: &str,
        slot_id: &str,
        assigned_date: NaiveDate,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<LegacyMirrorOutcome> {
        let repo = self.legacy_repo.clone();
        let partner_id = delivery_partner_id.to_string();
        let slot_id = slot_id.to_string();
        let rows = run_blocking(move || {
            repo.mark_completed(&partner_id, &slot_id, assigned_date, completed_at)
        })
        .await?;
        Ok(if rows > 0 {
            LegacyMirrorOutcome::Updated
        } else {
            LegacyMirrorOutcome::Missing
        })
    }
}
