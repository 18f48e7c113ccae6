// ==========================================
// 配送时段运营核心 - 对账运行记录仓储
// ==========================================
// 对齐: reconcile_run 表
// 红线: 每次非试运行的对账都必须留痕
// ==========================================

use crate::engine::report::{ReconcileSummary, ReconciliationReport};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct ReconcileRunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReconcileRunRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入对账报告
    ///
    /// # 参数
    /// - report: 对账报告
    /// - config_snapshot: 运行时的配置快照（JSON），读取失败时为 None
    ///
    /// # 返回
    /// - Ok(run_id)
    pub fn insert(
        &self,
        report: &ReconciliationReport,
        config_snapshot: Option<&str>,
    ) -> RepositoryResult<String> {
        let summary_json = serde_json::to_string(&report.summary)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;
        let report_json = serde_json::to_string(report)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;
        let finished_at = report.finished_at.unwrap_or(report.started_at);

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO reconcile_run (
                run_id, reference_date, started_at, finished_at, dry_run,
                summary_json, report_json, config_snapshot_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                report.run_id,
                report.reference_date.format("%Y-%m-%d").to_string(),
                report.started_at.to_rfc3339(),
                finished_at.to_rfc3339(),
                report.dry_run as i64,
                summary_json,
                report_json,
                config_snapshot,
            ],
        )?;

        Ok(report.run_id.clone())
    }

    /// 按 run_id 读取完整报告
    pub fn find_by_id(&self, run_id: &str) -> RepositoryResult<Option<ReconciliationReport>> {
        let conn = self.get_conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT report_json FROM reconcile_run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| RepositoryError::FieldValueError {
                field: "report_json".to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
    }

    /// 读取运行时的配置快照
    ///
    /// # 返回
    /// - Ok(None): 运行不存在或未记录快照
    pub fn find_config_snapshot(&self, run_id: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let raw: Option<Option<String>> = conn
            .query_row(
                "SELECT config_snapshot_json FROM reconcile_run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.flatten())
    }

    /// 最近的运行摘要（按开始时间倒序）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<(String, ReconcileSummary)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT run_id, summary_json
            FROM reconcile_run
            ORDER BY started_at DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter()
            .map(|(run_id, json)| {
                let summary = serde_json::from_str(&json).map_err(|e| {
                    RepositoryError::FieldValueError {
                        field: "summary_json".to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok((run_id, summary))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_insert_and_read_back() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        let repo = ReconcileRunRepository::new(Arc::new(Mutex::new(conn)));

        let mut report = ReconciliationReport::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            false,
            Utc::now(),
        );
        report.summary.completed = 2;
        report.finished_at = Some(Utc::now());

        let run_id = repo
            .insert(&report, Some(r#"{"legacy_mirror_enabled":"true"}"#))
            .unwrap();
        let stored = repo.find_by_id(&run_id).unwrap().unwrap();
        assert_eq!(stored.summary.completed, 2);

        let recent = repo.list_recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].0, run_id);
        assert!(repo.find_by_id("missing").unwrap().is_none());

        assert_eq!(
            repo.find_config_snapshot(&run_id).unwrap().as_deref(),
            Some(r#"{"legacy_mirror_enabled":"true"}"#)
        );
        assert!(repo.find_config_snapshot("missing").unwrap().is_none());
    }
}
