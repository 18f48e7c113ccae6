// ==========================================
// 配送时段运营核心 - 配送分配数据仓储
// ==========================================
// 对齐: delivery_partner_sector_assignments 表（权威记录）
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::assignment::{Assignment, AssignmentKey};
use crate::repository::error::{parse_date_column, RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT
        assignment_id, delivery_partner_id, slot_id, sector_id,
        assigned_date, is_active, completed_at
    FROM delivery_partner_sector_assignments
"#;

// 数据库原始行（字符串列在仓储外解析）
struct AssignmentRow {
    assignment_id: String,
    delivery_partner_id: String,
    slot_id: String,
    sector_id: String,
    assigned_date: String,
    is_active: bool,
    completed_at: Option<String>,
}

impl AssignmentRow {
    fn from_row(row: &Row<'_>) -> SqliteResult<Self> {
        Ok(Self {
            assignment_id: row.get(0)?,
            delivery_partner_id: row.get(1)?,
            slot_id: row.get(2)?,
            sector_id: row.get(3)?,
            assigned_date: row.get(4)?,
            is_active: row.get::<_, i64>(5)? != 0,
            completed_at: row.get(6)?,
        })
    }

    fn into_assignment(self) -> RepositoryResult<Assignment> {
        let completed_at = match self.completed_at {
            Some(raw) => Some(parse_timestamp_column("completed_at", &raw)?),
            None => None,
        };
        Ok(Assignment {
            assignment_id: self.assignment_id,
            key: AssignmentKey {
                delivery_partner_id: self.delivery_partner_id,
                slot_id: self.slot_id,
                sector_id: self.sector_id,
                assigned_date: parse_date_column("assigned_date", &self.assigned_date)?,
            },
            is_active: self.is_active,
            completed_at,
        })
    }
}

/// 解析 RFC3339 时间戳列
pub(crate) fn parse_timestamp_column(field: &str, raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("{} ({})", raw, e),
        })
}

// ==========================================
// AssignmentRepository - 配送分配仓储
// ==========================================
pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
    /// 创建新的 AssignmentRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新建分配
    pub fn insert(&self, assignment: &Assignment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO delivery_partner_sector_assignments (
                assignment_id, delivery_partner_id, slot_id, sector_id,
                assigned_date, is_active, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                assignment.assignment_id,
                assignment.key.delivery_partner_id,
                assignment.key.slot_id,
                assignment.key.sector_id,
                assignment.key.assigned_date.format("%Y-%m-%d").to_string(),
                assignment.is_active as i64,
                assignment.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// 按主键查询
    ///
    /// # 返回
    /// - Ok(Some(Assignment)): 找到
    /// - Ok(None): 未找到
    pub fn find_by_id(&self, assignment_id: &str) -> RepositoryResult<Option<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE assignment_id = ?1", SELECT_COLUMNS);
        let row = conn
            .query_row(&sql, params![assignment_id], AssignmentRow::from_row)
            .optional()?;

        row.map(AssignmentRow::into_assignment).transpose()
    }

    /// 查询截至指定日期（含）仍处于激活状态的分配
    ///
    /// 排序: assigned_date, assignment_id（稳定顺序）
    pub fn find_active_up_to(&self, up_to: NaiveDate) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE is_active = 1 AND assigned_date <= ?1 ORDER BY assigned_date ASC, assignment_id ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![up_to.format("%Y-%m-%d").to_string()], AssignmentRow::from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter().map(AssignmentRow::into_assignment).collect()
    }

    /// 条件完成: 仅当分配仍处于激活状态时写入
    ///
    /// # 返回
    /// - Ok(1): 本次写入生效
    /// - Ok(0): 已被其他运行完成（或不存在）
    pub fn complete_if_active(
        &self,
        assignment_id: &str,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE delivery_partner_sector_assignments
            SET is_active = 0, completed_at = ?2
            WHERE assignment_id = ?1 AND is_active = 1
            "#,
            params![assignment_id, completed_at.to_rfc3339()],
        )?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> AssignmentRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        AssignmentRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn make(id: &str, date: NaiveDate) -> Assignment {
        Assignment::new(
            id,
            AssignmentKey {
                delivery_partner_id: "dp1".to_string(),
                slot_id: format!("slot-{}", id),
                sector_id: "sec1".to_string(),
                assigned_date: date,
            },
        )
    }

    #[test]
    fn test_find_active_up_to_filters_future_and_inactive() {
        let repo = setup();
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        repo.insert(&make("a1", d1)).unwrap();
        repo.insert(&make("a2", d2)).unwrap();
        let mut done = make("a3", d1);
        done.is_active = false;
        done.completed_at = Some(Utc::now());
        repo.insert(&done).unwrap();

        let active = repo.find_active_up_to(d1).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].assignment_id, "a1");

        let active = repo.find_active_up_to(d2).unwrap();
        assert_eq!(active.len(), 2);
    }

    #[test]
    fn test_complete_if_active_is_conditional() {
        let repo = setup();
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        repo.insert(&make("a1", d1)).unwrap();

        let now = Utc::now();
        assert_eq!(repo.complete_if_active("a1", now).unwrap(), 1);
        assert_eq!(repo.complete_if_active("a1", now).unwrap(), 0);

        let stored = repo.find_by_id("a1").unwrap().unwrap();
        assert!(!stored.is_active);
        assert!(stored.is_completed());
        assert_eq!(
            stored.completed_at.unwrap().timestamp(),
            now.timestamp()
        );
    }
}
