// ==========================================
// 配送时段运营核心 - 旧版分配数据仓储
// ==========================================
// 对齐: delivery_assignments 表（旧版状态记录）
// 说明: 仅作为兼容路径，按 (配送员, 时段, 日期) 定位
// ==========================================

use crate::domain::assignment::LegacyAssignment;
use crate::domain::types::LegacyAssignmentStatus;
use crate::repository::assignment_repo::parse_timestamp_column;
use crate::repository::error::{parse_date_column, RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct LegacyAssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LegacyAssignmentRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, record: &LegacyAssignment) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO delivery_assignments (
                legacy_id, delivery_partner_id, slot_id, assigned_date, status, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.legacy_id,
                record.delivery_partner_id,
                record.slot_id,
                record.assigned_date.format("%Y-%m-%d").to_string(),
                record.status.to_db_str(),
                record.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// 按 (配送员, 时段, 日期) 查询
    pub fn find_by_key(
        &self,
        delivery_partner_id: &str,
        slot_id: &str,
        assigned_date: NaiveDate,
    ) -> RepositoryResult<Option<LegacyAssignment>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT legacy_id, delivery_partner_id, slot_id, assigned_date, status, completed_at
                FROM delivery_assignments
                WHERE delivery_partner_id = ?1 AND slot_id = ?2 AND assigned_date = ?3
                "#,
                params![
                    delivery_partner_id,
                    slot_id,
                    assigned_date.format("%Y-%m-%d").to_string()
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((legacy_id, partner_id, slot_id, date_raw, status, completed_raw)) = row else {
            return Ok(None);
        };

        let completed_at = match completed_raw {
            Some(raw) => Some(parse_timestamp_column("completed_at", &raw)?),
            None => None,
        };

        Ok(Some(LegacyAssignment {
            legacy_id,
            delivery_partner_id: partner_id,
            slot_id,
            assigned_date: parse_date_column("assigned_date", &date_raw)?,
            status: LegacyAssignmentStatus::from_db_str(&status),
            completed_at,
        }))
    }

    /// 将旧版记录标记为 completed
    ///
    /// # 返回
    /// - Ok(rows): 受影响行数，0 表示不存在对应旧版记录
    pub fn mark_completed(
        &self,
        delivery_partner_id: &str,
        slot_id: &str,
        assigned_date: NaiveDate,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE delivery_assignments
            SET status = ?4, completed_at = ?5
            WHERE delivery_partner_id = ?1 AND slot_id = ?2 AND assigned_date = ?3
            "#,
            params![
                delivery_partner_id,
                slot_id,
                assigned_date.format("%Y-%m-%d").to_string(),
                LegacyAssignmentStatus::Completed.to_db_str(),
                completed_at.to_rfc3339(),
            ],
        )?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_completed() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        let repo = LegacyAssignmentRepository::from_connection(Arc::new(Mutex::new(conn)));
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert_eq!(repo.mark_completed("p1", "s1", date, Utc::now()).unwrap(), 0);

        repo.insert(&LegacyAssignment {
            legacy_id: "l1".to_string(),
            delivery_partner_id: "p1".to_string(),
            slot_id: "s1".to_string(),
            assigned_date: date,
            status: LegacyAssignmentStatus::InProgress,
            completed_at: None,
        })
        .unwrap();

        assert_eq!(repo.mark_completed("p1", "s1", date, Utc::now()).unwrap(), 1);
        let stored = repo.find_by_key("p1", "s1", date).unwrap().unwrap();
        assert_eq!(stored.status, LegacyAssignmentStatus::Completed);
        assert!(stored.completed_at.is_some());
    }
}
