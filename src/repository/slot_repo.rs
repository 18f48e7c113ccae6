// ==========================================
// 配送时段运营核心 - 配送时段数据仓储
// ==========================================
// 对齐: delivery_slot 表
// 时间列存储为 "HH:mm" 或 "HH:mm:ss" 文本
// ==========================================

use crate::domain::slot::{parse_time_of_day, DeliverySlot};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct DeliverySlotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DeliverySlotRepository {
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

    pub fn insert(&self, slot: &DeliverySlot) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO delivery_slot (slot_id, name, start_time, cutoff_time, pickup_delay_minutes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                slot.slot_id,
                slot.name,
                slot.start_time.format("%H:%M").to_string(),
                slot.cutoff_time.format("%H:%M").to_string(),
                slot.pickup_delay_minutes,
            ],
        )?;
        Ok(())
    }

    /// 按主键查询时段
    pub fn find_by_id(&self, slot_id: &str) -> RepositoryResult<Option<DeliverySlot>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT slot_id, name, start_time, cutoff_time, pickup_delay_minutes
                FROM delivery_slot
                WHERE slot_id = ?1
                "#,
                params![slot_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(into_slot).transpose()
    }

    /// 查询全部启用中的时段（按截单时间排序）
    pub fn list_active(&self) -> RepositoryResult<Vec<DeliverySlot>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT slot_id, name, start_time, cutoff_time, pickup_delay_minutes
            FROM delivery_slot
            WHERE is_active = 1
            ORDER BY cutoff_time ASC, slot_id ASC
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        rows.into_iter().map(into_slot).collect()
    }
}

fn into_slot(
    (slot_id, name, start_raw, cutoff_raw, pickup_delay_minutes): (
        String,
        Option<String>,
        String,
        String,
        Option<i64>,
    ),
) -> RepositoryResult<DeliverySlot> {
    let to_field_error = |e: crate::domain::slot::SlotConfigError| RepositoryError::FieldValueError {
        field: "delivery_slot".to_string(),
        message: format!("slot_id={}: {}", slot_id, e),
    };
    let start_time = parse_time_of_day("start_time", &start_raw).map_err(to_field_error)?;
    let cutoff_time = parse_time_of_day("cutoff_time", &cutoff_raw).map_err(to_field_error)?;

    Ok(DeliverySlot {
        slot_id,
        name,
        start_time,
        cutoff_time,
        pickup_delay_minutes,
    })
}
