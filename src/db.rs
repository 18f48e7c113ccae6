// ==========================================
// 配送时段运营核心 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 提供建表脚本，供 init-db 命令与测试共用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// - delivery_partner_sector_assignments: 权威分配表
/// - delivery_assignments: 旧版分配表，仅做完成状态镜像
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS delivery_slot (
            slot_id TEXT PRIMARY KEY,
            name TEXT,
            start_time TEXT NOT NULL,
            cutoff_time TEXT NOT NULL,
            pickup_delay_minutes INTEGER,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS delivery_partner_sector_assignments (
            assignment_id TEXT PRIMARY KEY,
            delivery_partner_id TEXT NOT NULL,
            slot_id TEXT NOT NULL,
            sector_id TEXT NOT NULL,
            assigned_date TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            completed_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (delivery_partner_id, slot_id, sector_id, assigned_date)
        );

        CREATE INDEX IF NOT EXISTS idx_dpsa_active_date
            ON delivery_partner_sector_assignments (is_active, assigned_date);

        CREATE TABLE IF NOT EXISTS delivery_assignments (
            legacy_id TEXT PRIMARY KEY,
            delivery_partner_id TEXT NOT NULL,
            slot_id TEXT NOT NULL,
            assigned_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'assigned',
            completed_at TEXT,
            UNIQUE (delivery_partner_id, slot_id, assigned_date)
        );

        CREATE TABLE IF NOT EXISTS orders (
            order_id TEXT PRIMARY KEY,
            slot_id TEXT NOT NULL,
            delivery_date TEXT NOT NULL,
            order_status TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_orders_slot_date
            ON orders (slot_id, delivery_date);

        CREATE TABLE IF NOT EXISTS order_deliveries (
            delivery_id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES orders(order_id) ON DELETE CASCADE,
            delivery_partner_id TEXT NOT NULL,
            status TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_order_deliveries_partner
            ON order_deliveries (delivery_partner_id, order_id);

        CREATE TABLE IF NOT EXISTS reconcile_run (
            run_id TEXT PRIMARY KEY,
            reference_date TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            dry_run INTEGER NOT NULL DEFAULT 0,
            summary_json TEXT NOT NULL,
            report_json TEXT NOT NULL,
            config_snapshot_json TEXT
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
