// ==========================================
// 配送时段运营核心 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::reconcile_config_trait::ReconcileConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 随对账运行记录写入 reconcile_run.config_snapshot_json，便于复核
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }
}

// ==========================================
// ReconcileConfigReader 实现
// ==========================================
// 非法值回退到默认值，并记录告警
#[async_trait]
impl ReconcileConfigReader for ConfigManager {
    async fn get_item_timeout_ms(&self) -> Result<u64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::RECONCILE_ITEM_TIMEOUT_MS, "10000")?;
        match value.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => Ok(ms),
            _ => {
                tracing::warn!(
                    config_key = config_keys::RECONCILE_ITEM_TIMEOUT_MS,
                    value = %value,
                    "配置值无效，使用默认值 10000"
                );
                Ok(10_000)
            }
        }
    }

    async fn get_legacy_mirror_enabled(&self) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::LEGACY_MIRROR_ENABLED, "true")?;
        Ok(!matches!(
            value.trim().to_lowercase().as_str(),
            "false" | "0" | "no" | "off"
        ))
    }

    async fn get_default_pickup_delay_minutes(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_PICKUP_DELAY_MINUTES, "45")?;
        Ok(value.trim().parse::<i64>().unwrap_or(45))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 对账
    pub const RECONCILE_ITEM_TIMEOUT_MS: &str = "reconcile_item_timeout_ms";
    pub const LEGACY_MIRROR_ENABLED: &str = "legacy_mirror_enabled";

    // 时段
    pub const DEFAULT_PICKUP_DELAY_MINUTES: &str = "default_pickup_delay_minutes";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults() {
        let config = setup();
        assert_eq!(config.get_item_timeout_ms().await.unwrap(), 10_000);
        assert!(config.get_legacy_mirror_enabled().await.unwrap());
        assert_eq!(config.get_default_pickup_delay_minutes().await.unwrap(), 45);
    }

    #[tokio::test]
    async fn test_overrides_and_invalid_values() {
        let config = setup();
        config.set_global_config_value(config_keys::LEGACY_MIRROR_ENABLED, "off").unwrap();
        config.set_global_config_value(config_keys::RECONCILE_ITEM_TIMEOUT_MS, "abc").unwrap();
        config.set_global_config_value(config_keys::DEFAULT_PICKUP_DELAY_MINUTES, "30").unwrap();

        assert!(!config.get_legacy_mirror_enabled().await.unwrap());
        assert_eq!(config.get_item_timeout_ms().await.unwrap(), 10_000);
        assert_eq!(config.get_default_pickup_delay_minutes().await.unwrap(), 30);

        let snapshot: HashMap<String, String> =
            serde_json::from_str(&config.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 3);
    }
}
