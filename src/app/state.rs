// ==========================================
// 配送时段运营核心 - 应用状态
// ==========================================
// 职责: 管理共享连接与 API 实例（命令行 / 定时任务入口共用）
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::DeliveryOpsApi;
use crate::db::{ensure_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配送运营API
    pub delivery_ops_api: Arc<DeliveryOpsApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 1. 打开共享连接并应用统一 PRAGMA
    /// 2. 建表（幂等）
    /// 3. 创建 API 实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;

        ensure_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        match read_schema_version(&conn) {
            Ok(Some(v)) if v != CURRENT_SCHEMA_VERSION => {
                tracing::warn!(
                    "schema_version 不一致: 数据库={}, 代码期望={}",
                    v,
                    CURRENT_SCHEMA_VERSION
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("schema_version 读取失败: {}", e),
        }

        let conn = Arc::new(Mutex::new(conn));
        let delivery_ops_api = Arc::new(
            DeliveryOpsApi::new(conn).map_err(|e| format!("无法创建DeliveryOpsApi: {}", e))?,
        );

        Ok(Self {
            db_path,
            delivery_ops_api,
        })
    }
}

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 DELIVERY_SLOT_OPS_DB_PATH（若设置）
/// - 用户数据目录/delivery-slot-ops/delivery_slot_ops.db
/// - 回退: ./delivery_slot_ops.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("DELIVERY_SLOT_OPS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./delivery_slot_ops.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("delivery-slot-ops");
        // 目录创建失败时保留回退路径
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("delivery_slot_ops.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_bootstraps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();
        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
    }
}
