// ==========================================
// 配送时段运营核心 - 对账配置读取 Trait
// ==========================================
// 职责: 定义对账与时段判定所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// ReconcileConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ReconcileConfigReader: Send + Sync {
    /// 获取单次存储操作超时（毫秒）
    ///
    /// # 默认值
    /// - 10000
    async fn get_item_timeout_ms(&self) -> Result<u64, Box<dyn Error>>;

    /// 是否镜像写入旧版分配表
    ///
    /// # 默认值
    /// - true
    async fn get_legacy_mirror_enabled(&self) -> Result<bool, Box<dyn Error>>;

    /// 时段未配置取货延迟时使用的默认值（分钟）
    ///
    /// # 默认值
    /// - 45
    async fn get_default_pickup_delay_minutes(&self) -> Result<i64, Box<dyn Error>>;
}
