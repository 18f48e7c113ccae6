// ==========================================
// 配送时段运营核心 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + Tokio
// 职责: 时段阶段判定 + 配送分配对账（定时任务）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 入口组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DeliveryStatus, LegacyAssignmentStatus, OrderStatus, SlotPhase};

// 领域实体
pub use domain::{
    Assignment, AssignmentKey, DeliverySlot, DeliverySlotConfig, LegacyAssignment, Order,
    PartnerDelivery, PartnerOrder,
};

// 引擎
pub use engine::{
    AssignmentOutcome, AssignmentReconciler, ReconciliationReport, SlotPhaseClassifier,
};

// API
pub use api::DeliveryOpsApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "配送时段运营核心";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
