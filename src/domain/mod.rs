// ==========================================
// 配送时段运营核心 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod assignment;
pub mod order;
pub mod slot;
pub mod types;

// 重导出核心类型
pub use assignment::{Assignment, AssignmentKey, LegacyAssignment};
pub use order::{Order, PartnerDelivery, PartnerOrder};
pub use slot::{
    DeliverySlot, DeliverySlotConfig, SlotConfigError, MAX_PICKUP_DELAY_MINUTES,
    PREPARATION_WINDOW_MINUTES,
};
pub use types::{DeliveryStatus, LegacyAssignmentStatus, OrderStatus, SlotPhase};
