// ==========================================
// 配送时段运营核心 - 领域类型定义
// ==========================================
// 职责: 时段阶段、订单状态、配送子记录状态、旧版分配状态
// 约定: 数据库存储值为小写 snake_case（与后端表一致）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 时段阶段 (Slot Phase)
// ==========================================
// 红线: 严格有序，对同一时段/日期随时间单调推进，不回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotPhase {
    Open,           // 接单中（截单前）
    Preparation,    // 备货期（截单后固定 15 分钟）
    ReadyForPickup, // 待取货
    PostPickup,     // 取货窗口已结束
}

impl SlotPhase {
    /// 全部阶段（按时间顺序）
    pub const ALL: [SlotPhase; 4] = [
        SlotPhase::Open,
        SlotPhase::Preparation,
        SlotPhase::ReadyForPickup,
        SlotPhase::PostPickup,
    ];

    /// 是否仍接受新订单
    pub fn accepts_orders(&self) -> bool {
        matches!(self, SlotPhase::Open)
    }

    /// 转换为对外展示/序列化的字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotPhase::Open => "OPEN",
            SlotPhase::Preparation => "PREPARATION",
            SlotPhase::ReadyForPickup => "READY_FOR_PICKUP",
            SlotPhase::PostPickup => "POST_PICKUP",
        }
    }
}

impl fmt::Display for SlotPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 对账只关心终态 delivered，其余状态一律视为"未完成"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    PickedUp,
    OutForDelivery,
    Delivered,
    Cancelled,
    Unknown, // 无法识别的取值
}

impl OrderStatus {
    /// 从数据库字符串解析（未知值 → Unknown）
    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pending" => OrderStatus::Pending,
            "confirmed" => OrderStatus::Confirmed,
            "preparing" => OrderStatus::Preparing,
            "ready" => OrderStatus::Ready,
            "picked_up" => OrderStatus::PickedUp,
            "out_for_delivery" => OrderStatus::OutForDelivery,
            "delivered" => OrderStatus::Delivered,
            "cancelled" => OrderStatus::Cancelled,
            _ => OrderStatus::Unknown,
        }
    }

    /// 转换为数据库存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Unknown => "unknown",
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 配送子记录状态 (Partner Delivery Status)
// ==========================================
// 对应 order_deliveries 表：每个配送员对订单的取送记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Assigned,
    PickedUp,
    Delivered,
    Failed,
    Unknown,
}

impl DeliveryStatus {
    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "assigned" => DeliveryStatus::Assigned,
            "picked_up" => DeliveryStatus::PickedUp,
            "delivered" => DeliveryStatus::Delivered,
            "failed" => DeliveryStatus::Failed,
            _ => DeliveryStatus::Unknown,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::PickedUp => "picked_up",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Unknown => "unknown",
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 旧版分配状态 (Legacy Assignment Status)
// ==========================================
// 对应 delivery_assignments 表（兼容路径，仅做镜像写入）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyAssignmentStatus {
    Assigned,
    InProgress,
    Completed,
    Unknown,
}

impl LegacyAssignmentStatus {
    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "assigned" => LegacyAssignmentStatus::Assigned,
            "in_progress" => LegacyAssignmentStatus::InProgress,
            "completed" => LegacyAssignmentStatus::Completed,
            _ => LegacyAssignmentStatus::Unknown,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            LegacyAssignmentStatus::Assigned => "assigned",
            LegacyAssignmentStatus::InProgress => "in_progress",
            LegacyAssignmentStatus::Completed => "completed",
            LegacyAssignmentStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LegacyAssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_phase_ordering() {
        assert!(SlotPhase::Open < SlotPhase::Preparation);
        assert!(SlotPhase::Preparation < SlotPhase::ReadyForPickup);
        assert!(SlotPhase::ReadyForPickup < SlotPhase::PostPickup);
        assert!(SlotPhase::Open.accepts_orders());
        assert!(!SlotPhase::Preparation.accepts_orders());
    }

    #[test]
    fn test_order_status_parsing() {
        assert_eq!(OrderStatus::from_db_str("delivered"), OrderStatus::Delivered);
        assert_eq!(OrderStatus::from_db_str(" Delivered "), OrderStatus::Delivered);
        assert_eq!(OrderStatus::from_db_str("out_for_delivery"), OrderStatus::OutForDelivery);
        assert_eq!(OrderStatus::from_db_str("shipped"), OrderStatus::Unknown);
        assert!(!OrderStatus::Unknown.is_delivered());
    }

    #[test]
    fn test_slot_phase_serde_name() {
        let json = serde_json::to_string(&SlotPhase::ReadyForPickup).unwrap();
        assert_eq!(json, "\"READY_FOR_PICKUP\"");
        assert_eq!(SlotPhase::PostPickup.to_string(), "POST_PICKUP");
    }
}
