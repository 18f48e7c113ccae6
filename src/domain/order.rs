// ==========================================
// 配送时段运营核心 - 订单领域模型
// ==========================================
// 对齐: orders 表 + order_deliveries 表（配送员子记录）
// 说明: 对账核心只读订单，不修改订单状态
// ==========================================

use crate::domain::types::{DeliveryStatus, OrderStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Order - 订单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub slot_id: String,
    pub delivery_date: NaiveDate,
    pub order_status: OrderStatus,
}

// ==========================================
// PartnerDelivery - 配送员子记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerDelivery {
    pub delivery_id: String,
    pub order_id: String,
    pub delivery_partner_id: String,
    pub status: DeliveryStatus,
}

// ==========================================
// PartnerOrder - 按配送员过滤后的订单视图
// ==========================================
// 一个订单可能有多条该配送员的子记录（例如多商家取货）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerOrder {
    pub order: Order,
    pub deliveries: Vec<PartnerDelivery>,
}

impl PartnerOrder {
    /// 订单是否已送达
    ///
    /// 订单级状态与该配送员的全部子记录状态都必须为 delivered；
    /// 没有子记录时不视为送达
    pub fn is_fully_delivered(&self) -> bool {
        self.order.order_status.is_delivered()
            && !self.deliveries.is_empty()
            && self.deliveries.iter().all(|d| d.status.is_delivered())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(order_status: OrderStatus, statuses: &[DeliveryStatus]) -> PartnerOrder {
        PartnerOrder {
            order: Order {
                order_id: "o1".to_string(),
                slot_id: "s1".to_string(),
                delivery_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                order_status,
            },
            deliveries: statuses
                .iter()
                .enumerate()
                .map(|(i, s)| PartnerDelivery {
                    delivery_id: format!("d{}", i),
                    order_id: "o1".to_string(),
                    delivery_partner_id: "p1".to_string(),
                    status: *s,
                })
                .collect(),
        }
    }

    #[test]
    fn test_requires_both_levels_delivered() {
        assert!(make(OrderStatus::Delivered, &[DeliveryStatus::Delivered]).is_fully_delivered());
        assert!(!make(OrderStatus::Delivered, &[DeliveryStatus::PickedUp]).is_fully_delivered());
        assert!(!make(OrderStatus::OutForDelivery, &[DeliveryStatus::Delivered]).is_fully_delivered());
    }

    #[test]
    fn test_all_sub_records_must_be_delivered() {
        let order = make(
            OrderStatus::Delivered,
            &[DeliveryStatus::Delivered, DeliveryStatus::Assigned],
        );
        assert!(!order.is_fully_delivered());
    }

    #[test]
    fn test_no_sub_records_is_not_delivered() {
        assert!(!make(OrderStatus::Delivered, &[]).is_fully_delivered());
    }
}
