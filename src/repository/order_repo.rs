// ==========================================
// 配送时段运营核心 - 订单数据仓储
// ==========================================
// 对齐: orders 表 + order_deliveries 表
// 红线: Repository 不含业务逻辑（送达判定在领域层）
// ==========================================

use crate::domain::order::{Order, PartnerDelivery, PartnerOrder};
use crate::domain::types::{DeliveryStatus, OrderStatus};
use crate::repository::error::{parse_date_column, RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 创建新的 OrderRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    pub fn insert_order(&self, order: &Order) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO orders (order_id, slot_id, delivery_date, order_status)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                order.order_id,
                order.slot_id,
                order.delivery_date.format("%Y-%m-%d").to_string(),
                order.order_status.to_db_str(),
            ],
        )?;
        Ok(())
    }

    pub fn insert_delivery(&self, delivery: &PartnerDelivery) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO order_deliveries (delivery_id, order_id, delivery_partner_id, status)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                delivery.delivery_id,
                delivery.order_id,
                delivery.delivery_partner_id,
                delivery.status.to_db_str(),
            ],
        )?;
        Ok(())
    }

    /// 更新订单状态
    ///
    /// # 返回
    /// - Err(NotFound): 订单不存在
    pub fn update_order_status(&self, order_id: &str, status: OrderStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE orders SET order_status = ?2 WHERE order_id = ?1",
            params![order_id, status.to_db_str()],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            });
        }
        Ok(())
    }

    /// 更新配送子记录状态
    pub fn update_delivery_status(
        &self,
        delivery_id: &str,
        status: DeliveryStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE order_deliveries SET status = ?2 WHERE delivery_id = ?1",
            params![delivery_id, status.to_db_str()],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "OrderDelivery".to_string(),
                id: delivery_id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询某配送员在 (时段, 日期) 下的订单及其子记录
    ///
    /// 只返回存在该配送员子记录的订单
    pub fn find_partner_orders(
        &self,
        slot_id: &str,
        delivery_date: NaiveDate,
        delivery_partner_id: &str,
    ) -> RepositoryResult<Vec<PartnerOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                o.order_id, o.slot_id, o.delivery_date, o.order_status,
                d.delivery_id, d.delivery_partner_id, d.status
            FROM orders o
            JOIN order_deliveries d ON d.order_id = o.order_id
            WHERE o.slot_id = ?1
              AND o.delivery_date = ?2
              AND d.delivery_partner_id = ?3
            ORDER BY o.order_id ASC, d.delivery_id ASC
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    slot_id,
                    delivery_date.format("%Y-%m-%d").to_string(),
                    delivery_partner_id
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        // 按订单聚合（结果已按 order_id 排序）
        let mut orders: Vec<PartnerOrder> = Vec::new();
        for (order_id, slot_id, date_raw, order_status, delivery_id, partner_id, status) in rows {
            let delivery = PartnerDelivery {
                delivery_id,
                order_id: order_id.clone(),
                delivery_partner_id: partner_id,
                status: DeliveryStatus::from_db_str(&status),
            };

            match orders.last_mut() {
                Some(last) if last.order.order_id == order_id => last.deliveries.push(delivery),
                _ => orders.push(PartnerOrder {
                    order: Order {
                        order_id,
                        slot_id,
                        delivery_date: parse_date_column("delivery_date", &date_raw)?,
                        order_status: OrderStatus::from_db_str(&order_status),
                    },
                    deliveries: vec![delivery],
                }),
            }
        }

        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> OrderRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        OrderRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn order(id: &str, slot: &str, status: OrderStatus) -> Order {
        Order {
            order_id: id.to_string(),
            slot_id: slot.to_string(),
            delivery_date: date(),
            order_status: status,
        }
    }

    fn delivery(id: &str, order_id: &str, partner: &str, status: DeliveryStatus) -> PartnerDelivery {
        PartnerDelivery {
            delivery_id: id.to_string(),
            order_id: order_id.to_string(),
            delivery_partner_id: partner.to_string(),
            status,
        }
    }

    #[test]
    fn test_find_partner_orders_groups_and_scopes() {
        let repo = setup();
        repo.insert_order(&order("o1", "s1", OrderStatus::Delivered)).unwrap();
        repo.insert_order(&order("o2", "s1", OrderStatus::PickedUp)).unwrap();
        repo.insert_order(&order("o3", "s2", OrderStatus::Delivered)).unwrap();

        repo.insert_delivery(&delivery("d1", "o1", "p1", DeliveryStatus::Delivered)).unwrap();
        repo.insert_delivery(&delivery("d2", "o1", "p1", DeliveryStatus::Delivered)).unwrap();
        repo.insert_delivery(&delivery("d3", "o2", "p2", DeliveryStatus::PickedUp)).unwrap();
        repo.insert_delivery(&delivery("d4", "o3", "p1", DeliveryStatus::Delivered)).unwrap();

        let p1 = repo.find_partner_orders("s1", date(), "p1").unwrap();
        assert_eq!(p1.len(), 1);
        assert_eq!(p1[0].order.order_id, "o1");
        assert_eq!(p1[0].deliveries.len(), 2);
        assert!(p1[0].is_fully_delivered());

        let p2 = repo.find_partner_orders("s1", date(), "p2").unwrap();
        assert_eq!(p2.len(), 1);
        assert!(!p2[0].is_fully_delivered());

        let none = repo.find_partner_orders("s1", date(), "p3").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_update_status_not_found() {
        let repo = setup();
        let err = repo.update_order_status("missing", OrderStatus::Delivered).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
