// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库初始化、测试数据写入
// ==========================================

#![allow(dead_code)]

use chrono::NaiveDate;
use delivery_slot_ops::api::DeliveryOpsApi;
use delivery_slot_ops::config::ConfigManager;
use delivery_slot_ops::db::{ensure_schema, open_sqlite_connection};
use delivery_slot_ops::domain::types::{DeliveryStatus, LegacyAssignmentStatus, OrderStatus};
use delivery_slot_ops::domain::{
    Assignment, AssignmentKey, DeliverySlot, LegacyAssignment, Order, PartnerDelivery,
};
use delivery_slot_ops::repository::{
    AssignmentRepository, DeliverySlotRepository, LegacyAssignmentRepository, OrderRepository,
};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 测试环境（临时数据库 + 仓储 + API）
pub struct TestEnv {
    _temp_file: NamedTempFile, // 需要保持存活
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,
    pub assignment_repo: AssignmentRepository,
    pub order_repo: OrderRepository,
    pub legacy_repo: LegacyAssignmentRepository,
    pub slot_repo: DeliverySlotRepository,
    pub config: ConfigManager,
    pub api: DeliveryOpsApi,
}

impl TestEnv {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let temp_file = NamedTempFile::new()?;
        let db_path = temp_file
            .path()
            .to_str()
            .ok_or("临时文件路径非 UTF-8")?
            .to_string();

        let conn = open_sqlite_connection(&db_path)?;
        ensure_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        Ok(Self {
            _temp_file: temp_file,
            db_path,
            assignment_repo: AssignmentRepository::from_connection(conn.clone()),
            order_repo: OrderRepository::from_connection(conn.clone()),
            legacy_repo: LegacyAssignmentRepository::from_connection(conn.clone()),
            slot_repo: DeliverySlotRepository::from_connection(conn.clone()),
            config: ConfigManager::from_connection(conn.clone())?,
            api: DeliveryOpsApi::new(conn.clone())?,
            conn,
        })
    }

    /// 写入激活分配
    pub fn seed_assignment(
        &self,
        assignment_id: &str,
        partner_id: &str,
        slot_id: &str,
        assigned_date: NaiveDate,
    ) -> Result<Assignment, Box<dyn Error>> {
        let assignment = Assignment::new(
            assignment_id,
            AssignmentKey {
                delivery_partner_id: partner_id.to_string(),
                slot_id: slot_id.to_string(),
                sector_id: "sector-1".to_string(),
                assigned_date,
            },
        );
        self.assignment_repo.insert(&assignment)?;
        Ok(assignment)
    }

    /// 写入旧版分配记录
    pub fn seed_legacy(
        &self,
        legacy_id: &str,
        partner_id: &str,
        slot_id: &str,
        assigned_date: NaiveDate,
    ) -> Result<(), Box<dyn Error>> {
        self.legacy_repo.insert(&LegacyAssignment {
            legacy_id: legacy_id.to_string(),
            delivery_partner_id: partner_id.to_string(),
            slot_id: slot_id.to_string(),
            assigned_date,
            status: LegacyAssignmentStatus::InProgress,
            completed_at: None,
        })?;
        Ok(())
    }

    /// 写入订单及一条配送员子记录
    ///
    /// delivered = true 时订单级与子记录均为 delivered
    pub fn seed_order(
        &self,
        order_id: &str,
        partner_id: &str,
        slot_id: &str,
        delivery_date: NaiveDate,
        delivered: bool,
    ) -> Result<(), Box<dyn Error>> {
        let (order_status, delivery_status) = if delivered {
            (OrderStatus::Delivered, DeliveryStatus::Delivered)
        } else {
            (OrderStatus::OutForDelivery, DeliveryStatus::PickedUp)
        };

        self.order_repo.insert_order(&Order {
            order_id: order_id.to_string(),
            slot_id: slot_id.to_string(),
            delivery_date,
            order_status,
        })?;
        self.order_repo.insert_delivery(&PartnerDelivery {
            delivery_id: format!("{}-{}", order_id, partner_id),
            order_id: order_id.to_string(),
            delivery_partner_id: partner_id.to_string(),
            status: delivery_status,
        })?;
        Ok(())
    }

    /// 写入时段定义
    pub fn seed_slot(
        &self,
        slot_id: &str,
        start: &str,
        cutoff: &str,
        pickup_delay_minutes: Option<i64>,
    ) -> Result<(), Box<dyn Error>> {
        self.slot_repo.insert(&DeliverySlot {
            slot_id: slot_id.to_string(),
            name: Some(format!("时段 {}", slot_id)),
            start_time: chrono::NaiveTime::parse_from_str(start, "%H:%M")?,
            cutoff_time: chrono::NaiveTime::parse_from_str(cutoff, "%H:%M")?,
            pickup_delay_minutes,
        })?;
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("非法日期")
}
