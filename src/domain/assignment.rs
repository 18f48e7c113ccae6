// ==========================================
// 配送时段运营核心 - 配送分配领域模型
// ==========================================
// 对齐: delivery_partner_sector_assignments 表（权威记录）
// 对齐: delivery_assignments 表（旧版镜像记录）
// 红线: 完成后不自动重新激活
// ==========================================

use crate::domain::types::LegacyAssignmentStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// AssignmentKey - 分配业务标识
// ==========================================
// (配送员, 时段, 片区, 分配日期)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub delivery_partner_id: String,
    pub slot_id: String,
    pub sector_id: String,
    pub assigned_date: NaiveDate,
}

impl fmt::Display for AssignmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "partner={} slot={} sector={} date={}",
            self.delivery_partner_id, self.slot_id, self.sector_id, self.assigned_date
        )
    }
}

// ==========================================
// Assignment - 配送分配
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub assignment_id: String, // 行主键（写入按此定位）
    pub key: AssignmentKey,

    // ===== 可变状态 =====
    pub is_active: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// 创建新的激活分配
    pub fn new(assignment_id: impl Into<String>, key: AssignmentKey) -> Self {
        Self {
            assignment_id: assignment_id.into(),
            key,
            is_active: true,
            completed_at: None,
        }
    }

    /// 是否已完成
    pub fn is_completed(&self) -> bool {
        !self.is_active && self.completed_at.is_some()
    }
}

// ==========================================
// LegacyAssignment - 旧版分配记录
// ==========================================
// 按 (配送员, 时段, 分配日期) 定位，无片区维度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyAssignment {
    pub legacy_id: String,
    pub delivery_partner_id: String,
    pub slot_id: String,
    pub assigned_date: NaiveDate,
    pub status: LegacyAssignmentStatus,
    pub completed_at: Option<DateTime<Utc>>,
}
