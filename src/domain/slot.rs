// ==========================================
// 配送时段运营核心 - 配送时段领域模型
// ==========================================
// 对齐: delivery_slot 表 + 分配日期
// 红线: cutoff_time 必须位于时段营业窗口内; pickup_delay_minutes >= 15
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 固定备货窗口（分钟），与 pickup_delay_minutes 无关
pub const PREPARATION_WINDOW_MINUTES: i64 = 15;

/// 取货延迟上限（分钟）：取货窗口不跨越一整天
pub const MAX_PICKUP_DELAY_MINUTES: i64 = 24 * 60;

/// 时段配置错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotConfigError {
    #[error("时间格式无效 (field={field}): {value}")]
    InvalidTime { field: String, value: String },

    #[error("截单时间早于开始时间: start={start}, cutoff={cutoff}")]
    CutoffBeforeStart { start: NaiveTime, cutoff: NaiveTime },

    #[error("取货延迟过短: pickup_delay_minutes={0} (最少 15)")]
    PickupDelayTooShort(i64),

    #[error("取货延迟过长: pickup_delay_minutes={0} (最多 1440)")]
    PickupDelayTooLong(i64),
}

// ==========================================
// DeliverySlotConfig - 配送时段配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySlotConfig {
    pub start_time: NaiveTime,     // 时段开始（本地时间）
    pub cutoff_time: NaiveTime,    // 截单时间（本地时间）
    pub pickup_delay_minutes: i64, // 截单后取货窗口结束的分钟数
    pub delivery_date: NaiveDate,  // 适用日期
}

impl DeliverySlotConfig {
    /// 从 "HH:mm" / "HH:mm:ss" 字符串构造
    ///
    /// 仅做格式解析，不校验业务约束（见 `validate`）
    pub fn from_hhmm(
        start_time: &str,
        cutoff_time: &str,
        pickup_delay_minutes: i64,
        delivery_date: NaiveDate,
    ) -> Result<Self, SlotConfigError> {
        Ok(Self {
            start_time: parse_time_of_day("start_time", start_time)?,
            cutoff_time: parse_time_of_day("cutoff_time", cutoff_time)?,
            pickup_delay_minutes,
            delivery_date,
        })
    }

    /// 截单时刻 = delivery_date + cutoff_time
    pub fn cutoff_at(&self) -> NaiveDateTime {
        self.delivery_date.and_time(self.cutoff_time)
    }

    /// 校验时段配置约束
    pub fn validate(&self) -> Result<(), SlotConfigError> {
        if self.cutoff_time < self.start_time {
            return Err(SlotConfigError::CutoffBeforeStart {
                start: self.start_time,
                cutoff: self.cutoff_time,
            });
        }
        if self.pickup_delay_minutes < PREPARATION_WINDOW_MINUTES {
            return Err(SlotConfigError::PickupDelayTooShort(self.pickup_delay_minutes));
        }
        if self.pickup_delay_minutes > MAX_PICKUP_DELAY_MINUTES {
            return Err(SlotConfigError::PickupDelayTooLong(self.pickup_delay_minutes));
        }
        Ok(())
    }
}

// ==========================================
// DeliverySlot - 时段定义（不含日期）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySlot {
    pub slot_id: String,
    pub name: Option<String>,
    pub start_time: NaiveTime,
    pub cutoff_time: NaiveTime,
    pub pickup_delay_minutes: Option<i64>, // 为空时使用配置默认值
}

impl DeliverySlot {
    /// 生成指定日期的时段配置
    pub fn config_for(&self, delivery_date: NaiveDate, default_pickup_delay: i64) -> DeliverySlotConfig {
        DeliverySlotConfig {
            start_time: self.start_time,
            cutoff_time: self.cutoff_time,
            pickup_delay_minutes: self.pickup_delay_minutes.unwrap_or(default_pickup_delay),
            delivery_date,
        }
    }
}

/// 解析本地时刻，兼容 "HH:mm" 与 "HH:mm:ss"（后端 time 列）
pub fn parse_time_of_day(field: &str, value: &str) -> Result<NaiveTime, SlotConfigError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| SlotConfigError::InvalidTime {
            field: field.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_parse_both_time_formats() {
        let cfg = DeliverySlotConfig::from_hhmm("10:00", "14:00:00", 45, date()).unwrap();
        assert_eq!(cfg.start_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(cfg.cutoff_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(cfg.cutoff_at(), date().and_hms_opt(14, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_invalid_time() {
        let err = DeliverySlotConfig::from_hhmm("10:00", "2pm", 45, date()).unwrap_err();
        assert!(matches!(err, SlotConfigError::InvalidTime { ref field, .. } if field == "cutoff_time"));
    }

    #[test]
    fn test_validate() {
        let ok = DeliverySlotConfig::from_hhmm("10:00", "14:00", 45, date()).unwrap();
        assert!(ok.validate().is_ok());

        let short = DeliverySlotConfig::from_hhmm("10:00", "14:00", 10, date()).unwrap();
        assert_eq!(short.validate(), Err(SlotConfigError::PickupDelayTooShort(10)));

        let full_day = DeliverySlotConfig::from_hhmm("10:00", "14:00", MAX_PICKUP_DELAY_MINUTES, date()).unwrap();
        assert!(full_day.validate().is_ok());

        let huge = DeliverySlotConfig::from_hhmm("00:00", "14:00", 1_000_000_000_000, date()).unwrap();
        assert_eq!(
            huge.validate(),
            Err(SlotConfigError::PickupDelayTooLong(1_000_000_000_000))
        );

        let inverted = DeliverySlotConfig::from_hhmm("15:00", "14:00", 45, date()).unwrap();
        assert!(matches!(
            inverted.validate(),
            Err(SlotConfigError::CutoffBeforeStart { .. })
        ));
    }
}
