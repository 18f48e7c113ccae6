// ==========================================
// 配送时段运营核心 - 时段阶段判定器
// ==========================================
// 职责: 根据时段配置与参考时刻判定时段所处阶段
// 红线: 纯函数，无副作用，不访问数据库
// ==========================================
// 区间约定（左闭右开）:
//   [.., cutoff)                 → Open
//   [cutoff, cutoff+15m)         → Preparation
//   [cutoff+15m, cutoff+delay)   → ReadyForPickup（delay <= 15 时为空区间）
//   其余                          → PostPickup
// ==========================================

use crate::domain::slot::{DeliverySlotConfig, PREPARATION_WINDOW_MINUTES};
use crate::domain::types::SlotPhase;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 时段各阶段的边界时刻
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPhaseWindows {
    pub cutoff: NaiveDateTime,     // 截单
    pub prep_end: NaiveDateTime,   // 备货结束
    pub pickup_end: NaiveDateTime, // 取货窗口结束
}

/// 时刻偏移（分钟），溢出时饱和到可表示的边界
fn offset_minutes(base: NaiveDateTime, minutes: i64) -> NaiveDateTime {
    Duration::try_minutes(minutes)
        .and_then(|d| base.checked_add_signed(d))
        .unwrap_or(if minutes >= 0 {
            NaiveDateTime::MAX
        } else {
            NaiveDateTime::MIN
        })
}

// ==========================================
// SlotPhaseClassifier
// ==========================================
pub struct SlotPhaseClassifier;

impl SlotPhaseClassifier {
    /// 计算阶段边界
    pub fn windows(config: &DeliverySlotConfig) -> SlotPhaseWindows {
        let cutoff = config.cutoff_at();
        SlotPhaseWindows {
            cutoff,
            prep_end: offset_minutes(cutoff, PREPARATION_WINDOW_MINUTES),
            pickup_end: offset_minutes(cutoff, config.pickup_delay_minutes),
        }
    }

    /// 判定阶段（主入口）
    ///
    /// 对任意输入都返回唯一阶段；按顺序比较，备货窗口优先于取货窗口
    pub fn classify(config: &DeliverySlotConfig, now: NaiveDateTime) -> SlotPhase {
        let w = Self::windows(config);

        if now < w.cutoff {
            SlotPhase::Open
        } else if now < w.prep_end {
            SlotPhase::Preparation
        } else if now < w.pickup_end {
            SlotPhase::ReadyForPickup
        } else {
            SlotPhase::PostPickup
        }
    }

    /// 下一次阶段切换
    ///
    /// # 返回
    /// - Some((阶段, 开始时刻)): 下一个阶段及其开始时刻（跳过空的待取货区间）
    /// - None: 已处于 PostPickup
    pub fn next_transition(
        config: &DeliverySlotConfig,
        now: NaiveDateTime,
    ) -> Option<(SlotPhase, NaiveDateTime)> {
        let w = Self::windows(config);

        match Self::classify(config, now) {
            SlotPhase::Open => Some((SlotPhase::Preparation, w.cutoff)),
            SlotPhase::Preparation => {
                if w.pickup_end > w.prep_end {
                    Some((SlotPhase::ReadyForPickup, w.prep_end))
                } else {
                    Some((SlotPhase::PostPickup, w.prep_end))
                }
            }
            SlotPhase::ReadyForPickup => Some((SlotPhase::PostPickup, w.pickup_end)),
            SlotPhase::PostPickup => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn slot(delay: i64) -> DeliverySlotConfig {
        DeliverySlotConfig::from_hhmm(
            "10:00",
            "14:00",
            delay,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        let cfg = slot(45);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, at(13, 59)), SlotPhase::Open);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, at(14, 10)), SlotPhase::Preparation);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, at(14, 20)), SlotPhase::ReadyForPickup);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, at(15, 0)), SlotPhase::PostPickup);
    }

    #[test]
    fn test_boundaries_are_half_open() {
        let cfg = slot(45);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, at(14, 0)), SlotPhase::Preparation);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, at(14, 15)), SlotPhase::ReadyForPickup);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, at(14, 45)), SlotPhase::PostPickup);

        let just_before = at(14, 0) - Duration::nanoseconds(1);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, just_before), SlotPhase::Open);
    }

    #[test]
    fn test_previous_day_is_open_next_day_is_post_pickup() {
        let cfg = slot(45);
        let prev = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap().and_hms_opt(23, 0, 0).unwrap();
        let next = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(1, 0, 0).unwrap();
        assert_eq!(SlotPhaseClassifier::classify(&cfg, prev), SlotPhase::Open);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, next), SlotPhase::PostPickup);
    }

    #[test]
    fn test_minute_sweep_is_monotonic_and_exhaustive() {
        for delay in [15_i64, 16, 30, 45, 90] {
            let cfg = slot(delay);
            let mut prev = SlotPhase::Open;
            let mut seen = Vec::new();
            let mut t = at(13, 0);
            while t <= at(16, 0) {
                let phase = SlotPhaseClassifier::classify(&cfg, t);
                assert!(phase >= prev, "阶段回退: delay={} t={}", delay, t);
                if !seen.contains(&phase) {
                    seen.push(phase);
                }
                prev = phase;
                t += Duration::minutes(1);
            }
            let expected = if delay > PREPARATION_WINDOW_MINUTES { 4 } else { 3 };
            assert_eq!(seen.len(), expected, "delay={}", delay);
        }
    }

    #[test]
    fn test_short_delay_skips_ready_for_pickup() {
        let cfg = slot(10);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, at(14, 12)), SlotPhase::Preparation);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, at(14, 15)), SlotPhase::PostPickup);
        assert_eq!(
            SlotPhaseClassifier::next_transition(&cfg, at(14, 5)),
            Some((SlotPhase::PostPickup, at(14, 15)))
        );
    }

    #[test]
    fn test_unvalidated_huge_delay_does_not_overflow() {
        let cfg = slot(1_000_000_000_000);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, at(13, 0)), SlotPhase::Open);
        assert_eq!(SlotPhaseClassifier::classify(&cfg, at(14, 20)), SlotPhase::ReadyForPickup);
        assert_eq!(SlotPhaseClassifier::windows(&cfg).pickup_end, NaiveDateTime::MAX);

        let negative = slot(i64::MIN);
        assert_eq!(SlotPhaseClassifier::classify(&negative, at(14, 5)), SlotPhase::Preparation);
        assert_eq!(SlotPhaseClassifier::classify(&negative, at(14, 15)), SlotPhase::PostPickup);
    }

    #[test]
    fn test_next_transition() {
        let cfg = slot(45);
        assert_eq!(
            SlotPhaseClassifier::next_transition(&cfg, at(9, 0)),
            Some((SlotPhase::Preparation, at(14, 0)))
        );
        assert_eq!(
            SlotPhaseClassifier::next_transition(&cfg, at(14, 1)),
            Some((SlotPhase::ReadyForPickup, at(14, 15)))
        );
        assert_eq!(
            SlotPhaseClassifier::next_transition(&cfg, at(14, 30)),
            Some((SlotPhase::PostPickup, at(14, 45)))
        );
        assert_eq!(SlotPhaseClassifier::next_transition(&cfg, at(14, 45)), None);
    }
}
