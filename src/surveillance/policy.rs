//! 告警决策策略 - 纯函数，不持有状态
//!
//! 1. 限制时段判定 - 支持跨午夜窗口
//! 2. 威胁分级 - 数值越小优先级越高
//! 3. 告警门控 - 综合类别、时段与演示开关

use chrono::NaiveTime;

use crate::surveillance::detector::ThreatClass;

/// `now` 是否落在 [start_hour, end_hour] 限制窗口内，边界含端点。
///
/// start <= end 时为同日窗口；start > end 时窗口跨午夜，
/// 判定为 `now >= start || now <= end`。
pub fn in_restricted_window(now: NaiveTime, start_hour: u32, end_hour: u32) -> bool {
    // 小时已在配置构造时校验过
    let start = NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let end = NaiveTime::from_hms_opt(end_hour, 0, 0).unwrap_or(NaiveTime::MIN);

    if start_hour > end_hour {
        now >= start || now <= end
    } else {
        start <= now && now <= end
    }
}

/// 威胁分级：1 = 最高（火情类），2 = 人员，3 = 随身物品
pub fn threat_priority(class: ThreatClass) -> u8 {
    match class {
        ThreatClass::Fire | ThreatClass::Smoke => 1,
        ThreatClass::Person => 2,
        ThreatClass::Backpack | ThreatClass::Handbag | ThreatClass::Suitcase => 3,
    }
}

/// 词表外的标签归入默认最低优先级 4
pub fn label_priority(label: &str) -> u8 {
    ThreatClass::from_label(label)
        .map(threat_priority)
        .unwrap_or(4)
}

/// 某个检测是否应触发告警。
///
/// demo_mode 与 after-hours 是相互独立的开关：演示模式下
/// person 告警不受时段限制，两者不可互相折叠。
pub fn should_alert(class: ThreatClass, is_after_hours: bool, demo_mode: bool) -> bool {
    let priority = threat_priority(class);

    // 一级威胁无条件告警
    if priority == 1 {
        return true;
    }

    // 人员仅在限制时段告警
    if class == ThreatClass::Person && is_after_hours {
        return true;
    }

    // 演示模式下放宽到二级
    if demo_mode && priority <= 2 {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(hour: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, min, 0).unwrap()
    }

    #[test]
    fn test_window_overnight_wrap() {
        // 22 点到次日 6 点
        assert!(in_restricted_window(t(23, 0), 22, 6));
        assert!(in_restricted_window(t(2, 30), 22, 6));
        assert!(!in_restricted_window(t(12, 0), 22, 6));
        assert!(!in_restricted_window(t(21, 59), 22, 6));
    }

    #[test]
    fn test_window_wrap_boundaries_inclusive() {
        assert!(in_restricted_window(t(22, 0), 22, 6));
        assert!(in_restricted_window(t(6, 0), 22, 6));
        // 边界过后一分钟即出窗
        assert!(!in_restricted_window(t(6, 1), 22, 6));
    }

    #[test]
    fn test_window_same_day() {
        assert!(in_restricted_window(t(9, 0), 9, 17));
        assert!(in_restricted_window(t(9, 0), 9, 9));
        assert!(in_restricted_window(t(17, 0), 9, 17));
        assert!(!in_restricted_window(t(8, 59), 9, 17));
        assert!(!in_restricted_window(t(17, 1), 9, 17));
    }

    #[test]
    fn test_threat_priorities() {
        assert_eq!(threat_priority(ThreatClass::Fire), 1);
        assert_eq!(threat_priority(ThreatClass::Smoke), 1);
        assert_eq!(threat_priority(ThreatClass::Person), 2);
        assert_eq!(threat_priority(ThreatClass::Backpack), 3);
        assert_eq!(threat_priority(ThreatClass::Suitcase), 3);
        assert_eq!(label_priority("bicycle"), 4);
        assert_eq!(label_priority("fire"), 1);
    }

    #[test]
    fn test_tier_one_always_alerts() {
        assert!(should_alert(ThreatClass::Fire, false, false));
        assert!(should_alert(ThreatClass::Smoke, false, false));
    }

    #[test]
    fn test_person_gated_by_after_hours() {
        assert!(!should_alert(ThreatClass::Person, false, false));
        assert!(should_alert(ThreatClass::Person, true, false));
    }

    #[test]
    fn test_demo_mode_widens_to_tier_two() {
        // 演示模式下人员告警不受时段限制
        assert!(should_alert(ThreatClass::Person, false, true));
        // 三级物品即使在演示模式下也不告警
        assert!(!should_alert(ThreatClass::Backpack, false, true));
        assert!(!should_alert(ThreatClass::Handbag, true, true));
    }
}
