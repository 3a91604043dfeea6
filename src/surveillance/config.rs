use std::collections::HashMap;

use chrono::NaiveTime;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::surveillance::detector::ThreatClass;
use crate::surveillance::policy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("小时取值越界 (0-23): {0}")]
    HourOutOfRange(u32),
    #[error("置信度阈值必须在 [0,1] 区间: {0}")]
    ThresholdOutOfRange(f32),
    #[error("类别 {0} 的置信度阈值必须在 [0,1] 区间: {1}")]
    ClassThresholdOutOfRange(String, f32),
    #[error("未知的威胁类别: {0}")]
    UnknownClass(String),
    #[error("告警冷却时间不能为 0")]
    ZeroCooldown,
    #[error("每小时告警上限不能为 0")]
    ZeroHourlyCap,
    #[error("模糊强度必须为 >=3 的奇数: {0}")]
    InvalidBlurStrength(u32),
}

/// 全局配置，构造时校验，运行期只通过显式操作变更
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveillanceConfig {
    pub demo_mode: bool,
    pub after_hours_enabled: bool,

    /// 限制时段，可跨午夜（如 22 点到次日 6 点）
    pub restricted_start_hour: u32,
    pub restricted_end_hour: u32,

    pub confidence_threshold: f32,
    /// 按类别覆盖默认阈值
    pub class_thresholds: HashMap<String, f32>,

    pub alert_cooldown_secs: u64,
    pub max_alerts_per_hour: usize,

    pub blur_strength: u32,
    pub snapshots_dir: String,
}

impl Default for SurveillanceConfig {
    fn default() -> Self {
        Self {
            demo_mode: true,
            after_hours_enabled: true,
            restricted_start_hour: 22,
            restricted_end_hour: 6,
            confidence_threshold: 0.5,
            class_thresholds: HashMap::new(),
            alert_cooldown_secs: 30,
            max_alerts_per_hour: 10,
            blur_strength: 15,
            snapshots_dir: "snapshots".to_string(),
        }
    }
}

impl SurveillanceConfig {
    /// 校验后的配置，非法取值在这里直接失败而不是运行期悄悄放过
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.restricted_start_hour > 23 {
            return Err(ConfigError::HourOutOfRange(self.restricted_start_hour));
        }
        if self.restricted_end_hour > 23 {
            return Err(ConfigError::HourOutOfRange(self.restricted_end_hour));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.confidence_threshold));
        }
        for (label, threshold) in &self.class_thresholds {
            if ThreatClass::from_label(label).is_none() {
                return Err(ConfigError::UnknownClass(label.clone()));
            }
            if !(0.0..=1.0).contains(threshold) {
                return Err(ConfigError::ClassThresholdOutOfRange(
                    label.clone(),
                    *threshold,
                ));
            }
        }
        if self.alert_cooldown_secs == 0 {
            return Err(ConfigError::ZeroCooldown);
        }
        if self.max_alerts_per_hour == 0 {
            return Err(ConfigError::ZeroHourlyCap);
        }
        if self.blur_strength < 3 || self.blur_strength % 2 == 0 {
            return Err(ConfigError::InvalidBlurStrength(self.blur_strength));
        }
        Ok(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn threshold_for(&self, class: ThreatClass) -> f32 {
        self.class_thresholds
            .get(class.label())
            .copied()
            .unwrap_or(self.confidence_threshold)
    }

    /// 当前时刻是否处于限制时段（after-hours 关闭时恒为 false）
    pub fn is_after_hours(&self, now: NaiveTime) -> bool {
        if !self.after_hours_enabled {
            return false;
        }
        policy::in_restricted_window(now, self.restricted_start_hour, self.restricted_end_hour)
    }

    pub fn toggle_after_hours(&mut self) -> bool {
        self.after_hours_enabled = !self.after_hours_enabled;
        info!(
            "after-hours 模式: {}",
            if self.after_hours_enabled { "ON" } else { "OFF" }
        );
        self.after_hours_enabled
    }
}
