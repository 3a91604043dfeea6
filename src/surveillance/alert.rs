//! 告警引擎 - 限流、消息渲染与通知下发
//!
//! 限流历史是本模块唯一的可变状态。检查与追加是两个步骤，
//! 设计假定单线程逐帧调用；多路摄像头部署需在外层加锁或
//! 收敛为单写者。

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use reqwest::blocking::Client;
use serde_json::json;
use thiserror::Error;

use crate::surveillance::detector::ThreatClass;
use crate::surveillance::snapshot::SnapshotRef;

/// 历史保留窗口
const RETENTION_SECS: i64 = 3600;

/// 一次已发出告警的记录
#[derive(Debug, Clone)]
pub struct AlertRecord {
    pub timestamp: DateTime<Utc>,
    pub threats: Vec<ThreatClass>,
    pub message: String,
    pub snapshot: Option<SnapshotRef>,
}

/// 近一小时告警概览
#[derive(Debug, Clone)]
pub struct AlertSummary {
    pub total_alerts: usize,
    pub threat_counts: HashMap<ThreatClass, usize>,
    pub last_alert: Option<DateTime<Utc>>,
}

/// 告警限流器：小时上限 + 相邻告警冷却
pub struct AlertRateLimiter {
    history: VecDeque<AlertRecord>,
    cooldown: Duration,
    max_per_hour: usize,
}

impl AlertRateLimiter {
    pub fn new(cooldown_secs: u64, max_per_hour: usize) -> Self {
        Self {
            history: VecDeque::new(),
            cooldown: Duration::seconds(cooldown_secs as i64),
            max_per_hour,
        }
    }

    /// 惰性剪枝：从队首弹出所有超出保留窗口的记录。
    /// 恰好 3600 秒的记录视为过期。
    fn prune(&mut self, now: DateTime<Utc>) {
        while let Some(front) = self.history.front() {
            if now - front.timestamp >= Duration::seconds(RETENTION_SECS) {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// 当前是否允许发送。通过后调用方必须用 `record` 追加记录，
    /// 否则限流统计会漏记。
    pub fn can_send(&mut self, now: DateTime<Utc>) -> bool {
        self.prune(now);

        if self.history.len() >= self.max_per_hour {
            return false;
        }

        if let Some(last) = self.history.back() {
            // 间隔恰好等于冷却时间时放行
            if now - last.timestamp < self.cooldown {
                return false;
            }
        }

        true
    }

    pub fn record(&mut self, record: AlertRecord) {
        self.history.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn summary(&mut self, now: DateTime<Utc>) -> AlertSummary {
        self.prune(now);

        let mut threat_counts: HashMap<ThreatClass, usize> = HashMap::new();
        for record in &self.history {
            for threat in &record.threats {
                *threat_counts.entry(*threat).or_insert(0) += 1;
            }
        }

        AlertSummary {
            total_alerts: self.history.len(),
            threat_counts,
            last_alert: self.history.back().map(|r| r.timestamp),
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

/// 威胁列表的可读拼接：单项原样，多项用逗号 + 末尾 and
pub fn render_threat_list(threats: &[ThreatClass]) -> String {
    match threats {
        [] => String::new(),
        [single] => single.to_string(),
        [head @ .., last] => {
            let head_text = head
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} and {}", head_text, last)
        }
    }
}

/// 渲染通知正文
pub fn compose_message(threats: &[ThreatClass], now: DateTime<Utc>) -> String {
    format!(
        "SECURITY ALERT\n\
         Time: {}\n\
         Threat Detected: {}\n\
         Location: Surveillance Camera 1\n\
         Action Required: Immediate attention needed",
        now.format("%Y-%m-%d %H:%M:%S"),
        render_threat_list(threats)
    )
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("通知发送失败: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("通知服务返回错误状态: {0}")]
    Status(u16),
}

pub trait AlertSink: Send + Sync {
    fn send(&self, message: &str, snapshot: Option<&SnapshotRef>) -> Result<(), AlertError>;
}

/// Webhook 通知：消息与快照引用以 JSON 提交
pub struct WebhookAlertSink {
    client: Client,
    endpoint: String,
}

impl WebhookAlertSink {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, AlertError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl AlertSink for WebhookAlertSink {
    fn send(&self, message: &str, snapshot: Option<&SnapshotRef>) -> Result<(), AlertError> {
        let payload = json!({
            "message": message,
            "snapshot": snapshot.map(|s| s.as_str()),
        });

        let resp = self.client.post(&self.endpoint).json(&payload).send()?;
        if !resp.status().is_success() {
            return Err(AlertError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

/// 模拟通知：transport 未配置时的降级路径，只记日志
pub struct SimulatedAlertSink;

impl AlertSink for SimulatedAlertSink {
    fn send(&self, message: &str, snapshot: Option<&SnapshotRef>) -> Result<(), AlertError> {
        info!("[模拟通知] {}", message);
        if let Some(snapshot) = snapshot {
            info!("[模拟通知] 快照: {}", snapshot.as_str());
        }
        Ok(())
    }
}

/// 通知分发：主通道失败时退回模拟通道，错误不外溢
pub struct AlertDispatcher {
    primary: Box<dyn AlertSink>,
}

impl AlertDispatcher {
    pub fn new(primary: Box<dyn AlertSink>) -> Self {
        Self { primary }
    }

    pub fn simulated() -> Self {
        Self::new(Box::new(SimulatedAlertSink))
    }

    pub fn dispatch(&self, message: &str, snapshot: Option<&SnapshotRef>) {
        if let Err(e) = self.primary.send(message, snapshot) {
            warn!("主通知通道失败，退回模拟通道: {}", e);
            // SimulatedAlertSink 不会失败
            let _ = SimulatedAlertSink.send(message, snapshot);
        }
    }
}
