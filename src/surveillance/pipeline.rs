use chrono::{DateTime, Utc};
use log::{info, warn};
use thiserror::Error;

use crate::surveillance::alert::{
    compose_message, AlertDispatcher, AlertRateLimiter, AlertRecord, AlertSummary,
};
use crate::surveillance::canvas;
use crate::surveillance::config::SurveillanceConfig;
use crate::surveillance::detector::{
    Detection, DetectorError, SyntheticThreatDetector, ThreatClass, ThreatDetector,
};
use crate::surveillance::frame::{Frame, FrameInfo};
use crate::surveillance::privacy::{self, FaceDetector, NullFaceDetector};
use crate::surveillance::snapshot::{DirSnapshotStore, SnapshotStore};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// 单帧失败，调用方跳过该帧继续处理后续帧
    #[error("该帧检测失败: {0}")]
    Detector(#[from] DetectorError),
}

/// 单帧处理结果
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame_info: FrameInfo,
    pub detections: Vec<Detection>,
    pub obscured_faces: usize,
    pub is_after_hours: bool,
    pub alert: Option<AlertRecord>,
}

/// 监控管线：检测 → 人脸遮蔽 → 标注 → 告警门控
///
/// 单线程逐帧调用，外部采集循环负责启停。
pub struct SurveillancePipeline {
    config: SurveillanceConfig,
    detector: Box<dyn ThreatDetector>,
    face_detector: Box<dyn FaceDetector>,
    snapshot_store: Box<dyn SnapshotStore>,
    dispatcher: AlertDispatcher,
    limiter: AlertRateLimiter,
    frame_counter: u64,
}

impl SurveillancePipeline {
    pub fn new(
        config: SurveillanceConfig,
        detector: Box<dyn ThreatDetector>,
        face_detector: Box<dyn FaceDetector>,
        snapshot_store: Box<dyn SnapshotStore>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        let limiter = AlertRateLimiter::new(config.alert_cooldown_secs, config.max_alerts_per_hour);
        Self {
            config,
            detector,
            face_detector,
            snapshot_store,
            dispatcher,
            limiter,
            frame_counter: 0,
        }
    }

    /// 演示装配：合成检测器 + 无人脸模型 + 目录快照 + 模拟通知
    pub fn demo(config: SurveillanceConfig) -> Self {
        let snapshots_dir = config.snapshots_dir.clone();
        Self::new(
            config,
            Box::new(SyntheticThreatDetector::new()),
            Box::new(NullFaceDetector),
            Box::new(DirSnapshotStore::new(snapshots_dir)),
            AlertDispatcher::simulated(),
        )
    }

    pub fn process_frame(&mut self, frame: &mut Frame) -> Result<FrameReport, PipelineError> {
        self.process_frame_at(frame, Utc::now())
    }

    /// 单趟处理，无重试。检测失败对该帧致命并向上传播；
    /// 快照与通知失败在此处吞掉，不会中断管线。
    pub fn process_frame_at(
        &mut self,
        frame: &mut Frame,
        now: DateTime<Utc>,
    ) -> Result<FrameReport, PipelineError> {
        self.frame_counter += 1;

        let detections = self.detector.detect(frame)?;
        let faces = self.face_detector.detect_faces(frame);

        let obscured_faces =
            privacy::obscure_faces(frame, &faces, &detections, self.config.blur_strength);

        // 时段判定整帧只算一次
        let is_after_hours = self.config.is_after_hours(now.time());

        for detection in &detections {
            let color = canvas::box_color(detection.class, is_after_hours);
            canvas::draw_rect(frame, detection.rect, color, 2);
            canvas::draw_label_strip(frame, detection.rect, color);
        }

        let alert = self.evaluate_alert(frame, &detections, is_after_hours, now);

        Ok(FrameReport {
            frame_info: FrameInfo::from_frame(frame),
            detections,
            obscured_faces,
            is_after_hours,
            alert,
        })
    }

    fn evaluate_alert(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        is_after_hours: bool,
        now: DateTime<Utc>,
    ) -> Option<AlertRecord> {
        let alerting: Vec<ThreatClass> = detections
            .iter()
            .filter(|d| {
                crate::surveillance::policy::should_alert(
                    d.class,
                    is_after_hours,
                    self.config.demo_mode,
                )
            })
            .map(|d| d.class)
            .collect();

        if alerting.is_empty() || !self.limiter.can_send(now) {
            return None;
        }

        let message = compose_message(&alerting, now);

        let snapshot = match self
            .snapshot_store
            .save(frame, detections, is_after_hours, now)
        {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("快照保存失败，告警继续: {}", e);
                None
            }
        };

        let record = AlertRecord {
            timestamp: now,
            threats: alerting,
            message,
            snapshot,
        };

        // 通知是 fire-and-forget：发送失败不会撤销记录
        self.dispatcher
            .dispatch(&record.message, record.snapshot.as_ref());
        self.limiter.record(record.clone());

        info!("告警已发出: {:?}", record.threats);
        Some(record)
    }

    pub fn toggle_after_hours(&mut self) -> bool {
        self.config.toggle_after_hours()
    }

    pub fn config(&self) -> &SurveillanceConfig {
        &self.config
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn alert_summary(&mut self, now: DateTime<Utc>) -> AlertSummary {
        self.limiter.summary(now)
    }

    pub fn reset(&mut self) {
        self.frame_counter = 0;
        self.limiter.reset();
    }
}
