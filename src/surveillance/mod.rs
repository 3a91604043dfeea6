//! 监控告警核心 - 威胁检测结果的隐私处理、标注与限流告警
//!
//! 处理流程：
//! 1. 威胁检测 - 外部推理服务，不可用时降级为合成检测
//! 2. 人脸调和 - 旁观者人脸遮蔽，威胁主体保持可见
//! 3. 帧标注 - 按威胁等级与时段配色
//! 4. 告警门控 - 优先级策略 + 冷却/小时上限限流

pub mod alert;
pub mod canvas;
pub mod config;
pub mod detector;
pub mod frame;
pub mod pipeline;
pub mod policy;
pub mod privacy;
pub mod snapshot;

pub use alert::{
    compose_message, render_threat_list, AlertDispatcher, AlertError, AlertRateLimiter,
    AlertRecord, AlertSink, AlertSummary, SimulatedAlertSink, WebhookAlertSink,
};
pub use canvas::{box_color, BoxColor};
pub use config::{ConfigError, SurveillanceConfig};
pub use detector::{
    Detection, DetectorError, HttpThreatDetector, MockThreatDetector, Rect,
    SyntheticThreatDetector, ThreatClass, ThreatDetector,
};
pub use frame::{Frame, FrameInfo};
pub use pipeline::{FrameReport, PipelineError, SurveillancePipeline};
pub use policy::{in_restricted_window, should_alert, threat_priority};
pub use privacy::{
    should_obscure, FaceDetector, FaceRegion, MockFaceDetector, NullFaceDetector,
};
pub use snapshot::{DirSnapshotStore, MemorySnapshotStore, SnapshotError, SnapshotRef, SnapshotStore};
