use std::collections::HashMap;
use std::fmt;

use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::surveillance::frame::Frame;

/// 像素坐标矩形 (x1,y1) 左上、(x2,y2) 右下，调用方保证 x1<x2, y1<y2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    /// 含边界判定，四条边上的点都算在框内
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.x1 <= x && x <= self.x2 && self.y1 <= y && y <= self.y2
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// 裁剪到帧边界内，完全在帧外时返回 None
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<Rect> {
        let w = frame_width as i32;
        let h = frame_height as i32;
        let x1 = self.x1.max(0);
        let y1 = self.y1.max(0);
        let x2 = self.x2.min(w - 1);
        let y2 = self.y2.min(h - 1);
        if x1 > x2 || y1 > y2 {
            return None;
        }
        Some(Rect { x1, y1, x2, y2 })
    }
}

/// 威胁类别，封闭词表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreatClass {
    Person,
    Fire,
    Smoke,
    Backpack,
    Handbag,
    Suitcase,
}

impl ThreatClass {
    pub const ALL: [ThreatClass; 6] = [
        ThreatClass::Person,
        ThreatClass::Fire,
        ThreatClass::Smoke,
        ThreatClass::Backpack,
        ThreatClass::Handbag,
        ThreatClass::Suitcase,
    ];

    pub fn from_label(label: &str) -> Option<ThreatClass> {
        match label {
            "person" => Some(ThreatClass::Person),
            "fire" => Some(ThreatClass::Fire),
            "smoke" => Some(ThreatClass::Smoke),
            "backpack" => Some(ThreatClass::Backpack),
            "handbag" => Some(ThreatClass::Handbag),
            "suitcase" => Some(ThreatClass::Suitcase),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ThreatClass::Person => "person",
            ThreatClass::Fire => "fire",
            ThreatClass::Smoke => "smoke",
            ThreatClass::Backpack => "backpack",
            ThreatClass::Handbag => "handbag",
            ThreatClass::Suitcase => "suitcase",
        }
    }
}

impl fmt::Display for ThreatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 单帧内的一次检测结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class: ThreatClass,
    pub rect: Rect,
    pub confidence: f32,
}

impl Detection {
    pub fn new(class: ThreatClass, rect: Rect, confidence: f32) -> Self {
        Self {
            class,
            rect,
            confidence,
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("推理响应解析失败: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("帧编码失败: {0}")]
    Encode(String),
    #[error("帧数据与尺寸不匹配")]
    MalformedFrame,
    #[error("推理服务返回错误状态: {0}")]
    Status(u16),
}

pub trait ThreatDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectorError>;
}

/// 推理服务的线上格式
#[derive(Debug, Deserialize)]
struct WireDetection {
    label: String,
    #[serde(rename = "box")]
    rect: [i32; 4],
    confidence: f32,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    detections: Vec<WireDetection>,
}

/// 远端推理检测器：帧编码为 JPEG 后提交给推理服务
pub struct HttpThreatDetector {
    client: Client,
    endpoint: String,
    confidence_threshold: f32,
    class_thresholds: HashMap<String, f32>,
}

impl HttpThreatDetector {
    pub fn new(
        endpoint: impl Into<String>,
        confidence_threshold: f32,
        class_thresholds: HashMap<String, f32>,
    ) -> Result<Self, DetectorError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            confidence_threshold,
            class_thresholds,
        })
    }

    fn threshold_for(&self, label: &str) -> f32 {
        self.class_thresholds
            .get(label)
            .copied()
            .unwrap_or(self.confidence_threshold)
    }

    fn parse_response(&self, body: &str) -> Result<Vec<Detection>, DetectorError> {
        let wire: WireResponse = serde_json::from_str(body)?;

        let mut detections = Vec::new();
        for d in wire.detections {
            // 词表外的类别与低置信度结果直接丢弃
            let Some(class) = ThreatClass::from_label(&d.label) else {
                continue;
            };
            if d.confidence < self.threshold_for(&d.label) {
                continue;
            }
            detections.push(Detection::new(
                class,
                Rect::new(d.rect[0], d.rect[1], d.rect[2], d.rect[3]),
                d.confidence,
            ));
        }
        Ok(detections)
    }
}

impl ThreatDetector for HttpThreatDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        let jpeg = frame.encode_jpeg(80)?;

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "image/jpeg")
            .body(jpeg)
            .send()?;

        if !resp.status().is_success() {
            return Err(DetectorError::Status(resp.status().as_u16()));
        }

        let body = resp.text()?;
        self.parse_response(&body)
    }
}

/// 演示用合成检测器：推理服务不可用时的降级方案
///
/// 以帧时间戳为准的 10 秒循环：0-2 秒出现 person，3-5 秒 fire，
/// 6-8 秒 smoke，第 9 秒无检测。框的位置按帧尺寸等比生成。
pub struct SyntheticThreatDetector;

impl SyntheticThreatDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SyntheticThreatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreatDetector for SyntheticThreatDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        let w = frame.width as i32;
        let h = frame.height as i32;
        let cycle = frame.timestamp.as_secs() % 10;

        let detection = if cycle < 3 {
            Some(Detection::new(
                ThreatClass::Person,
                Rect::new(w / 4, h / 4, w / 2, h / 2),
                0.85,
            ))
        } else if cycle < 6 {
            Some(Detection::new(
                ThreatClass::Fire,
                Rect::new(w / 3, h / 3, 2 * w / 3, 2 * h / 3),
                0.92,
            ))
        } else if cycle < 9 {
            Some(Detection::new(
                ThreatClass::Smoke,
                Rect::new(w / 6, h / 6, 5 * w / 6, 5 * h / 6),
                0.78,
            ))
        } else {
            None
        };

        Ok(detection.into_iter().collect())
    }
}

/// 测试用检测器，按帧编号返回预设结果
pub struct MockThreatDetector {
    pattern: Option<Box<dyn Fn(u64) -> Vec<Detection> + Send + Sync>>,
}

impl MockThreatDetector {
    pub fn empty() -> Self {
        Self { pattern: None }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(u64) -> Vec<Detection> + Send + Sync + 'static,
    {
        Self {
            pattern: Some(Box::new(pattern)),
        }
    }

    pub fn always(detections: Vec<Detection>) -> Self {
        Self::with_pattern(move |_| detections.clone())
    }
}

impl ThreatDetector for MockThreatDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        Ok(self
            .pattern
            .as_ref()
            .map(|p| p(frame.frame_number))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_frame(width: u32, height: u32, timestamp_ms: u64, frame_number: u64) -> Frame {
        let data = vec![128u8; (width * height * 4) as usize];
        Frame::new(width, height, data, timestamp_ms, frame_number)
    }

    #[test]
    fn test_rect_contains_inclusive_bounds() {
        let rect = Rect::new(0, 0, 100, 100);
        assert!(rect.contains(0, 0));
        assert!(rect.contains(100, 100));
        assert!(rect.contains(50, 100));
        assert!(!rect.contains(101, 50));
        assert!(!rect.contains(50, -1));
    }

    #[test]
    fn test_rect_center() {
        assert_eq!(Rect::new(0, 0, 100, 100).center(), (50, 50));
        assert_eq!(Rect::new(10, 20, 30, 60).center(), (20, 40));
    }

    #[test]
    fn test_rect_clamp_to_frame() {
        let rect = Rect::new(-10, -10, 50, 50);
        let clamped = rect.clamp_to(40, 40).unwrap();
        assert_eq!(clamped, Rect::new(0, 0, 39, 39));

        assert!(Rect::new(100, 100, 200, 200).clamp_to(50, 50).is_none());
    }

    #[test]
    fn test_threat_class_label_round_trip() {
        for class in ThreatClass::ALL {
            assert_eq!(ThreatClass::from_label(class.label()), Some(class));
        }
        assert_eq!(ThreatClass::from_label("bicycle"), None);
    }

    #[test]
    fn test_synthetic_detector_cycle() {
        let detector = SyntheticThreatDetector::new();

        let person = detector
            .detect(&create_test_frame(640, 480, 1_000, 1))
            .unwrap();
        assert_eq!(person.len(), 1);
        assert_eq!(person[0].class, ThreatClass::Person);
        assert_eq!(person[0].rect, Rect::new(160, 120, 320, 240));

        let fire = detector
            .detect(&create_test_frame(640, 480, 4_000, 2))
            .unwrap();
        assert_eq!(fire[0].class, ThreatClass::Fire);

        let smoke = detector
            .detect(&create_test_frame(640, 480, 7_000, 3))
            .unwrap();
        assert_eq!(smoke[0].class, ThreatClass::Smoke);

        let quiet = detector
            .detect(&create_test_frame(640, 480, 9_500, 4))
            .unwrap();
        assert!(quiet.is_empty());
    }

    #[test]
    fn test_http_detector_parses_and_filters() {
        let mut thresholds = HashMap::new();
        thresholds.insert("fire".to_string(), 0.3);
        let detector = HttpThreatDetector::new("http://localhost:9/detect", 0.5, thresholds)
            .expect("client build failed");

        let body = r#"{
            "detections": [
                {"label": "person", "box": [10, 10, 90, 200], "confidence": 0.8},
                {"label": "person", "box": [0, 0, 5, 5], "confidence": 0.4},
                {"label": "fire", "box": [20, 20, 60, 60], "confidence": 0.35},
                {"label": "bicycle", "box": [0, 0, 10, 10], "confidence": 0.99}
            ]
        }"#;

        let detections = detector.parse_response(body).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].class, ThreatClass::Person);
        assert_eq!(detections[0].rect, Rect::new(10, 10, 90, 200));
        // fire 使用 per-class 阈值 0.3
        assert_eq!(detections[1].class, ThreatClass::Fire);
    }

    #[test]
    fn test_http_detector_tolerates_empty_result() {
        let detector = HttpThreatDetector::new("http://localhost:9/detect", 0.5, HashMap::new())
            .expect("client build failed");
        let detections = detector.parse_response(r#"{"detections": []}"#).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_mock_detector_pattern() {
        let detector = MockThreatDetector::with_pattern(|n| {
            if n % 2 == 0 {
                vec![Detection::new(
                    ThreatClass::Fire,
                    Rect::new(0, 0, 10, 10),
                    0.9,
                )]
            } else {
                vec![]
            }
        });

        assert_eq!(
            detector
                .detect(&create_test_frame(64, 64, 0, 2))
                .unwrap()
                .len(),
            1
        );
        assert!(detector
            .detect(&create_test_frame(64, 64, 0, 3))
            .unwrap()
            .is_empty());
    }
}
