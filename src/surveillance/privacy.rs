//! 隐私保护 - 对与威胁无关的旁观者人脸做遮蔽
//!
//! 判定规则：人脸中心点落在任一 person 检测框内（含边界）则视为
//! 威胁主体本人，保持可见；否则一律遮蔽。fire/smoke/物品类检测
//! 不豁免任何人脸。

use log::debug;

use crate::surveillance::canvas;
use crate::surveillance::detector::{Detection, Rect, ThreatClass};
use crate::surveillance::frame::Frame;

/// 外部人脸检测器给出的人脸区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub rect: Rect,
}

impl FaceRegion {
    pub fn new(rect: Rect) -> Self {
        Self { rect }
    }
}

pub trait FaceDetector: Send + Sync {
    fn detect_faces(&self, frame: &Frame) -> Vec<FaceRegion>;
}

/// 人脸模型不可用时的降级实现：不产出人脸，即不做任何遮蔽
pub struct NullFaceDetector;

impl FaceDetector for NullFaceDetector {
    fn detect_faces(&self, _frame: &Frame) -> Vec<FaceRegion> {
        Vec::new()
    }
}

/// 测试用人脸检测器，返回固定区域
pub struct MockFaceDetector {
    faces: Vec<FaceRegion>,
}

impl MockFaceDetector {
    pub fn with_faces(faces: Vec<FaceRegion>) -> Self {
        Self { faces }
    }
}

impl FaceDetector for MockFaceDetector {
    fn detect_faces(&self, _frame: &Frame) -> Vec<FaceRegion> {
        self.faces.clone()
    }
}

/// 该人脸是否需要遮蔽
pub fn should_obscure(face: &FaceRegion, detections: &[Detection]) -> bool {
    let (cx, cy) = face.rect.center();

    for detection in detections {
        if detection.class != ThreatClass::Person {
            continue;
        }
        if detection.rect.contains(cx, cy) {
            return false;
        }
    }
    true
}

/// 对所有需要遮蔽的人脸就地施加模糊，返回遮蔽数量
pub fn obscure_faces(
    frame: &mut Frame,
    faces: &[FaceRegion],
    detections: &[Detection],
    blur_strength: u32,
) -> usize {
    let mut obscured = 0;
    for face in faces {
        if should_obscure(face, detections) {
            canvas::obscure_region(frame, face.rect, blur_strength);
            obscured += 1;
        } else {
            debug!("人脸与 person 检测框重合，保持可见: {:?}", face.rect);
        }
    }
    obscured
}
