use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use log::info;
use thiserror::Error;

use crate::surveillance::canvas::{self, BoxColor};
use crate::surveillance::detector::Detection;
use crate::surveillance::frame::Frame;

/// 已保存快照的不透明引用（目录存储下是文件路径）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRef(pub String);

impl SnapshotRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("快照目录创建失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("快照编码失败: {0}")]
    Encode(String),
}

pub trait SnapshotStore: Send + Sync {
    /// 保存带标注的快照，返回不透明引用
    fn save(
        &self,
        frame: &Frame,
        detections: &[Detection],
        is_after_hours: bool,
        now: DateTime<Utc>,
    ) -> Result<SnapshotRef, SnapshotError>;
}

/// 目录快照存储：threat_时间戳.jpg，目录不存在时自动创建
pub struct DirSnapshotStore {
    dir: PathBuf,
}

impl DirSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SnapshotStore for DirSnapshotStore {
    fn save(
        &self,
        frame: &Frame,
        detections: &[Detection],
        is_after_hours: bool,
        now: DateTime<Utc>,
    ) -> Result<SnapshotRef, SnapshotError> {
        fs::create_dir_all(&self.dir)?;

        // 在副本上画检测框，原帧不动
        let mut annotated = frame.clone();
        for detection in detections {
            let color = canvas::box_color(detection.class, is_after_hours);
            canvas::draw_rect(&mut annotated, detection.rect, color, 3);
            canvas::draw_label_strip(&mut annotated, detection.rect, color);
        }

        let jpeg = annotated
            .encode_jpeg(85)
            .map_err(|e| SnapshotError::Encode(e.to_string()))?;

        let filename = format!("threat_{}.jpg", now.format("%Y%m%d_%H%M%S"));
        let path = self.dir.join(filename);
        fs::write(&path, jpeg)?;

        info!("威胁快照已保存: {}", path.display());
        Ok(SnapshotRef(path.to_string_lossy().into_owned()))
    }
}

/// 测试用存储，只计数不落盘
pub struct MemorySnapshotStore {
    saves: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            saves: AtomicUsize::new(0),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(
        &self,
        _frame: &Frame,
        _detections: &[Detection],
        _is_after_hours: bool,
        now: DateTime<Utc>,
    ) -> Result<SnapshotRef, SnapshotError> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(SnapshotRef(format!(
            "mem://snapshot/{}/{}",
            now.timestamp(),
            n
        )))
    }
}

/// 恒失败存储，用于验证快照失败不阻断告警
pub struct FailingSnapshotStore;

impl SnapshotStore for FailingSnapshotStore {
    fn save(
        &self,
        _frame: &Frame,
        _detections: &[Detection],
        _is_after_hours: bool,
        _now: DateTime<Utc>,
    ) -> Result<SnapshotRef, SnapshotError> {
        Err(SnapshotError::Encode("storage offline".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surveillance::detector::{Rect, ThreatClass};
    use chrono::TimeZone;

    fn test_frame() -> Frame {
        Frame::new(64, 64, vec![200u8; 64 * 64 * 4], 0, 1)
    }

    #[test]
    fn test_dir_store_creates_directory_and_file() {
        let dir = std::env::temp_dir().join(format!("sentinel_snap_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let store = DirSnapshotStore::new(&dir);
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 23, 15, 0).unwrap();
        let detections = vec![Detection::new(
            ThreatClass::Person,
            Rect::new(8, 8, 40, 56),
            0.9,
        )];

        let snap = store.save(&test_frame(), &detections, true, now).unwrap();
        assert!(snap.as_str().contains("threat_20240301_231500.jpg"));
        assert!(PathBuf::from(snap.as_str()).exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_memory_store_counts() {
        let store = MemorySnapshotStore::new();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        assert_eq!(store.save_count(), 0);
        store.save(&test_frame(), &[], false, now).unwrap();
        store.save(&test_frame(), &[], false, now).unwrap();
        assert_eq!(store.save_count(), 2);
    }
}
