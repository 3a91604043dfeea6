use std::io::Cursor;
use std::time::Duration;

use crate::surveillance::DetectorError;

/// 视频帧数据结构
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA 格式
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixel_count() * 3);
        for chunk in self.data.chunks_exact(4) {
            rgb.push(chunk[0]); // R
            rgb.push(chunk[1]); // G
            rgb.push(chunk[2]); // B
        }
        rgb
    }

    /// JPEG 编码（快照保存与推理上传共用）
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, DetectorError> {
        let img = image::RgbImage::from_raw(self.width, self.height, self.to_rgb())
            .ok_or(DetectorError::MalformedFrame)?;

        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageOutputFormat::Jpeg(quality))
            .map_err(|e| DetectorError::Encode(e.to_string()))?;
        Ok(buffer.into_inner())
    }

    pub fn resize_to(&self, target_width: u32, target_height: u32) -> Option<Frame> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())?;
        let resized = image::imageops::resize(
            &img,
            target_width,
            target_height,
            image::imageops::FilterType::Triangle,
        );

        Some(Frame {
            width: target_width,
            height: target_height,
            data: resized.into_raw(),
            timestamp: self.timestamp,
            frame_number: self.frame_number,
        })
    }
}

/// 帧元数据（轻量级，用于报告）
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl FrameInfo {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            timestamp_ms: frame.timestamp.as_millis() as u64,
            frame_number: frame.frame_number,
        }
    }
}
