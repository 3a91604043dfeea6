//! 帧上的绘制与遮蔽原语，直接操作 RGBA 缓冲

use crate::surveillance::detector::{Rect, ThreatClass};
use crate::surveillance::frame::Frame;

/// 检测框配色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxColor {
    /// 限制时段内的人员入侵
    HighAlert,
    /// 火情类
    Hazard,
    /// 其余检测
    Routine,
}

impl BoxColor {
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            BoxColor::HighAlert => [255, 0, 0],
            BoxColor::Hazard => [255, 165, 0],
            BoxColor::Routine => [0, 255, 0],
        }
    }
}

/// 类别到配色的映射：after-hours 人员标红，火情标橙，其余标绿
pub fn box_color(class: ThreatClass, is_after_hours: bool) -> BoxColor {
    if class == ThreatClass::Person && is_after_hours {
        BoxColor::HighAlert
    } else if matches!(class, ThreatClass::Fire | ThreatClass::Smoke) {
        BoxColor::Hazard
    } else {
        BoxColor::Routine
    }
}

#[inline]
fn put_pixel(frame: &mut Frame, x: i32, y: i32, rgb: [u8; 3]) {
    let idx = ((y as u32 * frame.width + x as u32) * 4) as usize;
    frame.data[idx] = rgb[0];
    frame.data[idx + 1] = rgb[1];
    frame.data[idx + 2] = rgb[2];
}

/// 画矩形边框，框完全在帧外时为空操作
pub fn draw_rect(frame: &mut Frame, rect: Rect, color: BoxColor, thickness: u32) {
    let Some(clamped) = rect.clamp_to(frame.width, frame.height) else {
        return;
    };
    let rgb = color.rgb();
    let t = thickness as i32;

    for y in clamped.y1..=clamped.y2 {
        for x in clamped.x1..=clamped.x2 {
            let on_border = x - clamped.x1 < t
                || clamped.x2 - x < t
                || y - clamped.y1 < t
                || clamped.y2 - y < t;
            if on_border {
                put_pixel(frame, x, y, rgb);
            }
        }
    }
}

/// 在框上方画一条实心标注条作为标签锚点
/// （字形渲染交给显示端，这里对应原框上的标签底色块）
pub fn draw_label_strip(frame: &mut Frame, rect: Rect, color: BoxColor) {
    const STRIP_HEIGHT: i32 = 18;

    let strip = Rect::new(
        rect.x1,
        rect.y1 - STRIP_HEIGHT,
        rect.x2,
        rect.y1.saturating_sub(1),
    );
    let Some(clamped) = strip.clamp_to(frame.width, frame.height) else {
        return;
    };
    let rgb = color.rgb();

    for y in clamped.y1..=clamped.y2 {
        for x in clamped.x1..=clamped.x2 {
            put_pixel(frame, x, y, rgb);
        }
    }
}

/// 对区域施加强平滑（多轮盒式模糊，近似高斯），用于人脸遮蔽。
/// strength 为核尺寸，区域外像素不受影响。
pub fn obscure_region(frame: &mut Frame, rect: Rect, strength: u32) {
    let Some(clamped) = rect.clamp_to(frame.width, frame.height) else {
        return;
    };

    let radius = (strength / 2).max(1) as i32;
    // 三轮盒式模糊已非常接近高斯平滑
    for _ in 0..3 {
        blur_pass_horizontal(frame, clamped, radius);
        blur_pass_vertical(frame, clamped, radius);
    }
}

fn blur_pass_horizontal(frame: &mut Frame, region: Rect, radius: i32) {
    let w = frame.width as usize;
    let src = frame.data.clone();

    for y in region.y1..=region.y2 {
        for x in region.x1..=region.x2 {
            let lo = (x - radius).max(region.x1);
            let hi = (x + radius).min(region.x2);
            let count = (hi - lo + 1) as u32;

            let mut sum = [0u32; 3];
            for sx in lo..=hi {
                let idx = (y as usize * w + sx as usize) * 4;
                sum[0] += src[idx] as u32;
                sum[1] += src[idx + 1] as u32;
                sum[2] += src[idx + 2] as u32;
            }

            let idx = (y as usize * w + x as usize) * 4;
            frame.data[idx] = (sum[0] / count) as u8;
            frame.data[idx + 1] = (sum[1] / count) as u8;
            frame.data[idx + 2] = (sum[2] / count) as u8;
        }
    }
}

fn blur_pass_vertical(frame: &mut Frame, region: Rect, radius: i32) {
    let w = frame.width as usize;
    let src = frame.data.clone();

    for y in region.y1..=region.y2 {
        for x in region.x1..=region.x2 {
            let lo = (y - radius).max(region.y1);
            let hi = (y + radius).min(region.y2);
            let count = (hi - lo + 1) as u32;

            let mut sum = [0u32; 3];
            for sy in lo..=hi {
                let idx = (sy as usize * w + x as usize) * 4;
                sum[0] += src[idx] as u32;
                sum[1] += src[idx + 1] as u32;
                sum[2] += src[idx + 2] as u32;
            }

            let idx = (y as usize * w + x as usize) * 4;
            frame.data[idx] = (sum[0] / count) as u8;
            frame.data[idx + 1] = (sum[1] / count) as u8;
            frame.data[idx + 2] = (sum[2] / count) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Frame::new(width, height, data, 0, 0)
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y * frame.width + x) * 4) as usize;
        [frame.data[idx], frame.data[idx + 1], frame.data[idx + 2]]
    }

    #[test]
    fn test_box_color_mapping() {
        assert_eq!(box_color(ThreatClass::Person, true), BoxColor::HighAlert);
        assert_eq!(box_color(ThreatClass::Person, false), BoxColor::Routine);
        assert_eq!(box_color(ThreatClass::Fire, false), BoxColor::Hazard);
        assert_eq!(box_color(ThreatClass::Smoke, true), BoxColor::Hazard);
        assert_eq!(box_color(ThreatClass::Backpack, true), BoxColor::Routine);
    }

    #[test]
    fn test_draw_rect_border_only() {
        let mut frame = checkerboard_frame(40, 40);
        draw_rect(&mut frame, Rect::new(10, 10, 20, 20), BoxColor::Hazard, 2);

        assert_eq!(pixel(&frame, 10, 10), [255, 165, 0]);
        assert_eq!(pixel(&frame, 20, 15), [255, 165, 0]);
        // 内部不受影响
        let inner = pixel(&frame, 15, 15);
        assert!(inner == [255, 255, 255] || inner == [0, 0, 0]);
    }

    #[test]
    fn test_draw_rect_outside_frame_is_noop() {
        let mut frame = checkerboard_frame(32, 32);
        let before = frame.data.clone();
        draw_rect(&mut frame, Rect::new(100, 100, 200, 200), BoxColor::Routine, 2);
        assert_eq!(frame.data, before);
    }

    #[test]
    fn test_label_strip_above_box() {
        let mut frame = checkerboard_frame(64, 64);
        draw_label_strip(&mut frame, Rect::new(10, 30, 40, 60), BoxColor::HighAlert);

        assert_eq!(pixel(&frame, 20, 20), [255, 0, 0]);
        assert_eq!(pixel(&frame, 20, 29), [255, 0, 0]);
        // 框本身所在行不被涂抹
        let at_box = pixel(&frame, 20, 30);
        assert!(at_box == [255, 255, 255] || at_box == [0, 0, 0]);
    }

    #[test]
    fn test_obscure_flattens_region() {
        let mut frame = checkerboard_frame(64, 64);
        let region = Rect::new(16, 16, 47, 47);
        obscure_region(&mut frame, region, 15);

        // 棋盘格经强模糊后趋于中灰
        let center = pixel(&frame, 32, 32);
        assert!(center[0] > 64 && center[0] < 192, "got {:?}", center);

        // 区域外保持原始棋盘值
        let outside = pixel(&frame, 2, 2);
        assert!(outside == [255, 255, 255] || outside == [0, 0, 0]);
    }

    #[test]
    fn test_obscure_clamps_partial_region() {
        let mut frame = checkerboard_frame(32, 32);
        // 一半在帧外
        obscure_region(&mut frame, Rect::new(-10, -10, 15, 15), 9);
        let corner = pixel(&frame, 0, 0);
        assert!(corner[0] > 0 && corner[0] < 255);
    }
}
