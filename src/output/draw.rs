// 该文件是 Kuangshi （框识） 项目的一部分。
// src/output/draw.rs - 检测结果叠加层绘制
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage, imageops};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use tracing::debug;

use crate::{
  detection::{ClassTally, DetectionSet, TallyRow},
  geometry::{CanvasRect, DisplayGeometry, round_half_up},
  input::DecodedImage,
};

// 以下尺寸均为逻辑像素，绘制时乘以设备像素比
const LINE_WIDTH: f64 = 2.0;
const LABEL_FONT_SIZE: f64 = 12.0;
const LABEL_PADDING_X: f64 = 4.0;
const LABEL_PADDING_Y: f64 = 2.0;
const LABEL_CHAR_WIDTH: f64 = 0.6; // 无字体时按字号估算每字符宽度

const BOX_COLOR: [u8; 4] = [0x5b, 0x8c, 0xff, 0xff];
const LABEL_BACKGROUND: [u8; 4] = [11, 16, 32, 204]; // rgba(11, 16, 32, 0.8)
const LABEL_TEXT_COLOR: [u8; 4] = [0xe7, 0xec, 0xff, 0xff];

#[derive(Debug, Clone, Copy)]
pub struct LabelStyle {
  pub line_width: f64,
  pub font_size: f64,
  pub padding_x: f64,
  pub padding_y: f64,
  pub box_color: [u8; 4],
  pub background: [u8; 4],
  pub text_color: [u8; 4],
}

impl Default for LabelStyle {
  fn default() -> Self {
    Self {
      line_width: LINE_WIDTH,
      font_size: LABEL_FONT_SIZE,
      padding_x: LABEL_PADDING_X,
      padding_y: LABEL_PADDING_Y,
      box_color: BOX_COLOR,
      background: LABEL_BACKGROUND,
      text_color: LABEL_TEXT_COLOR,
    }
  }
}

/// 画布上的一个检测框
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasBox {
  pub rect: CanvasRect,
  /// 标签背景，位于边框上方，可能超出画布顶部
  pub label_rect: CanvasRect,
  pub label: String,
}

/// 一次渲染的结果：画布与侧边列表
#[derive(Debug, Clone)]
pub struct Overlay {
  pub geometry: DisplayGeometry,
  pub canvas: RgbaImage,
  pub boxes: Vec<CanvasBox>,
  pub items: Vec<TallyRow>,
}

/// 叠加层渲染器
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
  style: LabelStyle,
  font: Option<FontArc>,
}

impl OverlayRenderer {
  pub fn new(style: LabelStyle, font: Option<FontArc>) -> Self {
    Self { style, font }
  }

  /// 从字体文件创建
  pub fn with_font_file(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
    let data = std::fs::read(path.as_ref())?;
    let font = FontArc::try_from_vec(data)
      .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(Self::new(LabelStyle::default(), Some(font)))
  }

  pub fn style(&self) -> &LabelStyle {
    &self.style
  }

  /// 绘制检测框与标签，并生成类别统计
  ///
  /// 纯函数：输出只取决于检测结果与几何信息。空输入得到清空的画布。
  pub fn render(&self, detections: &DetectionSet, geometry: &DisplayGeometry) -> Overlay {
    let mut canvas = RgbaImage::new(geometry.canvas_width, geometry.canvas_height);
    let items = ClassTally::from_detections(detections).into_rows();
    let mut boxes = Vec::with_capacity(detections.len());

    let dpr = geometry.device_pixel_ratio;
    let line_width = round_half_up(self.style.line_width * dpr).max(1.0) as i32;
    let font_px = self.style.font_size * dpr;
    let padding_x = self.style.padding_x * dpr;
    let padding_y = self.style.padding_y * dpr;
    let text_height = font_px + padding_y * 2.0;

    for det in detections {
      let rect = geometry.to_canvas(&det.bbox);
      let label = det.label();

      if let Some(visible) = clip_to_canvas(&rect, &canvas, line_width) {
        self.stroke_rect(&mut canvas, &visible, line_width);
      }

      let text_width = self.measure(&label, font_px);
      let label_rect = CanvasRect {
        x: rect.x,
        y: round_half_up(rect.y as f64 - text_height) as i32,
        width: round_half_up(text_width + padding_x * 2.0) as i32,
        height: round_half_up(text_height) as i32,
      };

      // 标签完全落在画布外时不绘制
      if let Some(visible) = clip_to_canvas(&label_rect, &canvas, 0) {
        fill_rect(&mut canvas, &visible, Rgba(self.style.background));

        if let Some(font) = self.font.as_ref() {
          draw_text_mut(
            &mut canvas,
            Rgba(self.style.text_color),
            round_half_up(rect.x as f64 + padding_x) as i32,
            round_half_up(rect.y as f64 - text_height + padding_y) as i32,
            PxScale::from(font_px as f32),
            font,
            &label,
          );
        }
      }

      boxes.push(CanvasBox {
        rect,
        label_rect,
        label,
      });
    }

    debug!(
      "绘制 {} 个检测框，画布 {}x{}",
      boxes.len(),
      geometry.canvas_width,
      geometry.canvas_height
    );

    Overlay {
      geometry: *geometry,
      canvas,
      boxes,
      items,
    }
  }

  fn measure(&self, label: &str, font_px: f64) -> f64 {
    match self.font.as_ref() {
      Some(font) => text_size(PxScale::from(font_px as f32), font, label).0 as f64,
      None => label.chars().count() as f64 * font_px * LABEL_CHAR_WIDTH,
    }
  }

  // 线宽以边框路径为中心向内外各扩展一半
  fn stroke_rect(&self, canvas: &mut RgbaImage, rect: &CanvasRect, line_width: i32) {
    let color = Rgba(self.style.box_color);
    let half = line_width / 2;
    for i in 0..line_width {
      let offset = i - half;
      let width = rect.width - 2 * offset;
      let height = rect.height - 2 * offset;
      if width <= 0 || height <= 0 {
        continue;
      }
      let r = Rect::at(rect.x + offset, rect.y + offset).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(canvas, r, color);
    }
  }
}

/// 裁剪到画布外扩 `pad` 像素的范围，超出的边不会可见；完全不相交时返回 `None`
fn clip_to_canvas(rect: &CanvasRect, canvas: &RgbaImage, pad: i32) -> Option<CanvasRect> {
  let pad = pad as i64;
  let left = (rect.x as i64).max(-pad);
  let top = (rect.y as i64).max(-pad);
  let right = (rect.x as i64 + rect.width as i64).min(canvas.width() as i64 + pad);
  let bottom = (rect.y as i64 + rect.height as i64).min(canvas.height() as i64 + pad);
  if right < left || bottom < top {
    return None;
  }
  Some(CanvasRect {
    x: left as i32,
    y: top as i32,
    width: (right - left) as i32,
    height: (bottom - top) as i32,
  })
}

fn fill_rect(canvas: &mut RgbaImage, rect: &CanvasRect, color: Rgba<u8>) {
  if rect.width <= 0 || rect.height <= 0 {
    return;
  }
  let r = Rect::at(rect.x, rect.y).of_size(rect.width as u32, rect.height as u32);
  draw_filled_rect_mut(canvas, r, color);
}

/// 将图像缩放到画布分辨率，再叠加检测层
pub fn compose(image: &DecodedImage, overlay: &Overlay) -> RgbaImage {
  let geometry = &overlay.geometry;
  let mut base = if (geometry.canvas_width, geometry.canvas_height)
    == (image.natural_width(), image.natural_height())
  {
    image.image().clone()
  } else {
    imageops::resize(
      image.image(),
      geometry.canvas_width,
      geometry.canvas_height,
      imageops::FilterType::Triangle,
    )
  };
  imageops::overlay(&mut base, &overlay.canvas, 0, 0);
  base
}
