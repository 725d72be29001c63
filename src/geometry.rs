// 该文件是 Kuangshi （框识） 项目的一部分。
// src/geometry.rs - 显示尺寸与画布坐标变换
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

/// 视口信息：容器宽度与设备像素比
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
  /// 容器宽度（逻辑像素），0 表示未知
  pub container_width: f64,
  /// 设备像素比
  pub device_pixel_ratio: f64,
}

impl Default for Viewport {
  fn default() -> Self {
    Self {
      container_width: 0.0,
      device_pixel_ratio: 1.0,
    }
  }
}

impl Viewport {
  pub fn new(container_width: f64, device_pixel_ratio: f64) -> Self {
    Self {
      container_width,
      device_pixel_ratio,
    }
  }

  /// 有效设备像素比，不小于 1
  pub fn effective_dpr(&self) -> f64 {
    if self.device_pixel_ratio.is_finite() {
      self.device_pixel_ratio.max(1.0)
    } else {
      1.0
    }
  }
}

/// 图像显示几何信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
  pub natural_width: u32,
  pub natural_height: u32,
  pub container_width: f64,
  pub device_pixel_ratio: f64,
  pub scale: f64,
  pub display_width: u32,
  pub display_height: u32,
  pub canvas_width: u32,
  pub canvas_height: u32,
}

/// 按容器宽度缩放图像，只缩小不放大，画布分辨率再乘以设备像素比
pub fn fit_canvas_to_image(
  natural_width: u32,
  natural_height: u32,
  viewport: &Viewport,
) -> DisplayGeometry {
  let dpr = viewport.effective_dpr();
  let natural_w = natural_width as f64;
  let natural_h = natural_height as f64;

  let max_width = if viewport.container_width.is_finite() && viewport.container_width > 0.0 {
    viewport.container_width
  } else {
    natural_w
  };

  let scale = if natural_width == 0 {
    1.0
  } else {
    (max_width / natural_w).min(1.0)
  };

  let display_width = (natural_w * scale).round() as u32;
  let display_height = (natural_h * scale).round() as u32;

  DisplayGeometry {
    natural_width,
    natural_height,
    container_width: max_width,
    device_pixel_ratio: dpr,
    scale,
    display_width,
    display_height,
    canvas_width: (display_width as f64 * dpr).round() as u32,
    canvas_height: (display_height as f64 * dpr).round() as u32,
  }
}

impl DisplayGeometry {
  /// 原图像素到画布像素的缩放系数
  pub fn canvas_scale(&self) -> f64 {
    let natural = if self.natural_width == 0 {
      self.display_width as f64
    } else {
      self.natural_width as f64
    };
    if natural == 0.0 {
      return 0.0;
    }
    (self.display_width as f64 / natural) * self.device_pixel_ratio
  }

  /// 将原图坐标系下的 [x, y, w, h] 变换到画布坐标，先缩放后取整
  pub fn to_canvas(&self, bbox: &[f32; 4]) -> CanvasRect {
    let scale = self.canvas_scale();
    let [x, y, w, h] = bbox.map(|v| round_half_up(v as f64 * scale) as i32);
    CanvasRect {
      x,
      y,
      width: w,
      height: h,
    }
  }
}

/// 取整时 .5 一律向正无穷方向进位，负数同样如此（-2.5 得 -2）
pub fn round_half_up(v: f64) -> f64 {
  (v + 0.5).floor()
}

/// 画布像素坐标下的矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasRect {
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}
