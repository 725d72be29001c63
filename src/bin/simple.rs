// 该文件是 Kuangshi （框识） 项目的一部分。
// src/bin/simple.rs - 单张图像检测叠加
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

use std::{path::PathBuf, rc::Rc};

use anyhow::{Result, bail};
use clap::Parser;
use tracing::info;
use url::Url;

use kuangshi::{
  FromUrl,
  detector::Detector,
  geometry::Viewport,
  input::{ImageCrateDecoder, InputFile},
  model::{ModelLoader, ReplayModel},
  output::{Render, SaveImageFileOutput, draw::OverlayRenderer},
  session::{Session, Submission},
  status::StatusBoard,
};

/// Kuangshi 单张图像参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测结果文件
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 容器宽度（逻辑像素），0 表示使用原图宽度
  #[arg(long, default_value = "0", value_name = "WIDTH")]
  pub container_width: f64,
  /// 设备像素比
  #[arg(long, default_value = "1", value_name = "RATIO")]
  pub device_pixel_ratio: f64,
  /// 标签字体文件（TTF/OTF），未指定时只绘制标签背景
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("检测结果文件: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let renderer = match args.font.as_ref() {
    Some(path) => OverlayRenderer::with_font_file(path)?,
    None => OverlayRenderer::default(),
  };

  let status = StatusBoard::new();
  let loader = Rc::new(ModelLoader::new(ReplayModel::from_url(&args.model)?, status));
  let session = Session::new(
    Detector::new(loader),
    ImageCrateDecoder,
    renderer,
    Viewport::new(args.container_width, args.device_pixel_ratio),
  );
  let output = SaveImageFileOutput::from_url(&args.output)?;
  let file = InputFile::from_url(&args.input)?;

  info!("开始推理...");
  let now = std::time::Instant::now();
  let submission = session.submit(file).await;
  info!("推理完成，耗时: {:.2?}", now.elapsed());
  info!("状态: {}", session.status().current());

  if !matches!(submission, Submission::Rendered { .. }) {
    bail!("未能完成检测: {}", session.status().current());
  }

  let scene = session.scene();
  let Some(scene) = scene.as_ref() else {
    bail!("没有可输出的结果");
  };
  for row in scene.overlay.items.iter() {
    info!("  - {}: {}", row.label, row.count);
  }
  output.render_result(&*scene.image, &scene.overlay)?;

  Ok(())
}
