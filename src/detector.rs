// 该文件是 Kuangshi （框识） 项目的一部分。
// src/detector.rs - 检测调用
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

use std::{rc::Rc, time::Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::{
  detection::DetectionSet,
  input::DecodedImage,
  model::{DetectionError, DetectionModel, ModelHandle, ModelLoadError, ModelLoader},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectError {
  #[error("{0}")]
  Load(#[from] ModelLoadError),
  #[error("{0}")]
  Inference(#[from] DetectionError),
}

/// 检测调用，持有共享的模型加载器
pub struct Detector<M: DetectionModel> {
  loader: Rc<ModelLoader<M>>,
}

impl<M: DetectionModel> Clone for Detector<M> {
  fn clone(&self) -> Self {
    Self {
      loader: Rc::clone(&self.loader),
    }
  }
}

impl<M: DetectionModel> Detector<M> {
  pub fn new(loader: Rc<ModelLoader<M>>) -> Self {
    Self { loader }
  }

  pub fn loader(&self) -> &ModelLoader<M> {
    &self.loader
  }

  /// 对已解码的图像运行检测
  ///
  /// 图像尚未解码（natural 宽度为 0）时直接返回 `Ok(None)`，不调用模型。
  pub async fn detect(&self, image: &DecodedImage) -> Result<Option<DetectionSet>, DetectError> {
    if image.natural_width() == 0 {
      debug!("图像 {} 尚未解码，跳过检测", image.name());
      return Ok(None);
    }

    let model = self.loader.ensure_loaded().await?;
    let now = Instant::now();
    let detections = model.detect(image).await?;
    info!(
      "推理完成，耗时: {:.2?}，检测到 {} 个对象",
      now.elapsed(),
      detections.len()
    );
    Ok(Some(detections))
  }
}

/// 检测结果的状态栏摘要
pub fn summarize(detections: &DetectionSet) -> String {
  match detections.top() {
    Some(top) => format!(
      "Found {} objects. Top: {} ({}%)",
      detections.len(),
      top.class_name,
      top.percent()
    ),
    None => "No objects detected.".to_string(),
  }
}
