// 该文件是 Kuangshi （框识） 项目的一部分。
// src/model/replay.rs - 离线检测结果回放模型
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

use std::{collections::HashMap, path::PathBuf};

use tracing::{debug, info, warn};
use url::Url;

use super::{DetectionError, DetectionModel, ModelHandle, ModelLoadError};
use crate::{
  FromUrl, FromUrlWithScheme,
  detection::{Detection, DetectionSet},
  input::DecodedImage,
};

/// 回放预先导出的检测结果
///
/// 文件内容为 JSON 对象，键是图像文件名，值是检测结果数组：
///
/// ```json
/// { "street.jpg": [ { "bbox": [10, 20, 100, 80], "class": "car", "score": 0.91 } ] }
/// ```
#[derive(Debug, Clone)]
pub struct ReplayModel {
  path: PathBuf,
}

impl ReplayModel {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ModelLoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelLoadError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let path = urlencoding::decode(url.path())
      .map_err(|e| ModelLoadError::SchemeMismatch(e.to_string()))?;
    Ok(Self::new(path.into_owned()))
  }
}

#[derive(Debug)]
pub struct ReplayHandle {
  table: HashMap<String, DetectionSet>,
}

impl ReplayHandle {
  pub fn from_json(text: &str) -> Result<Self, ModelLoadError> {
    let raw: HashMap<String, Vec<Detection>> =
      serde_json::from_str(text).map_err(|e| ModelLoadError::Format(e.to_string()))?;

    for (name, detections) in raw.iter() {
      for det in detections {
        validate(name, det)?;
      }
    }

    let table = raw
      .into_iter()
      .map(|(name, detections)| (name, DetectionSet::from(detections)))
      .collect();
    Ok(Self { table })
  }

  pub fn images(&self) -> usize {
    self.table.len()
  }
}

fn validate(name: &str, det: &Detection) -> Result<(), ModelLoadError> {
  if !(0.0..=1.0).contains(&det.score) {
    return Err(ModelLoadError::Format(format!(
      "{}: {} 的置信度 {} 超出 [0, 1]",
      name, det.class_name, det.score
    )));
  }
  if det.bbox.iter().any(|v| !v.is_finite()) || det.bbox[2] < 0.0 || det.bbox[3] < 0.0 {
    return Err(ModelLoadError::Format(format!(
      "{}: {} 的边框无效 {:?}",
      name, det.class_name, det.bbox
    )));
  }
  Ok(())
}

impl DetectionModel for ReplayModel {
  type Handle = ReplayHandle;

  async fn load(&self) -> Result<ReplayHandle, ModelLoadError> {
    info!("加载检测结果文件: {}", self.path.display());
    let text = tokio::fs::read_to_string(&self.path)
      .await
      .map_err(|e| ModelLoadError::Io(format!("{}: {}", self.path.display(), e)))?;
    let handle = ReplayHandle::from_json(&text)?;
    debug!("共 {} 张图像的检测结果", handle.images());
    Ok(handle)
  }
}

impl ModelHandle for ReplayHandle {
  async fn detect(&self, image: &DecodedImage) -> Result<DetectionSet, DetectionError> {
    match self.table.get(image.name()) {
      Some(set) => Ok(set.clone()),
      None => {
        warn!("没有图像 {} 的检测结果", image.name());
        Ok(DetectionSet::empty())
      }
    }
  }
}
