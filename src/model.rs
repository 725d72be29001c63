// 该文件是 Kuangshi （框识） 项目的一部分。
// src/model.rs - 检测模型
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

use std::future::Future;

use thiserror::Error;

use crate::{detection::DetectionSet, input::DecodedImage};

/// 预训练检测模型，加载过程可能失败
pub trait DetectionModel: 'static {
  type Handle: ModelHandle + 'static;

  fn load(&self) -> impl Future<Output = Result<Self::Handle, ModelLoadError>>;
}

/// 已加载的模型
pub trait ModelHandle {
  fn detect(
    &self,
    image: &DecodedImage,
  ) -> impl Future<Output = Result<DetectionSet, DetectionError>>;
}

/// 模型加载错误，可在所有等待者之间共享
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelLoadError {
  #[error("模型文件读取失败: {0}")]
  Io(String),
  #[error("模型格式错误: {0}")]
  Format(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("模型加载失败: {0}")]
  Other(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
  #[error("推理失败: {0}")]
  Inference(String),
}

mod loader;
mod replay;

pub use self::loader::{LoadState, ModelLoader};
pub use self::replay::{ReplayHandle, ReplayModel};
