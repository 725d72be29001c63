// 该文件是 Kuangshi （框识） 项目的一部分。
// src/output/save_image_file.rs - 保存叠加结果图像
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::DecodedImage,
  output::{
    Render,
    draw::{Overlay, compose},
  },
};

pub struct SaveImageFileOutput {
  path: PathBuf,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let path = urlencoding::decode(uri.path())
      .map_err(|e| SaveImageFileError::SchemeMismatch(e.to_string()))?;
    Ok(Self::new(path.into_owned()))
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render<DecodedImage, Overlay> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &DecodedImage, result: &Overlay) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    compose(frame, result).save(&self.path)?;
    warn!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    detection::{Detection, DetectionSet},
    geometry::{Viewport, fit_canvas_to_image},
    output::draw::OverlayRenderer,
  };
  use image::RgbaImage;

  #[test]
  fn writes_composed_png_creating_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested/out/result.png");
    let output = SaveImageFileOutput::new(&target);

    let image = DecodedImage::new("in.png", RgbaImage::new(64, 32));
    let geometry = fit_canvas_to_image(64, 32, &Viewport::new(32.0, 2.0));
    let set = DetectionSet::from(vec![Detection::new("cat", 0.8, [8.0, 8.0, 16.0, 16.0])]);
    let overlay = OverlayRenderer::default().render(&set, &geometry);

    output.render_result(&image, &overlay).unwrap();
    let saved = image::open(&target).unwrap();
    assert_eq!((saved.width(), saved.height()), (64, 32));
  }

  #[test]
  fn scheme_must_be_image() {
    let url = Url::parse("rtsp://localhost/stream").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }
}
