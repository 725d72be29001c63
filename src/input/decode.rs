// 该文件是 Kuangshi （框识） 项目的一部分。
// src/input/decode.rs - 图像解码
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

use image::RgbaImage;
use tracing::{debug, warn};

use super::{IngestError, InputFile};

/// 解码完成的图像，natural 尺寸即原图尺寸
#[derive(Debug, Clone)]
pub struct DecodedImage {
  name: String,
  image: RgbaImage,
}

impl DecodedImage {
  pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
    Self {
      name: name.into(),
      image,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn natural_width(&self) -> u32 {
    self.image.width()
  }

  pub fn natural_height(&self) -> u32 {
    self.image.height()
  }

  pub fn image(&self) -> &RgbaImage {
    &self.image
  }
}

pub trait ImageDecoder {
  /// 解码必须完整结束后才返回，保证 natural 尺寸可用
  fn decode(&self, file: &InputFile) -> impl Future<Output = Result<DecodedImage, IngestError>>;
}

/// 使用 image 库在阻塞线程池中解码
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
  async fn decode(&self, file: &InputFile) -> Result<DecodedImage, IngestError> {
    let bytes = file.bytes().clone();
    let name = file.name().to_string();

    let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
      .await
      .map_err(|e| IngestError::Join(e.to_string()))??
      .to_rgba8();

    if image.width() == 0 || image.height() == 0 {
      warn!("图像尺寸为零: {}", name);
      return Err(IngestError::EmptyImage(name));
    }

    debug!("图像解码完成: {} {}x{}", name, image.width(), image.height());
    Ok(DecodedImage::new(name, image))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{ImageFormat, Rgba};
  use std::io::Cursor;

  fn encode_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
  }

  #[tokio::test]
  async fn decodes_png_with_natural_size() {
    let file = InputFile::new("tiny.png", "image/png", encode_png(7, 3));
    let decoded = ImageCrateDecoder.decode(&file).await.unwrap();
    assert_eq!(decoded.name(), "tiny.png");
    assert_eq!((decoded.natural_width(), decoded.natural_height()), (7, 3));
  }

  #[tokio::test]
  async fn garbage_bytes_fail_to_decode() {
    let file = InputFile::new("broken.png", "image/png", b"not an image".to_vec());
    assert!(matches!(
      ImageCrateDecoder.decode(&file).await,
      Err(IngestError::Decode(_))
    ));
  }
}
