// 该文件是 Kuangshi （框识） 项目的一部分。
// src/input.rs - 图像输入
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

use std::{path::Path, sync::Arc};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

mod clipboard;
mod decode;
mod drop_zone;

pub use self::clipboard::{ClipboardItem, first_pasted_file};
pub use self::decode::{DecodedImage, ImageCrateDecoder, ImageDecoder};
pub use self::drop_zone::{DragEvent, DropZone};

const IMAGE_MIME_PREFIX: &str = "image/";
const OCTET_STREAM_MIME: &str = "application/octet-stream";

#[derive(Error, Debug)]
pub enum IngestError {
  #[error("不是图像文件: {name} ({mime})")]
  InvalidInput { name: String, mime: String },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  Decode(#[from] image::ImageError),
  #[error("图像尺寸为零: {0}")]
  EmptyImage(String),
  #[error("解码任务异常: {0}")]
  Join(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 用户提交的文件
#[derive(Debug, Clone)]
pub struct InputFile {
  name: String,
  mime: String,
  bytes: Arc<[u8]>,
}

impl InputFile {
  pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
    Self {
      name: name.into(),
      mime: mime.into(),
      bytes: bytes.into(),
    }
  }

  /// 从磁盘读取文件，根据扩展名推断 MIME 类型
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IngestError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    let mime = mime_from_path(path);
    debug!("读取输入文件: {} ({}, {} 字节)", name, mime, bytes.len());
    Ok(Self::new(name, mime, bytes))
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn mime(&self) -> &str {
    &self.mime
  }

  pub fn bytes(&self) -> &Arc<[u8]> {
    &self.bytes
  }

  pub fn is_image(&self) -> bool {
    self.mime.starts_with(IMAGE_MIME_PREFIX)
  }

  /// 校验 MIME 类型
  pub fn validate(&self) -> Result<(), IngestError> {
    if self.is_image() {
      Ok(())
    } else {
      Err(IngestError::InvalidInput {
        name: self.name.clone(),
        mime: self.mime.clone(),
      })
    }
  }
}

fn mime_from_path(path: &Path) -> String {
  if let Ok(format) = image::ImageFormat::from_path(path) {
    return format.to_mime_type().to_string();
  }
  match path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| e.to_ascii_lowercase())
    .as_deref()
  {
    Some("txt") => "text/plain".to_string(),
    Some("json") => "application/json".to_string(),
    _ => OCTET_STREAM_MIME.to_string(),
  }
}

impl FromUrlWithScheme for InputFile {
  const SCHEME: &'static str = "image";
}

impl FromUrl for InputFile {
  type Error = IngestError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(IngestError::SchemeMismatch(url.scheme().to_string()));
    }

    let path = urlencoding::decode(url.path())
      .map_err(|e| IngestError::SchemeMismatch(e.to_string()))?;
    Self::from_path(path.as_ref())
  }
}

/// 界面输入事件
#[derive(Debug, Clone)]
pub enum InputEvent {
  /// 文件选择框选中了文件
  PickerChanged(Vec<InputFile>),
  /// 点击“选择文件”按钮
  ChooseClicked,
  /// 点击拖放区域
  DropZoneClicked,
  /// 拖放事件
  Drag(DragEvent),
  /// 全局粘贴事件
  Paste(Vec<ClipboardItem>),
}

/// 事件路由结果
#[derive(Debug, Clone, Default)]
pub struct Routed {
  pub file: Option<InputFile>,
  /// 是否阻止浏览器默认行为
  pub prevent_default: bool,
  /// 是否需要打开文件选择框
  pub open_picker: bool,
}

/// 把三种输入来源归一为单个文件
#[derive(Debug, Default)]
pub struct InputRouter {
  drop_zone: DropZone,
}

impl InputRouter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn drop_zone(&self) -> &DropZone {
    &self.drop_zone
  }

  pub fn route(&mut self, event: InputEvent) -> Routed {
    match event {
      InputEvent::PickerChanged(files) => Routed {
        file: files.into_iter().next(),
        ..Routed::default()
      },
      InputEvent::ChooseClicked | InputEvent::DropZoneClicked => Routed {
        open_picker: true,
        ..Routed::default()
      },
      InputEvent::Drag(event) => Routed {
        file: self.drop_zone.handle(event),
        prevent_default: true,
        open_picker: false,
      },
      InputEvent::Paste(items) => Routed {
        file: first_pasted_file(items),
        ..Routed::default()
      },
    }
  }
}
