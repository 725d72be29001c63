// 该文件是 Kuangshi （框识） 项目的一部分。
// src/relay.rs - 兼容上传接口
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

//! 上传中继：接收图像并原样保存，不做任何分析，检测在客户端完成。

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{
  Json, Router,
  extract::{
    DefaultBodyLimit, Multipart, State,
    multipart::{MultipartError, MultipartRejection},
  },
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

/// 上传大小上限 10 MB
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const IMAGE_FIELD: &str = "image";

const MISSING_FIELD_MESSAGE: &str = "No image uploaded. Field name must be \"image\".";
const FAILURE_MESSAGE: &str = "Failed to analyze image";

#[derive(Error, Debug)]
pub enum RelayError {
  #[error("缺少 image 字段")]
  MissingField,
  #[error("multipart 解析错误: {0}")]
  Multipart(#[from] MultipartError),
  #[error("上传文件过大: {0} 字节")]
  TooLarge(usize),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
}

impl IntoResponse for RelayError {
  fn into_response(self) -> Response {
    match self {
      RelayError::MissingField => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": MISSING_FIELD_MESSAGE })),
      )
        .into_response(),
      RelayError::Multipart(e) => {
        let status = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
          StatusCode::PAYLOAD_TOO_LARGE
        } else {
          StatusCode::INTERNAL_SERVER_ERROR
        };
        error!("Analyze error: {}", e.body_text());
        (
          status,
          Json(json!({ "error": FAILURE_MESSAGE, "details": e.body_text() })),
        )
          .into_response()
      }
      RelayError::TooLarge(size) => (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(json!({
          "error": FAILURE_MESSAGE,
          "details": format!("File too large: {} bytes", size),
        })),
      )
        .into_response(),
      RelayError::Io(e) => {
        error!("Analyze error: {}", e);
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": FAILURE_MESSAGE, "details": e.to_string() })),
        )
          .into_response()
      }
    }
  }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
  pub summary: &'static str,
  pub objects: Vec<String>,
  pub model: &'static str,
}

impl Default for AnalyzeResponse {
  fn default() -> Self {
    Self {
      summary: "Client-side analysis performed.",
      objects: Vec::new(),
      model: "on-device",
    }
  }
}

#[derive(Debug, Clone)]
pub struct RelayState {
  uploads_dir: PathBuf,
}

impl RelayState {
  /// 上传目录不存在时创建
  pub fn new(uploads_dir: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
    let uploads_dir = uploads_dir.into();
    std::fs::create_dir_all(&uploads_dir)?;
    Ok(Self { uploads_dir })
  }

  pub fn uploads_dir(&self) -> &Path {
    &self.uploads_dir
  }

  /// 生成 `<base>-<timestamp_ms><ext>` 形式的文件名
  fn target_path(&self, original: &str) -> PathBuf {
    let original = Path::new(original)
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    let original = Path::new(&original);
    let base = original
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "upload".to_string());
    let ext = original
      .extension()
      .map(|e| format!(".{}", e.to_string_lossy()))
      .unwrap_or_default();
    let timestamp = chrono::Utc::now().timestamp_millis();
    self
      .uploads_dir
      .join(format!("{}-{}{}", base, timestamp, ext))
  }
}

pub fn router(state: RelayState) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/api/analyze", post(analyze))
    // multipart 头部开销之外再留少量余量
    .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
    .with_state(Arc::new(state))
}

async fn health() -> Json<serde_json::Value> {
  Json(json!({ "ok": true }))
}

async fn analyze(
  State(state): State<Arc<RelayState>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, RelayError> {
  // 不是 multipart 请求时同样视为没有上传文件
  let mut multipart = multipart.map_err(|e| {
    warn!("无法解析上传请求: {}", e.body_text());
    RelayError::MissingField
  })?;

  while let Some(field) = multipart.next_field().await? {
    // 只接受文件字段，同名的普通表单字段忽略
    if field.name() != Some(IMAGE_FIELD) || field.file_name().is_none() {
      continue;
    }

    let file_name = field.file_name().unwrap_or_default().to_string();
    let bytes = field.bytes().await?;
    if bytes.len() > MAX_UPLOAD_BYTES {
      warn!("上传文件过大: {} ({} 字节)", file_name, bytes.len());
      return Err(RelayError::TooLarge(bytes.len()));
    }

    let target = state.target_path(&file_name);
    tokio::fs::write(&target, &bytes).await?;
    info!("保存上传文件: {} ({} 字节)", target.display(), bytes.len());

    return Ok(Json(AnalyzeResponse::default()));
  }

  Err(RelayError::MissingField)
}
