// 该文件是 Kuangshi （框识） 项目的一部分。
// src/main.rs - 上传中继服务
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

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use kuangshi::relay::{RelayState, router};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("上传目录: {}", args.uploads_dir.display());
  let state = RelayState::new(&args.uploads_dir)
    .with_context(|| format!("无法创建上传目录: {}", args.uploads_dir.display()))?;

  let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
  })
  .context("无法设置 Ctrl-C 处理函数")?;

  let addr = format!("{}:{}", args.host, args.port);
  let listener = tokio::net::TcpListener::bind(&addr)
    .await
    .with_context(|| format!("无法监听地址: {}", addr))?;
  info!("Server listening on http://{}", addr);

  axum::serve(listener, router(state))
    .with_graceful_shutdown(async move {
      rx.recv().await;
      warn!("停止接收新连接");
    })
    .await
    .context("服务异常退出")?;

  info!("服务已退出");
  Ok(())
}
