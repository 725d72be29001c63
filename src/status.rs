// 该文件是 Kuangshi （框识） 项目的一部分。
// src/status.rs - 状态栏
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

use std::rc::Rc;

use tokio::sync::watch;
use tracing::debug;

/// 状态文本，加载器、检测器与会话共用同一份
#[derive(Debug, Clone)]
pub struct StatusBoard {
  tx: Rc<watch::Sender<String>>,
}

impl Default for StatusBoard {
  fn default() -> Self {
    Self::new()
  }
}

impl StatusBoard {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(String::new());
    Self { tx: Rc::new(tx) }
  }

  pub fn set(&self, msg: impl Into<String>) {
    let msg = msg.into();
    debug!("状态更新: {}", msg);
    self.tx.send_replace(msg);
  }

  pub fn current(&self) -> String {
    self.tx.borrow().clone()
  }

  pub fn subscribe(&self) -> watch::Receiver<String> {
    self.tx.subscribe()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clones_share_the_same_line() {
    let board = StatusBoard::new();
    let other = board.clone();
    let rx = board.subscribe();
    other.set("Detecting…");
    assert_eq!(board.current(), "Detecting…");
    assert_eq!(*rx.borrow(), "Detecting…");
  }
}
