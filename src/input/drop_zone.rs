// 该文件是 Kuangshi （框识） 项目的一部分。
// src/input/drop_zone.rs - 拖放区域
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

use tracing::debug;

use super::InputFile;

/// 拖放事件
#[derive(Debug, Clone)]
pub enum DragEvent {
  Enter,
  Over,
  Leave,
  Drop(Vec<InputFile>),
}

/// 拖放区域，记录“拖动中”的视觉状态
#[derive(Debug, Default)]
pub struct DropZone {
  dragging: bool,
}

impl DropZone {
  pub fn is_dragging(&self) -> bool {
    self.dragging
  }

  /// 处理拖放事件，放下时返回第一个文件
  pub fn handle(&mut self, event: DragEvent) -> Option<InputFile> {
    match event {
      DragEvent::Enter | DragEvent::Over => {
        self.dragging = true;
        None
      }
      DragEvent::Leave => {
        self.dragging = false;
        None
      }
      DragEvent::Drop(files) => {
        self.dragging = false;
        debug!("拖放了 {} 个文件", files.len());
        files.into_iter().next()
      }
    }
  }
}
