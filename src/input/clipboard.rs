// 该文件是 Kuangshi （框识） 项目的一部分。
// src/input/clipboard.rs - 剪贴板粘贴
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

use super::InputFile;

/// 剪贴板条目
#[derive(Debug, Clone)]
pub enum ClipboardItem {
  Text(String),
  File(InputFile),
}

/// 取第一个文件类型的条目
pub fn first_pasted_file(items: impl IntoIterator<Item = ClipboardItem>) -> Option<InputFile> {
  items.into_iter().find_map(|item| match item {
    ClipboardItem::File(file) => Some(file),
    ClipboardItem::Text(_) => None,
  })
}
