// 该文件是 Kuangshi （框识） 项目的一部分。
// src/detection.rs - 检测结果与类别统计
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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 单个检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub bbox: [f32; 4], // [x, y, width, height]，原图像素坐标
  #[serde(rename = "class")]
  pub class_name: String,
  pub score: f32,
}

impl Detection {
  pub fn new(class_name: impl Into<String>, score: f32, bbox: [f32; 4]) -> Self {
    Self {
      bbox,
      class_name: class_name.into(),
      score,
    }
  }

  /// 置信度百分比（四舍五入）
  pub fn percent(&self) -> i64 {
    (self.score * 100.0).round() as i64
  }

  /// 标签文本，形如 `dog 87%`
  pub fn label(&self) -> String {
    format!("{} {}%", self.class_name, self.percent())
  }
}

/// 一次检测得到的全部结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
  items: Box<[Detection]>,
}

impl From<Vec<Detection>> for DetectionSet {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl DetectionSet {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }

  /// 置信度最高的检测结果，同分时取靠前者
  pub fn top(&self) -> Option<&Detection> {
    self.items.iter().fold(None, |best, item| match best {
      Some(b) if b.score >= item.score => Some(b),
      _ => Some(item),
    })
  }
}

impl<'a> IntoIterator for &'a DetectionSet {
  type Item = &'a Detection;
  type IntoIter = std::slice::Iter<'a, Detection>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

/// 侧边列表中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyRow {
  pub label: String,
  pub count: usize,
}

/// 按类别统计的检测数量
///
/// 分组保持类别首次出现的顺序，随后按数量降序做稳定排序，
/// 数量相同的类别仍按首次出现的顺序排列。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassTally {
  entries: Vec<TallyRow>,
}

impl ClassTally {
  pub fn from_detections(detections: &DetectionSet) -> Self {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<TallyRow> = Vec::new();

    for det in detections {
      match index.get(det.class_name.as_str()) {
        Some(&i) => entries[i].count += 1,
        None => {
          index.insert(det.class_name.as_str(), entries.len());
          entries.push(TallyRow {
            label: det.class_name.clone(),
            count: 1,
          });
        }
      }
    }

    // sort_by 是稳定排序
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    Self { entries }
  }

  pub fn rows(&self) -> &[TallyRow] {
    &self.entries
  }

  pub fn into_rows(self) -> Vec<TallyRow> {
    self.entries
  }

  pub fn total(&self) -> usize {
    self.entries.iter().map(|row| row.count).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
