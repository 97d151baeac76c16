// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/model.rs - 检测结果数据模型
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

use serde::Serialize;

/// 像素坐标矩形 [x_min, y_min, x_max, y_max]
pub type BBox = [f32; 4];

/// 单个检测目标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectItem {
  pub label: String,
  /// 置信度，解析服务结果时缺省为 0
  pub score: Option<f32>,
  pub bbox: Option<BBox>, // [x_min, y_min, x_max, y_max]
}

impl DetectItem {
  pub fn new(label: impl Into<String>, score: f32, bbox: BBox) -> Self {
    Self {
      label: label.into(),
      score: Some(score),
      bbox: Some(bbox),
    }
  }

  /// 标注文本：`label` 或 `label 0.87`
  pub fn caption(&self) -> String {
    match self.score {
      Some(score) => format!("{} {:.2}", self.label, score),
      None => self.label.clone(),
    }
  }
}

/// 检测结果，保持服务返回的顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectItem> {
    self.items.iter()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl<'a> IntoIterator for &'a DetectResult {
  type Item = &'a DetectItem;
  type IntoIter = std::slice::Iter<'a, DetectItem>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

mod geometry;
mod unpack;
pub use self::geometry::{BoxRecord, normalize};
pub use self::unpack::{Document, Unpacked, unpack};
