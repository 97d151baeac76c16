// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/model/unpack.rs - 服务响应压缩包解析
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

use std::io::{Cursor, Read};

use serde_json::{Map, Value};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::model::{
  DetectItem, DetectResult,
  geometry::{as_number, normalize},
};

// 候选字段表，按顺序取第一个命中的字段
const COLLECTION_KEYS: &[&str] = &["predictions", "detections", "objects", "results", "data"];
const BOX_KEYS: &[&str] = &["bbox", "box", "bounding_box"];
const LABEL_KEYS: &[&str] = &["label", "class", "text"];
const SCORE_KEYS: &[&str] = &["confidence", "score"];

const DEFAULT_LABEL: &str = "object";
const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".webp"];
const JSON_EXTENSION: &str = ".json";

/// 解析边界处的 JSON 文档
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
  Mapping(Map<String, Value>),
  Sequence(Vec<Value>),
  Other,
}

impl From<Value> for Document {
  fn from(value: Value) -> Self {
    match value {
      Value::Object(map) => Document::Mapping(map),
      Value::Array(items) => Document::Sequence(items),
      _ => Document::Other,
    }
  }
}

impl Document {
  /// 取出文档中的检测记录
  ///
  /// 对象文档优先查找集合字段，找不到时把对象本身当作一条记录。
  pub fn into_records(self) -> Vec<Value> {
    match self {
      Document::Mapping(mut map) => {
        let key = COLLECTION_KEYS
          .iter()
          .find(|key| matches!(map.get(**key), Some(Value::Array(_))));
        match key.and_then(|key| map.remove(*key)) {
          Some(Value::Array(items)) => items,
          _ => vec![Value::Object(map)],
        }
      }
      Document::Sequence(items) => items,
      Document::Other => Vec::new(),
    }
  }

  pub fn detections(self, width: u32, height: u32) -> Vec<DetectItem> {
    self
      .into_records()
      .iter()
      .filter_map(|record| record.as_object())
      .map(|record| detect_item(record, width, height))
      .collect()
  }
}

fn as_label(value: &Value) -> Option<String> {
  match value {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn detect_item(record: &Map<String, Value>, width: u32, height: u32) -> DetectItem {
  let label = LABEL_KEYS
    .iter()
    .find_map(|key| record.get(*key).and_then(as_label))
    .unwrap_or_else(|| DEFAULT_LABEL.to_string());
  let score = SCORE_KEYS
    .iter()
    .find_map(|key| record.get(*key).and_then(as_number))
    .unwrap_or(0.0);
  let bbox_record = BOX_KEYS
    .iter()
    .find_map(|key| record.get(*key).and_then(Value::as_object))
    .unwrap_or(record);

  DetectItem {
    label,
    score: Some(score as f32),
    bbox: Some(normalize(bbox_record, width, height)),
  }
}

/// 压缩包解析结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unpacked {
  pub result: DetectResult,
  /// 服务自带的预览图，没有时为空
  pub image: Vec<u8>,
}

impl Unpacked {
  pub fn has_preview(&self) -> bool {
    !self.image.is_empty()
  }
}

fn is_image_entry(name: &str) -> bool {
  IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

fn parse_document(data: &[u8]) -> Option<Document> {
  match serde_json::from_slice::<Value>(data) {
    Ok(value) => Some(Document::from(value)),
    Err(e) => {
      warn!("JSON 文档解析失败，已跳过: {}", e);
      None
    }
  }
}

/// 解析服务返回的压缩包，提取检测结果与第一张预览图
///
/// 空输入表示没有结果；任何损坏的条目都只会被跳过，不会返回错误。
pub fn unpack(data: &[u8], width: u32, height: u32) -> Unpacked {
  if data.is_empty() {
    debug!("服务响应为空，没有检测结果");
    return Unpacked::default();
  }

  let mut archive = match ZipArchive::new(Cursor::new(data)) {
    Ok(archive) => archive,
    Err(e) => {
      warn!("响应不是有效的压缩包 ({}), 尝试按 JSON 解析", e);
      let items = parse_document(data)
        .map(|doc| doc.detections(width, height))
        .unwrap_or_default();
      return Unpacked {
        result: items.into(),
        image: Vec::new(),
      };
    }
  };

  let mut items = Vec::new();
  let mut image = Vec::new();

  for index in 0..archive.len() {
    let mut entry = match archive.by_index(index) {
      Ok(entry) => entry,
      Err(e) => {
        warn!("读取压缩包第 {} 个条目失败: {}", index, e);
        continue;
      }
    };
    if entry.is_dir() {
      continue;
    }

    let name = entry.name().to_lowercase();
    if image.is_empty() && is_image_entry(&name) {
      debug!("使用压缩包内的预览图: {}", entry.name());
      if let Err(e) = entry.read_to_end(&mut image) {
        warn!("读取预览图 {} 失败: {}", name, e);
        image.clear();
      }
    } else if name.ends_with(JSON_EXTENSION) {
      let mut buffer = Vec::new();
      if let Err(e) = entry.read_to_end(&mut buffer) {
        warn!("读取 JSON 文档 {} 失败: {}", name, e);
        continue;
      }
      if let Some(doc) = parse_document(&buffer) {
        let found = doc.detections(width, height);
        debug!("{} 中解析到 {} 个目标", name, found.len());
        items.extend(found);
      }
    }
  }

  Unpacked {
    result: items.into(),
    image,
  }
}
