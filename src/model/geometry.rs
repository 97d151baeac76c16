// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/model/geometry.rs - 边界框坐标归一化
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

use serde_json::{Map, Value};

use crate::model::BBox;

// 候选字段，按顺序取第一个存在的值
const X_KEYS: &[&str] = &["x", "xmin"];
const Y_KEYS: &[&str] = &["y", "ymin"];
const WIDTH_KEYS: &[&str] = &["width"];
const HEIGHT_KEYS: &[&str] = &["height"];
const X_MAX_KEYS: &[&str] = &["xmax"];
const Y_MAX_KEYS: &[&str] = &["ymax"];

/// 服务返回的原始边界框记录（松散类型）
#[derive(Debug, Clone, Copy)]
pub struct BoxRecord<'a>(pub &'a Map<String, Value>);

impl BoxRecord<'_> {
  /// 依次查找候选字段，返回第一个可解析为有限数值的值
  pub fn number(&self, keys: &[&str]) -> Option<f64> {
    keys
      .iter()
      .find_map(|key| self.0.get(*key).and_then(as_number))
  }
}

/// 数值或数值字符串，其他类型视为缺失
pub(crate) fn as_number(value: &Value) -> Option<f64> {
  let number = match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  };
  number.filter(|n| n.is_finite())
}

fn is_unit(value: f64) -> bool {
  (0.0..=1.0).contains(&value)
}

// 位置与尺寸同时落在 [0, 1] 内才视为归一化坐标
fn scale_axis(position: f64, extent: f64, size: u32) -> (f64, f64) {
  if is_unit(position) && is_unit(extent) {
    (position * size as f64, extent * size as f64)
  } else {
    (position, extent)
  }
}

/// 将一条边界框记录转换为像素坐标 [x_min, y_min, x_max, y_max]
///
/// 缺失字段按 0 处理，可能得到面积为 0 的框；结果不裁剪到图像范围内。
pub fn normalize(record: &Map<String, Value>, width: u32, height: u32) -> BBox {
  let record = BoxRecord(record);

  let x = record.number(X_KEYS).unwrap_or(0.0);
  let y = record.number(Y_KEYS).unwrap_or(0.0);
  let w = record
    .number(WIDTH_KEYS)
    .or_else(|| record.number(X_MAX_KEYS).map(|x_max| x_max - x))
    .unwrap_or(0.0);
  let h = record
    .number(HEIGHT_KEYS)
    .or_else(|| record.number(Y_MAX_KEYS).map(|y_max| y_max - y))
    .unwrap_or(0.0);

  let (x, w) = scale_axis(x, w, width);
  let (y, h) = scale_axis(y, h, height);

  [x as f32, y as f32, (x + w) as f32, (y + h) as f32]
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn record(value: Value) -> Map<String, Value> {
    match value {
      Value::Object(map) => map,
      _ => panic!("测试记录必须是对象"),
    }
  }

  fn assert_bbox(actual: BBox, expected: BBox) {
    for (a, e) in actual.iter().zip(expected.iter()) {
      assert!((a - e).abs() < 1e-3, "{:?} != {:?}", actual, expected);
    }
  }

  #[test]
  fn scales_normalized_origin_and_size() {
    let r = record(json!({"x": 0.1, "y": 0.1, "width": 0.2, "height": 0.2}));
    assert_bbox(normalize(&r, 800, 600), [80.0, 60.0, 240.0, 180.0]);
  }

  #[test]
  fn keeps_absolute_corner_pair() {
    let r = record(json!({"xmin": 50, "ymin": 60, "xmax": 150, "ymax": 260}));
    assert_bbox(normalize(&r, 800, 600), [50.0, 60.0, 150.0, 260.0]);
    assert_bbox(normalize(&r, 10, 10), [50.0, 60.0, 150.0, 260.0]);
  }

  #[test]
  fn normalized_corner_pair() {
    let r = record(json!({"xmin": 0.25, "ymin": 0.5, "xmax": 0.75, "ymax": 1.0}));
    assert_bbox(normalize(&r, 400, 200), [100.0, 100.0, 300.0, 200.0]);
  }

  #[test]
  fn axes_are_scaled_independently() {
    // x 轴已是像素坐标，y 轴仍为归一化坐标
    let r = record(json!({"x": 120, "y": 0.5, "width": 40, "height": 0.25}));
    assert_bbox(normalize(&r, 640, 480), [120.0, 240.0, 160.0, 360.0]);
  }

  #[test]
  fn small_pixel_origin_with_large_extent_is_not_scaled() {
    let r = record(json!({"x": 0.5, "y": 1, "width": 300, "height": 200}));
    assert_bbox(normalize(&r, 800, 600), [0.5, 1.0, 300.5, 201.0]);
  }

  #[test]
  fn x_takes_precedence_over_xmin() {
    let r = record(json!({"x": 10, "xmin": 99, "y": 20, "width": 5, "height": 5}));
    assert_bbox(normalize(&r, 100, 100), [10.0, 20.0, 15.0, 25.0]);
  }

  #[test]
  fn missing_fields_degrade_to_empty_box() {
    let r = record(json!({}));
    assert_bbox(normalize(&r, 800, 600), [0.0, 0.0, 0.0, 0.0]);

    let r = record(json!({"x": "oops", "y": null, "width": [1, 2]}));
    assert_bbox(normalize(&r, 800, 600), [0.0, 0.0, 0.0, 0.0]);
  }

  #[test]
  fn accepts_numeric_strings() {
    let r = record(json!({"x": "12.5", "y": " 7 ", "width": "100", "height": "50"}));
    assert_bbox(normalize(&r, 800, 600), [12.5, 7.0, 112.5, 57.0]);
  }

  #[test]
  fn out_of_range_values_pass_through() {
    let r = record(json!({"xmin": -20, "ymin": 590, "xmax": 900, "ymax": 700}));
    assert_bbox(normalize(&r, 800, 600), [-20.0, 590.0, 900.0, 700.0]);
  }

  #[test]
  fn tiny_pixel_box_at_origin_is_read_as_normalized() {
    // 已知边界情况：原点为 0 且尺寸 ≤ 1 像素的框会被当作归一化坐标放大
    let r = record(json!({"x": 0, "y": 0, "width": 1, "height": 1}));
    assert_bbox(normalize(&r, 800, 600), [0.0, 0.0, 800.0, 600.0]);
  }
}
