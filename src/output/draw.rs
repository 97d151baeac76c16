// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::io::Cursor;

use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, ImageError, ImageFormat, Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};

use crate::model::{BBox, DetectItem, DetectResult};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_PADDING: i32 = 3;
const BOX_STROKE: i32 = 3;
const TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色

// 按检测序号循环使用的颜色
const PALETTE: [[u8; 3]; 5] = [
  [0xf9, 0x73, 0x16], // #f97316
  [0x25, 0x63, 0xeb], // #2563eb
  [0x16, 0xa3, 0x4a], // #16a34a
  [0xdb, 0x27, 0x77], // #db2777
  [0x7c, 0x3a, 0xed], // #7c3aed
];

/// 标签背景在图像中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelLayout {
  pub x: i32,
  pub y: i32,
  pub width: u32,
  pub height: u32,
}

/// 标签背景紧贴在框的上边缘之上，空间不足时贴住图像顶部（可能与框重叠）
pub fn label_layout(bbox: &BBox, text: (u32, u32), padding: i32) -> LabelLayout {
  let (text_width, text_height) = text;
  let width = text_width as i32 + padding * 2;
  let height = text_height as i32 + padding * 2;
  let x = bbox[0].floor() as i32;
  let y = (bbox[1].floor() as i32).saturating_sub(height).max(0);

  LabelLayout {
    x,
    y,
    width: width as u32,
    height: height as u32,
  }
}

pub fn palette_color(index: usize) -> Rgb<u8> {
  Rgb(PALETTE[index % PALETTE.len()])
}

pub struct Draw<'a> {
  font_size: f32,
  padding: i32,
  stroke: i32,
  text_color: Rgb<u8>,
  font: FontRef<'a>,
}

impl<'a> Default for Draw<'a> {
  fn default() -> Self {
    let font_data = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontRef::try_from_slice(font_data).expect("无法加载嵌入的字体文件");

    Self {
      font_size: LABEL_FONT_SIZE,
      padding: LABEL_PADDING,
      stroke: BOX_STROKE,
      text_color: Rgb(TEXT_COLOR),
      font,
    }
  }
}

impl<'a> Draw<'a> {
  fn scale(&self) -> PxScale {
    PxScale::from(self.font_size)
  }

  /// 文本渲染后的像素尺寸
  pub fn text_size(&self, text: &str) -> (u32, u32) {
    text_size(self.scale(), &self.font, text)
  }

  pub fn layout(&self, bbox: &BBox, text: &str) -> LabelLayout {
    label_layout(bbox, self.text_size(text), self.padding)
  }

  // 边框向内加粗；坐标先限制在图像附近，避免超大框逐像素遍历
  fn draw_outline(&self, image: &mut RgbImage, bbox: &BBox, color: Rgb<u8>) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let limit = |v: f32, max: i32| (v as i32).clamp(-self.stroke, max + self.stroke);

    let x_min = limit(bbox[0].floor(), w);
    let y_min = limit(bbox[1].floor(), h);
    let x_max = limit(bbox[2].ceil(), w);
    let y_max = limit(bbox[3].ceil(), h);

    for thickness in 0..self.stroke {
      let width = x_max - x_min + 1 - thickness * 2;
      let height = y_max - y_min + 1 - thickness * 2;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + thickness, y_min + thickness).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &DetectItem, bbox: &BBox, color: Rgb<u8>) {
    self.draw_outline(image, bbox, color);

    let caption = item.caption();
    let layout = self.layout(bbox, &caption);
    if layout.x >= image.width() as i32
      || layout.x.saturating_add(layout.width as i32) < 0
      || layout.y >= image.height() as i32
    {
      return;
    }
    let rect = Rect::at(layout.x, layout.y).of_size(layout.width, layout.height);
    draw_filled_rect_mut(image, rect, color);
    draw_text_mut(
      image,
      self.text_color,
      layout.x + self.padding,
      layout.y + self.padding,
      self.scale(),
      &self.font,
      &caption,
    );
  }

  /// 解码图像、绘制检测结果并重新编码为 PNG
  pub fn annotate(&self, data: &[u8], result: &DetectResult) -> Result<Vec<u8>, ImageError> {
    let mut image = image::load_from_memory(data)?.to_rgb8();
    self.draw_detections_on_image(&mut image, result);
    encode_png(image)
  }
}

pub trait DrawDetectionOnImage {
  fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult);
}

impl DrawDetectionOnImage for Draw<'_> {
  fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult) {
    for (index, item) in result.iter().enumerate() {
      // 没有边界框或坐标无效的目标直接跳过
      let Some(bbox) = item.bbox.filter(|b| b.iter().all(|v| v.is_finite())) else {
        continue;
      };
      self.draw_bbox_with_label(image, item, &bbox, palette_color(index));
    }
  }
}

pub fn encode_png(image: RgbImage) -> Result<Vec<u8>, ImageError> {
  let mut buffer = Cursor::new(Vec::new());
  DynamicImage::ImageRgb8(image).write_to(&mut buffer, ImageFormat::Png)?;
  Ok(buffer.into_inner())
}

/// 使用默认样式在原图上绘制检测结果
pub fn annotate(data: &[u8], result: &DetectResult) -> Result<Vec<u8>, ImageError> {
  Draw::default().annotate(data, result)
}

pub struct Record;

impl Record {
  /// 每行一个目标: `label, score, x_min, y_min, x_max, y_max`
  pub fn lines(result: &DetectResult) -> Vec<String> {
    result
      .iter()
      .map(|item| {
        let score = item.score.unwrap_or(0.0);
        match item.bbox {
          Some(b) => format!(
            "{}, {:.4}, {:.1}, {:.1}, {:.1}, {:.1}",
            item.label, score, b[0], b[1], b[2], b[3]
          ),
          None => format!("{}, {:.4}", item.label, score),
        }
      })
      .collect()
  }

  pub fn record(result: &DetectResult, path: &std::path::Path) -> Result<(), std::io::Error> {
    std::fs::write(path.with_extension("txt"), Self::lines(result).join("\n"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn blank_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(RgbImage::new(width, height)).unwrap()
  }

  fn decode(data: &[u8]) -> RgbImage {
    image::load_from_memory(data).unwrap().to_rgb8()
  }

  #[test]
  fn palette_cycles_by_index() {
    assert_eq!(palette_color(0), Rgb([0xf9, 0x73, 0x16]));
    assert_eq!(palette_color(5), palette_color(0));
    assert_eq!(palette_color(7), palette_color(2));
    assert_ne!(palette_color(1), palette_color(0));
  }

  #[test]
  fn label_sits_above_box() {
    let layout = label_layout(&[20.0, 100.0, 80.0, 150.0], (40, 12), 3);
    assert_eq!(
      layout,
      LabelLayout {
        x: 20,
        y: 82,
        width: 46,
        height: 18
      }
    );
  }

  #[test]
  fn label_is_clamped_to_image_top() {
    let layout = label_layout(&[5.0, 4.0, 50.0, 50.0], (30, 12), 3);
    assert_eq!(layout.y, 0);
    assert_eq!(layout.height, 18);
  }

  #[test]
  fn label_far_above_image_clamps_to_top() {
    let layout = label_layout(&[-3.0e9, -3.0e9, 20.0, 20.0], (30, 12), 3);
    assert_eq!(layout.y, 0);
    assert_eq!(layout.x, i32::MIN);
  }

  #[test]
  fn items_without_bbox_are_skipped() {
    let source = blank_png(64, 48);
    let result = DetectResult::from(vec![DetectItem {
      label: "ghost".to_string(),
      score: Some(0.5),
      bbox: None,
    }]);
    let output = annotate(&source, &result).unwrap();
    assert_eq!(decode(&output), decode(&source));
  }

  #[test]
  fn draws_outline_and_label_background() {
    let source = blank_png(120, 120);
    let result = DetectResult::from(vec![DetectItem::new("cat", 0.9, [20.0, 60.0, 80.0, 110.0])]);
    let image = decode(&annotate(&source, &result).unwrap());
    let color = palette_color(0);

    // 边框
    assert_eq!(*image.get_pixel(20, 80), color);
    assert_eq!(*image.get_pixel(22, 80), color);
    assert_eq!(*image.get_pixel(80, 80), color);
    // 边框内部保持原样
    assert_eq!(*image.get_pixel(50, 85), Rgb([0, 0, 0]));
    // 标签背景位于框上方
    assert_eq!(*image.get_pixel(20, 59), color);
  }

  #[test]
  fn second_item_uses_next_color() {
    let source = blank_png(200, 200);
    let result = DetectResult::from(vec![
      DetectItem::new("a", 0.9, [10.0, 50.0, 60.0, 100.0]),
      DetectItem::new("b", 0.8, [100.0, 120.0, 190.0, 190.0]),
    ]);
    let image = decode(&annotate(&source, &result).unwrap());
    assert_eq!(*image.get_pixel(10, 75), palette_color(0));
    assert_eq!(*image.get_pixel(100, 150), palette_color(1));
  }

  #[test]
  fn annotation_is_deterministic() {
    let source = blank_png(90, 90);
    let result = DetectResult::from(vec![
      DetectItem::new("a", 0.9, [10.0, 30.0, 60.0, 80.0]),
      DetectItem::new("b", 0.1, [0.0, 0.0, 20.0, 20.0]),
    ]);
    assert_eq!(
      annotate(&source, &result).unwrap(),
      annotate(&source, &result).unwrap()
    );
  }

  #[test]
  fn degenerate_and_out_of_range_boxes_do_not_panic() {
    let source = blank_png(50, 50);
    let result = DetectResult::from(vec![
      DetectItem::new("empty", 0.0, [0.0, 0.0, 0.0, 0.0]),
      DetectItem::new("inverted", 0.2, [40.0, 40.0, 10.0, 10.0]),
      DetectItem::new("huge", 0.3, [-1e9, -1e9, 1e9, 1e9]),
      DetectItem::new("nan", 0.4, [f32::NAN, 0.0, 1.0, 1.0]),
    ]);
    let output = annotate(&source, &result).unwrap();
    let image = decode(&output);
    assert_eq!(image.dimensions(), (50, 50));
  }

  #[test]
  fn coordinates_beyond_i32_range_do_not_panic() {
    let source = blank_png(50, 50);
    let result = DetectResult::from(vec![
      DetectItem::new("far", 0.5, [10.0, -3.0e9, 20.0, 20.0]),
      DetectItem::new("left", 0.5, [-3.0e9, 10.0, 20.0, 20.0]),
      DetectItem::new("below", 0.5, [10.0, 3.0e9, 20.0, 3.0e9]),
    ]);
    let output = annotate(&source, &result).unwrap();
    let image = decode(&output);
    assert_eq!(image.dimensions(), (50, 50));
  }

  #[test]
  fn record_lines_format() {
    let result = DetectResult::from(vec![DetectItem::new("cat", 0.5, [1.0, 2.0, 3.0, 4.0])]);
    assert_eq!(
      Record::lines(&result),
      vec!["cat, 0.5000, 1.0, 2.0, 3.0, 4.0".to_string()]
    );
  }
}
