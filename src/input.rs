// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/input.rs - 图像输入
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

use image::{ImageError, ImageReader};

/// 未知格式时使用的默认内容类型
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// 编码后的源图像、内容类型与像素尺寸
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
  pub data: Vec<u8>,
  pub content_type: String,
  pub width: u32,
  pub height: u32,
}

impl ImagePayload {
  /// 根据文件头推断内容类型与尺寸
  pub fn new(data: Vec<u8>) -> Result<Self, ImageError> {
    let content_type = content_type_of(&data).to_string();
    Self::with_content_type(data, content_type)
  }

  pub fn with_content_type(data: Vec<u8>, content_type: impl Into<String>) -> Result<Self, ImageError> {
    let (width, height) = dimensions_of(&data)?;
    Ok(Self {
      data,
      content_type: content_type.into(),
      width,
      height,
    })
  }
}

pub fn content_type_of(data: &[u8]) -> &'static str {
  match image::guess_format(data) {
    Ok(format) => format.to_mime_type(),
    Err(_) => DEFAULT_CONTENT_TYPE,
  }
}

/// 只读取文件头得到像素尺寸，不解码像素数据
pub fn dimensions_of(data: &[u8]) -> Result<(u32, u32), ImageError> {
  ImageReader::new(Cursor::new(data))
    .with_guessed_format()
    .map_err(ImageError::IoError)?
    .into_dimensions()
}

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};
