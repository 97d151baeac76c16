// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::ImageFormat;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{ImagePayload, content_type_of},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

pub struct ImageFileInput {
  payload: ImagePayload,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url.path();
    let data = std::fs::read(path)?;
    let content_type = match ImageFormat::from_path(path) {
      Ok(format) => format.to_mime_type(),
      Err(_) => content_type_of(&data),
    };
    // 文件头必须可识别，避免把无效数据上传到服务端
    let payload = ImagePayload::with_content_type(data, content_type)?;
    debug!(
      "读取图像 {}: {}x{} {}",
      path, payload.width, payload.height, payload.content_type
    );

    Ok(ImageFileInput { payload })
  }
}

impl ImageFileInput {
  pub fn payload(&self) -> &ImagePayload {
    &self.payload
  }

  pub fn into_payload(self) -> ImagePayload {
    self.payload
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::output::draw::encode_png;
  use image::RgbImage;

  #[test]
  fn reads_image_with_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("source.png");
    let png = encode_png(RgbImage::new(4, 3)).unwrap();
    std::fs::write(&path, &png).unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let payload = ImageFileInput::from_url(&url).unwrap().into_payload();
    assert_eq!(payload.data, png);
    assert_eq!(payload.content_type, "image/png");
    assert_eq!((payload.width, payload.height), (4, 3));
  }

  #[test]
  fn rejects_undecodable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"definitely not a png").unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::ImageLoadError(_))
    ));
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("file:///tmp/source.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }
}
