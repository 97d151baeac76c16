// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::{Path, PathBuf};

use image::ImageFormat;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::DetectResult,
  output::{Render, draw::Record},
};

pub struct SaveImageFileOutput {
  path: PathBuf,
  record: bool,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  /// `image:///out/result.png`，附加 `?record=false` 时不写检测记录
  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let record = !uri
      .query_pairs()
      .any(|(k, v)| k == "record" && (v == "false" || v == "0"));

    Ok(SaveImageFileOutput {
      path: PathBuf::from(uri.path()),
      record,
    })
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      record: true,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  // 结果图像格式与目标扩展名一致时直接写入，否则转码
  fn save_image(&self, data: &[u8]) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let target = ImageFormat::from_path(&self.path).ok();
    let source = image::guess_format(data).ok();
    if target.is_some() && target != source {
      debug!("结果图像格式 {:?} 与目标 {:?} 不一致，重新编码", source, target);
      image::load_from_memory(data)?.save(&self.path)?;
    } else {
      std::fs::write(&self.path, data)?;
    }

    info!("保存图像到文件: {}", self.path.display());
    Ok(())
  }
}

impl Render for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, image: &[u8], result: &DetectResult) -> Result<(), Self::Error> {
    self.save_image(image)?;
    if self.record {
      Record::record(result, &self.path)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::DetectItem;
  use crate::output::draw::encode_png;
  use image::RgbImage;

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("file:///tmp/out.png").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn writes_image_and_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("result.png");
    let output = SaveImageFileOutput::new(&path);

    let png = encode_png(RgbImage::new(8, 8)).unwrap();
    let result = DetectResult::from(vec![DetectItem::new("cat", 0.25, [1.0, 2.0, 3.0, 4.0])]);
    output.render_result(&png, &result).unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), png);
    let record = std::fs::read_to_string(path.with_extension("txt")).unwrap();
    assert_eq!(record, "cat, 0.2500, 1.0, 2.0, 3.0, 4.0");
  }

  #[test]
  fn converts_to_target_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.jpg");
    let url = Url::from_file_path(&path).unwrap();
    let url = Url::parse(&format!("image://{}?record=false", url.path())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let png = encode_png(RgbImage::new(8, 8)).unwrap();
    output.render_result(&png, &DetectResult::default()).unwrap();

    let written = std::fs::read(&path).unwrap();
    assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Jpeg);
    assert!(!path.with_extension("txt").exists());
  }
}
