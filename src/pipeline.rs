// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/pipeline.rs - 检测流程：上传、请求、解析与可视化
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

use thiserror::Error;
use tracing::info;

use crate::{
  client::{
    self, ClientConfig, ClientError, Credential, EnvCredential, ReqwestTransport, Service,
    Transport,
  },
  input::{DEFAULT_CONTENT_TYPE, ImagePayload, dimensions_of},
  model::{DetectResult, unpack},
  output::Draw,
};

const ASSET_DESCRIPTION: &str = "Input Asset";

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("检测服务错误: {0}")]
  Client(#[from] ClientError),
  #[error("图像错误: {0}")]
  Image(#[from] image::ImageError),
}

/// 一次检测调用的完整流程，调用之间不共享可变状态
pub struct GroundingPipeline<T = ReqwestTransport, C = EnvCredential> {
  transport: T,
  config: ClientConfig,
  credential: C,
  draw: Draw<'static>,
}

impl GroundingPipeline {
  /// 默认服务地址、reqwest 传输与环境变量凭据
  pub fn from_env() -> Result<Self, ClientError> {
    Ok(Self::new(
      ReqwestTransport::new()?,
      ClientConfig::default(),
      EnvCredential,
    ))
  }
}

impl<T: Transport, C: Credential> GroundingPipeline<T, C> {
  pub fn new(transport: T, config: ClientConfig, credential: C) -> Self {
    Self {
      transport,
      config,
      credential,
      draw: Draw::default(),
    }
  }

  pub fn config(&self) -> &ClientConfig {
    &self.config
  }

  /// 上传图像并请求检测，返回检测结果与结果图像
  ///
  /// 服务未附带预览图时，在原图上绘制检测框作为结果图像。
  pub fn detect(
    &self,
    image: &[u8],
    prompt: &str,
    content_type: &str,
  ) -> Result<(DetectResult, Vec<u8>), DetectError> {
    let archive = self.fetch(image, prompt, content_type)?;
    let (width, height) = dimensions_of(image)?;
    self.finish(image, &archive, width, height)
  }

  /// 与 [`Self::detect`] 相同，但直接使用载荷中已读取的尺寸
  pub fn detect_payload(
    &self,
    payload: &ImagePayload,
    prompt: &str,
  ) -> Result<(DetectResult, Vec<u8>), DetectError> {
    let archive = self.fetch(&payload.data, prompt, &payload.content_type)?;
    self.finish(&payload.data, &archive, payload.width, payload.height)
  }

  fn fetch(&self, image: &[u8], prompt: &str, content_type: &str) -> Result<Vec<u8>, ClientError> {
    let content_type = if content_type.is_empty() {
      DEFAULT_CONTENT_TYPE
    } else {
      content_type
    };
    let service = Service::new(&self.transport, &self.config, &self.credential);

    let now = std::time::Instant::now();
    let asset_id = client::upload(&service, image, ASSET_DESCRIPTION, content_type)?;
    let archive = client::request(&service, &asset_id, prompt, content_type)?;
    info!("服务响应 {} 字节，耗时: {:.2?}", archive.len(), now.elapsed());
    Ok(archive)
  }

  fn finish(
    &self,
    image: &[u8],
    archive: &[u8],
    width: u32,
    height: u32,
  ) -> Result<(DetectResult, Vec<u8>), DetectError> {
    let unpacked = unpack(archive, width, height);
    info!("检测到 {} 个目标", unpacked.result.len());

    let preview = if unpacked.has_preview() {
      unpacked.image
    } else {
      info!("服务未返回预览图，使用本地绘制结果");
      self.draw.annotate(image, &unpacked.result)?
    };

    Ok((unpacked.result, preview))
  }
}

/// 使用默认配置执行一次检测
pub fn detect(
  image: &[u8],
  prompt: &str,
  content_type: &str,
) -> Result<(DetectResult, Vec<u8>), DetectError> {
  GroundingPipeline::from_env()?.detect(image, prompt, content_type)
}
