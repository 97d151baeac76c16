// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/client/config.rs - 服务端点与超时配置
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

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

const INVOKE_URL: &str = "https://ai.api.nvidia.com/v1/cv/nvidia/nv-grounding-dino";
const STATUS_URL: &str = "https://api.nvcf.nvidia.com/v2/nvcf/pexec/status/";
const ASSETS_URL: &str = "https://api.nvcf.nvidia.com/v2/nvcf/assets";
const MODEL_NAME: &str = "Grounding-Dino";
const THRESHOLD: f32 = 0.3;
const MAX_RETRIES: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_secs(1);
const NEGOTIATE_TIMEOUT: Duration = Duration::from_secs(60);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: &'static str, found: String },
  #[error("配置项 {key} 的值无效: {value}")]
  InvalidValue { key: String, value: String },
  #[error("未知配置项: {0}")]
  UnknownKey(String),
}

/// 检测服务客户端配置
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
  pub invoke_url: String,
  /// 轮询地址前缀，请求 ID 直接拼接在后面
  pub status_url: String,
  pub assets_url: String,
  pub model: String,
  pub threshold: f32,
  pub max_retries: u32,
  pub retry_delay: Duration,
  pub negotiate_timeout: Duration,
  pub upload_timeout: Duration,
  pub request_timeout: Duration,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      invoke_url: INVOKE_URL.to_string(),
      status_url: STATUS_URL.to_string(),
      assets_url: ASSETS_URL.to_string(),
      model: MODEL_NAME.to_string(),
      threshold: THRESHOLD,
      max_retries: MAX_RETRIES,
      retry_delay: RETRY_DELAY,
      negotiate_timeout: NEGOTIATE_TIMEOUT,
      upload_timeout: UPLOAD_TIMEOUT,
      request_timeout: REQUEST_TIMEOUT,
    }
  }
}

impl ClientConfig {
  pub fn with_retries(mut self, max_retries: u32) -> Self {
    self.max_retries = max_retries;
    self
  }

  pub fn with_retry_delay(mut self, delay: Duration) -> Self {
    self.retry_delay = delay;
    self
  }

  pub fn with_threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn with_endpoints(
    mut self,
    invoke_url: impl Into<String>,
    status_url: impl Into<String>,
    assets_url: impl Into<String>,
  ) -> Self {
    self.invoke_url = invoke_url.into();
    self.status_url = status_url.into();
    self.assets_url = assets_url.into();
    self
  }

  pub fn poll_url(&self, request_id: &str) -> String {
    format!("{}{}", self.status_url, request_id)
  }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
  value.parse().map_err(|_| ConfigError::InvalidValue {
    key: key.to_string(),
    value: value.to_string(),
  })
}

impl FromUrlWithScheme for ClientConfig {
  const SCHEME: &'static str = "grounding";
}

impl FromUrl for ClientConfig {
  type Error = ConfigError;

  /// 例如 `grounding:///?retries=10&delay_ms=500&threshold=0.25`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ConfigError::SchemeMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }

    let mut config = ClientConfig::default();
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "retries" => config.max_retries = parse_value(&key, &value)?,
        "delay_ms" => config.retry_delay = Duration::from_millis(parse_value(&key, &value)?),
        "threshold" => config.threshold = parse_value(&key, &value)?,
        "model" => config.model = value.into_owned(),
        "invoke" => config.invoke_url = value.into_owned(),
        "status" => config.status_url = value.into_owned(),
        "assets" => config.assets_url = value.into_owned(),
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
      }
    }
    Ok(config)
  }
}
