// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/client.rs - 远程检测服务客户端
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
use tracing::debug;

pub mod asset;
pub mod config;
pub mod credential;
pub mod grounding;

pub use self::asset::upload;
pub use self::config::{ClientConfig, ConfigError};
pub use self::credential::{Credential, EnvCredential, StaticCredential};
pub use self::grounding::request;

#[derive(Error, Debug)]
pub enum TransportError {
  #[error("HTTP 请求错误: {0}")]
  Http(#[from] reqwest::Error),
  #[error("传输错误: {0}")]
  Other(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
  #[error("服务返回错误状态 {status}: {body}")]
  Remote { status: u16, body: String },
  #[error("服务响应不符合约定: {0}")]
  Protocol(String),
  #[error("{0}")]
  Transport(#[from] TransportError),
}

impl ClientError {
  pub fn remote(response: &HttpResponse) -> Self {
    ClientError::Remote {
      status: response.status,
      body: response.text(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Put,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
  pub method: Method,
  pub url: String,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub timeout: Duration,
}

impl HttpRequest {
  pub fn new(method: Method, url: impl Into<String>, timeout: Duration) -> Self {
    Self {
      method,
      url: url.into(),
      headers: Vec::new(),
      body: Vec::new(),
      timeout,
    }
  }

  pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  /// 仅在凭据非空时附加 `Authorization: Bearer` 头
  pub fn bearer(self, token: &str) -> Self {
    if token.is_empty() {
      self
    } else {
      self.header("Authorization", format!("Bearer {}", token))
    }
  }

  pub fn body(mut self, body: Vec<u8>) -> Self {
    self.body = body;
    self
  }

  pub fn header_value(&self, name: &str) -> Option<&str> {
    find_header(&self.headers, name)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl HttpResponse {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers: Vec::new(),
      body: body.into(),
    }
  }

  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// 响应头查找，不区分大小写
  pub fn header(&self, name: &str) -> Option<&str> {
    find_header(&self.headers, name)
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
  headers
    .iter()
    .find(|(k, _)| k.eq_ignore_ascii_case(name))
    .map(|(_, v)| v.as_str())
}

/// 一次检测调用所用的服务上下文
pub struct Service<'a> {
  pub transport: &'a dyn Transport,
  pub config: &'a ClientConfig,
  /// 为空时不附加 `Authorization` 头
  pub token: String,
}

impl<'a> Service<'a> {
  pub fn new(transport: &'a dyn Transport, config: &'a ClientConfig, credential: &dyn Credential) -> Self {
    Self {
      transport,
      config,
      token: credential.token(),
    }
  }
}

/// 同步 HTTP 传输能力，每个请求自带超时
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
  fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// 基于 reqwest 阻塞客户端的传输实现
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
  client: reqwest::blocking::Client,
}

impl ReqwestTransport {
  pub fn new() -> Result<Self, TransportError> {
    let client = reqwest::blocking::Client::builder().build()?;
    Ok(Self { client })
  }
}

impl Transport for ReqwestTransport {
  fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    let method = match request.method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
    };
    debug!("{} {}", method, request.url);

    let mut builder = self
      .client
      .request(method, &request.url)
      .timeout(request.timeout);
    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }
    if !request.body.is_empty() {
      builder = builder.body(request.body);
    }

    let response = builder.send()?;
    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();
    let body = response.bytes()?.to_vec();

    Ok(HttpResponse {
      status,
      headers,
      body,
    })
  }
}
