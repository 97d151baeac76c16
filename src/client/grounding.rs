// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/client/grounding.rs - 检测请求提交与状态轮询
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

use std::thread;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::client::{ClientError, HttpRequest, Method, Service};

const STATUS_OK: u16 = 200;
const STATUS_ACCEPTED: u16 = 202;
const REQUEST_ID_HEADER: &str = "NVCF-REQID";

fn payload(service: &Service, asset_id: &str, prompt: &str, content_type: &str) -> serde_json::Value {
  json!({
    "model": service.config.model,
    "messages": [
      {
        "role": "user",
        "content": [
          {"type": "text", "text": prompt},
          {
            "type": "media_url",
            "media_url": {"url": format!("data:{};asset_id,{}", content_type, asset_id)}
          }
        ]
      }
    ],
    "threshold": service.config.threshold,
  })
}

/// 提交检测请求，返回服务的原始结果（通常是压缩包）
///
/// 首次提交返回非成功状态时报错；进入轮询后，超时或异常状态只返回空结果，
/// 网络层错误仍然向上传递。
pub fn request(
  service: &Service,
  asset_id: &str,
  prompt: &str,
  content_type: &str,
) -> Result<Vec<u8>, ClientError> {
  let body = serde_json::to_vec(&payload(service, asset_id, prompt, content_type))
    .map_err(|e| ClientError::Protocol(format!("无法编码检测请求: {}", e)))?;

  let request = HttpRequest::new(
    Method::Post,
    &service.config.invoke_url,
    service.config.request_timeout,
  )
  .header("Content-Type", "application/json")
  .header("NVCF-INPUT-ASSET-REFERENCES", asset_id)
  .header("NVCF-FUNCTION-ASSET-IDS", asset_id)
  .bearer(&service.token)
  .body(body);

  let response = service.transport.execute(request)?;
  info!("检测请求已提交，状态: {}", response.status);

  match response.status {
    STATUS_ACCEPTED => {
      let request_id = response
        .header(REQUEST_ID_HEADER)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ClientError::Protocol(format!("202 响应缺少 {} 头", REQUEST_ID_HEADER)))?;
      poll(service, request_id)
    }
    _ if response.is_success() => Ok(response.body),
    _ => Err(ClientError::remote(&response)),
  }
}

// 轮询结果；超时与异常状态降级为空结果
fn poll(service: &Service, request_id: &str) -> Result<Vec<u8>, ClientError> {
  let url = service.config.poll_url(request_id);
  let mut retries = service.config.max_retries;

  while retries > 0 {
    thread::sleep(service.config.retry_delay);

    let request = HttpRequest::new(Method::Get, &url, service.config.request_timeout)
      .header("accept", "application/json")
      .bearer(&service.token);
    let response = service.transport.execute(request)?;

    match response.status {
      STATUS_OK => {
        info!("请求 {} 已完成", request_id);
        return Ok(response.body);
      }
      STATUS_ACCEPTED => {
        retries -= 1;
        debug!("请求 {} 仍在处理中，剩余重试次数: {}", request_id, retries);
      }
      status => {
        warn!(
          "轮询请求 {} 返回异常状态 {}: {}",
          request_id,
          status,
          response.text()
        );
        return Ok(Vec::new());
      }
    }
  }

  warn!(
    "请求 {} 在 {} 次重试后仍未完成",
    request_id, service.config.max_retries
  );
  Ok(Vec::new())
}
