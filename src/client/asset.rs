// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/client/asset.rs - 图像资源上传
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

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::{ClientError, HttpRequest, Method, Service};

const DESCRIPTION_HEADER: &str = "x-amz-meta-nvcf-asset-description";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssetRequest<'a> {
  content_type: &'a str,
  description: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetResponse {
  upload_url: Option<String>,
  asset_id: Option<String>,
}

fn negotiate(
  service: &Service,
  description: &str,
  content_type: &str,
) -> Result<(String, String), ClientError> {
  let payload = serde_json::to_vec(&AssetRequest {
    content_type,
    description,
  })
  .map_err(|e| ClientError::Protocol(format!("无法编码资源请求: {}", e)))?;

  let request = HttpRequest::new(
    Method::Post,
    &service.config.assets_url,
    service.config.negotiate_timeout,
  )
  .header("Content-Type", "application/json")
  .header("accept", "application/json")
  .bearer(&service.token)
  .body(payload);

  let response = service.transport.execute(request)?;
  if !response.is_success() {
    return Err(ClientError::remote(&response));
  }

  let meta: AssetResponse = serde_json::from_slice(&response.body)
    .map_err(|e| ClientError::Protocol(format!("资源响应不是有效的 JSON: {}", e)))?;
  let upload_url = meta
    .upload_url
    .filter(|url| !url.is_empty())
    .ok_or_else(|| ClientError::Protocol("资源响应缺少 uploadUrl".to_string()))?;
  let asset_id = meta
    .asset_id
    .ok_or_else(|| ClientError::Protocol("资源响应缺少 assetId".to_string()))?;
  let asset_id = Uuid::parse_str(asset_id.trim())
    .map_err(|e| ClientError::Protocol(format!("assetId 不是有效的 UUID ({}): {}", asset_id, e)))?;

  Ok((upload_url, asset_id.to_string()))
}

/// 上传图像到服务端资源存储，返回规范格式的资源 ID
pub fn upload(
  service: &Service,
  data: &[u8],
  description: &str,
  content_type: &str,
) -> Result<String, ClientError> {
  let (upload_url, asset_id) = negotiate(service, description, content_type)?;
  debug!("资源 {} 的上传地址已分配", asset_id);

  // 预签名地址，不携带凭据
  let request = HttpRequest::new(Method::Put, upload_url, service.config.upload_timeout)
    .header(DESCRIPTION_HEADER, description)
    .header("content-type", content_type)
    .body(data.to_vec());

  let response = service.transport.execute(request)?;
  if !response.is_success() {
    return Err(ClientError::remote(&response));
  }

  info!("资源上传完成: {} ({} 字节)", asset_id, data.len());
  Ok(asset_id)
}
