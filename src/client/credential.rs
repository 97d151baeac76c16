// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/client/credential.rs - API 凭据
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

use tracing::debug;

const ENV_KEYS: &[&str] = &[
  "NVIDIA_API_KEY",
  "API_KEY",
  "NVIDIA_PERSONAL_API_KEY",
  "NGC_PERSONAL_API_KEY",
];

/// 凭据来源，空字符串表示不发送 `Authorization` 头
pub trait Credential {
  fn token(&self) -> String;
}

/// 从环境变量读取凭据
#[derive(Debug, Clone, Default)]
pub struct EnvCredential;

impl Credential for EnvCredential {
  fn token(&self) -> String {
    first_token(|key| std::env::var(key).ok())
  }
}

// 按 ENV_KEYS 顺序取第一个非空值，找不到时为空字符串
fn first_token(lookup: impl Fn(&str) -> Option<String>) -> String {
  let found = ENV_KEYS
    .iter()
    .find_map(|key| lookup(key).filter(|v| !v.is_empty()).map(|v| (*key, v)));
  match found {
    Some((key, token)) => {
      debug!("使用环境变量 {} 中的凭据", key);
      token
    }
    None => {
      debug!("未找到 API 凭据");
      String::new()
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct StaticCredential(pub String);

impl Credential for StaticCredential {
  fn token(&self) -> String {
    self.0.clone()
  }
}

impl From<&str> for StaticCredential {
  fn from(token: &str) -> Self {
    StaticCredential(token.to_string())
  }
}
