// 该文件是 Shanan Grounding （山南西风） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图像检测
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use shanan_grounding::{
  FromUrl, GroundingPipeline,
  client::{ClientConfig, EnvCredential, ReqwestTransport},
  input::ImageFileInput,
  output::{Render, SaveImageFileOutput},
};

/// 单张图像提示词检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像，例如 image:///data/cat.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 检测提示词
  #[arg(long, default_value = "find all objects")]
  pub prompt: String,
  /// 输出路径，例如 image:///data/result.png
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 服务配置，例如 grounding:///?retries=10&delay_ms=500
  #[arg(long, value_name = "SERVICE", default_value = "grounding:///")]
  pub service: Url,
  /// 以 JSON 格式打印检测结果
  #[arg(long)]
  pub json: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("提示词: {}", args.prompt);
  info!("输出路径: {}", args.output);

  let payload = ImageFileInput::from_url(&args.input)?.into_payload();
  info!("图像尺寸: {}x{}", payload.width, payload.height);
  let config = ClientConfig::from_url(&args.service)?;
  let output = SaveImageFileOutput::from_url(&args.output)?;
  let pipeline = GroundingPipeline::new(ReqwestTransport::new()?, config, EnvCredential);

  info!("开始检测...");
  let now = std::time::Instant::now();
  let (result, image) = pipeline.detect_payload(&payload, args.prompt.trim())?;
  info!("检测完成，耗时: {:.2?}", now.elapsed());

  if args.json {
    println!("{}", serde_json::to_string_pretty(&result)?);
  } else {
    for item in &result {
      match item.bbox {
        Some(b) => println!(
          "- {} bbox=[{:.1}, {:.1}, {:.1}, {:.1}]",
          item.caption(),
          b[0],
          b[1],
          b[2],
          b[3]
        ),
        None => println!("- {}", item.caption()),
      }
    }
  }

  output.render_result(&image, &result)?;

  Ok(())
}
