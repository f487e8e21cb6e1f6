// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复推理基准测试
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

use yolo11_edge::{
  FromUrl,
  args::DetectorArgs,
  detector::Detector,
  input::InputWrapper,
  model::CocoLabel,
  output::OutputWrapper,
  task::{RepeatShotTask, Task},
};

/// 基准测试参数配置，检测参数与单图检测程序一致
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub detector: DetectorArgs,
  /// 重复次数
  #[arg(long, default_value_t = 1000)]
  pub repeat: usize,
  /// 预热次数，不计入平均值
  #[arg(long, default_value_t = 2)]
  pub warmup: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let Args {
    detector: args,
    repeat,
    warmup,
  } = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let config = args.detector_config()?;
  rayon::ThreadPoolBuilder::new()
    .num_threads(config.num_threads())
    .build_global()?;

  let input_image = InputWrapper::from_url(&args.input)?;
  let model: Detector<_, CocoLabel> = Detector::from_url(&args.model, config)?;
  let output = OutputWrapper::from_url(&args.output)?;

  RepeatShotTask::default()
    .with_repeat(repeat)
    .with_warmup(warmup)
    .run_task(input_image, model, output)?;

  Ok(())
}
