// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 单图检测主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

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
  task::{OneShotTask, Task},
};

/// YOLO11 单图检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  #[command(flatten)]
  detector: DetectorArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse().detector;

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let config = args.detector_config()?;
  rayon::ThreadPoolBuilder::new()
    .num_threads(config.num_threads())
    .build_global()?;

  let input = InputWrapper::from_url(&args.input)?;
  let model: Detector<_, CocoLabel> = Detector::from_url(&args.model, config)?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(input, model, output)?;

  Ok(())
}
