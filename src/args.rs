// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 命令行参数
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::Args;
use url::Url;

use crate::config::{
  ConfigError, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_NMS_THRESHOLD, DEFAULT_NUM_THREADS,
  DetectorConfig,
};

/// 各个可执行程序共用的检测参数，通过 `#[command(flatten)]` 嵌入
#[derive(Args, Debug, Clone)]
pub struct DetectorArgs {
  /// 模型 URI
  /// 支持格式:
  /// - rknn:///path/to/yolo11.rknn (需启用 backend_rknpu 特性)
  /// - replay:///path/to/output.json (回放录制的输出张量)
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入图像，例如 image:///path/to/input.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径
  /// 支持格式:
  /// - image:///path/to/output.jpg[?font=/path/to/font.ttf]
  /// - json:///path/to/record.json
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 使用 INT8 推理 (与 FP16 运算互斥)
  #[arg(long)]
  pub int8: bool,

  /// 禁用 GPU 后端
  #[arg(long)]
  pub cpu: bool,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_NMS_THRESHOLD, value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 不区分类别执行 NMS
  #[arg(long)]
  pub agnostic: bool,

  /// 后处理排序线程数
  #[arg(long, default_value_t = DEFAULT_NUM_THREADS)]
  pub threads: usize,
}

impl DetectorArgs {
  pub fn detector_config(&self) -> Result<DetectorConfig, ConfigError> {
    DetectorConfig::builder()
      .use_int8(self.int8)
      .use_gpu_backend(!self.cpu)
      .confidence_threshold(self.confidence)
      .nms_threshold(self.nms_threshold)
      .class_agnostic(self.agnostic)
      .num_threads(self.threads)
      .build()
  }
}
