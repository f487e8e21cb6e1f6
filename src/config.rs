// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 检测器配置
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

use std::fmt;

use thiserror::Error;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.45;
pub const DEFAULT_TARGET_INPUT_SIZE: u32 = 480;
pub const DEFAULT_STRIDE_MULTIPLE: u32 = 32;
pub const DEFAULT_NUM_THREADS: usize = 4;

/// YOLO11 三个检测头的下采样步长
pub const HEAD_STRIDES: [u32; 3] = [8, 16, 32];

/// 推理数值精度
///
/// INT8 推理与 FP16 运算互斥。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
  #[default]
  Fp16,
  Int8,
}

impl Precision {
  pub fn from_int8_flag(use_int8: bool) -> Self {
    if use_int8 {
      Precision::Int8
    } else {
      Precision::Fp16
    }
  }

  pub fn is_int8(&self) -> bool {
    matches!(self, Precision::Int8)
  }
}

impl fmt::Display for Precision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Precision::Fp16 => write!(f, "FP16"),
      Precision::Int8 => write!(f, "INT8"),
    }
  }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("置信度阈值必须位于 [0, 1] 区间, 实际为 {0}")]
  ConfidenceOutOfRange(f32),
  #[error("NMS 阈值必须位于 [0, 1] 区间, 实际为 {0}")]
  NmsOutOfRange(f32),
  #[error("模型输入尺寸不能为 0")]
  ZeroTargetSize,
  #[error("步长倍数不能为 0")]
  ZeroStride,
  #[error("线程数不能为 0")]
  ZeroThreads,
}

/// 检测器配置
///
/// 构造后不可修改，在创建检测器时一次性传入。
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
  use_gpu_backend: bool,
  precision: Precision,
  confidence_threshold: f32,
  nms_threshold: f32,
  class_agnostic: bool,
  target_input_size: u32,
  stride_multiple: u32,
  num_threads: usize,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      use_gpu_backend: true,
      precision: Precision::Fp16,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      nms_threshold: DEFAULT_NMS_THRESHOLD,
      class_agnostic: false,
      target_input_size: DEFAULT_TARGET_INPUT_SIZE,
      stride_multiple: DEFAULT_STRIDE_MULTIPLE,
      num_threads: DEFAULT_NUM_THREADS,
    }
  }
}

impl DetectorConfig {
  pub fn builder() -> DetectorConfigBuilder {
    DetectorConfigBuilder::default()
  }

  pub fn use_gpu_backend(&self) -> bool {
    self.use_gpu_backend
  }

  pub fn precision(&self) -> Precision {
    self.precision
  }

  pub fn confidence_threshold(&self) -> f32 {
    self.confidence_threshold
  }

  pub fn nms_threshold(&self) -> f32 {
    self.nms_threshold
  }

  pub fn class_agnostic(&self) -> bool {
    self.class_agnostic
  }

  pub fn target_input_size(&self) -> u32 {
    self.target_input_size
  }

  pub fn stride_multiple(&self) -> u32 {
    self.stride_multiple
  }

  pub fn num_threads(&self) -> usize {
    self.num_threads
  }

  /// 对齐到步长倍数后的模型输入边长
  pub fn padded_input_size(&self) -> u32 {
    self.target_input_size.div_ceil(self.stride_multiple) * self.stride_multiple
  }

  /// 填充后输入对应的锚点数，即各检测头特征图的格点数之和
  pub fn anchor_count(&self) -> usize {
    let side = self.padded_input_size();
    HEAD_STRIDES
      .iter()
      .map(|stride| {
        let cells = side.div_ceil(*stride) as usize;
        cells * cells
      })
      .sum()
  }
}

#[derive(Debug, Clone, Default)]
pub struct DetectorConfigBuilder {
  config: DetectorConfig,
}

impl DetectorConfigBuilder {
  pub fn use_gpu_backend(mut self, use_gpu_backend: bool) -> Self {
    self.config.use_gpu_backend = use_gpu_backend;
    self
  }

  pub fn use_int8(mut self, use_int8: bool) -> Self {
    self.config.precision = Precision::from_int8_flag(use_int8);
    self
  }

  pub fn precision(mut self, precision: Precision) -> Self {
    self.config.precision = precision;
    self
  }

  pub fn confidence_threshold(mut self, threshold: f32) -> Self {
    self.config.confidence_threshold = threshold;
    self
  }

  pub fn nms_threshold(mut self, threshold: f32) -> Self {
    self.config.nms_threshold = threshold;
    self
  }

  pub fn class_agnostic(mut self, class_agnostic: bool) -> Self {
    self.config.class_agnostic = class_agnostic;
    self
  }

  pub fn target_input_size(mut self, size: u32) -> Self {
    self.config.target_input_size = size;
    self
  }

  pub fn stride_multiple(mut self, stride: u32) -> Self {
    self.config.stride_multiple = stride;
    self
  }

  pub fn num_threads(mut self, num_threads: usize) -> Self {
    self.config.num_threads = num_threads;
    self
  }

  pub fn build(self) -> Result<DetectorConfig, ConfigError> {
    let config = self.config;
    // NaN 同样不落在区间内
    if !(0.0..=1.0).contains(&config.confidence_threshold) {
      return Err(ConfigError::ConfidenceOutOfRange(
        config.confidence_threshold,
      ));
    }
    if !(0.0..=1.0).contains(&config.nms_threshold) {
      return Err(ConfigError::NmsOutOfRange(config.nms_threshold));
    }
    if config.target_input_size == 0 {
      return Err(ConfigError::ZeroTargetSize);
    }
    if config.stride_multiple == 0 {
      return Err(ConfigError::ZeroStride);
    }
    if config.num_threads == 0 {
      return Err(ConfigError::ZeroThreads);
    }
    Ok(config)
  }
}
