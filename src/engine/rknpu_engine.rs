// 该文件是 Shanan （山南西风） 项目的一部分。
// src/engine/rknpu_engine.rs - RKNPU 推理后端
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  config::DetectorConfig,
  engine::{Engine, OutputTensor},
  frame::AsNhwcFrame,
  preprocess::InputTensor,
};

const RKNPU_NUM_INPUTS: u32 = 1;
const RKNPU_NUM_OUTPUTS: u32 = 1;

#[derive(Error, Debug)]
pub enum RknpuEngineError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型文件不存在: {0}")]
  ModelMissing(String),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(rknpu::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl From<std::io::Error> for RknpuEngineError {
  fn from(err: std::io::Error) -> Self {
    RknpuEngineError::ModelLoadError(err)
  }
}

impl From<rknpu::Error> for RknpuEngineError {
  fn from(err: rknpu::Error) -> Self {
    RknpuEngineError::RknnError(err)
  }
}

impl RknpuEngineError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    RknpuEngineError::ModelInvalid(msg.to_string(), e)
  }
}

pub struct RknpuEngineBuilder {
  model_path: String,
  flags: InitFlags,
}

impl FromUrlWithScheme for RknpuEngineBuilder {
  const SCHEME: &'static str = "rknn";
}

impl FromUrl for RknpuEngineBuilder {
  type Error = RknpuEngineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RknpuEngineError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(RknpuEngineBuilder {
      model_path: url.path().to_string(),
      flags: InitFlags::default(),
    })
  }
}

impl RknpuEngineBuilder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn build(self, config: &DetectorConfig) -> Result<RknpuEngine, RknpuEngineError> {
    if !Path::new(&self.model_path).is_file() {
      error!("模型文件不存在: {}", self.model_path);
      return Err(RknpuEngineError::ModelMissing(self.model_path));
    }

    // RKNN 模型的量化方式在转换阶段确定，运行时只做记录
    if config.precision().is_int8() {
      info!("期望 INT8 量化模型, 校准预处理须与当前预处理一致");
    }
    if !config.use_gpu_backend() {
      warn!("RKNPU 后端总是使用 NPU 执行, 忽略 CPU 后端选项");
    }

    info!("加载模型文件: {}", self.model_path);
    let mode_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      mode_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&mode_data, self.flags)?;

    match context.sdk_version() {
      Ok(version) => {
        if let Ok(api_ver) = version.api_version() {
          debug!("模型 API 版本: {}", api_ver);
        }
        if let Ok(drv_ver) = version.driver_version() {
          debug!("模型驱动版本: {}", drv_ver);
        }
      }
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(RknpuEngineError::invalid("无法查询 SDK 版本", e));
      }
    }

    let num_inputs = context
      .num_inputs()
      .map_err(|e| RknpuEngineError::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| RknpuEngineError::invalid("无法获取输出数量", e))?;

    if num_inputs != RKNPU_NUM_INPUTS || num_outputs != RKNPU_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        RKNPU_NUM_INPUTS, RKNPU_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(RknpuEngineError::invalid(&msg, rknpu::Error::InvalidModel));
    }

    info!("模型加载完成");
    let anchors = config.anchor_count();
    debug!("输入边长 {}, 锚点数 {}", config.padded_input_size(), anchors);
    Ok(RknpuEngine { context, anchors })
  }
}

pub struct RknpuEngine {
  context: Context,
  anchors: usize,
}

impl Engine for RknpuEngine {
  type Error = RknpuEngineError;

  fn run(&mut self, input: &InputTensor) -> Result<OutputTensor, Self::Error> {
    debug!("设置模型输入");
    self.context.set_input(
      0,
      input.frame.as_nhwc(),
      TensorFormat::NHWC,
      TensorType::UInt8,
    )?;

    debug!("执行模型推理");
    self.context.run()?;

    debug!("获取模型输出");
    let output = self.context.get_outputs()?;
    let data = output.get_f32(0)?.to_vec();

    // 锚点数由输入尺寸决定，通道数取自模型的实际输出长度
    Ok(OutputTensor::from_flat(self.anchors, data))
  }
}
