// 该文件是 Shanan （山南西风） 项目的一部分。
// src/engine.rs - 推理后端接口
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, config::DetectorConfig, preprocess::InputTensor};

/// 模型原始输出，按 `channels x anchors` 通道优先排布
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
  pub channels: usize,
  pub anchors: usize,
  pub data: Vec<f32>,
}

impl OutputTensor {
  pub fn new(channels: usize, anchors: usize, data: Vec<f32>) -> Self {
    Self {
      channels,
      anchors,
      data,
    }
  }

  /// 由扁平输出和已知锚点数推出通道数
  ///
  /// 长度不能被锚点数整除时通道数向上取整，交给解码阶段报告形状错误。
  pub fn from_flat(anchors: usize, data: Vec<f32>) -> Self {
    let channels = data.len().div_ceil(anchors.max(1));
    Self::new(channels, anchors, data)
  }
}

/// 推理后端
///
/// 会话在后端构造时创建并由调用方独占持有；`run` 需要 `&mut self`，
/// 同一时刻只允许一次推理。
pub trait Engine {
  type Error: std::error::Error + Send + Sync + 'static;

  fn run(&mut self, input: &InputTensor) -> Result<OutputTensor, Self::Error>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
  type Error = E::Error;

  fn run(&mut self, input: &InputTensor) -> Result<OutputTensor, Self::Error> {
    (**self).run(input)
  }
}

mod replay;
pub use self::replay::{ReplayEngine, ReplayEngineError};

#[cfg(feature = "backend_rknpu")]
mod rknpu_engine;
#[cfg(feature = "backend_rknpu")]
pub use self::rknpu_engine::{RknpuEngine, RknpuEngineBuilder, RknpuEngineError};

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("回放后端错误: {0}")]
  Replay(#[from] ReplayEngineError),
  #[cfg(feature = "backend_rknpu")]
  #[error("RKNPU 后端错误: {0}")]
  Rknpu(#[from] RknpuEngineError),
  #[error("不支持的模型 URI 方案: {0}")]
  SchemeMismatch(String),
}

/// 按 URI 方案选择的推理后端
pub enum EngineWrapper {
  Replay(ReplayEngine),
  #[cfg(feature = "backend_rknpu")]
  Rknpu(RknpuEngine),
}

impl EngineWrapper {
  pub fn from_url(url: &Url, config: &DetectorConfig) -> Result<Self, EngineError> {
    use crate::FromUrlWithScheme;

    if url.scheme() == ReplayEngine::SCHEME {
      return Ok(EngineWrapper::Replay(ReplayEngine::from_url(url)?));
    }
    #[cfg(feature = "backend_rknpu")]
    {
      if url.scheme() == RknpuEngineBuilder::SCHEME {
        let engine = RknpuEngineBuilder::from_url(url)?.build(config)?;
        return Ok(EngineWrapper::Rknpu(engine));
      }
    }
    #[cfg(not(feature = "backend_rknpu"))]
    let _ = config;
    Err(EngineError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl Engine for EngineWrapper {
  type Error = EngineError;

  fn run(&mut self, input: &InputTensor) -> Result<OutputTensor, Self::Error> {
    match self {
      EngineWrapper::Replay(engine) => engine.run(input).map_err(EngineError::from),
      #[cfg(feature = "backend_rknpu")]
      EngineWrapper::Rknpu(engine) => engine.run(input).map_err(EngineError::from),
    }
  }
}
