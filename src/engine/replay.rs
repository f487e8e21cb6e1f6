// 该文件是 Shanan （山南西风） 项目的一部分。
// src/engine/replay.rs - 输出张量回放后端
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

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  engine::{Engine, OutputTensor},
  preprocess::InputTensor,
};

#[derive(Error, Debug)]
pub enum ReplayEngineError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("张量文件不存在: {0}")]
  MissingFile(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("张量文件格式错误: {0}")]
  FormatError(#[from] serde_json::Error),
}

/// 张量转储文件格式
#[derive(Debug, Serialize, Deserialize)]
pub struct TensorDump {
  /// `[channels, anchors]`
  pub shape: [usize; 2],
  pub data: Vec<f32>,
}

impl From<TensorDump> for OutputTensor {
  fn from(dump: TensorDump) -> Self {
    OutputTensor::new(dump.shape[0], dump.shape[1], dump.data)
  }
}

impl From<&OutputTensor> for TensorDump {
  fn from(tensor: &OutputTensor) -> Self {
    TensorDump {
      shape: [tensor.channels, tensor.anchors],
      data: tensor.data.clone(),
    }
  }
}

/// 每次推理都返回同一份预先录制的输出张量，用于离线后处理调试
pub struct ReplayEngine {
  output: OutputTensor,
}

impl FromUrlWithScheme for ReplayEngine {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayEngine {
  type Error = ReplayEngineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ReplayEngineError::SchemeMismatch(url.scheme().to_string()));
    }
    Self::from_file(url.path())
  }
}

impl ReplayEngine {
  pub fn new(output: OutputTensor) -> Self {
    Self { output }
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReplayEngineError> {
    let path = path.as_ref();
    if !path.is_file() {
      return Err(ReplayEngineError::MissingFile(path.display().to_string()));
    }
    info!("加载张量文件: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let dump: TensorDump = serde_json::from_str(&content)?;
    debug!(
      "张量形状: channels={}, anchors={}, 数据长度={}",
      dump.shape[0],
      dump.shape[1],
      dump.data.len()
    );
    Ok(Self::new(dump.into()))
  }
}

impl Engine for ReplayEngine {
  type Error = ReplayEngineError;

  fn run(&mut self, input: &InputTensor) -> Result<OutputTensor, Self::Error> {
    debug!(
      "回放输出张量, 输入尺寸 {}x{}",
      input.padded_width(),
      input.padded_height()
    );
    Ok(self.output.clone())
  }
}
