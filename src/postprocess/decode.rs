// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/decode.rs - 输出张量解码
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
use tracing::{debug, error};

use crate::model::{Candidate, Rect};

/// 每个锚点的框参数个数 (cx, cy, w, h)
pub const BOX_CHANNELS: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
  #[error("输出形状不匹配: {channels}x{anchors} 需要 {expected} 个元素, 实际为 {actual}")]
  ShapeMismatch {
    channels: usize,
    anchors: usize,
    expected: usize,
    actual: usize,
  },
  #[error("输出通道数 {channels} 不足, 至少需要 {min}")]
  TooFewChannels { channels: usize, min: usize },
  #[error("输出类别数 {actual} 与标签表大小 {expected} 不一致")]
  LabelCountMismatch { expected: usize, actual: usize },
}

/// 经过校验的 `channels x anchors` 通道优先张量视图
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
  data: &'a [f32],
  channels: usize,
  anchors: usize,
}

impl<'a> TensorView<'a> {
  pub fn new(data: &'a [f32], channels: usize, anchors: usize) -> Result<Self, DecodeError> {
    let expected = channels.checked_mul(anchors).unwrap_or(usize::MAX);
    if data.len() != expected {
      error!(
        "输出形状不匹配: {}x{}, 数据长度 {}",
        channels,
        anchors,
        data.len()
      );
      return Err(DecodeError::ShapeMismatch {
        channels,
        anchors,
        expected,
        actual: data.len(),
      });
    }
    if channels <= BOX_CHANNELS {
      return Err(DecodeError::TooFewChannels {
        channels,
        min: BOX_CHANNELS + 1,
      });
    }
    Ok(Self {
      data,
      channels,
      anchors,
    })
  }

  pub fn channels(&self) -> usize {
    self.channels
  }

  pub fn anchors(&self) -> usize {
    self.anchors
  }

  pub fn num_labels(&self) -> usize {
    self.channels - BOX_CHANNELS
  }

  /// 要求类别通道数与标签表一致
  pub fn expect_labels(self, num_labels: usize) -> Result<Self, DecodeError> {
    if self.num_labels() != num_labels {
      error!(
        "类别数不一致: 模型输出 {}, 标签表 {}",
        self.num_labels(),
        num_labels
      );
      return Err(DecodeError::LabelCountMismatch {
        expected: num_labels,
        actual: self.num_labels(),
      });
    }
    Ok(self)
  }

  /// 越界时返回 `None`
  pub fn get(&self, channel: usize, anchor: usize) -> Option<f32> {
    if channel >= self.channels || anchor >= self.anchors {
      return None;
    }
    Some(self.value(channel, anchor))
  }

  // 调用方保证下标位于视图范围内
  fn value(&self, channel: usize, anchor: usize) -> f32 {
    self.data[channel * self.anchors + anchor]
  }

  /// 锚点的最高类别分数及其下标，分数相同时取下标最小者
  fn best_class(&self, anchor: usize) -> (usize, f32) {
    let mut label = 0;
    let mut score = self.value(BOX_CHANNELS, anchor);
    for c in 1..self.num_labels() {
      let s = self.value(BOX_CHANNELS + c, anchor);
      if s > score {
        score = s;
        label = c;
      }
    }
    (label, score)
  }
}

/// 将张量按锚点解码为候选框
///
/// 分数直接使用，不做 sigmoid/softmax；框坐标裁剪到 `[0, padded_w] x [0, padded_h]`。
pub fn decode(
  view: &TensorView<'_>,
  conf_threshold: f32,
  padded_width: f32,
  padded_height: f32,
) -> Vec<Candidate> {
  let mut candidates = Vec::new();

  for anchor in 0..view.anchors() {
    let (label, prob) = view.best_class(anchor);
    if !(prob > conf_threshold) {
      continue;
    }

    let cx = view.value(0, anchor);
    let cy = view.value(1, anchor);
    let w = view.value(2, anchor);
    let h = view.value(3, anchor);

    let x0 = (cx - 0.5 * w).clamp(0.0, padded_width);
    let y0 = (cy - 0.5 * h).clamp(0.0, padded_height);
    let x1 = (cx + 0.5 * w).clamp(0.0, padded_width);
    let y1 = (cy + 0.5 * h).clamp(0.0, padded_height);

    candidates.push(Candidate {
      rect: Rect::from_corners(x0, y0, x1, y1),
      label,
      prob,
    });
  }

  debug!(
    "解码 {} 个锚点, 得到 {} 个候选框",
    view.anchors(),
    candidates.len()
  );
  candidates
}
