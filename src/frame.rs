// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 模型输入帧与张量定义
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

use image::RgbImage;
use thiserror::Error;

pub const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
pub struct FrameSizeError {
  pub expected: usize,
  pub actual: usize,
}

pub trait AsNhwcFrame {
  fn as_nhwc(&self) -> &[u8];
}

pub trait AsNchwTensor {
  fn as_nchw(&self) -> &[f32];
}

/// NHWC 排布的 RGB 字节帧
#[derive(Debug, Clone)]
pub struct RgbNhwcFrame {
  width: usize,
  height: usize,
  data: Box<[u8]>,
}

impl RgbNhwcFrame {
  pub fn from_raw(height: usize, width: usize, data: Vec<u8>) -> Result<Self, FrameSizeError> {
    let expected = RGB_CHANNELS * width * height;
    if data.len() != expected {
      return Err(FrameSizeError {
        expected,
        actual: data.len(),
      });
    }
    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
    })
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// 逐像素除以 `divisor`，转换为 NCHW 排布的浮点张量
  pub fn to_nchw_normalized(&self, divisor: f32) -> NchwTensor {
    let plane = self.width * self.height;
    let mut data = vec![0.0f32; RGB_CHANNELS * plane];
    for (idx, pixel) in self.data.chunks_exact(RGB_CHANNELS).enumerate() {
      for (c, value) in pixel.iter().enumerate() {
        data[c * plane + idx] = *value as f32 / divisor;
      }
    }
    NchwTensor {
      channels: RGB_CHANNELS,
      height: self.height,
      width: self.width,
      data: data.into_boxed_slice(),
    }
  }
}

impl From<RgbImage> for RgbNhwcFrame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      width: width as usize,
      height: height as usize,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

impl AsNhwcFrame for RgbNhwcFrame {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}

/// NCHW 排布的浮点张量
#[derive(Debug, Clone)]
pub struct NchwTensor {
  channels: usize,
  height: usize,
  width: usize,
  data: Box<[f32]>,
}

impl NchwTensor {
  pub fn channels(&self) -> usize {
    self.channels
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn get(&self, c: usize, y: usize, x: usize) -> Option<f32> {
    if c >= self.channels || y >= self.height || x >= self.width {
      return None;
    }
    Some(self.data[c * self.height * self.width + y * self.width + x])
  }
}

impl AsNchwTensor for NchwTensor {
  fn as_nchw(&self) -> &[f32] {
    &self.data
  }
}
