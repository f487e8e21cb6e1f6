// 该文件是 Shanan （山南西风） 项目的一部分。
// src/preprocess.rs - Letterbox 预处理
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

use image::{Rgb, RgbImage, imageops};
use thiserror::Error;
use tracing::debug;

use crate::{
  config::DetectorConfig,
  frame::{NchwTensor, RgbNhwcFrame},
};

/// 填充区域的灰度值
pub const PAD_VALUE: u8 = 114;
/// 像素归一化除数
pub const NORM_DIVISOR: f32 = 255.0;
/// INT8 量化表必须使用与此完全一致的预处理流程生成
pub const CALIBRATION_RECIPE: &str =
  "pixel=RGB mean=0,0,0 norm=1/255,1/255,1/255 shape=[480,480,3] pad=114 resize=bilinear";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PreprocessError {
  #[error("输入图像为空: {width}x{height}")]
  EmptyImage { width: u32, height: u32 },
}

/// Letterbox 变换参数
///
/// 对同一次推理，正向 (预处理) 与逆向 (坐标还原) 必须使用同一个值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub scale: f32,
  pub pad_x: f32,
  pub pad_y: f32,
  pub resized_width: u32,
  pub resized_height: u32,
  pub padded_width: u32,
  pub padded_height: u32,
  pub original_width: u32,
  pub original_height: u32,
}

impl Letterbox {
  pub fn compute(
    width: u32,
    height: u32,
    target_size: u32,
    stride: u32,
  ) -> Result<Self, PreprocessError> {
    if width == 0 || height == 0 {
      return Err(PreprocessError::EmptyImage { width, height });
    }

    let target = target_size as f32;
    let scale = (target / width as f32).min(target / height as f32);
    let mut resized_width = (width as f32 * scale).round() as u32;
    let mut resized_height = (height as f32 * scale).round() as u32;
    if width > height {
      resized_width = target_size;
    } else {
      resized_height = target_size;
    }
    // 极端长宽比下短边可能被舍入为 0
    resized_width = resized_width.max(1);
    resized_height = resized_height.max(1);

    let padded = target_size.div_ceil(stride) * stride;
    let pad_w = padded - resized_width;
    let pad_h = padded - resized_height;

    Ok(Self {
      scale,
      pad_x: (pad_w / 2) as f32,
      pad_y: (pad_h / 2) as f32,
      resized_width,
      resized_height,
      padded_width: padded,
      padded_height: padded,
      original_width: width,
      original_height: height,
    })
  }

  /// 原图坐标 -> 模型输入坐标
  pub fn forward(&self, x: f32, y: f32) -> (f32, f32) {
    (x * self.scale + self.pad_x, y * self.scale + self.pad_y)
  }

  /// 模型输入坐标 -> 原图坐标，未裁剪
  pub fn inverse(&self, x: f32, y: f32) -> (f32, f32) {
    ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
  }
}

/// 预处理结果，作为推理后端的输入
#[derive(Debug, Clone)]
pub struct InputTensor {
  pub letterbox: Letterbox,
  /// 填充后的 RGB 帧，供接受 UINT8 输入的后端使用
  pub frame: RgbNhwcFrame,
}

impl InputTensor {
  pub fn padded_width(&self) -> u32 {
    self.letterbox.padded_width
  }

  pub fn padded_height(&self) -> u32 {
    self.letterbox.padded_height
  }

  /// 归一化后的 NCHW 浮点张量，供接受 FP32 输入的后端按需生成
  pub fn to_nchw(&self) -> NchwTensor {
    self.frame.to_nchw_normalized(NORM_DIVISOR)
  }
}

pub fn letterbox_image(
  image: &RgbImage,
  target_size: u32,
  stride: u32,
) -> Result<InputTensor, PreprocessError> {
  let (width, height) = image.dimensions();
  let letterbox = Letterbox::compute(width, height, target_size, stride)?;
  debug!(
    "Letterbox: {}x{} -> {}x{}, scale={:.4}, pad=({}, {})",
    width,
    height,
    letterbox.resized_width,
    letterbox.resized_height,
    letterbox.scale,
    letterbox.pad_x,
    letterbox.pad_y
  );

  let resized = imageops::resize(
    image,
    letterbox.resized_width,
    letterbox.resized_height,
    imageops::FilterType::Triangle,
  );

  let mut padded = RgbImage::from_pixel(
    letterbox.padded_width,
    letterbox.padded_height,
    Rgb([PAD_VALUE; 3]),
  );
  imageops::replace(
    &mut padded,
    &resized,
    letterbox.pad_x as i64,
    letterbox.pad_y as i64,
  );

  Ok(InputTensor {
    letterbox,
    frame: RgbNhwcFrame::from(padded),
  })
}

pub fn preprocess(image: &RgbImage, config: &DetectorConfig) -> Result<InputTensor, PreprocessError> {
  letterbox_image(image, config.target_input_size(), config.stride_multiple())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::{AsNchwTensor, AsNhwcFrame};

  #[test]
  fn landscape_image_fills_width() {
    let lb = Letterbox::compute(640, 480, 480, 32).unwrap();
    assert_eq!(lb.scale, 0.75);
    assert_eq!(lb.resized_width, 480);
    assert_eq!(lb.resized_height, 360);
    assert_eq!(lb.padded_width, 480);
    assert_eq!(lb.padded_height, 480);
    assert_eq!(lb.pad_x, 0.0);
    assert_eq!(lb.pad_y, 60.0);
  }

  #[test]
  fn portrait_image_fills_height() {
    let lb = Letterbox::compute(300, 600, 480, 32).unwrap();
    assert_eq!(lb.resized_height, 480);
    assert_eq!(lb.resized_width, 240);
    assert_eq!(lb.pad_x, 120.0);
    assert_eq!(lb.pad_y, 0.0);
  }

  #[test]
  fn odd_padding_puts_extra_pixel_on_far_side() {
    // 短边 round(101 * 480/481) = 101, 余 379, 上 189 下 190
    let lb = Letterbox::compute(481, 101, 480, 32).unwrap();
    assert_eq!(lb.resized_height, 101);
    assert_eq!(lb.padded_height - lb.resized_height, 379);
    assert_eq!(lb.pad_y, 189.0);
  }

  #[test]
  fn target_not_multiple_of_stride_is_padded_up() {
    let lb = Letterbox::compute(100, 100, 500, 32).unwrap();
    assert_eq!(lb.padded_width, 512);
    assert_eq!(lb.resized_width, 500);
    assert_eq!(lb.pad_x, 6.0);
  }

  #[test]
  fn zero_dimension_is_rejected() {
    assert_eq!(
      Letterbox::compute(0, 10, 480, 32),
      Err(PreprocessError::EmptyImage {
        width: 0,
        height: 10
      })
    );
  }

  #[test]
  fn forward_and_inverse_agree() {
    let lb = Letterbox::compute(1280, 720, 480, 32).unwrap();
    let (px, py) = lb.forward(100.0, 200.0);
    let (x, y) = lb.inverse(px, py);
    assert!((x - 100.0).abs() < 1e-3);
    assert!((y - 200.0).abs() < 1e-3);
  }

  #[test]
  fn letterbox_pads_with_grey_and_normalizes() {
    let image = RgbImage::from_pixel(64, 32, Rgb([255, 0, 0]));
    let input = letterbox_image(&image, 64, 32).unwrap();
    assert_eq!(input.padded_width(), 64);
    assert_eq!(input.padded_height(), 64);
    assert_eq!(input.letterbox.pad_y, 16.0);

    let nhwc = input.frame.as_nhwc();
    // 左上角位于填充区
    assert_eq!(&nhwc[0..3], &[PAD_VALUE; 3]);
    // 中心位于图像区
    let center = (32 * 64 + 32) * 3;
    assert_eq!(&nhwc[center..center + 3], &[255, 0, 0]);

    let tensor = input.to_nchw();
    assert_eq!(tensor.as_nchw().len(), 3 * 64 * 64);
    assert_eq!(tensor.get(0, 32, 32), Some(1.0));
    assert_eq!(tensor.get(1, 32, 32), Some(0.0));
    assert_eq!(tensor.get(0, 0, 0), Some(PAD_VALUE as f32 / 255.0));
  }
}
