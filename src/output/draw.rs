// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use thiserror::Error;
use tracing::debug;

use crate::model::{DetectItem, DetectResult, WithLabel};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_TEXT_OFFSET: i32 = 5;
const BOX_THICKNESS: i32 = 2;
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const TEXT_COLOR: [u8; 3] = [0, 0, 0]; // 黑色

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 标签文本，形如 `person 87.5%`
pub fn label_text<T: WithLabel>(kind: &T, score: f32) -> String {
  format!("{} {:.1}%", kind.to_label_str(), score * 100.0)
}

pub struct Draw {
  font: Option<FontVec>,
  font_size: f32,
  box_color: [u8; 3],
  text_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      box_color: BOX_COLOR,
      text_color: TEXT_COLOR,
    }
  }
}

impl Draw {
  /// 加载 TrueType 字体用于绘制标签文字；未加载字体时只绘制边框
  pub fn with_font_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, DrawError> {
    let data = std::fs::read(path)?;
    self.font = Some(FontVec::try_from_vec(data)?);
    Ok(self)
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  fn draw_item<T: WithLabel>(&self, image: &mut RgbImage, item: &DetectItem<T>) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let x_min = (item.rect.x.floor() as i32).clamp(0, w - 1);
    let y_min = (item.rect.y.floor() as i32).clamp(0, h - 1);
    let x_max = (item.rect.right().ceil() as i32).clamp(0, w - 1);
    let y_max = (item.rect.bottom().ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 边框向内加粗
    for t in 0..BOX_THICKNESS {
      let width = x_max - x_min + 1 - 2 * t;
      let height = y_max - y_min + 1 - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.box_color));
    }

    if let Some(font) = &self.font {
      let label = label_text(&item.kind, item.score);
      let text_y = (y_min - self.font_size as i32 - LABEL_TEXT_OFFSET).max(0);
      draw_text_mut(
        image,
        Rgb(self.text_color),
        x_min,
        text_y,
        PxScale::from(self.font_size),
        font,
        &label,
      );
    }
  }

  pub fn draw_detections_on_image<T: WithLabel>(&self, image: &mut RgbImage, result: &DetectResult<T>) {
    if self.font.is_none() {
      debug!("未加载字体, 只绘制边框");
    }
    for item in result.items.iter() {
      self.draw_item(image, item);
    }
  }

  pub fn draw_detection<T: WithLabel>(&self, image: &RgbImage, result: &DetectResult<T>) -> RgbImage {
    let mut canvas = image.clone();
    self.draw_detections_on_image(&mut canvas, result);
    canvas
  }
}
