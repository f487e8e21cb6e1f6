// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/mapping.rs - Letterbox 坐标还原
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

use crate::{
  model::{Candidate, Rect},
  preprocess::Letterbox,
};

/// 将模型输入空间的矩形映射回原图，并裁剪到 `[0, W-1] x [0, H-1]`
pub fn unletterbox_rect(rect: &Rect, letterbox: &Letterbox) -> Rect {
  let max_x = letterbox.original_width.saturating_sub(1) as f32;
  let max_y = letterbox.original_height.saturating_sub(1) as f32;

  let (x0, y0) = letterbox.inverse(rect.x, rect.y);
  let (x1, y1) = letterbox.inverse(rect.right(), rect.bottom());

  Rect::from_corners(
    x0.clamp(0.0, max_x),
    y0.clamp(0.0, max_y),
    x1.clamp(0.0, max_x),
    y1.clamp(0.0, max_y),
  )
}

/// 原地改写每个候选框的坐标
pub fn unletterbox(candidates: &mut [Candidate], letterbox: &Letterbox) {
  for candidate in candidates.iter_mut() {
    candidate.rect = unletterbox_rect(&candidate.rect, letterbox);
  }
}
