// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/nms.rs - 非极大值抑制
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

use tracing::debug;

use crate::model::Candidate;

/// 对已按置信度降序排列的候选框做贪心 NMS，返回保留下标
///
/// 与任一已保留框的 IoU 超过 `nms_threshold` 即被丢弃；`agnostic` 为 false 时
/// 只比较同类别的框。
pub fn nms_sorted_indices(
  candidates: &[Candidate],
  nms_threshold: f32,
  agnostic: bool,
) -> Vec<usize> {
  let areas: Vec<f32> = candidates.iter().map(|c| c.rect.area()).collect();
  let mut picked: Vec<usize> = Vec::new();

  for (i, a) in candidates.iter().enumerate() {
    let suppressed = picked.iter().any(|&j| {
      let b = &candidates[j];
      if !agnostic && a.label != b.label {
        return false;
      }
      let inter = a.rect.intersection_area(&b.rect);
      let union = areas[i] + areas[j] - inter;
      // 退化框的并集可能为 0，此时视 IoU 为 0
      let iou = if union > 0.0 { inter / union } else { 0.0 };
      iou > nms_threshold
    });
    if !suppressed {
      picked.push(i);
    }
  }

  picked
}

/// 按保留下标挑出候选框，保持原有顺序
pub fn nms_sorted(candidates: &[Candidate], nms_threshold: f32, agnostic: bool) -> Vec<Candidate> {
  let picked = nms_sorted_indices(candidates, nms_threshold, agnostic);
  debug!("NMS: {} -> {} 个候选框", candidates.len(), picked.len());
  picked.into_iter().map(|i| candidates[i]).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Rect;

  fn candidate(x: f32, y: f32, w: f32, h: f32, label: usize, prob: f32) -> Candidate {
    Candidate {
      rect: Rect::new(x, y, w, h),
      label,
      prob,
    }
  }

  #[test]
  fn suppresses_same_label_overlap() {
    // 两个 10x10 框，交集 7.5x10 = 75，并集 125，IoU = 0.6
    let a = candidate(0.0, 0.0, 10.0, 10.0, 0, 0.9);
    let b = candidate(2.5, 0.0, 10.0, 10.0, 0, 0.8);
    assert!((a.rect.iou(&b.rect) - 0.6).abs() < 1e-6);

    let kept = nms_sorted(&[a, b], 0.45, false);
    assert_eq!(kept, vec![a]);
  }

  #[test]
  fn class_aware_keeps_different_labels() {
    let a = candidate(10.0, 10.0, 50.0, 50.0, 0, 0.9);
    let b = candidate(10.0, 10.0, 50.0, 50.0, 1, 0.8);
    assert_eq!(nms_sorted(&[a, b], 0.45, false), vec![a, b]);
    assert_eq!(nms_sorted(&[a, b], 0.45, true), vec![a]);
  }

  #[test]
  fn iou_equal_to_threshold_is_kept() {
    // IoU = 50 / 150 = 1/3
    let a = candidate(0.0, 0.0, 10.0, 10.0, 0, 0.9);
    let b = candidate(5.0, 0.0, 10.0, 10.0, 0, 0.8);
    let iou = a.rect.iou(&b.rect);
    assert_eq!(nms_sorted(&[a, b], iou, false).len(), 2);
  }

  #[test]
  fn suppressed_box_does_not_suppress_others() {
    // b 被 a 抑制，c 只与 b 重叠，因此 c 保留
    let a = candidate(0.0, 0.0, 10.0, 10.0, 0, 0.9);
    let b = candidate(3.0, 0.0, 10.0, 10.0, 0, 0.8);
    let c = candidate(9.0, 0.0, 10.0, 10.0, 0, 0.7);
    assert_eq!(nms_sorted_indices(&[a, b, c], 0.45, false), vec![0, 2]);
  }

  #[test]
  fn zero_area_boxes_survive() {
    let a = candidate(5.0, 5.0, 0.0, 0.0, 0, 0.9);
    let b = candidate(5.0, 5.0, 0.0, 0.0, 0, 0.8);
    assert_eq!(nms_sorted_indices(&[a, b], 0.45, false), vec![0, 1]);
  }

  #[test]
  fn empty_input() {
    assert!(nms_sorted(&[], 0.45, false).is_empty());
  }
}
