// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess/sort.rs - 候选框降序排序
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

use crate::model::Candidate;

/// 低于此长度的区间直接串行排序
pub const PARALLEL_CUTOFF: usize = 512;

/// 按置信度降序原地排序
///
/// 大区间做三路划分后用 `rayon::join` 并行递归两侧互不相交的子区间，
/// 两侧都完成后才返回。置信度相同的候选框之间的先后次序不作保证，
/// 并行执行时每次运行都可能不同。
pub fn sort_descending(candidates: &mut [Candidate]) {
  sort_with_cutoff(candidates, PARALLEL_CUTOFF);
}

pub(crate) fn sort_with_cutoff(candidates: &mut [Candidate], cutoff: usize) {
  let depth_limit = 2 * (usize::BITS - candidates.len().leading_zeros()) as usize;
  sort_limited(candidates, cutoff, depth_limit);
}

/// 递归超过 `depth` 层后退化为串行排序，划分再不均匀也不会过深
fn sort_limited(candidates: &mut [Candidate], cutoff: usize, depth: usize) {
  if candidates.len() <= cutoff.max(1) || depth == 0 {
    candidates.sort_unstable_by(|a, b| b.prob.total_cmp(&a.prob));
    return;
  }

  let pivot = median_of_three(candidates);
  let (greater_end, less_start) = partition(candidates, pivot);

  let (greater, rest) = candidates.split_at_mut(greater_end);
  let (_, less) = rest.split_at_mut(less_start - greater_end);
  rayon::join(
    || sort_limited(greater, cutoff, depth - 1),
    || sort_limited(less, cutoff, depth - 1),
  );
}

/// 首、中、尾三个置信度的中位数
fn median_of_three(candidates: &[Candidate]) -> f32 {
  let a = candidates[0].prob;
  let b = candidates[candidates.len() / 2].prob;
  let c = candidates[candidates.len() - 1].prob;
  a.max(b).min(a.min(b).max(c))
}

/// 三路划分: `[0, lt)` 大于 pivot, `[lt, gt)` 等于 pivot, `[gt, len)` 小于 pivot
///
/// 与 pivot 无法比较的值 (NaN) 归入中段，中段总是非空，递归必然收敛。
fn partition(candidates: &mut [Candidate], pivot: f32) -> (usize, usize) {
  let mut lt = 0;
  let mut i = 0;
  let mut gt = candidates.len();
  while i < gt {
    let prob = candidates[i].prob;
    if prob > pivot {
      candidates.swap(lt, i);
      lt += 1;
      i += 1;
    } else if prob < pivot {
      gt -= 1;
      candidates.swap(i, gt);
    } else {
      i += 1;
    }
  }
  (lt, gt)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Rect;

  fn candidate(prob: f32, label: usize) -> Candidate {
    Candidate {
      rect: Rect::new(0.0, 0.0, 1.0, 1.0),
      label,
      prob,
    }
  }

  fn is_descending(items: &[Candidate]) -> bool {
    items.windows(2).all(|w| w[0].prob >= w[1].prob)
  }

  #[test]
  fn sorts_small_input() {
    let mut items = vec![candidate(0.3, 0), candidate(0.9, 1), candidate(0.5, 2)];
    sort_descending(&mut items);
    let probs: Vec<f32> = items.iter().map(|c| c.prob).collect();
    assert_eq!(probs, vec![0.9, 0.5, 0.3]);
  }

  #[test]
  fn parallel_path_sorts_and_keeps_elements() {
    let mut items: Vec<Candidate> = (0..5000)
      .map(|i| candidate(((i * 7919) % 1000) as f32 / 1000.0, i))
      .collect();
    sort_with_cutoff(&mut items, 16);
    assert!(is_descending(&items));

    let mut labels: Vec<usize> = items.iter().map(|c| c.label).collect();
    labels.sort_unstable();
    assert_eq!(labels, (0..5000).collect::<Vec<_>>());
  }

  #[test]
  fn all_equal_input_terminates() {
    let mut items: Vec<Candidate> = (0..2000).map(|i| candidate(0.5, i)).collect();
    sort_with_cutoff(&mut items, 4);
    assert!(items.iter().all(|c| c.prob == 0.5));
    assert_eq!(items.len(), 2000);
  }

  #[test]
  fn empty_and_single() {
    let mut empty: Vec<Candidate> = Vec::new();
    sort_descending(&mut empty);
    assert!(empty.is_empty());

    let mut one = vec![candidate(0.4, 0)];
    sort_with_cutoff(&mut one, 0);
    assert_eq!(one[0].prob, 0.4);
  }

  #[test]
  fn pivot_is_median_of_ends_and_middle() {
    let items: Vec<Candidate> = [0.9, 0.1, 0.5, 0.3, 0.2]
      .iter()
      .map(|p| candidate(*p, 0))
      .collect();
    // 首 0.9, 中 0.5, 尾 0.2
    assert_eq!(median_of_three(&items), 0.5);
    assert_eq!(median_of_three(&items[..2]), 0.1);
    assert_eq!(median_of_three(&items[..1]), 0.9);
  }

  #[test]
  fn ordered_and_organ_pipe_inputs_sort() {
    let mut ascending: Vec<Candidate> = (0..20000)
      .map(|i| candidate(i as f32 / 20000.0, i))
      .collect();
    let mut organ_pipe: Vec<Candidate> = (0..10000)
      .chain((0..10000).rev())
      .enumerate()
      .map(|(i, v)| candidate(v as f32 / 10000.0, i))
      .collect();
    let mut descending: Vec<Candidate> = ascending.iter().rev().copied().collect();

    for items in [&mut ascending, &mut organ_pipe, &mut descending] {
      sort_with_cutoff(items, 4);
      assert!(is_descending(items));
      assert_eq!(items.len(), 20000);
    }
  }

  #[test]
  fn exhausted_depth_falls_back_to_sequential_sort() {
    let mut items: Vec<Candidate> = (0..3000)
      .map(|i| candidate(((i * 131) % 997) as f32 / 997.0, i))
      .collect();
    sort_limited(&mut items, 4, 0);
    assert!(is_descending(&items));

    let mut items: Vec<Candidate> = (0..3000)
      .map(|i| candidate(((i * 131) % 997) as f32 / 997.0, i))
      .collect();
    sort_limited(&mut items, 4, 1);
    assert!(is_descending(&items));
  }

  #[test]
  fn partition_splits_into_three_ranges() {
    let mut items: Vec<Candidate> = [0.1, 0.9, 0.5, 0.5, 0.7, 0.2]
      .iter()
      .map(|p| candidate(*p, 0))
      .collect();
    let (lt, gt) = partition(&mut items, 0.5);
    assert_eq!((lt, gt), (2, 4));
    assert!(items[..lt].iter().all(|c| c.prob > 0.5));
    assert!(items[lt..gt].iter().all(|c| c.prob == 0.5));
    assert!(items[gt..].iter().all(|c| c.prob < 0.5));
  }
}
