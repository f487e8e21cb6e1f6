use proptest::prelude::*;
use yolo11_edge::{
  model::{Candidate, Rect},
  postprocess::{TensorView, decode, nms_sorted, sort_descending, unletterbox_rect},
  preprocess::Letterbox,
};

const PADDED: f32 = 480.0;

fn candidate() -> impl Strategy<Value = Candidate> {
  (
    0.0f32..470.0,
    0.0f32..470.0,
    1.0f32..200.0,
    1.0f32..200.0,
    0usize..4,
    0.0f32..1.0,
  )
    .prop_map(|(x, y, w, h, label, prob)| Candidate {
      rect: Rect::new(x, y, w, h),
      label,
      prob,
    })
}

/// 通道优先的随机张量: 4 个框通道 + `labels` 个类别通道
fn raw_tensor() -> impl Strategy<Value = (usize, usize, Vec<f32>)> {
  (1usize..6, 1usize..64).prop_flat_map(|(labels, anchors)| {
    let channels = 4 + labels;
    let boxes = prop::collection::vec(0.0f32..600.0, 4 * anchors);
    let scores = prop::collection::vec(0.0f32..1.0, labels * anchors);
    (Just(channels), Just(anchors), boxes, scores).prop_map(|(c, a, mut b, s)| {
      b.extend(s);
      (c, a, b)
    })
  })
}

proptest! {
  #[test]
  fn decoded_scores_exceed_threshold(
    (channels, anchors, data) in raw_tensor(),
    conf in 0.0f32..1.0,
  ) {
    let view = TensorView::new(&data, channels, anchors).unwrap();
    let out = decode(&view, conf, PADDED, PADDED);
    prop_assert!(out.len() <= anchors);
    for c in &out {
      prop_assert!(c.prob > conf);
      prop_assert!(c.label < channels - 4);
      prop_assert!(c.rect.x >= 0.0 && c.rect.right() <= PADDED);
      prop_assert!(c.rect.y >= 0.0 && c.rect.bottom() <= PADDED);
    }
  }

  #[test]
  fn wrong_length_is_rejected(
    (channels, anchors, mut data) in raw_tensor(),
  ) {
    data.pop();
    prop_assert!(TensorView::new(&data, channels, anchors).is_err());
  }

  // 分数相同的候选框之间顺序不作保证，只检查非递增和多重集不变
  #[test]
  fn sort_is_descending_permutation(
    mut candidates in prop::collection::vec(candidate(), 0..2000),
  ) {
    let mut before: Vec<u32> = candidates.iter().map(|c| c.prob.to_bits()).collect();
    sort_descending(&mut candidates);
    for pair in candidates.windows(2) {
      prop_assert!(pair[0].prob >= pair[1].prob);
    }
    let mut after: Vec<u32> = candidates.iter().map(|c| c.prob.to_bits()).collect();
    before.sort_unstable();
    after.sort_unstable();
    prop_assert_eq!(before, after);
  }

  #[test]
  fn nms_keeps_no_overlapping_pair(
    mut candidates in prop::collection::vec(candidate(), 0..200),
    threshold in 0.05f32..0.95,
    agnostic in any::<bool>(),
  ) {
    sort_descending(&mut candidates);
    let kept = nms_sorted(&candidates, threshold, agnostic);

    prop_assert!(kept.len() <= candidates.len());
    if !candidates.is_empty() {
      // 分数最高者总会保留
      prop_assert_eq!(&kept[0], &candidates[0]);
    }

    // 保留结果是输入的子序列
    let mut rest = candidates.iter();
    for k in &kept {
      prop_assert!(rest.any(|c| c == k));
    }

    for (i, a) in kept.iter().enumerate() {
      for b in &kept[i + 1..] {
        if agnostic || a.label == b.label {
          prop_assert!(a.rect.iou(&b.rect) <= threshold);
        }
      }
    }
  }

  #[test]
  fn mapped_boxes_stay_inside_image(
    width in 1u32..2000,
    height in 1u32..2000,
    candidate in candidate(),
  ) {
    let lb = Letterbox::compute(width, height, 480, 32).unwrap();
    let rect = unletterbox_rect(&candidate.rect, &lb);
    let (max_x, max_y) = ((width - 1) as f32, (height - 1) as f32);
    prop_assert!(rect.x >= 0.0 && rect.right() <= max_x + 1e-3);
    prop_assert!(rect.y >= 0.0 && rect.bottom() <= max_y + 1e-3);
    prop_assert!(rect.width >= 0.0 && rect.height >= 0.0);
  }

  #[test]
  fn letterbox_round_trip(
    width in 1u32..2000,
    height in 1u32..2000,
    fx in 0.0f32..1.0,
    fy in 0.0f32..1.0,
  ) {
    let lb = Letterbox::compute(width, height, 480, 32).unwrap();
    prop_assert_eq!(lb.resized_width.max(lb.resized_height), 480);
    prop_assert_eq!(lb.padded_width % 32, 0);
    prop_assert_eq!(lb.padded_height % 32, 0);

    let (x, y) = (fx * width as f32, fy * height as f32);
    let (px, py) = lb.forward(x, y);
    let (bx, by) = lb.inverse(px, py);
    let tolerance = 1e-3 * width.max(height) as f32;
    prop_assert!((bx - x).abs() <= tolerance);
    prop_assert!((by - y).abs() <= tolerance);
  }
}
