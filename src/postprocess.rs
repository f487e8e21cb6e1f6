// 该文件是 Shanan （山南西风） 项目的一部分。
// src/postprocess.rs - 检测后处理
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

//! 解码 -> 排序 -> NMS -> 坐标还原

pub mod decode;
pub mod mapping;
pub mod nms;
pub mod sort;

pub use self::decode::{DecodeError, TensorView, decode};
pub use self::mapping::{unletterbox, unletterbox_rect};
pub use self::nms::{nms_sorted, nms_sorted_indices};
pub use self::sort::sort_descending;

use crate::{
  config::DetectorConfig, engine::OutputTensor, model::Candidate, preprocess::Letterbox,
};

/// 对一次推理的原始输出执行完整后处理，返回原图坐标下的候选框
///
/// `num_labels` 为 `Some` 时要求输出类别通道数与之相等。
pub fn postprocess(
  output: &OutputTensor,
  letterbox: &Letterbox,
  config: &DetectorConfig,
  num_labels: Option<usize>,
) -> Result<Vec<Candidate>, DecodeError> {
  let mut view = TensorView::new(&output.data, output.channels, output.anchors)?;
  if let Some(num_labels) = num_labels {
    view = view.expect_labels(num_labels)?;
  }

  let mut proposals = decode(
    &view,
    config.confidence_threshold(),
    letterbox.padded_width as f32,
    letterbox.padded_height as f32,
  );
  sort_descending(&mut proposals);
  let mut kept = nms_sorted(&proposals, config.nms_threshold(), config.class_agnostic());
  unletterbox(&mut kept, letterbox);
  Ok(kept)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn full_chain_on_synthetic_output() {
    let config = DetectorConfig::default();
    // 640x480 原图, scale 0.75, pad_y 60
    let letterbox = Letterbox::compute(640, 480, 480, 32).unwrap();

    // 3 个锚点, 2 个类别: 两个重叠的类别 0 框与一个低分框
    #[rustfmt::skip]
    let data = vec![
      // cx
      150.0, 152.0, 300.0,
      // cy
      172.5, 172.5, 300.0,
      // w
      150.0, 150.0, 10.0,
      // h
      75.0, 75.0, 10.0,
      // class 0
      0.9, 0.8, 0.1,
      // class 1
      0.05, 0.1, 0.2,
    ];
    let output = OutputTensor::new(6, 3, data);
    let kept = postprocess(&output, &letterbox, &config, Some(2)).unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].prob, 0.9);
    assert_eq!(kept[0].rect.x, 100.0);
    assert_eq!(kept[0].rect.y, 100.0);
    assert_eq!(kept[0].rect.width, 200.0);
    assert_eq!(kept[0].rect.height, 100.0);
  }

  #[test]
  fn label_table_mismatch_is_an_error() {
    let config = DetectorConfig::default();
    let letterbox = Letterbox::compute(640, 480, 480, 32).unwrap();
    let output = OutputTensor::new(6, 1, vec![0.0; 6]);
    assert!(matches!(
      postprocess(&output, &letterbox, &config, Some(80)),
      Err(DecodeError::LabelCountMismatch { .. })
    ));
    assert!(postprocess(&output, &letterbox, &config, None).is_ok());
  }

  #[derive(Clone, Default)]
  struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

  impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn output_shape_is_left_to_the_detector_log() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
      .with_max_level(tracing::Level::DEBUG)
      .with_ansi(false)
      .with_writer(move || writer.clone())
      .finish();

    let config = DetectorConfig::default();
    let letterbox = Letterbox::compute(480, 480, 480, 32).unwrap();
    let output = OutputTensor::new(5, 1, vec![10.0, 10.0, 4.0, 4.0, 0.9]);
    tracing::subscriber::with_default(subscriber, || {
      postprocess(&output, &letterbox, &config, None).unwrap();
    });

    let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(logs.contains("NMS"));
    assert!(!logs.contains("channels="));
  }
}
