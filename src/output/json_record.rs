// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/json_record.rs - JSON 检测记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectResult, Rect, WithLabel},
  output::Render,
};

#[derive(Error, Debug)]
pub enum JsonRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerdeError(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
pub struct RecordItem {
  pub label: u32,
  pub name: String,
  pub score: f32,
  #[serde(flatten)]
  pub rect: Rect,
}

#[derive(Debug, Serialize)]
pub struct RecordTimings {
  pub preprocess_ms: f64,
  pub inference_ms: f64,
  pub postprocess_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct Record {
  pub image_width: u32,
  pub image_height: u32,
  pub timings: RecordTimings,
  pub detections: Vec<RecordItem>,
}

impl Record {
  pub fn new<T: WithLabel>(frame: &RgbImage, result: &DetectResult<T>) -> Self {
    let detections = result
      .items
      .iter()
      .map(|item| RecordItem {
        label: item.kind.to_label_id(),
        name: item.kind.to_label_str(),
        score: item.score,
        rect: item.rect,
      })
      .collect();
    let timings = RecordTimings {
      preprocess_ms: result.timings.preprocess.as_secs_f64() * 1000.0,
      inference_ms: result.timings.inference.as_secs_f64() * 1000.0,
      postprocess_ms: result.timings.postprocess.as_secs_f64() * 1000.0,
    };
    Record {
      image_width: frame.width(),
      image_height: frame.height(),
      timings,
      detections,
    }
  }
}

/// 将检测结果写为 JSON 文件，不绘制图像
pub struct JsonRecordOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonRecordOutputError::SchemeMismatch);
    }
    Ok(JsonRecordOutput {
      path: PathBuf::from(uri.path()),
    })
  }
}

impl<T: WithLabel> Render<RgbImage, DetectResult<T>> for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn render_result(&self, frame: &RgbImage, result: &DetectResult<T>) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    let record = Record::new(frame, result);
    std::fs::write(&self.path, serde_json::to_string_pretty(&record)?)?;
    info!(
      "保存检测记录: {} ({} objects)",
      self.path.display(),
      record.detections.len()
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{CocoLabel, DetectItem, StageTimings};
  use std::time::Duration;

  #[test]
  fn writes_detections_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("record.json");
    let url = Url::parse(&format!("json://{}", path.display())).unwrap();
    let output = JsonRecordOutput::from_url(&url).unwrap();

    let frame = RgbImage::new(64, 48);
    let result = DetectResult {
      items: vec![DetectItem {
        kind: CocoLabel::from_label_id(16),
        score: 0.75,
        rect: Rect::new(1.0, 2.0, 3.0, 4.0),
      }]
      .into_boxed_slice(),
      timings: StageTimings {
        preprocess: Duration::from_millis(2),
        inference: Duration::from_millis(10),
        postprocess: Duration::from_millis(1),
      },
    };
    output.render_result(&frame, &result).unwrap();

    let value: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["image_width"], 64);
    let inference_ms = value["timings"]["inference_ms"].as_f64().unwrap();
    assert!((inference_ms - 10.0).abs() < 1e-9);
    let det = &value["detections"][0];
    assert_eq!(det["label"], 16);
    assert_eq!(det["name"], "dog");
    assert_eq!(det["score"], 0.75);
    assert_eq!(det["x"], 1.0);
    assert_eq!(det["height"], 4.0);
  }
}
