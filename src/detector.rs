// 该文件是 Shanan （山南西风） 项目的一部分。
// src/detector.rs - YOLO11 目标检测器
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{marker::PhantomData, time::Instant};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  config::DetectorConfig,
  engine::{Engine, EngineError, EngineWrapper},
  model::{CocoLabel, DetectItem, DetectResult, Model, StageTimings, WithLabel},
  postprocess::{self, DecodeError},
  preprocess::{self, PreprocessError},
};

#[derive(Error, Debug)]
pub enum DetectError<E: std::error::Error + 'static> {
  #[error("输入图像无效: {0}")]
  Precondition(#[from] PreprocessError),
  #[error("模型输出形状错误: {0}")]
  ShapeMismatch(#[from] DecodeError),
  #[error("推理后端错误: {0}")]
  Engine(#[source] E),
}

/// YOLO11 目标检测器
///
/// 持有推理后端的会话，一次只处理一张图像。
pub struct Detector<E, L = CocoLabel> {
  engine: E,
  config: DetectorConfig,
  _label: PhantomData<L>,
}

impl<L: WithLabel> Detector<EngineWrapper, L> {
  /// 按模型 URI 方案创建后端并构建检测器
  pub fn from_url(model: &Url, config: DetectorConfig) -> Result<Self, EngineError> {
    let engine = EngineWrapper::from_url(model, &config)?;
    Ok(Self::new(engine, config))
  }
}

impl<E: Engine, L: WithLabel> Detector<E, L> {
  pub fn new(engine: E, config: DetectorConfig) -> Self {
    info!(
      "[CONFIG] precision={} gpu={} conf={:.2} nms={:.2} agnostic={} input={} stride={} threads={}",
      config.precision(),
      config.use_gpu_backend(),
      config.confidence_threshold(),
      config.nms_threshold(),
      config.class_agnostic(),
      config.target_input_size(),
      config.stride_multiple(),
      config.num_threads()
    );
    if config.precision().is_int8() {
      info!("INT8 校准预处理: {}", preprocess::CALIBRATION_RECIPE);
    }
    Self {
      engine,
      config,
      _label: PhantomData,
    }
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  pub fn detect(&mut self, image: &RgbImage) -> Result<DetectResult<L>, DetectError<E::Error>> {
    let t0 = Instant::now();
    let input = preprocess::preprocess(image, &self.config)?;

    let t1 = Instant::now();
    let output = self.engine.run(&input).map_err(DetectError::Engine)?;
    debug!(
      "[INFO] out shape: channels={}, anchors={}",
      output.channels, output.anchors
    );

    let t2 = Instant::now();
    let kept = postprocess::postprocess(
      &output,
      &input.letterbox,
      &self.config,
      Some(L::LABEL_COUNT),
    )?;
    let items: Vec<DetectItem<L>> = kept
      .into_iter()
      .map(|c| DetectItem {
        kind: L::from_label_id(c.label as u32),
        score: c.prob,
        rect: c.rect,
      })
      .collect();
    let t3 = Instant::now();

    let timings = StageTimings {
      preprocess: t1 - t0,
      inference: t2 - t1,
      postprocess: t3 - t2,
    };
    info!(
      "[TIME] Preprocess: {:.2?} | Inference: {:.2?} | Postprocess: {:.2?}",
      timings.preprocess, timings.inference, timings.postprocess
    );
    debug!("检测到 {} 个物体", items.len());

    Ok(DetectResult {
      items: items.into_boxed_slice(),
      timings,
    })
  }
}

impl<E: Engine, L: WithLabel> Model for Detector<E, L> {
  type Input = RgbImage;
  type Output = DetectResult<L>;
  type Error = DetectError<E::Error>;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.detect(input)
  }
}
