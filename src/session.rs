// 该文件是 Kuangshi （框识） 项目的一部分。
// src/session.rs - 输入、检测与渲染的会话状态机
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

use std::{
  cell::{Cell, Ref, RefCell},
  rc::Rc,
};

use tracing::{debug, error, info, warn};

use crate::{
  detection::DetectionSet,
  detector::{Detector, summarize},
  geometry::{Viewport, fit_canvas_to_image},
  input::{DecodedImage, ImageCrateDecoder, ImageDecoder, InputEvent, InputFile, InputRouter},
  model::DetectionModel,
  output::draw::{Overlay, OverlayRenderer},
  status::StatusBoard,
};

pub const INVALID_INPUT_STATUS: &str = "Please upload an image file.";
pub const DETECTING_STATUS: &str = "Detecting…";

/// 最近一次提交所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Decoding,
  Detecting,
  Rendered,
  Failed,
}

/// 一次提交的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
  /// 结果已提交并绘制
  Rendered { seq: u64, boxes: usize },
  /// 不是图像文件，未做任何改动
  Rejected,
  /// 被更新的提交取代，结果已丢弃
  Superseded { seq: u64 },
  /// 图像尚未解码，未调用模型
  Skipped { seq: u64 },
  /// 解码、加载或推理失败，保留之前的结果
  Failed { seq: u64 },
}

/// 当前生效的画面：图像、几何信息、检测结果与叠加层总是一起替换
#[derive(Debug, Clone)]
pub struct Scene {
  pub seq: u64,
  pub image: Rc<DecodedImage>,
  pub detections: DetectionSet,
  pub overlay: Overlay,
}

/// 事件处理结果
#[derive(Debug, Clone, Default)]
pub struct EventResponse {
  pub prevent_default: bool,
  pub open_picker: bool,
  pub submission: Option<Submission>,
}

pub struct Session<M: DetectionModel, D: ImageDecoder = ImageCrateDecoder> {
  detector: Detector<M>,
  decoder: D,
  renderer: OverlayRenderer,
  status: StatusBoard,
  router: RefCell<InputRouter>,
  viewport: Cell<Viewport>,
  latest: Cell<u64>,
  phase: Cell<Phase>,
  scene: RefCell<Option<Scene>>,
}

impl<M: DetectionModel, D: ImageDecoder> Session<M, D> {
  pub fn new(
    detector: Detector<M>,
    decoder: D,
    renderer: OverlayRenderer,
    viewport: Viewport,
  ) -> Self {
    let status = detector.loader().status().clone();
    Self {
      detector,
      decoder,
      renderer,
      status,
      router: RefCell::new(InputRouter::new()),
      viewport: Cell::new(viewport),
      latest: Cell::new(0),
      phase: Cell::new(Phase::Idle),
      scene: RefCell::new(None),
    }
  }

  pub fn status(&self) -> &StatusBoard {
    &self.status
  }

  pub fn phase(&self) -> Phase {
    self.phase.get()
  }

  pub fn viewport(&self) -> Viewport {
    self.viewport.get()
  }

  /// 最近一次被接受的提交序号
  pub fn latest_seq(&self) -> u64 {
    self.latest.get()
  }

  pub fn is_dragging(&self) -> bool {
    self.router.borrow().drop_zone().is_dragging()
  }

  pub fn scene(&self) -> Ref<'_, Option<Scene>> {
    self.scene.borrow()
  }

  fn is_current(&self, seq: u64) -> bool {
    self.latest.get() == seq
  }

  /// 处理界面事件，得到文件时立即提交
  pub async fn handle_event(&self, event: InputEvent) -> EventResponse {
    let routed = self.router.borrow_mut().route(event);
    let submission = match routed.file {
      Some(file) => Some(self.submit(file).await),
      None => None,
    };
    EventResponse {
      prevent_default: routed.prevent_default,
      open_picker: routed.open_picker,
      submission,
    }
  }

  /// 提交一张图像：校验、解码、检测、渲染
  ///
  /// 只有序号仍为最新的提交才会写入画面，较早的提交在任何等待点之后
  /// 发现自己已过期都会直接丢弃结果。
  pub async fn submit(&self, file: InputFile) -> Submission {
    if let Err(e) = file.validate() {
      warn!("拒绝输入: {}", e);
      self.status.set(INVALID_INPUT_STATUS);
      return Submission::Rejected;
    }

    let seq = self.latest.get() + 1;
    self.latest.set(seq);
    self.phase.set(Phase::Decoding);
    info!("第 {} 次提交: {} ({})", seq, file.name(), file.mime());

    let decoded = self.decoder.decode(&file).await;
    if !self.is_current(seq) {
      debug!("第 {} 次提交已过期（解码后）", seq);
      return Submission::Superseded { seq };
    }
    let image = match decoded {
      Ok(image) => Rc::new(image),
      Err(e) => return self.fail(seq, format!("Could not read image: {}", e)),
    };

    if image.natural_width() == 0 {
      debug!("第 {} 次提交的图像尚未解码，跳过检测", seq);
      self.phase.set(Phase::Idle);
      return Submission::Skipped { seq };
    }

    self.phase.set(Phase::Detecting);
    self.status.set(DETECTING_STATUS);

    let detected = self.detector.detect(&image).await;
    if !self.is_current(seq) {
      debug!("第 {} 次提交已过期（检测后）", seq);
      return Submission::Superseded { seq };
    }

    let detections = match detected {
      Ok(Some(set)) => set,
      Ok(None) => {
        self.phase.set(Phase::Idle);
        return Submission::Skipped { seq };
      }
      Err(e) => return self.fail(seq, format!("Detection failed: {}", e)),
    };

    let boxes = self.commit(seq, image, detections);
    Submission::Rendered { seq, boxes }
  }

  fn commit(&self, seq: u64, image: Rc<DecodedImage>, detections: DetectionSet) -> usize {
    let geometry = fit_canvas_to_image(
      image.natural_width(),
      image.natural_height(),
      &self.viewport.get(),
    );
    let overlay = self.renderer.render(&detections, &geometry);
    let boxes = overlay.boxes.len();

    self.status.set(summarize(&detections));
    info!(
      "第 {} 次提交完成: {} 个对象，显示 {}x{}，画布 {}x{}",
      seq,
      boxes,
      geometry.display_width,
      geometry.display_height,
      geometry.canvas_width,
      geometry.canvas_height
    );

    *self.scene.borrow_mut() = Some(Scene {
      seq,
      image,
      detections,
      overlay,
    });
    self.phase.set(Phase::Rendered);
    boxes
  }

  fn fail(&self, seq: u64, msg: String) -> Submission {
    error!("第 {} 次提交失败: {}", seq, msg);
    self.status.set(msg);
    self.phase.set(Phase::Failed);
    Submission::Failed { seq }
  }

  /// 视口变化：只重新计算几何信息并重绘当前检测结果，不重新检测
  pub fn resize(&self, viewport: Viewport) {
    self.viewport.set(viewport);

    let mut scene = self.scene.borrow_mut();
    let Some(scene) = scene.as_mut() else {
      return;
    };
    if scene.image.natural_width() == 0 {
      return;
    }

    let geometry = fit_canvas_to_image(
      scene.image.natural_width(),
      scene.image.natural_height(),
      &viewport,
    );
    debug!(
      "视口变化，画布调整为 {}x{}",
      geometry.canvas_width, geometry.canvas_height
    );
    scene.overlay = self.renderer.render(&scene.detections, &geometry);
  }
}
