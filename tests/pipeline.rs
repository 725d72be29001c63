// 该文件是 Kuangshi （框识） 项目的一部分。
// tests/pipeline.rs - 输入、检测与渲染流程测试
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

use std::{cell::Cell, io::Cursor, rc::Rc, time::Duration};

use image::{ImageFormat, Rgba, RgbaImage};

use kuangshi::{
  detection::{Detection, DetectionSet},
  detector::Detector,
  geometry::Viewport,
  input::{
    ClipboardItem, DecodedImage, ImageCrateDecoder, ImageDecoder, IngestError, InputEvent,
    InputFile,
  },
  model::{DetectionError, DetectionModel, ModelHandle, ModelLoadError, ModelLoader},
  output::draw::OverlayRenderer,
  session::{Phase, Session, Submission},
  status::StatusBoard,
};

/// 解码耗时由文件名前缀决定：`slow-` 200ms，其余 50ms
struct DelayedDecoder;

impl ImageDecoder for DelayedDecoder {
  async fn decode(&self, file: &InputFile) -> Result<DecodedImage, IngestError> {
    let delay = if file.name().starts_with("slow-") {
      200
    } else {
      50
    };
    tokio::time::sleep(Duration::from_millis(delay)).await;
    Ok(DecodedImage::new(file.name(), RgbaImage::new(400, 200)))
  }
}

/// 为每张图像返回一个以图像名命名的检测结果
struct EchoModel {
  loads: Rc<Cell<u32>>,
}

struct EchoHandle;

impl DetectionModel for EchoModel {
  type Handle = EchoHandle;

  async fn load(&self) -> Result<EchoHandle, ModelLoadError> {
    self.loads.set(self.loads.get() + 1);
    tokio::time::sleep(Duration::from_millis(30)).await;
    Ok(EchoHandle)
  }
}

impl ModelHandle for EchoHandle {
  async fn detect(&self, image: &DecodedImage) -> Result<DetectionSet, DetectionError> {
    let class_name = image.name().trim_end_matches(".png").to_string();
    Ok(DetectionSet::from(vec![Detection::new(
      class_name,
      0.8,
      [10.0, 10.0, 100.0, 50.0],
    )]))
  }
}

fn session_with<D: ImageDecoder>(decoder: D) -> (Session<EchoModel, D>, Rc<Cell<u32>>) {
  let loads = Rc::new(Cell::new(0));
  let loader = Rc::new(ModelLoader::new(
    EchoModel {
      loads: loads.clone(),
    },
    StatusBoard::new(),
  ));
  let session = Session::new(
    Detector::new(loader),
    decoder,
    OverlayRenderer::default(),
    Viewport::new(200.0, 2.0),
  );
  (session, loads)
}

fn png(name: &str) -> InputFile {
  InputFile::new(name, "image/png", vec![0u8])
}

#[tokio::test(start_paused = true)]
async fn later_submission_wins_over_slow_earlier_one() {
  let (session, loads) = session_with(DelayedDecoder);

  let (a, b) = tokio::join!(session.submit(png("slow-a.png")), async {
    tokio::time::sleep(Duration::from_millis(10)).await;
    session.submit(png("fast-b.png")).await
  });

  assert_eq!(a, Submission::Superseded { seq: 1 });
  assert_eq!(b, Submission::Rendered { seq: 2, boxes: 1 });
  assert_eq!(loads.get(), 1);

  let scene = session.scene();
  let scene = scene.as_ref().unwrap();
  assert_eq!(scene.seq, 2);
  assert_eq!(scene.image.name(), "fast-b.png");
  assert_eq!(scene.detections.iter().next().unwrap().class_name, "fast-b");
  assert_eq!(scene.overlay.items[0].label, "fast-b");
  assert_eq!(session.status().current(), "Found 1 objects. Top: fast-b (80%)");
  assert_eq!(session.phase(), Phase::Rendered);
}

#[tokio::test(start_paused = true)]
async fn earlier_submission_still_in_detection_is_discarded() {
  let (session, _) = session_with(DelayedDecoder);

  // A 解码完成后进入检测（等待模型加载），此时 B 提交
  let (a, b) = tokio::join!(session.submit(png("fast-a.png")), async {
    tokio::time::sleep(Duration::from_millis(60)).await;
    session.submit(png("fast-b.png")).await
  });

  assert_eq!(a, Submission::Superseded { seq: 1 });
  assert_eq!(b, Submission::Rendered { seq: 2, boxes: 1 });
  assert_eq!(session.scene().as_ref().unwrap().image.name(), "fast-b.png");
}

#[tokio::test(start_paused = true)]
async fn rejected_paste_does_not_supersede_in_flight_submission() {
  let (session, _) = session_with(DelayedDecoder);

  let (a, pasted) = tokio::join!(session.submit(png("slow-a.png")), async {
    tokio::time::sleep(Duration::from_millis(10)).await;
    let text = InputFile::new("notes.txt", "text/plain", b"hi".to_vec());
    session
      .handle_event(InputEvent::Paste(vec![ClipboardItem::File(text)]))
      .await
  });

  assert_eq!(pasted.submission, Some(Submission::Rejected));
  assert_eq!(a, Submission::Rendered { seq: 1, boxes: 1 });
}

#[tokio::test(start_paused = true)]
async fn geometry_and_detections_always_belong_to_the_same_image() {
  let (session, _) = session_with(DelayedDecoder);
  session.submit(png("first.png")).await;
  session.resize(Viewport::new(100.0, 1.0));

  let scene = session.scene();
  let scene = scene.as_ref().unwrap();
  let g = scene.overlay.geometry;
  assert_eq!(
    (g.natural_width, g.natural_height),
    (scene.image.natural_width(), scene.image.natural_height())
  );
  assert_eq!((g.display_width, g.display_height), (100, 50));
  // [10, 10, 100, 50] * 0.25
  let rect = scene.overlay.boxes[0].rect;
  assert_eq!((rect.x, rect.y, rect.width, rect.height), (3, 3, 25, 13));
}

fn encode_png(width: u32, height: u32) -> Vec<u8> {
  let image = RgbaImage::from_pixel(width, height, Rgba([90, 120, 200, 255]));
  let mut buf = Cursor::new(Vec::new());
  image.write_to(&mut buf, ImageFormat::Png).unwrap();
  buf.into_inner()
}

#[tokio::test]
async fn real_png_goes_through_the_whole_cycle() {
  let (session, _) = session_with(ImageCrateDecoder);
  let file = InputFile::new("street.png", "image/png", encode_png(800, 400));

  let response = session
    .handle_event(InputEvent::PickerChanged(vec![file]))
    .await;
  assert_eq!(
    response.submission,
    Some(Submission::Rendered { seq: 1, boxes: 1 })
  );

  let scene = session.scene();
  let scene = scene.as_ref().unwrap();
  assert_eq!(scene.overlay.geometry.display_width, 200);
  assert_eq!(scene.overlay.geometry.display_height, 100);
  assert_eq!(scene.overlay.canvas.dimensions(), (400, 200));
  assert_eq!(scene.overlay.boxes.len(), scene.detections.len());
}

#[tokio::test]
async fn failed_model_load_can_be_retried() {
  struct OnceBroken {
    calls: Rc<Cell<u32>>,
  }

  impl DetectionModel for OnceBroken {
    type Handle = EchoHandle;

    async fn load(&self) -> Result<EchoHandle, ModelLoadError> {
      let n = self.calls.get() + 1;
      self.calls.set(n);
      if n == 1 {
        Err(ModelLoadError::Io("network unreachable".into()))
      } else {
        Ok(EchoHandle)
      }
    }
  }

  let calls = Rc::new(Cell::new(0));
  let loader = Rc::new(ModelLoader::new(
    OnceBroken {
      calls: calls.clone(),
    },
    StatusBoard::new(),
  ));
  let session = Session::new(
    Detector::new(loader),
    DelayedDecoder,
    OverlayRenderer::default(),
    Viewport::default(),
  );

  assert_eq!(
    session.submit(png("a.png")).await,
    Submission::Failed { seq: 1 }
  );
  assert!(session.status().current().contains("network unreachable"));
  assert!(session.scene().is_none());

  assert_eq!(
    session.submit(png("b.png")).await,
    Submission::Rendered { seq: 2, boxes: 1 }
  );
  assert_eq!(calls.get(), 2);
}
