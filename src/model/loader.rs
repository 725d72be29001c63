// 该文件是 Kuangshi （框识） 项目的一部分。
// src/model/loader.rs - 模型懒加载
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
  cell::{Cell, RefCell},
  rc::Rc,
  time::Instant,
};

use futures::{
  FutureExt,
  future::{LocalBoxFuture, Shared},
};
use tracing::{error, info};

use super::{DetectionModel, ModelLoadError};
use crate::status::StatusBoard;

type LoadResult<H> = Result<Rc<H>, ModelLoadError>;
type SharedLoad<H> = Shared<LocalBoxFuture<'static, LoadResult<H>>>;

/// 加载状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
  Uninitialized,
  Loading,
  Loaded,
}

/// 模型加载器
///
/// 第一次调用 [`ModelLoader::ensure_loaded`] 时开始加载，加载期间的所有调用
/// 共享同一个 future，得到同一个句柄。加载失败后清空缓存，下一次调用重新加载。
pub struct ModelLoader<M: DetectionModel> {
  model: Rc<M>,
  status: StatusBoard,
  slot: RefCell<Option<SharedLoad<M::Handle>>>,
  attempts: Cell<u32>,
}

impl<M: DetectionModel> ModelLoader<M> {
  pub fn new(model: M, status: StatusBoard) -> Self {
    Self {
      model: Rc::new(model),
      status,
      slot: RefCell::new(None),
      attempts: Cell::new(0),
    }
  }

  pub fn status(&self) -> &StatusBoard {
    &self.status
  }

  /// 已发起的加载次数
  pub fn load_attempts(&self) -> u32 {
    self.attempts.get()
  }

  pub fn state(&self) -> LoadState {
    match self.slot.borrow().as_ref() {
      None => LoadState::Uninitialized,
      Some(fut) => match fut.peek() {
        Some(Ok(_)) => LoadState::Loaded,
        // 失败的结果在等待者取回后即被清除
        Some(Err(_)) => LoadState::Uninitialized,
        None => LoadState::Loading,
      },
    }
  }

  pub async fn ensure_loaded(&self) -> Result<Rc<M::Handle>, ModelLoadError> {
    let fut = {
      let mut slot = self.slot.borrow_mut();
      match slot.as_ref() {
        Some(fut) => fut.clone(),
        None => {
          let fut = self.start_load();
          *slot = Some(fut.clone());
          fut
        }
      }
    };

    let result = fut.clone().await;

    if result.is_err() {
      let mut slot = self.slot.borrow_mut();
      if slot.as_ref().is_some_and(|current| current.ptr_eq(&fut)) {
        *slot = None;
      }
    }

    result
  }

  fn start_load(&self) -> SharedLoad<M::Handle> {
    let attempt = self.attempts.get() + 1;
    self.attempts.set(attempt);
    self.status.set("Loading model…");
    info!("开始加载模型 (第 {} 次)", attempt);

    let model = Rc::clone(&self.model);
    let status = self.status.clone();
    async move {
      let started_at = Instant::now();
      match model.load().await {
        Ok(handle) => {
          let ms = started_at.elapsed().as_millis();
          info!("模型加载完成，耗时: {} ms", ms);
          status.set(format!("Model loaded in {} ms. Ready.", ms));
          Ok(Rc::new(handle))
        }
        Err(e) => {
          error!("模型加载失败: {}", e);
          status.set(format!("Failed to load model: {}", e));
          Err(e)
        }
      }
    }
    .boxed_local()
    .shared()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    detection::DetectionSet,
    input::DecodedImage,
    model::{DetectionError, ModelHandle},
  };
  use std::time::Duration;

  #[derive(Debug)]
  struct Handle;

  impl ModelHandle for Handle {
    async fn detect(&self, _image: &DecodedImage) -> Result<DetectionSet, DetectionError> {
      Ok(DetectionSet::empty())
    }
  }

  /// 前 `failures` 次加载失败
  struct FlakyModel {
    calls: Rc<Cell<u32>>,
    failures: u32,
  }

  impl DetectionModel for FlakyModel {
    type Handle = Handle;

    async fn load(&self) -> Result<Handle, ModelLoadError> {
      let n = self.calls.get() + 1;
      self.calls.set(n);
      tokio::time::sleep(Duration::from_millis(100)).await;
      if n <= self.failures {
        Err(ModelLoadError::Other(format!("attempt {}", n)))
      } else {
        Ok(Handle)
      }
    }
  }

  fn loader(failures: u32) -> (ModelLoader<FlakyModel>, Rc<Cell<u32>>) {
    let calls = Rc::new(Cell::new(0));
    let model = FlakyModel {
      calls: calls.clone(),
      failures,
    };
    (ModelLoader::new(model, StatusBoard::new()), calls)
  }

  #[tokio::test(start_paused = true)]
  async fn concurrent_callers_share_one_load() {
    let (loader, calls) = loader(0);
    assert_eq!(loader.state(), LoadState::Uninitialized);

    let results = futures::future::join_all((0..8).map(|_| loader.ensure_loaded())).await;
    let handles: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(calls.get(), 1);
    assert_eq!(loader.load_attempts(), 1);
    assert!(handles.windows(2).all(|w| Rc::ptr_eq(&w[0], &w[1])));
    assert_eq!(loader.state(), LoadState::Loaded);
    assert!(loader.status().current().starts_with("Model loaded in"));

    // 之后的调用复用缓存
    let again = loader.ensure_loaded().await.unwrap();
    assert!(Rc::ptr_eq(&again, &handles[0]));
    assert_eq!(calls.get(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn failed_load_is_not_cached_as_ready() {
    let (loader, calls) = loader(1);

    let (a, b) = tokio::join!(loader.ensure_loaded(), loader.ensure_loaded());
    assert_eq!(a.unwrap_err(), ModelLoadError::Other("attempt 1".into()));
    assert_eq!(b.unwrap_err(), ModelLoadError::Other("attempt 1".into()));
    assert_eq!(calls.get(), 1);
    assert_eq!(loader.state(), LoadState::Uninitialized);
    assert!(loader.status().current().starts_with("Failed to load model"));

    // 重试会重新加载
    assert!(loader.ensure_loaded().await.is_ok());
    assert_eq!(calls.get(), 2);
    assert_eq!(loader.state(), LoadState::Loaded);
  }

  #[tokio::test(start_paused = true)]
  async fn status_reports_loading_while_in_flight() {
    let (loader, _calls) = loader(0);
    let fut = loader.ensure_loaded();
    futures::pin_mut!(fut);
    assert!(futures::poll!(fut.as_mut()).is_pending());
    assert_eq!(loader.status().current(), "Loading model…");
    assert_eq!(loader.state(), LoadState::Loading);
    fut.await.unwrap();
  }
}
