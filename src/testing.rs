//! Scripted transport shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use url::Url;

use crate::cache::{RawResponse, Transport};
use crate::error::{Error, Result};

struct Step {
  gate: Option<oneshot::Receiver<()>>,
  response: Result<RawResponse>,
}

/// Answers requests in script order, optionally holding each one until its
/// gate is released. With the script exhausted it answers `200 {}`.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
  calls: Arc<AtomicUsize>,
  urls: Arc<Mutex<Vec<String>>>,
  script: Arc<Mutex<VecDeque<Step>>>,
}

impl MockTransport {
  pub(crate) fn respond(&self, status: u16, body: &str) {
    self.push(None, Ok(raw(status, body)));
  }

  pub(crate) fn respond_gated(&self, status: u16, body: &str) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel();
    self.push(Some(rx), Ok(raw(status, body)));
    tx
  }

  pub(crate) fn fail(&self, message: &str) {
    self.push(None, Err(Error::Transport(message.to_string())));
  }

  pub(crate) fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub(crate) fn urls(&self) -> MutexGuard<'_, Vec<String>> {
    self.urls.lock().unwrap()
  }

  fn push(&self, gate: Option<oneshot::Receiver<()>>, response: Result<RawResponse>) {
    self
      .script
      .lock()
      .unwrap()
      .push_back(Step { gate, response });
  }
}

impl Transport for MockTransport {
  async fn get(&self, url: Url) -> Result<RawResponse> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.urls.lock().unwrap().push(url.to_string());

    let step = self.script.lock().unwrap().pop_front();
    let Some(step) = step else {
      return Ok(raw(200, "{}"));
    };
    if let Some(gate) = step.gate {
      let _ = gate.await;
    }
    step.response
  }
}

fn raw(status: u16, body: &str) -> RawResponse {
  RawResponse {
    status,
    body: body.as_bytes().to_vec(),
  }
}
