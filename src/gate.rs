//! Busy tracking around remote calls.
//!
//! A [`Gate`] counts the calls running through it. `loading()` is true while
//! any call is outstanding, so callers sharing a gate see one busy period
//! spanning the union of their calls.

use color_eyre::Result;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Gate {
  in_flight: Arc<AtomicUsize>,
}

impl Gate {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn loading(&self) -> bool {
    self.in_flight.load(Ordering::SeqCst) > 0
  }

  /// Run `thunk` with the gate marked busy.
  ///
  /// Errors are returned unchanged. The busy mark is released on success,
  /// on error, and when the returned future is dropped before completion.
  pub async fn run<T, F, Fut>(&self, thunk: F) -> Result<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let _busy = BusyGuard::acquire(&self.in_flight);
    thunk().await
  }
}

struct BusyGuard<'a> {
  counter: &'a AtomicUsize,
}

impl<'a> BusyGuard<'a> {
  fn acquire(counter: &'a AtomicUsize) -> Self {
    counter.fetch_add(1, Ordering::SeqCst);
    Self { counter }
  }
}

impl Drop for BusyGuard<'_> {
  fn drop(&mut self) {
    self.counter.fetch_sub(1, Ordering::SeqCst);
  }
}
