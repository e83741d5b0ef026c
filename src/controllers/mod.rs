//! Collection controllers: one dataset each, with its own loading flag.
//!
//! Every controller owns a [`Fetcher`](crate::fetch::Fetcher) with a private
//! gate over the shared cache. Held data sits in a [`Slot`] whose generation
//! counter drops results that were superseded by a newer fetch or an
//! invalidation while they were in flight.

mod by_employee;
mod employees;
mod paginated;

use std::sync::{Arc, Mutex, MutexGuard};

pub use by_employee::TransactionsByEmployee;
pub use employees::Employees;
pub use paginated::PaginatedTransactions;

#[derive(Debug)]
struct Slot<T> {
  data: Option<T>,
  generation: u64,
}

impl<T> Default for Slot<T> {
  fn default() -> Self {
    Self {
      data: None,
      generation: 0,
    }
  }
}

impl<T> Slot<T> {
  /// Start a fetch. Any fetch started earlier is superseded.
  fn begin(&mut self) -> u64 {
    self.generation += 1;
    self.generation
  }

  fn is_current(&self, ticket: u64) -> bool {
    self.generation == ticket
  }

  /// Store a result unless its fetch was superseded. Returns whether it was stored.
  fn settle(&mut self, ticket: u64, data: T) -> bool {
    if !self.is_current(ticket) {
      return false;
    }
    self.data = Some(data);
    true
  }

  fn invalidate(&mut self) {
    self.data = None;
    self.generation += 1;
  }
}

type SharedSlot<T> = Arc<Mutex<Slot<T>>>;

// Every slot update is a single assignment, so a panic while the lock is held
// cannot leave a half-written slot and a poisoned lock is safe to reuse.
fn lock<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
  slot.lock().unwrap_or_else(|e| e.into_inner())
}
