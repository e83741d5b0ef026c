use color_eyre::Result;
use tracing::debug;

use super::{lock, SharedSlot};
use crate::api::{set_approval, Transaction};
use crate::fetch::Fetcher;

#[derive(Debug)]
struct Held {
  employee_id: String,
  transactions: Vec<Transaction>,
}

/// Transactions of a single employee.
///
/// Only one employee's list is held at a time. Asking for another employee
/// drops the held list before fetching, so a failed fetch leaves nothing
/// rather than the previous employee's list. Results are never paginated.
#[derive(Clone)]
pub struct TransactionsByEmployee {
  fetcher: Fetcher,
  slot: SharedSlot<Held>,
}

impl TransactionsByEmployee {
  pub fn new(fetcher: Fetcher) -> Self {
    Self {
      fetcher,
      slot: Default::default(),
    }
  }

  pub fn data(&self) -> Option<Vec<Transaction>> {
    lock(&self.slot)
      .data
      .as_ref()
      .map(|held| held.transactions.clone())
  }

  /// The held list, only if it belongs to `employee_id`
  pub fn data_for(&self, employee_id: &str) -> Option<Vec<Transaction>> {
    lock(&self.slot)
      .data
      .as_ref()
      .filter(|held| held.employee_id == employee_id)
      .map(|held| held.transactions.clone())
  }

  /// Which employee the held list belongs to
  pub fn employee_id(&self) -> Option<String> {
    lock(&self.slot)
      .data
      .as_ref()
      .map(|held| held.employee_id.clone())
  }

  pub fn loading(&self) -> bool {
    self.fetcher.loading()
  }

  pub async fn fetch_for(&self, employee_id: &str) -> Result<()> {
    let ticket = {
      let mut slot = lock(&self.slot);
      if slot
        .data
        .as_ref()
        .is_some_and(|held| held.employee_id != employee_id)
      {
        slot.data = None;
      }
      slot.begin()
    };
    let transactions = self.fetcher.transactions_by_employee(employee_id).await?;

    let held = Held {
      employee_id: employee_id.to_string(),
      transactions,
    };
    if !lock(&self.slot).settle(ticket, held) {
      debug!(employee_id, "Dropping superseded employee transactions");
    }
    Ok(())
  }

  /// Forget the held list. Cached responses are kept for reuse.
  pub fn invalidate(&self) {
    lock(&self.slot).invalidate();
  }

  /// Update the held copy of a transaction after an approval change
  pub fn patch_approval(&self, transaction_id: &str, approved: bool) -> bool {
    match lock(&self.slot).data.as_mut() {
      Some(held) => set_approval(&mut held.transactions, transaction_id, approved),
      None => false,
    }
  }
}
