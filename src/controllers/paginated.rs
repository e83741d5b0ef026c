use color_eyre::Result;
use tracing::debug;

use super::{lock, SharedSlot};
use crate::api::{set_approval, PaginatedResult, Transaction};
use crate::fetch::Fetcher;

/// Outcome of one attempt to advance the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
  /// A page was fetched and appended
  Appended,
  /// The last page is already held
  Exhausted,
  /// The page arrived after a newer fetch or an invalidation and was dropped
  Superseded,
}

#[derive(Debug)]
struct Accumulated {
  result: PaginatedResult<Transaction>,
  pages: u32,
}

/// All transactions, accumulated page by page.
///
/// Held data is the concatenation of every fetched page in fetch order, with
/// `next_page` taken from the most recent page.
#[derive(Clone)]
pub struct PaginatedTransactions {
  fetcher: Fetcher,
  slot: SharedSlot<Accumulated>,
}

impl PaginatedTransactions {
  pub fn new(fetcher: Fetcher) -> Self {
    Self {
      fetcher,
      slot: Default::default(),
    }
  }

  pub fn data(&self) -> Option<PaginatedResult<Transaction>> {
    lock(&self.slot).data.as_ref().map(|held| held.result.clone())
  }

  pub fn loading(&self) -> bool {
    self.fetcher.loading()
  }

  /// True once the last page is held
  pub fn is_exhausted(&self) -> bool {
    lock(&self.slot)
      .data
      .as_ref()
      .is_some_and(|held| held.result.is_last())
  }

  /// Number of pages accumulated since the last invalidation
  pub fn pages_held(&self) -> u32 {
    lock(&self.slot).data.as_ref().map_or(0, |held| held.pages)
  }

  /// Fetch the page after the ones already held, or page 0 when nothing is held.
  ///
  /// No-op once the last page is held.
  pub async fn fetch_next(&self) -> Result<()> {
    self.advance().await.map(|_| ())
  }

  /// Fetch pages until the last one is held.
  ///
  /// A failing page stops the loop; pages fetched before it stay held.
  pub async fn fetch_all(&self) -> Result<()> {
    while self.advance().await? == Advance::Appended {}
    Ok(())
  }

  /// Fetch until at least `pages` pages are held or the last page is reached.
  pub async fn fetch_through(&self, pages: u32) -> Result<()> {
    while self.pages_held() < pages && self.advance().await? == Advance::Appended {}
    Ok(())
  }

  /// Forget held pages. The next fetch starts again from page 0.
  pub fn invalidate(&self) {
    lock(&self.slot).invalidate();
  }

  /// Update the held copy of a transaction after an approval change
  pub fn patch_approval(&self, transaction_id: &str, approved: bool) -> bool {
    match lock(&self.slot).data.as_mut() {
      Some(held) => set_approval(&mut held.result.data, transaction_id, approved),
      None => false,
    }
  }

  async fn advance(&self) -> Result<Advance> {
    let (ticket, page) = {
      let mut slot = lock(&self.slot);
      let page = match &slot.data {
        None => 0,
        Some(held) => match held.result.next_page {
          Some(next) => next,
          None => return Ok(Advance::Exhausted),
        },
      };
      (slot.begin(), page)
    };

    let fetched = self.fetcher.transactions_page(page).await?;

    let mut slot = lock(&self.slot);
    if !slot.is_current(ticket) {
      debug!(page, "Dropping superseded transactions page");
      return Ok(Advance::Superseded);
    }

    let merged = match slot.data.take() {
      Some(mut held) => {
        held.result.data.extend(fetched.data);
        held.result.next_page = fetched.next_page;
        held.pages += 1;
        held
      }
      None => Accumulated {
        result: fetched,
        pages: 1,
      },
    };
    slot.settle(ticket, merged);

    Ok(Advance::Appended)
  }
}
