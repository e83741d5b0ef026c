use color_eyre::Result;
use tracing::debug;

use super::{lock, SharedSlot};
use crate::api::Employee;
use crate::fetch::Fetcher;

/// The employee list used to populate the filter
#[derive(Clone)]
pub struct Employees {
  fetcher: Fetcher,
  slot: SharedSlot<Vec<Employee>>,
}

impl Employees {
  pub fn new(fetcher: Fetcher) -> Self {
    Self {
      fetcher,
      slot: Default::default(),
    }
  }

  pub fn data(&self) -> Option<Vec<Employee>> {
    lock(&self.slot).data.clone()
  }

  pub fn loading(&self) -> bool {
    self.fetcher.loading()
  }

  pub async fn fetch_all(&self) -> Result<()> {
    let ticket = lock(&self.slot).begin();
    let employees = self.fetcher.employees().await?;

    if !lock(&self.slot).settle(ticket, employees) {
      debug!("Dropping superseded employee list");
    }
    Ok(())
  }

  pub fn invalidate(&self) {
    lock(&self.slot).invalidate();
  }
}
