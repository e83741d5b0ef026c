//! Composes the controllers into the single transaction list a front end shows.

use color_eyre::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::api::{Employee, Endpoint, Transaction};
use crate::controllers::{Employees, PaginatedTransactions, TransactionsByEmployee};
use crate::fetch::Fetcher;

/// Which controller owns the visible list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewMode {
  /// Nothing selected yet, employees not loaded
  #[default]
  Initial,
  /// No filter: the paginated controller is authoritative
  AllTransactions,
  /// Filtered to one employee: the by-employee controller is authoritative
  Employee(String),
}

/// View state machine over the employee, paginated and by-employee controllers.
///
/// Switching to one transaction source invalidates the held data of the
/// other before fetching, so at most one of them is ever shown. Cached
/// responses survive the switch: returning to the unfiltered list replays
/// as many pages as were accumulated before the filter, from the cache.
#[derive(Clone)]
pub struct ViewCoordinator {
  employees: Employees,
  paginated: PaginatedTransactions,
  by_employee: TransactionsByEmployee,
  approvals: Fetcher,
  mode: Arc<Mutex<ViewMode>>,
  /// Pages of the unfiltered list to restore when leaving a filter
  resume_pages: Arc<AtomicU32>,
}

impl ViewCoordinator {
  pub fn new(fetcher: Fetcher) -> Self {
    Self {
      employees: Employees::new(fetcher.with_new_gate()),
      paginated: PaginatedTransactions::new(fetcher.with_new_gate()),
      by_employee: TransactionsByEmployee::new(fetcher.with_new_gate()),
      approvals: fetcher.with_new_gate(),
      mode: Arc::new(Mutex::new(ViewMode::Initial)),
      resume_pages: Arc::new(AtomicU32::new(0)),
    }
  }

  // The mode is replaced whole, so a poisoned lock still holds a valid mode.
  fn mode_lock(&self) -> MutexGuard<'_, ViewMode> {
    self.mode.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn set_mode(&self, mode: ViewMode) {
    let mut current = self.mode_lock();
    if *current != mode {
      info!(from = ?current, to = ?mode, "View mode changed");
      *current = mode;
    }
  }

  pub fn mode(&self) -> ViewMode {
    self.mode_lock().clone()
  }

  pub fn employees(&self) -> &Employees {
    &self.employees
  }

  pub fn paginated(&self) -> &PaginatedTransactions {
    &self.paginated
  }

  pub fn by_employee(&self) -> &TransactionsByEmployee {
    &self.by_employee
  }

  /// Initial load, run once the front end is ready.
  ///
  /// Does nothing if employees are already loaded or loading.
  pub async fn mount(&self) -> Result<()> {
    if self.employees.data().is_none() && !self.employees.loading() {
      self.load_all_transactions().await?;
    }
    Ok(())
  }

  /// Apply a filter selection; the sentinel employee means "all".
  pub async fn select_employee(&self, employee: &Employee) -> Result<()> {
    if employee.is_all() {
      self.load_all_transactions().await
    } else {
      self.load_transactions_by_employee(&employee.id).await
    }
  }

  /// Show all transactions: employees first, then the paginated list.
  ///
  /// Coming back from a filter restores the pages held before it (page 0
  /// at least). Already unfiltered, this advances by one page. Nothing is
  /// fetched if a filter was selected while employees were loading.
  pub async fn load_all_transactions(&self) -> Result<()> {
    self.by_employee.invalidate();
    self.set_mode(ViewMode::AllTransactions);

    self.employees.fetch_all().await?;
    if self.mode() != ViewMode::AllTransactions {
      debug!("Filter selected while employees were loading, skipping page fetch");
      return Ok(());
    }

    if self.paginated.data().is_some() {
      return self.paginated.fetch_next().await;
    }
    let pages = self.resume_pages.swap(0, Ordering::SeqCst).max(1);
    self.paginated.fetch_through(pages).await
  }

  pub async fn load_transactions_by_employee(&self, employee_id: &str) -> Result<()> {
    let held = self.paginated.pages_held();
    if held > 0 {
      self.resume_pages.store(held, Ordering::SeqCst);
    }
    self.paginated.invalidate();
    self.set_mode(ViewMode::Employee(employee_id.to_string()));

    self.by_employee.fetch_for(employee_id).await
  }

  /// Advance the unfiltered list by one page. No-op while filtered.
  pub async fn load_more(&self) -> Result<()> {
    if self.mode() != ViewMode::AllTransactions {
      return Ok(());
    }
    self.paginated.fetch_next().await
  }

  /// Change approval on the backend and everywhere it is held locally.
  pub async fn set_transaction_approval(&self, transaction_id: &str, value: bool) -> Result<()> {
    self
      .approvals
      .set_transaction_approval(transaction_id, value)
      .await?;

    self.paginated.patch_approval(transaction_id, value);
    self.by_employee.patch_approval(transaction_id, value);
    Ok(())
  }

  /// Drop cached transaction lists and reload the current view.
  ///
  /// Employees stay cached. In the initial state this is a mount.
  pub async fn refresh(&self) -> Result<()> {
    let dropped = self.approvals.clear_cache_by_endpoint(&[
      Endpoint::PaginatedTransactions,
      Endpoint::TransactionsByEmployee,
    ])?;
    debug!(dropped, "Cleared cached transaction lists");

    self.resume_pages.store(0, Ordering::SeqCst);
    self.paginated.invalidate();
    self.by_employee.invalidate();

    match self.mode() {
      ViewMode::Initial => self.mount().await,
      ViewMode::AllTransactions => self.load_all_transactions().await,
      ViewMode::Employee(id) => self.load_transactions_by_employee(&id).await,
    }
  }

  /// The list to show, or `None` while there is nothing to show yet.
  pub fn visible_transactions(&self) -> Option<Vec<Transaction>> {
    match self.mode() {
      ViewMode::Initial => None,
      ViewMode::AllTransactions => self.paginated.data().map(|page| page.data),
      ViewMode::Employee(id) => self.by_employee.data_for(&id),
    }
  }

  /// Whether the "load more" affordance should be hidden.
  ///
  /// A filtered list counts as complete once the selected employee's list is
  /// held, since per-employee results are not paginated.
  pub fn all_transactions_loaded(&self) -> bool {
    match self.mode() {
      ViewMode::Employee(id) => self.by_employee.data_for(&id).is_some(),
      _ => self.paginated.is_exhausted(),
    }
  }

  /// Whether "load more" should be disabled because something is loading
  pub fn load_more_disabled(&self) -> bool {
    self.paginated.loading() || self.by_employee.loading() || self.employees.loading()
  }

  pub fn employees_loading(&self) -> bool {
    self.employees.loading()
  }

  pub fn approval_loading(&self) -> bool {
    self.approvals.loading()
  }

  /// Filter choices: the sentinel followed by every employee, or nothing
  /// while employees are not loaded.
  pub fn employee_options(&self) -> Vec<Employee> {
    match self.employees.data() {
      Some(employees) => std::iter::once(Employee::all()).chain(employees).collect(),
      None => Vec::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{MockBackend, MockData, PaginatedResult};
  use crate::cache::{CacheKey, ResponseCache};
  use std::time::Duration;

  const JAMES: &str = "4a7b6c01";
  const MARY: &str = "9c2e1d02";

  fn setup() -> (Arc<MockBackend>, ViewCoordinator) {
    let backend = Arc::new(MockBackend::load(None).unwrap());
    let coordinator = ViewCoordinator::new(Fetcher::new(backend.clone(), ResponseCache::new()));
    (backend, coordinator)
  }

  fn visible_ids(coordinator: &ViewCoordinator) -> Vec<String> {
    coordinator
      .visible_transactions()
      .unwrap_or_default()
      .into_iter()
      .map(|t| t.id)
      .collect()
  }

  fn employee(id: &str) -> Employee {
    Employee {
      id: id.to_string(),
      first_name: String::new(),
      last_name: String::new(),
    }
  }

  #[tokio::test]
  async fn test_mount_loads_employees_and_first_page() {
    let (backend, coordinator) = setup();
    assert_eq!(coordinator.mode(), ViewMode::Initial);
    assert!(coordinator.visible_transactions().is_none());
    assert!(coordinator.employee_options().is_empty());

    coordinator.mount().await.unwrap();

    assert_eq!(coordinator.mode(), ViewMode::AllTransactions);
    assert_eq!(visible_ids(&coordinator).len(), 5);
    assert_eq!(coordinator.employee_options().len(), 5);
    assert!(coordinator.employee_options()[0].is_all());
    assert!(!coordinator.all_transactions_loaded());

    // A second mount does nothing
    coordinator.mount().await.unwrap();
    assert_eq!(backend.total_calls(), 2);
  }

  #[tokio::test]
  async fn test_load_more_until_exhausted() {
    let (_, coordinator) = setup();
    coordinator.mount().await.unwrap();

    coordinator.load_more().await.unwrap();
    assert!(!coordinator.all_transactions_loaded());
    coordinator.load_more().await.unwrap();

    assert_eq!(visible_ids(&coordinator).len(), 12);
    assert!(coordinator.all_transactions_loaded());
  }

  #[tokio::test]
  async fn test_filter_round_trip_reuses_cache() {
    let (backend, coordinator) = setup();
    coordinator.mount().await.unwrap();
    coordinator.load_more().await.unwrap();
    let original = visible_ids(&coordinator);
    assert_eq!(original.len(), 10);

    coordinator.select_employee(&employee(JAMES)).await.unwrap();
    assert_eq!(coordinator.mode(), ViewMode::Employee(JAMES.to_string()));
    assert!(coordinator.paginated().data().is_none());
    assert_eq!(visible_ids(&coordinator), vec!["tx-0001", "tx-0004", "tx-0009"]);
    assert!(coordinator.all_transactions_loaded());

    coordinator.select_employee(&Employee::all()).await.unwrap();
    assert_eq!(coordinator.mode(), ViewMode::AllTransactions);
    assert!(coordinator.by_employee().data().is_none());
    assert_eq!(visible_ids(&coordinator), original);
    assert!(!coordinator.all_transactions_loaded());

    assert_eq!(backend.calls(Endpoint::Employees), 1);
    assert_eq!(backend.calls(Endpoint::PaginatedTransactions), 2);
    assert_eq!(backend.calls(Endpoint::TransactionsByEmployee), 1);

    // Already unfiltered: the sentinel advances by one page
    coordinator.select_employee(&Employee::all()).await.unwrap();
    assert_eq!(visible_ids(&coordinator).len(), 12);
  }

  #[tokio::test]
  async fn test_round_trip_through_two_filters_keeps_page_count() {
    let (backend, coordinator) = setup();
    coordinator.mount().await.unwrap();
    coordinator.load_more().await.unwrap();

    coordinator.select_employee(&employee(JAMES)).await.unwrap();
    coordinator.select_employee(&employee(MARY)).await.unwrap();
    coordinator.select_employee(&Employee::all()).await.unwrap();

    assert_eq!(visible_ids(&coordinator).len(), 10);
    assert_eq!(backend.calls(Endpoint::PaginatedTransactions), 2);
  }

  #[tokio::test]
  async fn test_failed_switch_never_shows_previous_employee() {
    let (backend, coordinator) = setup();
    coordinator.mount().await.unwrap();
    coordinator.select_employee(&employee(MARY)).await.unwrap();

    backend.fail_next(Endpoint::TransactionsByEmployee);
    assert!(coordinator.select_employee(&employee(JAMES)).await.is_err());

    assert_eq!(coordinator.mode(), ViewMode::Employee(JAMES.to_string()));
    assert!(coordinator.visible_transactions().is_none());
    assert!(!coordinator.all_transactions_loaded());

    coordinator.select_employee(&employee(JAMES)).await.unwrap();
    assert!(coordinator
      .visible_transactions()
      .unwrap()
      .iter()
      .all(|t| t.employee.id == JAMES));
  }

  #[tokio::test]
  async fn test_load_more_ignored_while_filtered() {
    let (backend, coordinator) = setup();
    coordinator.mount().await.unwrap();
    coordinator
      .load_transactions_by_employee(JAMES)
      .await
      .unwrap();

    coordinator.load_more().await.unwrap();

    assert!(coordinator.paginated().data().is_none());
    assert_eq!(backend.calls(Endpoint::PaginatedTransactions), 1);
  }

  #[tokio::test]
  async fn test_approval_updates_cache_and_visible_list() {
    let (backend, coordinator) = setup();
    coordinator.mount().await.unwrap();
    coordinator
      .load_transactions_by_employee(JAMES)
      .await
      .unwrap();

    coordinator
      .set_transaction_approval("tx-0004", true)
      .await
      .unwrap();

    let visible = coordinator.visible_transactions().unwrap();
    assert!(visible.iter().find(|t| t.id == "tx-0004").unwrap().approved);

    coordinator.load_all_transactions().await.unwrap();
    let visible = coordinator.visible_transactions().unwrap();
    assert!(visible.iter().find(|t| t.id == "tx-0004").unwrap().approved);

    assert_eq!(backend.calls(Endpoint::SetTransactionApproval), 1);
    assert_eq!(backend.calls(Endpoint::PaginatedTransactions), 1);
    assert!(!coordinator.approval_loading());
  }

  #[tokio::test]
  async fn test_approval_patches_held_page() {
    let (_, coordinator) = setup();
    coordinator.mount().await.unwrap();

    coordinator
      .set_transaction_approval("tx-0001", true)
      .await
      .unwrap();

    let held = coordinator.paginated().data().unwrap();
    assert!(held.data[0].approved);
  }

  #[tokio::test]
  async fn test_two_page_scenario() {
    let template = MockBackend::load(None).unwrap().transaction("tx-0001").unwrap();
    let make = |id: &str| Transaction {
      id: id.to_string(),
      ..template.clone()
    };
    let data = MockData {
      employees: Vec::new(),
      transactions: vec![make("T1"), make("T2"), make("T3")],
    };
    let backend = Arc::new(MockBackend::new(data).with_page_size(2));
    let coordinator = ViewCoordinator::new(Fetcher::new(backend, ResponseCache::new()));

    coordinator.mount().await.unwrap();
    coordinator.paginated().fetch_all().await.unwrap();

    assert_eq!(
      coordinator.paginated().data().unwrap(),
      PaginatedResult {
        data: vec![make("T1"), make("T2"), make("T3")],
        next_page: None,
      }
    );
    assert!(coordinator.all_transactions_loaded());
  }

  #[tokio::test]
  async fn test_approval_reaches_page_and_employee_entries_with_one_call() {
    let (backend, coordinator) = setup();
    coordinator.mount().await.unwrap();
    coordinator
      .load_transactions_by_employee(JAMES)
      .await
      .unwrap();

    coordinator
      .set_transaction_approval("tx-0004", true)
      .await
      .unwrap();

    let cache = coordinator.approvals.cache();
    let page_entry = cache
      .get(&CacheKey::new(
        Endpoint::PaginatedTransactions,
        Some(&serde_json::json!({ "page": 0 })),
      ))
      .unwrap()
      .unwrap();
    let list_entry = cache
      .get(&CacheKey::new(
        Endpoint::TransactionsByEmployee,
        Some(&serde_json::json!({ "employeeId": JAMES })),
      ))
      .unwrap()
      .unwrap();

    let page: PaginatedResult<Transaction> = page_entry.decode().unwrap();
    let list: Vec<Transaction> = list_entry.decode().unwrap();
    assert!(page.data.iter().find(|t| t.id == "tx-0004").unwrap().approved);
    assert!(list.iter().find(|t| t.id == "tx-0004").unwrap().approved);
    assert_eq!(backend.calls(Endpoint::SetTransactionApproval), 1);
  }

  #[tokio::test]
  async fn test_loading_flags_settle_after_failures() {
    let (backend, coordinator) = setup();

    backend.fail_next(Endpoint::Employees);
    assert!(coordinator.mount().await.is_err());
    assert!(!coordinator.employees_loading());

    coordinator.mount().await.unwrap();

    backend.fail_next(Endpoint::PaginatedTransactions);
    assert!(coordinator.load_more().await.is_err());

    backend.fail_next(Endpoint::TransactionsByEmployee);
    assert!(coordinator
      .load_transactions_by_employee(JAMES)
      .await
      .is_err());

    backend.fail_next(Endpoint::SetTransactionApproval);
    assert!(coordinator
      .set_transaction_approval("tx-0001", true)
      .await
      .is_err());

    assert!(!coordinator.load_more_disabled());
    assert!(!coordinator.approval_loading());
  }

  #[tokio::test]
  async fn test_refresh_refetches_current_view_only() {
    let (backend, coordinator) = setup();
    coordinator.mount().await.unwrap();
    coordinator.load_more().await.unwrap();
    assert_eq!(visible_ids(&coordinator).len(), 10);

    coordinator.refresh().await.unwrap();

    // Back to a single fresh page; employees come from the cache
    assert_eq!(visible_ids(&coordinator).len(), 5);
    assert_eq!(backend.calls(Endpoint::PaginatedTransactions), 3);
    assert_eq!(backend.calls(Endpoint::Employees), 1);

    coordinator
      .load_transactions_by_employee(JAMES)
      .await
      .unwrap();
    coordinator.refresh().await.unwrap();
    assert_eq!(coordinator.mode(), ViewMode::Employee(JAMES.to_string()));
    assert_eq!(backend.calls(Endpoint::TransactionsByEmployee), 2);
  }

  #[tokio::test]
  async fn test_stale_page_does_not_override_filter() {
    let backend = Arc::new(
      MockBackend::load(None)
        .unwrap()
        .with_latency(Duration::from_millis(20)),
    );
    let coordinator = ViewCoordinator::new(Fetcher::new(backend, ResponseCache::new()));

    let switch = async {
      // Employees resolve at ~20ms, the first page is in flight until ~40ms
      tokio::time::sleep(Duration::from_millis(30)).await;
      coordinator.load_transactions_by_employee(JAMES).await
    };
    let (all, filtered) = tokio::join!(coordinator.load_all_transactions(), switch);
    all.unwrap();
    filtered.unwrap();

    assert_eq!(coordinator.mode(), ViewMode::Employee(JAMES.to_string()));
    assert!(coordinator.paginated().data().is_none());
    assert_eq!(visible_ids(&coordinator).len(), 3);
  }

  #[tokio::test]
  async fn test_filter_during_employee_load_skips_first_page() {
    let backend = Arc::new(
      MockBackend::load(None)
        .unwrap()
        .with_latency(Duration::from_millis(20)),
    );
    let coordinator = ViewCoordinator::new(Fetcher::new(backend.clone(), ResponseCache::new()));

    let switch = async {
      // Employees are still in flight until ~20ms
      tokio::time::sleep(Duration::from_millis(5)).await;
      coordinator.load_transactions_by_employee(JAMES).await
    };
    let (all, filtered) = tokio::join!(coordinator.load_all_transactions(), switch);
    all.unwrap();
    filtered.unwrap();

    assert_eq!(coordinator.mode(), ViewMode::Employee(JAMES.to_string()));
    assert!(coordinator.paginated().data().is_none());
    assert_eq!(backend.calls(Endpoint::PaginatedTransactions), 0);

    coordinator.select_employee(&Employee::all()).await.unwrap();
    assert_eq!(visible_ids(&coordinator).len(), 5);
  }
}
