//! In-memory backend serving fixture data.

use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use super::types::{
  Employee, Endpoint, PaginatedRequestParams, PaginatedResult, RequestByEmployeeParams,
  SetTransactionApprovalParams, Transaction,
};
use super::Transport;

const DEFAULT_DATA: &str = include_str!("../../data/mock_data.json");

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Fixture records backing the mock backend
#[derive(Debug, Clone, Deserialize)]
pub struct MockData {
  pub employees: Vec<Employee>,
  pub transactions: Vec<Transaction>,
}

/// Backend stand-in with injectable latency, call counters and failures.
pub struct MockBackend {
  data: Mutex<MockData>,
  latency: Duration,
  page_size: usize,
  calls: Mutex<HashMap<Endpoint, usize>>,
  failures: Mutex<HashSet<Endpoint>>,
}

impl MockBackend {
  pub fn new(data: MockData) -> Self {
    Self {
      data: Mutex::new(data),
      latency: Duration::ZERO,
      page_size: DEFAULT_PAGE_SIZE,
      calls: Mutex::new(HashMap::new()),
      failures: Mutex::new(HashSet::new()),
    }
  }

  /// Load fixtures from a JSON file, or the bundled set when no path is given.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let contents = match path {
      Some(p) => std::fs::read_to_string(p)
        .map_err(|e| eyre!("Failed to read mock data {}: {}", p.display(), e))?,
      None => DEFAULT_DATA.to_string(),
    };

    let data: MockData =
      serde_json::from_str(&contents).map_err(|e| eyre!("Failed to parse mock data: {}", e))?;

    Ok(Self::new(data))
  }

  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  pub fn with_page_size(mut self, page_size: usize) -> Self {
    self.page_size = page_size.max(1);
    self
  }

  /// Number of calls received for an endpoint, failed ones included
  pub fn calls(&self, endpoint: Endpoint) -> usize {
    lock(&self.calls).get(&endpoint).copied().unwrap_or(0)
  }

  pub fn total_calls(&self) -> usize {
    lock(&self.calls).values().sum()
  }

  /// Make the next call to `endpoint` fail
  pub fn fail_next(&self, endpoint: Endpoint) {
    lock(&self.failures).insert(endpoint);
  }

  /// Current stored state of a transaction
  pub fn transaction(&self, transaction_id: &str) -> Option<Transaction> {
    lock(&self.data)
      .transactions
      .iter()
      .find(|t| t.id == transaction_id)
      .cloned()
  }

  async fn handle(&self, endpoint: Endpoint, params: Option<Value>) -> Result<Value> {
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }

    *lock(&self.calls).entry(endpoint).or_default() += 1;
    debug!(%endpoint, ?params, "mock call");

    if lock(&self.failures).remove(&endpoint) {
      return Err(eyre!("{} failed: backend unavailable", endpoint));
    }

    match endpoint {
      Endpoint::Employees => Ok(serde_json::to_value(&lock(&self.data).employees)?),
      Endpoint::PaginatedTransactions => {
        let params: PaginatedRequestParams = parse_params(endpoint, params)?;
        let page = params.page.ok_or_else(|| eyre!("Page is null"))?;
        Ok(serde_json::to_value(self.page(page)?)?)
      }
      Endpoint::TransactionsByEmployee => {
        let params: RequestByEmployeeParams = parse_params(endpoint, params)?;
        if params.employee_id.is_empty() {
          return Err(eyre!("Employee id cannot be empty"));
        }
        let transactions: Vec<Transaction> = lock(&self.data)
          .transactions
          .iter()
          .filter(|t| t.employee.id == params.employee_id)
          .cloned()
          .collect();
        Ok(serde_json::to_value(transactions)?)
      }
      Endpoint::SetTransactionApproval => {
        let params: SetTransactionApprovalParams = parse_params(endpoint, params)?;
        let mut data = lock(&self.data);
        let transaction = data
          .transactions
          .iter_mut()
          .find(|t| t.id == params.transaction_id)
          .ok_or_else(|| eyre!("Invalid transaction to approve: {}", params.transaction_id))?;
        transaction.approved = params.value;
        Ok(Value::Null)
      }
    }
  }

  fn page(&self, page: u32) -> Result<PaginatedResult<Transaction>> {
    let data = lock(&self.data);
    let total = data.transactions.len();
    let start = (page as usize)
      .checked_mul(self.page_size)
      .filter(|start| *start < total || page == 0)
      .ok_or_else(|| eyre!("Invalid page {}", page))?;

    let end = start.saturating_add(self.page_size).min(total);
    Ok(PaginatedResult {
      data: data.transactions[start..end].to_vec(),
      next_page: (end < total).then_some(page + 1),
    })
  }
}

impl Transport for MockBackend {
  fn call(&self, endpoint: Endpoint, params: Option<Value>) -> BoxFuture<'_, Result<Value>> {
    self.handle(endpoint, params).boxed()
  }
}

fn parse_params<P: serde::de::DeserializeOwned>(
  endpoint: Endpoint,
  params: Option<Value>,
) -> Result<P> {
  let params = params.ok_or_else(|| eyre!("{} requires params", endpoint))?;
  serde_json::from_value(params).map_err(|e| eyre!("Invalid params for {}: {}", endpoint, e))
}

// Fixture state is only mutated by single field writes, so poisoning is harmless.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(|e| e.into_inner())
}
