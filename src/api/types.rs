use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote operations exposed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
  Employees,
  PaginatedTransactions,
  TransactionsByEmployee,
  SetTransactionApproval,
}

impl Endpoint {
  /// Wire name, also the prefix of every cache key for this endpoint
  pub fn name(self) -> &'static str {
    match self {
      Endpoint::Employees => "employees",
      Endpoint::PaginatedTransactions => "paginatedTransactions",
      Endpoint::TransactionsByEmployee => "transactionsByEmployee",
      Endpoint::SetTransactionApproval => "setTransactionApproval",
    }
  }

  /// Mutations must never be served from the cache
  pub fn is_cacheable(self) -> bool {
    !matches!(self, Endpoint::SetTransactionApproval)
  }
}

impl fmt::Display for Endpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// An employee as returned by the `employees` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
  pub id: String,
  pub first_name: String,
  pub last_name: String,
}

impl Employee {
  /// The "show all" selection. Its id is reserved and never issued by the backend.
  pub fn all() -> Self {
    Self {
      id: String::new(),
      first_name: "All".to_string(),
      last_name: "Employees".to_string(),
    }
  }

  pub fn is_all(&self) -> bool {
    self.id.is_empty()
  }

  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }
}

/// A card transaction awaiting review.
///
/// `employee` is a snapshot taken when the transaction was fetched, not a
/// reference into the employee list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
  pub id: String,
  pub amount: f64,
  pub merchant: String,
  pub employee: Employee,
  pub date: String,
  pub approved: bool,
}

/// Set `approved` on every transaction with the given id.
///
/// Returns whether anything matched.
pub fn set_approval(
  transactions: &mut [Transaction],
  transaction_id: &str,
  approved: bool,
) -> bool {
  let mut found = false;
  for transaction in transactions.iter_mut().filter(|t| t.id == transaction_id) {
    transaction.approved = approved;
    found = true;
  }
  found
}

/// One page of a paginated listing. `next_page == None` marks the last page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
  pub data: Vec<T>,
  pub next_page: Option<u32>,
}

impl<T> PaginatedResult<T> {
  pub fn is_last(&self) -> bool {
    self.next_page.is_none()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedRequestParams {
  pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestByEmployeeParams {
  pub employee_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTransactionApprovalParams {
  pub transaction_id: String,
  pub value: bool,
}
