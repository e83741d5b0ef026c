//! Response types that can live in the cache.

use serde::{de::DeserializeOwned, Serialize};

use crate::api::{Employee, PaginatedResult, Transaction};

/// Shape tag recorded next to each cached body.
///
/// Approval propagation dispatches on this tag instead of guessing the shape
/// from the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryShape {
  /// `[Employee]`, never holds transactions
  Employees,
  /// `{ data: [Transaction], nextPage }`
  Page,
  /// `[Transaction]`
  FlatList,
}

/// Trait for response bodies that can be cached.
pub trait Cacheable: Serialize + DeserializeOwned {
  fn shape() -> EntryShape;
}

impl Cacheable for Vec<Employee> {
  fn shape() -> EntryShape {
    EntryShape::Employees
  }
}

impl Cacheable for PaginatedResult<Transaction> {
  fn shape() -> EntryShape {
    EntryShape::Page
  }
}

impl Cacheable for Vec<Transaction> {
  fn shape() -> EntryShape {
    EntryShape::FlatList
  }
}
