//! In-memory response store shared by everything in one session.

use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::key::CacheKey;
use super::traits::{Cacheable, EntryShape};
use crate::api::{set_approval, PaginatedResult, Transaction};

/// A serialized response body and its shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
  pub shape: EntryShape,
  pub body: String,
}

impl CachedEntry {
  pub fn encode<T: Cacheable>(data: &T) -> Result<Self> {
    let body =
      serde_json::to_string(data).map_err(|e| eyre!("Failed to serialize entry: {}", e))?;
    Ok(Self {
      shape: T::shape(),
      body,
    })
  }

  pub fn decode<T: Cacheable>(&self) -> Result<T> {
    if self.shape != T::shape() {
      return Err(eyre!(
        "Cached entry has shape {:?}, expected {:?}",
        self.shape,
        T::shape()
      ));
    }
    serde_json::from_str(&self.body).map_err(|e| eyre!("Failed to deserialize entry: {}", e))
  }

  /// Rewrite `approved` for a transaction held in this entry.
  ///
  /// The body is only re-serialized when the transaction is present, and it
  /// keeps its original shape. Returns whether the entry changed.
  pub fn apply_approval(&mut self, transaction_id: &str, approved: bool) -> Result<bool> {
    match self.shape {
      EntryShape::Employees => Ok(false),
      EntryShape::Page => {
        let mut page: PaginatedResult<Transaction> = self.decode()?;
        if !set_approval(&mut page.data, transaction_id, approved) {
          return Ok(false);
        }
        *self = Self::encode(&page)?;
        Ok(true)
      }
      EntryShape::FlatList => {
        let mut list: Vec<Transaction> = self.decode()?;
        if !set_approval(&mut list, transaction_id, approved) {
          return Ok(false);
        }
        *self = Self::encode(&list)?;
        Ok(true)
      }
    }
  }
}

/// Session-wide response cache.
///
/// Cloning shares the underlying map. Entries never expire; they go away only
/// through `clear_all` or `clear_by_prefixes`.
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
  entries: Arc<Mutex<HashMap<String, CachedEntry>>>,
}

impl ResponseCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, CachedEntry>>> {
    self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  pub fn get(&self, key: &CacheKey) -> Result<Option<CachedEntry>> {
    Ok(self.lock()?.get(key.as_str()).cloned())
  }

  /// Store an entry, replacing any previous one
  pub fn set(&self, key: CacheKey, entry: CachedEntry) -> Result<()> {
    self.lock()?.insert(key.into(), entry);
    Ok(())
  }

  pub fn clear_all(&self) -> Result<()> {
    self.lock()?.clear();
    Ok(())
  }

  /// Drop every entry whose endpoint segment starts with one of `prefixes`.
  ///
  /// Returns how many entries were removed.
  pub fn clear_by_prefixes(&self, prefixes: &[&str]) -> Result<usize> {
    let mut entries = self.lock()?;
    let before = entries.len();
    entries.retain(|key, _| {
      let endpoint = CacheKey::endpoint_segment(key);
      !prefixes.iter().any(|prefix| endpoint.starts_with(prefix))
    });
    Ok(before - entries.len())
  }

  /// Visit every entry with mutable access, holding the lock for the whole scan.
  ///
  /// Visit order is unspecified.
  pub fn for_each_mut<F>(&self, mut visitor: F) -> Result<()>
  where
    F: FnMut(&str, &mut CachedEntry),
  {
    let mut entries = self.lock()?;
    for (key, entry) in entries.iter_mut() {
      visitor(key, entry);
    }
    Ok(())
  }

  pub fn len(&self) -> Result<usize> {
    Ok(self.lock()?.len())
  }

  pub fn is_empty(&self) -> Result<bool> {
    Ok(self.lock()?.is_empty())
  }

  /// All keys, sorted
  pub fn keys(&self) -> Result<Vec<String>> {
    let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
    keys.sort();
    Ok(keys)
  }
}
