//! Typed fetch façade over the transport and the response cache.

use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{
  Employee, Endpoint, PaginatedRequestParams, PaginatedResult, RequestByEmployeeParams,
  SetTransactionApprovalParams, Transaction, Transport,
};
use crate::cache::{CacheKey, Cacheable, CachedEntry, EntryShape, ResponseCache};
use crate::gate::Gate;

/// Fetches backend data with transparent caching.
///
/// Every call runs through this fetcher's [`Gate`], so `loading()` reflects
/// the calls made through this instance (and its clones) only. The cache is
/// shared with every fetcher built from the same [`ResponseCache`].
#[derive(Clone)]
pub struct Fetcher {
  transport: Arc<dyn Transport>,
  cache: ResponseCache,
  gate: Gate,
}

impl Fetcher {
  pub fn new(transport: Arc<dyn Transport>, cache: ResponseCache) -> Self {
    Self {
      transport,
      cache,
      gate: Gate::new(),
    }
  }

  /// Same transport and cache, separate busy flag
  pub fn with_new_gate(&self) -> Self {
    Self::new(Arc::clone(&self.transport), self.cache.clone())
  }

  pub fn loading(&self) -> bool {
    self.gate.loading()
  }

  pub fn cache(&self) -> &ResponseCache {
    &self.cache
  }

  /// Read through the cache.
  ///
  /// A hit returns the stored body without a remote call. A miss calls the
  /// backend and stores the result; a failed call leaves the cache untouched.
  /// Non-cacheable endpoints always go to the backend.
  pub async fn fetch_cached<R: Cacheable>(
    &self,
    endpoint: Endpoint,
    params: Option<Value>,
  ) -> Result<R> {
    if !endpoint.is_cacheable() {
      return self.fetch_fresh(endpoint, params).await;
    }

    let key = CacheKey::new(endpoint, params.as_ref());

    self
      .gate
      .run(|| async move {
        if let Some(entry) = self.cache.get(&key)? {
          debug!(%key, "cache hit");
          return entry.decode();
        }

        debug!(%key, "cache miss");
        let response = self.transport.call(endpoint, params).await?;
        let data: R = decode_response(endpoint, response)?;
        self.cache.set(key, CachedEntry::encode(&data)?)?;
        Ok(data)
      })
      .await
  }

  /// Call the backend directly, bypassing the cache entirely.
  pub async fn fetch_fresh<R: DeserializeOwned>(
    &self,
    endpoint: Endpoint,
    params: Option<Value>,
  ) -> Result<R> {
    self
      .gate
      .run(|| async move {
        let response = self.transport.call(endpoint, params).await?;
        decode_response(endpoint, response)
      })
      .await
  }

  /// Change a transaction's approval on the backend, then rewrite every
  /// cached copy of it.
  ///
  /// Entries that never held the transaction are not touched. If the remote
  /// call fails no entry changes.
  pub async fn mutate_approval_and_propagate<R: DeserializeOwned>(
    &self,
    transaction_id: &str,
    value: bool,
  ) -> Result<R> {
    let params = to_params(&SetTransactionApprovalParams {
      transaction_id: transaction_id.to_string(),
      value,
    })?;

    self
      .gate
      .run(|| async move {
        let response = self
          .transport
          .call(Endpoint::SetTransactionApproval, Some(params))
          .await?;

        let updated = self.propagate_approval(transaction_id, value)?;
        info!(transaction_id, value, updated, "Transaction approval changed");

        decode_response(Endpoint::SetTransactionApproval, response)
      })
      .await
  }

  fn propagate_approval(&self, transaction_id: &str, value: bool) -> Result<usize> {
    let mut updated = 0;
    self.cache.for_each_mut(|key, entry| {
      if entry.shape == EntryShape::Employees {
        return;
      }
      match entry.apply_approval(transaction_id, value) {
        Ok(true) => updated += 1,
        Ok(false) => {}
        Err(e) => warn!(key, error = %e, "Skipping unreadable cache entry"),
      }
    })?;
    Ok(updated)
  }

  pub fn clear_cache(&self) -> Result<()> {
    self.cache.clear_all()
  }

  /// Drop the cached responses of the given endpoints
  pub fn clear_cache_by_endpoint(&self, endpoints: &[Endpoint]) -> Result<usize> {
    let prefixes: Vec<&str> = endpoints.iter().map(|e| e.name()).collect();
    self.cache.clear_by_prefixes(&prefixes)
  }

  pub async fn employees(&self) -> Result<Vec<Employee>> {
    self.fetch_cached(Endpoint::Employees, None).await
  }

  pub async fn transactions_page(&self, page: u32) -> Result<PaginatedResult<Transaction>> {
    let params = to_params(&PaginatedRequestParams { page: Some(page) })?;
    self
      .fetch_cached(Endpoint::PaginatedTransactions, Some(params))
      .await
  }

  pub async fn transactions_by_employee(&self, employee_id: &str) -> Result<Vec<Transaction>> {
    let params = to_params(&RequestByEmployeeParams {
      employee_id: employee_id.to_string(),
    })?;
    self
      .fetch_cached(Endpoint::TransactionsByEmployee, Some(params))
      .await
  }

  /// The response body carries nothing the client uses and is discarded.
  pub async fn set_transaction_approval(&self, transaction_id: &str, value: bool) -> Result<()> {
    self
      .mutate_approval_and_propagate::<Value>(transaction_id, value)
      .await
      .map(|_| ())
  }
}

fn to_params<P: Serialize>(params: &P) -> Result<Value> {
  serde_json::to_value(params).map_err(|e| eyre!("Failed to serialize params: {}", e))
}

fn decode_response<R: DeserializeOwned>(endpoint: Endpoint, response: Value) -> Result<R> {
  serde_json::from_value(response).map_err(|e| eyre!("Unexpected {} response: {}", endpoint, e))
}
