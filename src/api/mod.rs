//! Backend access: endpoint types and the transports that reach them.

mod http;
mod mock;
mod types;

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{BackendConfig, BackendKind};

pub use http::HttpTransport;
pub use mock::{MockBackend, MockData, DEFAULT_PAGE_SIZE};
pub use types::{
  set_approval, Employee, Endpoint, PaginatedRequestParams, PaginatedResult,
  RequestByEmployeeParams, SetTransactionApprovalParams, Transaction,
};

/// The single remote call boundary.
///
/// The response shape is determined by `endpoint` alone. Calls to cacheable
/// endpoints must be idempotent for identical params.
pub trait Transport: Send + Sync {
  fn call(&self, endpoint: Endpoint, params: Option<Value>) -> BoxFuture<'_, Result<Value>>;
}

/// Build the transport described by the backend configuration.
pub fn connect(config: &BackendConfig) -> Result<Arc<dyn Transport>> {
  match config.kind {
    BackendKind::Mock => {
      let backend = MockBackend::load(config.data_file.as_deref())?
        .with_latency(config.latency())
        .with_page_size(config.page_size);
      Ok(Arc::new(backend))
    }
    BackendKind::Http => {
      let url = config
        .url
        .as_deref()
        .ok_or_else(|| eyre!("backend.url is required for the http backend"))?;
      Ok(Arc::new(HttpTransport::new(url)?))
    }
  }
}
