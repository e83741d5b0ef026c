//! JSON-over-HTTP transport for a real backend.

use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use url::Url;

use super::types::Endpoint;
use super::Transport;

/// Posts params as JSON to `{base}/{endpoint}` and decodes the JSON reply
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base: Url,
}

impl HttpTransport {
  pub fn new(base_url: &str) -> Result<Self> {
    let mut base =
      Url::parse(base_url).map_err(|e| eyre!("Invalid backend url {}: {}", base_url, e))?;

    // Url::join replaces the last segment unless the path ends with a slash
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base })
  }

  async fn post(&self, endpoint: Endpoint, params: Option<Value>) -> Result<Value> {
    let url = self
      .base
      .join(endpoint.name())
      .map_err(|e| eyre!("Invalid url for {}: {}", endpoint, e))?;
    let body = serde_json::to_vec(&params.unwrap_or_else(|| Value::Object(Default::default())))?;

    let response = self
      .client
      .post(url)
      .header(CONTENT_TYPE, "application/json")
      .body(body)
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", endpoint, e))?;

    let status = response.status();
    let bytes = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read {} response: {}", endpoint, e))?;

    if !status.is_success() {
      return Err(eyre!(
        "{} returned {}: {}",
        endpoint,
        status,
        String::from_utf8_lossy(&bytes)
      ));
    }

    if bytes.is_empty() {
      return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes)
      .map_err(|e| eyre!("Failed to parse {} response: {}", endpoint, e))
  }
}

impl Transport for HttpTransport {
  fn call(&self, endpoint: Endpoint, params: Option<Value>) -> BoxFuture<'_, Result<Value>> {
    self.post(endpoint, params).boxed()
  }
}
