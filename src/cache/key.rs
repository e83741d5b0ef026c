//! Canonical cache keys.

use color_eyre::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::api::Endpoint;

const PARAMS_SEPARATOR: char = '@';

/// Key identifying one (endpoint, params) response.
///
/// Format: `endpoint` or `endpoint@<json>`, where the JSON has object keys
/// sorted at every level so field order never changes the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
  pub fn new(endpoint: Endpoint, params: Option<&Value>) -> Self {
    let mut key = endpoint.name().to_string();
    if let Some(params) = params {
      key.push(PARAMS_SEPARATOR);
      key.push_str(&canonical(params).to_string());
    }
    Self(key)
  }

  /// Build a key from any serializable params value
  pub fn for_params<P: Serialize>(endpoint: Endpoint, params: &P) -> Result<Self> {
    let value = serde_json::to_value(params)?;
    Ok(Self::new(endpoint, Some(&value)))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The endpoint-name part of a raw key
  pub fn endpoint_segment(raw: &str) -> &str {
    raw
      .split_once(PARAMS_SEPARATOR)
      .map_or(raw, |(endpoint, _)| endpoint)
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<CacheKey> for String {
  fn from(key: CacheKey) -> Self {
    key.0
  }
}

fn canonical(value: &Value) -> Value {
  match value {
    Value::Object(map) => {
      let sorted: BTreeMap<&String, Value> = map.iter().map(|(k, v)| (k, canonical(v))).collect();
      let mut out = Map::new();
      for (k, v) in sorted {
        out.insert(k.clone(), v);
      }
      Value::Object(out)
    }
    Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
    other => other.clone(),
  }
}
