//! Response caching.
//!
//! This module provides the session cache behind the fetch façade:
//! - Canonical keys built from endpoint + params
//! - Serialized bodies tagged with their response shape
//! - Prefix-selective clearing and in-place rewrites for approval propagation

mod key;
mod store;
mod traits;

pub use key::CacheKey;
pub use store::{CachedEntry, ResponseCache};
pub use traits::{Cacheable, EntryShape};
