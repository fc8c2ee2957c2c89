//! Cache provider interface
//!
//! Approximate counters grouped into named maps. Values are advisory: the
//! engine re-validates everything it reads here against the persistence
//! adapter.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::prelude::*;

#[async_trait]
pub trait CacheProvider: Debug + Send + Sync {
	/// A pseudo-random key of the map, `None` if the map is empty
	async fn map_random_key(&self, map: &str) -> ClResult<Option<Box<str>>>;

	/// Add `delta` (may be negative or zero) to a counter, creating it at 0.
	/// Returns the new value.
	async fn map_increase(&self, map: &str, key: &str, delta: i64) -> ClResult<i64>;

	async fn map_delete(&self, map: &str, key: &str) -> ClResult<()>;
}

// vim: ts=4
