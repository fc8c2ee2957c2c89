//! In-process cache provider

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::RngExt;
use std::collections::HashMap;

use docstore_types::cache::CacheProvider;

use crate::prelude::*;

#[derive(Debug, Default)]
pub struct LocalCache {
	maps: RwLock<HashMap<Box<str>, HashMap<Box<str>, i64>>>,
}

impl LocalCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn map_get(&self, map: &str, key: &str) -> Option<i64> {
		self.maps.read().get(map).and_then(|entries| entries.get(key).copied())
	}

	pub fn map_len(&self, map: &str) -> usize {
		self.maps.read().get(map).map_or(0, HashMap::len)
	}
}

#[async_trait]
impl CacheProvider for LocalCache {
	async fn map_random_key(&self, map: &str) -> ClResult<Option<Box<str>>> {
		let maps = self.maps.read();
		let Some(entries) = maps.get(map) else {
			return Ok(None);
		};
		if entries.is_empty() {
			return Ok(None);
		}
		let idx = rand::rng().random_range(0..entries.len());
		Ok(entries.keys().nth(idx).cloned())
	}

	async fn map_increase(&self, map: &str, key: &str, delta: i64) -> ClResult<i64> {
		let mut maps = self.maps.write();
		let value = maps.entry(map.into()).or_default().entry(key.into()).or_insert(0);
		*value = value.saturating_add(delta);
		Ok(*value)
	}

	async fn map_delete(&self, map: &str, key: &str) -> ClResult<()> {
		let mut maps = self.maps.write();
		if let Some(entries) = maps.get_mut(map) {
			entries.remove(key);
			if entries.is_empty() {
				maps.remove(map);
			}
		}
		Ok(())
	}
}


// vim: ts=4
