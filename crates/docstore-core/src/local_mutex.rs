//! In-process mutex provider
//!
//! Locks are entries of a shared map with an expiry. A lock whose holder
//! vanished without dropping its guard is taken over after `ttl`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use docstore_types::mutex::{MutexGuard, MutexProvider};

use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct LocalMutexConfig {
	/// Lifetime of a lock that was never released
	pub ttl: Duration,
	/// Additional attempts after the first one failed
	pub retries: u32,
	pub retry_delay: Duration,
}

impl Default for LocalMutexConfig {
	fn default() -> Self {
		Self { ttl: Duration::from_secs(60), retries: 3, retry_delay: Duration::from_millis(200) }
	}
}

#[derive(Debug)]
struct LockEntry {
	token: u64,
	expires_at: Instant,
}

#[derive(Debug)]
pub struct LocalMutex {
	locks: Arc<Mutex<HashMap<Box<str>, LockEntry>>>,
	next_token: AtomicU64,
	config: LocalMutexConfig,
}

impl LocalMutex {
	pub fn new(config: LocalMutexConfig) -> Self {
		Self { locks: Arc::new(Mutex::new(HashMap::new())), next_token: AtomicU64::new(1), config }
	}

	fn try_lock(&self, key: &str) -> Option<MutexGuard> {
		let now = Instant::now();
		let token = self.next_token.fetch_add(1, Ordering::Relaxed);
		{
			let mut locks = self.locks.lock();
			match locks.get(key) {
				Some(entry) if entry.expires_at > now => return None,
				Some(entry) => {
					warn!(key = %key, token = entry.token, "taking over expired lock");
				}
				None => {}
			}
			locks.insert(key.into(), LockEntry { token, expires_at: now + self.config.ttl });
		}

		let locks = Arc::clone(&self.locks);
		let owned_key: Box<str> = key.into();
		Some(MutexGuard::new(key, move || {
			let mut locks = locks.lock();
			// A taken-over lock belongs to someone else by now
			if locks.get(&owned_key).is_some_and(|entry| entry.token == token) {
				locks.remove(&owned_key);
			}
		}))
	}

	pub fn held_count(&self) -> usize {
		let now = Instant::now();
		self.locks.lock().values().filter(|entry| entry.expires_at > now).count()
	}
}

impl Default for LocalMutex {
	fn default() -> Self {
		Self::new(LocalMutexConfig::default())
	}
}

#[async_trait]
impl MutexProvider for LocalMutex {
	async fn acquire(&self, key: &str) -> ClResult<Option<MutexGuard>> {
		for attempt in 0..=self.config.retries {
			if let Some(guard) = self.try_lock(key) {
				trace!(key = %key, attempt, "lock acquired");
				return Ok(Some(guard));
			}
			if attempt < self.config.retries {
				tokio::time::sleep(self.config.retry_delay).await;
			}
		}
		debug!(key = %key, "lock is busy");
		Ok(None)
	}
}


// vim: ts=4
