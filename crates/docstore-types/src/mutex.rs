//! Mutex provider interface
//!
//! A provider hands out named, mutually exclusive locks. Implementations backed
//! by a shared key store make the lock hold across processes; the in-process
//! one only across tasks.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::prelude::*;

type ReleaseFn = Box<dyn FnOnce() + Send + Sync>;

/// A held lock. Dropping the guard releases it, on every exit path.
pub struct MutexGuard {
	key: Box<str>,
	release: Option<ReleaseFn>,
}

impl MutexGuard {
	pub fn new(key: impl Into<Box<str>>, release: impl FnOnce() + Send + Sync + 'static) -> Self {
		Self { key: key.into(), release: Some(Box::new(release)) }
	}

	pub fn key(&self) -> &str {
		&self.key
	}
}

impl Debug for MutexGuard {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MutexGuard").field("key", &self.key).finish()
	}
}

impl Drop for MutexGuard {
	fn drop(&mut self) {
		if let Some(release) = self.release.take() {
			trace!(key = %self.key, "releasing lock");
			release();
		}
	}
}

#[async_trait]
pub trait MutexProvider: Debug + Send + Sync {
	/// Try to take the lock named `key`.
	///
	/// Returns `None` if the lock is held by someone else and could not be
	/// obtained within the provider's own retry budget.
	async fn acquire(&self, key: &str) -> ClResult<Option<MutexGuard>>;
}


// vim: ts=4
