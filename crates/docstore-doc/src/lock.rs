//! Per-document write lock
//!
//! Every snapshot mutating sequence runs under this lock. Workspace and
//! userspace docs use disjoint key namespaces.

use std::sync::Arc;

use docstore_types::mutex::{MutexGuard, MutexProvider};
use docstore_types::utils::doc_key;

use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockScope {
	Workspace,
	Userspace,
}

impl LockScope {
	pub fn key(self, space_id: &str, doc_id: &str) -> String {
		match self {
			LockScope::Workspace => format!("doc:update:{}", doc_key(space_id, doc_id)),
			LockScope::Userspace => format!("userspace:doc:update:{}", doc_key(space_id, doc_id)),
		}
	}
}

#[derive(Debug, Clone)]
pub struct DocLock {
	mutex: Arc<dyn MutexProvider>,
	scope: LockScope,
}

impl DocLock {
	pub fn new(mutex: Arc<dyn MutexProvider>, scope: LockScope) -> Self {
		Self { mutex, scope }
	}

	/// Fails with `ConcurrentWriteLimitExceeded` if the lock stays busy
	pub async fn acquire(&self, space_id: &str, doc_id: &str) -> ClResult<MutexGuard> {
		let key = self.scope.key(space_id, doc_id);
		match self.mutex.acquire(&key).await? {
			Some(guard) => Ok(guard),
			None => {
				warn!(space_id = %space_id, doc_id = %doc_id, "doc is locked by another writer");
				Err(Error::ConcurrentWriteLimitExceeded)
			}
		}
	}
}


// vim: ts=4
