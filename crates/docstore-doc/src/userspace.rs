//! Userspace doc storage
//!
//! Docs owned by a single user. Pushed updates are merged into the snapshot
//! right away under the per-doc lock; there is no update log, no history and
//! nothing for the compaction job to do. The `space_id` of every call is the
//! owning user's id.

use async_trait::async_trait;
use std::collections::HashMap;

use docstore_types::doc_adapter::{DocRecord, HistoryFilter, HistoryInfo, UpdateFragment};

use crate::lock::{DocLock, LockScope};
use crate::merge::{self, DocDiff};
use crate::prelude::*;
use crate::storage::{DocStorageAdapter, DocStorageDeps};

#[derive(Debug)]
pub struct UserspaceDocStorage {
	deps: DocStorageDeps,
	lock: DocLock,
}

impl UserspaceDocStorage {
	pub fn new(deps: DocStorageDeps) -> Self {
		let lock = DocLock::new(deps.mutex.clone(), LockScope::Userspace);
		Self { deps, lock }
	}
}

#[async_trait]
impl DocStorageAdapter for UserspaceDocStorage {
	async fn push_doc_updates(
		&self,
		user_id: &str,
		doc_id: &str,
		updates: &[Vec<u8>],
		editor: Option<&str>,
	) -> ClResult<Timestamp> {
		if updates.is_empty() {
			return Ok(Timestamp(0));
		}

		let _lock = self.lock.acquire(user_id, doc_id).await?;
		let snapshot = self.deps.repo.get_user_snapshot(user_id, doc_id).await?;

		let now = Timestamp::now();
		let fragments: Vec<UpdateFragment> = updates
			.iter()
			.enumerate()
			.map(|(i, bin)| UpdateFragment {
				bin: bin.clone(),
				timestamp: Timestamp(now.0 + i as u64),
				editor: editor.map(Into::into),
				seq: i as u64,
			})
			.collect();

		let merged = merge::squash(snapshot.as_ref(), &fragments).await?;
		let record = DocRecord {
			space_id: user_id.into(),
			doc_id: doc_id.into(),
			bin: merged.bin,
			timestamp: merged.timestamp,
			editor: merged.editor,
		};
		self.deps.repo.upsert_user_snapshot(&record).await?;

		trace!(user_id = %user_id, doc_id = %doc_id, count = updates.len(), "Userspace doc updated");
		Ok(record.timestamp)
	}

	async fn get_doc(&self, user_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>> {
		self.deps.repo.get_user_snapshot(user_id, doc_id).await
	}

	async fn get_doc_diff(
		&self,
		user_id: &str,
		doc_id: &str,
		state_vector: Option<&[u8]>,
	) -> ClResult<Option<DocDiff>> {
		let Some(snapshot) = self.deps.repo.get_user_snapshot(user_id, doc_id).await? else {
			return Ok(None);
		};
		let (missing, state) =
			merge::doc_diff(snapshot.bin, state_vector.map(<[u8]>::to_vec)).await?;
		Ok(Some(DocDiff { missing, state, timestamp: snapshot.timestamp }))
	}

	async fn delete_doc(&self, user_id: &str, doc_id: &str) -> ClResult<()> {
		self.deps.repo.delete_user_doc(user_id, doc_id).await
	}

	async fn delete_space(&self, user_id: &str) -> ClResult<()> {
		self.deps.repo.delete_user_space(user_id).await
	}

	async fn get_space_doc_timestamps(
		&self,
		user_id: &str,
		after: Option<Timestamp>,
	) -> ClResult<HashMap<Box<str>, Timestamp>> {
		self.deps.repo.find_user_doc_timestamps(user_id, after).await
	}

	async fn list_doc_histories(
		&self,
		_user_id: &str,
		_doc_id: &str,
		_filter: &HistoryFilter,
	) -> ClResult<Vec<HistoryInfo>> {
		Ok(Vec::new())
	}

	async fn get_doc_history(
		&self,
		_user_id: &str,
		_doc_id: &str,
		_timestamp: Timestamp,
	) -> ClResult<Option<DocRecord>> {
		Ok(None)
	}

	async fn rollback_doc(
		&self,
		_user_id: &str,
		_doc_id: &str,
		_timestamp: Timestamp,
		_editor: Option<&str>,
	) -> ClResult<()> {
		Ok(())
	}
}

// vim: ts=4
