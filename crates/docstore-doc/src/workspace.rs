//! Workspace doc storage
//!
//! Multi-writer docs. Pushes append to the update log without locking; reads
//! take the per-doc lock and fold pending updates into the snapshot, keeping
//! spaced-out history checkpoints of the replaced states.
//!
//! The number of pending updates per doc is mirrored in the cache map
//! [`UPDATES_QUEUE_CACHE_KEY`] so that the compaction job can find work
//! cheaply. The mirror is approximate and gets repaired when it drifts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use docstore_core::{Counter, DocConfig};
use docstore_types::doc_adapter::{
	DocRecord, HistoryFilter, HistoryInfo, NewUpdate, UpdateFragment,
};
use docstore_types::event::DocEvent;
use docstore_types::utils::{doc_key, parse_doc_key};

use crate::lock::{DocLock, LockScope};
use crate::merge::{self, DocDiff, is_empty_bin};
use crate::prelude::*;
use crate::storage::{DocStorageAdapter, DocStorageDeps};

pub const UPDATES_QUEUE_CACHE_KEY: &str = "doc:manager:updates";

const INSERT_RETRY_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct WorkspaceOpts {
	/// Updates stored per repository call
	pub batch_size: usize,
	/// Extra attempts after a failed insert
	pub insert_retries: u32,
}

impl Default for WorkspaceOpts {
	fn default() -> Self {
		Self { batch_size: 10, insert_retries: 3 }
	}
}

impl WorkspaceOpts {
	pub fn from_config(config: &DocConfig) -> Self {
		Self {
			batch_size: config.update_batch_size.max(1),
			insert_retries: config.update_insert_retries,
		}
	}
}

/// A doc picked for compaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDoc {
	pub space_id: Box<str>,
	pub doc_id: Box<str>,
}

#[derive(Debug)]
pub struct WorkspaceDocStorage {
	deps: DocStorageDeps,
	lock: DocLock,
	opts: WorkspaceOpts,
}

impl WorkspaceDocStorage {
	pub fn new(deps: DocStorageDeps, opts: WorkspaceOpts) -> Self {
		let lock = DocLock::new(deps.mutex.clone(), LockScope::Workspace);
		Self { deps, lock, opts }
	}

	/// Store `updates[*done..]` batch by batch, advancing `done` and the
	/// newest assigned timestamp after every stored batch.
	async fn insert_updates(
		&self,
		space_id: &str,
		doc_id: &str,
		updates: &[Vec<u8>],
		editor: Option<&str>,
		done: &mut usize,
		timestamp: &mut Timestamp,
	) -> ClResult<()> {
		let batch_size = self.opts.batch_size;
		for (turn, batch) in updates[*done..].chunks(batch_size).enumerate() {
			let now = Timestamp::now();
			let rows: Vec<NewUpdate<'_>> = batch
				.iter()
				.enumerate()
				.map(|(i, bin)| NewUpdate {
					bin,
					timestamp: Timestamp(now.0 + (turn * batch_size + i + 1) as u64),
					editor,
				})
				.collect();
			self.deps.repo.create_updates(space_id, doc_id, &rows).await?;

			if let Some(last) = rows.last() {
				*timestamp = (*timestamp).max(last.timestamp);
			}
			*done += batch.len();
			self.update_cached_count(space_id, doc_id, batch.len() as i64).await;
		}
		Ok(())
	}

	/// Adjust the pending counter of a doc, dropping it when it reaches zero.
	/// Cache failures are logged only.
	async fn update_cached_count(&self, space_id: &str, doc_id: &str, delta: i64) {
		let key = doc_key(space_id, doc_id);
		match self.deps.cache.map_increase(UPDATES_QUEUE_CACHE_KEY, &key, delta).await {
			Ok(count) if count <= 0 => {
				if let Err(e) = self.deps.cache.map_delete(UPDATES_QUEUE_CACHE_KEY, &key).await {
					warn!(key = %key, error = %e, "Failed to drop pending update counter");
				}
			}
			Ok(_) => {}
			Err(e) => warn!(key = %key, error = %e, "Failed to update pending update counter"),
		}
	}

	/// Persist a merged snapshot. Returns whether it was written.
	async fn set_doc_snapshot(&self, snapshot: &DocRecord) -> ClResult<bool> {
		if is_empty_bin(&snapshot.bin) {
			return Ok(false);
		}

		match self.deps.repo.upsert_snapshot(snapshot).await {
			Ok(true) => {
				self.deps.events.broadcast(DocEvent::SnapshotUpdated {
					space_id: snapshot.space_id.clone(),
					doc_id: snapshot.doc_id.clone(),
					timestamp: snapshot.timestamp,
					editor: snapshot.editor.clone(),
				});
				Ok(true)
			}
			Ok(false) => {
				debug!(
					space_id = %snapshot.space_id,
					doc_id = %snapshot.doc_id,
					timestamp = %snapshot.timestamp,
					"Stored snapshot is newer, skipping write"
				);
				Ok(false)
			}
			Err(e) => {
				self.deps.metrics.incr(Counter::SnapshotUpsertFailed);
				error!(
					space_id = %snapshot.space_id,
					doc_id = %snapshot.doc_id,
					error = %e,
					"Failed to upsert snapshot"
				);
				Err(Error::FailedToUpsertSnapshot)
			}
		}
	}

	/// Keep `snapshot` as a history checkpoint if the history policy allows.
	/// Returns whether a checkpoint was created.
	async fn create_doc_history(&self, snapshot: &DocRecord, force: bool) -> ClResult<bool> {
		let space_id = snapshot.space_id.as_ref();
		let doc_id = snapshot.doc_id.as_ref();
		let last = self.deps.repo.get_latest_history(space_id, doc_id).await?;

		let should_create = match last {
			None => true,
			Some(last) if last.timestamp == snapshot.timestamp => false,
			Some(last) => {
				let min_interval = self.deps.options.history_min_interval(space_id);
				force || last.timestamp < snapshot.timestamp.before(min_interval)
			}
		};
		if !should_create {
			return Ok(false);
		}

		if is_empty_bin(&snapshot.bin) {
			debug!(space_id = %space_id, doc_id = %doc_id, "Doc is empty, skipping history");
			return Ok(false);
		}

		let max_age = match self.deps.options.history_max_age(space_id).await {
			Ok(max_age) => max_age,
			Err(e) => {
				warn!(space_id = %space_id, error = %e, "Cannot resolve history max age");
				Duration::ZERO
			}
		};
		if max_age.is_zero() {
			return Ok(false);
		}

		if let Err(e) = self.deps.repo.create_history(snapshot, Timestamp::from_now(max_age)).await
		{
			// Racing processes may store the same checkpoint
			error!(space_id = %space_id, doc_id = %doc_id, error = %e, "Failed to create history");
		}

		self.deps.metrics.incr(Counter::HistoryCreated);
		debug!(
			space_id = %space_id,
			doc_id = %doc_id,
			timestamp = %snapshot.timestamp,
			"History created"
		);
		Ok(true)
	}

	async fn mark_updates_merged(
		&self,
		space_id: &str,
		doc_id: &str,
		updates: &[UpdateFragment],
	) -> ClResult<u64> {
		let count = self.deps.repo.delete_updates(space_id, doc_id, updates).await?;
		self.update_cached_count(space_id, doc_id, -(count as i64)).await;
		Ok(count)
	}

	/// Pick a random doc with pending updates.
	///
	/// The cached counter is checked against the update log; a stale entry is
	/// removed and `None` returned.
	pub async fn random_doc(&self) -> ClResult<Option<PendingDoc>> {
		let cache = &self.deps.cache;
		let Some(key) = cache.map_random_key(UPDATES_QUEUE_CACHE_KEY).await? else {
			return Ok(None);
		};

		let cached = cache.map_increase(UPDATES_QUEUE_CACHE_KEY, &key, 0).await?;
		if cached <= 0 {
			cache.map_delete(UPDATES_QUEUE_CACHE_KEY, &key).await?;
			return Ok(None);
		}

		let Some((space_id, doc_id)) = parse_doc_key(&key) else {
			warn!(key = %key, "Malformed pending update counter key");
			cache.map_delete(UPDATES_QUEUE_CACHE_KEY, &key).await?;
			return Ok(None);
		};

		let count = self.deps.repo.get_update_count(space_id, doc_id).await?;
		if count == 0 {
			self.deps.metrics.incr(Counter::DocUpdateCountInconsistentWithCache);
			cache.map_delete(UPDATES_QUEUE_CACHE_KEY, &key).await?;
			return Ok(None);
		}

		Ok(Some(PendingDoc { space_id: space_id.into(), doc_id: doc_id.into() }))
	}

	/// Pending updates over every space
	pub async fn pending_update_count(&self) -> ClResult<u64> {
		self.deps.repo.get_global_update_count().await
	}

	pub async fn delete_expired_histories(&self) -> ClResult<u64> {
		self.deps.repo.delete_expired_histories(Timestamp::now()).await
	}
}

#[async_trait]
impl DocStorageAdapter for WorkspaceDocStorage {
	async fn push_doc_updates(
		&self,
		space_id: &str,
		doc_id: &str,
		updates: &[Vec<u8>],
		editor: Option<&str>,
	) -> ClResult<Timestamp> {
		if updates.is_empty() {
			return Ok(Timestamp(0));
		}

		let is_new_doc = !self.deps.repo.exists(space_id, doc_id).await?;

		let mut done = 0;
		let mut timestamp = Timestamp::now();
		let mut attempt = 0;
		while let Err(e) =
			self.insert_updates(space_id, doc_id, updates, editor, &mut done, &mut timestamp).await
		{
			if attempt >= self.opts.insert_retries {
				self.deps.metrics.incr(Counter::DocUpdateInsertFailed);
				error!(
					space_id = %space_id,
					doc_id = %doc_id,
					stored = done,
					total = updates.len(),
					error = %e,
					"Failed to insert doc updates"
				);
				return Err(Error::FailedToSaveUpdates);
			}
			attempt += 1;
			warn!(space_id = %space_id, doc_id = %doc_id, attempt, error = %e, "Retrying doc update insert");
			tokio::time::sleep(INSERT_RETRY_DELAY * attempt).await;
		}

		if is_new_doc {
			self.deps.events.emit(DocEvent::DocCreated {
				space_id: space_id.into(),
				doc_id: doc_id.into(),
				editor: editor.map(Into::into),
			});
		}

		trace!(space_id = %space_id, doc_id = %doc_id, count = updates.len(), "Doc updates stored");
		Ok(timestamp)
	}

	async fn get_doc(&self, space_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>> {
		let _lock = self.lock.acquire(space_id, doc_id).await?;

		let snapshot = self.deps.repo.get_snapshot(space_id, doc_id).await?;
		let updates = self.deps.repo.find_updates(space_id, doc_id).await?;
		if updates.is_empty() {
			return Ok(snapshot);
		}

		let merged = merge::squash(snapshot.as_ref(), &updates).await?;
		let new_snapshot = DocRecord {
			space_id: space_id.into(),
			doc_id: doc_id.into(),
			bin: merged.bin,
			timestamp: merged.timestamp,
			editor: merged.editor,
		};

		let written = self.set_doc_snapshot(&new_snapshot).await?;
		if written && let Some(previous) = &snapshot {
			self.create_doc_history(previous, false).await?;
		}

		let merged_count = self.mark_updates_merged(space_id, doc_id, &updates).await?;
		debug!(
			space_id = %space_id,
			doc_id = %doc_id,
			merged = merged_count,
			timestamp = %new_snapshot.timestamp,
			"Doc updates merged"
		);

		Ok(Some(new_snapshot))
	}

	async fn get_doc_diff(
		&self,
		space_id: &str,
		doc_id: &str,
		state_vector: Option<&[u8]>,
	) -> ClResult<Option<DocDiff>> {
		let Some(snapshot) = self.deps.repo.get_snapshot(space_id, doc_id).await? else {
			return Ok(None);
		};
		let (missing, state) =
			merge::doc_diff(snapshot.bin, state_vector.map(<[u8]>::to_vec)).await?;
		Ok(Some(DocDiff { missing, state, timestamp: snapshot.timestamp }))
	}

	async fn delete_doc(&self, space_id: &str, doc_id: &str) -> ClResult<()> {
		self.deps.repo.delete_doc(space_id, doc_id).await?;
		let key = doc_key(space_id, doc_id);
		if let Err(e) = self.deps.cache.map_delete(UPDATES_QUEUE_CACHE_KEY, &key).await {
			warn!(key = %key, error = %e, "Failed to drop pending update counter");
		}
		self.deps
			.events
			.broadcast(DocEvent::SnapshotDeleted { space_id: space_id.into(), doc_id: doc_id.into() });
		Ok(())
	}

	async fn delete_space(&self, space_id: &str) -> ClResult<()> {
		info!(space_id = %space_id, "Deleting all docs of space");
		self.deps.repo.delete_space(space_id).await
	}

	async fn get_space_doc_timestamps(
		&self,
		space_id: &str,
		after: Option<Timestamp>,
	) -> ClResult<HashMap<Box<str>, Timestamp>> {
		self.deps.repo.find_doc_timestamps(space_id, after).await
	}

	async fn list_doc_histories(
		&self,
		space_id: &str,
		doc_id: &str,
		filter: &HistoryFilter,
	) -> ClResult<Vec<HistoryInfo>> {
		self.deps.repo.find_histories(space_id, doc_id, filter).await
	}

	async fn get_doc_history(
		&self,
		space_id: &str,
		doc_id: &str,
		timestamp: Timestamp,
	) -> ClResult<Option<DocRecord>> {
		self.deps.repo.get_history(space_id, doc_id, timestamp).await
	}

	async fn rollback_doc(
		&self,
		space_id: &str,
		doc_id: &str,
		timestamp: Timestamp,
		editor: Option<&str>,
	) -> ClResult<()> {
		let _lock = self.lock.acquire(space_id, doc_id).await?;

		if self.deps.repo.get_history(space_id, doc_id, timestamp).await?.is_none() {
			return Err(Error::doc_history_not_found(space_id, doc_id, timestamp));
		}
		let Some(current) = self.deps.repo.get_snapshot(space_id, doc_id).await? else {
			return Err(Error::doc_not_found(space_id, doc_id));
		};

		// The checkpoint is attributed to whoever asked for the rollback
		let current = DocRecord { editor: editor.map(Into::into), ..current };
		self.create_doc_history(&current, true).await?;

		self.deps.metrics.incr(Counter::HistoryRecovered);
		info!(space_id = %space_id, doc_id = %doc_id, to = %timestamp, "Doc history recovered");
		Ok(())
	}
}

// vim: ts=4
