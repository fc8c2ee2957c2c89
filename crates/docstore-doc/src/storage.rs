//! Doc storage adapter interface
//!
//! Implemented by the workspace adapter (multi-writer docs with an update log
//! and history) and the userspace adapter (per-user docs merged in place).

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use docstore_core::DocMetrics;
use docstore_types::cache::CacheProvider;
use docstore_types::doc_adapter::{DocRecord, DocRepo, HistoryFilter, HistoryInfo};
use docstore_types::event::EventBus;
use docstore_types::mutex::MutexProvider;
use docstore_types::options::DocStorageOptions;

use crate::merge::DocDiff;
use crate::prelude::*;

/// Collaborators shared by the storage adapters
#[derive(Debug, Clone)]
pub struct DocStorageDeps {
	pub repo: Arc<dyn DocRepo>,
	pub mutex: Arc<dyn MutexProvider>,
	pub cache: Arc<dyn CacheProvider>,
	pub events: Arc<dyn EventBus>,
	pub options: Arc<dyn DocStorageOptions>,
	pub metrics: Arc<DocMetrics>,
}

#[async_trait]
pub trait DocStorageAdapter: Debug + Send + Sync {
	/// Append updates to a doc. Returns the timestamp of the newest stored
	/// update, `Timestamp(0)` if `updates` is empty.
	async fn push_doc_updates(
		&self,
		space_id: &str,
		doc_id: &str,
		updates: &[Vec<u8>],
		editor: Option<&str>,
	) -> ClResult<Timestamp>;

	/// Current state of a doc, merging pending updates first
	async fn get_doc(&self, space_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>>;

	/// Diff of the stored snapshot against `state_vector`. Does not merge.
	async fn get_doc_diff(
		&self,
		space_id: &str,
		doc_id: &str,
		state_vector: Option<&[u8]>,
	) -> ClResult<Option<DocDiff>>;

	async fn delete_doc(&self, space_id: &str, doc_id: &str) -> ClResult<()>;

	async fn delete_space(&self, space_id: &str) -> ClResult<()>;

	/// Latest timestamp of every doc of a space updated after `after`
	async fn get_space_doc_timestamps(
		&self,
		space_id: &str,
		after: Option<Timestamp>,
	) -> ClResult<HashMap<Box<str>, Timestamp>>;

	async fn list_doc_histories(
		&self,
		space_id: &str,
		doc_id: &str,
		filter: &HistoryFilter,
	) -> ClResult<Vec<HistoryInfo>>;

	async fn get_doc_history(
		&self,
		space_id: &str,
		doc_id: &str,
		timestamp: Timestamp,
	) -> ClResult<Option<DocRecord>>;

	/// Checkpoint the current state before a client reverts the doc to the
	/// checkpoint at `timestamp`. Content is never rewritten here: the client
	/// pushes the reverting change through the normal update path.
	async fn rollback_doc(
		&self,
		space_id: &str,
		doc_id: &str,
		timestamp: Timestamp,
		editor: Option<&str>,
	) -> ClResult<()>;
}

// vim: ts=4
