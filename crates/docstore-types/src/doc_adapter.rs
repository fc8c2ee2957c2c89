//! Doc Persistence Adapter
//!
//! Trait and records for pluggable backends storing the three kinds of rows the
//! doc engine works with:
//! - update fragments appended by writers and folded away by merges
//! - one current snapshot per (space, doc)
//! - immutable history checkpoints with an expiry
//!
//! Userspace docs only have snapshots, kept in a separate namespace so that a
//! user id never collides with a space id.
//!
//! Payloads are opaque CRDT binaries: the adapter never decodes them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

use crate::prelude::*;

/// A snapshot (or history checkpoint) of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocRecord {
	pub space_id: Box<str>,
	pub doc_id: Box<str>,
	#[serde(with = "serde_bytes_b64")]
	pub bin: Vec<u8>,
	pub timestamp: Timestamp,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub editor: Option<Box<str>>,
}

/// One un-merged CRDT update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFragment {
	pub bin: Vec<u8>,
	pub timestamp: Timestamp,
	pub editor: Option<Box<str>>,
	/// Arrival order assigned by the store, breaks timestamp ties
	pub seq: u64,
}

/// Fragment to be appended by [`DocRepo::create_updates`]
#[derive(Debug, Clone)]
pub struct NewUpdate<'a> {
	pub bin: &'a [u8],
	pub timestamp: Timestamp,
	pub editor: Option<&'a str>,
}

/// Listing entry of a history checkpoint (no payload)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryInfo {
	pub timestamp: Timestamp,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub editor: Option<Box<str>>,
}

pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Options for [`DocRepo::find_histories`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFilter {
	/// Only checkpoints strictly older than this
	pub before: Option<Timestamp>,
	#[serde(default = "default_history_limit")]
	pub limit: u32,
}

fn default_history_limit() -> u32 {
	DEFAULT_HISTORY_LIMIT
}

impl Default for HistoryFilter {
	fn default() -> Self {
		Self { before: None, limit: DEFAULT_HISTORY_LIMIT }
	}
}

/// Persistence backend of the doc engine.
///
/// Every method is scoped by `space_id` and never touches rows of another space.
/// Implementations must keep fragments with equal timestamps apart (the `seq`
/// of [`UpdateFragment`]): concurrent pushes to the same doc are not serialized.
#[async_trait]
pub trait DocRepo: Debug + Send + Sync {
	// Update log
	//************

	/// Append fragments atomically: either all of them are stored or none.
	async fn create_updates(
		&self,
		space_id: &str,
		doc_id: &str,
		updates: &[NewUpdate<'_>],
	) -> ClResult<()>;

	/// All pending fragments of a doc, ascending by timestamp then arrival.
	async fn find_updates(&self, space_id: &str, doc_id: &str) -> ClResult<Vec<UpdateFragment>>;

	async fn get_update_count(&self, space_id: &str, doc_id: &str) -> ClResult<u64>;

	/// Number of pending fragments over every space
	async fn get_global_update_count(&self) -> ClResult<u64>;

	/// Remove exactly the given fragments. Returns how many were removed.
	async fn delete_updates(
		&self,
		space_id: &str,
		doc_id: &str,
		updates: &[UpdateFragment],
	) -> ClResult<u64>;

	// Snapshots
	//***********

	async fn get_snapshot(&self, space_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>>;

	/// Insert or replace the snapshot, unless the stored one is newer.
	///
	/// Returns `false` when the write was rejected because the stored
	/// timestamp is greater than `snapshot.timestamp`.
	async fn upsert_snapshot(&self, snapshot: &DocRecord) -> ClResult<bool>;

	/// Whether the doc has a snapshot or any pending fragment
	async fn exists(&self, space_id: &str, doc_id: &str) -> ClResult<bool> {
		if self.get_update_count(space_id, doc_id).await? > 0 {
			return Ok(true);
		}
		Ok(self.get_snapshot(space_id, doc_id).await?.is_some())
	}

	/// Latest known timestamp per doc (snapshot or pending fragment), newer than `after`
	async fn find_doc_timestamps(
		&self,
		space_id: &str,
		after: Option<Timestamp>,
	) -> ClResult<HashMap<Box<str>, Timestamp>>;

	// History
	//*********

	/// Store a checkpoint. Fails with `Error::ValidationError` if one already
	/// exists at the same timestamp.
	async fn create_history(&self, snapshot: &DocRecord, expired_at: Timestamp) -> ClResult<()>;

	async fn get_history(
		&self,
		space_id: &str,
		doc_id: &str,
		timestamp: Timestamp,
	) -> ClResult<Option<DocRecord>>;

	async fn get_latest_history(
		&self,
		space_id: &str,
		doc_id: &str,
	) -> ClResult<Option<HistoryInfo>>;

	/// Checkpoints newest first
	async fn find_histories(
		&self,
		space_id: &str,
		doc_id: &str,
		filter: &HistoryFilter,
	) -> ClResult<Vec<HistoryInfo>>;

	/// Remove checkpoints with `expired_at <= now`. Returns how many were removed.
	async fn delete_expired_histories(&self, now: Timestamp) -> ClResult<u64>;

	// Lifecycle
	//***********

	/// Remove fragments, snapshot and history of a doc
	async fn delete_doc(&self, space_id: &str, doc_id: &str) -> ClResult<()>;

	/// Remove every row of a space
	async fn delete_space(&self, space_id: &str) -> ClResult<()>;

	// Userspace snapshots
	//*********************

	async fn get_user_snapshot(&self, user_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>>;

	/// Unconditional write, `space_id` of the record holds the user id
	async fn upsert_user_snapshot(&self, snapshot: &DocRecord) -> ClResult<()>;

	async fn delete_user_doc(&self, user_id: &str, doc_id: &str) -> ClResult<()>;

	async fn delete_user_space(&self, user_id: &str) -> ClResult<()>;

	async fn find_user_doc_timestamps(
		&self,
		user_id: &str,
		after: Option<Timestamp>,
	) -> ClResult<HashMap<Box<str>, Timestamp>>;
}

/// Base64 (url-safe, no padding) encoding of binary payloads in JSON
mod serde_bytes_b64 {
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bin: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bin))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let s = String::deserialize(deserializer)?;
		URL_SAFE_NO_PAD.decode(s).map_err(serde::de::Error::custom)
	}
}


// vim: ts=4
