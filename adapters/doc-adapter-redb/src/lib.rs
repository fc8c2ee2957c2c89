//! Redb-based Doc Persistence Adapter
//!
//! Implements the DocRepo trait using redb: the update log, the snapshot of
//! every doc, history checkpoints with their expiry, and userspace snapshots.
//!
//! # Storage Layout
//!
//! - `doc_updates` - `{space}␟{doc}␟{timestamp}␟{seq}` -> row
//! - `doc_snapshots` - `{space}␟{doc}` -> row
//! - `doc_histories` - `{space}␟{doc}␟{timestamp}` -> row
//! - `doc_history_expiry` - history key -> expiry timestamp
//! - `doc_expiry_index` - `{expiry}␟{history key}` -> expiry timestamp
//! - `user_snapshots` - `{user}␟{doc}` -> row
//! - `doc_counters` - named counters (update sequence)
//!
//! Rows are encoded by the [`row`] module, keys by the [`keys`] module.
//!
//! # File Modes
//!
//! ## Per-Space Files Mode (per_space_files=true)
//! Each space has its own redb file: `{storage_path}/space_{hex id}.db`, each
//! user its own `{storage_path}/user_{hex id}.db`. Global operations (pending
//! update count, history expiry) visit every file of the directory.
//!
//! ## Single File Mode (per_space_files=false)
//! Everything is kept in `{storage_path}/docs.db`.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use docstore::doc_adapter::{
	DocRecord, DocRepo, HistoryFilter, HistoryInfo, NewUpdate, UpdateFragment,
};
use docstore::error::Error as ClError;
use docstore::prelude::*;
use redb::{ReadableDatabase, ReadableTable, ReadableTableMetadata};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

mod error;
mod keys;
mod row;

pub use error::Error;
use keys::*;
use row::Row;

// Storage table definitions
mod tables {
	use redb::TableDefinition;

	pub const TABLE_UPDATES: TableDefinition<&str, &[u8]> = TableDefinition::new("doc_updates");
	pub const TABLE_SNAPSHOTS: TableDefinition<&str, &[u8]> =
		TableDefinition::new("doc_snapshots");
	pub const TABLE_HISTORIES: TableDefinition<&str, &[u8]> =
		TableDefinition::new("doc_histories");
	pub const TABLE_HISTORY_EXPIRY: TableDefinition<&str, u64> =
		TableDefinition::new("doc_history_expiry");
	pub const TABLE_EXPIRY_INDEX: TableDefinition<&str, u64> =
		TableDefinition::new("doc_expiry_index");
	pub const TABLE_USER_SNAPSHOTS: TableDefinition<&str, &[u8]> =
		TableDefinition::new("user_snapshots");
	pub const TABLE_COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("doc_counters");
}

use tables::*;

const SHARED_DB_FILE: &str = "docs.db";
const UPDATE_SEQ: &str = "update_seq";

fn db_error<E: std::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> ClError {
	move |e| ClError::from(Error::DbError(format!("Failed to {}: {}", what, e)))
}

fn corrupt_key(key: &str) -> ClError {
	ClError::from(Error::CorruptRow(format!("malformed key '{}'", key.escape_debug())))
}

/// Hex form of an id, safe in a file name
fn file_id(id: &str) -> String {
	id.bytes().map(|b| format!("{:02x}", b)).collect()
}

/// Keys starting with `prefix`, ascending
fn scan_keys<V: redb::Value + 'static>(
	table: &impl ReadableTable<&'static str, V>,
	prefix: &str,
) -> ClResult<Vec<String>> {
	let end = prefix_end(prefix);
	let range = table.range(prefix..end.as_str()).map_err(db_error("read range"))?;

	let mut keys = Vec::new();
	for item in range {
		let (key, _) = item.map_err(db_error("iterate range"))?;
		keys.push(key.value().to_string());
	}
	Ok(keys)
}

/// Rows with a key starting with `prefix`, ascending
fn scan_rows(
	table: &impl ReadableTable<&'static str, &'static [u8]>,
	prefix: &str,
) -> ClResult<Vec<(String, Vec<u8>)>> {
	let end = prefix_end(prefix);
	let range = table.range(prefix..end.as_str()).map_err(db_error("read range"))?;

	let mut rows = Vec::new();
	for item in range {
		let (key, value) = item.map_err(db_error("iterate range"))?;
		rows.push((key.value().to_string(), value.value().to_vec()));
	}
	Ok(rows)
}

/// Remove every key starting with `prefix`. Returns the removed keys.
fn remove_prefixed<V: redb::Value + 'static>(
	table: &mut redb::Table<'_, &'static str, V>,
	prefix: &str,
) -> ClResult<Vec<String>> {
	let keys = scan_keys(&*table, prefix)?;
	for key in &keys {
		table.remove(key.as_str()).map_err(db_error("remove row"))?;
	}
	Ok(keys)
}

/// Remove the checkpoints under `prefix` together with their expiry entries
fn remove_histories(tx: &redb::WriteTransaction, prefix: &str) -> ClResult<u64> {
	let mut histories = tx.open_table(TABLE_HISTORIES).map_err(db_error("open histories table"))?;
	let mut expiry = tx.open_table(TABLE_HISTORY_EXPIRY).map_err(db_error("open expiry table"))?;
	let mut index = tx.open_table(TABLE_EXPIRY_INDEX).map_err(db_error("open expiry index"))?;

	let removed = remove_prefixed(&mut histories, prefix)?;
	for key in &removed {
		let expired_at = expiry
			.remove(key.as_str())
			.map_err(db_error("remove history expiry"))?
			.map(|v| v.value());
		if let Some(expired_at) = expired_at {
			index
				.remove(expiry_key(Timestamp(expired_at), key).as_str())
				.map_err(db_error("remove expiry index entry"))?;
		}
	}
	Ok(removed.len() as u64)
}

fn to_record(space_id: &str, doc_id: &str, raw: &[u8]) -> ClResult<DocRecord> {
	let row = Row::decode(raw)?;
	Ok(DocRecord {
		space_id: space_id.into(),
		doc_id: doc_id.into(),
		bin: row.bin.to_vec(),
		timestamp: row.timestamp,
		editor: row.editor.map(Into::into),
	})
}

fn to_history_info(key: &str, raw: &[u8]) -> ClResult<HistoryInfo> {
	let timestamp = parse_history_key(key).ok_or_else(|| corrupt_key(key))?;
	let row = Row::decode(raw)?;
	Ok(HistoryInfo { timestamp, editor: row.editor.map(Into::into) })
}

/// Merge `timestamp` into the latest timestamp of `doc_id`
fn bump(latest: &mut HashMap<Box<str>, Timestamp>, doc_id: &str, timestamp: Timestamp) {
	latest
		.entry(doc_id.into())
		.and_modify(|ts| *ts = (*ts).max(timestamp))
		.or_insert(timestamp);
}

/// Doc Adapter using redb for storage
pub struct DocAdapterRedb {
	/// Base storage directory
	storage_path: PathBuf,

	/// Whether to use per-space files or a single file
	per_space_files: bool,

	/// Cache of redb Database instances (one per file)
	file_databases: Arc<RwLock<HashMap<PathBuf, Arc<redb::Database>>>>,
}

impl DocAdapterRedb {
	/// Create a new doc adapter with redb storage
	pub async fn new(storage_path: impl AsRef<Path>, per_space_files: bool) -> ClResult<Self> {
		let storage_path = storage_path.as_ref().to_path_buf();

		std::fs::create_dir_all(&storage_path).map_err(|e| {
			ClError::from(Error::IoError(format!("Failed to create storage directory: {}", e)))
		})?;

		debug!(
			"Initializing doc adapter at {:?} (per_space_files={})",
			storage_path, per_space_files
		);

		Ok(Self {
			storage_path,
			per_space_files,
			file_databases: Arc::new(RwLock::new(HashMap::new())),
		})
	}

	/// Get or open a redb database file
	async fn get_or_open_db_file(&self, db_path: PathBuf) -> ClResult<Arc<redb::Database>> {
		{
			let cache = self.file_databases.read().await;
			if let Some(db) = cache.get(&db_path) {
				return Ok(Arc::clone(db));
			}
		}

		let mut cache = self.file_databases.write().await;
		// Opened by a concurrent caller meanwhile
		if let Some(db) = cache.get(&db_path) {
			return Ok(Arc::clone(db));
		}

		let db = redb::Database::create(&db_path).map_err(db_error("open database"))?;

		// Create tables if they don't exist
		let tx = db.begin_write().map_err(db_error("begin write transaction"))?;
		let _ = tx.open_table(TABLE_UPDATES);
		let _ = tx.open_table(TABLE_SNAPSHOTS);
		let _ = tx.open_table(TABLE_HISTORIES);
		let _ = tx.open_table(TABLE_HISTORY_EXPIRY);
		let _ = tx.open_table(TABLE_EXPIRY_INDEX);
		let _ = tx.open_table(TABLE_USER_SNAPSHOTS);
		let _ = tx.open_table(TABLE_COUNTERS);
		tx.commit().map_err(db_error("commit table creation"))?;

		let db = Arc::new(db);
		cache.insert(db_path, Arc::clone(&db));
		Ok(db)
	}

	fn space_db_path(&self, space_id: &str) -> PathBuf {
		if self.per_space_files {
			self.storage_path.join(format!("space_{}.db", file_id(space_id)))
		} else {
			self.storage_path.join(SHARED_DB_FILE)
		}
	}

	fn user_db_path(&self, user_id: &str) -> PathBuf {
		if self.per_space_files {
			self.storage_path.join(format!("user_{}.db", file_id(user_id)))
		} else {
			self.storage_path.join(SHARED_DB_FILE)
		}
	}

	async fn space_db(&self, space_id: &str) -> ClResult<Arc<redb::Database>> {
		check_id("space id", space_id)?;
		self.get_or_open_db_file(self.space_db_path(space_id)).await
	}

	async fn user_db(&self, user_id: &str) -> ClResult<Arc<redb::Database>> {
		check_id("user id", user_id)?;
		self.get_or_open_db_file(self.user_db_path(user_id)).await
	}

	/// Every database file of the storage directory
	async fn all_dbs(&self) -> ClResult<Vec<Arc<redb::Database>>> {
		if !self.per_space_files {
			return Ok(vec![self.get_or_open_db_file(self.storage_path.join(SHARED_DB_FILE)).await?]);
		}

		let entries = std::fs::read_dir(&self.storage_path).map_err(|e| {
			ClError::from(Error::IoError(format!("Failed to list storage directory: {}", e)))
		})?;
		let mut paths = Vec::new();
		for entry in entries {
			let entry = entry.map_err(|e| {
				ClError::from(Error::IoError(format!("Failed to list storage directory: {}", e)))
			})?;
			let path = entry.path();
			if path.extension().is_some_and(|ext| ext == "db") {
				paths.push(path);
			}
		}
		paths.sort();

		let mut dbs = Vec::with_capacity(paths.len());
		for path in paths {
			dbs.push(self.get_or_open_db_file(path).await?);
		}
		Ok(dbs)
	}
}

#[async_trait::async_trait]
impl DocRepo for DocAdapterRedb {
	async fn create_updates(
		&self,
		space_id: &str,
		doc_id: &str,
		updates: &[NewUpdate<'_>],
	) -> ClResult<()> {
		check_id("doc id", doc_id)?;
		let db = self.space_db(space_id).await?;

		let tx = db.begin_write().map_err(db_error("begin write transaction"))?;
		{
			let mut counters = tx.open_table(TABLE_COUNTERS).map_err(db_error("open counters table"))?;
			let mut seq = counters
				.get(UPDATE_SEQ)
				.map_err(db_error("read update sequence"))?
				.map(|v| v.value())
				.unwrap_or_default();

			let mut table = tx.open_table(TABLE_UPDATES).map_err(db_error("open updates table"))?;
			for update in updates {
				let key = update_key(space_id, doc_id, update.timestamp, seq);
				let row = Row { timestamp: update.timestamp, editor: update.editor, bin: update.bin };
				table
					.insert(key.as_str(), row.encode().as_slice())
					.map_err(db_error("insert update"))?;
				seq += 1;
			}

			counters.insert(UPDATE_SEQ, seq).map_err(db_error("store update sequence"))?;
		}
		tx.commit().map_err(db_error("commit updates"))?;

		trace!("Stored {} updates for doc {} of space {}", updates.len(), doc_id, space_id);
		Ok(())
	}

	async fn find_updates(&self, space_id: &str, doc_id: &str) -> ClResult<Vec<UpdateFragment>> {
		let db = self.space_db(space_id).await?;
		let tx = db.begin_read().map_err(db_error("begin read transaction"))?;
		let table = tx.open_table(TABLE_UPDATES).map_err(db_error("open updates table"))?;

		scan_rows(&table, &doc_prefix(space_id, doc_id))?
			.into_iter()
			.map(|(key, raw)| -> ClResult<UpdateFragment> {
				let (_, seq) = parse_update_key(&key).ok_or_else(|| corrupt_key(&key))?;
				let row = Row::decode(&raw)?;
				Ok(UpdateFragment {
					bin: row.bin.to_vec(),
					timestamp: row.timestamp,
					editor: row.editor.map(Into::into),
					seq,
				})
			})
			.collect()
	}

	async fn get_update_count(&self, space_id: &str, doc_id: &str) -> ClResult<u64> {
		let db = self.space_db(space_id).await?;
		let tx = db.begin_read().map_err(db_error("begin read transaction"))?;
		let table = tx.open_table(TABLE_UPDATES).map_err(db_error("open updates table"))?;

		Ok(scan_keys(&table, &doc_prefix(space_id, doc_id))?.len() as u64)
	}

	async fn get_global_update_count(&self) -> ClResult<u64> {
		let mut count = 0;
		for db in self.all_dbs().await? {
			let tx = db.begin_read().map_err(db_error("begin read transaction"))?;
			let table = tx.open_table(TABLE_UPDATES).map_err(db_error("open updates table"))?;
			count += table.len().map_err(db_error("count updates"))?;
		}
		Ok(count)
	}

	async fn delete_updates(
		&self,
		space_id: &str,
		doc_id: &str,
		updates: &[UpdateFragment],
	) -> ClResult<u64> {
		let db = self.space_db(space_id).await?;

		let mut removed = 0;
		let tx = db.begin_write().map_err(db_error("begin write transaction"))?;
		{
			let mut table = tx.open_table(TABLE_UPDATES).map_err(db_error("open updates table"))?;
			for update in updates {
				let key = update_key(space_id, doc_id, update.timestamp, update.seq);
				if table.remove(key.as_str()).map_err(db_error("remove update"))?.is_some() {
					removed += 1;
				}
			}
		}
		tx.commit().map_err(db_error("commit update removal"))?;

		Ok(removed)
	}

	async fn get_snapshot(&self, space_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>> {
		let db = self.space_db(space_id).await?;
		let tx = db.begin_read().map_err(db_error("begin read transaction"))?;
		let table = tx.open_table(TABLE_SNAPSHOTS).map_err(db_error("open snapshots table"))?;

		match table.get(doc_key(space_id, doc_id).as_str()).map_err(db_error("read snapshot"))? {
			Some(value) => Ok(Some(to_record(space_id, doc_id, value.value())?)),
			None => Ok(None),
		}
	}

	async fn upsert_snapshot(&self, snapshot: &DocRecord) -> ClResult<bool> {
		check_id("doc id", &snapshot.doc_id)?;
		let db = self.space_db(&snapshot.space_id).await?;
		let key = doc_key(&snapshot.space_id, &snapshot.doc_id);

		let tx = db.begin_write().map_err(db_error("begin write transaction"))?;
		let written = {
			let mut table = tx.open_table(TABLE_SNAPSHOTS).map_err(db_error("open snapshots table"))?;
			let stored = table
				.get(key.as_str())
				.map_err(db_error("read snapshot"))?
				.map(|v| Row::decode(v.value()).map(|row| row.timestamp))
				.transpose()?;

			if stored.is_some_and(|ts| ts > snapshot.timestamp) {
				false
			} else {
				let row = Row {
					timestamp: snapshot.timestamp,
					editor: snapshot.editor.as_deref(),
					bin: &snapshot.bin,
				};
				table
					.insert(key.as_str(), row.encode().as_slice())
					.map_err(db_error("insert snapshot"))?;
				true
			}
		};
		tx.commit().map_err(db_error("commit snapshot"))?;

		Ok(written)
	}

	async fn find_doc_timestamps(
		&self,
		space_id: &str,
		after: Option<Timestamp>,
	) -> ClResult<HashMap<Box<str>, Timestamp>> {
		let db = self.space_db(space_id).await?;
		let tx = db.begin_read().map_err(db_error("begin read transaction"))?;
		let snapshots = tx.open_table(TABLE_SNAPSHOTS).map_err(db_error("open snapshots table"))?;
		let updates = tx.open_table(TABLE_UPDATES).map_err(db_error("open updates table"))?;

		let prefix = space_prefix(space_id);
		let mut latest = HashMap::new();
		for (key, raw) in scan_rows(&snapshots, &prefix)? {
			let doc_id = doc_of(&key, &prefix).ok_or_else(|| corrupt_key(&key))?;
			bump(&mut latest, doc_id, Row::decode(&raw)?.timestamp);
		}
		for key in scan_keys(&updates, &prefix)? {
			let doc_id = doc_of(&key, &prefix).ok_or_else(|| corrupt_key(&key))?;
			let (timestamp, _) = parse_update_key(&key).ok_or_else(|| corrupt_key(&key))?;
			bump(&mut latest, doc_id, timestamp);
		}

		if let Some(after) = after {
			latest.retain(|_, ts| *ts > after);
		}
		Ok(latest)
	}

	async fn create_history(&self, snapshot: &DocRecord, expired_at: Timestamp) -> ClResult<()> {
		check_id("doc id", &snapshot.doc_id)?;
		let db = self.space_db(&snapshot.space_id).await?;
		let key = history_key(&snapshot.space_id, &snapshot.doc_id, snapshot.timestamp);

		let tx = db.begin_write().map_err(db_error("begin write transaction"))?;
		{
			let mut histories =
				tx.open_table(TABLE_HISTORIES).map_err(db_error("open histories table"))?;
			if histories.get(key.as_str()).map_err(db_error("read history"))?.is_some() {
				return Err(ClError::ValidationError(format!(
					"history of doc {} at {} already exists",
					snapshot.doc_id, snapshot.timestamp
				)));
			}

			let row = Row {
				timestamp: snapshot.timestamp,
				editor: snapshot.editor.as_deref(),
				bin: &snapshot.bin,
			};
			histories
				.insert(key.as_str(), row.encode().as_slice())
				.map_err(db_error("insert history"))?;

			let mut expiry =
				tx.open_table(TABLE_HISTORY_EXPIRY).map_err(db_error("open expiry table"))?;
			expiry.insert(key.as_str(), expired_at.0).map_err(db_error("insert history expiry"))?;

			let mut index = tx.open_table(TABLE_EXPIRY_INDEX).map_err(db_error("open expiry index"))?;
			index
				.insert(expiry_key(expired_at, &key).as_str(), expired_at.0)
				.map_err(db_error("insert expiry index entry"))?;
		}
		tx.commit().map_err(db_error("commit history"))?;

		Ok(())
	}

	async fn get_history(
		&self,
		space_id: &str,
		doc_id: &str,
		timestamp: Timestamp,
	) -> ClResult<Option<DocRecord>> {
		let db = self.space_db(space_id).await?;
		let tx = db.begin_read().map_err(db_error("begin read transaction"))?;
		let table = tx.open_table(TABLE_HISTORIES).map_err(db_error("open histories table"))?;

		let key = history_key(space_id, doc_id, timestamp);
		match table.get(key.as_str()).map_err(db_error("read history"))? {
			Some(value) => Ok(Some(to_record(space_id, doc_id, value.value())?)),
			None => Ok(None),
		}
	}

	async fn get_latest_history(
		&self,
		space_id: &str,
		doc_id: &str,
	) -> ClResult<Option<HistoryInfo>> {
		let filter = HistoryFilter { before: None, limit: 1 };
		Ok(self.find_histories(space_id, doc_id, &filter).await?.into_iter().next())
	}

	async fn find_histories(
		&self,
		space_id: &str,
		doc_id: &str,
		filter: &HistoryFilter,
	) -> ClResult<Vec<HistoryInfo>> {
		let db = self.space_db(space_id).await?;
		let tx = db.begin_read().map_err(db_error("begin read transaction"))?;
		let table = tx.open_table(TABLE_HISTORIES).map_err(db_error("open histories table"))?;

		let prefix = doc_prefix(space_id, doc_id);
		let end = match filter.before {
			Some(before) => history_key(space_id, doc_id, before),
			None => prefix_end(&prefix),
		};
		let range =
			table.range(prefix.as_str()..end.as_str()).map_err(db_error("read histories"))?;

		let mut histories = Vec::new();
		for item in range.rev().take(filter.limit as usize) {
			let (key, value) = item.map_err(db_error("iterate histories"))?;
			histories.push(to_history_info(key.value(), value.value())?);
		}
		Ok(histories)
	}

	async fn delete_expired_histories(&self, now: Timestamp) -> ClResult<u64> {
		let mut removed = 0;
		for db in self.all_dbs().await? {
			let tx = db.begin_write().map_err(db_error("begin write transaction"))?;
			{
				let mut index =
					tx.open_table(TABLE_EXPIRY_INDEX).map_err(db_error("open expiry index"))?;
				let mut expired = Vec::new();
				for item in index.iter().map_err(db_error("read expiry index"))? {
					let (key, _) = item.map_err(db_error("iterate expiry index"))?;
					let key = key.value();
					let (expired_at, history) =
						parse_expiry_key(key).ok_or_else(|| corrupt_key(key))?;
					if expired_at > now {
						break;
					}
					expired.push((key.to_string(), history.to_string()));
				}

				let mut histories =
					tx.open_table(TABLE_HISTORIES).map_err(db_error("open histories table"))?;
				let mut expiry =
					tx.open_table(TABLE_HISTORY_EXPIRY).map_err(db_error("open expiry table"))?;
				for (index_key, history) in &expired {
					index.remove(index_key.as_str()).map_err(db_error("remove expiry index entry"))?;
					expiry.remove(history.as_str()).map_err(db_error("remove history expiry"))?;
					if histories.remove(history.as_str()).map_err(db_error("remove history"))?.is_some()
					{
						removed += 1;
					}
				}
			}
			tx.commit().map_err(db_error("commit history expiry"))?;
		}

		debug!("Removed {} expired histories", removed);
		Ok(removed)
	}

	async fn delete_doc(&self, space_id: &str, doc_id: &str) -> ClResult<()> {
		let db = self.space_db(space_id).await?;
		let prefix = doc_prefix(space_id, doc_id);

		let tx = db.begin_write().map_err(db_error("begin write transaction"))?;
		{
			let mut updates = tx.open_table(TABLE_UPDATES).map_err(db_error("open updates table"))?;
			remove_prefixed(&mut updates, &prefix)?;

			let mut snapshots =
				tx.open_table(TABLE_SNAPSHOTS).map_err(db_error("open snapshots table"))?;
			snapshots
				.remove(doc_key(space_id, doc_id).as_str())
				.map_err(db_error("remove snapshot"))?;
		}
		remove_histories(&tx, &prefix)?;
		tx.commit().map_err(db_error("commit doc deletion"))?;

		Ok(())
	}

	async fn delete_space(&self, space_id: &str) -> ClResult<()> {
		let db = self.space_db(space_id).await?;
		let prefix = space_prefix(space_id);

		let tx = db.begin_write().map_err(db_error("begin write transaction"))?;
		{
			let mut updates = tx.open_table(TABLE_UPDATES).map_err(db_error("open updates table"))?;
			remove_prefixed(&mut updates, &prefix)?;

			let mut snapshots =
				tx.open_table(TABLE_SNAPSHOTS).map_err(db_error("open snapshots table"))?;
			remove_prefixed(&mut snapshots, &prefix)?;
		}
		let histories = remove_histories(&tx, &prefix)?;
		tx.commit().map_err(db_error("commit space deletion"))?;

		debug!("Deleted space {} ({} histories)", space_id, histories);
		Ok(())
	}

	async fn get_user_snapshot(&self, user_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>> {
		let db = self.user_db(user_id).await?;
		let tx = db.begin_read().map_err(db_error("begin read transaction"))?;
		let table =
			tx.open_table(TABLE_USER_SNAPSHOTS).map_err(db_error("open user snapshots table"))?;

		match table.get(doc_key(user_id, doc_id).as_str()).map_err(db_error("read user snapshot"))? {
			Some(value) => Ok(Some(to_record(user_id, doc_id, value.value())?)),
			None => Ok(None),
		}
	}

	async fn upsert_user_snapshot(&self, snapshot: &DocRecord) -> ClResult<()> {
		check_id("doc id", &snapshot.doc_id)?;
		let db = self.user_db(&snapshot.space_id).await?;

		let tx = db.begin_write().map_err(db_error("begin write transaction"))?;
		{
			let mut table =
				tx.open_table(TABLE_USER_SNAPSHOTS).map_err(db_error("open user snapshots table"))?;
			let row = Row {
				timestamp: snapshot.timestamp,
				editor: snapshot.editor.as_deref(),
				bin: &snapshot.bin,
			};
			table
				.insert(doc_key(&snapshot.space_id, &snapshot.doc_id).as_str(), row.encode().as_slice())
				.map_err(db_error("insert user snapshot"))?;
		}
		tx.commit().map_err(db_error("commit user snapshot"))?;

		Ok(())
	}

	async fn delete_user_doc(&self, user_id: &str, doc_id: &str) -> ClResult<()> {
		let db = self.user_db(user_id).await?;

		let tx = db.begin_write().map_err(db_error("begin write transaction"))?;
		{
			let mut table =
				tx.open_table(TABLE_USER_SNAPSHOTS).map_err(db_error("open user snapshots table"))?;
			table
				.remove(doc_key(user_id, doc_id).as_str())
				.map_err(db_error("remove user snapshot"))?;
		}
		tx.commit().map_err(db_error("commit user doc deletion"))?;

		Ok(())
	}

	async fn delete_user_space(&self, user_id: &str) -> ClResult<()> {
		let db = self.user_db(user_id).await?;

		let tx = db.begin_write().map_err(db_error("begin write transaction"))?;
		{
			let mut table =
				tx.open_table(TABLE_USER_SNAPSHOTS).map_err(db_error("open user snapshots table"))?;
			remove_prefixed(&mut table, &space_prefix(user_id))?;
		}
		tx.commit().map_err(db_error("commit user space deletion"))?;

		Ok(())
	}

	async fn find_user_doc_timestamps(
		&self,
		user_id: &str,
		after: Option<Timestamp>,
	) -> ClResult<HashMap<Box<str>, Timestamp>> {
		let db = self.user_db(user_id).await?;
		let tx = db.begin_read().map_err(db_error("begin read transaction"))?;
		let table =
			tx.open_table(TABLE_USER_SNAPSHOTS).map_err(db_error("open user snapshots table"))?;

		let prefix = space_prefix(user_id);
		let mut latest = HashMap::new();
		for (key, raw) in scan_rows(&table, &prefix)? {
			let doc_id = doc_of(&key, &prefix).ok_or_else(|| corrupt_key(&key))?;
			let timestamp = Row::decode(&raw)?.timestamp;
			if after.is_none_or(|after| timestamp > after) {
				bump(&mut latest, doc_id, timestamp);
			}
		}
		Ok(latest)
	}
}

impl std::fmt::Debug for DocAdapterRedb {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DocAdapterRedb")
			.field("storage_path", &self.storage_path)
			.field("per_space_files", &self.per_space_files)
			.finish()
	}
}

// vim: ts=4
