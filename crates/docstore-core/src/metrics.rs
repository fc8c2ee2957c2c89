//! Doc storage metrics
//!
//! Plain atomic counters, read out through [`DocMetrics::snapshot`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
	DocUpdateInsertFailed,
	SnapshotUpsertFailed,
	HistoryCreated,
	HistoryRecovered,
	DocUpdateCountInconsistentWithCache,
	AutoMergePendingDocUpdatesError,
	HistoryCleanupError,
	RpcFallback,
}

impl Counter {
	pub const ALL: [Counter; 8] = [
		Counter::DocUpdateInsertFailed,
		Counter::SnapshotUpsertFailed,
		Counter::HistoryCreated,
		Counter::HistoryRecovered,
		Counter::DocUpdateCountInconsistentWithCache,
		Counter::AutoMergePendingDocUpdatesError,
		Counter::HistoryCleanupError,
		Counter::RpcFallback,
	];

	pub fn name(self) -> &'static str {
		match self {
			Counter::DocUpdateInsertFailed => "doc_update_insert_failed",
			Counter::SnapshotUpsertFailed => "snapshot_upsert_failed",
			Counter::HistoryCreated => "history_created",
			Counter::HistoryRecovered => "history_recovered",
			Counter::DocUpdateCountInconsistentWithCache => {
				"doc_update_count_inconsistent_with_cache"
			}
			Counter::AutoMergePendingDocUpdatesError => "auto_merge_pending_doc_updates_error",
			Counter::HistoryCleanupError => "history_cleanup_error",
			Counter::RpcFallback => "rpc_fallback",
		}
	}

	fn index(self) -> usize {
		self as usize
	}
}

#[derive(Debug, Default)]
pub struct DocMetrics {
	counters: [AtomicU64; Counter::ALL.len()],
	updates_queue_count: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
	pub counters: BTreeMap<&'static str, u64>,
	pub updates_queue_count: u64,
}

impl DocMetrics {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn incr(&self, counter: Counter) {
		self.counters[counter.index()].fetch_add(1, Ordering::Relaxed);
	}

	pub fn get(&self, counter: Counter) -> u64 {
		self.counters[counter.index()].load(Ordering::Relaxed)
	}

	pub fn set_updates_queue_count(&self, count: u64) {
		self.updates_queue_count.store(count, Ordering::Relaxed);
	}

	pub fn updates_queue_count(&self) -> u64 {
		self.updates_queue_count.load(Ordering::Relaxed)
	}

	pub fn snapshot(&self) -> MetricsSnapshot {
		MetricsSnapshot {
			counters: Counter::ALL.iter().map(|c| (c.name(), self.get(*c))).collect(),
			updates_queue_count: self.updates_queue_count(),
		}
	}
}


// vim: ts=4
