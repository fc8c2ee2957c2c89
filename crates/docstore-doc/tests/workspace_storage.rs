//! Workspace doc storage tests
//!
//! Pushing, merging, history checkpoints and rollback against a real redb
//! repository.

mod common;

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use common::*;
use docstore_core::{Counter, DocConfig};
use docstore_doc::{DocStorageAdapter, DocStorageDeps, WorkspaceDocStorage, WorkspaceOpts};
use docstore_doc::workspace::UPDATES_QUEUE_CACHE_KEY;
use docstore_types::cache::CacheProvider;
use docstore_types::doc_adapter::{
	DocRecord, DocRepo, HistoryFilter, HistoryInfo, NewUpdate, UpdateFragment,
};
use docstore_types::error::{ClResult, Error};
use docstore_types::event::DocEvent;
use docstore_types::options::DocStorageOptions;
use docstore_types::types::Timestamp;
use docstore_types::utils::doc_key;

/// Repository failing selected `create_updates` calls or every snapshot write
#[derive(Debug)]
struct FlakyRepo {
	inner: Arc<dyn DocRepo>,
	create_calls: AtomicU32,
	fail_create_calls: HashSet<u32>,
	fail_snapshots: AtomicBool,
}

impl FlakyRepo {
	fn new(inner: Arc<dyn DocRepo>, fail_create_calls: &[u32]) -> Self {
		Self {
			inner,
			create_calls: AtomicU32::new(0),
			fail_create_calls: fail_create_calls.iter().copied().collect(),
			fail_snapshots: AtomicBool::new(false),
		}
	}
}

#[async_trait]
impl DocRepo for FlakyRepo {
	async fn create_updates(
		&self,
		space_id: &str,
		doc_id: &str,
		updates: &[NewUpdate<'_>],
	) -> ClResult<()> {
		let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
		if self.fail_create_calls.contains(&call) {
			return Err(Error::DbError);
		}
		self.inner.create_updates(space_id, doc_id, updates).await
	}

	async fn find_updates(&self, space_id: &str, doc_id: &str) -> ClResult<Vec<UpdateFragment>> {
		self.inner.find_updates(space_id, doc_id).await
	}

	async fn get_update_count(&self, space_id: &str, doc_id: &str) -> ClResult<u64> {
		self.inner.get_update_count(space_id, doc_id).await
	}

	async fn get_global_update_count(&self) -> ClResult<u64> {
		self.inner.get_global_update_count().await
	}

	async fn delete_updates(
		&self,
		space_id: &str,
		doc_id: &str,
		updates: &[UpdateFragment],
	) -> ClResult<u64> {
		self.inner.delete_updates(space_id, doc_id, updates).await
	}

	async fn get_snapshot(&self, space_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>> {
		self.inner.get_snapshot(space_id, doc_id).await
	}

	async fn upsert_snapshot(&self, snapshot: &DocRecord) -> ClResult<bool> {
		if self.fail_snapshots.load(Ordering::SeqCst) {
			return Err(Error::DbError);
		}
		self.inner.upsert_snapshot(snapshot).await
	}

	async fn find_doc_timestamps(
		&self,
		space_id: &str,
		after: Option<Timestamp>,
	) -> ClResult<HashMap<Box<str>, Timestamp>> {
		self.inner.find_doc_timestamps(space_id, after).await
	}

	async fn create_history(&self, snapshot: &DocRecord, expired_at: Timestamp) -> ClResult<()> {
		self.inner.create_history(snapshot, expired_at).await
	}

	async fn get_history(
		&self,
		space_id: &str,
		doc_id: &str,
		timestamp: Timestamp,
	) -> ClResult<Option<DocRecord>> {
		self.inner.get_history(space_id, doc_id, timestamp).await
	}

	async fn get_latest_history(
		&self,
		space_id: &str,
		doc_id: &str,
	) -> ClResult<Option<HistoryInfo>> {
		self.inner.get_latest_history(space_id, doc_id).await
	}

	async fn find_histories(
		&self,
		space_id: &str,
		doc_id: &str,
		filter: &HistoryFilter,
	) -> ClResult<Vec<HistoryInfo>> {
		self.inner.find_histories(space_id, doc_id, filter).await
	}

	async fn delete_expired_histories(&self, now: Timestamp) -> ClResult<u64> {
		self.inner.delete_expired_histories(now).await
	}

	async fn delete_doc(&self, space_id: &str, doc_id: &str) -> ClResult<()> {
		self.inner.delete_doc(space_id, doc_id).await
	}

	async fn delete_space(&self, space_id: &str) -> ClResult<()> {
		self.inner.delete_space(space_id).await
	}

	async fn get_user_snapshot(&self, user_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>> {
		self.inner.get_user_snapshot(user_id, doc_id).await
	}

	async fn upsert_user_snapshot(&self, snapshot: &DocRecord) -> ClResult<()> {
		self.inner.upsert_user_snapshot(snapshot).await
	}

	async fn delete_user_doc(&self, user_id: &str, doc_id: &str) -> ClResult<()> {
		self.inner.delete_user_doc(user_id, doc_id).await
	}

	async fn delete_user_space(&self, user_id: &str) -> ClResult<()> {
		self.inner.delete_user_space(user_id).await
	}

	async fn find_user_doc_timestamps(
		&self,
		user_id: &str,
		after: Option<Timestamp>,
	) -> ClResult<HashMap<Box<str>, Timestamp>> {
		self.inner.find_user_doc_timestamps(user_id, after).await
	}
}

/// Options whose retention lookup always fails
#[derive(Debug)]
struct BrokenOptions;

#[async_trait]
impl DocStorageOptions for BrokenOptions {
	fn history_min_interval(&self, _space_id: &str) -> Duration {
		Duration::ZERO
	}

	async fn history_max_age(&self, _space_id: &str) -> ClResult<Duration> {
		Err(Error::NotFound)
	}
}

fn flaky(repo: Arc<dyn DocRepo>, fail_create_calls: &[u32]) -> Arc<dyn DocRepo> {
	Arc::new(FlakyRepo::new(repo, fail_create_calls))
}

/// Keep successive snapshots in distinct milliseconds
async fn tick() {
	tokio::time::sleep(Duration::from_millis(5)).await;
}

fn always_history_config() -> DocConfig {
	DocConfig { history_min_interval_ms: 0, ..DocConfig::default() }
}

#[tokio::test]
async fn test_push_and_merge_text() {
	let env = TestEnv::new(DocConfig::default()).await;
	let mut rx = env.subscribe();
	let writer = Writer::new();

	let first = writer.append("hello");
	let second = writer.append(" world");
	let ts = env
		.workspace
		.push_doc_updates("s1", "d1", &[first], Some("u1"))
		.await
		.expect("Failed to push");
	env.workspace
		.push_doc_updates("s1", "d1", &[second], Some("u2"))
		.await
		.expect("Failed to push");
	assert!(ts.0 > 0);
	assert_eq!(env.cache.map_get(UPDATES_QUEUE_CACHE_KEY, &doc_key("s1", "d1")), Some(2));

	let doc = env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc");
	let doc = doc.expect("Doc not found");
	assert_eq!(read_text(&doc.bin), "hello world");
	assert_eq!(doc.editor.as_deref(), Some("u2"));
	assert!(doc.timestamp >= ts);

	// Log folded into the snapshot
	assert_eq!(env.repo.get_update_count("s1", "d1").await.ok(), Some(0));
	assert_eq!(env.cache.map_get(UPDATES_QUEUE_CACHE_KEY, &doc_key("s1", "d1")), None);
	let stored = env.repo.get_snapshot("s1", "d1").await.expect("Failed to get snapshot");
	assert_eq!(stored.as_ref(), Some(&doc));

	let events = drain(&mut rx);
	assert_eq!(event_names(&events), vec!["doc.created", "doc.snapshot.updated"]);
	assert!(matches!(
		&events[0],
		DocEvent::DocCreated { editor: Some(editor), .. } if editor.as_ref() == "u1"
	));
}

#[tokio::test]
async fn test_empty_push_is_a_noop() {
	let env = TestEnv::new(DocConfig::default()).await;
	let mut rx = env.subscribe();

	let ts = env.workspace.push_doc_updates("s1", "d1", &[], None).await;
	assert_eq!(ts.ok(), Some(Timestamp(0)));
	assert!(drain(&mut rx).is_empty());
	assert_eq!(env.cache.map_len(UPDATES_QUEUE_CACHE_KEY), 0);
	assert!(env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc").is_none());
}

#[tokio::test]
async fn test_push_assigns_increasing_timestamps_across_batches() {
	let config = DocConfig { update_batch_size: 2, ..DocConfig::default() };
	let env = TestEnv::new(config).await;
	let writer = Writer::new();
	let updates: Vec<Vec<u8>> = (0..5).map(|i| writer.append(&i.to_string())).collect();

	let ts = env.workspace.push_doc_updates("s1", "d1", &updates, None).await.expect("Failed");

	let stored = env.repo.find_updates("s1", "d1").await.expect("Failed to find updates");
	assert_eq!(stored.len(), 5);
	let stored_bins: Vec<&Vec<u8>> = stored.iter().map(|u| &u.bin).collect();
	assert_eq!(stored_bins, updates.iter().collect::<Vec<_>>());
	assert!(stored.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
	assert_eq!(stored.last().map(|u| u.timestamp), Some(ts));

	let doc = env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc").expect("Doc not found");
	assert_eq!(read_text(&doc.bin), "01234");
}

#[tokio::test]
async fn test_push_retry_resumes_after_stored_batches() {
	let config = DocConfig { update_batch_size: 2, ..DocConfig::default() };
	let env =
		TestEnv::with_repo(config, |repo| flaky(repo, &[2])).await;
	let writer = Writer::new();
	let updates: Vec<Vec<u8>> = (0..5).map(|i| writer.append(&i.to_string())).collect();

	env.workspace.push_doc_updates("s1", "d1", &updates, None).await.expect("Failed to push");

	// No batch stored twice
	assert_eq!(env.repo.get_update_count("s1", "d1").await.ok(), Some(5));
	assert_eq!(env.cache.map_get(UPDATES_QUEUE_CACHE_KEY, &doc_key("s1", "d1")), Some(5));
	let doc = env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc").expect("Doc not found");
	assert_eq!(read_text(&doc.bin), "01234");
}

#[tokio::test]
async fn test_push_gives_up_after_retries() {
	let config = DocConfig { update_insert_retries: 2, ..DocConfig::default() };
	let env =
		TestEnv::with_repo(config, |repo| flaky(repo, &[1, 2, 3])).await;
	let mut rx = env.subscribe();
	let writer = Writer::new();

	let res = env.workspace.push_doc_updates("s1", "d1", &[writer.append("x")], None).await;
	assert!(matches!(res, Err(Error::FailedToSaveUpdates)));
	assert_eq!(env.metrics.get(Counter::DocUpdateInsertFailed), 1);
	assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_second_push_does_not_announce_doc() {
	let env = TestEnv::new(DocConfig::default()).await;
	let writer = Writer::new();
	env.workspace.push_doc_updates("s1", "d1", &[writer.append("a")], None).await.expect("push");
	env.workspace.get_doc("s1", "d1").await.expect("get");

	let mut rx = env.subscribe();
	env.workspace.push_doc_updates("s1", "d1", &[writer.append("b")], None).await.expect("push");
	assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_concurrent_reads_merge_once() {
	let env = TestEnv::new(DocConfig::default()).await;
	let writer = Writer::new();
	let updates: Vec<Vec<u8>> = ["a", "b", "c"].iter().map(|c| writer.append(c)).collect();
	env.workspace.push_doc_updates("s1", "d1", &updates, None).await.expect("Failed to push");
	let mut rx = env.subscribe();

	let (first, second) = tokio::join!(
		env.workspace.get_doc("s1", "d1"),
		env.workspace.get_doc("s1", "d1"),
	);
	let first = first.expect("Failed to get doc").expect("Doc not found");
	let second = second.expect("Failed to get doc").expect("Doc not found");
	assert_eq!(read_text(&first.bin), "abc");
	assert_eq!(first, second);

	let updated = drain(&mut rx)
		.into_iter()
		.filter(|e| matches!(e, DocEvent::SnapshotUpdated { .. }))
		.count();
	assert_eq!(updated, 1);
}

#[tokio::test]
async fn test_failed_snapshot_write_keeps_updates() {
	let mut wrapped = None;
	let env = TestEnv::with_repo(DocConfig::default(), |repo| {
		let repo = Arc::new(FlakyRepo::new(repo, &[]));
		wrapped = Some(Arc::clone(&repo));
		let repo: Arc<dyn DocRepo> = repo;
		repo
	})
	.await;
	let repo = wrapped.expect("Repository not wrapped");
	let writer = Writer::new();
	env.workspace.push_doc_updates("s1", "d1", &[writer.append("a")], None).await.expect("push");

	repo.fail_snapshots.store(true, Ordering::SeqCst);
	let res = env.workspace.get_doc("s1", "d1").await;
	assert!(matches!(res, Err(Error::FailedToUpsertSnapshot)));
	assert_eq!(env.metrics.get(Counter::SnapshotUpsertFailed), 1);
	assert_eq!(env.repo.get_update_count("s1", "d1").await.ok(), Some(1));

	repo.fail_snapshots.store(false, Ordering::SeqCst);
	let doc = env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc").expect("Doc not found");
	assert_eq!(read_text(&doc.bin), "a");
}

#[tokio::test]
async fn test_history_checkpoints_replaced_snapshots() {
	let env = TestEnv::new(always_history_config()).await;
	let writer = Writer::new();

	env.workspace.push_doc_updates("s1", "d1", &[writer.append("a")], Some("u1")).await.expect("push");
	let v1 = env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc").expect("Doc not found");
	tick().await;
	// Nothing replaced yet
	let none = env.workspace.list_doc_histories("s1", "d1", &HistoryFilter::default()).await;
	assert_eq!(none.ok().map(|h| h.len()), Some(0));

	env.workspace.push_doc_updates("s1", "d1", &[writer.append("b")], Some("u2")).await.expect("push");
	let v2 = env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc").expect("Doc not found");
	tick().await;
	env.workspace.push_doc_updates("s1", "d1", &[writer.append("c")], Some("u3")).await.expect("push");
	env.workspace.get_doc("s1", "d1").await.expect("get");

	let histories = env
		.workspace
		.list_doc_histories("s1", "d1", &HistoryFilter::default())
		.await
		.expect("Failed to list histories");
	let timestamps: Vec<Timestamp> = histories.iter().map(|h| h.timestamp).collect();
	assert_eq!(timestamps, vec![v2.timestamp, v1.timestamp]);
	assert_eq!(histories[1].editor.as_deref(), Some("u1"));
	assert_eq!(env.metrics.get(Counter::HistoryCreated), 2);

	let history = env
		.workspace
		.get_doc_history("s1", "d1", v1.timestamp)
		.await
		.ok()
		.flatten()
		.expect("History not found");
	assert_eq!(read_text(&history.bin), "a");
}

#[tokio::test]
async fn test_history_respects_min_interval() {
	// Default minimum interval is ten minutes
	let env = TestEnv::new(DocConfig::default()).await;
	let writer = Writer::new();

	for chunk in ["a", "b", "c", "d"] {
		env.workspace.push_doc_updates("s1", "d1", &[writer.append(chunk)], None).await.expect("push");
		env.workspace.get_doc("s1", "d1").await.expect("get");
		tick().await;
	}

	let histories = env
		.workspace
		.list_doc_histories("s1", "d1", &HistoryFilter::default())
		.await
		.expect("Failed to list histories");
	// Only the first replaced snapshot
	assert_eq!(histories.len(), 1);
}

#[tokio::test]
async fn test_history_disabled_by_zero_max_age() {
	let config = DocConfig { history_max_age_ms: 0, ..always_history_config() };
	let env = TestEnv::new(config).await;
	let writer = Writer::new();

	for chunk in ["a", "b", "c"] {
		env.workspace.push_doc_updates("s1", "d1", &[writer.append(chunk)], None).await.expect("push");
		env.workspace.get_doc("s1", "d1").await.expect("get");
	}

	let histories = env.workspace.list_doc_histories("s1", "d1", &HistoryFilter::default()).await;
	assert_eq!(histories.ok().map(|h| h.len()), Some(0));
	assert_eq!(env.metrics.get(Counter::HistoryCreated), 0);
}

#[tokio::test]
async fn test_history_disabled_when_max_age_lookup_fails() {
	let env = TestEnv::new(always_history_config()).await;
	let deps = DocStorageDeps { options: Arc::new(BrokenOptions), ..env.deps.clone() };
	let workspace = WorkspaceDocStorage::new(deps, WorkspaceOpts::default());
	let writer = Writer::new();

	for chunk in ["a", "b", "c"] {
		workspace.push_doc_updates("s1", "d1", &[writer.append(chunk)], None).await.expect("push");
		let doc = workspace.get_doc("s1", "d1").await.expect("Failed to get doc");
		assert!(doc.is_some());
		tick().await;
	}

	let histories = workspace
		.list_doc_histories("s1", "d1", &HistoryFilter::default())
		.await
		.expect("Failed to list histories");
	assert!(histories.is_empty());
	assert_eq!(env.metrics.get(Counter::HistoryCreated), 0);
}

#[tokio::test]
async fn test_empty_merge_is_not_persisted() {
	let env = TestEnv::new(DocConfig::default()).await;
	let mut rx = env.subscribe();

	env.workspace.push_doc_updates("s1", "d1", &[vec![0, 0]], None).await.expect("Failed to push");
	env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc");

	let stored = env.repo.get_snapshot("s1", "d1").await.expect("Failed to get snapshot");
	assert!(stored.is_none());
	assert_eq!(event_names(&drain(&mut rx)), vec!["doc.created"]);
	assert_eq!(env.metrics.get(Counter::SnapshotUpsertFailed), 0);
}

#[tokio::test]
async fn test_rollback_checkpoints_current_state() {
	let env = TestEnv::new(DocConfig::default()).await;
	let writer = Writer::new();

	env.workspace.push_doc_updates("s1", "d1", &[writer.append("a")], Some("u1")).await.expect("push");
	let v1 = env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc").expect("Doc not found");
	tick().await;
	env.workspace.push_doc_updates("s1", "d1", &[writer.append("b")], Some("u1")).await.expect("push");
	let v2 = env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc").expect("Doc not found");

	// Forced despite the minimum interval
	env.workspace
		.rollback_doc("s1", "d1", v1.timestamp, Some("u9"))
		.await
		.expect("Failed to roll back");

	let histories = env
		.workspace
		.list_doc_histories("s1", "d1", &HistoryFilter::default())
		.await
		.expect("Failed to list histories");
	assert_eq!(histories.len(), 2);
	assert_eq!(histories[0].timestamp, v2.timestamp);
	assert_eq!(histories[0].editor.as_deref(), Some("u9"));
	assert_eq!(env.metrics.get(Counter::HistoryRecovered), 1);

	// The snapshot itself is untouched
	let current = env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc").expect("Doc not found");
	assert_eq!(current, v2);
}

#[tokio::test]
async fn test_rollback_errors() {
	let env = TestEnv::new(DocConfig::default()).await;

	let res = env.workspace.rollback_doc("s1", "d1", Timestamp(5), None).await;
	assert!(matches!(
		res,
		Err(Error::DocHistoryNotFound { timestamp: Timestamp(5), .. })
	));

	// Checkpoint kept while the snapshot is gone
	let history = DocRecord {
		space_id: "s1".into(),
		doc_id: "d1".into(),
		bin: doc_with_text("old"),
		timestamp: Timestamp(7),
		editor: None,
	};
	env.repo
		.create_history(&history, Timestamp::from_now(Duration::from_secs(60)))
		.await
		.expect("Failed to create history");

	let res = env.workspace.rollback_doc("s1", "d1", Timestamp(7), Some("u1")).await;
	assert!(matches!(
		&res,
		Err(Error::DocNotFound { space_id, doc_id })
			if space_id.as_ref() == "s1" && doc_id.as_ref() == "d1"
	));
	assert_eq!(env.metrics.get(Counter::HistoryRecovered), 0);
}

#[tokio::test]
async fn test_doc_diff_against_state_vector() {
	let env = TestEnv::new(DocConfig::default()).await;
	let writer = Writer::new();
	let hello = writer.append("hello");
	let world = writer.append(" world");
	env.workspace.push_doc_updates("s1", "d1", &[hello.clone(), world], None).await.expect("push");

	// Not merged yet
	assert!(env.workspace.get_doc_diff("s1", "d1", None).await.expect("Failed to get diff").is_none());

	let doc = env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc").expect("Doc not found");
	let peer = Writer::new();
	peer.apply(&hello);

	let diff = env
		.workspace
		.get_doc_diff("s1", "d1", Some(peer.state_vector().as_slice()))
		.await
		.ok()
		.flatten()
		.expect("Doc not found");
	peer.apply(&diff.missing);
	assert_eq!(peer.text(), "hello world");
	assert_eq!(diff.timestamp, doc.timestamp);

	let full = env.workspace.get_doc_diff("s1", "d1", Some(&[][..])).await.expect("Failed to get diff");
	assert_eq!(full.map(|d| d.missing), Some(doc.bin));

	let invalid = env.workspace.get_doc_diff("s1", "d1", Some(&[0xff, 0xff, 0xff][..])).await;
	assert!(matches!(invalid, Err(Error::ValidationError(_))));
}

#[tokio::test]
async fn test_delete_doc() {
	let env = TestEnv::new(DocConfig::default()).await;
	let writer = Writer::new();
	env.workspace.push_doc_updates("s1", "d1", &[writer.append("a")], None).await.expect("push");
	env.workspace.push_doc_updates("s1", "d2", &[writer.append("b")], None).await.expect("push");
	let mut rx = env.subscribe();

	env.workspace.delete_doc("s1", "d1").await.expect("Failed to delete doc");

	assert!(env.workspace.get_doc("s1", "d1").await.expect("Failed to get doc").is_none());
	assert_eq!(env.cache.map_get(UPDATES_QUEUE_CACHE_KEY, &doc_key("s1", "d1")), None);
	assert_eq!(event_names(&drain(&mut rx)), vec!["doc.snapshot.deleted"]);

	let timestamps = env.workspace.get_space_doc_timestamps("s1", None).await.expect("list");
	assert_eq!(timestamps.keys().map(AsRef::as_ref).collect::<Vec<&str>>(), vec!["d2"]);

	env.workspace.delete_space("s1").await.expect("Failed to delete space");
	assert!(env.workspace.get_space_doc_timestamps("s1", None).await.expect("list").is_empty());
}

#[tokio::test]
async fn test_colons_in_ids_keep_counters_apart() {
	let env = TestEnv::new(DocConfig::default()).await;
	let writer = Writer::new();

	env.workspace.push_doc_updates("a:b", "c", &[writer.append("x")], None).await.expect("push");
	env.workspace.push_doc_updates("a", "b:c", &[writer.append("y")], None).await.expect("push");

	assert_eq!(env.cache.map_get(UPDATES_QUEUE_CACHE_KEY, &doc_key("a:b", "c")), Some(1));
	assert_eq!(env.cache.map_get(UPDATES_QUEUE_CACHE_KEY, &doc_key("a", "b:c")), Some(1));

	env.workspace.get_doc("a:b", "c").await.expect("Failed to get doc");
	assert_eq!(env.cache.map_get(UPDATES_QUEUE_CACHE_KEY, &doc_key("a:b", "c")), None);
	assert_eq!(env.cache.map_get(UPDATES_QUEUE_CACHE_KEY, &doc_key("a", "b:c")), Some(1));

	let picked = env.workspace.random_doc().await.expect("Failed to pick").expect("No pending doc");
	assert_eq!((picked.space_id.as_ref(), picked.doc_id.as_ref()), ("a", "b:c"));
}

#[tokio::test]
async fn test_random_doc_repairs_stale_counters() {
	let env = TestEnv::new(DocConfig::default()).await;
	let writer = Writer::new();

	assert_eq!(env.workspace.random_doc().await.ok(), Some(None));

	env.workspace.push_doc_updates("s1", "d1", &[writer.append("a")], None).await.expect("push");
	let picked = env.workspace.random_doc().await.expect("Failed to pick doc").expect("No pending doc");
	assert_eq!((picked.space_id.as_ref(), picked.doc_id.as_ref()), ("s1", "d1"));

	// Counter without any stored update
	env.workspace.get_doc("s1", "d1").await.expect("get");
	env.cache
		.map_increase(UPDATES_QUEUE_CACHE_KEY, &doc_key("s1", "ghost"), 3)
		.await
		.expect("increase");
	assert_eq!(env.workspace.random_doc().await.ok(), Some(None));
	assert_eq!(env.metrics.get(Counter::DocUpdateCountInconsistentWithCache), 1);
	assert_eq!(env.cache.map_len(UPDATES_QUEUE_CACHE_KEY), 0);

	env.cache.map_increase(UPDATES_QUEUE_CACHE_KEY, "no-separator", 1).await.expect("increase");
	assert_eq!(env.workspace.random_doc().await.ok(), Some(None));
	assert_eq!(env.cache.map_len(UPDATES_QUEUE_CACHE_KEY), 0);
}

// vim: ts=4
