//! Userspace doc storage tests

mod common;

use common::*;
use docstore_core::DocConfig;
use docstore_doc::DocStorageAdapter;
use docstore_types::doc_adapter::{DocRepo, HistoryFilter};
use docstore_types::types::Timestamp;

#[tokio::test]
async fn test_push_merges_immediately() {
	let env = TestEnv::new(DocConfig::default()).await;
	let writer = Writer::new();

	let ts = env
		.userspace
		.push_doc_updates("u1", "settings", &[writer.append("a"), writer.append("b")], Some("u1"))
		.await
		.expect("Failed to push");
	env.userspace
		.push_doc_updates("u1", "settings", &[writer.append("c")], Some("u1"))
		.await
		.expect("Failed to push");

	// No update log, no pending counter
	assert_eq!(env.repo.get_update_count("u1", "settings").await.ok(), Some(0));
	assert_eq!(env.repo.get_global_update_count().await.ok(), Some(0));

	let doc = env.userspace.get_doc("u1", "settings").await.expect("Failed to get doc").expect("Doc not found");
	assert_eq!(read_text(&doc.bin), "abc");
	assert!(doc.timestamp >= ts);

	// Not visible as a workspace doc
	assert!(env.repo.get_snapshot("u1", "settings").await.expect("Failed to get snapshot").is_none());
}

#[tokio::test]
async fn test_diff_and_timestamps() {
	let env = TestEnv::new(DocConfig::default()).await;
	let writer = Writer::new();
	let first = writer.append("hello");
	env.userspace.push_doc_updates("u1", "d1", &[first.clone()], None).await.expect("push");
	env.userspace.push_doc_updates("u1", "d1", &[writer.append("!")], None).await.expect("push");

	let peer = Writer::new();
	peer.apply(&first);
	let diff = env
		.userspace
		.get_doc_diff("u1", "d1", Some(peer.state_vector().as_slice()))
		.await
		.ok()
		.flatten()
		.expect("Doc not found");
	peer.apply(&diff.missing);
	assert_eq!(peer.text(), "hello!");

	let timestamps = env.userspace.get_space_doc_timestamps("u1", None).await.expect("list");
	assert_eq!(timestamps.get("d1"), Some(&diff.timestamp));
	let later = env
		.userspace
		.get_space_doc_timestamps("u1", Some(diff.timestamp))
		.await
		.expect("list");
	assert!(later.is_empty());
}

#[tokio::test]
async fn test_no_history() {
	let env = TestEnv::new(DocConfig::default()).await;
	let writer = Writer::new();
	env.userspace.push_doc_updates("u1", "d1", &[writer.append("a")], None).await.expect("push");

	let histories = env.userspace.list_doc_histories("u1", "d1", &HistoryFilter::default()).await;
	assert_eq!(histories.ok().map(|h| h.len()), Some(0));
	assert!(env.userspace.get_doc_history("u1", "d1", Timestamp(1)).await.expect("Failed to get history").is_none());
	assert!(env.userspace.rollback_doc("u1", "d1", Timestamp(1), None).await.is_ok());
}

#[tokio::test]
async fn test_delete() {
	let env = TestEnv::new(DocConfig::default()).await;
	let writer = Writer::new();
	env.userspace.push_doc_updates("u1", "d1", &[writer.append("a")], None).await.expect("push");
	env.userspace.push_doc_updates("u1", "d2", &[writer.append("b")], None).await.expect("push");

	env.userspace.delete_doc("u1", "d1").await.expect("Failed to delete doc");
	assert!(env.userspace.get_doc("u1", "d1").await.expect("Failed to get doc").is_none());
	assert!(env.userspace.get_doc("u1", "d2").await.expect("Failed to get doc").is_some());

	env.userspace.delete_space("u1").await.expect("Failed to delete space");
	assert!(env.userspace.get_doc("u1", "d2").await.expect("Failed to get doc").is_none());
}

// vim: ts=4
