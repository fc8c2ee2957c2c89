//! Background jobs of the doc engine
//!
//! - compaction: every merge interval, merge the pending updates of one doc
//!   picked at random from the pending counter map
//! - history retention: drop expired checkpoints (cron)
//! - queue report: publish the global pending update count (cron)
//! - account cleanup: remove the docs of a deleted user

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use docstore_core::schedule::{CronSchedule, spawn_cron, spawn_interval};
use docstore_core::{Counter, DocConfig, DocMetrics};
use docstore_types::event::{DocEvent, EventBus};

use crate::prelude::*;
use crate::storage::DocStorageAdapter;
use crate::workspace::{PendingDoc, WorkspaceDocStorage};

#[derive(Debug)]
pub struct DocJobs {
	workspace: Arc<WorkspaceDocStorage>,
	userspace: Arc<dyn DocStorageAdapter>,
	metrics: Arc<DocMetrics>,
}

impl DocJobs {
	pub fn new(
		workspace: Arc<WorkspaceDocStorage>,
		userspace: Arc<dyn DocStorageAdapter>,
		metrics: Arc<DocMetrics>,
	) -> Self {
		Self { workspace, userspace, metrics }
	}

	/// One compaction run. Returns the doc that was merged, if any.
	pub async fn merge_pending_doc_updates(&self) -> Option<PendingDoc> {
		let res = async {
			let Some(doc) = self.workspace.random_doc().await? else {
				return Ok(None);
			};
			self.workspace.get_doc(&doc.space_id, &doc.doc_id).await?;
			Ok::<_, Error>(Some(doc))
		}
		.await;

		match res {
			Ok(Some(doc)) => {
				trace!(space_id = %doc.space_id, doc_id = %doc.doc_id, "Merged pending doc updates");
				Some(doc)
			}
			Ok(None) => None,
			Err(err) => {
				self.metrics.incr(Counter::AutoMergePendingDocUpdatesError);
				error!(error = %err, "Failed to merge pending doc updates");
				None
			}
		}
	}

	pub async fn cleanup_expired_histories(&self) {
		match self.workspace.delete_expired_histories().await {
			Ok(count) => info!(count, "Expired doc histories removed"),
			Err(err) => {
				self.metrics.incr(Counter::HistoryCleanupError);
				error!(error = %err, "Failed to remove expired doc histories");
			}
		}
	}

	pub async fn report_updates_queue_count(&self) {
		match self.workspace.pending_update_count().await {
			Ok(count) => self.metrics.set_updates_queue_count(count),
			Err(err) => error!(error = %err, "Failed to count pending doc updates"),
		}
	}

	pub async fn handle_event(&self, event: &DocEvent) {
		let DocEvent::UserDeleted { user_id, owned_spaces } = event else {
			return;
		};

		for space_id in owned_spaces {
			if let Err(err) = self.workspace.delete_space(space_id).await {
				error!(user_id = %user_id, space_id = %space_id, error = %err, "Failed to delete docs of space");
			}
		}
		if let Err(err) = self.userspace.delete_space(user_id).await {
			error!(user_id = %user_id, error = %err, "Failed to delete userspace docs");
		}
		info!(user_id = %user_id, spaces = owned_spaces.len(), "Docs of deleted user removed");
	}

	/// Start every job. The handles run until aborted.
	pub fn spawn(
		self: &Arc<Self>,
		config: &DocConfig,
		events: &dyn EventBus,
	) -> ClResult<Vec<JoinHandle<()>>> {
		let cleanup = CronSchedule::parse(&config.history_cleanup_cron)?;
		let report = CronSchedule::parse(&config.queue_report_cron)?;
		let mut handles = Vec::with_capacity(4);

		let jobs = Arc::clone(self);
		handles.push(spawn_interval("merge-pending-doc-updates", config.merge_interval(), move || {
			let jobs = Arc::clone(&jobs);
			async move {
				jobs.merge_pending_doc_updates().await;
			}
		}));

		let jobs = Arc::clone(self);
		handles.push(spawn_cron("cleanup-expired-histories", cleanup, move || {
			let jobs = Arc::clone(&jobs);
			async move { jobs.cleanup_expired_histories().await }
		}));

		let jobs = Arc::clone(self);
		handles.push(spawn_cron("report-updates-queue-count", report, move || {
			let jobs = Arc::clone(&jobs);
			async move { jobs.report_updates_queue_count().await }
		}));

		let jobs = Arc::clone(self);
		let mut rx = events.subscribe();
		handles.push(tokio::spawn(async move {
			loop {
				match rx.recv().await {
					Ok(event) => jobs.handle_event(&event).await,
					Err(RecvError::Lagged(skipped)) => {
						warn!(skipped, "Doc event listener lagged behind");
					}
					Err(RecvError::Closed) => break,
				}
			}
		}));

		Ok(handles)
	}
}

// vim: ts=4
