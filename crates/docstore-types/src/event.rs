//! Event bus interface
//!
//! `emit` delivers to listeners of this process only, `broadcast` fans out to
//! every process sharing the bus. Both are fire-and-forget and at-most-once.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tokio::sync::broadcast;

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DocEvent {
	#[serde(rename = "doc.created", rename_all = "camelCase")]
	DocCreated { space_id: Box<str>, doc_id: Box<str>, editor: Option<Box<str>> },
	#[serde(rename = "doc.snapshot.updated", rename_all = "camelCase")]
	SnapshotUpdated {
		space_id: Box<str>,
		doc_id: Box<str>,
		timestamp: Timestamp,
		editor: Option<Box<str>>,
	},
	#[serde(rename = "doc.snapshot.deleted", rename_all = "camelCase")]
	SnapshotDeleted { space_id: Box<str>, doc_id: Box<str> },
	#[serde(rename = "user.deleted", rename_all = "camelCase")]
	UserDeleted { user_id: Box<str>, owned_spaces: Vec<Box<str>> },
}

impl DocEvent {
	pub fn name(&self) -> &'static str {
		match self {
			DocEvent::DocCreated { .. } => "doc.created",
			DocEvent::SnapshotUpdated { .. } => "doc.snapshot.updated",
			DocEvent::SnapshotDeleted { .. } => "doc.snapshot.deleted",
			DocEvent::UserDeleted { .. } => "user.deleted",
		}
	}
}

pub trait EventBus: Debug + Send + Sync {
	/// Deliver to local listeners
	fn emit(&self, event: DocEvent);

	/// Deliver to listeners of every process
	fn broadcast(&self, event: DocEvent);

	fn subscribe(&self) -> broadcast::Receiver<DocEvent>;
}


// vim: ts=4
