//! Per-space storage options provider

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

use crate::prelude::*;

#[async_trait]
pub trait DocStorageOptions: Debug + Send + Sync {
	/// Minimum spacing between two history checkpoints of a doc
	fn history_min_interval(&self, space_id: &str) -> Duration;

	/// Retention of history checkpoints. A zero duration disables history.
	async fn history_max_age(&self, space_id: &str) -> ClResult<Duration>;
}

// vim: ts=4
