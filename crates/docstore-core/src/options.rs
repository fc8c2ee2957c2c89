//! Storage options backed by [`DocConfig`]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use docstore_types::options::DocStorageOptions;

use crate::config::DocConfig;
use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct ConfigDocOptions {
	config: Arc<DocConfig>,
}

impl ConfigDocOptions {
	pub fn new(config: Arc<DocConfig>) -> Self {
		Self { config }
	}
}

#[async_trait]
impl DocStorageOptions for ConfigDocOptions {
	fn history_min_interval(&self, space_id: &str) -> Duration {
		self.config.history_min_interval(space_id)
	}

	async fn history_max_age(&self, space_id: &str) -> ClResult<Duration> {
		Ok(self.config.history_max_age(space_id))
	}
}

// vim: ts=4
