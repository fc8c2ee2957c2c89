//! Doc storage configuration
//!
//! Read from an optional JSON file named by `DOCSTORE_CONFIG`, then selected
//! fields are overridden from the environment. Every field has a default.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::prelude::*;
use crate::schedule::CronSchedule;

pub const ENV_CONFIG: &str = "DOCSTORE_CONFIG";
pub const ENV_LISTEN: &str = "DOCSTORE_LISTEN";
pub const ENV_STORAGE: &str = "DOCSTORE_STORAGE";
pub const ENV_DOC_SERVICE: &str = "DOCSTORE_DOC_SERVICE";
pub const ENV_RPC_SECRET: &str = "DOCSTORE_RPC_SECRET";

const MINUTE_MS: u64 = 60 * 1000;
const DAY_MS: u64 = 24 * 60 * MINUTE_MS;

/// Per-space override of the history policy
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpaceDocConfig {
	pub history_min_interval_ms: Option<u64>,
	pub history_max_age_ms: Option<u64>,
}

/// Remote doc-service node. Without an endpoint this process serves docs itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocServiceConfig {
	pub endpoint: Option<Box<str>>,
	pub timeout_ms: u64,
}

impl Default for DocServiceConfig {
	fn default() -> Self {
		Self { endpoint: None, timeout_ms: 5000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocConfig {
	pub listen: Box<str>,
	pub storage_path: PathBuf,
	/// One database file per space instead of a shared one
	pub per_space_files: bool,

	pub history_min_interval_ms: u64,
	pub history_max_age_ms: u64,
	pub spaces: HashMap<Box<str>, SpaceDocConfig>,

	pub update_batch_size: usize,
	pub update_insert_retries: u32,

	pub merge_interval_ms: u64,
	pub history_cleanup_cron: Box<str>,
	pub queue_report_cron: Box<str>,

	pub lock_ttl_ms: u64,
	pub lock_retries: u32,
	pub lock_retry_delay_ms: u64,

	pub doc_service: DocServiceConfig,
	pub rpc_secret: Option<Box<str>>,
}

impl Default for DocConfig {
	fn default() -> Self {
		Self {
			listen: "127.0.0.1:3010".into(),
			storage_path: PathBuf::from("./data"),
			per_space_files: false,
			history_min_interval_ms: 10 * MINUTE_MS,
			history_max_age_ms: 7 * DAY_MS,
			spaces: HashMap::new(),
			update_batch_size: 10,
			update_insert_retries: 3,
			merge_interval_ms: 1000,
			history_cleanup_cron: "0 0 * * *".into(),
			queue_report_cron: "* * * * *".into(),
			lock_ttl_ms: MINUTE_MS,
			lock_retries: 3,
			lock_retry_delay_ms: 200,
			doc_service: DocServiceConfig::default(),
			rpc_secret: None,
		}
	}
}

impl DocConfig {
	/// Load from `DOCSTORE_CONFIG` (if set) and the process environment
	pub fn load() -> ClResult<Self> {
		let mut config = match std::env::var(ENV_CONFIG) {
			Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
			_ => Self::default(),
		};
		config.apply_env(|name| std::env::var(name).ok());
		config.validate()?;
		Ok(config)
	}

	pub fn from_file(path: &Path) -> ClResult<Self> {
		let json = std::fs::read_to_string(path).map_err(|e| {
			Error::ConfigError(format!("cannot read {}: {}", path.display(), e))
		})?;
		Self::from_json(&json)
	}

	pub fn from_json(json: &str) -> ClResult<Self> {
		serde_json::from_str(json).map_err(|e| Error::ConfigError(format!("invalid config: {}", e)))
	}

	/// Override fields from environment variables, looked up through `lookup`
	pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
		let lookup = |name: &str| lookup(name).filter(|v| !v.is_empty());
		if let Some(listen) = lookup(ENV_LISTEN) {
			self.listen = listen.into();
		}
		if let Some(storage) = lookup(ENV_STORAGE) {
			self.storage_path = PathBuf::from(storage);
		}
		if let Some(endpoint) = lookup(ENV_DOC_SERVICE) {
			self.doc_service.endpoint = Some(endpoint.into());
		}
		if let Some(secret) = lookup(ENV_RPC_SECRET) {
			self.rpc_secret = Some(secret.into());
		}
	}

	pub fn validate(&self) -> ClResult<()> {
		if self.update_batch_size == 0 {
			return Err(Error::ConfigError("update_batch_size must be positive".into()));
		}
		if self.merge_interval_ms == 0 {
			return Err(Error::ConfigError("merge_interval_ms must be positive".into()));
		}
		CronSchedule::parse(&self.history_cleanup_cron)?;
		CronSchedule::parse(&self.queue_report_cron)?;
		if self.doc_service.endpoint.is_some() && self.rpc_secret.is_none() {
			return Err(Error::ConfigError("doc_service.endpoint requires rpc_secret".into()));
		}
		Ok(())
	}

	pub fn history_min_interval(&self, space_id: &str) -> Duration {
		let ms = self
			.spaces
			.get(space_id)
			.and_then(|space| space.history_min_interval_ms)
			.unwrap_or(self.history_min_interval_ms);
		Duration::from_millis(ms)
	}

	pub fn history_max_age(&self, space_id: &str) -> Duration {
		let ms = self
			.spaces
			.get(space_id)
			.and_then(|space| space.history_max_age_ms)
			.unwrap_or(self.history_max_age_ms);
		Duration::from_millis(ms)
	}

	pub fn merge_interval(&self) -> Duration {
		Duration::from_millis(self.merge_interval_ms)
	}

	pub fn rpc_timeout(&self) -> Duration {
		Duration::from_millis(self.doc_service.timeout_ms)
	}
}


// vim: ts=4
