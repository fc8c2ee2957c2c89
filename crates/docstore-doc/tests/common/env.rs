//! Test environment builders
//!
//! The TempDir is kept in the environment so that the database outlives the
//! test body.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

use docstore_core::event_bus::LocalEventBus;
use docstore_core::local_cache::LocalCache;
use docstore_core::local_mutex::{LocalMutex, LocalMutexConfig};
use docstore_core::options::ConfigDocOptions;
use docstore_core::{DocConfig, DocMetrics};
use docstore_doc::{DocStorageDeps, UserspaceDocStorage, WorkspaceDocStorage, WorkspaceOpts};
use docstore_doc_adapter_redb::DocAdapterRedb;
use docstore_types::doc_adapter::DocRepo;
use docstore_types::event::{DocEvent, EventBus};

pub fn setup_test_logging() {
	let _ = tracing_subscriber::fmt()
		.with_test_writer()
		.with_max_level(tracing::Level::DEBUG)
		.try_init();
}

pub struct TestEnv {
	pub config: Arc<DocConfig>,
	pub repo: Arc<dyn DocRepo>,
	pub cache: Arc<LocalCache>,
	pub events: Arc<LocalEventBus>,
	pub metrics: Arc<DocMetrics>,
	pub deps: DocStorageDeps,
	pub workspace: Arc<WorkspaceDocStorage>,
	pub userspace: Arc<UserspaceDocStorage>,
	_temp: TempDir,
}

impl TestEnv {
	pub async fn new(config: DocConfig) -> Self {
		Self::with_repo(config, |repo| repo).await
	}

	/// Build the environment around a wrapped repository
	pub async fn with_repo(
		config: DocConfig,
		wrap: impl FnOnce(Arc<dyn DocRepo>) -> Arc<dyn DocRepo>,
	) -> Self {
		setup_test_logging();
		let temp = TempDir::new().expect("Failed to create temp directory");
		let adapter = DocAdapterRedb::new(temp.path(), false)
			.await
			.expect("Failed to create adapter");
		let repo = wrap(Arc::new(adapter));

		let config = Arc::new(config);
		let cache = Arc::new(LocalCache::new());
		let events = Arc::new(LocalEventBus::new());
		let metrics = Arc::new(DocMetrics::new());
		let mutex = Arc::new(LocalMutex::new(LocalMutexConfig {
			ttl: Duration::from_secs(10),
			retries: 20,
			retry_delay: Duration::from_millis(20),
		}));

		let deps = DocStorageDeps {
			repo: Arc::clone(&repo),
			mutex,
			cache: cache.clone(),
			events: events.clone(),
			options: Arc::new(ConfigDocOptions::new(Arc::clone(&config))),
			metrics: Arc::clone(&metrics),
		};
		let workspace =
			Arc::new(WorkspaceDocStorage::new(deps.clone(), WorkspaceOpts::from_config(&config)));
		let userspace = Arc::new(UserspaceDocStorage::new(deps.clone()));

		Self { config, repo, cache, events, metrics, deps, workspace, userspace, _temp: temp }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<DocEvent> {
		self.events.subscribe()
	}
}

/// Everything received so far
pub fn drain(rx: &mut broadcast::Receiver<DocEvent>) -> Vec<DocEvent> {
	let mut events = Vec::new();
	while let Ok(event) = rx.try_recv() {
		events.push(event);
	}
	events
}

pub fn event_names(events: &[DocEvent]) -> Vec<&'static str> {
	events.iter().map(DocEvent::name).collect()
}

// vim: ts=4
