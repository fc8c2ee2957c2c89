//! App builder - constructs and runs the docstore node

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use docstore_core::crypto::RpcSigner;
use docstore_core::event_bus::LocalEventBus;
use docstore_core::local_cache::LocalCache;
use docstore_core::local_mutex::{LocalMutex, LocalMutexConfig};
use docstore_core::options::ConfigDocOptions;
use docstore_core::{DocConfig, DocMetrics};
use docstore_doc::job::DocJobs;
use docstore_doc::{
	DatabaseDocReader, DocReader, DocStorageDeps, RpcDocReader, UserspaceDocStorage,
	WorkspaceDocStorage, WorkspaceOpts,
};
use docstore_doc_adapter_redb::DocAdapterRedb;
use docstore_types::doc_adapter::DocRepo;
use docstore_types::prelude::*;

use crate::routes;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Role of the node in a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
	/// Owns the docs and answers the doc RPC
	DocService,
	/// Reads docs through a remote doc service
	Api,
}

impl ServerMode {
	pub fn from_config(config: &DocConfig) -> Self {
		if config.doc_service.endpoint.is_some() { ServerMode::Api } else { ServerMode::DocService }
	}
}

/// Running state of a node
#[derive(Debug, Clone)]
pub struct App {
	pub mode: ServerMode,
	pub config: Arc<DocConfig>,
	pub metrics: Arc<DocMetrics>,
	pub events: Arc<LocalEventBus>,
	pub workspace: Arc<WorkspaceDocStorage>,
	pub userspace: Arc<UserspaceDocStorage>,
	/// Reads served by this node: local storage, or the doc service in API mode
	pub reader: Arc<dyn DocReader>,
	/// Reads of the local storage, exposed through the doc RPC
	pub local_reader: Arc<dyn DocReader>,
}

pub struct AppBuilder {
	config: DocConfig,
	repo: Option<Arc<dyn DocRepo>>,
	jobs: bool,
}

impl AppBuilder {
	pub fn new() -> Self {
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_target(false)
			.try_init();
		AppBuilder { config: DocConfig::default(), repo: None, jobs: true }
	}

	pub fn config(&mut self, config: DocConfig) -> &mut Self {
		self.config = config;
		self
	}

	pub fn listen(&mut self, listen: impl Into<Box<str>>) -> &mut Self {
		self.config.listen = listen.into();
		self
	}

	/// Use the given repository instead of opening redb under `storage_path`
	pub fn repo(&mut self, repo: Arc<dyn DocRepo>) -> &mut Self {
		self.repo = Some(repo);
		self
	}

	/// Whether to start the background jobs (on by default)
	pub fn jobs(&mut self, jobs: bool) -> &mut Self {
		self.jobs = jobs;
		self
	}

	/// Wire every component. Returns the app and the handles of the started jobs.
	pub async fn build(&self) -> ClResult<(App, Vec<JoinHandle<()>>)> {
		self.config.validate()?;
		let config = Arc::new(self.config.clone());
		let mode = ServerMode::from_config(&config);

		let repo: Arc<dyn DocRepo> = match &self.repo {
			Some(repo) => Arc::clone(repo),
			None => {
				info!(
					path = %config.storage_path.display(),
					per_space_files = config.per_space_files,
					"Opening doc storage"
				);
				Arc::new(DocAdapterRedb::new(&config.storage_path, config.per_space_files).await?)
			}
		};

		let metrics = Arc::new(DocMetrics::new());
		let events = Arc::new(LocalEventBus::new());
		let mutex = Arc::new(LocalMutex::new(LocalMutexConfig {
			ttl: Duration::from_millis(config.lock_ttl_ms),
			retries: config.lock_retries,
			retry_delay: Duration::from_millis(config.lock_retry_delay_ms),
		}));
		let deps = DocStorageDeps {
			repo,
			mutex,
			cache: Arc::new(LocalCache::new()),
			events: events.clone(),
			options: Arc::new(ConfigDocOptions::new(Arc::clone(&config))),
			metrics: Arc::clone(&metrics),
		};

		let workspace =
			Arc::new(WorkspaceDocStorage::new(deps.clone(), WorkspaceOpts::from_config(&config)));
		let userspace = Arc::new(UserspaceDocStorage::new(deps));
		let local_reader: Arc<dyn DocReader> = Arc::new(DatabaseDocReader::new(workspace.clone()));

		let reader: Arc<dyn DocReader> = match (&config.doc_service.endpoint, &config.rpc_secret) {
			(Some(endpoint), Some(secret)) => {
				info!(endpoint = %endpoint, "Reading docs through the doc service");
				Arc::new(RpcDocReader::new(
					endpoint,
					RpcSigner::new(secret),
					config.rpc_timeout(),
					Arc::clone(&local_reader),
					Arc::clone(&metrics),
				))
			}
			(Some(_), None) => {
				return Err(Error::ConfigError("doc_service.endpoint requires rpc_secret".into()));
			}
			(None, _) => Arc::clone(&local_reader),
		};

		let handles = if self.jobs {
			let jobs = Arc::new(DocJobs::new(workspace.clone(), userspace.clone(), metrics.clone()));
			jobs.spawn(&config, events.as_ref())?
		} else {
			Vec::new()
		};

		let app =
			App { mode, config, metrics, events, workspace, userspace, reader, local_reader };
		Ok((app, handles))
	}

	pub async fn run(self) -> ClResult<()> {
		info!("docstore V{}", VERSION);

		let (app, handles) = self.build().await?;
		let router = routes::init(&app);

		let listener =
			tokio::net::TcpListener::bind(app.config.listen.as_ref()).await.inspect_err(|e| {
				error!("FATAL: cannot listen on {}: {}", app.config.listen, e);
			})?;
		info!(mode = ?app.mode, "Listening on {}", app.config.listen);

		let res = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await;

		for handle in handles {
			handle.abort();
		}
		info!("Shutting down");
		Ok(res?)
	}
}

impl Default for AppBuilder {
	fn default() -> Self {
		Self::new()
	}
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		warn!("Cannot listen for shutdown signal: {}", e);
		std::future::pending::<()>().await;
	}
}

// vim: ts=4
