use docstore_core::DocConfig;
use docstore_server::AppBuilder;

#[tokio::main]
async fn main() -> docstore_types::prelude::ClResult<()> {
	let mut app = AppBuilder::new();
	let config = DocConfig::load().inspect_err(|e| {
		tracing::error!("FATAL: {}", e);
	})?;
	app.config(config);
	app.run().await
}

// vim: ts=4
