//! HTTP routes of a node

use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};

use docstore_core::crypto::RpcSigner;
use docstore_core::metrics::MetricsSnapshot;
use docstore_doc::rpc::handler::{self, RpcState};
use docstore_types::prelude::*;

use crate::app::{App, ServerMode, VERSION};

pub fn init(app: &App) -> Router {
	let router = Router::new()
		.route("/health", get(get_health))
		.route("/metrics", get(get_metrics))
		.with_state(app.clone());

	match (app.mode, &app.config.rpc_secret) {
		(ServerMode::DocService, Some(secret)) => {
			info!("Serving the doc RPC");
			router.merge(handler::router(RpcState {
				reader: app.local_reader.clone(),
				signer: RpcSigner::new(secret),
			}))
		}
		(ServerMode::DocService, None) => {
			warn!("No rpc_secret configured, the doc RPC is disabled");
			router
		}
		(ServerMode::Api, _) => router,
	}
}

async fn get_health(State(app): State<App>) -> Json<Value> {
	let mode = match app.mode {
		ServerMode::DocService => "doc-service",
		ServerMode::Api => "api",
	};
	Json(json!({ "status": "ok", "version": VERSION, "mode": mode }))
}

async fn get_metrics(State(app): State<App>) -> Json<MetricsSnapshot> {
	Json(app.metrics.snapshot())
}

// vim: ts=4
