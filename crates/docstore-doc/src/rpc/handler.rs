//! Doc service side of the doc RPC

use axum::{
	Router,
	body::{Body, Bytes},
	extract::{Path, State},
	http::{HeaderMap, HeaderValue, header::CONTENT_TYPE},
	response::Response,
	routing::{get, post},
};
use std::sync::Arc;

use docstore_core::crypto::RpcSigner;

use super::wire::{
	CONTENT_TYPE_BINARY, DiffFrame, HEADER_ACCESS_TOKEN, HEADER_DOC_EDITOR_ID,
	HEADER_DOC_MISSING_OFFSET, HEADER_DOC_STATE_OFFSET, HEADER_DOC_TIMESTAMP, HEADER_REQUEST_ID,
};
use crate::prelude::*;
use crate::reader::DocReader;

#[derive(Debug, Clone)]
pub struct RpcState {
	pub reader: Arc<dyn DocReader>,
	pub signer: RpcSigner,
}

pub fn router(state: RpcState) -> Router {
	Router::new()
		.route("/rpc/workspaces/{space_id}/docs/{doc_id}", get(get_doc))
		.route("/rpc/workspaces/{space_id}/docs/{doc_id}/diff", post(get_doc_diff))
		.with_state(state)
}

/// The token must sign exactly the requested doc id
fn authorize(state: &RpcState, headers: &HeaderMap, doc_id: &str) -> ClResult<()> {
	let token = headers
		.get(HEADER_ACCESS_TOKEN)
		.and_then(|v| v.to_str().ok())
		.ok_or(Error::Unauthorized)?;
	state.signer.verify_for(token, doc_id)
}

fn request_id(headers: &HeaderMap) -> &str {
	headers.get(HEADER_REQUEST_ID).and_then(|v| v.to_str().ok()).unwrap_or("-")
}

fn build(response: axum::http::response::Builder, body: Vec<u8>) -> ClResult<Response> {
	response
		.header(CONTENT_TYPE, CONTENT_TYPE_BINARY)
		.body(Body::from(body))
		.map_err(|e| Error::Internal(format!("response build error: {}", e)))
}

async fn get_doc(
	State(state): State<RpcState>,
	Path((space_id, doc_id)): Path<(String, String)>,
	headers: HeaderMap,
) -> ClResult<Response> {
	authorize(&state, &headers, &doc_id)?;
	debug!(request_id = request_id(&headers), space_id = %space_id, doc_id = %doc_id, "RPC get doc");

	let doc = state
		.reader
		.get_doc(&space_id, &doc_id)
		.await?
		.ok_or_else(|| Error::doc_not_found(&space_id, &doc_id))?;

	let mut response =
		Response::builder().header(HEADER_DOC_TIMESTAMP, doc.timestamp.to_string());
	if let Some(editor) = doc.editor.as_deref().and_then(|e| HeaderValue::from_str(e).ok()) {
		response = response.header(HEADER_DOC_EDITOR_ID, editor);
	}
	build(response, doc.bin)
}

/// Body is the caller's state vector, empty for "everything"
async fn get_doc_diff(
	State(state): State<RpcState>,
	Path((space_id, doc_id)): Path<(String, String)>,
	headers: HeaderMap,
	body: Bytes,
) -> ClResult<Response> {
	authorize(&state, &headers, &doc_id)?;
	debug!(request_id = request_id(&headers), space_id = %space_id, doc_id = %doc_id, "RPC get doc diff");

	let state_vector = if body.is_empty() { None } else { Some(body.as_ref()) };
	let diff = state
		.reader
		.get_doc_diff(&space_id, &doc_id, state_vector)
		.await?
		.ok_or_else(|| Error::doc_not_found(&space_id, &doc_id))?;

	let frame = DiffFrame::encode(&diff);
	let response = Response::builder()
		.header(HEADER_DOC_TIMESTAMP, diff.timestamp.to_string())
		.header(HEADER_DOC_MISSING_OFFSET, frame.missing.header_value())
		.header(HEADER_DOC_STATE_OFFSET, frame.state.header_value());
	build(response, frame.body)
}

// vim: ts=4
