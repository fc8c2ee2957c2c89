//! Doc RPC between nodes
//!
//! Nodes that do not serve docs themselves read them from a doc-service node
//! over HTTP. Requests carry an `x-access-token` signing the doc id with the
//! shared RPC secret.
//!
//! [`RpcDocReader`] only falls back to its local reader when the doc service
//! could not be reached (connection failure, timeout, malformed response).
//! Application errors answered by the doc service are returned as they are.

pub mod handler;
pub mod wire;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{HeaderMap, Method, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use std::time::Duration;
use urlencoding::encode;

use docstore_core::crypto::RpcSigner;
use docstore_core::{Counter, DocMetrics};
use docstore_types::doc_adapter::DocRecord;
use docstore_types::error::ErrorBody;
use docstore_types::utils::random_id;

use crate::merge::DocDiff;
use crate::prelude::*;
use crate::reader::DocReader;
use wire::{
	ByteRange, CONTENT_TYPE_BINARY, DiffFrame, HEADER_ACCESS_TOKEN, HEADER_DOC_EDITOR_ID,
	HEADER_DOC_MISSING_OFFSET, HEADER_DOC_STATE_OFFSET, HEADER_DOC_TIMESTAMP, HEADER_REQUEST_ID,
};

/// Ids are opaque: every byte outside the unreserved set is percent-encoded
pub fn doc_path(space_id: &str, doc_id: &str) -> String {
	format!("/rpc/workspaces/{}/docs/{}", encode(space_id), encode(doc_id))
}

pub fn doc_diff_path(space_id: &str, doc_id: &str) -> String {
	format!("{}/diff", doc_path(space_id, doc_id))
}

struct RpcResponse {
	headers: HeaderMap,
	body: Bytes,
}

/// A 2xx response the doc service should never send
fn malformed(err: Error) -> Error {
	Error::NetworkError(format!("malformed doc service response: {}", err))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> ClResult<&'a str> {
	headers
		.get(name)
		.and_then(|v| v.to_str().ok())
		.ok_or_else(|| malformed(Error::ValidationError(format!("missing header {}", name))))
}

fn header_timestamp(headers: &HeaderMap) -> ClResult<Timestamp> {
	header_str(headers, HEADER_DOC_TIMESTAMP)?.parse().map_err(|_| {
		malformed(Error::ValidationError(format!("invalid header {}", HEADER_DOC_TIMESTAMP)))
	})
}

#[derive(Debug)]
pub struct RpcDocReader {
	endpoint: Box<str>,
	signer: RpcSigner,
	timeout: Duration,
	client: Client<HttpConnector, Full<Bytes>>,
	fallback: Arc<dyn DocReader>,
	metrics: Arc<DocMetrics>,
}

impl RpcDocReader {
	pub fn new(
		endpoint: &str,
		signer: RpcSigner,
		timeout: Duration,
		fallback: Arc<dyn DocReader>,
		metrics: Arc<DocMetrics>,
	) -> Self {
		let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
		Self {
			endpoint: endpoint.trim_end_matches('/').into(),
			signer,
			timeout,
			client,
			fallback,
			metrics,
		}
	}

	/// Send one request. `Ok(None)` means the doc service answered 404.
	async fn call(
		&self,
		method: Method,
		path: &str,
		doc_id: &str,
		body: Bytes,
	) -> ClResult<Option<RpcResponse>> {
		let uri = format!("{}{}", self.endpoint, path);
		let request = hyper::Request::builder()
			.method(method)
			.uri(&uri)
			.header(HEADER_ACCESS_TOKEN, self.signer.sign(doc_id)?)
			.header(HEADER_REQUEST_ID, random_id()?)
			.header(CONTENT_TYPE, CONTENT_TYPE_BINARY)
			.body(Full::new(body))
			.map_err(|e| Error::NetworkError(format!("request build error: {}", e)))?;

		let exchange = async {
			let response = self
				.client
				.request(request)
				.await
				.map_err(|e| Error::NetworkError(format!("{}: {}", uri, e)))?;
			let status = response.status();
			let (parts, body) = response.into_parts();
			let body = body
				.collect()
				.await
				.map_err(|e| Error::NetworkError(format!("{}: {}", uri, e)))?
				.to_bytes();
			Ok::<_, Error>((status, parts.headers, body))
		};
		let (status, headers, body) =
			tokio::time::timeout(self.timeout, exchange).await.map_err(|_| Error::Timeout)??;

		if status == StatusCode::NOT_FOUND {
			return Ok(None);
		}
		if !status.is_success() {
			let err_body: ErrorBody = serde_json::from_slice(&body).map_err(|e| {
				Error::NetworkError(format!("malformed error response ({}): {}", status, e))
			})?;
			return Err(Error::from_wire(status.as_u16(), err_body));
		}
		Ok(Some(RpcResponse { headers, body }))
	}

	async fn fetch_doc(&self, space_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>> {
		let path = doc_path(space_id, doc_id);
		let Some(res) = self.call(Method::GET, &path, doc_id, Bytes::new()).await? else {
			return Ok(None);
		};

		let timestamp = header_timestamp(&res.headers)?;
		let editor = res
			.headers
			.get(HEADER_DOC_EDITOR_ID)
			.and_then(|v| v.to_str().ok())
			.filter(|v| !v.is_empty())
			.map(Into::into);
		Ok(Some(DocRecord {
			space_id: space_id.into(),
			doc_id: doc_id.into(),
			bin: res.body.to_vec(),
			timestamp,
			editor,
		}))
	}

	async fn fetch_doc_diff(
		&self,
		space_id: &str,
		doc_id: &str,
		state_vector: Option<&[u8]>,
	) -> ClResult<Option<DocDiff>> {
		let path = doc_diff_path(space_id, doc_id);
		let body = state_vector.map(Bytes::copy_from_slice).unwrap_or_default();
		let Some(res) = self.call(Method::POST, &path, doc_id, body).await? else {
			return Ok(None);
		};

		let timestamp = header_timestamp(&res.headers)?;
		let missing =
			ByteRange::parse(header_str(&res.headers, HEADER_DOC_MISSING_OFFSET)?).map_err(malformed)?;
		let state =
			ByteRange::parse(header_str(&res.headers, HEADER_DOC_STATE_OFFSET)?).map_err(malformed)?;
		let frame = DiffFrame { body: res.body.to_vec(), missing, state };
		frame.decode(timestamp).map(Some).map_err(malformed)
	}

	fn note_fallback(&self, space_id: &str, doc_id: &str, err: &Error) {
		self.metrics.incr(Counter::RpcFallback);
		error!(
			endpoint = %self.endpoint,
			space_id = %space_id,
			doc_id = %doc_id,
			error = %err,
			"Doc service unreachable, falling back to database reader"
		);
	}
}

#[async_trait]
impl DocReader for RpcDocReader {
	async fn get_doc(&self, space_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>> {
		match self.fetch_doc(space_id, doc_id).await {
			Err(err) if err.is_transport() => {
				self.note_fallback(space_id, doc_id, &err);
				self.fallback.get_doc(space_id, doc_id).await
			}
			res => res,
		}
	}

	async fn get_doc_diff(
		&self,
		space_id: &str,
		doc_id: &str,
		state_vector: Option<&[u8]>,
	) -> ClResult<Option<DocDiff>> {
		match self.fetch_doc_diff(space_id, doc_id, state_vector).await {
			Err(err) if err.is_transport() => {
				self.note_fallback(space_id, doc_id, &err);
				self.fallback.get_doc_diff(space_id, doc_id, state_vector).await
			}
			res => res,
		}
	}
}


// vim: ts=4
