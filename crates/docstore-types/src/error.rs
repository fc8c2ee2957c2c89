//! Error type shared by the engine, the collaborator implementations and adapters.
//!
//! Every variant has a stable wire code and HTTP status so that the doc-service
//! node can serialize an error into an RPC response and the calling node can
//! rebuild the very same variant from it (see [`Error::from_wire`]).

use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::types::Timestamp;

pub type ClResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	// doc storage
	/// The per-doc lock could not be acquired
	ConcurrentWriteLimitExceeded,
	/// Appending update fragments failed after all retries
	FailedToSaveUpdates,
	FailedToUpsertSnapshot,
	DocNotFound {
		space_id: Box<str>,
		doc_id: Box<str>,
	},
	DocHistoryNotFound {
		space_id: Box<str>,
		doc_id: Box<str>,
		timestamp: Timestamp,
	},

	// generic
	NotFound,
	PermissionDenied,
	Unauthorized,
	ValidationError(String),
	Parse,
	DbError,
	Crdt(String),
	ConfigError(String),
	Internal(String),

	// transport
	NetworkError(String),
	Timeout,

	/// Application error returned by a remote node that has no local variant
	Remote {
		status: u16,
		code: Box<str>,
		message: Box<str>,
	},

	// externals
	Io(std::io::Error),
}

/// JSON body of an error response: `{"error": {"code", "message", "details"}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
	pub error: ErrorInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
	pub code: Box<str>,
	pub message: Box<str>,
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub details: Value,
}

impl Error {
	pub fn doc_not_found(space_id: &str, doc_id: &str) -> Self {
		Error::DocNotFound { space_id: space_id.into(), doc_id: doc_id.into() }
	}

	pub fn doc_history_not_found(space_id: &str, doc_id: &str, timestamp: Timestamp) -> Self {
		Error::DocHistoryNotFound { space_id: space_id.into(), doc_id: doc_id.into(), timestamp }
	}

	/// Stable error code used on the wire
	pub fn code(&self) -> &str {
		match self {
			Error::ConcurrentWriteLimitExceeded => "E-DOC-CONCURRENT",
			Error::FailedToSaveUpdates => "E-DOC-SAVEUPD",
			Error::FailedToUpsertSnapshot => "E-DOC-UPSERT",
			Error::DocNotFound { .. } => "E-DOC-NOTFOUND",
			Error::DocHistoryNotFound { .. } => "E-DOC-NOHIST",
			Error::NotFound => "E-CORE-NOTFOUND",
			Error::PermissionDenied => "E-AUTH-NOPERM",
			Error::Unauthorized => "E-AUTH-UNAUTH",
			Error::ValidationError(_) => "E-VAL-INVALID",
			Error::Parse => "E-CORE-PARSE",
			Error::DbError => "E-CORE-DBERR",
			Error::Crdt(_) => "E-DOC-CRDT",
			Error::ConfigError(_) => "E-CORE-CONFIG",
			Error::Internal(_) => "E-CORE-INTERNAL",
			Error::NetworkError(_) => "E-NET-ERROR",
			Error::Timeout => "E-NET-TIMEOUT",
			Error::Remote { code, .. } => code.as_ref(),
			Error::Io(_) => "E-CORE-IO",
		}
	}

	pub fn status(&self) -> StatusCode {
		match self {
			Error::ConcurrentWriteLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
			Error::DocNotFound { .. } | Error::DocHistoryNotFound { .. } | Error::NotFound => {
				StatusCode::NOT_FOUND
			}
			Error::PermissionDenied => StatusCode::FORBIDDEN,
			Error::Unauthorized => StatusCode::UNAUTHORIZED,
			Error::ValidationError(_) | Error::Parse => StatusCode::BAD_REQUEST,
			Error::NetworkError(_) => StatusCode::BAD_GATEWAY,
			Error::Timeout => StatusCode::GATEWAY_TIMEOUT,
			Error::Remote { status, .. } => {
				StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
			}
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn details(&self) -> Value {
		match self {
			Error::DocNotFound { space_id, doc_id } => json!({
				"spaceId": space_id,
				"docId": doc_id,
			}),
			Error::DocHistoryNotFound { space_id, doc_id, timestamp } => json!({
				"spaceId": space_id,
				"docId": doc_id,
				"timestamp": timestamp,
			}),
			_ => Value::Null,
		}
	}

	/// True for failures that never reached an application on the other side
	pub fn is_transport(&self) -> bool {
		matches!(self, Error::NetworkError(_) | Error::Timeout)
	}

	pub fn to_body(&self) -> ErrorBody {
		ErrorBody {
			error: ErrorInfo {
				code: self.code().into(),
				message: self.to_string().into(),
				details: self.details(),
			},
		}
	}

	/// Rebuild an error from a well-formed error response of a remote node.
	///
	/// Transport codes are never rebuilt as transport variants: a remote that
	/// answered is an application failure, whatever it reports.
	pub fn from_wire(status: u16, body: ErrorBody) -> Self {
		let ErrorInfo { code, message, details } = body.error;
		let detail_str = |key: &str| -> Box<str> {
			details.get(key).and_then(Value::as_str).unwrap_or_default().into()
		};
		let message_string = || -> String {
			message.split_once(": ").map_or(message.as_ref(), |(_, m)| m).to_string()
		};

		let known = match code.as_ref() {
			"E-DOC-CONCURRENT" => Some(Error::ConcurrentWriteLimitExceeded),
			"E-DOC-SAVEUPD" => Some(Error::FailedToSaveUpdates),
			"E-DOC-UPSERT" => Some(Error::FailedToUpsertSnapshot),
			"E-DOC-NOTFOUND" => Some(Error::DocNotFound {
				space_id: detail_str("spaceId"),
				doc_id: detail_str("docId"),
			}),
			"E-DOC-NOHIST" => Some(Error::DocHistoryNotFound {
				space_id: detail_str("spaceId"),
				doc_id: detail_str("docId"),
				timestamp: Timestamp(
					details.get("timestamp").and_then(Value::as_u64).unwrap_or_default(),
				),
			}),
			"E-CORE-NOTFOUND" => Some(Error::NotFound),
			"E-AUTH-NOPERM" => Some(Error::PermissionDenied),
			"E-AUTH-UNAUTH" => Some(Error::Unauthorized),
			"E-VAL-INVALID" => Some(Error::ValidationError(message_string())),
			"E-CORE-PARSE" => Some(Error::Parse),
			"E-CORE-DBERR" => Some(Error::DbError),
			"E-DOC-CRDT" => Some(Error::Crdt(message_string())),
			"E-CORE-CONFIG" => Some(Error::ConfigError(message_string())),
			"E-CORE-INTERNAL" => Some(Error::Internal(message_string())),
			_ => None,
		};

		match known {
			Some(err) => err,
			None => Error::Remote { status, code, message },
		}
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::ConcurrentWriteLimitExceeded => write!(f, "too many concurrent writings"),
			Error::FailedToSaveUpdates => write!(f, "failed to store doc updates"),
			Error::FailedToUpsertSnapshot => write!(f, "failed to store doc snapshot"),
			Error::DocNotFound { space_id, doc_id } => {
				write!(f, "doc {} under space {} not found", doc_id, space_id)
			}
			Error::DocHistoryNotFound { space_id, doc_id, timestamp } => write!(
				f,
				"history of doc {} at {} under space {} not found",
				doc_id, timestamp, space_id
			),
			Error::NotFound => write!(f, "not found"),
			Error::PermissionDenied => write!(f, "permission denied"),
			Error::Unauthorized => write!(f, "unauthorized"),
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::Parse => write!(f, "parse error"),
			Error::DbError => write!(f, "database error"),
			Error::Crdt(msg) => write!(f, "crdt error: {}", msg),
			Error::ConfigError(msg) => write!(f, "config error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
			Error::NetworkError(msg) => write!(f, "network error: {}", msg),
			Error::Timeout => write!(f, "timeout"),
			Error::Remote { message, .. } => write!(f, "{}", message),
			Error::Io(err) => write!(f, "io error: {}", err),
		}
	}
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		tracing::warn!("json error: {}", err);
		Self::Parse
	}
}

impl From<tokio::task::JoinError> for Error {
	fn from(err: tokio::task::JoinError) -> Self {
		Self::Internal(format!("task join error: {}", err))
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = self.status();
		if status.is_server_error() {
			tracing::error!(code = %self.code(), "request failed: {}", self);
		}
		(status, Json(self.to_body())).into_response()
	}
}


// vim: ts=4
