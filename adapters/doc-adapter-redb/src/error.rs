//! Error types for the doc adapter

use std::fmt;

/// Doc adapter-specific errors
#[derive(Debug)]
pub enum Error {
	/// Database operation error
	DbError(String),

	/// I/O error
	IoError(String),

	/// Stored row could not be decoded
	CorruptRow(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::DbError(msg) => write!(f, "Database error: {}", msg),
			Error::IoError(msg) => write!(f, "I/O error: {}", msg),
			Error::CorruptRow(msg) => write!(f, "Corrupt row: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<Error> for docstore::error::Error {
	fn from(err: Error) -> Self {
		tracing::error!("doc adapter: {}", err);
		docstore::error::Error::DbError
	}
}

// vim: ts=4
