//! Wire format of the doc RPC
//!
//! A diff response carries `missing` and `state` concatenated in one body.
//! The `x-doc-missing-offset` and `x-doc-state-offset` headers hold the
//! `start,end` byte range of each part.

use crate::merge::DocDiff;
use crate::prelude::*;

pub const HEADER_ACCESS_TOKEN: &str = "x-access-token";
pub const HEADER_REQUEST_ID: &str = "x-request-id";
pub const HEADER_DOC_TIMESTAMP: &str = "x-doc-timestamp";
pub const HEADER_DOC_EDITOR_ID: &str = "x-doc-editor-id";
pub const HEADER_DOC_MISSING_OFFSET: &str = "x-doc-missing-offset";
pub const HEADER_DOC_STATE_OFFSET: &str = "x-doc-state-offset";

pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Half-open byte range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
	pub start: usize,
	pub end: usize,
}

impl ByteRange {
	pub fn header_value(self) -> String {
		format!("{},{}", self.start, self.end)
	}

	pub fn parse(value: &str) -> ClResult<Self> {
		let invalid = || Error::ValidationError(format!("invalid byte range '{}'", value));
		let (start, end) = value.split_once(',').ok_or_else(invalid)?;
		let start: usize = start.trim().parse().map_err(|_| invalid())?;
		let end: usize = end.trim().parse().map_err(|_| invalid())?;
		if start > end {
			return Err(invalid());
		}
		Ok(Self { start, end })
	}

	fn slice(self, body: &[u8]) -> ClResult<&[u8]> {
		body.get(self.start..self.end).ok_or_else(|| {
			Error::ValidationError(format!(
				"byte range {}..{} outside of {} byte body",
				self.start,
				self.end,
				body.len()
			))
		})
	}
}

/// A diff response body with the ranges of its two parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffFrame {
	pub body: Vec<u8>,
	pub missing: ByteRange,
	pub state: ByteRange,
}

impl DiffFrame {
	pub fn encode(diff: &DocDiff) -> Self {
		let missing = ByteRange { start: 0, end: diff.missing.len() };
		let state = ByteRange { start: missing.end, end: missing.end + diff.state.len() };
		let mut body = Vec::with_capacity(state.end);
		body.extend_from_slice(&diff.missing);
		body.extend_from_slice(&diff.state);
		Self { body, missing, state }
	}

	pub fn decode(&self, timestamp: Timestamp) -> ClResult<DocDiff> {
		Ok(DocDiff {
			missing: self.missing.slice(&self.body)?.to_vec(),
			state: self.state.slice(&self.body)?.to_vec(),
			timestamp,
		})
	}
}


// vim: ts=4
