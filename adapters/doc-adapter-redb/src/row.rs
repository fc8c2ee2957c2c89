//! Binary row layout
//!
//! `[timestamp: u64 BE][editor length: u32 BE, u32::MAX if none][editor][bin]`

use docstore::prelude::*;

use crate::error::Error;

const NO_EDITOR: u32 = u32::MAX;
const HEADER_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row<'a> {
	pub timestamp: Timestamp,
	pub editor: Option<&'a str>,
	pub bin: &'a [u8],
}

impl<'a> Row<'a> {
	pub fn encode(&self) -> Vec<u8> {
		let editor = self.editor.unwrap_or_default();
		let mut out = Vec::with_capacity(HEADER_LEN + editor.len() + self.bin.len());
		out.extend_from_slice(&self.timestamp.0.to_be_bytes());
		let editor_len = if self.editor.is_some() { editor.len() as u32 } else { NO_EDITOR };
		out.extend_from_slice(&editor_len.to_be_bytes());
		out.extend_from_slice(editor.as_bytes());
		out.extend_from_slice(self.bin);
		out
	}

	pub fn decode(raw: &'a [u8]) -> Result<Self, Error> {
		let short = || Error::CorruptRow(format!("row of {} bytes is truncated", raw.len()));
		let (ts, rest) = raw.split_first_chunk::<8>().ok_or_else(short)?;
		let (len, rest) = rest.split_first_chunk::<4>().ok_or_else(short)?;
		let len = u32::from_be_bytes(*len);

		let (editor, bin) = if len == NO_EDITOR {
			(None, rest)
		} else {
			let (editor, bin) = rest.split_at_checked(len as usize).ok_or_else(short)?;
			let editor = std::str::from_utf8(editor)
				.map_err(|e| Error::CorruptRow(format!("editor is not utf-8: {}", e)))?;
			(Some(editor), bin)
		};

		Ok(Row { timestamp: Timestamp(u64::from_be_bytes(*ts)), editor, bin })
	}
}


// vim: ts=4
