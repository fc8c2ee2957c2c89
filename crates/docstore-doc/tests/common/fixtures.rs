//! Yjs fixtures

use yrs::updates::decoder::Decode;
use yrs::updates::encoder::Encode;
use yrs::{Doc, GetString, ReadTxn, StateVector, Text, Transact, Update};

pub const TEXT: &str = "content";

/// A client editing one shared text
pub struct Writer {
	doc: Doc,
}

impl Writer {
	pub fn new() -> Self {
		Self { doc: Doc::new() }
	}

	/// Append `chunk` and return the update
	pub fn append(&self, chunk: &str) -> Vec<u8> {
		let text = self.doc.get_or_insert_text(TEXT);
		let mut txn = self.doc.transact_mut();
		let len = text.len(&txn);
		text.insert(&mut txn, len, chunk);
		txn.encode_update_v1()
	}

	pub fn state_vector(&self) -> Vec<u8> {
		self.doc.transact().state_vector().encode_v1()
	}

	pub fn apply(&self, bin: &[u8]) {
		let update = Update::decode_v1(bin).expect("Failed to decode update");
		let mut txn = self.doc.transact_mut();
		txn.apply_update(update).expect("Failed to apply update");
	}

	pub fn text(&self) -> String {
		let text = self.doc.get_or_insert_text(TEXT);
		text.get_string(&self.doc.transact())
	}
}

pub fn read_text(bin: &[u8]) -> String {
	let writer = Writer::new();
	writer.apply(bin);
	writer.text()
}

/// Full state of a doc holding `content`
pub fn doc_with_text(content: &str) -> Vec<u8> {
	let writer = Writer::new();
	writer.append(content);
	writer.doc.transact().encode_state_as_update_v1(&StateVector::default())
}

// vim: ts=4
