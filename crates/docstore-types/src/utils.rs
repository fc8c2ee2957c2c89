//! Utility functions

use rand::RngExt;

use crate::prelude::*;

pub const ID_LENGTH: usize = 24;
pub const SAFE: [char; 62] = [
	'0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
	'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'A', 'B',
	'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U',
	'V', 'W', 'X', 'Y', 'Z',
];

pub fn random_id() -> ClResult<String> {
	let mut rng = rand::rng();
	let mut result = String::with_capacity(ID_LENGTH);

	for _ in 0..ID_LENGTH {
		result.push(SAFE[rng.random_range(0..SAFE.len())]);
	}
	Ok(result)
}

/// Separates the parts of composite keys. Storage adapters reject ids containing it.
pub const KEY_SEP: char = '\u{1f}';

/// Key of a doc in the pending update counter map and the lock namespace
pub fn doc_key(space_id: &str, doc_id: &str) -> String {
	format!("{}{}{}", space_id, KEY_SEP, doc_id)
}

/// Inverse of [`doc_key`]
pub fn parse_doc_key(key: &str) -> Option<(&str, &str)> {
	key.split_once(KEY_SEP).filter(|(space_id, doc_id)| !space_id.is_empty() && !doc_id.is_empty())
}


// vim: ts=4
