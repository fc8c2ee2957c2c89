//! Table key layout
//!
//! Key parts are joined by [`SEP`] and numbers are zero-padded, so that the
//! lexicographic key order of redb is also the (space, doc, timestamp, seq)
//! order, and every row of a space or doc sits under one prefix.

use docstore::prelude::*;

pub const SEP: char = docstore::utils::KEY_SEP;
/// First character after [`SEP`], the exclusive end of a prefix range
const SEP_END: char = '\u{20}';

pub fn check_id(kind: &str, id: &str) -> ClResult<()> {
	if id.is_empty() || id.contains(SEP) {
		return Err(Error::ValidationError(format!("invalid {} '{}'", kind, id.escape_debug())));
	}
	Ok(())
}

/// `{space}SEP`
pub fn space_prefix(space_id: &str) -> String {
	format!("{}{}", space_id, SEP)
}

/// `{space}SEP{doc}`
pub fn doc_key(space_id: &str, doc_id: &str) -> String {
	format!("{}{}{}", space_id, SEP, doc_id)
}

/// `{space}SEP{doc}SEP`
pub fn doc_prefix(space_id: &str, doc_id: &str) -> String {
	format!("{}{}{}{}", space_id, SEP, doc_id, SEP)
}

pub fn update_key(space_id: &str, doc_id: &str, timestamp: Timestamp, seq: u64) -> String {
	format!("{}{:020}{}{:020}", doc_prefix(space_id, doc_id), timestamp.0, SEP, seq)
}

pub fn history_key(space_id: &str, doc_id: &str, timestamp: Timestamp) -> String {
	format!("{}{:020}", doc_prefix(space_id, doc_id), timestamp.0)
}

/// Expiry index entry of a history checkpoint: `{expired_at}SEP{history key}`
pub fn expiry_key(expired_at: Timestamp, history_key: &str) -> String {
	format!("{:020}{}{}", expired_at.0, SEP, history_key)
}

/// Exclusive upper bound of the keys starting with `prefix` (which ends with [`SEP`])
pub fn prefix_end(prefix: &str) -> String {
	let mut end = prefix.strip_suffix(SEP).unwrap_or(prefix).to_string();
	end.push(SEP_END);
	end
}

/// Doc id of a key under `space_prefix`
pub fn doc_of<'a>(key: &'a str, space_prefix: &str) -> Option<&'a str> {
	let rest = key.strip_prefix(space_prefix)?;
	Some(rest.split(SEP).next().unwrap_or(rest))
}

/// `(timestamp, seq)` of an update key
pub fn parse_update_key(key: &str) -> Option<(Timestamp, u64)> {
	let mut parts = key.rsplit(SEP);
	let seq = parts.next()?.parse().ok()?;
	let timestamp = parts.next()?.parse().ok()?;
	Some((Timestamp(timestamp), seq))
}

/// Timestamp of a history key
pub fn parse_history_key(key: &str) -> Option<Timestamp> {
	key.rsplit(SEP).next()?.parse().ok().map(Timestamp)
}

/// `(expired_at, history key)` of an expiry index key
pub fn parse_expiry_key(key: &str) -> Option<(Timestamp, &str)> {
	let (expired_at, history_key) = key.split_once(SEP)?;
	Some((Timestamp(expired_at.parse().ok()?), history_key))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_keys_sort_by_timestamp_then_seq() {
		let a = update_key("s", "d", Timestamp(9), 5);
		let b = update_key("s", "d", Timestamp(10), 1);
		let c = update_key("s", "d", Timestamp(10), 2);
		assert!(a < b && b < c);
		assert_eq!(parse_update_key(&c), Some((Timestamp(10), 2)));
	}

	#[test]
	fn test_prefix_does_not_match_longer_doc_id() {
		let prefix = doc_prefix("s", "d");
		let end = prefix_end(&prefix);
		let own = history_key("s", "d", Timestamp(1));
		let other = history_key("s", "d2", Timestamp(1));
		assert!(own.as_str() >= prefix.as_str() && own < end);
		assert!(!(other.as_str() >= prefix.as_str() && other < end));
	}

	#[test]
	fn test_doc_of() {
		let prefix = space_prefix("s");
		assert_eq!(doc_of(&doc_key("s", "d1"), &prefix), Some("d1"));
		assert_eq!(doc_of(&update_key("s", "d2", Timestamp(1), 0), &prefix), Some("d2"));
		assert_eq!(doc_of(&doc_key("t", "d1"), &prefix), None);
	}

	#[test]
	fn test_expiry_key() {
		let history = history_key("s", "d", Timestamp(3));
		let key = expiry_key(Timestamp(100), &history);
		assert_eq!(parse_expiry_key(&key), Some((Timestamp(100), history.as_str())));
		assert_eq!(parse_history_key(&history), Some(Timestamp(3)));
	}

	#[test]
	fn test_check_id() {
		assert!(check_id("doc id", "abc:def").is_ok());
		assert!(check_id("doc id", "").is_err());
		assert!(check_id("doc id", "a\u{1f}b").is_err());
	}
}

// vim: ts=4
