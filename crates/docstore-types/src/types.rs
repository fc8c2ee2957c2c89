//! Common types used throughout the docstore engine.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

// Timestamp //
//***********//
/// Millisecond precision Unix timestamp.
///
/// Update fragments, snapshots and history checkpoints are all ordered by this
/// value, so it keeps millisecond resolution instead of seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl Timestamp {
	pub fn now() -> Timestamp {
		let res = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
		Timestamp(res.as_millis() as u64)
	}

	pub fn from_now(offset: Duration) -> Timestamp {
		Timestamp::now().after(offset)
	}

	pub fn after(self, offset: Duration) -> Timestamp {
		Timestamp(self.0.saturating_add(offset.as_millis() as u64))
	}

	pub fn before(self, offset: Duration) -> Timestamp {
		Timestamp(self.0.saturating_sub(offset.as_millis() as u64))
	}
}

impl std::fmt::Display for Timestamp {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for Timestamp {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Timestamp(s.trim().parse()?))
	}
}

impl From<u64> for Timestamp {
	fn from(ms: u64) -> Self {
		Timestamp(ms)
	}
}

impl Serialize for Timestamp {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_u64(self.0)
	}
}

impl<'de> Deserialize<'de> for Timestamp {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		Ok(Timestamp(u64::deserialize(deserializer)?))
	}
}


// vim: ts=4
