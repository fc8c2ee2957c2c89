//! Merge engine
//!
//! Folds a snapshot and its pending update fragments into a new snapshot, and
//! computes diffs against a peer's state vector. Payloads are Yjs v1 updates;
//! all CRDT work runs on the blocking pool.

use yrs::updates::decoder::Decode;
use yrs::updates::encoder::Encode;
use yrs::{ReadTxn, StateVector, Transact, Update};

use docstore_types::doc_adapter::{DocRecord, UpdateFragment};

use crate::prelude::*;

/// Result of [`squash`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
	pub bin: Vec<u8>,
	pub timestamp: Timestamp,
	/// Editor of the newest fragment
	pub editor: Option<Box<str>>,
}

/// Missing updates and state vector of a doc relative to a peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocDiff {
	pub missing: Vec<u8>,
	pub state: Vec<u8>,
	pub timestamp: Timestamp,
}

/// An update carrying no content: zero bytes, or no structs and an empty delete set
pub fn is_empty_bin(bin: &[u8]) -> bool {
	bin.is_empty() || bin == [0, 0]
}

/// Fold `updates` into `snapshot`.
///
/// Fragments are applied in ascending timestamp order, ties in arrival order.
/// The new timestamp is the greatest of the snapshot's and the fragments'.
/// A fragment that cannot be decoded is skipped; an undecodable snapshot fails.
pub async fn squash(snapshot: Option<&DocRecord>, updates: &[UpdateFragment]) -> ClResult<Merged> {
	let mut ordered: Vec<&UpdateFragment> = updates.iter().collect();
	ordered.sort_by_key(|u| (u.timestamp, u.seq));

	let Some(newest) = ordered.last() else {
		return Err(Error::ValidationError("nothing to squash".into()));
	};
	let timestamp = snapshot.map_or(newest.timestamp, |s| s.timestamp.max(newest.timestamp));
	let editor = newest.editor.clone();

	let base = snapshot.map(|s| s.bin.clone());
	let bins: Vec<Vec<u8>> = ordered.iter().map(|u| u.bin.clone()).collect();

	let bin = tokio::task::spawn_blocking(move || -> ClResult<Vec<u8>> {
		let doc = yrs::Doc::new();
		{
			let mut txn = doc.transact_mut();
			if let Some(base) = base {
				let decoded = Update::decode_v1(&base)
					.map_err(|e| Error::Crdt(format!("cannot decode snapshot: {}", e)))?;
				txn.apply_update(decoded)
					.map_err(|e| Error::Crdt(format!("cannot apply snapshot: {}", e)))?;
			}
			for (i, bin) in bins.iter().enumerate() {
				match Update::decode_v1(bin) {
					Ok(decoded) => {
						if let Err(e) = txn.apply_update(decoded) {
							warn!(index = i, error = %e, "Failed to apply doc update, skipping");
						}
					}
					Err(e) => warn!(index = i, error = %e, "Failed to decode doc update, skipping"),
				}
			}
		}
		let txn = doc.transact();
		Ok(txn.encode_state_as_update_v1(&StateVector::default()))
	})
	.await??;

	Ok(Merged { bin, timestamp, editor })
}

/// Diff of a full doc binary against `state_vector`.
///
/// Without a state vector (or with a zero length one) `missing` is the
/// whole binary.
pub async fn doc_diff(bin: Vec<u8>, state_vector: Option<Vec<u8>>) -> ClResult<(Vec<u8>, Vec<u8>)> {
	let state_vector = state_vector.filter(|sv| !sv.is_empty());
	tokio::task::spawn_blocking(move || -> ClResult<(Vec<u8>, Vec<u8>)> {
		let doc = yrs::Doc::new();
		{
			let mut txn = doc.transact_mut();
			let decoded = Update::decode_v1(&bin)
				.map_err(|e| Error::Crdt(format!("cannot decode doc: {}", e)))?;
			txn.apply_update(decoded).map_err(|e| Error::Crdt(format!("cannot apply doc: {}", e)))?;
		}
		let txn = doc.transact();
		let state = txn.state_vector().encode_v1();
		let missing = match state_vector {
			Some(sv) => {
				let sv = StateVector::decode_v1(&sv)
					.map_err(|e| Error::ValidationError(format!("invalid state vector: {}", e)))?;
				txn.encode_state_as_update_v1(&sv)
			}
			None => bin,
		};
		Ok((missing, state))
	})
	.await?
}


// vim: ts=4
