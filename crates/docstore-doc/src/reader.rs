//! Doc readers
//!
//! [`DatabaseDocReader`] reads through the local storage adapter. The RPC
//! reader in [`crate::rpc`] asks a doc-service node first and falls back to a
//! database reader.

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use docstore_types::doc_adapter::DocRecord;

use crate::merge::{self, DocDiff};
use crate::prelude::*;
use crate::storage::DocStorageAdapter;

#[async_trait]
pub trait DocReader: Debug + Send + Sync {
	async fn get_doc(&self, space_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>>;

	/// Updates the holder of `state_vector` is missing, and the current state
	/// vector of the doc
	async fn get_doc_diff(
		&self,
		space_id: &str,
		doc_id: &str,
		state_vector: Option<&[u8]>,
	) -> ClResult<Option<DocDiff>>;
}

#[derive(Debug, Clone)]
pub struct DatabaseDocReader {
	storage: Arc<dyn DocStorageAdapter>,
}

impl DatabaseDocReader {
	pub fn new(storage: Arc<dyn DocStorageAdapter>) -> Self {
		Self { storage }
	}
}

#[async_trait]
impl DocReader for DatabaseDocReader {
	async fn get_doc(&self, space_id: &str, doc_id: &str) -> ClResult<Option<DocRecord>> {
		self.storage.get_doc(space_id, doc_id).await
	}

	/// Merges pending updates before diffing, unlike the storage adapter's
	/// own diff
	async fn get_doc_diff(
		&self,
		space_id: &str,
		doc_id: &str,
		state_vector: Option<&[u8]>,
	) -> ClResult<Option<DocDiff>> {
		let Some(doc) = self.storage.get_doc(space_id, doc_id).await? else {
			return Ok(None);
		};
		let (missing, state) = merge::doc_diff(doc.bin, state_vector.map(<[u8]>::to_vec)).await?;
		Ok(Some(DocDiff { missing, state, timestamp: doc.timestamp }))
	}
}

// vim: ts=4
