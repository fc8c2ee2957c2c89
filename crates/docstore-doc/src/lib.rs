//! Document update storage and merge engine.
//!
//! Writers append CRDT updates to a per-doc log. Reads and a background
//! compaction job fold the log into a snapshot under a per-doc lock, keeping
//! periodic history checkpoints for rollback.
//!
//! - [`workspace::WorkspaceDocStorage`] serves multi-writer workspace docs
//! - [`userspace::UserspaceDocStorage`] serves per-user docs, merged on write
//! - [`reader`] and [`rpc`] give read access on nodes that do not own the docs

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod job;
pub mod lock;
pub mod merge;
pub mod prelude;
pub mod reader;
pub mod rpc;
pub mod storage;
pub mod userspace;
pub mod workspace;

pub use merge::DocDiff;
pub use reader::{DatabaseDocReader, DocReader};
pub use rpc::RpcDocReader;
pub use storage::{DocStorageAdapter, DocStorageDeps};
pub use userspace::UserspaceDocStorage;
pub use workspace::{WorkspaceDocStorage, WorkspaceOpts};

// vim: ts=4
