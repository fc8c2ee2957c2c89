//! In-process implementations of the docstore collaborator interfaces, together
//! with configuration, metrics, request signing and job scheduling.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod crypto;
pub mod event_bus;
pub mod local_cache;
pub mod local_mutex;
pub mod metrics;
pub mod options;
pub mod prelude;
pub mod schedule;

pub use config::DocConfig;
pub use metrics::{Counter, DocMetrics};

// vim: ts=4
