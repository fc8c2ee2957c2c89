//! Docstore server
//!
//! Wires the doc engine to redb storage and the in-process collaborators, runs
//! the background jobs and serves the HTTP surface of the node.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod app;
pub mod routes;

pub use crate::app::{App, AppBuilder, ServerMode};

// vim: ts=4
