//! Shared types, adapter traits, and core utilities for the docstore engine.
//!
//! This crate contains the records and collaborator interfaces that are shared
//! between the storage engine, the in-process collaborator implementations and
//! every persistence adapter. Keeping them in a separate crate allows adapter
//! crates to compile in parallel with the engine.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod doc_adapter;
pub mod error;
pub mod event;
pub mod mutex;
pub mod options;
pub mod prelude;
pub mod types;
pub mod utils;

// vim: ts=4
