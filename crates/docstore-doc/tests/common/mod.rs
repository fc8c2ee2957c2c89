//! Common test utilities and helpers
//!
//! Shared setup for the doc engine integration tests: a storage environment on
//! a temporary redb database, and Yjs fixtures.

#![allow(dead_code)]

pub mod env;
pub mod fixtures;

pub use env::*;
pub use fixtures::*;

// vim: ts=4
