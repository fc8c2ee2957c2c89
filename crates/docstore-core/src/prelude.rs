pub use docstore_types::prelude::*;

// vim: ts=4
