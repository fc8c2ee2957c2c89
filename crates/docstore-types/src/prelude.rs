pub use crate::error::{ClResult, Error};
pub use crate::types::Timestamp;

pub use tracing::{debug, error, info, trace, warn};

// vim: ts=4
