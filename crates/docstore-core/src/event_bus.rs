//! In-process event bus
//!
//! A single tokio broadcast channel. With one process `broadcast` reaches the
//! same listeners as `emit`.

use tokio::sync::broadcast;

use docstore_types::event::{DocEvent, EventBus};

use crate::prelude::*;

const DEFAULT_CAPACITY: usize = 128;

#[derive(Debug)]
pub struct LocalEventBus {
	tx: broadcast::Sender<DocEvent>,
}

impl LocalEventBus {
	pub fn new() -> Self {
		Self::with_capacity(DEFAULT_CAPACITY)
	}

	pub fn with_capacity(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity);
		Self { tx }
	}

	fn send(&self, event: DocEvent) {
		trace!(event = event.name(), "event");
		// No listeners is not an error
		let _ = self.tx.send(event);
	}
}

impl Default for LocalEventBus {
	fn default() -> Self {
		Self::new()
	}
}

impl EventBus for LocalEventBus {
	fn emit(&self, event: DocEvent) {
		self.send(event);
	}

	fn broadcast(&self, event: DocEvent) {
		self.send(event);
	}

	fn subscribe(&self) -> broadcast::Receiver<DocEvent> {
		self.tx.subscribe()
	}
}


// vim: ts=4
