//! Externally observable running/not-running state
//!
//! The single source of truth for whether a monitoring session is active.
//! Written only by the command loop; safe for concurrent reads from any
//! thread. Subscribers always observe the latest value immediately and every
//! subsequent change.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct RunningState {
	cell: Arc<watch::Sender<bool>>,
}

impl RunningState {
	pub(crate) fn new() -> Self {
		let (tx, _rx) = watch::channel(false);
		Self { cell: Arc::new(tx) }
	}

	/// Current value, readable from any thread without locking the writer out.
	pub fn is_running(&self) -> bool {
		*self.cell.borrow()
	}

	/// Subscribe to state changes. The receiver starts out holding the
	/// current value; `changed()` resolves on every later transition.
	pub fn subscribe(&self) -> watch::Receiver<bool> {
		self.cell.subscribe()
	}

	pub(crate) fn set(&self, running: bool) {
		// Only notify on actual transitions, duplicate commands are no-ops
		self.cell.send_if_modified(|current| {
			if *current != running {
				*current = running;
				true
			} else {
				false
			}
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn replays_latest_value_on_subscribe() {
		let state = RunningState::new();
		state.set(true);

		let rx = state.subscribe();
		assert!(*rx.borrow());
		assert!(state.is_running());
	}

	#[tokio::test]
	async fn notifies_on_transition() {
		let state = RunningState::new();
		let mut rx = state.subscribe();

		state.set(true);
		rx.changed().await.unwrap();
		assert!(*rx.borrow());

		state.set(false);
		rx.changed().await.unwrap();
		assert!(!*rx.borrow());
	}

	#[tokio::test]
	async fn redundant_set_does_not_notify() {
		let state = RunningState::new();
		state.set(true);

		let mut rx = state.subscribe();
		state.set(true);
		assert!(!rx.has_changed().unwrap());
	}
}
