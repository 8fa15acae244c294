//! Move-outcome drain loop
//!
//! A single consumer on the worker thread reads outcomes in arrival order
//! and forwards each to the listener. The loop lives for the session: it
//! retires once every sender side of the outcome channel is dropped, after
//! delivering whatever is still queued.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::MoveOutcome;

/// Receives every move outcome exactly once, in enqueue order. May be slow;
/// a stalled listener delays later outcomes but never blocks the producers.
#[async_trait]
pub trait MoveResultListener: Send + Sync {
	async fn on_outcome(&self, outcome: MoveOutcome) -> anyhow::Result<()>;
}

/// Default listener: structured logging of every outcome.
pub struct TracingListener;

#[async_trait]
impl MoveResultListener for TracingListener {
	async fn on_outcome(&self, outcome: MoveOutcome) -> anyhow::Result<()> {
		match &outcome {
			MoveOutcome::Success {
				category,
				source,
				destination,
				..
			} => info!(
				category = %category,
				source = %source.display(),
				destination = %destination.display(),
				"File relocated"
			),
			MoveOutcome::Failure {
				category,
				source,
				reason,
				..
			} => warn!(
				category = %category,
				source = %source.display(),
				reason = %reason,
				"File relocation failed"
			),
		}
		Ok(())
	}
}

pub(super) async fn drain_outcomes(
	outcomes: async_channel::Receiver<MoveOutcome>,
	listener: Arc<dyn MoveResultListener>,
) {
	debug!("Outcome drain started");
	while let Ok(outcome) = outcomes.recv().await {
		// A listener fault is isolated to its outcome; one bad delivery must
		// not stop future monitoring.
		if let Err(e) = listener.on_outcome(outcome).await {
			warn!(error = ?e, "Move result listener failed; continuing with the next outcome");
		}
	}
	debug!("Outcome channel closed; drain retired");
}
