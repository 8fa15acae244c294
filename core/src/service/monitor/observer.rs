//! Per-category change observers
//!
//! One observer per watch category while a session is active. Observers are
//! created in bulk by the factory, registered against the change-notification
//! facility right after, and dropped on stop, re-registration, or shutdown.
//! They are never shared across sessions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};
use uuid::Uuid;

use super::worker::WorkerHandle;
use crate::config::NavigatorConfig;
use crate::domain::{MoveOutcome, WatchCategory};
use crate::infra::notify::ChangeEvent;
use crate::ops::relocate::MovePipeline;

/// A stateful watch handle for one category.
pub struct Observer {
	id: Uuid,
	category: WatchCategory,
	watch_root: PathBuf,
	worker: WorkerHandle,
	pipeline: Arc<dyn MovePipeline>,
	outcomes: async_channel::Sender<MoveOutcome>,
}

impl Observer {
	fn new(
		category: WatchCategory,
		watch_root: PathBuf,
		worker: WorkerHandle,
		pipeline: Arc<dyn MovePipeline>,
		outcomes: async_channel::Sender<MoveOutcome>,
	) -> Self {
		Self {
			id: Uuid::new_v4(),
			category,
			watch_root,
			worker,
			pipeline,
			outcomes,
		}
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	pub fn category(&self) -> WatchCategory {
		self.category
	}

	pub fn watch_root(&self) -> &Path {
		&self.watch_root
	}

	/// Entry point for the change-notification facility. Ships the
	/// classification and move work onto the worker thread; the facility's
	/// delivery thread never does more than queue it.
	pub fn notify(&self, event: ChangeEvent) {
		let candidates = event.appeared_paths();
		if candidates.is_empty() {
			return;
		}

		trace!(
			category = %self.category,
			candidates = candidates.len(),
			"Change event queued"
		);

		let category = self.category;
		let pipeline = Arc::clone(&self.pipeline);
		let outcomes = self.outcomes.clone();
		self.worker.dispatch(async move {
			for path in candidates {
				let Some(outcome) = pipeline.process(category, &path).await else {
					continue;
				};
				// Unbounded channel: the send resolves immediately and can
				// only fail once the session is gone.
				if outcomes.send(outcome).await.is_err() {
					debug!(category = %category, "Outcome channel closed; session already stopped");
				}
			}
		});
	}
}

impl std::fmt::Debug for Observer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Observer")
			.field("id", &self.id)
			.field("category", &self.category)
			.field("watch_root", &self.watch_root)
			.finish()
	}
}

/// Yields one fresh observer per enabled category, each bound to the
/// category's watch root. Pure construction; callable repeatedly.
pub struct ObserverFactory {
	config: Arc<NavigatorConfig>,
	pipeline: Arc<dyn MovePipeline>,
}

impl ObserverFactory {
	pub fn new(config: Arc<NavigatorConfig>, pipeline: Arc<dyn MovePipeline>) -> Self {
		Self { config, pipeline }
	}

	pub fn create(
		&self,
		worker: &WorkerHandle,
		outcomes: &async_channel::Sender<MoveOutcome>,
	) -> Vec<Arc<Observer>> {
		WatchCategory::ALL
			.into_iter()
			.filter(|category| self.config.category_enabled(*category))
			.map(|category| {
				Arc::new(Observer::new(
					category,
					self.config.watch_root_for(category),
					worker.clone(),
					Arc::clone(&self.pipeline),
					outcomes.clone(),
				))
			})
			.collect()
	}
}
