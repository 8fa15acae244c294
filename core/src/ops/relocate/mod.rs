//! Classification and relocation of detected files
//!
//! `MovePipeline` is the seam observers drive: given a category and a path
//! that newly appeared under its watch root, decide whether it should move
//! and perform the move. `RelocatePipeline` is the production
//! implementation: match rules plus the move engine.

pub mod engine;
pub mod rules;

pub use rules::{MatchRules, RulesError};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{trace, warn};

use crate::config::NavigatorConfig;
use crate::domain::{MoveOutcome, WatchCategory};

/// Classification plus move for one detected path. Returning `None` means
/// the path was not a match (or vanished) and produces no outcome.
#[async_trait]
pub trait MovePipeline: Send + Sync {
	async fn process(&self, category: WatchCategory, path: &Path) -> Option<MoveOutcome>;
}

pub struct RelocatePipeline {
	rules: MatchRules,
	destinations: HashMap<WatchCategory, PathBuf>,
}

impl RelocatePipeline {
	pub fn from_config(config: &NavigatorConfig) -> Result<Self, RulesError> {
		let destinations = WatchCategory::ALL
			.into_iter()
			.map(|category| (category, config.destination_for(category)))
			.collect();

		Ok(Self {
			rules: MatchRules::from_config(config)?,
			destinations,
		})
	}
}

#[async_trait]
impl MovePipeline for RelocatePipeline {
	async fn process(&self, category: WatchCategory, path: &Path) -> Option<MoveOutcome> {
		if !self.rules.matches(category, path) {
			trace!(category = %category, path = %path.display(), "No match; ignoring");
			return None;
		}

		// The event may be stale by the time it reaches the worker.
		if !matches!(tokio::fs::try_exists(path).await, Ok(true)) {
			trace!(path = %path.display(), "Source vanished before relocation");
			return None;
		}

		let dest_dir = self.destinations.get(&category)?;
		match engine::relocate(path, dest_dir).await {
			Ok(destination) => Some(MoveOutcome::success(
				category,
				path.to_path_buf(),
				destination,
			)),
			Err(e) => {
				warn!(
					category = %category,
					path = %path.display(),
					error = %e,
					"Relocation failed"
				);
				Some(MoveOutcome::failure(
					category,
					path.to_path_buf(),
					e.to_string(),
				))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn config(dir: &TempDir) -> NavigatorConfig {
		let mut config = NavigatorConfig::default_with_dir(dir.path().join("data"));
		config.watch_root = dir.path().join("watch");
		config.destination_root = dir.path().join("sorted");
		config
	}

	#[tokio::test]
	async fn matching_file_is_moved_and_reported() {
		let dir = TempDir::new().unwrap();
		let config = config(&dir);
		let pipeline = RelocatePipeline::from_config(&config).unwrap();

		let source = config.watch_root_for(WatchCategory::Image).join("a.png");
		tokio::fs::create_dir_all(source.parent().unwrap())
			.await
			.unwrap();
		tokio::fs::write(&source, b"pixels").await.unwrap();

		let outcome = pipeline
			.process(WatchCategory::Image, &source)
			.await
			.unwrap();

		assert!(outcome.is_success());
		let expected = config.destination_for(WatchCategory::Image).join("a.png");
		assert!(expected.exists());
		assert!(!source.exists());
	}

	#[tokio::test]
	async fn non_matching_file_produces_no_outcome() {
		let dir = TempDir::new().unwrap();
		let pipeline = RelocatePipeline::from_config(&config(&dir)).unwrap();

		let outcome = pipeline
			.process(WatchCategory::Image, Path::new("/watch/notes.txt"))
			.await;
		assert!(outcome.is_none());
	}

	#[tokio::test]
	async fn vanished_file_produces_no_outcome() {
		let dir = TempDir::new().unwrap();
		let config = config(&dir);
		let pipeline = RelocatePipeline::from_config(&config).unwrap();

		let ghost = config.watch_root_for(WatchCategory::Image).join("gone.png");
		let outcome = pipeline.process(WatchCategory::Image, &ghost).await;
		assert!(outcome.is_none());
	}
}
