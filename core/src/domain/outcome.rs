use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::WatchCategory;

/// Result of an attempted relocation of a detected file. Produced by an
/// observer, consumed exactly once by the move-result listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MoveOutcome {
	Success {
		category: WatchCategory,
		source: PathBuf,
		destination: PathBuf,
		occurred_at: DateTime<Utc>,
	},
	Failure {
		category: WatchCategory,
		source: PathBuf,
		reason: String,
		occurred_at: DateTime<Utc>,
	},
}

impl MoveOutcome {
	pub fn success(category: WatchCategory, source: PathBuf, destination: PathBuf) -> Self {
		Self::Success {
			category,
			source,
			destination,
			occurred_at: Utc::now(),
		}
	}

	pub fn failure(category: WatchCategory, source: PathBuf, reason: impl Into<String>) -> Self {
		Self::Failure {
			category,
			source,
			reason: reason.into(),
			occurred_at: Utc::now(),
		}
	}

	pub fn category(&self) -> WatchCategory {
		match self {
			Self::Success { category, .. } | Self::Failure { category, .. } => *category,
		}
	}

	pub fn source(&self) -> &Path {
		match self {
			Self::Success { source, .. } | Self::Failure { source, .. } => source,
		}
	}

	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn outcome_accessors() {
		let ok = MoveOutcome::success(
			WatchCategory::Image,
			PathBuf::from("/in/a.png"),
			PathBuf::from("/out/a.png"),
		);
		assert!(ok.is_success());
		assert_eq!(ok.category(), WatchCategory::Image);
		assert_eq!(ok.source(), Path::new("/in/a.png"));

		let failed = MoveOutcome::failure(
			WatchCategory::Audio,
			PathBuf::from("/in/b.mp3"),
			"no space",
		);
		assert!(!failed.is_success());
		assert_eq!(failed.source(), Path::new("/in/b.mp3"));
	}
}
