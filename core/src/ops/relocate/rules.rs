//! Match rules deciding which detected files get relocated
//!
//! Per-category accept sets are built from the category's extension defaults
//! plus any extra patterns from configuration. A global reject set filters
//! out in-progress artifacts before any accept rule is consulted.

use std::collections::HashMap;
use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use thiserror::Error;

use crate::config::NavigatorConfig;
use crate::domain::WatchCategory;

/// Partially written or hidden files that must never be picked up.
const REJECT_PATTERNS: &[&str] = &[
	"*.part",
	"*.crdownload",
	"*.download",
	"*.tmp",
	"*.partial",
	".*",
];

#[derive(Debug, Error)]
pub enum RulesError {
	#[error("invalid match pattern {pattern:?}: {source}")]
	Pattern {
		pattern: String,
		#[source]
		source: globset::Error,
	},
}

#[derive(Debug)]
pub struct MatchRules {
	accept: HashMap<WatchCategory, GlobSet>,
	reject: GlobSet,
}

impl MatchRules {
	pub fn from_config(config: &NavigatorConfig) -> Result<Self, RulesError> {
		let mut accept = HashMap::new();
		for category in WatchCategory::ALL {
			let mut builder = GlobSetBuilder::new();
			for extension in category.extensions() {
				add_pattern(&mut builder, &format!("*.{extension}"))?;
			}
			for pattern in config.extra_patterns(category) {
				add_pattern(&mut builder, pattern)?;
			}
			accept.insert(
				category,
				builder.build().map_err(|source| RulesError::Pattern {
					pattern: format!("<{category} accept set>"),
					source,
				})?,
			);
		}

		let mut reject = GlobSetBuilder::new();
		for pattern in REJECT_PATTERNS {
			add_pattern(&mut reject, pattern)?;
		}
		let reject = reject.build().map_err(|source| RulesError::Pattern {
			pattern: "<reject set>".into(),
			source,
		})?;

		Ok(Self { accept, reject })
	}

	/// Whether a path belongs to the category and is safe to pick up. Only
	/// the file name is consulted; the observer already scoped the path to
	/// its watch root.
	pub fn matches(&self, category: WatchCategory, path: &Path) -> bool {
		let Some(name) = path.file_name() else {
			return false;
		};
		if self.reject.is_match(name) {
			return false;
		}
		self.accept
			.get(&category)
			.map_or(false, |set| set.is_match(name))
	}
}

fn add_pattern(builder: &mut GlobSetBuilder, pattern: &str) -> Result<(), RulesError> {
	let glob = GlobBuilder::new(pattern)
		.case_insensitive(true)
		.build()
		.map_err(|source| RulesError::Pattern {
			pattern: pattern.to_string(),
			source,
		})?;
	builder.add(glob);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;
	use tempfile::TempDir;

	fn rules() -> MatchRules {
		let dir = TempDir::new().unwrap();
		let config = NavigatorConfig::default_with_dir(dir.path().to_path_buf());
		MatchRules::from_config(&config).unwrap()
	}

	#[test]
	fn accepts_known_extensions_case_insensitively() {
		let rules = rules();
		assert!(rules.matches(WatchCategory::Image, Path::new("/w/photo.png")));
		assert!(rules.matches(WatchCategory::Image, Path::new("/w/PHOTO.JPG")));
		assert!(rules.matches(WatchCategory::Audio, Path::new("/w/track.flac")));
	}

	#[test]
	fn rejects_foreign_extensions() {
		let rules = rules();
		assert!(!rules.matches(WatchCategory::Image, Path::new("/w/track.mp3")));
		assert!(!rules.matches(WatchCategory::Document, Path::new("/w/movie.mkv")));
	}

	#[test]
	fn rejects_in_progress_and_hidden_files() {
		let rules = rules();
		assert!(!rules.matches(WatchCategory::Image, Path::new("/w/photo.png.part")));
		assert!(!rules.matches(WatchCategory::Download, Path::new("/w/archive.zip.crdownload")));
		assert!(!rules.matches(WatchCategory::Image, Path::new("/w/.hidden.png")));
	}

	#[test]
	fn config_patterns_widen_a_category() {
		let dir = TempDir::new().unwrap();
		let mut config = NavigatorConfig::default_with_dir(dir.path().to_path_buf());
		config
			.routes
			.entry(WatchCategory::Document)
			.or_default()
			.patterns
			.push("*.tex".into());

		let rules = MatchRules::from_config(&config).unwrap();
		assert!(rules.matches(WatchCategory::Document, &PathBuf::from("/w/paper.tex")));
		assert!(!rules.matches(WatchCategory::Image, &PathBuf::from("/w/paper.tex")));
	}
}
