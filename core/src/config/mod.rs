//! Application configuration management

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::WatchCategory;
use crate::service::monitor::SessionDescriptor;

const CONFIG_FILE: &str = "navigator.json";
const CONFIG_VERSION: u32 = 1;

/// Platform-specific data directory resolution
pub fn default_data_dir() -> Result<PathBuf> {
	let dir = dirs::data_local_dir()
		.ok_or_else(|| anyhow!("Could not determine data directory"))?
		.join("navigator");

	fs::create_dir_all(&dir)?;
	Ok(dir)
}

/// Per-category overrides on top of the built-in routing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRoute {
	/// Disable monitoring for this category entirely.
	#[serde(default)]
	pub disabled: bool,

	/// Watched subtree, relative to the watch root (or absolute).
	#[serde(default)]
	pub watch_subtree: Option<PathBuf>,

	/// Destination directory, relative to the destination root (or absolute).
	#[serde(default)]
	pub destination: Option<PathBuf>,

	/// Extra accept patterns on top of the category's extension defaults.
	#[serde(default)]
	pub patterns: Vec<String>,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigatorConfig {
	/// Config schema version
	pub version: u32,

	/// Data directory path
	pub data_dir: PathBuf,

	/// Base directory the category subtrees are watched under
	pub watch_root: PathBuf,

	/// Base directory relocated files are sorted into
	pub destination_root: PathBuf,

	/// Logging level
	pub log_level: String,

	/// Per-category route overrides
	#[serde(default)]
	pub routes: HashMap<WatchCategory, CategoryRoute>,
}

impl NavigatorConfig {
	/// Load configuration from the default location
	pub fn load() -> Result<Self> {
		let data_dir = default_data_dir()?;
		Self::load_from(&data_dir)
	}

	/// Load configuration from a specific data directory
	pub fn load_from(data_dir: &PathBuf) -> Result<Self> {
		let config_path = data_dir.join(CONFIG_FILE);

		if config_path.exists() {
			info!("Loading config from {:?}", config_path);
			let json = fs::read_to_string(&config_path)?;
			let config: NavigatorConfig = serde_json::from_str(&json)?;

			if config.version != CONFIG_VERSION {
				warn!(
					"Config schema v{} differs from expected v{}; using it as-is",
					config.version, CONFIG_VERSION
				);
			}

			Ok(config)
		} else {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.clone());
			config.save()?;
			Ok(config)
		}
	}

	/// Create default configuration with specific data directory
	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
		Self {
			version: CONFIG_VERSION,
			data_dir,
			watch_root: home.clone(),
			destination_root: home.join("Navigator"),
			log_level: "info".to_string(),
			routes: HashMap::new(),
		}
	}

	/// Save configuration to disk
	pub fn save(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;

		let config_path = self.data_dir.join(CONFIG_FILE);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("Saved config to {:?}", config_path);
		Ok(())
	}

	pub fn logs_dir(&self) -> PathBuf {
		self.data_dir.join("logs")
	}

	pub fn category_enabled(&self, category: WatchCategory) -> bool {
		self.routes
			.get(&category)
			.map_or(true, |route| !route.disabled)
	}

	/// Directory watched for this category.
	pub fn watch_root_for(&self, category: WatchCategory) -> PathBuf {
		match self.routes.get(&category).and_then(|r| r.watch_subtree.as_ref()) {
			Some(subtree) => self.watch_root.join(subtree),
			None => self.watch_root.join(category.default_subtree()),
		}
	}

	/// Directory files of this category are relocated into.
	pub fn destination_for(&self, category: WatchCategory) -> PathBuf {
		match self.routes.get(&category).and_then(|r| r.destination.as_ref()) {
			Some(destination) => self.destination_root.join(destination),
			None => self.destination_root.join(category.destination_subdir()),
		}
	}

	pub fn extra_patterns(&self, category: WatchCategory) -> &[String] {
		self.routes
			.get(&category)
			.map_or(&[], |route| route.patterns.as_slice())
	}

	/// What an active session presents to the host and the user.
	pub fn session_descriptor(&self) -> SessionDescriptor {
		SessionDescriptor {
			id: "navigator-monitor".into(),
			title: "Navigator".into(),
			body: format!("Watching {} for new files", self.watch_root.display()),
		}
	}

	/// Ensure all required directories exist
	pub fn ensure_directories(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;
		fs::create_dir_all(self.logs_dir())?;
		for category in WatchCategory::ALL {
			if self.category_enabled(category) {
				fs::create_dir_all(self.watch_root_for(category))?;
				fs::create_dir_all(self.destination_for(category))?;
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn defaults_route_every_category() {
		let dir = TempDir::new().unwrap();
		let config = NavigatorConfig::default_with_dir(dir.path().to_path_buf());

		for category in WatchCategory::ALL {
			assert!(config.category_enabled(category));
			assert!(config
				.watch_root_for(category)
				.starts_with(&config.watch_root));
			assert!(config
				.destination_for(category)
				.starts_with(&config.destination_root));
		}
	}

	#[test]
	fn route_overrides_apply() {
		let dir = TempDir::new().unwrap();
		let mut config = NavigatorConfig::default_with_dir(dir.path().to_path_buf());
		config.routes.insert(
			WatchCategory::Image,
			CategoryRoute {
				disabled: true,
				watch_subtree: Some(PathBuf::from("DCIM")),
				..Default::default()
			},
		);

		assert!(!config.category_enabled(WatchCategory::Image));
		assert_eq!(
			config.watch_root_for(WatchCategory::Image),
			config.watch_root.join("DCIM")
		);
		assert!(config.category_enabled(WatchCategory::Video));
	}

	#[test]
	fn save_and_load_round_trip() {
		let dir = TempDir::new().unwrap();
		let mut config = NavigatorConfig::default_with_dir(dir.path().to_path_buf());
		config.watch_root = PathBuf::from("/srv/incoming");
		config
			.routes
			.entry(WatchCategory::Audio)
			.or_default()
			.patterns
			.push("*.mid".into());
		config.save().unwrap();

		let loaded = NavigatorConfig::load_from(&dir.path().to_path_buf()).unwrap();
		assert_eq!(loaded.watch_root, PathBuf::from("/srv/incoming"));
		assert_eq!(loaded.extra_patterns(WatchCategory::Audio), ["*.mid"]);
	}

	#[test]
	fn load_creates_default_when_missing() {
		let dir = TempDir::new().unwrap();
		let config = NavigatorConfig::load_from(&dir.path().to_path_buf()).unwrap();
		assert_eq!(config.version, CONFIG_VERSION);
		assert!(dir.path().join(CONFIG_FILE).exists());
	}
}
