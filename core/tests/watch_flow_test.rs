//! End-to-end watch flow
//!
//! Exercises the production collaborator set against a real temp directory:
//! the platform watcher detects a created file, the pipeline classifies and
//! relocates it, and stopping the session stops further pickups.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::{sleep, Instant};

use navigator_core::{Navigator, NavigatorConfig, NavigatorContext, WatchCategory};

fn test_config(root: &TempDir) -> NavigatorConfig {
	let mut config = NavigatorConfig::default_with_dir(root.path().join("data"));
	config.watch_root = root.path().join("watch");
	config.destination_root = root.path().join("sorted");
	config
}

async fn wait_for_path(path: &Path, present: bool) -> bool {
	let deadline = Instant::now() + Duration::from_secs(10);
	while Instant::now() < deadline {
		if path.exists() == present {
			return true;
		}
		sleep(Duration::from_millis(50)).await;
	}
	false
}

#[tokio::test]
async fn created_file_is_detected_and_relocated() {
	let root = TempDir::new().unwrap();
	let config = test_config(&root);
	config.ensure_directories().unwrap();

	let context = NavigatorContext::production(&config).unwrap();
	let watch_dir = config.watch_root_for(WatchCategory::Download);
	let dest_dir = config.destination_for(WatchCategory::Download);
	let navigator = Navigator::new(Arc::new(config), context);

	navigator.start().await.unwrap();
	assert!(navigator.is_running());

	let source = watch_dir.join("sample.zip");
	std::fs::write(&source, b"archive bytes").unwrap();

	let destination = dest_dir.join("sample.zip");
	assert!(
		wait_for_path(&destination, true).await,
		"file was not relocated: {}",
		destination.display()
	);
	assert!(
		wait_for_path(&source, false).await,
		"source file should be gone after relocation"
	);
	assert_eq!(std::fs::read(&destination).unwrap(), b"archive bytes");

	navigator.stop().await.unwrap();
	navigator.shutdown().await;
}

#[tokio::test]
async fn non_matching_files_stay_put() {
	let root = TempDir::new().unwrap();
	let config = test_config(&root);
	config.ensure_directories().unwrap();

	let context = NavigatorContext::production(&config).unwrap();
	let watch_dir = config.watch_root_for(WatchCategory::Image);
	let navigator = Navigator::new(Arc::new(config), context);

	navigator.start().await.unwrap();

	// An in-progress download must not be picked up.
	let partial = watch_dir.join("photo.png.part");
	std::fs::write(&partial, b"half a photo").unwrap();

	sleep(Duration::from_millis(500)).await;
	assert!(partial.exists(), "partial file must not be relocated");

	navigator.stop().await.unwrap();
	navigator.shutdown().await;
}

#[tokio::test]
async fn stopping_the_session_stops_pickups() {
	let root = TempDir::new().unwrap();
	let config = test_config(&root);
	config.ensure_directories().unwrap();

	let context = NavigatorContext::production(&config).unwrap();
	let watch_dir = config.watch_root_for(WatchCategory::Audio);
	let dest_dir = config.destination_for(WatchCategory::Audio);
	let navigator = Navigator::new(Arc::new(config), context);

	navigator.start().await.unwrap();
	navigator.stop().await.unwrap();
	assert!(!navigator.is_running());

	let source = watch_dir.join("track.mp3");
	std::fs::write(&source, b"song").unwrap();

	sleep(Duration::from_millis(500)).await;
	assert!(source.exists(), "no relocation may happen after stop");
	assert!(!dest_dir.join("track.mp3").exists());

	navigator.shutdown().await;
}
