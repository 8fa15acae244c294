//! Foreground execution envelope
//!
//! A session must establish a durable, host-recognized presence before
//! observers are registered, and tear it down unconditionally when the
//! session ends. The production implementation persists a status-indicator
//! file under the data directory for the session's lifetime.

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum EnvelopeError {
	#[error("host denied the foreground session: {0}")]
	Denied(String),
	#[error("failed to persist session presence: {0}")]
	Io(#[from] io::Error),
	#[error("failed to encode session presence: {0}")]
	Encode(#[from] serde_json::Error),
}

/// What the session presents to the host and the user while active.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDescriptor {
	pub id: String,
	pub title: String,
	pub body: String,
}

/// Host facility for the "do not casually kill me" execution mode paired
/// with a persistent status indicator. `begin` failing is unrecoverable for
/// that start attempt; `end` must always succeed at tearing the presence
/// down.
pub trait ForegroundEnvelope: Send + Sync {
	fn begin(&self, descriptor: &SessionDescriptor) -> Result<(), EnvelopeError>;
	fn end(&self);
}

#[derive(Serialize)]
struct SessionPresence<'a> {
	pid: u32,
	started_at: DateTime<Utc>,
	#[serde(flatten)]
	descriptor: &'a SessionDescriptor,
}

/// Production envelope: a status file that exists exactly while a session
/// is active.
pub struct StatusFileEnvelope {
	status_path: PathBuf,
}

impl StatusFileEnvelope {
	pub fn new(data_dir: impl Into<PathBuf>) -> Self {
		Self {
			status_path: data_dir.into().join("monitor-status.json"),
		}
	}

	pub fn status_path(&self) -> &PathBuf {
		&self.status_path
	}
}

impl ForegroundEnvelope for StatusFileEnvelope {
	fn begin(&self, descriptor: &SessionDescriptor) -> Result<(), EnvelopeError> {
		if let Some(parent) = self.status_path.parent() {
			fs::create_dir_all(parent)?;
		}

		let presence = SessionPresence {
			pid: std::process::id(),
			started_at: Utc::now(),
			descriptor,
		};
		fs::write(&self.status_path, serde_json::to_string_pretty(&presence)?)?;

		info!(path = %self.status_path.display(), "Foreground session established");
		Ok(())
	}

	fn end(&self) {
		if let Err(e) = fs::remove_file(&self.status_path) {
			if e.kind() != io::ErrorKind::NotFound {
				warn!(error = ?e, "Failed to remove session status file");
			}
		}
		info!("Foreground session ended");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn descriptor() -> SessionDescriptor {
		SessionDescriptor {
			id: "navigator-monitor".into(),
			title: "Navigator".into(),
			body: "Watching for new files".into(),
		}
	}

	#[test]
	fn begin_creates_and_end_removes_status_file() {
		let dir = TempDir::new().unwrap();
		let envelope = StatusFileEnvelope::new(dir.path());

		envelope.begin(&descriptor()).unwrap();
		assert!(envelope.status_path().exists());

		let raw = fs::read_to_string(envelope.status_path()).unwrap();
		assert!(raw.contains("navigator-monitor"));

		envelope.end();
		assert!(!envelope.status_path().exists());
	}

	#[test]
	fn end_without_begin_is_harmless() {
		let dir = TempDir::new().unwrap();
		let envelope = StatusFileEnvelope::new(dir.path());
		envelope.end();
	}
}
