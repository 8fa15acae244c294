//! Change-notification facility
//!
//! The seam between the orchestration engine and the OS file-change backend.
//! `ChangeNotifier` is what the engine registers observers against;
//! `FsChangeNotifier` is the production implementation, multiplexing a single
//! `notify` watcher across all registered observers and routing normalized
//! events to them by watch-root prefix.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{trace, warn};

use crate::service::monitor::Observer;

#[derive(Debug, Error)]
pub enum NotifyError {
	#[error("failed to initialize the watch backend: {0}")]
	Backend(#[source] notify::Error),
	#[error("failed to watch {root}: {source}")]
	Registration {
		root: PathBuf,
		#[source]
		source: notify::Error,
	},
	#[error("failed to unwatch {root}: {source}")]
	Deregistration {
		root: PathBuf,
		#[source]
		source: notify::Error,
	},
}

/// Normalized kind of a filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
	Create,
	Modify,
	Remove,
	/// A rename where both endpoints are known; the last path is the
	/// destination.
	Rename,
	Other,
}

/// A filesystem change delivered to an observer, already filtered down to
/// the paths under its watch root.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
	pub kind: ChangeKind,
	pub paths: Vec<PathBuf>,
}

impl ChangeEvent {
	pub fn created(path: impl Into<PathBuf>) -> Self {
		Self {
			kind: ChangeKind::Create,
			paths: vec![path.into()],
		}
	}

	/// Paths that newly appeared under the watch root with this event.
	/// Creations yield every path; renames yield the destination endpoint;
	/// everything else yields nothing.
	pub fn appeared_paths(&self) -> Vec<PathBuf> {
		match self.kind {
			ChangeKind::Create => self.paths.clone(),
			ChangeKind::Rename => self.paths.last().cloned().into_iter().collect(),
			_ => Vec::new(),
		}
	}
}

/// OS change-notification facility the engine registers observers against.
///
/// Registration is keyed by the observer's watch root; implementations must
/// deliver subtree events when `recursive` is set. Both calls are expected
/// to be fast; the engine issues them from its worker context.
pub trait ChangeNotifier: Send + Sync {
	fn register(&self, observer: Arc<Observer>, recursive: bool) -> Result<(), NotifyError>;
	fn unregister(&self, observer: &Observer) -> Result<(), NotifyError>;
}

struct Registered {
	observer: Arc<Observer>,
	recursive: bool,
}

/// Production notifier backed by the platform watcher from `notify`.
pub struct FsChangeNotifier {
	watcher: Mutex<RecommendedWatcher>,
	registry: Arc<Mutex<Vec<Registered>>>,
}

impl FsChangeNotifier {
	pub fn new() -> Result<Self, NotifyError> {
		let registry: Arc<Mutex<Vec<Registered>>> = Arc::new(Mutex::new(Vec::new()));

		let routing = Arc::clone(&registry);
		let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
			match result {
				Ok(event) => route_event(&routing, event),
				Err(e) => warn!(error = ?e, "Watch backend reported an error"),
			}
		})
		.map_err(NotifyError::Backend)?;

		Ok(Self {
			watcher: Mutex::new(watcher),
			registry,
		})
	}
}

impl ChangeNotifier for FsChangeNotifier {
	fn register(&self, observer: Arc<Observer>, recursive: bool) -> Result<(), NotifyError> {
		let root = observer.watch_root().to_path_buf();
		let mode = if recursive {
			RecursiveMode::Recursive
		} else {
			RecursiveMode::NonRecursive
		};

		self.watcher
			.lock()
			.watch(&root, mode)
			.map_err(|source| NotifyError::Registration {
				root: root.clone(),
				source,
			})?;

		self.registry.lock().push(Registered {
			observer,
			recursive,
		});
		trace!(root = %root.display(), "Watch registered");
		Ok(())
	}

	fn unregister(&self, observer: &Observer) -> Result<(), NotifyError> {
		let root = {
			let mut registry = self.registry.lock();
			let Some(position) = registry
				.iter()
				.position(|entry| entry.observer.id() == observer.id())
			else {
				return Ok(());
			};
			let removed = registry.remove(position);
			let root = removed.observer.watch_root().to_path_buf();

			// Another observer may share the root; only drop the OS watch
			// once the last one is gone.
			if registry
				.iter()
				.any(|entry| entry.observer.watch_root() == root)
			{
				trace!(root = %root.display(), "Watch root still in use, keeping OS watch");
				return Ok(());
			}
			root
		};

		self.watcher
			.lock()
			.unwatch(&root)
			.map_err(|source| NotifyError::Deregistration {
				root: root.clone(),
				source,
			})?;
		trace!(root = %root.display(), "Watch removed");
		Ok(())
	}
}

fn route_event(registry: &Mutex<Vec<Registered>>, event: notify::Event) {
	let kind = normalize_kind(&event.kind);
	if kind == ChangeKind::Other {
		return;
	}

	for entry in registry.lock().iter() {
		let paths: Vec<PathBuf> = event
			.paths
			.iter()
			.filter(|path| covers(entry, path))
			.cloned()
			.collect();
		if paths.is_empty() {
			continue;
		}
		entry.observer.notify(ChangeEvent {
			kind,
			paths,
		});
	}
}

fn covers(entry: &Registered, path: &Path) -> bool {
	let root = entry.observer.watch_root();
	if entry.recursive {
		path.starts_with(root)
	} else {
		path.parent() == Some(root)
	}
}

/// Collapse the backend's event taxonomy into the kinds the engine routes.
/// Rename endpoints reported separately surface as create/remove so a file
/// moved into a watched subtree is still treated as newly appeared.
fn normalize_kind(kind: &EventKind) -> ChangeKind {
	match kind {
		EventKind::Create(_) => ChangeKind::Create,
		EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => ChangeKind::Rename,
		EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Create,
		EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Remove,
		EventKind::Modify(_) => ChangeKind::Modify,
		EventKind::Remove(_) => ChangeKind::Remove,
		_ => ChangeKind::Other,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use notify::event::CreateKind;

	#[test]
	fn created_files_are_appeared_paths() {
		let event = ChangeEvent::created("/watch/a.png");
		assert_eq!(event.appeared_paths(), vec![PathBuf::from("/watch/a.png")]);
	}

	#[test]
	fn rename_appears_at_destination_only() {
		let event = ChangeEvent {
			kind: ChangeKind::Rename,
			paths: vec![PathBuf::from("/tmp/a.png"), PathBuf::from("/watch/a.png")],
		};
		assert_eq!(event.appeared_paths(), vec![PathBuf::from("/watch/a.png")]);
	}

	#[test]
	fn removals_never_appear() {
		let event = ChangeEvent {
			kind: ChangeKind::Remove,
			paths: vec![PathBuf::from("/watch/a.png")],
		};
		assert!(event.appeared_paths().is_empty());
	}

	#[test]
	fn kind_normalization() {
		assert_eq!(
			normalize_kind(&EventKind::Create(CreateKind::File)),
			ChangeKind::Create
		);
		assert_eq!(
			normalize_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
			ChangeKind::Create
		);
		assert_eq!(
			normalize_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
			ChangeKind::Remove
		);
	}
}
