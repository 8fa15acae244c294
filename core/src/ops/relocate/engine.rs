//! The byte-level move
//!
//! Rename first; if the destination is on another filesystem the rename
//! fails and we fall back to copy plus remove. Name collisions resolve to
//! `name (1).ext`, `name (2).ext`, and so on, never overwriting.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum MoveError {
	#[error("source file has no name: {0}")]
	MissingFileName(PathBuf),
	#[error("failed to create destination directory {dir}: {source}")]
	CreateDir {
		dir: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("failed to move {from} to {to}: {source}")]
	Transfer {
		from: PathBuf,
		to: PathBuf,
		#[source]
		source: io::Error,
	},
}

/// Move `source` into `dest_dir`, returning the final destination path.
pub async fn relocate(source: &Path, dest_dir: &Path) -> Result<PathBuf, MoveError> {
	let file_name = source
		.file_name()
		.ok_or_else(|| MoveError::MissingFileName(source.to_path_buf()))?;

	fs::create_dir_all(dest_dir)
		.await
		.map_err(|source| MoveError::CreateDir {
			dir: dest_dir.to_path_buf(),
			source,
		})?;

	let destination = unique_destination(dest_dir.join(file_name)).await;

	match fs::rename(source, &destination).await {
		Ok(()) => {
			debug!(
				from = %source.display(),
				to = %destination.display(),
				"File renamed into place"
			);
			Ok(destination)
		}
		Err(rename_err) => {
			debug!(
				error = %rename_err,
				"Rename failed, falling back to copy and remove"
			);
			copy_and_remove(source, &destination).await?;
			Ok(destination)
		}
	}
}

async fn copy_and_remove(source: &Path, destination: &Path) -> Result<(), MoveError> {
	if let Err(copy_err) = fs::copy(source, destination).await {
		// Don't leave a partial file behind at the destination.
		if let Err(e) = fs::remove_file(destination).await {
			if e.kind() != io::ErrorKind::NotFound {
				warn!(error = ?e, "Failed to clean up partial destination file");
			}
		}
		return Err(MoveError::Transfer {
			from: source.to_path_buf(),
			to: destination.to_path_buf(),
			source: copy_err,
		});
	}

	fs::remove_file(source)
		.await
		.map_err(|remove_err| MoveError::Transfer {
			from: source.to_path_buf(),
			to: destination.to_path_buf(),
			source: remove_err,
		})
}

/// First free path for the candidate: the candidate itself, then
/// `stem (n).ext` counting up.
async fn unique_destination(candidate: PathBuf) -> PathBuf {
	if !exists(&candidate).await {
		return candidate;
	}

	let stem = candidate
		.file_stem()
		.map(|s| s.to_string_lossy().into_owned())
		.unwrap_or_default();
	let extension = candidate.extension().map(|e| e.to_string_lossy().into_owned());
	let parent = candidate.parent().map(Path::to_path_buf).unwrap_or_default();

	for n in 1u32.. {
		let name = match &extension {
			Some(ext) => format!("{stem} ({n}).{ext}"),
			None => format!("{stem} ({n})"),
		};
		let numbered = parent.join(name);
		if !exists(&numbered).await {
			return numbered;
		}
	}
	unreachable!("collision counter exhausted")
}

async fn exists(path: &Path) -> bool {
	fs::try_exists(path).await.unwrap_or(false)
}
