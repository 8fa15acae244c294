use serde::{Deserialize, Serialize};

/// A class of monitored content. The set is fixed at build time; each
/// category maps to one watched subtree and one destination subtree.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::AsRefStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WatchCategory {
	Image,
	Video,
	Audio,
	Document,
	Download,
}

impl WatchCategory {
	pub const ALL: [WatchCategory; 5] = [
		WatchCategory::Image,
		WatchCategory::Video,
		WatchCategory::Audio,
		WatchCategory::Document,
		WatchCategory::Download,
	];

	/// Subtree watched for this category, relative to the configured watch root.
	pub fn default_subtree(self) -> &'static str {
		match self {
			WatchCategory::Image => "Pictures",
			WatchCategory::Video => "Movies",
			WatchCategory::Audio => "Music",
			WatchCategory::Document => "Documents",
			WatchCategory::Download => "Downloads",
		}
	}

	/// Subdirectory files of this category land in, relative to the
	/// configured destination root.
	pub fn destination_subdir(self) -> &'static str {
		self.default_subtree()
	}

	/// Built-in file extensions recognized for this category. Configuration
	/// can widen the set with extra patterns per category.
	pub fn extensions(self) -> &'static [&'static str] {
		match self {
			WatchCategory::Image => &[
				"jpg", "jpeg", "png", "gif", "webp", "heic", "bmp", "tiff", "svg",
			],
			WatchCategory::Video => &["mp4", "mkv", "mov", "avi", "webm", "m4v", "mpg", "mpeg"],
			WatchCategory::Audio => &["mp3", "wav", "flac", "m4a", "ogg", "aac", "opus", "wma"],
			WatchCategory::Document => &[
				"pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "txt", "md", "epub",
			],
			WatchCategory::Download => &[
				"zip", "tar", "gz", "bz2", "xz", "7z", "rar", "iso", "dmg", "apk", "msi",
			],
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn category_names_are_lowercase() {
		assert_eq!(WatchCategory::Image.as_ref(), "image");
		assert_eq!(WatchCategory::Download.to_string(), "download");
	}

	#[test]
	fn every_category_has_extensions_and_subtree() {
		for category in WatchCategory::ALL {
			assert!(!category.extensions().is_empty());
			assert!(!category.default_subtree().is_empty());
		}
	}
}
