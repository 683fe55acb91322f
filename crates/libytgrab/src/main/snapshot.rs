//! Module for detecting which files a engine invocation produced

use std::{
	collections::BTreeSet,
	path::{
		Path,
		PathBuf,
	},
};

use crate::error::IOErrorToError;

/// The set of files with one extension in one directory at a point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSnapshot {
	/// The matching file paths
	files: BTreeSet<PathBuf>,
}

impl OutputSnapshot {
	/// Get whether the snapshot contains `path`
	#[must_use]
	pub fn contains(&self, path: &Path) -> bool {
		return self.files.contains(path);
	}

	/// Get the amount of files in the snapshot
	#[must_use]
	pub fn len(&self) -> usize {
		return self.files.len();
	}

	/// Get whether the snapshot is empty
	#[must_use]
	pub fn is_empty(&self) -> bool {
		return self.files.is_empty();
	}

	/// Iterate over all files in the snapshot, sorted
	pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
		return self.files.iter();
	}
}

impl FromIterator<PathBuf> for OutputSnapshot {
	fn from_iter<T: IntoIterator<Item = PathBuf>>(iter: T) -> Self {
		return Self {
			files: iter.into_iter().collect(),
		};
	}
}

/// Check if `path` has the extension `ext` (without dot), compared ASCII-case-insensitively
#[must_use]
pub fn has_extension(path: &Path, ext: &str) -> bool {
	return path
		.extension()
		.and_then(|v| return v.to_str())
		.is_some_and(|v| return v.eq_ignore_ascii_case(ext));
}

/// Capture all regular files directly in `dir` which have the extension `ext` (without dot)
///
/// Entries that cannot be read are skipped, only failing to read `dir` itself is a error
pub fn snapshot(dir: &Path, ext: &str) -> Result<OutputSnapshot, crate::Error> {
	let mut files = BTreeSet::new();

	for entry in std::fs::read_dir(dir).attach_path_err(dir)? {
		let entry = match entry {
			Ok(v) => v,
			Err(err) => {
				debug!("Skipping unreadable entry in \"{}\": {}", dir.display(), err);
				continue;
			},
		};

		let path = entry.path();

		// "file_type" does not follow symlinks, "metadata" from "Path" does
		let is_file = match std::fs::metadata(&path) {
			Ok(v) => v.is_file(),
			Err(err) => {
				debug!("Skipping entry \"{}\": {}", path.display(), err);
				continue;
			},
		};

		if is_file && has_extension(&path, ext) {
			files.insert(path);
		}
	}

	trace!("Snapshot of \"{}\" (.{}): {} files", dir.display(), ext, files.len());

	return Ok(OutputSnapshot { files });
}

/// Get all files that are in `after` but not in `before`, sorted
#[must_use]
pub fn diff(before: &OutputSnapshot, after: &OutputSnapshot) -> Vec<PathBuf> {
	return after.files.difference(&before.files).cloned().collect();
}

#[cfg(test)]
mod test {
	use super::*;
	use tempfile::Builder as TempBuilder;

	fn create_dir() -> tempfile::TempDir {
		return TempBuilder::new()
			.prefix("ytgrab-test-snapshot-")
			.tempdir()
			.expect("Expected a temp dir to be created");
	}

	mod snapshot {
		use super::*;

		#[test]
		fn test_filters_extension_and_type() {
			let testdir = create_dir();
			let dir = testdir.path();

			std::fs::write(dir.join("a.mp3"), b"a").expect("Expected write to succeed");
			std::fs::write(dir.join("b.MP3"), b"b").expect("Expected write to succeed");
			std::fs::write(dir.join("a.jpg"), b"c").expect("Expected write to succeed");
			std::fs::write(dir.join("mp3"), b"d").expect("Expected write to succeed");
			std::fs::create_dir(dir.join("folder.mp3")).expect("Expected create_dir to succeed");
			std::fs::create_dir(dir.join("nested")).expect("Expected create_dir to succeed");
			std::fs::write(dir.join("nested").join("c.mp3"), b"e").expect("Expected write to succeed");

			let snap = snapshot(dir, "mp3").expect("Expected snapshot to succeed");

			assert_eq!(
				vec![&dir.join("a.mp3"), &dir.join("b.MP3")],
				snap.iter().collect::<Vec<_>>()
			);
		}

		#[test]
		fn test_missing_dir() {
			let testdir = create_dir();

			assert!(snapshot(&testdir.path().join("does-not-exist"), "mp3").is_err());
		}
	}

	mod diff {
		use super::*;

		fn snap(paths: &[&str]) -> OutputSnapshot {
			return paths.iter().map(PathBuf::from).collect();
		}

		#[test]
		fn test_only_new_files() {
			let before = snap(&["/m/old.mp3"]);
			let after = snap(&["/m/old.mp3", "/m/new.mp3"]);

			assert_eq!(vec![PathBuf::from("/m/new.mp3")], diff(&before, &after));
		}

		#[test]
		fn test_same_is_empty() {
			let same = snap(&["/m/a.mp3", "/m/b.mp3"]);

			assert!(diff(&same, &same).is_empty());
		}

		#[test]
		fn test_order_independent_and_no_removed() {
			let before = snap(&["/m/c.mp3", "/m/gone.mp3"]);
			let after_a: OutputSnapshot = ["/m/b.mp3", "/m/a.mp3", "/m/c.mp3"].iter().map(PathBuf::from).collect();
			let after_b: OutputSnapshot = ["/m/c.mp3", "/m/a.mp3", "/m/b.mp3"].iter().map(PathBuf::from).collect();

			let expected = vec![PathBuf::from("/m/a.mp3"), PathBuf::from("/m/b.mp3")];
			assert_eq!(expected, diff(&before, &after_a));
			assert_eq!(expected, diff(&before, &after_b));
		}

		#[test]
		fn test_on_disk() {
			let testdir = create_dir();
			let dir = testdir.path();
			std::fs::write(dir.join("old.mp3"), b"a").expect("Expected write to succeed");

			let before = snapshot(dir, "mp3").expect("Expected snapshot to succeed");
			std::fs::write(dir.join("new.mp3"), b"b").expect("Expected write to succeed");
			let after = snapshot(dir, "mp3").expect("Expected snapshot to succeed");

			assert_eq!(vec![dir.join("new.mp3")], diff(&before, &after));
		}
	}

	#[test]
	fn test_has_extension() {
		assert!(has_extension(Path::new("/a/b.Mp3"), "mp3"));
		assert!(!has_extension(Path::new("/a/b.mp4"), "mp3"));
		assert!(!has_extension(Path::new("/a/mp3"), "mp3"));
	}
}
