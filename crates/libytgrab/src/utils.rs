//! Module for utility functions, that may be used in various other modules

use std::{
	ffi::OsString,
	path::{
		Path,
		PathBuf,
	},
};

use path_absolutize::Absolutize;

use crate::error::IOErrorToError;

/// Simple helper to resolve "~" to the Home directory
/// System agnostic as long as [`dirs::home_dir`] support's it
pub fn expand_tidle<I: AsRef<Path>>(input: I) -> Option<PathBuf> {
	let path = input.as_ref();

	if !path.starts_with("~") {
		return Some(path.to_owned());
	}
	if path == Path::new("~") {
		return dirs::home_dir();
	}
	// dont support "~user" syntax
	if !path.starts_with("~/") {
		unreachable!("This should never occur, because \"path.starts_with\" should have already returned");
	}

	return dirs::home_dir().map(|mut v| {
		// handle case where "home_dir" might be set to the root POSIX directory
		return if v == Path::new("/") {
			// "unwrap" can be used, because it is already checked that the variable starts with value
			path.strip_prefix("~").unwrap().to_owned() // return the input path, just without "~"
		} else {
			// "unwrap" can be used, because it is already checked that the variable starts with value
			v.push(path.strip_prefix("~/").unwrap());
			v
		};
	});
}

/// Convert input path to a absolute path, without hitting the filesystem.
/// This function handles `~`(home)
///
/// If the start is not absolute, CWD will be used.
///
/// This functions behavior:
/// - `/path/to/inner/../somewhere` -> `/path/to/somewhere`
/// - `relative/to/somewhere` -> `CWD/relative/to/somewhere`
/// - `./somewhere/./path` -> `CWD/somewhere/path`
/// - `~/somewhere/in/home` -> `HOME/somewhere/in/home`
pub fn to_absolute<P: AsRef<Path>>(input: P) -> std::io::Result<PathBuf> {
	let Some(converted) = expand_tidle(input) else {
		return Err(std::io::Error::new(
			std::io::ErrorKind::InvalidInput,
			"Could not resolve \"~\"",
		));
	};

	return converted.absolutize().map(|v| return v.to_path_buf());
}

/// Get a temporary path next to `path`, which is `stem_pid.ext`
/// The pid is added so that multiple instances can run at the same time
/// Returns [`None`] if `path` has no file name
#[must_use]
pub fn tmp_sibling_path(path: &Path) -> Option<PathBuf> {
	return numbered_tmp_sibling_path(path, 0);
}

/// Get the temporary path for attempt `attempt`, which is `stem_pid_attempt.ext` for all attempts except `0`
fn numbered_tmp_sibling_path(path: &Path, attempt: usize) -> Option<PathBuf> {
	let mut name = path.file_stem()?.to_os_string();

	name.push("_"); // add "_" to seperate the original name with the temporary one
	name.push(std::process::id().to_string());

	if attempt > 0 {
		name.push(format!("_{attempt}"));
	}

	// push original extension, because there is currently no function to just modify the file stem
	if let Some(ext) = path.extension() {
		name.push(".");
		name.push(ext);
	}

	return Some(path.with_file_name(name));
}

/// Maximal amount of names [`free_tmp_sibling_path`] tries
const MAX_TMP_ATTEMPTS: usize = 100;

/// Get a temporary path next to `path` (like [`tmp_sibling_path`]) that does not exist yet
/// Existing files are never re-used, a number is appended instead
pub fn free_tmp_sibling_path(path: &Path) -> Result<PathBuf, crate::Error> {
	for attempt in 0..MAX_TMP_ATTEMPTS {
		let tmp = numbered_tmp_sibling_path(path, attempt)
			.ok_or_else(|| return crate::Error::not_a_file("Path has no file name", path))?;

		// "symlink_metadata" so that dangling symlinks also count as existing
		match std::fs::symlink_metadata(&tmp) {
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(tmp),
			Err(err) => return Err(err).attach_path_err(&tmp),
			Ok(_) => debug!("Temporary path \"{}\" already exists, trying the next", tmp.display()),
		}
	}

	return Err(crate::Error::custom_ioerror_path(
		std::io::ErrorKind::AlreadyExists,
		"Could not find a unused temporary path",
		path,
	));
}

/// Get the file name of `path` for display, or the whole path if it has none
#[must_use]
pub fn display_name(path: &Path) -> String {
	return path
		.file_name()
		.map_or_else(|| return OsString::from(path), |v| return v.to_os_string())
		.to_string_lossy()
		.to_string();
}
