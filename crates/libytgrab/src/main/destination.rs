//! Module for resolving the directories downloaded media is put into

use std::path::{
	Path,
	PathBuf,
};

use crate::{
	data::request::MediaKind,
	error::IOErrorToError,
	utils::to_absolute,
};

/// Directory name for videos when a custom base is used
pub const VIDEO_DIR_NAME: &str = "videos";
/// Directory name for audio when a custom base is used
pub const AUDIO_DIR_NAME: &str = "music";

/// The resolved (and existing) output directories
#[derive(Debug, Clone, PartialEq)]
pub struct Destinations {
	/// Directory for [`MediaKind::Video`]
	pub video: PathBuf,
	/// Directory for [`MediaKind::Audio`]
	pub audio: PathBuf,
}

impl Destinations {
	/// Get the directory a [`MediaKind`] is put into
	#[must_use]
	pub fn for_kind(&self, kind: MediaKind) -> &Path {
		return match kind {
			MediaKind::Video => &self.video,
			MediaKind::Audio => &self.audio,
		};
	}
}

/// Resolve the video and audio directories and create them if they do not exist yet
///
/// With a `base`, the directories are `base/videos` and `base/music` ("~" is expanded and the path is made absolute).
/// Without a `base`, the platform's media directories are used, falling back to "Videos" and "Music" in the home directory.
pub fn resolve_destinations(base: Option<&Path>) -> Result<Destinations, crate::Error> {
	let destinations = match base {
		Some(base) => {
			let base = to_absolute(base).attach_path_err(base)?;

			Destinations {
				video: base.join(VIDEO_DIR_NAME),
				audio: base.join(AUDIO_DIR_NAME),
			}
		},
		None => platform_destinations()?,
	};

	for dir in [&destinations.video, &destinations.audio] {
		std::fs::create_dir_all(dir).attach_path_err(dir)?;

		if !dir.is_dir() {
			return Err(crate::Error::not_a_directory("Destination is not a directory", dir));
		}
	}

	debug!(
		"Resolved destinations: video \"{}\", audio \"{}\"",
		destinations.video.display(),
		destinations.audio.display()
	);

	return Ok(destinations);
}

/// Get the platform media directories, or the home fallbacks
fn platform_destinations() -> Result<Destinations, crate::Error> {
	let home = dirs::home_dir().ok_or_else(|| {
		return crate::Error::custom_ioerror_location(
			std::io::ErrorKind::NotFound,
			"Could not determine the home directory",
			"resolve_destinations",
		);
	})?;

	let video = dirs::video_dir()
		.filter(|v| return v.is_dir())
		.unwrap_or_else(|| return home.join("Videos"));
	let audio = dirs::audio_dir()
		.filter(|v| return v.is_dir())
		.unwrap_or_else(|| return home.join("Music"));

	return Ok(Destinations { video, audio });
}

#[cfg(test)]
mod test {
	use super::*;
	use tempfile::Builder as TempBuilder;

	mod resolve_destinations {
		use super::*;

		#[test]
		fn test_creates_with_base() {
			let testdir = TempBuilder::new()
				.prefix("ytgrab-test-destination-")
				.tempdir()
				.expect("Expected a temp dir to be created");

			let destinations = resolve_destinations(Some(testdir.path())).expect("Expected resolve to succeed");

			assert_eq!(testdir.path().join("videos"), destinations.video);
			assert_eq!(testdir.path().join("music"), destinations.audio);
			assert!(destinations.video.is_dir());
			assert!(destinations.audio.is_dir());
		}

		#[test]
		fn test_idempotent() {
			let testdir = TempBuilder::new()
				.prefix("ytgrab-test-destination-")
				.tempdir()
				.expect("Expected a temp dir to be created");

			let first = resolve_destinations(Some(testdir.path())).expect("Expected resolve to succeed");
			std::fs::write(first.audio.join("existing.mp3"), b"data").expect("Expected write to succeed");
			let second = resolve_destinations(Some(testdir.path())).expect("Expected resolve to succeed");

			assert_eq!(first, second);
			assert!(second.audio.join("existing.mp3").exists());
		}

		#[test]
		fn test_base_is_file() {
			let testdir = TempBuilder::new()
				.prefix("ytgrab-test-destination-")
				.tempdir()
				.expect("Expected a temp dir to be created");
			let file = testdir.path().join("a-file");
			std::fs::write(&file, b"data").expect("Expected write to succeed");

			assert!(resolve_destinations(Some(&file)).is_err());
		}
	}

	#[test]
	fn test_for_kind() {
		let destinations = Destinations {
			video: PathBuf::from("/base/videos"),
			audio: PathBuf::from("/base/music"),
		};

		assert_eq!(Path::new("/base/videos"), destinations.for_kind(MediaKind::Video));
		assert_eq!(Path::new("/base/music"), destinations.for_kind(MediaKind::Audio));
	}
}
