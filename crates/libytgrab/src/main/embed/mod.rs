//! Module for making sure audio artifacts carry a cover image

use std::path::{
	Path,
	PathBuf,
};

use crate::error::{
	IOErrorToError,
	Stage,
	StageIssue,
};

pub mod tags;
pub mod transcode;

pub use tags::TagEmbedder;
pub use transcode::TranscodeEmbedder;

/// Extensions a thumbnail sidecar may have, in order of preference
pub const CANDIDATE_EXTENSIONS: [&str; 4] = ["webp", "jpg", "jpeg", "png"];

/// The result of [`ThumbnailEmbedder::ensure_embedded`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingOutcome {
	/// The artifact already had a cover, nothing was changed
	AlreadyEmbedded,
	/// A cover has been embedded from a sidecar image
	EmbeddedNow,
	/// No cover could be embedded, the artifact and any sidecar are left untouched
	Failed,
}

/// The outcome of embedding, with the non-fatal issues that happened on the way
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingReport {
	/// What happened to the artifact
	pub outcome: EmbeddingOutcome,
	/// Issues that happened, even if the outcome is not [`EmbeddingOutcome::Failed`]
	pub issues:  Vec<StageIssue>,
}

impl EmbeddingReport {
	/// Create a new report without issues
	pub fn new(outcome: EmbeddingOutcome) -> Self {
		return Self {
			outcome,
			issues: Vec::new(),
		};
	}

	/// Builder function to set the issues
	#[must_use]
	pub fn with_issues(mut self, issues: Vec<StageIssue>) -> Self {
		self.issues = issues;

		return self;
	}
}

/// Capability to make sure a audio file has a embedded cover
///
/// Implementations never return a error, failures are part of the [`EmbeddingReport`]
pub trait ThumbnailEmbedder {
	/// Verify that `artifact` has a cover, and embed one from a sidecar image if it does not
	fn ensure_embedded(&self, artifact: &Path) -> EmbeddingReport;
}

/// Get all possible sidecar image paths for `artifact`, in order of [`CANDIDATE_EXTENSIONS`], regardless of whether they exist
#[must_use]
pub fn sidecar_paths(artifact: &Path) -> Vec<PathBuf> {
	return CANDIDATE_EXTENSIONS
		.iter()
		.map(|ext| return artifact.with_extension(ext))
		.collect();
}

/// Find the first existing sidecar image for `artifact`
#[must_use]
pub fn find_candidate(artifact: &Path) -> Option<PathBuf> {
	return sidecar_paths(artifact).into_iter().find(|v| return v.is_file());
}

/// Remove a sidecar image after its content has been embedded
/// A failure is only recorded, the cover is already in place
fn remove_candidate(candidate: &Path, issues: &mut Vec<StageIssue>) {
	if let Err(err) = std::fs::remove_file(candidate).attach_path_err(candidate) {
		issues.push(StageIssue::new(
			Stage::Cleanup,
			format!("Could not remove embedded thumbnail: {err}"),
		));
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use tempfile::Builder as TempBuilder;

	#[test]
	fn test_sidecar_paths() {
		assert_eq!(
			vec![
				PathBuf::from("/music/My Song.webp"),
				PathBuf::from("/music/My Song.jpg"),
				PathBuf::from("/music/My Song.jpeg"),
				PathBuf::from("/music/My Song.png"),
			],
			sidecar_paths(Path::new("/music/My Song.mp3"))
		);
	}

	mod find_candidate {
		use super::*;

		#[test]
		fn test_preference_order() {
			let testdir = TempBuilder::new()
				.prefix("ytgrab-test-candidate-")
				.tempdir()
				.expect("Expected a temp dir to be created");
			let artifact = testdir.path().join("Song.mp3");

			assert_eq!(None, find_candidate(&artifact));

			std::fs::write(testdir.path().join("Song.png"), b"png").expect("Expected write to succeed");
			assert_eq!(Some(testdir.path().join("Song.png")), find_candidate(&artifact));

			std::fs::write(testdir.path().join("Song.jpg"), b"jpg").expect("Expected write to succeed");
			assert_eq!(Some(testdir.path().join("Song.jpg")), find_candidate(&artifact));

			std::fs::write(testdir.path().join("Song.webp"), b"webp").expect("Expected write to succeed");
			assert_eq!(Some(testdir.path().join("Song.webp")), find_candidate(&artifact));
		}

		#[test]
		fn test_ignores_other_stems() {
			let testdir = TempBuilder::new()
				.prefix("ytgrab-test-candidate-")
				.tempdir()
				.expect("Expected a temp dir to be created");
			std::fs::write(testdir.path().join("Other.jpg"), b"jpg").expect("Expected write to succeed");
			std::fs::create_dir(testdir.path().join("Song.webp")).expect("Expected create_dir to succeed");

			assert_eq!(None, find_candidate(&testdir.path().join("Song.mp3")));
		}
	}
}
