//! Module for the "ffprobe" / "ffmpeg" based [`ThumbnailEmbedder`]

use std::{
	ffi::OsStr,
	path::Path,
	time::Duration,
};

use super::{
	EmbeddingOutcome,
	EmbeddingReport,
	ThumbnailEmbedder,
	find_candidate,
	remove_candidate,
};
use crate::{
	error::{
		IOErrorToError,
		Stage,
		StageIssue,
	},
	spawn::{
		ffmpeg::{
			FFMPEG_BIN_NAME,
			FFPROBE_BIN_NAME,
			attached_pic_probe_args,
			cover_mux_args,
			parse_has_attached_pic,
			unsuccessfull_command_exit,
		},
		process::ProcessRunner,
	},
	utils::{
		display_name,
		free_tmp_sibling_path,
	},
};

/// Default time "ffprobe" may take to inspect a file
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);
/// Default time "ffmpeg" may take to mux a cover into a file
pub const DEFAULT_MUX_TIMEOUT: Duration = Duration::from_secs(60);
/// Amount of STDERR lines to include in a error
const ERROR_LINES: usize = 5;

/// [`ThumbnailEmbedder`] that verifies with "ffprobe" and embeds by muxing with "ffmpeg"
#[derive(Debug)]
pub struct TranscodeEmbedder<R: ProcessRunner> {
	/// The runner to spawn the commands with
	runner:         R,
	/// Timeout for the verification
	verify_timeout: Duration,
	/// Timeout for the mux
	mux_timeout:    Duration,
}

impl<R: ProcessRunner> TranscodeEmbedder<R> {
	/// Create a new instance with the default timeouts
	pub fn new(runner: R) -> Self {
		return Self {
			runner,
			verify_timeout: DEFAULT_VERIFY_TIMEOUT,
			mux_timeout: DEFAULT_MUX_TIMEOUT,
		};
	}

	/// Builder function to set custom timeouts
	#[must_use]
	pub fn with_timeouts(mut self, verify: Duration, mux: Duration) -> Self {
		self.verify_timeout = verify;
		self.mux_timeout = mux;

		return self;
	}

	/// Get a reference to the runner
	pub fn runner(&self) -> &R {
		return &self.runner;
	}

	/// Check whether `artifact` has a stream with the "attached_pic" disposition
	pub fn is_embedded(&self, artifact: &Path) -> Result<bool, crate::Error> {
		let output = self.runner.run(
			OsStr::new(FFPROBE_BIN_NAME),
			&attached_pic_probe_args(artifact),
			self.verify_timeout,
		)?;

		if !output.success() {
			return Err(unsuccessfull_command_exit(
				FFPROBE_BIN_NAME,
				output.code,
				&output.last_stderr_lines(ERROR_LINES),
			));
		}

		return parse_has_attached_pic(&String::from_utf8(output.stdout)?);
	}

	/// Mux `image` into `artifact` as the cover
	/// The result is written to a temporary file first, which then replaces `artifact`
	/// On error, `artifact` and `image` are left untouched and the temporary file is removed
	pub fn embed_from(&self, artifact: &Path, image: &Path) -> Result<(), crate::Error> {
		let tmp = free_tmp_sibling_path(artifact)?;

		info!(
			"Embedding \"{}\" into \"{}\" with {}",
			image.display(),
			artifact.display(),
			FFMPEG_BIN_NAME
		);

		let res = self.mux(artifact, image, &tmp);

		if res.is_err() {
			remove_tmp(&tmp);
		}

		return res;
	}

	/// Run the mux and move the result into place
	fn mux(&self, artifact: &Path, image: &Path, tmp: &Path) -> Result<(), crate::Error> {
		let output = self.runner.run(
			OsStr::new(FFMPEG_BIN_NAME),
			&cover_mux_args(artifact, image, tmp),
			self.mux_timeout,
		)?;

		if !output.success() {
			return Err(unsuccessfull_command_exit(
				FFMPEG_BIN_NAME,
				output.code,
				&output.last_stderr_lines(ERROR_LINES),
			));
		}

		if !tmp.is_file() {
			return Err(crate::Error::not_a_file(
				format!("{FFMPEG_BIN_NAME} exited successfully, but did not produce a output"),
				tmp,
			));
		}

		std::fs::rename(tmp, artifact).attach_path_err(tmp)?;

		return Ok(());
	}
}

/// Remove a leftover temporary file, if it exists
fn remove_tmp(tmp: &Path) {
	if !tmp.exists() {
		return;
	}

	if let Err(err) = std::fs::remove_file(tmp) {
		warn!("Could not remove temporary file \"{}\": {}", tmp.display(), err);
	}
}

impl<R: ProcessRunner> ThumbnailEmbedder for TranscodeEmbedder<R> {
	fn ensure_embedded(&self, artifact: &Path) -> EmbeddingReport {
		let name = display_name(artifact);
		let mut issues = Vec::new();

		match self.is_embedded(artifact) {
			Ok(true) => {
				debug!("\"{}\" already has a embedded cover", name);
				return EmbeddingReport::new(EmbeddingOutcome::AlreadyEmbedded);
			},
			Ok(false) => debug!("\"{}\" has no embedded cover", name),
			// a failed verification is treated as "not embedded"
			Err(err) => issues.push(StageIssue::new(
				Stage::Verify,
				format!("Could not verify the cover of \"{name}\": {err}"),
			)),
		}

		let Some(candidate) = find_candidate(artifact) else {
			issues.push(StageIssue::new(
				Stage::EmbedFallback,
				format!("No thumbnail image found for \"{name}\""),
			));
			return EmbeddingReport::new(EmbeddingOutcome::Failed).with_issues(issues);
		};

		if let Err(err) = self.embed_from(artifact, &candidate) {
			issues.push(StageIssue::new(
				Stage::EmbedFallback,
				format!("Could not embed the cover of \"{name}\": {err}"),
			));
			return EmbeddingReport::new(EmbeddingOutcome::Failed).with_issues(issues);
		}

		remove_candidate(&candidate, &mut issues);

		return EmbeddingReport::new(EmbeddingOutcome::EmbeddedNow).with_issues(issues);
	}
}

#[cfg(test)]
mod test {
	use std::{
		ffi::OsString,
		path::PathBuf,
	};

	use super::*;
	use crate::{
		spawn::process::{
			ProcessOutput,
			test_utils::{
				FnRunner,
				probe_output,
			},
		},
		utils::tmp_sibling_path,
	};
	use tempfile::{
		Builder as TempBuilder,
		TempDir,
	};

	/// Create a test directory with "Song.mp3" and return the directory and the path to the mp3
	fn setup() -> (TempDir, PathBuf) {
		let testdir = TempBuilder::new()
			.prefix("ytgrab-test-transcode-")
			.tempdir()
			.expect("Expected a temp dir to be created");
		let artifact = testdir.path().join("Song.mp3");
		std::fs::write(&artifact, b"original audio").expect("Expected write to succeed");

		return (testdir, artifact);
	}

	/// Get the output path of a mux call, which is the last argument
	fn output_arg(args: &[OsString]) -> PathBuf {
		return PathBuf::from(args.last().expect("Expected mux to have arguments"));
	}

	#[test]
	fn test_already_embedded() {
		let (testdir, artifact) = setup();
		let sidecar = testdir.path().join("Song.jpg");
		std::fs::write(&sidecar, b"jpg").expect("Expected write to succeed");

		let embedder = TranscodeEmbedder::new(FnRunner::new(|_, _, _| return Ok(probe_output(true))));

		let report = embedder.ensure_embedded(&artifact);

		assert_eq!(EmbeddingReport::new(EmbeddingOutcome::AlreadyEmbedded), report);
		assert_eq!(vec![FFPROBE_BIN_NAME.to_owned()], embedder.runner().programs());
		// leftover sidecars are the job of the cleanup
		assert!(sidecar.exists());
	}

	#[test]
	fn test_embed_from_sidecar() {
		let (testdir, artifact) = setup();
		let sidecar = testdir.path().join("Song.jpg");
		std::fs::write(&sidecar, b"jpg").expect("Expected write to succeed");

		let embedder = TranscodeEmbedder::new(FnRunner::new(|program, args, timeout| {
			if program == FFPROBE_BIN_NAME {
				assert_eq!(DEFAULT_VERIFY_TIMEOUT, timeout);
				return Ok(probe_output(false));
			}

			assert_eq!(DEFAULT_MUX_TIMEOUT, timeout);
			std::fs::write(output_arg(args), b"audio with cover").expect("Expected write to succeed");
			return Ok(ProcessOutput::with_code(0));
		}));

		let report = embedder.ensure_embedded(&artifact);

		assert_eq!(EmbeddingReport::new(EmbeddingOutcome::EmbeddedNow), report);
		assert_eq!(
			vec![FFPROBE_BIN_NAME.to_owned(), FFMPEG_BIN_NAME.to_owned()],
			embedder.runner().programs()
		);
		assert_eq!(
			b"audio with cover".to_vec(),
			std::fs::read(&artifact).expect("Expected read to succeed")
		);
		assert!(!sidecar.exists());
		// only the artifact should be left
		assert_eq!(
			1,
			std::fs::read_dir(testdir.path())
				.expect("Expected read_dir to succeed")
				.count()
		);
	}

	#[test]
	fn test_mux_failure_preserves_files() {
		let (testdir, artifact) = setup();
		let sidecar = testdir.path().join("Song.webp");
		std::fs::write(&sidecar, b"webp").expect("Expected write to succeed");

		let embedder = TranscodeEmbedder::new(FnRunner::new(|program, args, _| {
			if program == FFPROBE_BIN_NAME {
				return Ok(probe_output(false));
			}

			// a partial output is left behind
			std::fs::write(output_arg(args), b"partial").expect("Expected write to succeed");
			return Ok(ProcessOutput {
				code:   Some(1),
				stdout: Vec::new(),
				stderr: b"Invalid data found when processing input\n".to_vec(),
			});
		}));

		let report = embedder.ensure_embedded(&artifact);

		assert_eq!(EmbeddingOutcome::Failed, report.outcome);
		assert_eq!(1, report.issues.len());
		assert_eq!(Stage::EmbedFallback, report.issues[0].stage);
		assert!(report.issues[0].message.contains("Invalid data found"));
		assert_eq!(
			b"original audio".to_vec(),
			std::fs::read(&artifact).expect("Expected read to succeed")
		);
		assert!(sidecar.exists());
		let tmp = tmp_sibling_path(&artifact).expect("Expected a tmp path");
		assert!(!tmp.exists());
	}

	#[test]
	fn test_mux_timeout() {
		let (testdir, artifact) = setup();
		let sidecar = testdir.path().join("Song.jpg");
		std::fs::write(&sidecar, b"jpg").expect("Expected write to succeed");

		let embedder = TranscodeEmbedder::new(FnRunner::new(|program, _, timeout| {
			if program == FFPROBE_BIN_NAME {
				return Ok(probe_output(false));
			}

			return Err(crate::Error::timeout(FFMPEG_BIN_NAME, timeout));
		}))
		.with_timeouts(Duration::from_secs(1), Duration::from_secs(2));

		let report = embedder.ensure_embedded(&artifact);

		assert_eq!(EmbeddingOutcome::Failed, report.outcome);
		assert!(report.issues[0].message.contains("did not exit within 2s"));
		assert!(sidecar.exists());
		assert_eq!(
			b"original audio".to_vec(),
			std::fs::read(&artifact).expect("Expected read to succeed")
		);
	}

	#[test]
	fn test_verify_failure_continues() {
		let (testdir, artifact) = setup();
		std::fs::write(testdir.path().join("Song.png"), b"png").expect("Expected write to succeed");

		let embedder = TranscodeEmbedder::new(FnRunner::new(|program, args, _| {
			if program == FFPROBE_BIN_NAME {
				return Err(crate::Error::custom_ioerror_location(
					std::io::ErrorKind::NotFound,
					"not found",
					"ffprobe spawn",
				));
			}

			std::fs::write(output_arg(args), b"audio with cover").expect("Expected write to succeed");
			return Ok(ProcessOutput::with_code(0));
		}));

		let report = embedder.ensure_embedded(&artifact);

		assert_eq!(EmbeddingOutcome::EmbeddedNow, report.outcome);
		assert_eq!(1, report.issues.len());
		assert_eq!(Stage::Verify, report.issues[0].stage);
		assert!(!testdir.path().join("Song.png").exists());
	}

	#[test]
	fn test_no_candidate() {
		let (_testdir, artifact) = setup();

		let embedder = TranscodeEmbedder::new(FnRunner::new(|_, _, _| return Ok(probe_output(false))));

		let report = embedder.ensure_embedded(&artifact);

		assert_eq!(EmbeddingOutcome::Failed, report.outcome);
		assert_eq!(vec![FFPROBE_BIN_NAME.to_owned()], embedder.runner().programs());
	}

	#[test]
	fn test_mux_without_output() {
		let (testdir, artifact) = setup();
		std::fs::write(testdir.path().join("Song.jpg"), b"jpg").expect("Expected write to succeed");

		let embedder = TranscodeEmbedder::new(FnRunner::new(|_, _, _| return Ok(ProcessOutput::with_code(0))));

		assert!(embedder.embed_from(&artifact, &testdir.path().join("Song.jpg")).is_err());
		assert!(testdir.path().join("Song.jpg").exists());
	}

	#[test]
	fn test_existing_tmp_name_untouched() {
		let (testdir, artifact) = setup();
		std::fs::write(testdir.path().join("Song.jpg"), b"jpg").expect("Expected write to succeed");
		// a unrelated file that happens to have the temporary name
		let taken = tmp_sibling_path(&artifact).expect("Expected a tmp path");
		std::fs::write(&taken, b"unrelated user file").expect("Expected write to succeed");

		let embedder = TranscodeEmbedder::new(FnRunner::new(|program, args, _| {
			if program == FFPROBE_BIN_NAME {
				return Ok(probe_output(false));
			}

			let output = output_arg(args);
			assert!(!output.exists(), "Expected mux output to not exist yet");
			std::fs::write(output, b"audio with cover").expect("Expected write to succeed");
			return Ok(ProcessOutput::with_code(0));
		}));

		let report = embedder.ensure_embedded(&artifact);

		assert_eq!(EmbeddingReport::new(EmbeddingOutcome::EmbeddedNow), report);
		assert_eq!(
			b"audio with cover".to_vec(),
			std::fs::read(&artifact).expect("Expected read to succeed")
		);
		assert_eq!(
			b"unrelated user file".to_vec(),
			std::fs::read(&taken).expect("Expected read to succeed")
		);
	}
}
