//! Module for handling youtube-dl as the download engine

use std::{
	io::{
		BufRead,
		BufReader,
	},
	path::{
		Path,
		PathBuf,
	},
	time::Duration,
};

use assemble_cmd::assemble_ytdl_command;
use parse_progress::LineType;

use crate::{
	data::{
		progress_event::ProgressEvent,
		request::{
			DownloadRequest,
			MediaKind,
		},
	},
	error::IOErrorToError,
	spawn::ytdl::YTDL_BIN_NAME,
};

mod assemble_cmd;
pub mod parse_progress;

/// Format expression for [`MediaKind::Video`], prefers mp4+m4a so that the merge does not need to re-encode
pub const VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/bestvideo+bestaudio/best[ext=mp4]/best";
/// Format expression for [`MediaKind::Audio`]
pub const AUDIO_FORMAT: &str = "bestaudio/best";
/// Output file name template, relative to the destination directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";
/// Format the thumbnail sidecar gets converted to
pub const THUMBNAIL_FORMAT: &str = "jpg";

/// Post-Processing steps the engine should apply after downloading
#[derive(Debug, Clone, PartialEq)]
pub enum PostProcessor {
	/// Extract the audio into `format` with `quality`
	ExtractAudio {
		/// The audio container / codec (like "mp3")
		format:  String,
		/// The quality selector ("0" for best, or a bitrate like "128")
		quality: String,
	},
	/// Write the thumbnail as a sidecar file
	WriteThumbnail,
	/// Convert written thumbnails to the format
	ConvertThumbnails(String),
	/// Embed the thumbnail into the output file
	EmbedThumbnail,
	/// Write metadata (title, artist...) into the output file
	AddMetadata,
	/// Merge separate video and audio streams into the container
	MergeOutput(String),
}

/// Everything the engine needs to know for a single invocation
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
	/// The URL to download
	pub url:             String,
	/// The format selection expression
	pub format:          String,
	/// The full output template, including the destination directory
	pub output_template: PathBuf,
	/// Whether to download the whole collection (playlist) or just the single item
	pub collection:      bool,
	/// Post-Processing steps in order
	pub post_processors: Vec<PostProcessor>,
}

impl EngineRequest {
	/// Create the engine request for a [`DownloadRequest`] which outputs into `dir`
	#[must_use]
	pub fn from_request(request: &DownloadRequest, dir: &Path) -> Self {
		let (format, post_processors) = match request.kind() {
			MediaKind::Video => (
				VIDEO_FORMAT,
				vec![PostProcessor::MergeOutput(MediaKind::Video.output_extension().to_owned())],
			),
			MediaKind::Audio => (
				AUDIO_FORMAT,
				vec![
					PostProcessor::ExtractAudio {
						format:  MediaKind::Audio.output_extension().to_owned(),
						quality: request.quality().to_owned(),
					},
					PostProcessor::WriteThumbnail,
					PostProcessor::ConvertThumbnails(THUMBNAIL_FORMAT.to_owned()),
					PostProcessor::EmbedThumbnail,
					PostProcessor::AddMetadata,
				],
			),
		};

		return Self {
			url: request.url().to_owned(),
			format: format.to_owned(),
			output_template: dir.join(OUTPUT_TEMPLATE),
			collection: request.collection(),
			post_processors,
		};
	}
}

/// Capability to download media
pub trait DownloadEngine {
	/// Run a download to completion, calling `on_progress` synchronously for every progress report
	///
	/// Returns a error if the engine could not be started or did not exit successfully
	fn invoke(&self, request: &EngineRequest, on_progress: &mut dyn FnMut(ProgressEvent)) -> Result<(), crate::Error>;
}

/// [`DownloadEngine`] that uses a "yt-dlp" process
/// Assumes ytdl and ffmpeg have already been checked to exist and work (like using [`crate::spawn::ytdl::require_ytdl_installed`])
#[derive(Debug, Clone, Copy, Default)]
pub struct YtdlEngine {
	/// Log every line the engine outputs at "trace" level
	print_command_log: bool,
}

impl YtdlEngine {
	/// Create a new instance
	pub fn new(print_command_log: bool) -> Self {
		return Self { print_command_log };
	}
}

impl DownloadEngine for YtdlEngine {
	fn invoke(&self, request: &EngineRequest, on_progress: &mut dyn FnMut(ProgressEvent)) -> Result<(), crate::Error> {
		let args = assemble_ytdl_command(request);
		trace!("YTDL arguments: {:?}", args);

		// merge stderr into stdout, the exit status is checked manually
		let ytdl_child = duct::cmd(YTDL_BIN_NAME, args)
			.stderr_to_stdout()
			.stdin_null()
			.unchecked()
			.reader()
			.attach_location_err("duct ytdl reader")?;

		let last_error = handle_stdout(self.print_command_log, on_progress, BufReader::new(&ytdl_child));

		let status = loop {
			// wait loop, because somehow a "ReaderHandle" does not implement "wait", only "try_wait", but have to wait for it to exit here
			if let Some(output) = ytdl_child.try_wait().attach_location_err("duct ytdl try_wait")? {
				break output.status;
			}

			std::thread::sleep(Duration::from_millis(100)); // sleep to same some time between the next wait (to not cause constant cpu spike)
		};

		if !status.success() {
			let msg = last_error.unwrap_or_else(|| {
				return format!(
					"{} exited with code {}",
					YTDL_BIN_NAME,
					status.code().map_or("None".into(), |v| return v.to_string())
				);
			});

			return Err(crate::Error::engine_failed(msg));
		}

		if let Some(last_error) = last_error {
			// errors for single items in a collection do not fail the whole invocation
			warn!("youtube-dl exited successfully, but reported: {}", last_error);
		}

		return Ok(());
	}
}

/// Helper function to handle the output from a spawned ytdl command
/// Returns the last "ERROR:" line encountered
fn handle_stdout<R: BufRead>(
	print_command_log: bool,
	on_progress: &mut dyn FnMut(ProgressEvent),
	reader: R,
) -> Option<String> {
	let mut last_error = None;

	for line in reader.lines() {
		let line = match line {
			Ok(v) => v,
			Err(err) => {
				debug!("duct lines reader errored: {}", err);
				break;
			},
		};

		// only print STDOUT to output when requested
		if print_command_log {
			trace!("ytdl [STDOUT]: \"{}\"", line);
		}

		match LineType::from_line(&line) {
			LineType::Progress(event) => on_progress(event),
			LineType::Error => {
				// the following is using debug printing, because the line may include escape characters, which would mess-up the printing, but is still good to know when reading
				warn!("Encountered youtube-dl error: {:#?}", line);
				last_error = Some(line);
			},
			LineType::Warning => {
				// ytdl warnings are non-fatal, but should still be logged
				debug!("youtube-dl: {:#?}", line);
			},
			LineType::Generic => (),
		}
	}

	return last_error;
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::data::progress_event::ProgressPhase;

	mod handle_stdout {
		use super::*;

		#[test]
		fn test_progress_events() {
			let input = r#"[youtube] Extracting URL: https://youtu.be/abc
[info] abc: Downloading 1 format(s): 251
YTGRAB_PROGRESS downloading|0|4096|NA|NA|NA|/music/Song.webm
YTGRAB_PROGRESS downloading|2048|4096|NA|1024|2|/music/Song.webm
YTGRAB_PROGRESS finished|4096|4096|NA|NA|NA|/music/Song.webm
[ExtractAudio] Destination: /music/Song.mp3
"#;
			let mut events = Vec::new();

			let last_error = handle_stdout(false, &mut |event| events.push(event), BufReader::new(input.as_bytes()));

			assert_eq!(None, last_error);
			assert_eq!(
				vec![ProgressPhase::Downloading, ProgressPhase::Downloading, ProgressPhase::Finished],
				events.iter().map(|v| return v.phase).collect::<Vec<_>>()
			);
			assert_eq!(Some(2048), events[1].downloaded_bytes);
		}

		#[test]
		fn test_last_error() {
			let input = r#"[youtube] Extracting URL: https://youtu.be/abc
ERROR: [youtube] abc: first
WARNING: something
ERROR: [youtube] abc: Unable to download webpage: network unreachable
"#;
			let mut count = 0;

			let last_error = handle_stdout(true, &mut |_| count += 1, BufReader::new(input.as_bytes()));

			assert_eq!(
				Some("ERROR: [youtube] abc: Unable to download webpage: network unreachable".to_owned()),
				last_error
			);
			assert_eq!(0, count);
		}
	}

	#[test]
	fn test_from_request_audio() {
		let request = EngineRequest::from_request(
			&DownloadRequest::audio("https://youtu.be/abc", "0", true),
			Path::new("/music"),
		);

		assert_eq!(AUDIO_FORMAT, request.format);
		assert_eq!(PathBuf::from("/music/%(title)s.%(ext)s"), request.output_template);
		assert!(request.collection);
		assert_eq!(
			Some(&PostProcessor::ExtractAudio {
				format:  "mp3".to_owned(),
				quality: "0".to_owned(),
			}),
			request.post_processors.first()
		);
		assert!(request.post_processors.contains(&PostProcessor::EmbedThumbnail));
	}

	#[test]
	#[ignore = "CI Install not present currently"]
	fn test_invoke_invalid_url() {
		let request = EngineRequest::from_request(
			&DownloadRequest::video("https://www.youtube.com/watch?v=", false),
			&std::env::temp_dir(),
		);

		assert!(YtdlEngine::new(false).invoke(&request, &mut |_| ()).is_err());
	}
}
