use std::ffi::OsString;

use super::{
	EngineRequest,
	PostProcessor,
	parse_progress::progress_template,
};
use crate::spawn::ArgsHelper;

/// Helper Function to assemble all ytdl command arguments
/// Returns a list of arguments for youtube-dl in order
#[inline]
#[must_use]
pub fn assemble_ytdl_command(request: &EngineRequest) -> Vec<OsString> {
	let mut ytdl_args = ArgsHelper::new();

	debug!("YTDL Output template is \"{}\"", request.output_template.display());

	// set the format that should be downloaded
	ytdl_args.arg("-f").arg(&request.format);

	for post_processor in &request.post_processors {
		add_post_processor(&mut ytdl_args, post_processor);
	}

	if request.collection {
		ytdl_args.arg("--yes-playlist");
	} else {
		ytdl_args.arg("--no-playlist");
	}

	// ensure ytdl is printing progress reports
	ytdl_args.arg("--progress");
	// ensure ytdl prints the progress reports on a new line
	ytdl_args.arg("--newline");
	// output progress in a consistently parseable format
	ytdl_args.arg("--progress-template").arg(progress_template());

	// ensure it is not in simulate mode
	ytdl_args.arg("--no-simulate");

	ytdl_args.arg("-o").arg(&request.output_template);

	// the "--" prevents a url starting with "-" from being parsed as a option
	ytdl_args.arg("--").arg(&request.url);

	return ytdl_args.into();
}

/// Add the arguments for a single [`PostProcessor`]
fn add_post_processor(ytdl_args: &mut ArgsHelper, post_processor: &PostProcessor) {
	match post_processor {
		PostProcessor::ExtractAudio { format, quality } => {
			// set ytdl to always extract the audio, if it is not already audio-only
			ytdl_args.arg("-x");
			ytdl_args.arg("--audio-format").arg(format);
			ytdl_args.arg("--audio-quality").arg(quality);
		},
		PostProcessor::WriteThumbnail => {
			// write the media's thumbnail as a seperate file
			ytdl_args.arg("--write-thumbnail");
		},
		PostProcessor::ConvertThumbnails(format) => {
			ytdl_args.arg("--convert-thumbnails").arg(format);
		},
		PostProcessor::EmbedThumbnail => {
			ytdl_args.arg("--embed-thumbnail");
		},
		PostProcessor::AddMetadata => {
			// add metadata to the container if the container supports it
			ytdl_args.arg("--add-metadata");
		},
		PostProcessor::MergeOutput(format) => {
			ytdl_args.arg("--merge-output-format").arg(format);
		},
	}
}
