//! Module that contains all logic for spawning the "ffmpeg" and "ffprobe" commands
use std::{
	ffi::OsString,
	path::Path,
	process::{
		Output,
		Stdio,
	},
	sync::LazyLock,
};

use regex::Regex;
use serde::Deserialize;

use super::ArgsHelper;
use crate::error::IOErrorToError;

/// Binary name to spawn for the transcoder
pub const FFMPEG_BIN_NAME: &str = "ffmpeg";
/// Binary name to spawn for the stream inspection
pub const FFPROBE_BIN_NAME: &str = "ffprobe";

/// Regex to parse the version from a "ffmpeg -version" output
/// cap1: version
static FFMPEG_VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	return Regex::new(r"(?mi)^ffmpeg version ([a-z0-9.-]+) Copyright").unwrap();
});

/// Get Version of `ffmpeg`
#[inline]
pub fn ffmpeg_version() -> Result<String, crate::Error> {
	let mut cmd = super::multiplatform::spawn_command(FFMPEG_BIN_NAME);
	cmd.arg("-version");

	let command_output: Output = cmd
		.stderr(Stdio::null())
		.stdout(Stdio::piped())
		.stdin(Stdio::null())
		.spawn()
		.attach_location_err("ffmpeg spawn")?
		.wait_with_output()
		.attach_location_err("ffmpeg wait_with_output")?;

	if !command_output.status.success() {
		return Err(crate::Error::command_unsuccessful("FFMPEG did not successfully exit!"));
	}

	let as_string = String::from_utf8(command_output.stdout)?;

	return ffmpeg_parse_version(&as_string);
}

/// Internal Function to parse the input to a ffmpeg version with regex
#[inline]
fn ffmpeg_parse_version(input: &str) -> Result<String, crate::Error> {
	return Ok(FFMPEG_VERSION_REGEX
		.captures_iter(input)
		.next()
		.ok_or_else(|| return crate::Error::no_captures("FFMPEG Version could not be determined"))?[1]
		.to_owned());
}

/// Test if ffmpeg is installed and reachable and return the version found
///
/// This function is not automatically called in the library, it is recommended to run this in any binary trying to run libytgrab.
pub fn require_ffmpeg_installed() -> Result<String, crate::Error> {
	return match ffmpeg_version() {
		Ok(v) => Ok(v),
		Err(err) => {
			log::error!("Could not start or find ffmpeg! Error: {}", err);

			return Err(crate::Error::custom_ioerror_location(
				std::io::ErrorKind::NotFound,
				"FFmpeg Version could not be determined, is it installed and reachable?",
				format!("{} in PATH", FFMPEG_BIN_NAME),
			));
		},
	};
}

/// Consistent error for a command that exited with a non-0 code
/// `last_lines` should be the last few lines of output the command wrote
#[must_use]
pub fn unsuccessfull_command_exit(name: &str, code: Option<i32>, last_lines: &str) -> crate::Error {
	return crate::Error::command_unsuccessful(format!(
		"{} did not successfully exit! Exit Code: {}\nLast Lines:\n{}",
		name,
		code.map_or("None".into(), |v| return v.to_string()),
		last_lines
	));
}

/// Assemble the "ffprobe" arguments to list all streams of `media` with their "attached_pic" disposition as json
#[must_use]
pub fn attached_pic_probe_args(media: &Path) -> Vec<OsString> {
	let mut args = ArgsHelper::new();

	args.args(["-v", "quiet"]);
	args.args([
		"-show_entries",
		"stream=index,codec_type,codec_name:stream_disposition=attached_pic",
	]);
	args.args(["-of", "json"]);
	args.arg(media);

	return args.into();
}

/// Partial "ffprobe -of json" output, only the parts needed to find a attached picture
#[derive(Debug, Deserialize)]
struct ProbeOutput {
	#[serde(default)]
	streams: Vec<ProbeStream>,
}

/// A single stream in [ProbeOutput]
#[derive(Debug, Deserialize)]
struct ProbeStream {
	#[serde(default)]
	codec_type:  Option<String>,
	#[serde(default)]
	disposition: Option<ProbeDisposition>,
}

/// The disposition flags of a [ProbeStream]
#[derive(Debug, Deserialize)]
struct ProbeDisposition {
	#[serde(default)]
	attached_pic: u8,
}

/// Parse the output of [attached_pic_probe_args] and return whether a attached picture stream exists
pub fn parse_has_attached_pic(input: &str) -> Result<bool, crate::Error> {
	let parsed: ProbeOutput = serde_json::from_str(input)?;

	return Ok(parsed.streams.iter().any(|stream| {
		let is_attached = stream.disposition.as_ref().is_some_and(|v| return v.attached_pic == 1);

		if is_attached {
			trace!(
				"Found attached picture stream of type {:?}",
				stream.codec_type.as_deref().unwrap_or("<unknown>")
			);
		}

		return is_attached;
	}));
}

/// Assemble the "ffmpeg" arguments to mux `audio` with `image` as a cover into `output`
/// The audio stream is copied, the image is re-encoded to mjpeg and marked as "attached_pic"
#[must_use]
pub fn cover_mux_args(audio: &Path, image: &Path, output: &Path) -> Vec<OsString> {
	let mut args = ArgsHelper::new();

	args.args(["-y", "-nostdin", "-hide_banner"]);
	args.arg("-i").arg(audio); // set media file as input "0"
	args.arg("-i").arg(image); // set image file as input "1"
	args.args([
		"-map",
		"0:a:0", // the first audio stream of the media
		"-map",
		"1:0", // the image
		"-c:a",
		"copy", // dont re-encode the audio
		"-c:v",
		"mjpeg", // baseline image codec every player understands
		"-id3v2_version",
		"3",
		"-metadata:s:v",
		"title=Album cover",
		"-metadata:s:v",
		"comment=Cover (front)",
		"-disposition:v",
		"attached_pic",
	]);
	args.arg(output);

	return args.into();
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_ffmpeg_parse_version_invalid_input() {
		assert_eq!(
			ffmpeg_parse_version("hello"),
			Err(crate::Error::no_captures("FFMPEG Version could not be determined"))
		);
	}

	#[test]
	fn test_ffmpeg_parse_version_valid_static_input() {
		let ffmpeg_output = "ffmpeg version n4.4.1 Copyright (c) 2000-2021 the FFmpeg developers
built with gcc 11.1.0 (GCC)
libavutil      56. 70.100 / 56. 70.100
libavcodec     58.134.100 / 58.134.100
";

		assert_eq!(ffmpeg_parse_version(ffmpeg_output), Ok("n4.4.1".to_owned()));
	}

	#[test]
	fn test_unsuccessfull_command_exit() {
		assert_eq!(
			crate::Error::command_unsuccessful("ffmpeg did not successfully exit! Exit Code: 1\nLast Lines:\nsome error"),
			unsuccessfull_command_exit("ffmpeg", Some(1), "some error")
		);
	}

	mod parse_has_attached_pic {
		use super::*;

		#[test]
		fn test_with_cover() {
			let input = r#"{
	"programs": [],
	"streams": [
		{ "index": 0, "codec_name": "mp3", "codec_type": "audio", "disposition": { "attached_pic": 0 } },
		{ "index": 1, "codec_name": "mjpeg", "codec_type": "video", "disposition": { "attached_pic": 1 } }
	]
}"#;

			assert_eq!(Ok(true), parse_has_attached_pic(input));
		}

		#[test]
		fn test_without_cover() {
			let input = r#"{
	"programs": [],
	"streams": [
		{ "index": 0, "codec_name": "mp3", "codec_type": "audio", "disposition": { "attached_pic": 0 } }
	]
}"#;

			assert_eq!(Ok(false), parse_has_attached_pic(input));
		}

		#[test]
		fn test_empty_object() {
			assert_eq!(Ok(false), parse_has_attached_pic("{}"));
		}

		#[test]
		fn test_invalid() {
			assert!(parse_has_attached_pic("not json").is_err());
		}
	}

	#[test]
	fn test_cover_mux_args() {
		let args = cover_mux_args(
			Path::new("/music/Song.mp3"),
			Path::new("/music/Song.webp"),
			Path::new("/music/Song_1.mp3"),
		);

		assert_eq!(OsString::from("/music/Song_1.mp3"), args[args.len() - 1]);
		assert!(args.contains(&OsString::from("attached_pic")));
		let input_pos = args
			.iter()
			.position(|v| return v == "/music/Song.mp3")
			.expect("Expected audio input to be present");
		assert_eq!(OsString::from("-i"), args[input_pos - 1]);
		let copy_pos = args
			.iter()
			.position(|v| return v == "-c:a")
			.expect("Expected audio codec to be set");
		assert_eq!(OsString::from("copy"), args[copy_pos + 1]);
	}

	#[test]
	#[ignore = "CI Install not present currently"]
	fn test_ffmpeg_spawn() {
		assert!(ffmpeg_version().is_ok());
	}
}
