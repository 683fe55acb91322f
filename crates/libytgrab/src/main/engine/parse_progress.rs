//! Module for classifying and parsing youtube-dl output lines

use std::path::Path;

use crate::data::progress_event::{
	ProgressEvent,
	ProgressPhase,
};

/// Prefix of every custom progress line, to differentiate it from everything else youtube-dl outputs
pub const PROGRESS_PREFIX: &str = "YTGRAB_PROGRESS ";
/// Separator between the fields of a progress line
const FIELD_SEPARATOR: char = '|';
/// Amount of fields in a progress line
const FIELD_COUNT: usize = 7;

/// The "--progress-template" value to make youtube-dl output lines [parse_progress_line] can understand
/// The filename is last, because it is the only field that may contain the separator
#[must_use]
pub fn progress_template() -> String {
	return format!(
		"download:{PROGRESS_PREFIX}%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress.speed)s|%(progress.eta)s|%(progress.filename)s"
	);
}

/// Line type for a ytdl output line
#[derive(Debug, PartialEq, Clone)]
pub enum LineType {
	/// Variant for lines from the custom progress template
	Progress(ProgressEvent),
	/// Variant for lines that start with "ERROR:"
	Error,
	/// Variant for lines that start with "WARNING:"
	Warning,
	/// Variant for everything else (like "[youtube] ...", "[ExtractAudio] ...")
	Generic,
}

impl LineType {
	/// Get the correct Variant for a input line
	pub fn from_line(input: &str) -> Self {
		if let Some(event) = parse_progress_line(input) {
			return Self::Progress(event);
		}

		if input.starts_with("ERROR:") {
			return Self::Error;
		}

		if input.starts_with("WARNING:") {
			return Self::Warning;
		}

		return Self::Generic;
	}
}

/// Try to parse a line output with [progress_template]
/// Returns [`None`] if the line is not a progress line or has a unknown status
pub fn parse_progress_line(input: &str) -> Option<ProgressEvent> {
	let rest = input.trim_end_matches(['\r', '\n']).strip_prefix(PROGRESS_PREFIX)?;
	let fields: Vec<&str> = rest.splitn(FIELD_COUNT, FIELD_SEPARATOR).collect();

	if fields.len() != FIELD_COUNT {
		trace!("Progress line has {} fields instead of {}", fields.len(), FIELD_COUNT);
		return None;
	}

	let phase = ProgressPhase::try_from_status(fields[0])?;

	return Some(ProgressEvent {
		phase,
		artifact: parse_filename(fields[6]),
		downloaded_bytes: parse_bytes(fields[1]),
		total_bytes: parse_bytes(fields[2]),
		total_bytes_estimate: parse_bytes(fields[3]),
		speed: parse_float(fields[4]),
		eta: parse_float(fields[5]),
	});
}

/// Parse a numeric field, "NA", non-numeric, negative and non-finite values are unknown
fn parse_float(input: &str) -> Option<f64> {
	return input
		.trim()
		.parse::<f64>()
		.ok()
		.filter(|v| return v.is_finite() && *v >= 0.0);
}

/// Parse a byte count field, which youtube-dl may output as a float (like for estimates)
fn parse_bytes(input: &str) -> Option<u64> {
	// truncation wanted, there are no partial bytes
	return parse_float(input).map(|v| return v as u64);
}

/// Get the file name from a path field
fn parse_filename(input: &str) -> Option<String> {
	let input = input.trim();

	if input.is_empty() || input == "NA" {
		return None;
	}

	return Some(
		Path::new(input)
			.file_name()
			.map_or_else(|| return input.to_owned(), |v| return v.to_string_lossy().to_string()),
	);
}

#[cfg(test)]
mod test {
	use super::*;

	mod parse_progress_line {
		use super::*;

		#[test]
		fn test_full_line() {
			let line = "YTGRAB_PROGRESS downloading|1048576|4194304|NA|524288.5|6|/music/Some Title.webm";

			assert_eq!(
				Some(
					ProgressEvent::new(ProgressPhase::Downloading)
						.with_artifact("Some Title.webm")
						.with_downloaded(1_048_576)
						.with_total(4_194_304)
						.with_speed(524_288.5)
						.with_eta(6.0)
				),
				parse_progress_line(line)
			);
		}

		#[test]
		fn test_estimate_as_float() {
			let line = "YTGRAB_PROGRESS downloading|1024|NA|2048.7|NA|NA|/music/a.webm\r\n";

			let event = parse_progress_line(line).expect("Expected line to parse");

			assert_eq!(None, event.total_bytes);
			assert_eq!(Some(2048), event.total_bytes_estimate);
			assert_eq!(None, event.speed);
			assert_eq!(None, event.eta);
		}

		#[test]
		fn test_finished() {
			let line = "YTGRAB_PROGRESS finished|4194304|4194304|NA|NA|NA|/music/Some Title.webm";

			let event = parse_progress_line(line).expect("Expected line to parse");

			assert_eq!(ProgressPhase::Finished, event.phase);
			assert_eq!(Some("Some Title.webm".to_owned()), event.artifact);
		}

		#[test]
		fn test_separator_in_filename() {
			let line = "YTGRAB_PROGRESS downloading|1|2|NA|NA|NA|/music/A | B.webm";

			let event = parse_progress_line(line).expect("Expected line to parse");

			assert_eq!(Some("A | B.webm".to_owned()), event.artifact);
		}

		#[test]
		fn test_negative_and_garbage() {
			let line = "YTGRAB_PROGRESS downloading|-5|abc|inf|-1.0|NaN|NA";

			assert_eq!(
				Some(ProgressEvent::new(ProgressPhase::Downloading)),
				parse_progress_line(line)
			);
		}

		#[test]
		fn test_not_progress() {
			assert_eq!(None, parse_progress_line("[download]  50.0% of 3.47MiB"));
			assert_eq!(None, parse_progress_line("YTGRAB_PROGRESS downloading|1|2"));
			assert_eq!(None, parse_progress_line("YTGRAB_PROGRESS unknown|1|2|3|4|5|a"));
		}
	}

	#[test]
	fn test_line_type() {
		assert_eq!(LineType::Error, LineType::from_line("ERROR: [youtube] abc: Video unavailable"));
		assert_eq!(LineType::Warning, LineType::from_line("WARNING: something"));
		assert_eq!(LineType::Generic, LineType::from_line("[youtube] Extracting URL"));
		assert!(matches!(
			LineType::from_line("YTGRAB_PROGRESS error|NA|NA|NA|NA|NA|NA"),
			LineType::Progress(_)
		));
	}

	#[test]
	fn test_template_matches_parser() {
		let template = progress_template();

		assert!(template.starts_with("download:YTGRAB_PROGRESS "));
		// the template is split the same way a filled line is
		let fields = template
			.strip_prefix("download:")
			.and_then(|v| return v.strip_prefix(PROGRESS_PREFIX))
			.expect("Expected template prefix")
			.split(FIELD_SEPARATOR)
			.count();
		assert_eq!(FIELD_COUNT, fields);
	}
}
