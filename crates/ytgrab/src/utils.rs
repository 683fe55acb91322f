//! Utils for the `ytgrab` binary

use crate::clap_conf::{
	CliDerive,
	KindChoice,
};
use indicatif::{
	ProgressBar,
	ProgressDrawTarget,
};
use libytgrab::{
	error::IOErrorToError,
	main::progress::{
		ProgressSink,
		RenderOp,
	},
	spawn::ytdl::require_ytdl_installed,
};
use regex::Regex;
use std::{
	borrow::Cow,
	io::Write,
	sync::LazyLock,
};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Helper function to set the progressbar to a draw target if mode is interactive
pub fn set_progressbar(bar: &ProgressBar, main_args: &CliDerive) {
	if main_args.is_interactive() {
		bar.set_draw_target(ProgressDrawTarget::stderr());
	}
}

/// Test if yt-dlp is installed and reachable, including required dependencies like ffmpeg
/// Returns the yt-dlp version
pub fn require_tools_installed() -> Result<String, crate::Error> {
	return require_ytdl_installed().map_err(|err| {
		log::error!("Could not start or find yt-dlp or ffmpeg! Error: {}", err);

		return crate::Error::other("yt-dlp or ffmpeg Version could not be determined, are they installed and reachable?");
	});
}

/// Regex to check that a URL is pointing to youtube
static YOUTUBE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	return Regex::new(r"(?i)^(?:https?://)?(?:[\w-]+\.)*(?:youtube\.com|youtu\.be)(?:[/:?#]|$)").unwrap();
});

/// Check if the `url` is a supported youtube url ("youtube.com", "m.youtube.com", "youtu.be")
#[must_use]
pub fn is_supported_url(url: &str) -> bool {
	return YOUTUBE_URL_REGEX.is_match(url.trim());
}

/// Check if the `url` references a playlist
#[must_use]
pub fn is_collection_url(url: &str) -> bool {
	return url.contains("list=");
}

/// Answers accepted as "yes" for the playlist question
const ACCEPT_ANSWERS: [&str; 4] = ["y", "yes", "예", "ㅇ"];

/// Check if `input` is a accepting answer, anything else (including empty) is a "no"
#[must_use]
pub fn is_accept_answer(input: &str) -> bool {
	let input = input.trim().to_lowercase();

	return ACCEPT_ANSWERS.contains(&input.as_str());
}

/// Parse a menu choice ("1" to "3") into a [`KindChoice`]
#[must_use]
pub fn parse_menu_choice(input: &str) -> Option<KindChoice> {
	return match input.trim() {
		"1" => Some(KindChoice::Video),
		"2" => Some(KindChoice::Audio),
		"3" => Some(KindChoice::Audio128),
		_ => None,
	};
}

/// Print `msg` and read a single trimmed line from STDIN
pub fn read_line(msg: &str) -> Result<String, crate::Error> {
	print!("{msg}");
	// ensure the message is printed before reading
	std::io::stdout().flush().attach_location_err("stdout flush")?;
	let mut input = String::new();
	std::io::stdin().read_line(&mut input).attach_location_err("stdin read_line")?;

	return Ok(input.trim().to_owned());
}

/// Ask for a URL until a non-empty one is given
pub fn ask_url() -> Result<String, crate::Error> {
	loop {
		let input = read_line("YouTube URL: ")?;

		if !input.is_empty() {
			return Ok(input);
		}

		println!("... Invalid Input: (Empty)");
	}
}

/// Show the download menu and ask until a valid choice is made
pub fn ask_kind() -> Result<KindChoice, crate::Error> {
	println!("Download options:");
	println!("1. Video (best quality)");
	println!("2. Music (MP3, best quality, thumbnail)");
	println!("3. Music (MP3, 128kbps, thumbnail)");

	loop {
		let input = read_line("Choice (1-3): ")?;

		if let Some(choice) = parse_menu_choice(&input) {
			return Ok(choice);
		}

		println!("... Invalid Input: \"{input}\"");
	}
}

/// Ask whether the whole playlist should be downloaded, defaults to "no"
pub fn ask_collection() -> Result<bool, crate::Error> {
	println!("The URL references a playlist");
	let input = read_line("Download the whole playlist? [y/N]: ")?;

	return Ok(is_accept_answer(&input));
}

/// Get the display width of a single grapheme cluster
fn grapheme_width(grapheme: &str) -> usize {
	#[allow(unused_mut)] // mut is only used with the workaround
	let mut width = grapheme.width();

	#[cfg(feature = "workaround_fe0f")]
	{
		width += grapheme.matches('\u{fe0f}').count();
	}

	return width;
}

/// Get the display width of `msg`
#[must_use]
pub fn display_width(msg: &str) -> usize {
	return msg.graphemes(true).map(grapheme_width).sum();
}

/// Truncate `msg` so that it takes at most `max_width` display positions, without splitting grapheme clusters
/// If `add_dots` is set, "..." is appended when truncated (and counted towards `max_width`)
#[must_use]
pub fn truncate_message_display_pos(msg: &str, max_width: usize, add_dots: bool) -> Cow<'_, str> {
	if display_width(msg) <= max_width {
		return Cow::Borrowed(msg);
	}

	let dots = if add_dots { "..." } else { "" };
	let available = max_width.saturating_sub(dots.len());

	let mut width = 0;
	let mut end = 0;
	for (idx, grapheme) in msg.grapheme_indices(true) {
		let grapheme_width = grapheme_width(grapheme);
		if width + grapheme_width > available {
			break;
		}
		width += grapheme_width;
		end = idx + grapheme.len();
	}

	return Cow::Owned(format!("{}{}", &msg[..end], dots));
}

/// Static size the progress style takes, currently accounts for `# `
const STYLE_STATIC_SIZE: usize = 2;

/// Truncate the given message to the current terminal width so that the progressbar does not do new-lines
fn truncate_message_term_width(msg: &str) -> String {
	let display_width_available = terminal_size::terminal_size().map(|(w, _h)| {
		return (w.0 as usize).saturating_sub(STYLE_STATIC_SIZE);
	});

	let Some(display_width_available) = display_width_available else {
		return msg.into();
	};

	return truncate_message_display_pos(msg, display_width_available, true).to_string();
}

/// [`ProgressSink`] that displays partial lines as the message of a [`ProgressBar`]
pub struct IndicatifSink {
	/// The bar to display on
	bar:     ProgressBar,
	/// The full text of the last partial line
	partial: Option<String>,
}

impl IndicatifSink {
	/// Create a new sink displaying on `bar`
	pub fn new(bar: ProgressBar) -> Self {
		return Self { bar, partial: None };
	}

	/// Clear the bar, should be called once done
	pub fn finish(&self) {
		self.bar.finish_and_clear();
	}
}

impl ProgressSink for IndicatifSink {
	fn apply(&mut self, op: &RenderOp) {
		match op {
			RenderOp::Partial(text) => {
				self.bar.set_message(truncate_message_term_width(text));
				self.partial = Some(text.clone());
			},
			RenderOp::Line(text) => self.bar.println(text),
			RenderOp::Break => {
				// keep the last state of the finished line above the bar
				if let Some(text) = self.partial.take() {
					self.bar.println(truncate_message_term_width(&text));
				}
				self.bar.set_message("");
			},
		}
	}
}
