//! Module for Clap related structs (derived)

#![deny(missing_docs)] // comments are used for "--help" generation, so it should always be defined

use clap::{
	ArgAction,
	Parser,
	Subcommand,
	ValueEnum,
};
use clap_complete::Shell;
use is_terminal::IsTerminal;
use libytgrab::main::cleanup::DEFAULT_RECENCY_WINDOW;
use std::{
	path::PathBuf,
	time::Duration,
};

/// Trait to check and transform all Command Structures
trait Check {
	/// Check and transform self to be correct
	fn check(&mut self) -> Result<(), crate::Error>;
}

#[derive(Debug, Parser, Clone, PartialEq)]
#[command(author, version = env!("YTGRAB_VERSION"), about, long_about = None)]
#[command(bin_name("ytgrab"))]
#[command(args_override_self(true))] // specifying a argument multiple times overwrites the earlier ones
#[command(disable_help_subcommand(true))] // Disable subcommand "help", only "-h --help" should be used
#[command(args_conflicts_with_subcommands(true))]
pub struct CliDerive {
	/// Set Loggin verbosity (0 - Default - WARN, 1 - INFO, 2 - DEBUG, 3 - TRACE)
	#[arg(short, long, action = ArgAction::Count, env = "YTGRAB_VERBOSITY")]
	pub verbosity:    u8,
	/// Explicitly set interactive / not interactive
	#[arg(long = "interactive")]
	pub explicit_tty: Option<bool>,
	/// Force Color to be active in any mode
	#[arg(long = "color")]
	pub force_color:  bool,

	#[command(flatten)]
	pub download: CommandDownload,

	#[command(subcommand)]
	pub subcommands: Option<SubCommands>,
}

impl CliDerive {
	/// Execute clap::Parser::parse and apply custom validation and transformation logic
	pub fn custom_parse() -> Result<Self, crate::Error> {
		let mut parsed = Self::parse();

		Check::check(&mut parsed)?;

		return Ok(parsed);
	}

	/// Get if the mode is interactive or not
	#[must_use]
	pub fn is_interactive(&self) -> bool {
		if let Some(explicit) = self.explicit_tty {
			return explicit;
		}

		return std::io::stdout().is_terminal() && std::io::stdin().is_terminal();
	}

	/// Get if the colors are enabled or not
	#[must_use]
	pub fn enable_colors(&self) -> bool {
		return self.force_color | self.is_interactive();
	}
}

impl Check for CliDerive {
	fn check(&mut self) -> Result<(), crate::Error> {
		if let Some(subcommands) = &mut self.subcommands {
			return Check::check(subcommands);
		}

		return Check::check(&mut self.download);
	}
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum SubCommands {
	/// Generate shell completions
	Completions(CommandCompletions),
}

impl Check for SubCommands {
	fn check(&mut self) -> Result<(), crate::Error> {
		match self {
			SubCommands::Completions(v) => return Check::check(v),
		}
	}
}

/// The kind of download to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindChoice {
	/// Video in the best quality, merged into a mp4
	Video,
	/// Audio in the best quality as a mp3 with cover
	Audio,
	/// Audio with 128kbps as a mp3 with cover
	#[value(name = "audio128")]
	Audio128,
}

/// How to embed the cover into audio files when the download did not already
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedWith {
	/// Verify with "ffprobe" and embed by remuxing with "ffmpeg"
	Ffmpeg,
	/// Read and write the tags directly
	Tags,
}

/// Download a given URL into the videos or music directory
#[derive(Debug, Parser, Clone, PartialEq)]
pub struct CommandDownload {
	/// Kind of download, will be asked for if not set
	#[arg(short, long, value_enum)]
	pub kind:               Option<KindChoice>,
	/// Download the whole playlist, if the URL has one
	#[arg(long = "playlist", conflicts_with = "no_playlist")]
	pub playlist:           bool,
	/// Only download the single media, even if the URL has a playlist
	#[arg(long = "no-playlist")]
	pub no_playlist:        bool,
	/// Base directory for the "videos" and "music" directories, by default the system media directories are used
	#[arg(short, long = "out", env = "YTGRAB_OUT")]
	pub output_path:        Option<PathBuf>,
	/// How to embed the cover of audio files, if the download did not do it already
	#[arg(long = "embed-with", value_enum, default_value_t = EmbedWith::Ffmpeg, env = "YTGRAB_EMBED_WITH")]
	pub embed_with:         EmbedWith,
	/// Seconds a thumbnail image may be old to still be removed after embedding
	#[arg(long = "recency-window", default_value_t = DEFAULT_RECENCY_WINDOW.as_secs(), env = "YTGRAB_RECENCY_WINDOW")]
	pub recency_window:     u64,
	/// Dont open the output directory after the download
	#[arg(long = "no-open")]
	pub no_open:            bool,
	/// Remove the track number tag from audio files (only with "--embed-with tags")
	#[arg(long = "strip-track-number")]
	pub strip_track_number: bool,
	/// Print yt-dlp output
	/// This will still require logging verbosity set to 3 or "RUST_LOG=trace"
	#[arg(long = "engine-log")]
	pub engine_log:         bool,

	/// The URL to download, will be asked for if not set
	pub url: Option<String>,
}

impl CommandDownload {
	/// Get the explicitly chosen playlist handling, [`None`] if it should be asked for
	#[must_use]
	pub fn collection_choice(&self) -> Option<bool> {
		if self.playlist {
			return Some(true);
		}
		if self.no_playlist {
			return Some(false);
		}

		return None;
	}

	/// Get the recency window as a [`Duration`]
	#[must_use]
	pub fn recency_window(&self) -> Duration {
		return Duration::from_secs(self.recency_window);
	}
}

impl Check for CommandDownload {
	fn check(&mut self) -> Result<(), crate::Error> {
		// treat a empty url like no url, so that it gets asked for
		if let Some(url) = &self.url {
			let trimmed = url.trim();

			self.url = if trimmed.is_empty() {
				None
			} else {
				Some(trimmed.to_owned())
			};
		}

		if let Some(output_path) = &self.output_path {
			self.output_path = Some(
				libytgrab::utils::expand_tidle(output_path)
					.ok_or_else(|| return crate::Error::other("Could not resolve \"~\" in the output path"))?,
			);
		}

		if self.strip_track_number && self.embed_with != EmbedWith::Tags {
			warn!("\"--strip-track-number\" only has a effect with \"--embed-with tags\"");
		}

		return Ok(());
	}
}

/// Generate shell completions
#[derive(Debug, Parser, Clone, PartialEq)]
pub struct CommandCompletions {
	/// Set which shell completions should be generated
	/// Supported are: Bash, Elvish, Fish, PowerShell, Zsh
	#[arg(short, long)]
	pub shell:            Shell,
	/// Output path to store the completions at, if not specified will output to stdout
	#[arg(short = 'o', long = "out")]
	pub output_file_path: Option<PathBuf>,
}

impl Check for CommandCompletions {
	fn check(&mut self) -> Result<(), crate::Error> {
		return Ok(());
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn parse(args: &[&str]) -> CliDerive {
		return CliDerive::try_parse_from(std::iter::once("ytgrab").chain(args.iter().copied()))
			.expect("Expected arguments to parse");
	}

	mod command_download {
		use super::*;

		fn init_default() -> CommandDownload {
			return CommandDownload {
				kind:               None,
				playlist:           false,
				no_playlist:        false,
				output_path:        None,
				embed_with:         EmbedWith::Ffmpeg,
				recency_window:     600,
				no_open:            false,
				strip_track_number: false,
				engine_log:         false,
				url:                None,
			};
		}

		#[test]
		fn test_check() {
			let init_default = init_default();

			let mut cloned = init_default.clone();
			assert!(cloned.check().is_ok());
			assert_eq!(init_default, cloned);
		}

		#[test]
		fn test_check_url() {
			let mut empty = CommandDownload {
				url: Some("   ".to_owned()),
				..init_default()
			};
			assert!(empty.check().is_ok());
			assert_eq!(None, empty.url);

			let mut padded = CommandDownload {
				url: Some(" https://youtu.be/abc \n".to_owned()),
				..init_default()
			};
			assert!(padded.check().is_ok());
			assert_eq!(Some("https://youtu.be/abc".to_owned()), padded.url);
		}

		#[test]
		fn test_collection_choice() {
			assert_eq!(None, init_default().collection_choice());
			assert_eq!(
				Some(true),
				CommandDownload {
					playlist: true,
					..init_default()
				}
				.collection_choice()
			);
			assert_eq!(
				Some(false),
				CommandDownload {
					no_playlist: true,
					..init_default()
				}
				.collection_choice()
			);
		}

		#[test]
		fn test_parse_arguments() {
			let parsed = parse(&[
				"--kind",
				"audio128",
				"--no-playlist",
				"--embed-with",
				"tags",
				"--recency-window",
				"60",
				"--no-open",
				"https://www.youtube.com/watch?v=abc&list=xyz",
			]);

			assert_eq!(None, parsed.subcommands);
			assert_eq!(Some(KindChoice::Audio128), parsed.download.kind);
			assert_eq!(Some(false), parsed.download.collection_choice());
			assert_eq!(EmbedWith::Tags, parsed.download.embed_with);
			assert_eq!(Duration::from_secs(60), parsed.download.recency_window());
			assert!(parsed.download.no_open);
			assert_eq!(
				Some("https://www.youtube.com/watch?v=abc&list=xyz".to_owned()),
				parsed.download.url
			);
		}

		#[test]
		fn test_playlist_conflict() {
			assert!(CliDerive::try_parse_from(["ytgrab", "--playlist", "--no-playlist"]).is_err());
		}
	}

	mod command_completions {
		use super::*;

		#[test]
		fn test_parse_subcommand() {
			let parsed = parse(&["completions", "--shell", "bash"]);

			assert_eq!(
				Some(SubCommands::Completions(CommandCompletions {
					shell:            Shell::Bash,
					output_file_path: None,
				})),
				parsed.subcommands
			);
		}
	}
}
