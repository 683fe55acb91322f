use crate::{
	clap_conf::{
		CliDerive,
		CommandDownload,
		EmbedWith,
		KindChoice,
	},
	utils,
};
use colored::{
	Color,
	Colorize,
};
use indicatif::{
	ProgressBar,
	ProgressStyle,
};
use libytgrab::{
	data::request::{
		AUDIO_QUALITY_BEST,
		DownloadRequest,
		MediaKind,
	},
	main::{
		destination::resolve_destinations,
		embed::{
			EmbeddingOutcome,
			TagEmbedder,
			ThumbnailEmbedder,
			TranscodeEmbedder,
		},
		engine::YtdlEngine,
		pipeline::{
			Pipeline,
			PipelineConfig,
			PipelineReport,
			RECENT_FILES_WINDOW,
			recently_modified,
		},
		progress::{
			ProgressReporter,
			WriterSink,
		},
	},
	spawn::{
		multiplatform::SystemFolderOpener,
		process::SystemRunner,
	},
	utils::display_name,
};
use std::{
	sync::LazyLock,
	time::{
		Duration,
		SystemTime,
	},
};

/// Audio quality for [`KindChoice::Audio128`]
const AUDIO_QUALITY_128: &str = "128";
/// Bytes in a MiB, which is displayed as "MB"
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Handler function for the "download" (default) command
/// This function is mainly to keep the code structured and sorted
#[inline]
pub fn command_download(main_args: &CliDerive, sub_args: &CommandDownload) -> Result<(), crate::Error> {
	let ytdl_version = utils::require_tools_installed()?;
	debug!("Using yt-dlp version {}", ytdl_version);

	let interactive = main_args.is_interactive();

	let url = match &sub_args.url {
		Some(v) => v.clone(),
		None if interactive => utils::ask_url()?,
		None => return Err(crate::Error::other("A URL is required when not running interactively")),
	};

	if !utils::is_supported_url(&url) {
		println!("{} Not a supported YouTube URL: \"{}\"", "ERROR".color(Color::Red), url);
		return Ok(());
	}

	let destinations = resolve_destinations(sub_args.output_path.as_deref())?;
	println!("Videos: {}", destinations.video.display());
	println!("Music:  {}", destinations.audio.display());

	let kind = match sub_args.kind {
		Some(v) => v,
		None if interactive => utils::ask_kind()?,
		None => return Err(crate::Error::other("\"--kind\" is required when not running interactively")),
	};

	let collection = match sub_args.collection_choice() {
		Some(v) => v,
		None if interactive && utils::is_collection_url(&url) => utils::ask_collection()?,
		None => false,
	};

	if utils::is_collection_url(&url) {
		if collection {
			println!("Downloading the whole playlist");
		} else {
			println!("Downloading only the first media");
		}
	}

	let request = match kind {
		KindChoice::Video => DownloadRequest::video(&url, collection),
		KindChoice::Audio => DownloadRequest::audio(&url, AUDIO_QUALITY_BEST, collection),
		KindChoice::Audio128 => DownloadRequest::audio(&url, AUDIO_QUALITY_128, collection),
	};

	let engine = YtdlEngine::new(sub_args.engine_log);
	let opener = SystemFolderOpener;
	let embedder: Box<dyn ThumbnailEmbedder> = match sub_args.embed_with {
		EmbedWith::Ffmpeg => Box::new(TranscodeEmbedder::new(SystemRunner)),
		EmbedWith::Tags => Box::new(TagEmbedder::new(sub_args.strip_track_number)),
	};
	let config = PipelineConfig {
		base_dir:       sub_args.output_path.clone(),
		recency_window: sub_args.recency_window(),
		open_folder:    !sub_args.no_open,
	};
	let pipeline = Pipeline::new(&engine, embedder.as_ref(), &opener, config);

	let res = if interactive {
		/// ProgressBar Style for download, will look like `⠁ CustomMsg`
		static DOWNLOAD_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
			return ProgressStyle::default_spinner()
				.template("{spinner:.cyan} {msg}")
				.expect("Expected ProgressStyle template to be valid");
		});

		let pgbar = ProgressBar::new_spinner().with_style(DOWNLOAD_STYLE.clone());
		utils::set_progressbar(&pgbar, main_args);
		pgbar.enable_steady_tick(Duration::from_millis(100));
		let mut reporter = ProgressReporter::new(utils::IndicatifSink::new(pgbar));

		let res = pipeline.run(&request, &mut reporter);
		reporter.sink().finish();

		res
	} else {
		let mut reporter = ProgressReporter::new(WriterSink::new(std::io::stdout()));

		pipeline.run(&request, &mut reporter)
	};

	match res {
		Ok(report) => print_report(&report),
		Err(err) => {
			// a failed download is reported, but not treated as a failure of the binary
			println!("{} Download failed: {}", "ERROR".color(Color::Red), err);

			let destination = destinations.for_kind(request.kind());
			print_recent_files(&recently_modified(destination, RECENT_FILES_WINDOW, SystemTime::now()));
		},
	}

	return Ok(());
}

/// Print the per-artifact notices of a successful run
fn print_report(report: &PipelineReport) {
	for artifact in &report.artifacts {
		let name = display_name(&artifact.path);

		match artifact.size {
			Some(size) => println!("Saved: {} ({:.1}MB)", name, size as f64 / BYTES_PER_MB),
			None => println!("Saved: {name}"),
		}

		match artifact.embedding {
			Some(EmbeddingOutcome::AlreadyEmbedded) => println!("  Thumbnail already embedded"),
			Some(EmbeddingOutcome::EmbeddedNow) => println!("  Thumbnail embedded"),
			Some(EmbeddingOutcome::Failed) => {
				println!("  {} Thumbnail could not be embedded", "WARN".color(Color::Yellow));
			},
			None => (),
		}
	}

	if report.kind == MediaKind::Audio && report.artifacts.is_empty() {
		println!(
			"{} No new {} file found in \"{}\"",
			"WARN".color(Color::Yellow),
			report.kind.output_extension(),
			report.destination.display()
		);
		print_recent_files(&report.recent_files);
	}

	if !report.issues.is_empty() {
		info!("Finished with {} non-fatal issues", report.issues.len());
	}

	if report.removed_sidecars > 0 {
		debug!("Removed {} thumbnail images", report.removed_sidecars);
	}

	println!("Done, files are in \"{}\"", report.destination.display());
}

/// Print the list of recently modified files, if any
fn print_recent_files(files: &[std::path::PathBuf]) {
	if files.is_empty() {
		return;
	}

	println!("Recently modified files:");
	for file in files {
		let size = std::fs::metadata(file).map(|v| return v.len()).unwrap_or(0);
		println!("  {} ({:.1}KB)", display_name(file), size as f64 / 1024.0);
	}
}
