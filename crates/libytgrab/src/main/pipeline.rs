//! Module for running a single [`DownloadRequest`] from start to finish

use std::{
	path::{
		Path,
		PathBuf,
	},
	time::{
		Duration,
		SystemTime,
	},
};

use crate::{
	data::request::{
		DownloadRequest,
		MediaKind,
	},
	error::{
		IOErrorToError,
		Stage,
		StageIssue,
	},
	main::{
		cleanup::{
			DEFAULT_RECENCY_WINDOW,
			clean_sidecars,
		},
		destination::resolve_destinations,
		embed::{
			EmbeddingOutcome,
			ThumbnailEmbedder,
		},
		engine::{
			DownloadEngine,
			EngineRequest,
		},
		progress::{
			ProgressReporter,
			ProgressSink,
		},
		snapshot::{
			diff,
			has_extension,
			snapshot,
		},
	},
	spawn::multiplatform::FolderOpener,
};

/// How far back to look for files when a audio request did not produce anything new
pub const RECENT_FILES_WINDOW: Duration = Duration::from_secs(5 * 60);
/// Extensions considered by [`recently_modified`]
pub const RECENT_MEDIA_EXTENSIONS: [&str; 3] = ["mp3", "webm", "m4a"];

/// Settings for a [`Pipeline`]
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
	/// Base directory for the outputs, [`None`] to use the platform's media directories
	pub base_dir:       Option<PathBuf>,
	/// Maximal age of a sidecar image to still be removed
	pub recency_window: Duration,
	/// Open the destination directory after a successful run
	pub open_folder:    bool,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		return Self {
			base_dir:       None,
			recency_window: DEFAULT_RECENCY_WINDOW,
			open_folder:    true,
		};
	}
}

/// A single file the engine produced
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactReport {
	/// Path to the file
	pub path:      PathBuf,
	/// Size in bytes, if it could be read
	pub size:      Option<u64>,
	/// What happened with the cover, only for [`MediaKind::Audio`]
	pub embedding: Option<EmbeddingOutcome>,
}

/// The result of a successful [`Pipeline::run`]
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
	/// The kind of the request
	pub kind:             MediaKind,
	/// The directory the files were put into
	pub destination:      PathBuf,
	/// The newly produced files, sorted
	pub artifacts:        Vec<ArtifactReport>,
	/// Amount of sidecar images that have been removed
	pub removed_sidecars: usize,
	/// Files modified recently in the destination, only collected when a audio request produced nothing new
	pub recent_files:     Vec<PathBuf>,
	/// All non-fatal issues in the order they happened
	pub issues:           Vec<StageIssue>,
}

/// Sequences destination resolving, downloading, embedding, cleanup and opening the folder for a request
pub struct Pipeline<'a> {
	/// The engine to download with
	engine:   &'a dyn DownloadEngine,
	/// The embedder to ensure covers with
	embedder: &'a dyn ThumbnailEmbedder,
	/// The opener for the destination directory
	opener:   &'a dyn FolderOpener,
	/// Settings
	config:   PipelineConfig,
}

impl<'a> Pipeline<'a> {
	/// Create a new pipeline
	pub fn new(
		engine: &'a dyn DownloadEngine,
		embedder: &'a dyn ThumbnailEmbedder,
		opener: &'a dyn FolderOpener,
		config: PipelineConfig,
	) -> Self {
		return Self {
			engine,
			embedder,
			opener,
			config,
		};
	}

	/// Run `request` to completion
	///
	/// Returns a error only for fatal failures (destination not usable, engine failure), everything else is part of the report
	pub fn run<S: ProgressSink>(
		&self,
		request: &DownloadRequest,
		reporter: &mut ProgressReporter<S>,
	) -> Result<PipelineReport, crate::Error> {
		let kind = request.kind();
		let ext = kind.output_extension();

		let destinations = resolve_destinations(self.config.base_dir.as_deref()).inspect_err(|err| {
			error!("[{}] {}", Stage::Resolve, err);
		})?;
		let destination = destinations.for_kind(kind).to_owned();

		info!(
			"Downloading {} \"{}\" into \"{}\"",
			kind,
			request.url(),
			destination.display()
		);

		// without a baseline, any file would be considered new
		let before = snapshot(&destination, ext).inspect_err(|err| {
			error!("[{}] {}", Stage::Snapshot, err);
		})?;

		reporter.reset();
		let engine_request = EngineRequest::from_request(request, &destination);
		let invoke_res = self
			.engine
			.invoke(&engine_request, &mut |event| reporter.handle(&event));
		reporter.finish();

		invoke_res.inspect_err(|err| {
			error!("[{}] {}", Stage::Invoke, err);
		})?;

		let mut issues = Vec::new();

		let new_files = match snapshot(&destination, ext) {
			Ok(after) => diff(&before, &after),
			Err(err) => {
				issues.push(StageIssue::new(
					Stage::Snapshot,
					format!("Could not detect new files: {err}"),
				));
				Vec::new()
			},
		};

		let mut artifacts = Vec::with_capacity(new_files.len());
		for path in new_files {
			let size = std::fs::metadata(&path).ok().map(|v| return v.len());

			let embedding = if kind == MediaKind::Audio {
				let report = self.embedder.ensure_embedded(&path);
				issues.extend(report.issues);
				Some(report.outcome)
			} else {
				None
			};

			artifacts.push(ArtifactReport { path, size, embedding });
		}

		let mut recent_files = Vec::new();
		if kind == MediaKind::Audio && artifacts.is_empty() {
			recent_files = recently_modified(&destination, RECENT_FILES_WINDOW, SystemTime::now());
			warn!(
				"No new {} files found in \"{}\", {} recently modified files",
				ext,
				destination.display(),
				recent_files.len()
			);
		}

		let cleanup = clean_sidecars(
			artifacts
				.iter()
				.filter(|v| return v.embedding.is_some_and(|v| return v != EmbeddingOutcome::Failed))
				.map(|v| return v.path.as_path()),
			self.config.recency_window,
			SystemTime::now(),
		);
		issues.extend(cleanup.issues);

		if self.config.open_folder {
			if let Err(err) = self.opener.open(&destination) {
				issues.push(StageIssue::new(
					Stage::OpenFolder,
					format!("Could not open \"{}\": {err}", destination.display()),
				));
			}
		}

		return Ok(PipelineReport {
			kind,
			destination,
			artifacts,
			removed_sidecars: cleanup.removed.len(),
			recent_files,
			issues,
		});
	}
}

/// List all media files (see [`RECENT_MEDIA_EXTENSIONS`]) in `dir` which have been modified within `window` before `now`, sorted
/// Errors are only logged, this is for diagnostics
pub fn recently_modified(dir: &Path, window: Duration, now: SystemTime) -> Vec<PathBuf> {
	let entries = match std::fs::read_dir(dir).attach_path_err(dir) {
		Ok(v) => v,
		Err(err) => {
			debug!("Could not list recent files: {}", err);
			return Vec::new();
		},
	};

	let mut files: Vec<PathBuf> = entries
		.filter_map(|v| return v.ok())
		.filter(|entry| {
			let path = entry.path();
			return RECENT_MEDIA_EXTENSIONS.iter().any(|ext| return has_extension(&path, ext));
		})
		.filter(|entry| {
			return entry
				.metadata()
				.ok()
				.filter(|v| return v.is_file())
				.and_then(|v| return v.modified().ok())
				.is_some_and(|v| return now.duration_since(v).unwrap_or(Duration::ZERO) <= window);
		})
		.map(|v| return v.path())
		.collect();
	files.sort();

	return files;
}
