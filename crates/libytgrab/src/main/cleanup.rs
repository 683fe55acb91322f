//! Module for removing leftover thumbnail images next to produced audio files

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
	error::{
		IOErrorToError,
		Stage,
		StageIssue,
	},
	main::embed::sidecar_paths,
};

/// Default maximal age of a sidecar image to still be removed
pub const DEFAULT_RECENCY_WINDOW: Duration = Duration::from_secs(600);

/// What [`clean_sidecars`] did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
	/// Sidecars that have been removed
	pub removed: Vec<PathBuf>,
	/// Sidecars that were left in place, because they are older than the window
	pub kept:    Vec<PathBuf>,
	/// Failures while inspecting or removing
	pub issues:  Vec<StageIssue>,
}

/// Remove all sidecar images of `artifacts` which have been modified within `window` before `now`
///
/// Only pass artifacts that carry a cover, a sidecar of a failed embed should be kept for a retry
/// Modification times in the future count as age 0
/// Errors are recorded in the report and never abort the cleanup
pub fn clean_sidecars<'a, I>(artifacts: I, window: Duration, now: SystemTime) -> CleanupReport
where
	I: IntoIterator<Item = &'a Path>,
{
	let mut report = CleanupReport::default();

	for artifact in artifacts {
		for sidecar in sidecar_paths(artifact) {
			if !sidecar.is_file() {
				continue;
			}

			let modified = match std::fs::metadata(&sidecar)
				.and_then(|v| return v.modified())
				.attach_path_err(&sidecar)
			{
				Ok(v) => v,
				Err(err) => {
					report.issues.push(StageIssue::new(
						Stage::Cleanup,
						format!("Could not get modification time: {err}"),
					));
					continue;
				},
			};

			let age = now.duration_since(modified).unwrap_or(Duration::ZERO);

			if age > window {
				debug!(
					"Keeping \"{}\", it is older than {:?} ({:?})",
					sidecar.display(),
					window,
					age
				);
				report.kept.push(sidecar);
				continue;
			}

			match std::fs::remove_file(&sidecar).attach_path_err(&sidecar) {
				Ok(()) => {
					trace!("Removed sidecar \"{}\"", sidecar.display());
					report.removed.push(sidecar);
				},
				Err(err) => report.issues.push(StageIssue::new(
					Stage::Cleanup,
					format!("Could not remove sidecar: {err}"),
				)),
			}
		}
	}

	return report;
}
