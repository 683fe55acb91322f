//! Module for the [`ThumbnailEmbedder`] that writes the cover directly into the tags (using lofty)

use std::{
	fs::File,
	io::BufReader,
	path::Path,
};

use lofty::{
	config::WriteOptions,
	file::{
		TaggedFile,
		TaggedFileExt,
	},
	picture::{
		Picture,
		PictureType,
	},
	probe::Probe,
	tag::{
		Accessor,
		Tag,
		TagExt,
	},
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
	utils::{
		display_name,
		free_tmp_sibling_path,
	},
};

/// Description set on embedded pictures
const PICTURE_DESCRIPTION: &str = "Cover";

/// Options used for all tag writes, ID3v2.3 is used to match what "ffmpeg" writes
fn write_options() -> WriteOptions {
	return WriteOptions::default().use_id3v23(true);
}

/// [`ThumbnailEmbedder`] that reads and writes the tags directly, without spawning any process
#[derive(Debug, Clone, Copy, Default)]
pub struct TagEmbedder {
	/// Remove the track number tag after a cover is confirmed
	strip_track_number: bool,
}

impl TagEmbedder {
	/// Create a new instance
	pub fn new(strip_track_number: bool) -> Self {
		return Self { strip_track_number };
	}
}

/// Read the tags of `path`
fn read_tagged(path: &Path) -> Result<TaggedFile, crate::Error> {
	return Ok(Probe::open(path)?.read()?);
}

/// Check whether any tag in `artifact` has a picture
pub fn has_cover(artifact: &Path) -> Result<bool, crate::Error> {
	let tagged_file = read_tagged(artifact)?;

	return Ok(tagged_file.tags().iter().any(|v| return v.picture_count() > 0));
}

/// Set `image` as the front cover of `artifact`, replacing a existing picture at the first position
/// The tags are written to a temporary copy first, which then replaces `artifact`
pub fn embed_picture(artifact: &Path, image: &Path) -> Result<(), crate::Error> {
	let tmp = free_tmp_sibling_path(artifact)?;

	info!("Embedding \"{}\" into \"{}\" with tags", image.display(), artifact.display());

	let res = write_picture(artifact, image, &tmp);

	if res.is_err() && tmp.exists() {
		if let Err(err) = std::fs::remove_file(&tmp) {
			warn!("Could not remove temporary file \"{}\": {}", tmp.display(), err);
		}
	}

	return res;
}

/// Write the picture into a copy at `tmp` and move it into place
fn write_picture(artifact: &Path, image: &Path, tmp: &Path) -> Result<(), crate::Error> {
	let mut tagged_file = read_tagged(artifact)?;

	// the picture always goes into the primary tag, other tag types (like ID3v1) may not be able to hold one
	if tagged_file.primary_tag().is_none() {
		let tag_type = tagged_file.primary_tag_type();
		debug!("\"{}\" has no primary tag, creating {:?}", artifact.display(), tag_type);
		tagged_file.insert_tag(Tag::new(tag_type));
	}

	let tag = tagged_file
		.primary_tag_mut()
		.ok_or_else(|| return crate::Error::other(format!("No primary tag in file \"{}\"", artifact.display())))?;

	let mut reader = BufReader::new(File::open(image).attach_path_err(image)?);
	let mut picture = Picture::from_reader(&mut reader)?;
	picture.set_pic_type(PictureType::CoverFront);
	picture.set_description(Some(PICTURE_DESCRIPTION.into()));
	// set picture instead of push to only have one image
	tag.set_picture(0, picture);

	// lofty only changes the tags of a existing file, so the copy has to exist first
	std::fs::copy(artifact, tmp).attach_path_err(tmp)?;
	tag.save_to_path(tmp, write_options())?;

	std::fs::rename(tmp, artifact).attach_path_err(tmp)?;

	return Ok(());
}

/// Remove the track number from the primary tag of `artifact`
/// Returns `true` if there was a track number to remove
pub fn strip_track_number(artifact: &Path) -> Result<bool, crate::Error> {
	let mut tagged_file = read_tagged(artifact)?;

	let Some(tag) = tagged_file.primary_tag_mut() else {
		return Ok(false);
	};

	if tag.track().is_none() {
		return Ok(false);
	}

	tag.remove_track();
	tag.save_to_path(artifact, write_options())?;

	return Ok(true);
}

impl ThumbnailEmbedder for TagEmbedder {
	fn ensure_embedded(&self, artifact: &Path) -> EmbeddingReport {
		let name = display_name(artifact);
		let mut issues = Vec::new();

		let outcome = match has_cover(artifact) {
			Ok(true) => {
				debug!("\"{}\" already has a embedded cover", name);
				EmbeddingOutcome::AlreadyEmbedded
			},
			res => {
				if let Err(err) = res {
					issues.push(StageIssue::new(
						Stage::Verify,
						format!("Could not verify the cover of \"{name}\": {err}"),
					));
				}

				self.embed_candidate(artifact, &name, &mut issues)
			},
		};

		if self.strip_track_number && outcome != EmbeddingOutcome::Failed {
			match strip_track_number(artifact) {
				Ok(true) => debug!("Removed track number from \"{}\"", name),
				Ok(false) => (),
				Err(err) => issues.push(StageIssue::new(
					Stage::EmbedPrimary,
					format!("Could not remove the track number of \"{name}\": {err}"),
				)),
			}
		}

		return EmbeddingReport::new(outcome).with_issues(issues);
	}
}

impl TagEmbedder {
	/// Embed the sidecar image of `artifact`, if one exists
	fn embed_candidate(&self, artifact: &Path, name: &str, issues: &mut Vec<StageIssue>) -> EmbeddingOutcome {
		let Some(candidate) = find_candidate(artifact) else {
			issues.push(StageIssue::new(
				Stage::EmbedPrimary,
				format!("No thumbnail image found for \"{name}\""),
			));
			return EmbeddingOutcome::Failed;
		};

		if let Err(err) = embed_picture(artifact, &candidate) {
			issues.push(StageIssue::new(
				Stage::EmbedPrimary,
				format!("Could not embed the cover of \"{name}\": {err}"),
			));
			return EmbeddingOutcome::Failed;
		}

		// only remove the image once the cover can actually be read back
		match has_cover(artifact) {
			Ok(true) => (),
			Ok(false) => {
				issues.push(StageIssue::new(
					Stage::EmbedPrimary,
					format!("The cover of \"{name}\" was written, but could not be found afterwards"),
				));
				return EmbeddingOutcome::Failed;
			},
			Err(err) => {
				issues.push(StageIssue::new(
					Stage::Verify,
					format!("Could not verify the written cover of \"{name}\": {err}"),
				));
				return EmbeddingOutcome::Failed;
			},
		}

		remove_candidate(&candidate, issues);

		return EmbeddingOutcome::EmbeddedNow;
	}
}
