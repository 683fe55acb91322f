//! Module containing [`DownloadRequest`]

/// The kind of media a request wants to end up with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
	/// Video with audio, merged into a "mp4"
	Video,
	/// Audio only, extracted into a "mp3" with a embedded cover
	Audio,
}

impl MediaKind {
	/// Get the extension of the files the engine produces for this kind
	#[must_use]
	pub fn output_extension(self) -> &'static str {
		return match self {
			Self::Video => "mp4",
			Self::Audio => "mp3",
		};
	}
}

impl std::fmt::Display for MediaKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		return match self {
			Self::Video => f.write_str("video"),
			Self::Audio => f.write_str("audio"),
		};
	}
}

/// Audio quality value that means "best available"
pub const AUDIO_QUALITY_BEST: &str = "0";

/// A single request to acquire media from a URL
/// Immutable once created
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
	/// The URL to download
	url:        String,
	/// What kind of media to produce
	kind:       MediaKind,
	/// The audio quality selector passed to the engine ("0" for best, or a bitrate like "128")
	/// Not used for [`MediaKind::Video`]
	quality:    String,
	/// Whether the URL should be processed as a collection (playlist) or only the single item
	collection: bool,
}

impl DownloadRequest {
	/// Create a new instance of [`DownloadRequest`]
	pub fn new<U, Q>(url: U, kind: MediaKind, quality: Q, collection: bool) -> Self
	where
		U: Into<String>,
		Q: Into<String>,
	{
		return Self {
			url: url.into(),
			kind,
			quality: quality.into(),
			collection,
		};
	}

	/// Create a new video request
	pub fn video<U: Into<String>>(url: U, collection: bool) -> Self {
		return Self::new(url, MediaKind::Video, AUDIO_QUALITY_BEST, collection);
	}

	/// Create a new audio request with the given quality
	pub fn audio<U: Into<String>, Q: Into<String>>(url: U, quality: Q, collection: bool) -> Self {
		return Self::new(url, MediaKind::Audio, quality, collection);
	}

	/// Get the URL
	#[must_use]
	pub fn url(&self) -> &str {
		return &self.url;
	}

	/// Get the media kind
	#[must_use]
	pub fn kind(&self) -> MediaKind {
		return self.kind;
	}

	/// Get the quality selector
	#[must_use]
	pub fn quality(&self) -> &str {
		return &self.quality;
	}

	/// Get whether the request is in collection mode
	#[must_use]
	pub fn collection(&self) -> bool {
		return self.collection;
	}
}
