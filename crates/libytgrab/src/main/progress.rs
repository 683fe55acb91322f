//! Module for turning [`ProgressEvent`]s into a human readable progress display
//!
//! The rendering logic is a pure reducer ([`reduce`]), the output is applied through a [`ProgressSink`]

use std::{
	io::Write,
	time::{
		Duration,
		Instant,
	},
};

use crate::data::progress_event::{
	ProgressEvent,
	ProgressPhase,
};

/// Minimal time between two rendered "downloading" updates
pub const RENDER_INTERVAL: Duration = Duration::from_millis(200);
/// Width of the progress bar in characters
pub const BAR_WIDTH: usize = 30;
/// Character for the filled part of the bar
const BAR_FILLED: char = '█';
/// Character for the empty part of the bar
const BAR_EMPTY: char = '░';
/// Bytes in a MiB, which is displayed as "MB"
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// State of a single reporter, reset for each engine invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressState {
	/// When the last "downloading" update was rendered
	pub last_render:      Option<Instant>,
	/// The artifact name a header was last printed for
	pub current_artifact: Option<String>,
	/// Whether a partial (overwritable) line is currently displayed and needs to be finished
	pub partial_pending:  bool,
}

/// A single display operation
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
	/// Overwrite the current line with the text, without finishing it
	Partial(String),
	/// Print the text as a full line
	Line(String),
	/// Finish the currently pending partial line
	Break,
}

/// The display operations resulting from a single event, in order
pub type RenderAction = Vec<RenderOp>;

/// Reduce a event into the new state and what to display
///
/// Only "downloading" events are rate-limited to [RENDER_INTERVAL], suppressed events are dropped.
/// A change in artifact name, "finished" and "error" events are always rendered.
#[must_use]
pub fn reduce(mut state: ProgressState, event: &ProgressEvent, now: Instant) -> (ProgressState, Option<RenderAction>) {
	let mut ops = RenderAction::new();

	match event.phase {
		ProgressPhase::Downloading => {
			let mut artifact_changed = false;

			if let Some(artifact) = &event.artifact {
				if state.current_artifact.as_ref() != Some(artifact) {
					artifact_changed = true;
					if state.partial_pending {
						ops.push(RenderOp::Break);
						state.partial_pending = false;
					}
					ops.push(RenderOp::Line(format!("Downloading: {artifact}")));
					state.current_artifact = Some(artifact.clone());
				}
			}

			if !artifact_changed {
				if let Some(last) = state.last_render {
					if now.saturating_duration_since(last) < RENDER_INTERVAL {
						return (state, None);
					}
				}
			}

			ops.push(RenderOp::Partial(format_progress_line(event)));
			state.partial_pending = true;
			state.last_render = Some(now);
		},
		ProgressPhase::Finished => {
			if state.partial_pending {
				ops.push(RenderOp::Break);
				state.partial_pending = false;
			}

			let name = event.artifact.as_ref().or(state.current_artifact.as_ref());
			let size = event
				.total_bytes
				.filter(|v| return *v > 0)
				.or(event.downloaded_bytes.filter(|v| return *v > 0));

			let mut line = String::from("Finished:");
			if let Some(name) = name {
				line.push(' ');
				line.push_str(name);
			}
			if let Some(size) = size {
				line.push_str(&format!(" ({:.1}MB)", size as f64 / BYTES_PER_MB));
			}
			ops.push(RenderOp::Line(line));

			state.current_artifact = None;
			state.last_render = None;
		},
		ProgressPhase::Error => {
			if state.partial_pending {
				ops.push(RenderOp::Break);
				state.partial_pending = false;
			}

			ops.push(RenderOp::Line("Download error".to_owned()));

			state.current_artifact = None;
			state.last_render = None;
		},
	}

	return (state, Some(ops));
}

/// Calculate the percentage of `event`, [`None`] if the total is unknown
/// The result is clamped to `0.0..=100.0`
#[must_use]
pub fn percent(event: &ProgressEvent) -> Option<f64> {
	let total = event.effective_total()?;
	let downloaded = event.downloaded_bytes.unwrap_or(0);

	return Some((downloaded as f64 / total as f64 * 100.0).clamp(0.0, 100.0));
}

/// Format the text of a "downloading" line
fn format_progress_line(event: &ProgressEvent) -> String {
	let downloaded_mb = event.downloaded_bytes.unwrap_or(0) as f64 / BYTES_PER_MB;
	let speed = format_speed(event.speed);

	let (Some(percent), Some(total)) = (percent(event), event.effective_total()) else {
		return format!("Downloading... {downloaded_mb:6.1}MB | {speed}");
	};

	// truncation is wanted, a bar is only filled once the segment is fully reached
	let filled = ((BAR_WIDTH as f64 * percent / 100.0) as usize).min(BAR_WIDTH);
	let bar: String = std::iter::repeat_n(BAR_FILLED, filled)
		.chain(std::iter::repeat_n(BAR_EMPTY, BAR_WIDTH - filled))
		.collect();

	return format!(
		"[{bar}] {percent:5.1}% | {downloaded_mb:6.1}/{total_mb:6.1}MB | {speed} | {eta}",
		total_mb = total as f64 / BYTES_PER_MB,
		eta = format_eta(event.eta),
	);
}

/// Format the speed as "MB/s", or a placeholder if unknown
fn format_speed(speed: Option<f64>) -> String {
	return match speed.filter(|v| return v.is_finite() && *v > 0.0) {
		Some(speed) => format!("{:.1}MB/s", speed / BYTES_PER_MB),
		None => "--MB/s".to_owned(),
	};
}

/// Format the eta as "m:ss", or a placeholder if unknown
fn format_eta(eta: Option<f64>) -> String {
	return match eta.filter(|v| return v.is_finite() && *v >= 0.0) {
		Some(eta) => {
			let secs = eta as u64;
			format!("{}:{:02}", secs / 60, secs % 60)
		},
		None => "--:--".to_owned(),
	};
}

/// Capability to display [`RenderOp`]s
pub trait ProgressSink {
	/// Apply a single display operation
	fn apply(&mut self, op: &RenderOp);
}

/// [`ProgressSink`] that writes to any [`Write`], using "\r" to overwrite partial lines
#[derive(Debug)]
pub struct WriterSink<W: Write> {
	/// The writer to output to
	writer:       W,
	/// The character length of the last partial line, used to clear leftovers of a longer line
	last_partial: usize,
}

impl<W: Write> WriterSink<W> {
	/// Create a new sink for `writer`
	pub fn new(writer: W) -> Self {
		return Self {
			writer,
			last_partial: 0,
		};
	}

	/// Get the inner writer back
	pub fn into_inner(self) -> W {
		return self.writer;
	}

	/// Write a operation, the error is handled by [ProgressSink::apply]
	fn write_op(&mut self, op: &RenderOp) -> std::io::Result<()> {
		match op {
			RenderOp::Partial(text) => {
				let len = text.chars().count();
				let padding = self.last_partial.saturating_sub(len);
				write!(self.writer, "\r{}{}", text, " ".repeat(padding))?;
				self.last_partial = len;
			},
			RenderOp::Line(text) => {
				writeln!(self.writer, "{text}")?;
				self.last_partial = 0;
			},
			RenderOp::Break => {
				writeln!(self.writer)?;
				self.last_partial = 0;
			},
		}

		return self.writer.flush();
	}
}

impl<W: Write> ProgressSink for WriterSink<W> {
	fn apply(&mut self, op: &RenderOp) {
		// a broken progress display should never abort a download
		if let Err(err) = self.write_op(op) {
			debug!("Writing progress failed: {}", err);
		}
	}
}

/// Owns a [`ProgressState`] and a [`ProgressSink`], and feeds events through [`reduce`]
#[derive(Debug)]
pub struct ProgressReporter<S: ProgressSink> {
	/// The current state
	state: ProgressState,
	/// Where to display to
	sink:  S,
}

impl<S: ProgressSink> ProgressReporter<S> {
	/// Create a new reporter with a fresh state
	pub fn new(sink: S) -> Self {
		return Self {
			state: ProgressState::default(),
			sink,
		};
	}

	/// Finish a pending partial line and start with a fresh state
	pub fn reset(&mut self) {
		self.finish();
		self.state = ProgressState::default();
	}

	/// Finish a pending partial line, if any
	pub fn finish(&mut self) {
		if self.state.partial_pending {
			self.sink.apply(&RenderOp::Break);
			self.state.partial_pending = false;
		}
	}

	/// Handle a event with the current time
	pub fn handle(&mut self, event: &ProgressEvent) {
		self.handle_at(event, Instant::now());
	}

	/// Handle a event as if it happened at `now`
	pub fn handle_at(&mut self, event: &ProgressEvent, now: Instant) {
		let (state, action) = reduce(std::mem::take(&mut self.state), event, now);
		self.state = state;

		if let Some(action) = action {
			for op in &action {
				self.sink.apply(op);
			}
		}
	}

	/// Get the current state
	pub fn state(&self) -> &ProgressState {
		return &self.state;
	}

	/// Get a reference to the sink
	pub fn sink(&self) -> &S {
		return &self.sink;
	}

	/// Consume the reporter and get the sink back
	pub fn into_sink(self) -> S {
		return self.sink;
	}
}
