//! Module containing [`ProgressEvent`]

/// The phase a [`ProgressEvent`] reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
	/// Data is currently being transferred
	Downloading,
	/// The transfer of the current artifact has finished
	Finished,
	/// The transfer of the current artifact has failed
	Error,
}

impl ProgressPhase {
	/// Try to parse the status string the engine reports
	pub fn try_from_status(input: &str) -> Option<Self> {
		return match input.trim() {
			"downloading" => Some(Self::Downloading),
			"finished" => Some(Self::Finished),
			"error" => Some(Self::Error),
			_ => None,
		};
	}
}

/// A single progress report from the engine
/// All numeric values are optional, because the engine does not always know them (like for live streams)
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
	/// The phase this event reports
	pub phase:                ProgressPhase,
	/// The file name (not path) of the artifact currently in transfer
	pub artifact:             Option<String>,
	/// Bytes already transferred
	pub downloaded_bytes:     Option<u64>,
	/// Exact total bytes, if known
	pub total_bytes:          Option<u64>,
	/// Estimated total bytes, used when the exact total is unknown
	pub total_bytes_estimate: Option<u64>,
	/// Transfer rate in bytes per second
	pub speed:                Option<f64>,
	/// Estimated time remaining in seconds
	pub eta:                  Option<f64>,
}

impl ProgressEvent {
	/// Create a new event with only the phase set
	pub fn new(phase: ProgressPhase) -> Self {
		return Self {
			phase,
			artifact: None,
			downloaded_bytes: None,
			total_bytes: None,
			total_bytes_estimate: None,
			speed: None,
			eta: None,
		};
	}

	/// Builder function to add the artifact name
	#[must_use]
	pub fn with_artifact<A: Into<String>>(mut self, artifact: A) -> Self {
		self.artifact = Some(artifact.into());

		return self;
	}

	/// Builder function to add the downloaded bytes
	#[must_use]
	pub fn with_downloaded(mut self, downloaded: u64) -> Self {
		self.downloaded_bytes = Some(downloaded);

		return self;
	}

	/// Builder function to add the exact total bytes
	#[must_use]
	pub fn with_total(mut self, total: u64) -> Self {
		self.total_bytes = Some(total);

		return self;
	}

	/// Builder function to add the estimated total bytes
	#[must_use]
	pub fn with_total_estimate(mut self, total: u64) -> Self {
		self.total_bytes_estimate = Some(total);

		return self;
	}

	/// Builder function to add the speed
	#[must_use]
	pub fn with_speed(mut self, speed: f64) -> Self {
		self.speed = Some(speed);

		return self;
	}

	/// Builder function to add the eta
	#[must_use]
	pub fn with_eta(mut self, eta: f64) -> Self {
		self.eta = Some(eta);

		return self;
	}

	/// Get the total to calculate progress against, the exact total if known, otherwise the estimate
	/// A total of `0` is treated as unknown
	#[must_use]
	pub fn effective_total(&self) -> Option<u64> {
		return self
			.total_bytes
			.filter(|v| return *v > 0)
			.or(self.total_bytes_estimate.filter(|v| return *v > 0));
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_try_from_status() {
		assert_eq!(Some(ProgressPhase::Downloading), ProgressPhase::try_from_status("downloading"));
		assert_eq!(Some(ProgressPhase::Finished), ProgressPhase::try_from_status("finished"));
		assert_eq!(Some(ProgressPhase::Error), ProgressPhase::try_from_status(" error "));
		assert_eq!(None, ProgressPhase::try_from_status("NA"));
	}

	#[test]
	fn test_effective_total() {
		let exact = ProgressEvent::new(ProgressPhase::Downloading)
			.with_total(100)
			.with_total_estimate(50);
		assert_eq!(Some(100), exact.effective_total());

		let estimate = ProgressEvent::new(ProgressPhase::Downloading).with_total_estimate(50);
		assert_eq!(Some(50), estimate.effective_total());

		let zero = ProgressEvent::new(ProgressPhase::Downloading).with_total(0);
		assert_eq!(None, zero.effective_total());

		assert_eq!(None, ProgressEvent::new(ProgressPhase::Downloading).effective_total());
	}
}
