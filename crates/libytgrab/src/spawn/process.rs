//! Module for running external processes with a bounded runtime

use std::{
	ffi::{
		OsStr,
		OsString,
	},
	io::Read,
	process::Stdio,
	time::{
		Duration,
		Instant,
	},
};

use crate::error::{
	CustomThreadJoin,
	IOErrorToError,
};

/// Time to sleep between checking if the child has exited
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The collected result of a finished process
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessOutput {
	/// The exit code, [`None`] if the process was terminated by a signal
	pub code:   Option<i32>,
	/// Everything the process wrote to STDOUT
	pub stdout: Vec<u8>,
	/// Everything the process wrote to STDERR
	pub stderr: Vec<u8>,
}

impl ProcessOutput {
	/// Create a new output with just a exit code
	pub fn with_code(code: i32) -> Self {
		return Self {
			code: Some(code),
			..Default::default()
		};
	}

	/// Get whether the process exited successfully
	#[must_use]
	pub fn success(&self) -> bool {
		return self.code == Some(0);
	}

	/// Get the last `count` lines of STDERR, in original order
	#[must_use]
	pub fn last_stderr_lines(&self, count: usize) -> String {
		let stderr = String::from_utf8_lossy(&self.stderr);
		let mut lines: Vec<&str> = stderr.lines().rev().take(count).collect();
		lines.reverse();

		return lines.join("\n");
	}
}

/// Capability to run a external command to completion, bounded by a timeout
///
/// Implementations must not block longer than `timeout` (plus a small grace period) and return a [`crate::error::ErrorInner::Timeout`] in that case
pub trait ProcessRunner {
	/// Run `program` with `args` and collect its output
	fn run(&self, program: &OsStr, args: &[OsString], timeout: Duration) -> Result<ProcessOutput, crate::Error>;
}

/// [`ProcessRunner`] that spawns actual processes on the system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
	fn run(&self, program: &OsStr, args: &[OsString], timeout: Duration) -> Result<ProcessOutput, crate::Error> {
		let name = program.to_string_lossy().to_string();
		debug!("Spawning \"{}\" with timeout {:?}", name, timeout);
		trace!("Arguments for \"{}\": {:?}", name, args);

		let mut child = super::multiplatform::spawn_command(program)
			.args(args)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.attach_location_err(format!("{name} spawn"))?;

		let mut stdout = child.stdout.take().ok_or_else(|| {
			return crate::Error::custom_ioerror_location(
				std::io::ErrorKind::BrokenPipe,
				"Failed to get Child STDOUT",
				format!("{name} stdout take"),
			);
		})?;
		let mut stderr = child.stderr.take().ok_or_else(|| {
			return crate::Error::custom_ioerror_location(
				std::io::ErrorKind::BrokenPipe,
				"Failed to get Child STDERR",
				format!("{name} stderr take"),
			);
		})?;

		// both pipes have to be drained while waiting, otherwise a chatty process could block on a full pipe
		let stdout_thread = std::thread::Builder::new()
			.name(format!("{name} stdout handler"))
			.spawn(move || {
				let mut buf = Vec::new();
				if let Err(err) = stdout.read_to_end(&mut buf) {
					debug!("Reading STDOUT failed: {}", err);
				}
				return buf;
			})
			.attach_location_err(format!("{name} stdout thread spawn"))?;
		let stderr_thread = std::thread::Builder::new()
			.name(format!("{name} stderr handler"))
			.spawn(move || {
				let mut buf = Vec::new();
				if let Err(err) = stderr.read_to_end(&mut buf) {
					debug!("Reading STDERR failed: {}", err);
				}
				return buf;
			})
			.attach_location_err(format!("{name} stderr thread spawn"))?;

		let deadline = Instant::now() + timeout;

		let status = loop {
			if let Some(status) = child.try_wait().attach_location_err(format!("{name} try_wait"))? {
				break status;
			}

			if Instant::now() >= deadline {
				warn!("\"{}\" did not exit within {:?}, killing it", name, timeout);

				if let Err(err) = child.kill() {
					debug!("Killing \"{}\" failed: {}", name, err);
				}
				// reap the child, the reader threads are left to finish on their own once the pipes close
				if let Err(err) = child.wait() {
					debug!("Waiting for killed \"{}\" failed: {}", name, err);
				}

				return Err(crate::Error::timeout(name, timeout));
			}

			std::thread::sleep(POLL_INTERVAL);
		};

		let stdout = stdout_thread.join_err()?;
		let stderr = stderr_thread.join_err()?;

		return Ok(ProcessOutput {
			code: status.code(),
			stdout,
			stderr,
		});
	}
}

/// Test helpers for faking external processes
#[cfg(test)]
pub(crate) mod test_utils {
	use std::cell::RefCell;

	use super::*;

	/// Type of the recorded calls of [FnRunner]
	pub type RecordedCalls = RefCell<Vec<(OsString, Vec<OsString>)>>;

	/// [`ProcessRunner`] that records every call and answers with `handler`
	pub struct FnRunner<F> {
		/// Function to produce the output for a call
		handler:   F,
		/// All calls in order
		pub calls: RecordedCalls,
	}

	impl<F> FnRunner<F>
	where
		F: Fn(&OsStr, &[OsString], Duration) -> Result<ProcessOutput, crate::Error>,
	{
		/// Create a new runner with the handler
		pub fn new(handler: F) -> Self {
			return Self {
				handler,
				calls: RefCell::new(Vec::new()),
			};
		}

		/// Get the program names of all calls in order
		pub fn programs(&self) -> Vec<String> {
			return self
				.calls
				.borrow()
				.iter()
				.map(|(program, _)| return program.to_string_lossy().to_string())
				.collect();
		}
	}

	impl<F> ProcessRunner for FnRunner<F>
	where
		F: Fn(&OsStr, &[OsString], Duration) -> Result<ProcessOutput, crate::Error>,
	{
		fn run(&self, program: &OsStr, args: &[OsString], timeout: Duration) -> Result<ProcessOutput, crate::Error> {
			self.calls.borrow_mut().push((program.to_os_string(), args.to_vec()));

			return (self.handler)(program, args, timeout);
		}
	}

	/// Create a successful "ffprobe" output, with or without a attached picture stream
	pub fn probe_output(has_cover: bool) -> ProcessOutput {
		let cover_stream = if has_cover {
			r#",{ "index": 1, "codec_name": "mjpeg", "codec_type": "video", "disposition": { "attached_pic": 1 } }"#
		} else {
			""
		};

		return ProcessOutput {
			code:   Some(0),
			stdout: format!(
				r#"{{ "streams": [{{ "index": 0, "codec_name": "mp3", "codec_type": "audio", "disposition": {{ "attached_pic": 0 }} }}{cover_stream}] }}"#
			)
			.into_bytes(),
			stderr: Vec::new(),
		};
	}
}
