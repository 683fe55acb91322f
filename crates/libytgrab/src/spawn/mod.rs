//! Module for everything that spawns external processes

use std::ffi::OsString;

pub mod ffmpeg;
pub mod multiplatform;
pub mod process;
pub mod ytdl;

/// Helper for easily adding various types that resolve to [`OsString`] and output a [`Vec<OsString>`]
/// exists because [std::process::Command] is too overkill to use for a argument collection that is handed to a [`process::ProcessRunner`] or [duct]
#[derive(Debug, Default)]
pub(crate) struct ArgsHelper(Vec<OsString>);

impl ArgsHelper {
	/// Create a new instance of ArgsHelper
	pub fn new() -> Self {
		return Self(Vec::default());
	}

	/// Add a new Argument to the list, added at the end and converted to a [`OsString`]
	/// Returns the input reference to "self" for chaining
	pub fn arg<U>(&mut self, arg: U) -> &mut Self
	where
		U: Into<OsString>,
	{
		self.0.push(arg.into());

		return self;
	}

	/// Add multiple Arguments to the list
	pub fn args<I, U>(&mut self, args: I) -> &mut Self
	where
		I: IntoIterator<Item = U>,
		U: Into<OsString>,
	{
		for arg in args {
			self.0.push(arg.into());
		}

		return self;
	}

	/// Convert Self to the inner value
	/// Consumes self
	pub fn into_inner(self) -> Vec<OsString> {
		return self.0;
	}
}

impl From<ArgsHelper> for Vec<OsString> {
	fn from(v: ArgsHelper) -> Self {
		return v.into_inner();
	}
}
