use std::{
	ffi::OsStr,
	path::Path,
	process::{
		Command,
		Stdio,
	},
};

use crate::error::IOErrorToError;

/// Create a [Command] for `binary_name`
/// On windows, rust automatically adds a extension (".exe") if none is specified and searches all the paths
#[inline]
pub fn spawn_command<B: AsRef<OsStr>>(binary_name: B) -> Command {
	return Command::new(binary_name);
}

/// Capability to show a directory to the user
pub trait FolderOpener {
	/// Open `dir` in the platform's file browser
	fn open(&self, dir: &Path) -> Result<(), crate::Error>;
}

/// [`FolderOpener`] that uses the platform's default file browser
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFolderOpener;

/// Binary used to open a directory in the file browser
#[cfg(target_os = "windows")]
const OPEN_BIN_NAME: &str = "explorer";
/// Binary used to open a directory in the file browser
#[cfg(target_os = "macos")]
const OPEN_BIN_NAME: &str = "open";
/// Binary used to open a directory in the file browser
#[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
const OPEN_BIN_NAME: &str = "xdg-open";

impl FolderOpener for SystemFolderOpener {
	fn open(&self, dir: &Path) -> Result<(), crate::Error> {
		debug!("Opening \"{}\" with \"{}\"", dir.display(), OPEN_BIN_NAME);

		let status = spawn_command(OPEN_BIN_NAME)
			.arg(dir)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.status()
			.attach_location_err(format!("{OPEN_BIN_NAME} spawn"))?;

		// "explorer" exits with 1 even when the window was opened
		if !status.success() && !cfg!(target_os = "windows") {
			return Err(crate::Error::command_unsuccessful(format!(
				"{} exited with code {}",
				OPEN_BIN_NAME,
				status.code().map_or("None".into(), |v| return v.to_string())
			)));
		}

		return Ok(());
	}
}
