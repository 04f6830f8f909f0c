use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

/// How the current child is asked to stop when it is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopSignal {
	/// SIGINT to the child's process group. A request, not a guarantee.
	Interrupt,
	/// SIGKILL to the child's process group.
	#[default]
	Kill,
}

impl StopSignal {
	pub fn from_interrupt(interrupt: bool) -> Self {
		if interrupt {
			StopSignal::Interrupt
		} else {
			StopSignal::Kill
		}
	}
}

impl fmt::Display for StopSignal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StopSignal::Interrupt => f.write_str("interrupt"),
			StopSignal::Kill => f.write_str("kill"),
		}
	}
}

/// Why a child stopped running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
	Code(i32),
	Signal(i32),
	/// Waiting on the child failed; the process state is unknown.
	WaitFailed(String),
}

impl Exit {
	pub fn success(&self) -> bool {
		matches!(self, Exit::Code(0))
	}
}

impl From<ExitStatus> for Exit {
	fn from(status: ExitStatus) -> Self {
		use std::os::unix::process::ExitStatusExt;
		match (status.code(), status.signal()) {
			(Some(code), _) => Exit::Code(code),
			(None, Some(sig)) => Exit::Signal(sig),
			(None, None) => Exit::WaitFailed(format!("unrecognized exit status {:?}", status)),
		}
	}
}

impl fmt::Display for Exit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Exit::Code(code) => write!(f, "exit status {}", code),
			Exit::Signal(sig) => write!(f, "signal {}", sig),
			Exit::WaitFailed(e) => write!(f, "wait failed: {}", e),
		}
	}
}

/// Snapshot of the child the supervisor currently owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildInfo {
	pub generation: u64,
	pub pid: Option<u32>,
	pub program: PathBuf,
}

/// State transitions published by the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	Launched {
		generation: u64,
		pid: Option<u32>,
		program: PathBuf,
	},
	LaunchFailed {
		program: PathBuf,
		error: String,
	},
	Signalled {
		generation: u64,
		signal: StopSignal,
	},
	Exited {
		generation: u64,
		exit: Exit,
		/// The child had already been replaced or torn down when it exited.
		superseded: bool,
	},
	Closed,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_stop_signal_display() {
		assert_eq!(StopSignal::from_interrupt(true).to_string(), "interrupt");
		assert_eq!(StopSignal::from_interrupt(false).to_string(), "kill");
		assert_eq!(StopSignal::default(), StopSignal::Kill);
	}

	#[test]
	fn test_exit_display() {
		assert_eq!(Exit::Code(1).to_string(), "exit status 1");
		assert_eq!(Exit::Signal(9).to_string(), "signal 9");
		assert!(Exit::Code(0).success());
		assert!(!Exit::Signal(2).success());
	}
}
