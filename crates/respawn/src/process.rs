use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Command;

use crate::types::{Exit, StopSignal};

/// Resolves once the launched child has exited.
pub type ExitFuture = Pin<Box<dyn Future<Output = Exit> + Send>>;

/// Signalling capability for one launched child.
///
/// Delivery is best effort: signalling a process that has already exited
/// must not panic, it may simply return an error.
pub trait ProcessHandle: Send + Sync {
	fn pid(&self) -> Option<u32>;
	fn signal(&self, signal: StopSignal) -> io::Result<()>;
}

/// A child that was started successfully.
pub struct Launched {
	pub handle: Box<dyn ProcessHandle>,
	pub exit: ExitFuture,
}

/// Starts children. The supervisor owns one launcher and calls it only from
/// its control loop.
pub trait Launcher: Send + 'static {
	fn launch(&mut self, program: &Path, args: &[String]) -> io::Result<Launched>;
}

/// Launches real OS processes, each in its own process group so teardown
/// also reaches anything the child spawned.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsLauncher;

impl Launcher for OsLauncher {
	fn launch(&mut self, program: &Path, args: &[String]) -> io::Result<Launched> {
		let mut cmd = Command::new(program);
		cmd.args(args).process_group(0);

		let mut child = cmd.spawn()?;
		let pid = child.id();
		let reaped = Arc::new(AtomicBool::new(false));

		let exit: ExitFuture = {
			let reaped = Arc::clone(&reaped);
			Box::pin(async move {
				let status = child.wait().await;
				reaped.store(true, Ordering::SeqCst);
				match status {
					Ok(status) => Exit::from(status),
					Err(e) => Exit::WaitFailed(e.to_string()),
				}
			})
		};

		Ok(Launched {
			handle: Box::new(OsProcess { pid, reaped }),
			exit,
		})
	}
}

struct OsProcess {
	pid: Option<u32>,
	// Set once the exit future has waited on the child. Its pid may be
	// reused after that, so it must not be signalled again.
	reaped: Arc<AtomicBool>,
}

impl ProcessHandle for OsProcess {
	fn pid(&self) -> Option<u32> {
		self.pid
	}

	fn signal(&self, signal: StopSignal) -> io::Result<()> {
		use nix::sys::signal::{killpg, Signal};
		use nix::unistd::Pid;

		let pid = self
			.pid
			.filter(|_| !self.reaped.load(Ordering::SeqCst))
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "process already reaped"))?;
		let sig = match signal {
			StopSignal::Interrupt => Signal::SIGINT,
			StopSignal::Kill => Signal::SIGKILL,
		};
		killpg(Pid::from_raw(pid as i32), sig)?;
		Ok(())
	}
}
