use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};

/// Ctrl-C, SIGTERM and SIGQUIT. Handlers are installed when this is built,
/// so none of them falls back to the default action afterwards.
pub struct Shutdown {
	interrupt: Signal,
	terminate: Signal,
	quit: Signal,
}

impl Shutdown {
	pub fn listen() -> io::Result<Self> {
		Ok(Self {
			interrupt: signal(SignalKind::interrupt())?,
			terminate: signal(SignalKind::terminate())?,
			quit: signal(SignalKind::quit())?,
		})
	}

	/// Completes on the first of the three signals.
	pub async fn recv(&mut self) {
		tokio::select! {
			_ = self.interrupt.recv() => {},
			_ = self.terminate.recv() => {},
			_ = self.quit.recv() => {},
		}
	}
}

/// SIGHUP stream used to request a rebuild swap.
pub fn reload() -> io::Result<Signal> {
	signal(SignalKind::hangup())
}
