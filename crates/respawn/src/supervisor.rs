use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::config::RunnerConfig;
use crate::output;
use crate::process::{ExitFuture, Launched, Launcher, OsLauncher, ProcessHandle};
use crate::types::*;

const EVENT_CAPACITY: usize = 256;

enum Request {
	Start(PathBuf),
	Teardown,
	Exited { generation: u64, exit: Exit },
	Current(oneshot::Sender<Option<ChildInfo>>),
	Close,
}

/// Handle to the control loop. Cheap to clone; every clone drives the same
/// loop. Dropping the last handle tears down the current child and ends the
/// loop, same as [`Supervisor::close`].
#[derive(Clone)]
pub struct Supervisor {
	requests: mpsc::UnboundedSender<Request>,
	closed: Arc<AtomicBool>,
	done: watch::Receiver<bool>,
	events: broadcast::Sender<Event>,
}

impl Supervisor {
	/// Spawns the control loop onto the current tokio runtime.
	pub fn new(config: RunnerConfig) -> Self {
		Self::with_launcher(config, OsLauncher)
	}

	pub fn with_launcher<L: Launcher>(config: RunnerConfig, launcher: L) -> Self {
		let (requests, rx) = mpsc::unbounded_channel();
		let (done_tx, done) = watch::channel(false);
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		let closed = Arc::new(AtomicBool::new(false));

		let control = ControlLoop {
			config,
			launcher,
			requests: rx,
			reports: requests.downgrade(),
			closed: Arc::clone(&closed),
			events: events.clone(),
			current: None,
			next_generation: 1,
			stopping: None,
			parked: VecDeque::new(),
		};

		tokio::spawn(async move {
			control.run().await;
			done_tx.send_replace(true);
		});

		Self {
			requests,
			closed,
			done,
			events,
		}
	}

	/// Queue `artifact` to replace whatever is running. Returns immediately.
	pub fn submit(&self, artifact: impl Into<PathBuf>) {
		let artifact = artifact.into();
		if self.is_closed() {
			tracing::warn!("supervisor closed, not running {}", artifact.display());
			return;
		}
		self.send(Request::Start(artifact));
	}

	/// Tear down the current child, then submit `artifact`.
	pub fn restart(&self, artifact: impl Into<PathBuf>) {
		let artifact = artifact.into();
		if self.is_closed() {
			tracing::warn!("supervisor closed, not restarting with {}", artifact.display());
			return;
		}
		self.send(Request::Teardown);
		self.send(Request::Start(artifact));
	}

	/// Stop accepting submissions and tear down the current child. Only the
	/// first call has any effect.
	pub fn close(&self) {
		if self.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		self.send(Request::Close);
	}

	/// Resolves once the control loop has finished shutting down.
	pub async fn wait(&self) {
		let mut done = self.done.clone();
		let _ = done.wait_for(|done| *done).await;
	}

	pub async fn current(&self) -> Option<ChildInfo> {
		let (tx, rx) = oneshot::channel();
		if self.requests.send(Request::Current(tx)).is_err() {
			return None;
		}
		rx.await.ok().flatten()
	}

	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		self.events.subscribe()
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	fn send(&self, request: Request) {
		if self.requests.send(request).is_err() {
			tracing::debug!("control loop already stopped");
		}
	}
}

struct Current {
	generation: u64,
	program: PathBuf,
	handle: Box<dyn ProcessHandle>,
}

impl Current {
	fn info(&self) -> ChildInfo {
		ChildInfo {
			generation: self.generation,
			pid: self.handle.pid(),
			program: self.program.clone(),
		}
	}
}

struct ControlLoop<L> {
	config: RunnerConfig,
	launcher: L,
	requests: mpsc::UnboundedReceiver<Request>,
	// Weak so that watchers alone never keep the loop alive.
	reports: mpsc::WeakUnboundedSender<Request>,
	closed: Arc<AtomicBool>,
	events: broadcast::Sender<Event>,
	current: Option<Current>,
	next_generation: u64,
	// await-exit only: generation whose exit gates the parked launches.
	stopping: Option<u64>,
	parked: VecDeque<PathBuf>,
}

impl<L: Launcher> ControlLoop<L> {
	async fn run(mut self) {
		while let Some(request) = self.requests.recv().await {
			match request {
				Request::Start(artifact) => self.start(artifact),
				Request::Teardown => self.teardown(),
				Request::Exited { generation, exit } => self.exited(generation, exit),
				Request::Current(reply) => {
					let _ = reply.send(self.current.as_ref().map(Current::info));
				}
				Request::Close => break,
			}
		}

		self.teardown();
		if !self.parked.is_empty() {
			tracing::debug!("dropping {} parked launch(es)", self.parked.len());
			self.parked.clear();
		}
		tracing::info!("supervisor closed");
		self.publish(Event::Closed);
	}

	fn start(&mut self, artifact: PathBuf) {
		if self.closed.load(Ordering::SeqCst) {
			tracing::debug!("supervisor closed, skipping {}", artifact.display());
			return;
		}
		if self.stopping.is_some() {
			self.parked.push_back(artifact);
			return;
		}

		self.teardown();
		if self.stopping.is_some() {
			// Oldest pending request, so it goes ahead of anything parked later.
			self.parked.push_front(artifact);
			return;
		}

		self.launch(artifact);
	}

	fn launch(&mut self, artifact: PathBuf) {
		output::running(&self.config.display_name(&artifact));

		let Launched { handle, exit } = match self.launcher.launch(&artifact, &self.config.args) {
			Ok(launched) => launched,
			Err(e) => {
				tracing::error!("could not run {}: {}", artifact.display(), e);
				self.publish(Event::LaunchFailed {
					program: artifact,
					error: e.to_string(),
				});
				return;
			}
		};

		let generation = self.next_generation;
		self.next_generation += 1;
		let pid = handle.pid();
		tracing::info!(
			"started {} (pid {}, generation {})",
			artifact.display(),
			pid.map(|p| p.to_string()).unwrap_or_else(|| "?".into()),
			generation
		);

		if !self.config.keep_artifact {
			consume(&artifact);
		}

		self.publish(Event::Launched {
			generation,
			pid,
			program: artifact.clone(),
		});
		self.current = Some(Current {
			generation,
			program: artifact,
			handle,
		});
		self.watch(generation, exit);
	}

	fn watch(&self, generation: u64, exit: ExitFuture) {
		let reports = self.reports.clone();
		tokio::spawn(async move {
			let exit = exit.await;
			if let Some(reports) = reports.upgrade() {
				let _ = reports.send(Request::Exited { generation, exit });
			}
		});
	}

	fn teardown(&mut self) {
		let Some(current) = self.current.take() else {
			return;
		};

		let signal = self.config.stop_signal;
		if signal == StopSignal::Interrupt {
			tracing::info!("sending interrupt signal...");
		}
		tracing::debug!(
			"sending {} to {} (generation {})",
			signal,
			current.program.display(),
			current.generation
		);
		if let Err(e) = current.handle.signal(signal) {
			tracing::debug!(
				"could not signal {} (generation {}): {}",
				current.program.display(),
				current.generation,
				e
			);
		}
		self.publish(Event::Signalled {
			generation: current.generation,
			signal,
		});

		if self.config.await_exit {
			self.stopping = Some(current.generation);
		}
	}

	fn exited(&mut self, generation: u64, exit: Exit) {
		let is_current = self
			.current
			.as_ref()
			.is_some_and(|c| c.generation == generation);
		if is_current {
			self.current = None;
		}

		if exit.success() {
			tracing::info!("process exited (generation {})", generation);
		} else if is_current {
			tracing::warn!("process interrupted: {} (generation {})", exit, generation);
		} else {
			tracing::info!("replaced process stopped: {} (generation {})", exit, generation);
		}
		self.publish(Event::Exited {
			generation,
			exit,
			superseded: !is_current,
		});

		if self.stopping == Some(generation) {
			self.stopping = None;
			self.release_parked();
		}
	}

	fn release_parked(&mut self) {
		while self.stopping.is_none() {
			let Some(artifact) = self.parked.pop_front() else {
				break;
			};
			self.start(artifact);
		}
	}

	fn publish(&self, event: Event) {
		let _ = self.events.send(event);
	}
}

fn consume(artifact: &Path) {
	if let Err(e) = std::fs::remove_file(artifact) {
		tracing::warn!("could not remove {}: {}", artifact.display(), e);
	}
}
