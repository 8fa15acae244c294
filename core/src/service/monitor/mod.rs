//! Monitoring-service lifecycle and observer orchestration
//!
//! The engine owns one dedicated worker thread, one observer per watch
//! category while active, and the drain loop that forwards move outcomes to
//! the listener. Commands (start / stop / re-register / shutdown) arrive
//! through a single queue consumed by one task, so each is processed to
//! completion before the next regardless of how the host delivers them.
//!
//! Duplicate commands are contractual no-ops: the host may redeliver a start
//! at any time, and a stray stop with no active session must not fault.

pub mod drain;
pub mod envelope;
mod observer;
pub mod worker;

pub use drain::{MoveResultListener, TracingListener};
pub use envelope::{EnvelopeError, ForegroundEnvelope, SessionDescriptor, StatusFileEnvelope};
pub use observer::{Observer, ObserverFactory};
pub use worker::{WorkerContext, WorkerError, WorkerHandle};

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::NavigatorConfig;
use crate::domain::MoveOutcome;
use crate::infra::notify::ChangeNotifier;
use crate::infra::running::RunningState;
use crate::ops::relocate::MovePipeline;

use drain::drain_outcomes;

#[derive(Debug, Error)]
pub enum MonitorError {
	#[error("foreground session was denied: {0}")]
	Envelope(#[from] EnvelopeError),
	#[error(transparent)]
	Worker(#[from] WorkerError),
	#[error("monitor has been shut down")]
	ShutDown,
}

/// The collaborators the engine drives, behind their seams so tests can
/// instrument every one of them.
#[derive(Clone)]
pub struct NavigatorContext {
	pub notifier: Arc<dyn ChangeNotifier>,
	pub pipeline: Arc<dyn MovePipeline>,
	pub listener: Arc<dyn MoveResultListener>,
	pub envelope: Arc<dyn ForegroundEnvelope>,
}

impl NavigatorContext {
	/// Assemble the production collaborator set for a configuration.
	pub fn production(config: &NavigatorConfig) -> anyhow::Result<Self> {
		use crate::infra::notify::FsChangeNotifier;
		use crate::ops::relocate::RelocatePipeline;

		Ok(Self {
			notifier: Arc::new(FsChangeNotifier::new()?),
			pipeline: Arc::new(RelocatePipeline::from_config(config)?),
			listener: Arc::new(TracingListener),
			envelope: Arc::new(StatusFileEnvelope::new(config.data_dir.clone())),
		})
	}
}

enum Command {
	Start(oneshot::Sender<Result<(), MonitorError>>),
	Stop(oneshot::Sender<Result<(), MonitorError>>),
	ReRegister(oneshot::Sender<Result<(), MonitorError>>),
	Shutdown(oneshot::Sender<()>),
}

/// Handle to the monitoring engine. Cheap to clone the published state out
/// of; commands are serialized behind the scenes.
#[derive(Debug)]
pub struct Navigator {
	commands_tx: mpsc::Sender<Command>,
	running: RunningState,
}

impl Navigator {
	/// Spawn the engine's command loop on the current runtime.
	pub fn new(config: Arc<NavigatorConfig>, context: NavigatorContext) -> Self {
		let (commands_tx, commands_rx) = mpsc::channel(16);
		let running = RunningState::new();

		let core = NavigatorCore {
			factory: ObserverFactory::new(Arc::clone(&config), Arc::clone(&context.pipeline)),
			config,
			context,
			running: running.clone(),
			worker: None,
			session: None,
		};
		tokio::spawn(core.run(commands_rx));

		Self {
			commands_tx,
			running,
		}
	}

	/// Begin a monitoring session. Idempotent: a second start while active
	/// is a logged no-op.
	pub async fn start(&self) -> Result<(), MonitorError> {
		self.command(Command::Start).await
	}

	/// End the monitoring session, positively unregistering every observer
	/// before returning. A stop with no active session is a no-op.
	pub async fn stop(&self) -> Result<(), MonitorError> {
		self.command(Command::Stop).await
	}

	/// Rebuild and re-register the observer set without interrupting the
	/// session. Acts as a start when no session exists.
	pub async fn re_register(&self) -> Result<(), MonitorError> {
		self.command(Command::ReRegister).await
	}

	/// Tear the engine down: stop any active session, then quit and join the
	/// worker thread.
	pub async fn shutdown(&self) {
		let (reply_tx, reply_rx) = oneshot::channel();
		if self.commands_tx.send(Command::Shutdown(reply_tx)).await.is_ok() {
			let _ = reply_rx.await;
		}
	}

	pub fn running(&self) -> RunningState {
		self.running.clone()
	}

	pub fn is_running(&self) -> bool {
		self.running.is_running()
	}

	async fn command(
		&self,
		make: impl FnOnce(oneshot::Sender<Result<(), MonitorError>>) -> Command,
	) -> Result<(), MonitorError> {
		let (reply_tx, reply_rx) = oneshot::channel();
		self.commands_tx
			.send(make(reply_tx))
			.await
			.map_err(|_| MonitorError::ShutDown)?;
		reply_rx.await.map_err(|_| MonitorError::ShutDown)?
	}
}

impl Drop for Navigator {
	fn drop(&mut self) {
		// Best effort: if the command loop is still up, ask it to tear down.
		let (reply_tx, _reply_rx) = oneshot::channel();
		let _ = self.commands_tx.try_send(Command::Shutdown(reply_tx));
	}
}

/// One active session's exclusively-owned state. The observer list is
/// retained from registration time and is the authority on what must be
/// unregistered; it is never recomputed later.
struct ActiveSession {
	observers: Vec<Arc<Observer>>,
	outcomes_tx: async_channel::Sender<MoveOutcome>,
}

struct NavigatorCore {
	config: Arc<NavigatorConfig>,
	context: NavigatorContext,
	factory: ObserverFactory,
	running: RunningState,
	worker: Option<WorkerContext>,
	session: Option<ActiveSession>,
}

impl NavigatorCore {
	async fn run(mut self, mut commands_rx: mpsc::Receiver<Command>) {
		while let Some(command) = commands_rx.recv().await {
			match command {
				Command::Start(reply) => {
					let _ = reply.send(self.start().await);
				}
				Command::Stop(reply) => {
					let _ = reply.send(self.stop().await);
				}
				Command::ReRegister(reply) => {
					let _ = reply.send(self.re_register().await);
				}
				Command::Shutdown(reply) => {
					if let Err(e) = self.stop().await {
						warn!(error = ?e, "Stop during shutdown failed");
					}
					if let Some(worker) = self.worker.take() {
						worker.shutdown();
					}
					let _ = reply.send(());
					break;
				}
			}
		}
		debug!("Command loop exited");
	}

	async fn start(&mut self) -> Result<(), MonitorError> {
		if self.session.is_some() {
			debug!("Monitoring session already active; ignoring duplicate start");
			return Ok(());
		}

		self.context
			.envelope
			.begin(&self.config.session_descriptor())
			.map_err(|e| {
				warn!(error = %e, "Foreground session denied; start aborted");
				MonitorError::Envelope(e)
			})?;

		let worker = match self.ensure_worker() {
			Ok(worker) => worker,
			Err(e) => {
				error!(error = %e, "Worker unavailable; start aborted");
				self.context.envelope.end();
				return Err(e.into());
			}
		};

		let (outcomes_tx, outcomes_rx) = async_channel::unbounded();
		let observers = self.factory.create(&worker, &outcomes_tx);
		let expected = observers.len();

		let registered = match worker
			.run(register_observers(
				Arc::clone(&self.context.notifier),
				observers,
			))
			.await
		{
			Ok(registered) => registered,
			Err(e) => {
				error!(error = %e, "Worker lost during registration; start aborted");
				self.context.envelope.end();
				return Err(e.into());
			}
		};

		worker.dispatch(drain_outcomes(
			outcomes_rx,
			Arc::clone(&self.context.listener),
		));

		info!(
			observers = registered.len(),
			categories = expected,
			"Monitoring session started"
		);
		self.session = Some(ActiveSession {
			observers: registered,
			outcomes_tx,
		});
		self.running.set(true);
		Ok(())
	}

	async fn stop(&mut self) -> Result<(), MonitorError> {
		let Some(session) = self.session.take() else {
			debug!("No active monitoring session; ignoring stop");
			return Ok(());
		};
		let ActiveSession {
			observers,
			outcomes_tx,
		} = session;
		let count = observers.len();

		if let Some(worker) = &self.worker {
			let handle = worker.handle();
			let unregistration = handle.run(unregister_observers(
				Arc::clone(&self.context.notifier),
				observers,
			));
			if let Err(e) = unregistration.await {
				error!(error = %e, "Worker lost while unregistering observers");
			}
		}

		// The drain loop flushes whatever is still queued and retires once
		// this last session-side sender is gone.
		drop(outcomes_tx);

		self.context.envelope.end();
		self.running.set(false);
		info!(observers = count, "Monitoring session stopped");
		Ok(())
	}

	async fn re_register(&mut self) -> Result<(), MonitorError> {
		let Some(mut session) = self.session.take() else {
			debug!("Re-registration requested while inactive; starting a session");
			return self.start().await;
		};

		let worker = match self.ensure_worker() {
			Ok(worker) => worker,
			Err(e) => {
				self.session = Some(session);
				return Err(e.into());
			}
		};

		let old = std::mem::take(&mut session.observers);
		let fresh = self.factory.create(&worker, &session.outcomes_tx);

		// Old set out, fresh set in, within one worker job: the unwatched
		// window stays as small as the facility allows, and neither the
		// drain loop nor the published state is touched.
		let swap = worker.run(swap_observers(
			Arc::clone(&self.context.notifier),
			old,
			fresh,
		));
		match swap.await {
			Ok(registered) => {
				info!(observers = registered.len(), "Observer set rebuilt");
				session.observers = registered;
				self.session = Some(session);
				Ok(())
			}
			Err(e) => {
				error!(error = %e, "Worker lost while re-registering observers");
				self.session = Some(session);
				Err(e.into())
			}
		}
	}

	fn ensure_worker(&mut self) -> Result<WorkerHandle, WorkerError> {
		if let Some(worker) = &self.worker {
			return Ok(worker.handle());
		}
		let worker = WorkerContext::spawn()?;
		let handle = worker.handle();
		self.worker = Some(worker);
		debug!("Worker thread created");
		Ok(handle)
	}
}

/// Register each observer with the facility, best-effort: a category whose
/// registration faults is logged and skipped, and simply receives no events
/// until the next successful registration.
async fn register_observers(
	notifier: Arc<dyn ChangeNotifier>,
	observers: Vec<Arc<Observer>>,
) -> Vec<Arc<Observer>> {
	let mut registered = Vec::with_capacity(observers.len());
	for observer in observers {
		match notifier.register(Arc::clone(&observer), true) {
			Ok(()) => {
				debug!(
					category = %observer.category(),
					root = %observer.watch_root().display(),
					"Observer registered"
				);
				registered.push(observer);
			}
			Err(e) => {
				warn!(
					category = %observer.category(),
					error = %e,
					"Observer registration failed; category stays dark this session"
				);
			}
		}
	}
	registered
}

async fn unregister_observers(notifier: Arc<dyn ChangeNotifier>, observers: Vec<Arc<Observer>>) {
	for observer in observers {
		if let Err(e) = notifier.unregister(&observer) {
			warn!(
				category = %observer.category(),
				error = %e,
				"Observer unregistration failed"
			);
		}
	}
}

async fn swap_observers(
	notifier: Arc<dyn ChangeNotifier>,
	old: Vec<Arc<Observer>>,
	fresh: Vec<Arc<Observer>>,
) -> Vec<Arc<Observer>> {
	unregister_observers(Arc::clone(&notifier), old).await;
	register_observers(notifier, fresh).await
}
