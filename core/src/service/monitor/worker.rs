//! Dedicated worker thread for observer callbacks and outcome draining
//!
//! One thread per core instance, created lazily on the first session and
//! reused across stop/start cycles. Jobs are futures shipped over an
//! unbounded channel and spawned onto a `LocalSet` driven by a
//! current-thread runtime, so everything the engine runs here executes
//! sequentially on the one thread.

use std::thread;

use futures::future::BoxFuture;
use std::future::Future;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::LocalSet;
use tracing::{debug, error, trace, warn};

#[derive(Debug, Error)]
pub enum WorkerError {
	#[error("failed to build the worker runtime: {0}")]
	Runtime(#[source] std::io::Error),
	#[error("failed to spawn the worker thread: {0}")]
	Spawn(#[source] std::io::Error),
	#[error("worker thread terminated unexpectedly")]
	ThreadGone,
}

enum WorkerJob {
	Run(BoxFuture<'static, ()>),
	Quit,
}

/// Cheap handle for shipping jobs onto the worker thread.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
	jobs_tx: mpsc::UnboundedSender<WorkerJob>,
}

impl WorkerHandle {
	/// Fire-and-forget: queue a future to run on the worker thread.
	pub fn dispatch<F>(&self, job: F)
	where
		F: Future<Output = ()> + Send + 'static,
	{
		if self.jobs_tx.send(WorkerJob::Run(Box::pin(job))).is_err() {
			warn!("Worker thread is gone; dropping dispatched job");
		}
	}

	/// Queue a future on the worker thread and await its result.
	pub async fn run<F, T>(&self, job: F) -> Result<T, WorkerError>
	where
		F: Future<Output = T> + Send + 'static,
		T: Send + 'static,
	{
		let (result_tx, result_rx) = oneshot::channel();
		self.dispatch(async move {
			let _ = result_tx.send(job.await);
		});
		result_rx.await.map_err(|_| WorkerError::ThreadGone)
	}
}

/// Owns the worker thread. Dropping or shutting the context down quits the
/// thread; jobs already acknowledged have run to completion by then because
/// callers await them through [`WorkerHandle::run`].
#[derive(Debug)]
pub struct WorkerContext {
	handle: WorkerHandle,
	thread: Option<thread::JoinHandle<()>>,
}

impl WorkerContext {
	pub fn spawn() -> Result<Self, WorkerError> {
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.map_err(WorkerError::Runtime)?;

		let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
		let thread = thread::Builder::new()
			.name("navigator-worker".into())
			.spawn(move || worker_main(runtime, jobs_rx))
			.map_err(WorkerError::Spawn)?;

		Ok(Self {
			handle: WorkerHandle { jobs_tx },
			thread: Some(thread),
		})
	}

	pub fn handle(&self) -> WorkerHandle {
		self.handle.clone()
	}

	/// Quit the worker thread and wait for it to exit.
	pub fn shutdown(mut self) {
		self.quit_and_join();
	}

	fn quit_and_join(&mut self) {
		let _ = self.handle.jobs_tx.send(WorkerJob::Quit);
		if let Some(thread) = self.thread.take() {
			if thread.join().is_err() {
				error!("Worker thread panicked before joining");
			}
		}
	}
}

impl Drop for WorkerContext {
	fn drop(&mut self) {
		if self.thread.is_some() {
			self.quit_and_join();
		}
	}
}

fn worker_main(runtime: tokio::runtime::Runtime, mut jobs_rx: mpsc::UnboundedReceiver<WorkerJob>) {
	debug!("Worker thread started");

	let local = LocalSet::new();
	local.block_on(&runtime, async move {
		while let Some(job) = jobs_rx.recv().await {
			match job {
				WorkerJob::Run(future) => {
					tokio::task::spawn_local(future);
				}
				WorkerJob::Quit => {
					trace!("Worker received quit signal");
					break;
				}
			}
		}
		// One more poll round so already-queued jobs can settle before the
		// local set is dropped.
		tokio::task::yield_now().await;
	});

	debug!("Worker thread exited");
}
