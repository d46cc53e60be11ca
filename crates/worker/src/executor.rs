use std::sync::{Arc, OnceLock};
use std::{fmt, io};

use tokio::runtime::{Builder, Handle, Runtime};

/// Unit of work submitted to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted tasks.
///
/// Implementations decide where and when a task runs. Callers that need to
/// know whether a task has completed by the time `execute` returns check
/// [`Executor::is_direct`].
pub trait Executor: Send + Sync + 'static {
	/// Submits `task` for execution.
	fn execute(&self, task: Task);

	/// Returns true if `execute` runs the task inline before returning.
	fn is_direct(&self) -> bool {
		false
	}

	/// Short label used in diagnostics.
	fn name(&self) -> &str;
}

impl fmt::Debug for dyn Executor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Executor")
			.field("name", &self.name())
			.field("direct", &self.is_direct())
			.finish()
	}
}

/// Runs every task on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectExecutor;

impl Executor for DirectExecutor {
	fn execute(&self, task: Task) {
		task();
	}

	fn is_direct(&self) -> bool {
		true
	}

	fn name(&self) -> &str {
		"direct"
	}
}

/// Shared [`DirectExecutor`] instance.
pub fn direct() -> Arc<dyn Executor> {
	static DIRECT: OnceLock<Arc<dyn Executor>> = OnceLock::new();
	Arc::clone(DIRECT.get_or_init(|| Arc::new(DirectExecutor)))
}

/// Runs tasks on a tokio runtime's blocking pool.
///
/// Tasks are independent; no ordering between two submissions is implied.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
	handle: Handle,
}

impl TokioExecutor {
	/// Executor bound to `handle`.
	pub fn new(handle: Handle) -> Self {
		Self { handle }
	}

	/// Executor bound to the ambient runtime, or to the shared listener
	/// runtime when called outside of one.
	///
	/// # Errors
	///
	/// Returns the I/O error if the shared runtime has to be built and cannot be.
	pub fn current() -> io::Result<Self> {
		match Handle::try_current() {
			Ok(handle) => Ok(Self::new(handle)),
			Err(_) => listener_runtime().map(Self::new),
		}
	}
}

/// Blocking threads of the shared listener runtime.
const LISTENER_BLOCKING_THREADS: usize = 4;

/// Lazily built runtime that only serves listener tasks.
///
/// Listener tasks are synchronous closures, so it needs a single worker and
/// a small blocking pool, without the I/O or time drivers.
fn listener_runtime() -> io::Result<Handle> {
	static LISTENER_RT: OnceLock<Runtime> = OnceLock::new();
	if let Some(runtime) = LISTENER_RT.get() {
		return Ok(runtime.handle().clone());
	}
	let built = Builder::new_multi_thread()
		.worker_threads(1)
		.max_blocking_threads(LISTENER_BLOCKING_THREADS)
		.thread_name("weft-listener")
		.build()?;
	tracing::debug!(blocking_threads = LISTENER_BLOCKING_THREADS, "executor.tokio.listener_runtime");
	// A racing caller may have won; its runtime is kept and `built` dropped.
	Ok(LISTENER_RT.get_or_init(|| built).handle().clone())
}

impl Executor for TokioExecutor {
	fn execute(&self, task: Task) {
		tracing::trace!("executor.tokio.spawn");
		drop(self.handle.spawn_blocking(task));
	}

	fn name(&self) -> &str {
		"tokio"
	}
}
