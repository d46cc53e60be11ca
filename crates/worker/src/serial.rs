//! Single-thread executor preserving submission order.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::panic::panic_message;
use crate::spawn::spawn_named_thread;
use crate::{Executor, Task};

#[derive(Default)]
struct QueueState {
	tasks: VecDeque<Task>,
	running: bool,
	closed: bool,
}

#[derive(Default)]
struct Shared {
	state: Mutex<QueueState>,
	work: Condvar,
	idle: Condvar,
}

/// Runs tasks one at a time, in submission order, on a dedicated thread.
///
/// A panicking task is logged and does not stop the thread. Dropping the
/// executor drains the queue and joins the thread.
pub struct SerialExecutor {
	name: String,
	shared: Arc<Shared>,
	worker: Option<JoinHandle<()>>,
	worker_id: ThreadId,
}

impl SerialExecutor {
	/// Starts the worker thread.
	///
	/// # Errors
	///
	/// Returns the OS error if the thread cannot be spawned.
	pub fn new(name: impl Into<String>) -> std::io::Result<Self> {
		let name = name.into();
		let shared = Arc::new(Shared::default());
		let worker = {
			let shared = Arc::clone(&shared);
			let label = name.clone();
			spawn_named_thread(name.clone(), move || run(&shared, &label))?
		};
		let worker_id = worker.thread().id();
		Ok(Self {
			name,
			shared,
			worker: Some(worker),
			worker_id,
		})
	}

	/// Blocks until every task submitted so far has finished.
	///
	/// Returns immediately when called from the worker thread itself.
	pub fn wait_idle(&self) {
		if thread::current().id() == self.worker_id {
			return;
		}
		let mut state = self.shared.state.lock();
		while state.running || !state.tasks.is_empty() {
			self.shared.idle.wait(&mut state);
		}
	}

	/// Number of tasks queued and not yet started.
	pub fn pending(&self) -> usize {
		self.shared.state.lock().tasks.len()
	}
}

fn run(shared: &Shared, name: &str) {
	loop {
		let task = {
			let mut state = shared.state.lock();
			loop {
				if let Some(task) = state.tasks.pop_front() {
					state.running = true;
					break task;
				}
				if state.closed {
					return;
				}
				shared.work.wait(&mut state);
			}
		};

		if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
			let message = panic_message(payload.as_ref()).unwrap_or_else(|| "non-string panic payload".to_string());
			tracing::error!(executor = name, %message, "executor.task_panic");
		}

		let mut state = shared.state.lock();
		state.running = false;
		if state.tasks.is_empty() {
			shared.idle.notify_all();
		}
	}
}

impl Executor for SerialExecutor {
	fn execute(&self, task: Task) {
		let mut state = self.shared.state.lock();
		if state.closed {
			tracing::warn!(executor = %self.name, "executor.closed");
			return;
		}
		state.tasks.push_back(task);
		self.shared.work.notify_one();
	}

	fn name(&self) -> &str {
		&self.name
	}
}

impl std::fmt::Debug for SerialExecutor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SerialExecutor")
			.field("name", &self.name)
			.field("pending", &self.pending())
			.finish()
	}
}

impl Drop for SerialExecutor {
	fn drop(&mut self) {
		self.shared.state.lock().closed = true;
		self.shared.work.notify_all();
		let Some(worker) = self.worker.take() else {
			return;
		};
		if thread::current().id() == self.worker_id {
			return;
		}
		if worker.join().is_err() {
			tracing::error!(executor = %self.name, "executor.join_failed");
		}
	}
}
