use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use weft_worker::{Executor, panic_message};

use crate::diagnostics::{self, ListenerFailure};
use crate::listener::{ListenerId, ListenerStats};

/// Runs `call` on `executor`, inline when it is direct.
pub(super) fn invoke<F>(id: ListenerId, stats: &Arc<ListenerStats>, executor: &Arc<dyn Executor>, threshold: Duration, call: F)
where
	F: FnOnce() + Send + 'static,
{
	if executor.is_direct() {
		run_guarded(id, stats, threshold, call);
		return;
	}
	let stats = Arc::clone(stats);
	executor.execute(Box::new(move || run_guarded(id, &stats, threshold, call)));
}

/// Times one invocation and routes a panic to the current thread's failure handler.
fn run_guarded(id: ListenerId, stats: &ListenerStats, threshold: Duration, call: impl FnOnce()) {
	let started = Instant::now();
	let outcome = catch_unwind(AssertUnwindSafe(call));
	let elapsed = started.elapsed();
	let slow = elapsed > threshold;
	stats.record(elapsed, slow, outcome.is_err());

	if slow {
		tracing::warn!(
			listener = id.get(),
			elapsed_ms = elapsed.as_millis() as u64,
			threshold_ms = threshold.as_millis() as u64,
			"listener.slow"
		);
	}

	if let Err(payload) = outcome {
		let message = panic_message(payload.as_ref()).unwrap_or_else(|| String::from("non-string panic payload"));
		diagnostics::report(ListenerFailure { listener: id, message });
	}
}
