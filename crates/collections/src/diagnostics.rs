//! Per-thread sink for listener failures.
//!
//! A listener that panics is caught by the dispatcher and reported to the
//! failure handler of the thread the listener ran on. Without a handler the
//! failure is logged as `listener.panic`.

use std::cell::RefCell;
use std::sync::Arc;

use crate::ListenerId;

/// A caught listener panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
	pub listener: ListenerId,
	pub message: String,
}

pub type FailureHandler = Arc<dyn Fn(&ListenerFailure) + Send + Sync>;

thread_local! {
	static HANDLER: RefCell<Option<FailureHandler>> = const { RefCell::new(None) };
}

/// Installs `handler` for the calling thread, returning the previous one.
pub fn set_failure_handler(handler: impl Fn(&ListenerFailure) + Send + Sync + 'static) -> Option<FailureHandler> {
	HANDLER.with(|slot| slot.borrow_mut().replace(Arc::new(handler)))
}

/// Removes the calling thread's handler, restoring the logging default.
pub fn clear_failure_handler() -> Option<FailureHandler> {
	HANDLER.with(|slot| slot.borrow_mut().take())
}

pub(crate) fn report(failure: ListenerFailure) {
	let handler = HANDLER.with(|slot| slot.borrow().clone());
	match handler {
		Some(handler) => handler(&failure),
		None => tracing::error!(listener = failure.listener.get(), message = %failure.message, "listener.panic"),
	}
}
