//! One-way content bindings between collections.
//!
//! A target bound to a source first takes a copy of the source's contents,
//! then replays every change the source flushes, in order, as one write
//! transaction on the target per source change. Edits made to the target by
//! anything else desynchronise it from the source; the binding does not
//! detect that and keeps replaying, logging `binding.replay_failed` for
//! records that no longer fit.

use std::fmt;
use std::sync::Arc;

use crate::observer::Subscription;
use crate::{ListenerId, ObservableCollection};

/// Live binding returned by `bind_content`. Dropping it unbinds.
#[must_use = "dropping a content binding unbinds it"]
pub struct ContentBinding {
	listener: ListenerId,
	_subscription: Subscription,
}

impl ContentBinding {
	pub(crate) fn new<S: 'static>(listener: ListenerId, source: Box<dyn ObservableCollection<S>>) -> Self {
		let subscription = Subscription::new(move || {
			if source.remove_listener(listener) {
				tracing::debug!(listener = listener.get(), "binding.unbind");
			}
		});
		Self {
			listener,
			_subscription: subscription,
		}
	}

	/// Listener the binding registered on its source.
	pub fn listener(&self) -> ListenerId {
		self.listener
	}

	/// Stops replaying source changes. The target keeps its current contents.
	pub fn unbind(self) {
		drop(self);
	}
}

impl fmt::Debug for ContentBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ContentBinding").field("listener", &self.listener).finish()
	}
}

/// True when both handles point at the same shared collection.
pub(crate) fn same_collection<A, B>(a: &Arc<A>, b: &Arc<B>) -> bool {
	std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}
