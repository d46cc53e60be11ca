use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use weft_worker::{Executor, direct};

use crate::config;
use crate::listener::{ListenerId, ListenerRegistry};
use crate::observer::{Dependency, Subscription};

struct PropertyInner<V> {
	value: RwLock<V>,
	listeners: ListenerRegistry<V>,
}

/// Observable value cell.
///
/// Every `set` notifies listeners on the setting thread (or on their
/// executors). Clones share the same cell.
pub struct Property<V> {
	inner: Arc<PropertyInner<V>>,
}

impl<V> Clone for Property<V> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<V: Clone + Send + Sync + 'static> Property<V> {
	pub fn new(value: V) -> Self {
		Self {
			inner: Arc::new(PropertyInner {
				value: RwLock::new(value),
				listeners: ListenerRegistry::new(),
			}),
		}
	}

	pub fn get(&self) -> V {
		self.inner.value.read().clone()
	}

	/// Stores `value`, notifies listeners and returns the previous value.
	pub fn set(&self, value: V) -> V {
		let old = std::mem::replace(&mut *self.inner.value.write(), value.clone());
		self.notify(value);
		old
	}

	/// Edits the value in place, then notifies listeners.
	pub fn update(&self, edit: impl FnOnce(&mut V)) {
		let value = {
			let mut slot = self.inner.value.write();
			edit(&mut slot);
			slot.clone()
		};
		self.notify(value);
	}

	pub fn add_listener(&self, listener: impl Fn(&V) + Send + Sync + 'static) -> ListenerId {
		self.inner.listeners.add_change(direct(), listener)
	}

	pub fn add_listener_on(&self, executor: Arc<dyn Executor>, listener: impl Fn(&V) + Send + Sync + 'static) -> ListenerId {
		self.inner.listeners.add_change(executor, listener)
	}

	pub fn add_invalidation_listener(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
		self.inner.listeners.add_invalidation(direct(), listener)
	}

	pub fn remove_listener(&self, id: ListenerId) -> bool {
		self.inner.listeners.remove(id)
	}

	pub fn listener_count(&self) -> usize {
		self.inner.listeners.len()
	}

	/// This property as a shareable [`Dependency`].
	pub fn as_dependency(&self) -> Arc<dyn Dependency> {
		Arc::new(self.clone())
	}

	fn notify(&self, value: V) {
		self.inner.listeners.dispatch(Arc::new(value), &config::global());
	}
}

impl<V: Clone + Send + Sync + 'static> Dependency for Property<V> {
	fn subscribe(&self, on_invalidate: Arc<dyn Fn() + Send + Sync>) -> Subscription {
		let id = self.inner.listeners.add_invalidation(direct(), move || on_invalidate());
		let weak: Weak<PropertyInner<V>> = Arc::downgrade(&self.inner);
		Subscription::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.listeners.remove(id);
			}
		})
	}
}

impl<V: fmt::Debug> fmt::Debug for Property<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Property")
			.field("value", &*self.inner.value.read())
			.field("listeners", &self.inner.listeners)
			.finish()
	}
}
