//! Content-change tracking for elements held by a list.
//!
//! A list built with an extractor asks each inserted element for its
//! [`Dependency`]s and subscribes to them. When a dependency fires, the list
//! records [`crate::ChangeRecord::Update`] for every index still holding
//! that element. Each insertion gets its own tag, so an element inserted
//! twice is tracked at both positions.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Something an element's content depends on.
pub trait Dependency: Send + Sync {
	/// Calls `on_invalidate` after every change until the subscription is dropped.
	fn subscribe(&self, on_invalidate: Arc<dyn Fn() + Send + Sync>) -> Subscription;
}

/// Live subscription to a [`Dependency`]. Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
	cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
	pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
		Self {
			cancel: Some(Box::new(cancel)),
		}
	}

	/// Subscription with nothing to undo.
	pub fn detached() -> Self {
		Self { cancel: None }
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(cancel) = self.cancel.take() {
			cancel();
		}
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
	}
}

pub(crate) type Dependencies = SmallVec<[Arc<dyn Dependency>; 2]>;
pub(crate) type Extractor<T> = Arc<dyn Fn(&T) -> Dependencies + Send + Sync>;
pub(crate) type Notify = Arc<dyn Fn(u64) + Send + Sync>;

pub(crate) struct ElementObserver<T> {
	extractor: Extractor<T>,
	notify: Notify,
	subscriptions: Mutex<FxHashMap<u64, SmallVec<[Subscription; 2]>>>,
	next_tag: AtomicU64,
}

impl<T> ElementObserver<T> {
	pub(crate) fn new(extractor: Extractor<T>, notify: Notify) -> Self {
		Self {
			extractor,
			notify,
			subscriptions: Mutex::new(FxHashMap::default()),
			next_tag: AtomicU64::new(1),
		}
	}

	/// Reserves `count` fresh tags.
	pub(crate) fn allocate(&self, count: usize) -> Vec<u64> {
		let start = self.next_tag.fetch_add(count as u64, Ordering::Relaxed);
		(start..start + count as u64).collect()
	}

	/// Subscribes to `element`'s dependencies under `tag`.
	pub(crate) fn attach(&self, tag: u64, element: &T) {
		let dependencies = (self.extractor)(element);
		if dependencies.is_empty() {
			return;
		}
		let notify = Arc::clone(&self.notify);
		let on_invalidate: Arc<dyn Fn() + Send + Sync> = Arc::new(move || notify(tag));
		let subscriptions: SmallVec<[Subscription; 2]> = dependencies
			.iter()
			.map(|dependency| dependency.subscribe(Arc::clone(&on_invalidate)))
			.collect();
		tracing::trace!(tag, dependencies = subscriptions.len(), "observer.attach");
		self.subscriptions.lock().insert(tag, subscriptions);
	}

	/// Drops the subscriptions of every tag in `tags`.
	pub(crate) fn detach(&self, tags: impl IntoIterator<Item = u64>) {
		let removed: Vec<_> = {
			let mut subscriptions = self.subscriptions.lock();
			tags.into_iter().filter_map(|tag| subscriptions.remove(&tag)).collect()
		};
		if !removed.is_empty() {
			tracing::trace!(elements = removed.len(), "observer.detach");
		}
	}

	/// Number of elements with live subscriptions.
	pub(crate) fn observed(&self) -> usize {
		self.subscriptions.lock().len()
	}
}
