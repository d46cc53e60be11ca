//! Size-specialised listener store.
//!
//! # Shapes
//!
//! The registry is one of four shapes so the common zero and one listener
//! cases allocate no arrays:
//!
//! - `Empty`
//! - `SingleInvalidation` / `SingleChange`: exactly one listener.
//! - `Generic`: two or more listeners in two [`array::ListenerArray`]s.
//!
//! Adding a second listener promotes to `Generic`; removing down to one
//! demotes to the matching single shape, and removing the last returns to
//! `Empty`.
//!
//! # Snapshot isolation
//!
//! Dispatch clones the current shape under the mutex and iterates that
//! snapshot with the mutex released. `Generic` arrays sit behind [`Arc`], so
//! while a dispatch holds a snapshot an add or remove copies the array
//! instead of editing it in place. Outside dispatch the array is uniquely
//! owned and is compacted in place.

mod array;
mod dispatch;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use weft_worker::Executor;

use self::array::ListenerArray;
use crate::DispatchConfig;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle returned by registration; pass it back to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
	fn next() -> Self {
		Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
	}

	pub const fn get(self) -> u64 {
		self.0
	}
}

/// Per-listener invocation counters.
#[derive(Debug, Default)]
pub struct ListenerStats {
	invocations: AtomicU64,
	slow: AtomicU64,
	failures: AtomicU64,
	total_nanos: AtomicU64,
	max_nanos: AtomicU64,
}

impl ListenerStats {
	pub fn invocations(&self) -> u64 {
		self.invocations.load(Ordering::Relaxed)
	}

	/// Invocations that exceeded the slow-listener threshold.
	pub fn slow_invocations(&self) -> u64 {
		self.slow.load(Ordering::Relaxed)
	}

	/// Invocations that panicked.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub fn total_time(&self) -> Duration {
		Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
	}

	pub fn max_time(&self) -> Duration {
		Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed))
	}

	fn record(&self, elapsed: Duration, slow: bool, failed: bool) {
		let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
		self.invocations.fetch_add(1, Ordering::Relaxed);
		self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
		self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
		if slow {
			self.slow.fetch_add(1, Ordering::Relaxed);
		}
		if failed {
			self.failures.fetch_add(1, Ordering::Relaxed);
		}
	}
}

struct Entry<F: ?Sized> {
	id: ListenerId,
	callback: Arc<F>,
	executor: Arc<dyn Executor>,
	stats: Arc<ListenerStats>,
}

impl<F: ?Sized> Clone for Entry<F> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			callback: Arc::clone(&self.callback),
			executor: Arc::clone(&self.executor),
			stats: Arc::clone(&self.stats),
		}
	}
}

impl<F: ?Sized> Entry<F> {
	fn new(callback: Arc<F>, executor: Arc<dyn Executor>) -> Self {
		Self {
			id: ListenerId::next(),
			callback,
			executor,
			stats: Arc::default(),
		}
	}
}

type InvalidationEntry = Entry<dyn Fn() + Send + Sync>;
type ChangeEntry<C> = Entry<dyn Fn(&C) + Send + Sync>;

enum Shape<C> {
	Empty,
	SingleInvalidation(InvalidationEntry),
	SingleChange(ChangeEntry<C>),
	Generic {
		invalidation: Arc<ListenerArray<InvalidationEntry>>,
		change: Arc<ListenerArray<ChangeEntry<C>>>,
	},
}

impl<C> Clone for Shape<C> {
	fn clone(&self) -> Self {
		match self {
			Self::Empty => Self::Empty,
			Self::SingleInvalidation(e) => Self::SingleInvalidation(e.clone()),
			Self::SingleChange(e) => Self::SingleChange(e.clone()),
			Self::Generic { invalidation, change } => Self::Generic {
				invalidation: Arc::clone(invalidation),
				change: Arc::clone(change),
			},
		}
	}
}

/// Observable summary of the registry's internal shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryShape {
	Empty,
	SingleInvalidation,
	SingleChange,
	Generic { invalidation: usize, change: usize },
}

/// Invalidation and change listeners for one observable.
///
/// `C` is the change value handed to change listeners.
pub struct ListenerRegistry<C> {
	shape: Mutex<Shape<C>>,
	copies: AtomicU64,
}

impl<C> Default for ListenerRegistry<C> {
	fn default() -> Self {
		Self {
			shape: Mutex::new(Shape::Empty),
			copies: AtomicU64::new(0),
		}
	}
}

impl<C> fmt::Debug for ListenerRegistry<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ListenerRegistry").field("shape", &self.shape()).finish()
	}
}

impl<C: Send + Sync + 'static> ListenerRegistry<C> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a listener called once per dispatch without the change value.
	pub fn add_invalidation(&self, executor: Arc<dyn Executor>, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
		let callback: Arc<dyn Fn() + Send + Sync> = Arc::new(listener);
		let entry = Entry::new(callback, executor);
		let id = entry.id;
		let mut shape = self.shape.lock();
		*shape = match std::mem::replace(&mut *shape, Shape::Empty) {
			Shape::Empty => Shape::SingleInvalidation(entry),
			Shape::SingleInvalidation(first) => Shape::Generic {
				invalidation: Arc::new(ListenerArray::from_vec(vec![first, entry])),
				change: Arc::new(ListenerArray::new()),
			},
			Shape::SingleChange(first) => Shape::Generic {
				invalidation: Arc::new(ListenerArray::from_vec(vec![entry])),
				change: Arc::new(ListenerArray::from_vec(vec![first])),
			},
			Shape::Generic { mut invalidation, change } => {
				self.make_mut(&mut invalidation).push(entry);
				Shape::Generic { invalidation, change }
			}
		};
		tracing::trace!(listener = id.get(), "listener.add_invalidation");
		id
	}

	/// Registers a listener receiving every dispatched change.
	pub fn add_change(&self, executor: Arc<dyn Executor>, listener: impl Fn(&C) + Send + Sync + 'static) -> ListenerId {
		let callback: Arc<dyn Fn(&C) + Send + Sync> = Arc::new(listener);
		let entry = Entry::new(callback, executor);
		let id = entry.id;
		let mut shape = self.shape.lock();
		*shape = match std::mem::replace(&mut *shape, Shape::Empty) {
			Shape::Empty => Shape::SingleChange(entry),
			Shape::SingleChange(first) => Shape::Generic {
				invalidation: Arc::new(ListenerArray::new()),
				change: Arc::new(ListenerArray::from_vec(vec![first, entry])),
			},
			Shape::SingleInvalidation(first) => Shape::Generic {
				invalidation: Arc::new(ListenerArray::from_vec(vec![first])),
				change: Arc::new(ListenerArray::from_vec(vec![entry])),
			},
			Shape::Generic { invalidation, mut change } => {
				self.make_mut(&mut change).push(entry);
				Shape::Generic { invalidation, change }
			}
		};
		tracing::trace!(listener = id.get(), "listener.add_change");
		id
	}

	/// Removes the listener registered under `id`. Returns false if unknown.
	pub fn remove(&self, id: ListenerId) -> bool {
		let mut shape = self.shape.lock();
		let (next, removed) = match std::mem::replace(&mut *shape, Shape::Empty) {
			Shape::SingleInvalidation(e) if e.id == id => (Shape::Empty, true),
			Shape::SingleChange(e) if e.id == id => (Shape::Empty, true),
			Shape::Generic {
				mut invalidation,
				mut change,
			} => {
				let removed = if invalidation.contains(|e| e.id == id) {
					self.make_mut(&mut invalidation).remove(|e| e.id == id).is_some()
				} else if change.contains(|e| e.id == id) {
					self.make_mut(&mut change).remove(|e| e.id == id).is_some()
				} else {
					false
				};
				(collapse(invalidation, change), removed)
			}
			other => (other, false),
		};
		*shape = next;
		if removed {
			tracing::trace!(listener = id.get(), "listener.remove");
		}
		removed
	}

	/// Delivers `change` to every listener, invalidation listeners first.
	///
	/// Listeners registered or removed while this runs do not affect the
	/// current delivery.
	pub fn dispatch(&self, change: Arc<C>, config: &DispatchConfig) {
		let snapshot = self.shape.lock().clone();
		let threshold = config.slow_listener_threshold;
		match snapshot {
			Shape::Empty => {}
			Shape::SingleInvalidation(entry) => invoke_invalidation(&entry, threshold),
			Shape::SingleChange(entry) => invoke_change(&entry, &change, threshold),
			Shape::Generic { invalidation, change: listeners } => {
				for entry in invalidation.iter() {
					invoke_invalidation(entry, threshold);
				}
				for entry in listeners.iter() {
					invoke_change(entry, &change, threshold);
				}
			}
		}
	}
}

impl<C> ListenerRegistry<C> {
	pub fn shape(&self) -> RegistryShape {
		match &*self.shape.lock() {
			Shape::Empty => RegistryShape::Empty,
			Shape::SingleInvalidation(_) => RegistryShape::SingleInvalidation,
			Shape::SingleChange(_) => RegistryShape::SingleChange,
			Shape::Generic { invalidation, change } => RegistryShape::Generic {
				invalidation: invalidation.len(),
				change: change.len(),
			},
		}
	}

	pub fn len(&self) -> usize {
		match self.shape() {
			RegistryShape::Empty => 0,
			RegistryShape::SingleInvalidation | RegistryShape::SingleChange => 1,
			RegistryShape::Generic { invalidation, change } => invalidation + change,
		}
	}

	pub fn is_empty(&self) -> bool {
		matches!(self.shape(), RegistryShape::Empty)
	}

	/// Counters for the listener registered under `id`.
	pub fn stats(&self, id: ListenerId) -> Option<Arc<ListenerStats>> {
		match &*self.shape.lock() {
			Shape::Empty => None,
			Shape::SingleInvalidation(e) => (e.id == id).then(|| Arc::clone(&e.stats)),
			Shape::SingleChange(e) => (e.id == id).then(|| Arc::clone(&e.stats)),
			Shape::Generic { invalidation, change } => invalidation
				.iter()
				.find(|e| e.id == id)
				.map(|e| Arc::clone(&e.stats))
				.or_else(|| change.iter().find(|e| e.id == id).map(|e| Arc::clone(&e.stats))),
		}
	}

	/// How many times an edit had to copy an array held by an in-flight dispatch.
	pub fn copy_on_write_count(&self) -> u64 {
		self.copies.load(Ordering::Relaxed)
	}

	#[cfg(test)]
	fn capacity(&self) -> (usize, usize) {
		match &*self.shape.lock() {
			Shape::Generic { invalidation, change } => (invalidation.capacity(), change.capacity()),
			_ => (0, 0),
		}
	}

	fn make_mut<'a, L: Clone>(&self, array: &'a mut Arc<ListenerArray<L>>) -> &'a mut ListenerArray<L> {
		if Arc::strong_count(array) > 1 {
			self.copies.fetch_add(1, Ordering::Relaxed);
			tracing::trace!(len = array.len(), "listener.copy_on_write");
		}
		Arc::make_mut(array)
	}
}

fn collapse<C>(invalidation: Arc<ListenerArray<InvalidationEntry>>, change: Arc<ListenerArray<ChangeEntry<C>>>) -> Shape<C> {
	match (invalidation.len(), change.len()) {
		(0, 0) => Shape::Empty,
		(1, 0) => invalidation.first().cloned().map_or(Shape::Empty, Shape::SingleInvalidation),
		(0, 1) => change.first().cloned().map_or(Shape::Empty, Shape::SingleChange),
		_ => Shape::Generic { invalidation, change },
	}
}

fn invoke_invalidation(entry: &InvalidationEntry, threshold: Duration) {
	let callback = Arc::clone(&entry.callback);
	dispatch::invoke(entry.id, &entry.stats, &entry.executor, threshold, move || callback());
}

fn invoke_change<C: Send + Sync + 'static>(entry: &ChangeEntry<C>, change: &Arc<C>, threshold: Duration) {
	let callback = Arc::clone(&entry.callback);
	let change = Arc::clone(change);
	dispatch::invoke(entry.id, &entry.stats, &entry.executor, threshold, move || callback(&change));
}
