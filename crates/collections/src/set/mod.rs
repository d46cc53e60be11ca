//! Observable, thread-safe set that keeps insertion order.
//!
//! Shares the lock, scope and flush protocol of [`crate::ObservableList`].
//! Each element added or removed produces one [`SetChangeRecord`].

mod binding;
mod guard;

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use weft_worker::{Executor, direct};

pub use self::guard::LockedSet;
use crate::access::Scope;
use crate::change::{SetChange, SetChangeRecord};
use crate::engine::{Backing, Core};
use crate::listener::{ListenerId, ListenerStats, RegistryShape};
use crate::{CollectionError, DispatchConfig, ObservableCollection};

pub(crate) struct SetData<T> {
	pub(crate) items: IndexSet<T, FxBuildHasher>,
}

impl<T: Send + Sync + 'static> Backing for SetData<T> {
	fn len(&self) -> usize {
		self.items.len()
	}
}

type SetCore<T> = Core<SetData<T>, SetChangeRecord<T>>;

/// Thread-safe set whose edits are delivered to listeners in batches.
///
/// Cloning yields another handle to the same set.
pub struct ObservableSet<T: Send + Sync + 'static> {
	core: Arc<SetCore<T>>,
}

impl<T: Send + Sync + 'static> Clone for ObservableSet<T> {
	fn clone(&self) -> Self {
		Self {
			core: Arc::clone(&self.core),
		}
	}
}

/// Configures an [`ObservableSet`] before construction.
pub struct SetBuilder<T> {
	items: Vec<T>,
	config: Option<DispatchConfig>,
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> SetBuilder<T> {
	/// Initial contents. Duplicates collapse; no notification is emitted.
	pub fn items(mut self, items: impl IntoIterator<Item = T>) -> Self {
		self.items = items.into_iter().collect();
		self
	}

	pub fn dispatch_config(mut self, config: DispatchConfig) -> Self {
		self.config = Some(config);
		self
	}

	pub fn build(self) -> ObservableSet<T> {
		let items: IndexSet<T, FxBuildHasher> = self.items.into_iter().collect();
		ObservableSet {
			core: Arc::new(Core::new(SetData { items }, self.config)),
		}
	}
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> Default for ObservableSet<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> ObservableSet<T> {
	pub fn new() -> Self {
		Self::builder().build()
	}

	pub fn builder() -> SetBuilder<T> {
		SetBuilder {
			items: Vec::new(),
			config: None,
		}
	}

	/// Opens a write scope, or a nested read-only one if the calling thread
	/// already owns the write lock.
	///
	/// # Errors
	///
	/// [`CollectionError::Lock`] if the thread holds a read lock on this set.
	pub fn lock(&self) -> Result<LockedSet<'_, T>, CollectionError> {
		Ok(LockedSet::new(self, Scope::write(&self.core)?))
	}

	pub fn lock_read_only(&self) -> LockedSet<'_, T> {
		LockedSet::new(self, Scope::read_only(&self.core))
	}

	pub fn is_write_locked_by_current_thread(&self) -> bool {
		self.core.lock().is_write_locked_by_current_thread()
	}

	pub fn len(&self) -> usize {
		self.core.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn contains(&self, value: &T) -> bool {
		self.core.read(|data| data.items.contains(value))
	}

	pub fn contains_all(&self, values: &[T]) -> bool {
		self.core.read(|data| values.iter().all(|v| data.items.contains(v)))
	}

	/// Contents in insertion order.
	pub fn to_vec(&self) -> Vec<T> {
		self.core.read(|data| data.items.iter().cloned().collect())
	}

	/// Adds `value`. Returns false, recording nothing, if it was present.
	pub fn insert(&self, value: T) -> Result<bool, CollectionError> {
		self.core.write(|state| {
			if !state.data.items.insert(value.clone()) {
				return Ok(false);
			}
			state.record(SetChangeRecord::Added(value));
			state.touch();
			Ok(true)
		})
	}

	/// Removes `value`, keeping the order of the rest.
	pub fn remove(&self, value: &T) -> Result<bool, CollectionError> {
		self.core.write(|state| {
			let Some(removed) = state.data.items.shift_take(value) else {
				return Ok(false);
			};
			state.record(SetChangeRecord::Removed(removed));
			state.touch();
			Ok(true)
		})
	}

	/// Adds every absent item, one `Added` record each. Returns how many were new.
	pub fn extend(&self, items: impl IntoIterator<Item = T>) -> Result<usize, CollectionError> {
		let items: Vec<T> = items.into_iter().collect();
		self.core.write(|state| {
			let mut added = 0;
			for item in items {
				if state.data.items.insert(item.clone()) {
					state.record(SetChangeRecord::Added(item));
					added += 1;
				}
			}
			if added > 0 {
				state.touch();
			}
			Ok(added)
		})
	}

	/// Adds a snapshot of `other`, taken before this set is locked.
	pub fn add_all_from(&self, other: &dyn ObservableCollection<T>) -> Result<usize, CollectionError> {
		let items = other.snapshot();
		self.extend(items)
	}

	/// Keeps only the elements `keep` accepts. Returns true if anything was removed.
	///
	/// `keep` sees a snapshot and runs without any internal lock held.
	pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> Result<bool, CollectionError> {
		let core = &*self.core;
		core.write_scope(|| {
			let items = core.inspect(|data| data.items.iter().cloned().collect::<Vec<T>>());
			let doomed: Vec<T> = items.into_iter().filter(|item| !keep(item)).collect();
			if doomed.is_empty() {
				return Ok(false);
			}
			core.mutate(|state| {
				for item in doomed {
					if let Some(removed) = state.data.items.shift_take(&item) {
						state.record(SetChangeRecord::Removed(removed));
					}
				}
				state.touch();
				Ok(true)
			})
		})
	}

	pub fn remove_all(&self, values: &[T]) -> Result<bool, CollectionError> {
		self.retain(|item| !values.contains(item))
	}

	pub fn retain_all(&self, values: &[T]) -> Result<bool, CollectionError> {
		self.retain(|item| values.contains(item))
	}

	/// [`Self::remove_all`] against a snapshot of `other`.
	pub fn remove_all_from(&self, other: &dyn ObservableCollection<T>) -> Result<bool, CollectionError> {
		let values = other.snapshot();
		self.remove_all(&values)
	}

	/// [`Self::retain_all`] against a snapshot of `other`.
	pub fn retain_all_from(&self, other: &dyn ObservableCollection<T>) -> Result<bool, CollectionError> {
		let values = other.snapshot();
		self.retain_all(&values)
	}

	/// Removes everything, one `Removed` record per element in insertion order.
	pub fn clear(&self) -> Result<(), CollectionError> {
		self.core.write(|state| {
			if state.data.items.is_empty() {
				return Ok(());
			}
			for item in std::mem::take(&mut state.data.items) {
				state.record(SetChangeRecord::Removed(item));
			}
			state.touch();
			Ok(())
		})
	}

	/// Same contents regardless of order, compared against a snapshot of `other`.
	pub fn content_eq(&self, other: &dyn ObservableCollection<T>) -> bool {
		let theirs = other.snapshot();
		self.core.read(|data| data.items.len() == theirs.len() && theirs.iter().all(|v| data.items.contains(v)))
	}

	pub fn add_invalidation_listener(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
		self.add_invalidation_listener_on(direct(), listener)
	}

	pub fn add_invalidation_listener_on(&self, executor: Arc<dyn Executor>, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
		self.core.listeners().add_invalidation(executor, listener)
	}

	pub fn add_change_listener(&self, listener: impl Fn(&SetChange<T>) + Send + Sync + 'static) -> ListenerId {
		self.add_change_listener_on(direct(), listener)
	}

	pub fn add_change_listener_on(&self, executor: Arc<dyn Executor>, listener: impl Fn(&SetChange<T>) + Send + Sync + 'static) -> ListenerId {
		self.core.listeners().add_change(executor, listener)
	}

	pub fn remove_listener(&self, id: ListenerId) -> bool {
		self.core.listeners().remove(id)
	}

	pub fn listener_stats(&self, id: ListenerId) -> Option<Arc<ListenerStats>> {
		self.core.listeners().stats(id)
	}

	pub fn listener_shape(&self) -> RegistryShape {
		self.core.listeners().shape()
	}
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> ObservableCollection<T> for ObservableSet<T> {
	fn len(&self) -> usize {
		ObservableSet::len(self)
	}

	fn snapshot(&self) -> Vec<T> {
		self.to_vec()
	}

	fn remove_listener(&self, id: ListenerId) -> bool {
		ObservableSet::remove_listener(self, id)
	}
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> FromIterator<T> for ObservableSet<T> {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		Self::builder().items(iter).build()
	}
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> PartialEq for ObservableSet<T> {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.core, &other.core) || self.content_eq(other)
	}
}

impl<T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static> fmt::Debug for ObservableSet<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.to_vec()).finish()
	}
}
