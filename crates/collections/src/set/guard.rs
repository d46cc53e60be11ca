use std::fmt;
use std::hash::Hash;
use std::thread::ThreadId;

use crate::access::{LockedCollection, Scope};
use crate::change::SetChangeRecord;
use crate::set::{ObservableSet, SetData};
use crate::{AccessMode, CollectionError};

/// Scoped access to an [`ObservableSet`]. See [`crate::LockedList`].
pub struct LockedSet<'a, T: Send + Sync + 'static> {
	set: &'a ObservableSet<T>,
	scope: Scope<'a, SetData<T>, SetChangeRecord<T>>,
}

impl<'a, T: Clone + Eq + Hash + Send + Sync + 'static> LockedSet<'a, T> {
	pub(super) fn new(set: &'a ObservableSet<T>, scope: Scope<'a, SetData<T>, SetChangeRecord<T>>) -> Self {
		Self { set, scope }
	}

	pub fn set(&self) -> &'a ObservableSet<T> {
		self.set
	}

	pub fn len(&self) -> usize {
		self.set.len()
	}

	pub fn is_empty(&self) -> bool {
		self.set.is_empty()
	}

	pub fn contains(&self, value: &T) -> bool {
		self.set.contains(value)
	}

	pub fn to_vec(&self) -> Vec<T> {
		self.set.to_vec()
	}

	pub fn insert(&self, value: T) -> Result<bool, CollectionError> {
		self.scope.check_writable()?;
		self.set.insert(value)
	}

	pub fn remove(&self, value: &T) -> Result<bool, CollectionError> {
		self.scope.check_writable()?;
		self.set.remove(value)
	}

	pub fn extend(&self, items: impl IntoIterator<Item = T>) -> Result<usize, CollectionError> {
		self.scope.check_writable()?;
		self.set.extend(items)
	}

	pub fn retain(&self, keep: impl FnMut(&T) -> bool) -> Result<bool, CollectionError> {
		self.scope.check_writable()?;
		self.set.retain(keep)
	}

	pub fn remove_all(&self, values: &[T]) -> Result<bool, CollectionError> {
		self.scope.check_writable()?;
		self.set.remove_all(values)
	}

	pub fn retain_all(&self, values: &[T]) -> Result<bool, CollectionError> {
		self.scope.check_writable()?;
		self.set.retain_all(values)
	}

	pub fn clear(&self) -> Result<(), CollectionError> {
		self.scope.check_writable()?;
		self.set.clear()
	}
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> LockedCollection for LockedSet<'_, T> {
	fn mode(&self) -> AccessMode {
		self.scope.mode()
	}

	fn change_owner(&self, thread: ThreadId) -> Result<(), CollectionError> {
		self.scope.change_owner(thread)
	}

	fn release(self) -> Result<(), CollectionError> {
		self.scope.release()
	}
}

impl<T: Send + Sync + 'static> fmt::Debug for LockedSet<'_, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LockedSet").field("mode", &self.scope.mode()).finish_non_exhaustive()
	}
}
